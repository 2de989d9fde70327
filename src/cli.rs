// ============================================================================
// ColorBook CLI: headless coloring via a scripted event sequence
// ============================================================================
//
// Usage examples:
//   colorbook --list                                   (show the image library)
//   colorbook -i 3.jpg -e session.json -o page.png
//   colorbook -d pages/ -e fills.json --viewport 800x600 --pixel-ratio 1
//
// The events file is a JSON array of tagged events, e.g.
//   [ {"type": "tool", "tool": "fill"},
//     {"type": "palette", "index": 1},
//     {"type": "click", "x": 320, "y": 240},
//     {"type": "resize", "width": 640, "height": 480},
//     {"type": "wait", "ms": 300},
//     {"type": "export", "path": "small.png"} ]
//
// Time is virtual: only `wait` advances the clock that drives the resize
// debounce. Pending resizes are applied before every export and at the end.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::{Duration, Instant};

use clap::Parser;
use serde::Deserialize;

use crate::components::tools::Tool;
use crate::io::{ExportError, ImageLibrary, SaveFormat, TiffCompression, write_export};
use crate::ops::fill::FillOutcome;
use crate::ops::geometry::Point;
use crate::session::Session;
use crate::settings::Settings;

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// ColorBook headless coloring driver.
#[derive(Parser, Debug)]
#[command(
    name = "colorbook",
    about = "ColorBook headless coloring driver",
    long_about = "Load a coloring page, replay brush strokes and bucket fills from a\n\
                  JSON events file, and export the result as a flattened image.\n\n\
                  Example:\n  \
                  colorbook --image 1.jpg --events session.json --output page.png"
)]
pub struct CliArgs {
    /// Directory holding the coloring pages (default from settings).
    #[arg(short = 'd', long, value_name = "DIR")]
    pub images_dir: Option<PathBuf>,

    /// Page to load first. Defaults to the first page in the library.
    #[arg(short, long, value_name = "NAME")]
    pub image: Option<String>,

    /// JSON events file to replay against the session.
    #[arg(short, long, value_name = "EVENTS.json")]
    pub events: Option<PathBuf>,

    /// Initial viewport size in display pixels.
    #[arg(long, default_value = "1024x768", value_name = "WxH", value_parser = parse_viewport)]
    pub viewport: (f64, f64),

    /// Export path used when the events file has no export of its own.
    #[arg(short, long, default_value = "coloring-page.jpg", value_name = "FILE")]
    pub output: PathBuf,

    /// Output format: jpeg, png, bmp, tga, tiff.
    /// When omitted, the format is inferred from the output extension, defaulting to jpeg.
    #[arg(short, long, value_name = "FORMAT")]
    pub format: Option<String>,

    /// JPEG quality (1–100, default from settings).
    #[arg(short, long, value_name = "1-100")]
    pub quality: Option<u8>,

    /// Export density multiplier (default from settings).
    #[arg(long, value_name = "RATIO")]
    pub pixel_ratio: Option<f64>,

    /// TIFF compression mode: none, lzw, deflate (default: none).
    #[arg(long, default_value = "none", value_name = "MODE")]
    pub tiff_compression: String,

    /// List the pages in the library and exit.
    #[arg(short, long)]
    pub list: bool,

    /// Print every event and its outcome.
    #[arg(short, long)]
    pub verbose: bool,
}

/// Parse `WIDTHxHEIGHT` into positive display sizes.
fn parse_viewport(s: &str) -> Result<(f64, f64), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", s))?;
    let parse = |v: &str| -> Result<f64, String> {
        match v.trim().parse::<f64>() {
            Ok(n) if n.is_finite() && n > 0.0 => Ok(n),
            _ => Err(format!("invalid viewport dimension '{}'", v)),
        }
    };
    Ok((parse(w)?, parse(h)?))
}

// ============================================================================
// Events
// ============================================================================

/// One scripted user action.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    Load { name: String },
    Tool { tool: Tool },
    Color { hex: String },
    Palette { index: usize },
    BrushSize { size: f64 },
    PointerDown { x: f64, y: f64 },
    PointerMove { x: f64, y: f64 },
    PointerUp,
    Click { x: f64, y: f64 },
    Resize { width: f64, height: f64 },
    Wait { ms: u64 },
    Undo,
    Clear,
    Export {
        #[serde(default)]
        path: Option<PathBuf>,
        #[serde(default)]
        format: Option<String>,
        #[serde(default)]
        pixel_ratio: Option<f64>,
    },
}

pub fn parse_events(json: &str) -> Result<Vec<SessionEvent>, serde_json::Error> {
    serde_json::from_str(json)
}

fn read_events(path: &Path) -> Result<Vec<SessionEvent>, String> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("could not read events '{}': {}", path.display(), e))?;
    parse_events(&json).map_err(|e| format!("invalid events '{}': {}", path.display(), e))
}

/// Where and how exports are written.
#[derive(Clone, Debug)]
pub struct ExportOptions {
    pub output: PathBuf,
    pub format: SaveFormat,
    pub quality: u8,
    pub tiff_compression: TiffCompression,
    pub pixel_ratio: f64,
}

impl ExportOptions {
    fn write(
        &self,
        session: &Session,
        path: Option<&Path>,
        format: Option<SaveFormat>,
        pixel_ratio: Option<f64>,
    ) -> Result<PathBuf, ExportError> {
        // An explicit path carries its own format; the default output uses --format.
        let format = format
            .or_else(|| path.and_then(SaveFormat::from_path))
            .unwrap_or(self.format);
        let path = path.unwrap_or(&self.output);
        let image = session.export(pixel_ratio.unwrap_or(self.pixel_ratio))?;
        write_export(&image, path, format, self.quality, self.tiff_compression)?;
        Ok(path.to_path_buf())
    }
}

/// Replays events against one session on a virtual clock.
pub struct EventPlayer<'a> {
    pub session: Session,
    library: &'a ImageLibrary,
    export: ExportOptions,
    clock: Instant,
    verbose: bool,
    /// Paths written by `export` events so far.
    pub exported: Vec<PathBuf>,
}

impl<'a> EventPlayer<'a> {
    pub fn new(session: Session, library: &'a ImageLibrary, export: ExportOptions, verbose: bool) -> Self {
        Self {
            session,
            library,
            export,
            clock: Instant::now(),
            verbose,
            exported: Vec::new(),
        }
    }

    pub fn apply(&mut self, event: &SessionEvent) -> Result<(), String> {
        let s = &mut self.session;
        match event {
            SessionEvent::Load { name } => {
                s.load_from_library(self.library, name)
                    .map_err(|e| format!("load '{}' failed: {}", name, e))?;
            }
            SessionEvent::Tool { tool } => s.set_tool(*tool),
            SessionEvent::Color { hex } => s.set_color_hex(hex),
            SessionEvent::Palette { index } => {
                if !s.select_palette(*index) && self.verbose {
                    println!("  palette index {} out of range", index);
                }
            }
            SessionEvent::BrushSize { size } => {
                if !s.set_brush_size(*size) && self.verbose {
                    println!("  brush size {} ignored", size);
                }
            }
            SessionEvent::PointerDown { x, y } => {
                if !s.pointer_down(Point::new(*x, *y)) && self.verbose {
                    println!("  pointer down at ({}, {}) started no stroke", x, y);
                }
            }
            SessionEvent::PointerMove { x, y } => {
                s.pointer_move(Point::new(*x, *y));
            }
            SessionEvent::PointerUp => s.pointer_up(),
            SessionEvent::Click { x, y } => {
                let outcome = s.click(Point::new(*x, *y));
                if self.verbose {
                    match outcome {
                        Some(FillOutcome::Filled { pixels, .. }) => println!("  filled {} px", pixels),
                        Some(FillOutcome::Skipped(reason)) => println!("  fill skipped: {:?}", reason),
                        None => println!("  click ignored"),
                    }
                }
            }
            SessionEvent::Resize { width, height } => s.request_resize(*width, *height, self.clock),
            SessionEvent::Wait { ms } => {
                self.clock += Duration::from_millis(*ms);
                s.poll(self.clock);
            }
            SessionEvent::Undo => {
                s.undo();
            }
            SessionEvent::Clear => s.clear(),
            SessionEvent::Export { path, format, pixel_ratio } => {
                let format = match format.as_deref() {
                    Some(name) => {
                        Some(SaveFormat::from_name(name).ok_or_else(|| format!("unknown format '{}'", name))?)
                    }
                    None => None,
                };
                s.flush_resize();
                let written = self
                    .export
                    .write(s, path.as_deref(), format, *pixel_ratio)
                    .map_err(|e| format!("export failed: {}", e))?;
                if self.verbose {
                    println!("  → {}", written.display());
                }
                self.exported.push(written);
            }
        }
        Ok(())
    }

    /// Apply anything still pending, as if input had gone quiet.
    pub fn finish(&mut self) {
        self.session.flush_resize();
    }
}

// ============================================================================
// Public entry point
// ============================================================================

/// Run the headless session and return an OS exit code.
pub fn run(args: CliArgs, settings: &Settings) -> ExitCode {
    let images_dir = args
        .images_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(&settings.images_dir));
    let library = ImageLibrary::scan(&images_dir, ImageLibrary::DEFAULT_PATTERNS);

    if args.list {
        if library.is_empty() {
            eprintln!("no images found in '{}'.", library.dir().display());
        }
        for name in library.names() {
            println!("{}", name);
        }
        return ExitCode::SUCCESS;
    }

    let format = match args.format.as_deref() {
        Some(name) => match SaveFormat::from_name(name) {
            Some(f) => f,
            None => {
                eprintln!("error: unknown format '{}'.", name);
                return ExitCode::FAILURE;
            }
        },
        None => SaveFormat::from_path(&args.output).unwrap_or_default(),
    };
    let export = ExportOptions {
        output: args.output.clone(),
        format,
        quality: args.quality.unwrap_or(settings.export_quality).clamp(1, 100),
        tiff_compression: TiffCompression::from_name(&args.tiff_compression),
        pixel_ratio: args
            .pixel_ratio
            .filter(|r| r.is_finite() && *r > 0.0)
            .unwrap_or(settings.export_pixel_ratio),
    };

    let events = match &args.events {
        Some(path) => match read_events(path) {
            Ok(events) => events,
            Err(e) => {
                eprintln!("error: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => Vec::new(),
    };

    let mut session = Session::new(settings, args.viewport.0, args.viewport.1);
    let first = args.image.as_deref().or_else(|| library.first());
    match first {
        Some(name) => {
            if let Err(e) = session.load_from_library(&library, name) {
                eprintln!("error: could not load '{}': {}", name, e);
                return ExitCode::FAILURE;
            }
        }
        None if events.is_empty() => {
            eprintln!("error: no images found in '{}'.", library.dir().display());
            return ExitCode::FAILURE;
        }
        None => {}
    }

    if args.verbose
        && let Some(path) = crate::logger::log_path()
    {
        println!("log: {}", path.display());
    }

    let start = Instant::now();
    let mut player = EventPlayer::new(session, &library, export, args.verbose);
    for (idx, event) in events.iter().enumerate() {
        if args.verbose {
            println!("[{}/{}] {:?}", idx + 1, events.len(), event);
        }
        if let Err(e) = player.apply(event) {
            eprintln!("error: event {}: {}", idx + 1, e);
            return ExitCode::FAILURE;
        }
    }
    player.finish();

    if player.exported.is_empty() {
        match player.export.write(&player.session, None, None, None) {
            Ok(path) => {
                if args.verbose {
                    println!("→ {}", path.display());
                }
            }
            Err(e) => {
                eprintln!("error: export failed: {}", e);
                return ExitCode::FAILURE;
            }
        }
    }

    if args.verbose {
        println!(
            "{} fills, {} strokes ({:.0}ms)",
            player.session.fills().len(),
            player.session.strokes().len(),
            start.elapsed().as_secs_f64() * 1000.0
        );
    }
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    fn player(library: &ImageLibrary) -> EventPlayer<'_> {
        let mut session = Session::new(&Settings::default(), 100.0, 100.0);
        session.load_image("page.png", RgbaImage::from_pixel(10, 10, Rgba([255, 255, 255, 255])));
        let export = ExportOptions {
            output: PathBuf::from("unused.jpg"),
            format: SaveFormat::Jpeg,
            quality: 90,
            tiff_compression: TiffCompression::None,
            pixel_ratio: 1.0,
        };
        EventPlayer::new(session, library, export, false)
    }

    #[test]
    fn viewport_argument() {
        assert_eq!(parse_viewport("800x600"), Ok((800.0, 600.0)));
        assert_eq!(parse_viewport("1.5X2"), Ok((1.5, 2.0)));
        assert!(parse_viewport("800").is_err());
        assert!(parse_viewport("0x600").is_err());
        assert!(parse_viewport("axb").is_err());
    }

    #[test]
    fn cli_defaults() {
        let args = CliArgs::try_parse_from(["colorbook"]).unwrap();
        assert_eq!(args.viewport, (1024.0, 768.0));
        assert_eq!(args.output, PathBuf::from("coloring-page.jpg"));
        assert!(!args.list);
    }

    #[test]
    fn events_parse_from_json() {
        let events = parse_events(
            r##"[
                {"type": "tool", "tool": "fill"},
                {"type": "color", "hex": "#FF9233"},
                {"type": "click", "x": 5, "y": 6.5},
                {"type": "pointer_up"},
                {"type": "brush_size", "size": 4},
                {"type": "export"},
                {"type": "export", "path": "a.png", "pixel_ratio": 1}
            ]"##,
        )
        .unwrap();
        assert_eq!(events[0], SessionEvent::Tool { tool: Tool::Fill });
        assert_eq!(events[1], SessionEvent::Color { hex: "#FF9233".into() });
        assert_eq!(events[2], SessionEvent::Click { x: 5.0, y: 6.5 });
        assert_eq!(events[3], SessionEvent::PointerUp);
        assert_eq!(events[4], SessionEvent::BrushSize { size: 4.0 });
        assert_eq!(events[5], SessionEvent::Export { path: None, format: None, pixel_ratio: None });
        assert_eq!(
            events[6],
            SessionEvent::Export { path: Some("a.png".into()), format: None, pixel_ratio: Some(1.0) }
        );
        assert!(parse_events(r#"[{"type": "teleport"}]"#).is_err());
    }

    #[test]
    fn player_drives_session() {
        let library = ImageLibrary::default();
        let mut p = player(&library);
        let events = parse_events(
            r#"[
                {"type": "pointer_down", "x": 10, "y": 10},
                {"type": "pointer_move", "x": 50, "y": 50},
                {"type": "pointer_up"},
                {"type": "tool", "tool": "fill"},
                {"type": "palette", "index": 3},
                {"type": "click", "x": 90, "y": 90}
            ]"#,
        )
        .unwrap();
        for e in &events {
            p.apply(e).unwrap();
        }
        assert_eq!(p.session.strokes().len(), 1);
        assert_eq!(p.session.fills().len(), 1);
        assert_eq!(p.session.buffer().unwrap().get_pixel(9, 9), Some(Rgba([0x1D, 0x69, 0x14, 255])));
    }

    #[test]
    fn wait_drives_the_resize_debounce() {
        let library = ImageLibrary::default();
        let mut p = player(&library);
        p.apply(&SessionEvent::Resize { width: 50.0, height: 50.0 }).unwrap();
        p.apply(&SessionEvent::Wait { ms: 100 }).unwrap();
        assert_eq!(p.session.viewport(), (100.0, 100.0));
        p.apply(&SessionEvent::Wait { ms: 200 }).unwrap();
        assert_eq!(p.session.viewport(), (50.0, 50.0));

        p.apply(&SessionEvent::Resize { width: 80.0, height: 80.0 }).unwrap();
        p.finish();
        assert_eq!(p.session.viewport(), (80.0, 80.0));
    }

    #[test]
    fn failed_load_is_an_error_and_keeps_the_page() {
        let library = ImageLibrary::default();
        let mut p = player(&library);
        assert!(p.apply(&SessionEvent::Load { name: "nope.png".into() }).is_err());
        assert_eq!(p.session.image_name(), Some("page.png"));
    }

    #[test]
    fn unknown_export_format_is_an_error() {
        let library = ImageLibrary::default();
        let mut p = player(&library);
        let event = SessionEvent::Export { path: None, format: Some("webp".into()), pixel_ratio: None };
        assert!(p.apply(&event).is_err());
        assert!(p.exported.is_empty());
    }
}
