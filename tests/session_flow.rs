use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use colorbook::cli::{self, CliArgs};
use colorbook::components::tools::Tool;
use colorbook::io::decode_image;
use colorbook::ops::geometry::{Layout, Point, fit_to_container};
use colorbook::session::Session;
use colorbook::settings::Settings;
use image::{Rgba, RgbaImage};

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// 60×40 page: black frame, a vertical wall at x = 20 and a horizontal wall
/// at y = 20 on the right half. Three closed regions.
fn page() -> RgbaImage {
    RgbaImage::from_fn(60, 40, |x, y| {
        let frame = x == 0 || y == 0 || x == 59 || y == 39;
        let wall = x == 20 || (x > 20 && y == 20);
        if frame || wall { BLACK } else { WHITE }
    })
}

fn temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("colorbook-it-{}-{}", tag, uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

/// Click at a native-pixel position through the current layout.
fn click_native(s: &mut Session, x: f64, y: f64) {
    let l = *s.layout();
    let p = Point::new(l.x + (x + 0.5) / 60.0 * l.width, l.y + (y + 0.5) / 40.0 * l.height);
    assert!(s.click(p).unwrap().is_filled());
}

#[test]
fn fill_history_replays_identically_across_layouts() {
    let mut s = Session::new(&Settings::default(), 600.0, 400.0);
    s.load_image("page.png", page());
    s.set_tool(Tool::Fill);
    s.select_palette(1);
    click_native(&mut s, 10.0, 10.0);
    s.select_palette(2);
    click_native(&mut s, 40.0, 10.0);
    s.select_palette(3);
    click_native(&mut s, 40.0, 30.0);
    let big = s.buffer().unwrap().clone();

    s.resize_now(150.0, 300.0);
    assert_eq!(*s.layout(), fit_to_container(60, 40, 150.0, 300.0));
    assert_eq!(s.buffer().unwrap(), &big);

    // The same fills made directly at the small size land on the same regions.
    let mut small = Session::new(&Settings::default(), 150.0, 300.0);
    small.load_image("page.png", page());
    small.set_tool(Tool::Fill);
    small.select_palette(1);
    click_native(&mut small, 10.0, 10.0);
    small.select_palette(2);
    click_native(&mut small, 40.0, 10.0);
    small.select_palette(3);
    click_native(&mut small, 40.0, 30.0);
    assert_eq!(small.buffer().unwrap(), &big);
}

#[test]
fn layout_fit_law_holds() {
    let natives = [(1, 1), (60, 40), (40, 60), (1000, 3), (7, 913)];
    let viewports = [(1.0, 1.0), (640.0, 480.0), (480.0, 640.0), (1920.0, 200.0), (33.3, 77.7)];
    for &(nw, nh) in &natives {
        for &(vw, vh) in &viewports {
            let l: Layout = fit_to_container(nw, nh, vw, vh);
            let eps = 1e-9 * vw.max(vh);
            assert!(l.x >= -eps && l.y >= -eps);
            assert!(l.x + l.width <= vw + eps && l.y + l.height <= vh + eps);
            let touches_x = (l.width - vw).abs() <= eps;
            let touches_y = (l.height - vh).abs() <= eps;
            assert!(touches_x || touches_y, "{}x{} in {}x{}: {:?}", nw, nh, vw, vh, l);
            let ratio = nw as f64 / nh as f64;
            assert!((l.width / l.height - ratio).abs() <= 1e-9 * ratio.max(1.0));
        }
    }
}

#[test]
fn undo_removes_strokes_but_not_fills() {
    let mut s = Session::new(&Settings::default(), 600.0, 400.0);
    s.load_image("page.png", page());
    for i in 0..3 {
        let y = 100.0 + i as f64 * 50.0;
        assert!(s.pointer_down(Point::new(300.0, y)));
        s.pointer_move(Point::new(350.0, y));
        s.pointer_up();
    }
    s.set_tool(Tool::Fill);
    click_native(&mut s, 10.0, 10.0);
    let filled = s.buffer().unwrap().clone();

    let newest = s.strokes().last().unwrap().id;
    assert_eq!(s.undo().map(|st| st.id), Some(newest));
    assert_eq!(s.strokes().len(), 2);
    assert_eq!(s.fills().len(), 1);
    assert_eq!(s.buffer().unwrap(), &filled);
}

#[test]
fn loading_an_image_starts_over() {
    let mut s = Session::new(&Settings::default(), 600.0, 400.0);
    s.load_image("page.png", page());
    s.pointer_down(Point::new(300.0, 100.0));
    s.set_tool(Tool::Fill);
    click_native(&mut s, 10.0, 10.0);

    s.load_image("square.png", RgbaImage::from_pixel(30, 30, WHITE));
    assert!(s.fills().is_empty());
    assert!(s.strokes().is_empty());
    assert_eq!(s.image_name(), Some("square.png"));
    assert_eq!(*s.layout(), Layout { x: 100.0, y: 0.0, width: 400.0, height: 400.0 });
    assert!(s.buffer().unwrap().as_raw().chunks(4).all(|px| px == [255, 255, 255, 255]));
}

#[test]
fn headless_run_writes_export() {
    let dir = temp_dir("cli");
    page().save(dir.join("1.png")).unwrap();
    let out = dir.join("out").join("page.png");
    let events = dir.join("events.json");
    std::fs::write(
        &events,
        format!(
            r#"[
                {{"type": "tool", "tool": "fill"}},
                {{"type": "palette", "index": 1}},
                {{"type": "click", "x": 10.5, "y": 10.5}},
                {{"type": "resize", "width": 120, "height": 80}},
                {{"type": "wait", "ms": 100}},
                {{"type": "export", "path": {:?}, "pixel_ratio": 0.5}}
            ]"#,
            out.to_string_lossy()
        ),
    )
    .unwrap();

    let args = CliArgs::try_parse_from([
        "colorbook",
        "--images-dir",
        dir.to_str().unwrap(),
        "--events",
        events.to_str().unwrap(),
        "--viewport",
        "60x40",
    ])
    .unwrap();
    assert_eq!(cli::run(args, &Settings::default()), ExitCode::SUCCESS);

    // The pending resize was applied before exporting: 120×80 at half density.
    let exported = decode_image(&out).unwrap();
    assert_eq!(exported.dimensions(), (60, 40));
    assert_eq!(*exported.get_pixel(10, 10), Rgba([0xDC, 0x23, 0x23, 255]));
    assert_eq!(*exported.get_pixel(40, 10), WHITE);
    assert_eq!(*exported.get_pixel(20, 10), BLACK);
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn headless_run_fails_on_missing_image() {
    let dir = temp_dir("missing");
    let args = CliArgs::try_parse_from([
        "colorbook",
        "--images-dir",
        dir.to_str().unwrap(),
        "--image",
        "nope.png",
    ])
    .unwrap();
    assert_eq!(cli::run(args, &Settings::default()), ExitCode::FAILURE);
    let _ = std::fs::remove_dir_all(dir);
}
