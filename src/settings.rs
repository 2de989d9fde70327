use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::components::colors::{Color, default_palette, hex_to_rgb};
use crate::ops::fill::FillTolerances;

/// User settings that persist across sessions.
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    /// Seed within this distance of the fill color counts as already filled
    pub fill_match_tolerance: u8,
    /// Fill stops at pixels further than this from the seed color
    pub boundary_tolerance: u8,
    /// Seeds darker than this on every channel are line art
    pub black_threshold: u8,
    /// Quiet period before a viewport resize is applied
    pub resize_debounce_ms: u64,
    /// Initial brush width in display pixels
    pub brush_size: f64,
    /// Density multiplier for exports
    pub export_pixel_ratio: f64,
    /// JPEG quality (1-100)
    pub export_quality: u8,
    /// Directory holding the coloring pages
    pub images_dir: String,
    pub palette: Vec<Color>,
}

impl Default for Settings {
    fn default() -> Self {
        let tolerances = FillTolerances::default();
        Self {
            fill_match_tolerance: tolerances.fill_match,
            boundary_tolerance: tolerances.boundary,
            black_threshold: tolerances.black_threshold,
            resize_debounce_ms: 250,
            brush_size: 10.0,
            export_pixel_ratio: 2.0,
            export_quality: 90,
            images_dir: "images".to_string(),
            palette: default_palette(),
        }
    }
}

impl Settings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/colorbook/colorbook_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\ColorBook\colorbook_settings.cfg
    /// On macOS:   ~/Library/Application Support/ColorBook/colorbook_settings.cfg
    /// Fallback:   next to the executable.
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "linux")]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|_| {
                    let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
                    PathBuf::from(home).join(".config")
                })
                .join("colorbook");
            return Some(config_dir.join("colorbook_settings.cfg"));
        }
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA")
                .or_else(|_| std::env::var("USERPROFILE"))
                .ok()?;
            return Some(PathBuf::from(appdata).join("ColorBook").join("colorbook_settings.cfg"));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("ColorBook")
                    .join("colorbook_settings.cfg"),
            );
        }
        #[cfg(not(any(target_os = "linux", target_os = "windows", target_os = "macos")))]
        {
            std::env::current_exe()
                .ok()
                .and_then(|p| p.parent().map(|d| d.join("colorbook_settings.cfg")))
        }
    }

    /// Fill thresholds for the flood fill engine.
    pub fn fill_tolerances(&self) -> FillTolerances {
        FillTolerances {
            fill_match: self.fill_match_tolerance,
            boundary: self.boundary_tolerance,
            black_threshold: self.black_threshold,
        }
    }

    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }

    /// Load from the default location (defaults if missing or unreadable).
    pub fn load() -> Self {
        match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }

    /// Save to the default location. Failures are logged, never fatal.
    pub fn save(&self) {
        let Some(path) = Self::settings_path() else { return };
        if let Err(e) = self.save_to(&path) {
            crate::log_err!("Failed to save settings to {}: {}", path.display(), e);
        }
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_config_string())
    }

    pub fn to_config_string(&self) -> String {
        let palette: Vec<String> = self.palette.iter().map(|c| c.to_hex()).collect();
        format!(
            "fill_match_tolerance={}\n\
             boundary_tolerance={}\n\
             black_threshold={}\n\
             resize_debounce_ms={}\n\
             brush_size={}\n\
             export_pixel_ratio={}\n\
             export_quality={}\n\
             images_dir={}\n\
             palette={}\n",
            self.fill_match_tolerance,
            self.boundary_tolerance,
            self.black_threshold,
            self.resize_debounce_ms,
            self.brush_size,
            self.export_pixel_ratio,
            self.export_quality,
            self.images_dir,
            palette.join(","),
        )
    }

    /// Parse `key=value` lines. Unknown keys and bad values keep their defaults.
    pub fn parse(content: &str) -> Self {
        let defaults = Self::default();
        let mut s = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else { continue };
            let key = key.trim();
            let val = val.trim();
            match key {
                "fill_match_tolerance" => {
                    s.fill_match_tolerance = val.parse().unwrap_or(defaults.fill_match_tolerance);
                }
                "boundary_tolerance" => {
                    s.boundary_tolerance = val.parse().unwrap_or(defaults.boundary_tolerance);
                }
                "black_threshold" => {
                    s.black_threshold = val.parse().unwrap_or(defaults.black_threshold);
                }
                "resize_debounce_ms" => {
                    s.resize_debounce_ms = val.parse().unwrap_or(defaults.resize_debounce_ms);
                }
                "brush_size" => {
                    s.brush_size = val
                        .parse::<f64>()
                        .ok()
                        .filter(|v| v.is_finite() && *v > 0.0)
                        .unwrap_or(defaults.brush_size);
                }
                "export_pixel_ratio" => {
                    s.export_pixel_ratio = val
                        .parse::<f64>()
                        .ok()
                        .filter(|v| v.is_finite() && *v > 0.0)
                        .unwrap_or(defaults.export_pixel_ratio);
                }
                "export_quality" => {
                    s.export_quality = val
                        .parse::<u8>()
                        .ok()
                        .filter(|q| (1..=100).contains(q))
                        .unwrap_or(defaults.export_quality);
                }
                "images_dir" => {
                    if !val.is_empty() {
                        s.images_dir = val.to_string();
                    }
                }
                "palette" => {
                    let colors: Vec<Color> = val
                        .split(',')
                        .map(str::trim)
                        .filter(|h| h.len() == 7)
                        .map(hex_to_rgb)
                        .collect();
                    if !colors.is_empty() {
                        s.palette = colors;
                    }
                }
                _ => {}
            }
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_fill_engine() {
        let s = Settings::default();
        assert_eq!(s.fill_tolerances(), FillTolerances::default());
        assert_eq!(s.resize_debounce(), Duration::from_millis(250));
        assert_eq!(s.palette.len(), 16);
    }

    #[test]
    fn config_round_trip() {
        let mut s = Settings::default();
        s.boundary_tolerance = 50;
        s.brush_size = 4.5;
        s.images_dir = "pages".into();
        s.palette = vec![Color::new(1, 2, 3), Color::WHITE];
        assert_eq!(Settings::parse(&s.to_config_string()), s);
    }

    #[test]
    fn bad_values_fall_back() {
        let s = Settings::parse(
            "boundary_tolerance=999\n\
             export_quality=0\n\
             brush_size=-3\n\
             palette=#12,nothex\n\
             mystery=1\n\
             # comment=ignored\n\
             fill_match_tolerance = 12\n",
        );
        let d = Settings::default();
        assert_eq!(s.boundary_tolerance, d.boundary_tolerance);
        assert_eq!(s.export_quality, d.export_quality);
        assert_eq!(s.brush_size, d.brush_size);
        assert_eq!(s.palette, d.palette);
        assert_eq!(s.fill_match_tolerance, 12);
    }

    #[test]
    fn missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("colorbook-settings-does-not-exist.cfg");
        assert_eq!(Settings::load_from(&path), Settings::default());
    }

    #[test]
    fn save_then_load() {
        let dir = std::env::temp_dir().join(format!("colorbook-settings-{}", uuid::Uuid::new_v4()));
        let path = dir.join("colorbook_settings.cfg");
        let mut s = Settings::default();
        s.resize_debounce_ms = 100;
        s.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path), s);
        let _ = std::fs::remove_dir_all(dir);
    }
}
