use image::codecs::bmp::BmpEncoder;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::tga::TgaEncoder;
use image::{DynamicImage, ImageEncoder, ImageError, RgbaImage};
use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

// ============================================================================
// LOAD ERRORS
// ============================================================================

/// Error type for loading a coloring page
#[derive(Debug)]
pub enum LoadError {
    Io(std::io::Error),
    Decode(String),
    /// The name is not one of the library's images.
    NotFound(String),
}

impl std::fmt::Display for LoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadError::Io(e) => write!(f, "I/O error: {}", e),
            LoadError::Decode(e) => write!(f, "Decode error: {}", e),
            LoadError::NotFound(name) => write!(f, "No image named '{}'", name),
        }
    }
}

impl std::error::Error for LoadError {}

impl From<std::io::Error> for LoadError {
    fn from(e: std::io::Error) -> Self {
        LoadError::Io(e)
    }
}

impl From<ImageError> for LoadError {
    fn from(e: ImageError) -> Self {
        match e {
            ImageError::IoError(io) => LoadError::Io(io),
            other => LoadError::Decode(other.to_string()),
        }
    }
}

/// Decode any supported raster (PNG, JPEG, BMP, TGA, TIFF) to RGBA at its
/// native resolution.
pub fn decode_image(path: &Path) -> Result<RgbaImage, LoadError> {
    Ok(image::open(path)?.to_rgba8())
}

// ============================================================================
// IMAGE LIBRARY – named coloring pages in one directory
// ============================================================================

/// Coloring pages available in a directory, addressed by file name.
#[derive(Clone, Debug, Default)]
pub struct ImageLibrary {
    dir: PathBuf,
    names: Vec<String>,
}

impl ImageLibrary {
    pub const DEFAULT_PATTERNS: &'static [&'static str] = &["*.jpg", "*.jpeg", "*.png"];

    /// Collect every file in `dir` matching any of `patterns`.
    /// Names are deduplicated and ordered so `2.jpg` sorts before `10.jpg`.
    pub fn scan(dir: &Path, patterns: &[&str]) -> Self {
        let escaped = glob::Pattern::escape(&dir.to_string_lossy());
        let mut names: Vec<String> = Vec::new();

        for pattern in patterns {
            let full = format!("{}/{}", escaped, pattern);
            match glob::glob(&full) {
                Ok(entries) => {
                    for entry in entries.flatten() {
                        if !entry.is_file() {
                            continue;
                        }
                        let Some(name) = entry.file_name().and_then(|n| n.to_str()) else { continue };
                        if !names.iter().any(|n| n == name) {
                            names.push(name.to_string());
                        }
                    }
                }
                Err(e) => {
                    crate::log_warn!("invalid image pattern '{}': {}", pattern, e);
                }
            }
        }

        names.sort_by(|a, b| natural_cmp(a, b));
        crate::log_info!("Image library {}: {} image(s)", dir.display(), names.len());
        Self { dir: dir.to_path_buf(), names }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn first(&self) -> Option<&str> {
        self.names.first().map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Path of a known image. Unknown names (including anything with a
    /// directory component) resolve to `None`.
    pub fn path_of(&self, name: &str) -> Option<PathBuf> {
        if self.contains(name) { Some(self.dir.join(name)) } else { None }
    }

    pub fn load(&self, name: &str) -> Result<RgbaImage, LoadError> {
        let path = self
            .path_of(name)
            .ok_or_else(|| LoadError::NotFound(name.to_string()))?;
        decode_image(&path)
    }
}

/// Order names by their leading number when both have one, else by text.
fn natural_cmp(a: &str, b: &str) -> Ordering {
    fn leading_number(s: &str) -> Option<u64> {
        let digits: String = s.chars().take_while(|c| c.is_ascii_digit()).collect();
        digits.parse().ok()
    }
    match (leading_number(a), leading_number(b)) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.cmp(b)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.cmp(b),
    }
}

// ============================================================================
// EXPORT FORMATS
// ============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SaveFormat {
    Png,
    #[default]
    Jpeg,
    Bmp,
    Tga,
    Tiff,
}

impl SaveFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            SaveFormat::Png => "png",
            SaveFormat::Jpeg => "jpg",
            SaveFormat::Bmp => "bmp",
            SaveFormat::Tga => "tga",
            SaveFormat::Tiff => "tiff",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "png" => Some(SaveFormat::Png),
            "jpeg" | "jpg" => Some(SaveFormat::Jpeg),
            "bmp" => Some(SaveFormat::Bmp),
            "tga" => Some(SaveFormat::Tga),
            "tiff" | "tif" => Some(SaveFormat::Tiff),
            _ => None,
        }
    }

    /// Infer from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension().and_then(|e| e.to_str()).and_then(Self::from_name)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TiffCompression {
    #[default]
    None,
    Lzw,
    Deflate,
}

impl TiffCompression {
    pub fn from_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "lzw" => TiffCompression::Lzw,
            "deflate" => TiffCompression::Deflate,
            _ => TiffCompression::None,
        }
    }
}

/// Encode and write an image to a file.
pub fn encode_and_write(
    image: &RgbaImage,
    path: &Path,
    format: SaveFormat,
    quality: u8,
    tiff_compression: TiffCompression,
) -> Result<(), ImageError> {
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    match format {
        SaveFormat::Png => {
            PngEncoder::new(&mut writer).write_image(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ColorType::Rgba8,
            )?;
        }
        SaveFormat::Jpeg => {
            // JPEG has no alpha: flatten first
            let rgb_image = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            let mut encoder = JpegEncoder::new_with_quality(&mut writer, quality.clamp(1, 100));
            encoder.encode(
                rgb_image.as_raw(),
                rgb_image.width(),
                rgb_image.height(),
                image::ColorType::Rgb8,
            )?;
        }
        SaveFormat::Bmp => {
            let mut encoder = BmpEncoder::new(&mut writer);
            encoder.encode(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ColorType::Rgba8,
            )?;
        }
        SaveFormat::Tga => {
            let encoder = TgaEncoder::new(&mut writer);
            encoder.encode(
                image.as_raw(),
                image.width(),
                image.height(),
                image::ColorType::Rgba8,
            )?;
        }
        SaveFormat::Tiff => {
            let err_map = |e: tiff::TiffError| {
                ImageError::IoError(std::io::Error::other(format!("TIFF encode error: {}", e)))
            };
            let mut tiff_enc = tiff::encoder::TiffEncoder::new(&mut writer).map_err(err_map)?;
            match tiff_compression {
                TiffCompression::None => {
                    tiff_enc
                        .write_image::<tiff::encoder::colortype::RGBA8>(
                            image.width(),
                            image.height(),
                            image.as_raw(),
                        )
                        .map_err(err_map)?;
                }
                TiffCompression::Lzw => {
                    tiff_enc
                        .write_image_with_compression::<tiff::encoder::colortype::RGBA8, _>(
                            image.width(),
                            image.height(),
                            tiff::encoder::compression::Lzw,
                            image.as_raw(),
                        )
                        .map_err(err_map)?;
                }
                TiffCompression::Deflate => {
                    tiff_enc
                        .write_image_with_compression::<tiff::encoder::colortype::RGBA8, _>(
                            image.width(),
                            image.height(),
                            tiff::encoder::compression::Deflate::default(),
                            image.as_raw(),
                        )
                        .map_err(err_map)?;
                }
            }
        }
    }

    writer.flush()?;
    Ok(())
}

// ============================================================================
// EXPORT ERRORS
// ============================================================================

/// Error type for writing an exported page
#[derive(Debug)]
pub enum ExportError {
    Io(std::io::Error),
    Encode(String),
    /// Requested output raster is larger than the export limit.
    TooLarge { width: f64, height: f64 },
}

impl std::fmt::Display for ExportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExportError::Io(e) => write!(f, "I/O error: {}", e),
            ExportError::Encode(e) => write!(f, "Encode error: {}", e),
            ExportError::TooLarge { width, height } => {
                write!(f, "Export of {:.0}×{:.0} px exceeds the size limit", width, height)
            }
        }
    }
}

impl std::error::Error for ExportError {}

impl From<std::io::Error> for ExportError {
    fn from(e: std::io::Error) -> Self {
        ExportError::Io(e)
    }
}

impl From<ImageError> for ExportError {
    fn from(e: ImageError) -> Self {
        match e {
            ImageError::IoError(io) => ExportError::Io(io),
            other => ExportError::Encode(other.to_string()),
        }
    }
}

/// Write a flattened export, creating the destination directory if needed.
pub fn write_export(
    image: &RgbaImage,
    path: &Path,
    format: SaveFormat,
    quality: u8,
    tiff_compression: TiffCompression,
) -> Result<(), ExportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    if let Err(e) = encode_and_write(image, path, format, quality, tiff_compression) {
        crate::log_err!("Export to {} failed: {}", path.display(), e);
        return Err(e.into());
    }
    crate::log_info!(
        "Exported {}×{} {} to {}",
        image.width(),
        image.height(),
        format.extension(),
        path.display()
    );
    Ok(())
}
