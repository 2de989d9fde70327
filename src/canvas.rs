use image::{Rgba, RgbaImage};

// ============================================================================
// PIXEL BUFFER – flat RGBA raster at the image's native resolution
// ============================================================================

/// Mutable RGBA raster backing the loaded coloring page.
///
/// Pixels are stored row-major, four bytes per pixel, so pixel `(x, y)` starts
/// at byte `(y * width + x) * 4`. Edits that touch many pixels should take a
/// working copy with [`PixelBuffer::to_flat`] and hand it back in one go with
/// [`PixelBuffer::commit`].
#[derive(Clone, Debug, PartialEq)]
pub struct PixelBuffer {
    image: RgbaImage,
}

impl PixelBuffer {
    /// Fully transparent raster.
    pub fn new(width: u32, height: u32) -> Self {
        Self { image: RgbaImage::new(width, height) }
    }

    pub fn new_filled(width: u32, height: u32, color: Rgba<u8>) -> Self {
        Self { image: RgbaImage::from_pixel(width, height, color) }
    }

    /// Take ownership of a decoded image.
    pub fn from_rgba_image(image: RgbaImage) -> Self {
        Self { image }
    }

    #[inline]
    pub fn width(&self) -> u32 { self.image.width() }

    #[inline]
    pub fn height(&self) -> u32 { self.image.height() }

    pub fn dimensions(&self) -> (u32, u32) { self.image.dimensions() }

    /// Byte offset of pixel `(x, y)`, or `None` outside the raster.
    #[inline]
    pub fn index_of(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        Some((y as usize * self.width() as usize + x as usize) * 4)
    }

    /// Read a pixel (`None` outside the raster).
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<Rgba<u8>> {
        self.image.get_pixel_checked(x, y).copied()
    }

    /// Write a pixel. Writes outside the raster are dropped.
    pub fn put_pixel(&mut self, x: u32, y: u32, pixel: Rgba<u8>) {
        if let Some(px) = self.image.get_pixel_mut_checked(x, y) {
            *px = pixel;
        }
    }

    pub fn as_raw(&self) -> &[u8] {
        self.image.as_raw()
    }

    /// Copy of the raw bytes for batch editing.
    pub fn to_flat(&self) -> Vec<u8> {
        self.image.as_raw().clone()
    }

    /// Replace the backing store with an edited working copy.
    ///
    /// Returns `false` (buffer untouched) when `data` does not hold exactly
    /// `width * height * 4` bytes.
    pub fn commit(&mut self, data: Vec<u8>) -> bool {
        let (w, h) = self.dimensions();
        match RgbaImage::from_raw(w, h, data) {
            Some(img) if img.as_raw().len() == w as usize * h as usize * 4 => {
                self.image = img;
                true
            }
            _ => {
                crate::log_err!("PixelBuffer::commit: buffer size does not match {}×{}", w, h);
                false
            }
        }
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.image
    }
}
