//! Owned BGRA pixel buffers with DPI metadata.

use image::{GrayImage, Rgba, RgbaImage};

/// Bytes per pixel (blue, green, red, alpha).
pub const BYTES_PER_PIXEL: usize = 4;

/// An owned raster: `width * height` pixels in BGRA order, row-major,
/// without row padding.
#[derive(Clone, PartialEq, Eq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    dpi_x: u32,
    dpi_y: u32,
    pixels: Vec<u8>,
}

impl RasterImage {
    /// Convert an RGBA image, swapping channels into BGRA order.
    pub fn from_rgba(img: &RgbaImage, dpi_x: u32, dpi_y: u32) -> Self {
        let mut pixels = Vec::with_capacity(img.as_raw().len());
        for Rgba([r, g, b, a]) in img.pixels() {
            pixels.extend_from_slice(&[*b, *g, *r, *a]);
        }
        Self {
            width: img.width(),
            height: img.height(),
            dpi_x,
            dpi_y,
            pixels,
        }
    }

    /// Convert a grayscale image into opaque BGRA.
    pub fn from_luma(img: &GrayImage, dpi_x: u32, dpi_y: u32) -> Self {
        let mut pixels = Vec::with_capacity(img.as_raw().len() * BYTES_PER_PIXEL);
        for &v in img.as_raw() {
            pixels.extend_from_slice(&[v, v, v, 0xFF]);
        }
        Self {
            width: img.width(),
            height: img.height(),
            dpi_x,
            dpi_y,
            pixels,
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Horizontal and vertical resolution.
    pub fn dpi(&self) -> (u32, u32) {
        (self.dpi_x, self.dpi_y)
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }

    /// Raw BGRA bytes.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// The BGRA value at (`x`, `y`), or `None` outside the image.
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = y as usize * self.stride() + x as usize * BYTES_PER_PIXEL;
        self.pixels[i..i + BYTES_PER_PIXEL].try_into().ok()
    }

    /// Whether the pixel at (`x`, `y`) is closer to black than white.
    pub fn is_dark(&self, x: u32, y: u32) -> bool {
        self.pixel(x, y).is_some_and(|[b, g, r, a]| {
            let luma = (u32::from(r) * 299 + u32::from(g) * 587 + u32::from(b) * 114) / 1000;
            a >= 128 && luma < 128
        })
    }

    /// Copy into an RGBA image for encoding or further processing.
    pub fn to_rgba(&self) -> RgbaImage {
        let mut rgba = Vec::with_capacity(self.pixels.len());
        for px in self.pixels.chunks_exact(BYTES_PER_PIXEL) {
            rgba.extend_from_slice(&[px[2], px[1], px[0], px[3]]);
        }
        RgbaImage::from_raw(self.width, self.height, rgba)
            .unwrap_or_else(|| RgbaImage::new(self.width, self.height))
    }
}

impl std::fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterImage")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("dpi_x", &self.dpi_x)
            .field("dpi_y", &self.dpi_y)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

impl AsRef<RasterImage> for RasterImage {
    fn as_ref(&self) -> &RasterImage {
        self
    }
}
