//! Human-readable label text for linear symbologies.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{GrayImage, Luma};
use rusttype::{Font, Scale, point};

/// Well-known locations probed by [`LabelFont::discover`], in order.
pub const SYSTEM_FONT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
    "/usr/share/fonts/noto/NotoSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

/// Errors from loading a label font.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum FontError {
    /// The font file could not be read.
    #[error("failed to read font '{}': {source}", .path.display())]
    Io {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not a usable TrueType/OpenType font.
    #[error("'{}' is not a valid TrueType/OpenType font", .path.display())]
    Invalid {
        /// Path that was parsed.
        path: PathBuf,
    },
}

/// A shared, immutable font handle. An empty handle renders no text.
#[derive(Clone, Default)]
pub struct LabelFont(Option<Arc<Font<'static>>>);

impl LabelFont {
    /// A handle with no font.
    pub fn none() -> Self {
        Self(None)
    }

    /// Load a font file.
    pub fn load(path: &Path) -> Result<Self, FontError> {
        let bytes = std::fs::read(path).map_err(|source| FontError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_bytes(bytes).ok_or_else(|| FontError::Invalid {
            path: path.to_path_buf(),
        })
    }

    /// Parse font bytes. Returns `None` if they are not a valid font.
    pub fn from_bytes(bytes: Vec<u8>) -> Option<Self> {
        Font::try_from_vec(bytes).map(|f| Self(Some(Arc::new(f))))
    }

    /// First loadable font among [`SYSTEM_FONT_PATHS`], or an empty handle.
    pub fn discover() -> Self {
        for candidate in SYSTEM_FONT_PATHS {
            let path = Path::new(candidate);
            if !path.is_file() {
                continue;
            }
            match Self::load(path) {
                Ok(font) => {
                    tracing::debug!(path = %path.display(), "using label font");
                    return font;
                }
                Err(e) => tracing::debug!(error = %e, "skipping font candidate"),
            }
        }
        tracing::warn!("no system font found; human-readable text will be omitted");
        Self::none()
    }

    /// Whether a font is loaded.
    pub fn is_available(&self) -> bool {
        self.0.is_some()
    }

    /// Draw `text` centred horizontally and vertically inside the band
    /// starting at row `top` with height `band_height`. Returns `false`
    /// (and draws nothing) when no font is loaded.
    pub(crate) fn draw_centered(
        &self,
        canvas: &mut GrayImage,
        text: &str,
        px: f32,
        top: u32,
        band_height: u32,
    ) -> bool {
        let Some(font) = self.0.as_deref() else {
            return false;
        };
        let scale = Scale::uniform(px);
        let vm = font.v_metrics(scale);
        let line_height = vm.ascent - vm.descent;

        let glyphs: Vec<_> = font.layout(text, scale, point(0.0, vm.ascent)).collect();
        let text_width = glyphs
            .iter()
            .rev()
            .find_map(|g| g.pixel_bounding_box().map(|bb| bb.max.x))
            .unwrap_or(0)
            .max(0) as f32;

        let dx = ((canvas.width() as f32 - text_width) / 2.0).max(0.0).round();
        let dy = top as f32 + ((band_height as f32 - line_height) / 2.0).max(0.0).round();

        let (w, h) = canvas.dimensions();
        for g in font.layout(text, scale, point(dx, dy + vm.ascent)) {
            let Some(bb) = g.pixel_bounding_box() else {
                continue;
            };
            g.draw(|gx, gy, coverage| {
                let x = i64::from(bb.min.x) + i64::from(gx);
                let y = i64::from(bb.min.y) + i64::from(gy);
                if x < 0 || y < 0 || x >= i64::from(w) || y >= i64::from(h) {
                    return;
                }
                let (x, y) = (x as u32, y as u32);
                let ink = 255 - (coverage.clamp(0.0, 1.0) * 255.0).round() as u8;
                let Luma([current]) = *canvas.get_pixel(x, y);
                canvas.put_pixel(x, y, Luma([current.min(ink)]));
            });
        }
        true
    }
}

impl std::fmt::Debug for LabelFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("LabelFont")
            .field(&if self.is_available() { "loaded" } else { "none" })
            .finish()
    }
}
