//! Barcode raster synthesis.
//!
//! [`Renderer`] turns a [`RenderRequest`] into a [`RasterImage`]. Every
//! symbology maps to one of two strategies:
//!
//! - **Linear** (Code 128, EAN-13, Code 39): a module pattern drawn at
//!   96 DPI, scaled nearest-neighbour to the target DPI, with an optional
//!   human-readable text band underneath.
//! - **Matrix** (QR Code, Data Matrix): a module grid drawn with integer
//!   cells, never with text.
//!
//! Rendering is pure. Identical requests produce byte-identical pixels, and
//! any encoder error or panic is returned as a [`RenderFailure`].

pub mod linear;
pub mod matrix;
pub mod text;

use std::panic::{AssertUnwindSafe, catch_unwind};

use image::imageops::{self, FilterType};
use image::{GrayImage, Luma};

use crate::item::{Item, RenderSettings};
use crate::raster::RasterImage;
use crate::symbology::Symbology;

use self::matrix::{ModuleGrid, QUIET_MODULES};
pub use self::text::{FontError, LabelFont};

/// Resolution at which module width and bar height are expressed.
pub const BASE_DPI: u32 = 96;
/// Minimum character count used when sizing a symbol.
pub const MIN_WIDTH_CHARS: usize = 50;
/// Minimum scale factor for matrix symbologies.
pub const MIN_MATRIX_SCALE: f64 = 3.0;
/// Largest width or height, in pixels, the renderer will allocate.
pub const MAX_DIMENSION: u32 = 32_768;
/// Largest pixel area the renderer will allocate for one canvas.
pub const MAX_PIXELS: u64 = 50_000_000;

const TEXT_SPACING: u32 = 8;
const TEXT_BAND: u32 = 30;
const TEXT_PX: f32 = 16.0;

const WHITE: Luma<u8> = Luma([0xFF]);
const BLACK: Luma<u8> = Luma([0x00]);

// ── Types ───────────────────────────────────────────────────────────────

/// A single item could not be rendered. The reason is human-readable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct RenderFailure {
    /// Why rendering failed.
    pub reason: String,
}

impl RenderFailure {
    /// Build a failure from any message.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Everything that determines a rendered raster.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderRequest {
    /// Payload to encode.
    pub data: String,
    /// Target symbology.
    pub symbology: Symbology,
    /// Narrowest bar or cell width, in pixels at [`BASE_DPI`].
    pub module_width: u32,
    /// Bar height, in pixels at [`BASE_DPI`].
    pub barcode_height: u32,
    /// Request a human-readable label (ignored for matrix symbologies).
    pub show_text: bool,
    /// Horizontal output resolution.
    pub dpi_x: u32,
    /// Vertical output resolution.
    pub dpi_y: u32,
}

impl RenderRequest {
    /// A request with default settings at [`BASE_DPI`].
    pub fn new(data: impl Into<String>, symbology: Symbology) -> Self {
        Self::with_settings(data, symbology, RenderSettings::default(), BASE_DPI)
    }

    /// A request with explicit settings and resolution.
    pub fn with_settings(
        data: impl Into<String>,
        symbology: Symbology,
        settings: RenderSettings,
        dpi: u32,
    ) -> Self {
        Self {
            data: data.into(),
            symbology,
            module_width: settings.module_width,
            barcode_height: settings.barcode_height,
            show_text: settings.show_text,
            dpi_x: dpi,
            dpi_y: dpi,
        }
    }

    /// Use different horizontal and vertical resolutions.
    pub fn with_dpi(mut self, dpi_x: u32, dpi_y: u32) -> Self {
        self.dpi_x = dpi_x;
        self.dpi_y = dpi_y;
        self
    }

    /// The request for `item`, resolving its overrides against `defaults`.
    pub fn for_item(item: &Item, defaults: &RenderSettings, dpi: u32) -> Self {
        Self::with_settings(
            item.data.clone(),
            item.symbology,
            item.effective_settings(defaults),
            dpi,
        )
    }
}

// ── Traits ──────────────────────────────────────────────────────────────

/// Something that renders barcodes.
///
/// The raster type is associated so callers can hand out owned handles
/// with their own release semantics.
pub trait BarcodeRender: Send + Sync {
    /// Owned raster handle.
    type Raster: AsRef<RasterImage>;

    /// Render one request.
    fn render(&self, request: &RenderRequest) -> Result<Self::Raster, RenderFailure>;
}

// ── Dispatch ────────────────────────────────────────────────────────────

type LinearEncoder = fn(&str) -> Result<Vec<bool>, RenderFailure>;
type MatrixEncoder = fn(&str) -> Result<ModuleGrid, RenderFailure>;

#[derive(Clone, Copy)]
enum Strategy {
    Linear(LinearEncoder),
    Matrix(MatrixEncoder),
}

fn strategy_for(symbology: Symbology) -> Strategy {
    match symbology {
        Symbology::Code128 => Strategy::Linear(linear::code128),
        Symbology::Ean13 => Strategy::Linear(linear::ean13),
        Symbology::Code39 => Strategy::Linear(linear::code39),
        Symbology::QrCode => Strategy::Matrix(matrix::qr),
        Symbology::DataMatrix => Strategy::Matrix(matrix::data_matrix),
    }
}

// ── Renderer ────────────────────────────────────────────────────────────

/// Stateless barcode renderer. Cheap to clone and safe to share.
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    font: LabelFont,
}

impl Renderer {
    /// A renderer that draws label text with `font`.
    pub fn new(font: LabelFont) -> Self {
        Self { font }
    }

    /// The label font in use.
    pub fn font(&self) -> &LabelFont {
        &self.font
    }

    /// Render `request`. Never panics.
    pub fn render(&self, request: &RenderRequest) -> Result<RasterImage, RenderFailure> {
        if request.data.trim().is_empty() {
            return Err(RenderFailure::new("data cannot be empty"));
        }
        if request.module_width == 0
            || request.barcode_height == 0
            || request.dpi_x == 0
            || request.dpi_y == 0
        {
            return Err(RenderFailure::new(format!(
                "invalid dimensions: module width {}, height {}, dpi {}x{}",
                request.module_width, request.barcode_height, request.dpi_x, request.dpi_y
            )));
        }

        let result = catch_unwind(AssertUnwindSafe(|| match strategy_for(request.symbology) {
            Strategy::Linear(encode) => {
                let modules = encode(&request.data)?;
                self.compose_linear(&modules, request)
            }
            Strategy::Matrix(encode) => compose_matrix(&encode(&request.data)?, request),
        }));

        let raster = match result {
            Ok(r) => r?,
            Err(payload) => {
                let reason = payload
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                return Err(RenderFailure::new(format!("encoder panicked: {reason}")));
            }
        };
        if raster.width() == 0 || raster.height() == 0 {
            return Err(RenderFailure::new("encoder produced an empty image"));
        }
        Ok(raster)
    }

    fn compose_linear(
        &self,
        modules: &[bool],
        request: &RenderRequest,
    ) -> Result<RasterImage, RenderFailure> {
        if modules.is_empty() {
            return Err(RenderFailure::new("encoder produced no modules"));
        }
        let chars = request.data.chars().count().max(MIN_WIDTH_CHARS) as u64;
        let target_w = u64::from(request.module_width) * chars;
        let total = modules.len() as u64;
        let module_px = (target_w / total).max(1);
        let bars_w = module_px * total;
        let canvas_w = checked_dim(target_w.max(bars_w))?;
        let canvas_h = checked_dim(u64::from(request.barcode_height))?;
        let offset = (u64::from(canvas_w) - bars_w) / 2;

        let sx = f64::from(request.dpi_x) / f64::from(BASE_DPI);
        let sy = f64::from(request.dpi_y) / f64::from(BASE_DPI);
        let out_w = scaled(canvas_w, sx)?;
        let out_h = scaled(canvas_h, sy)?;
        checked_area(canvas_w, canvas_h)?;
        checked_area(out_w, out_h)?;

        let mut bars = GrayImage::from_pixel(canvas_w, canvas_h, WHITE);
        for (i, _) in modules.iter().enumerate().filter(|(_, dark)| **dark) {
            let x0 = offset + i as u64 * module_px;
            for x in x0..x0 + module_px {
                for y in 0..canvas_h {
                    bars.put_pixel(x as u32, y, BLACK);
                }
            }
        }

        if (out_w, out_h) != bars.dimensions() {
            bars = imageops::resize(&bars, out_w, out_h, FilterType::Nearest);
        }

        if !request.show_text {
            return Ok(RasterImage::from_luma(&bars, request.dpi_x, request.dpi_y));
        }
        if !self.font.is_available() {
            tracing::debug!(data = %request.data, "no label font; omitting text band");
            return Ok(RasterImage::from_luma(&bars, request.dpi_x, request.dpi_y));
        }

        let spacing = scaled(TEXT_SPACING, sy)?;
        let band = scaled(TEXT_BAND, sy)?;
        let total_h = checked_dim(u64::from(out_h) + u64::from(spacing) + u64::from(band))?;
        checked_area(out_w, total_h)?;
        let mut canvas = GrayImage::from_pixel(out_w, total_h, WHITE);
        imageops::replace(&mut canvas, &bars, 0, 0);
        self.font.draw_centered(
            &mut canvas,
            &request.data,
            TEXT_PX * sy as f32,
            out_h + spacing,
            band,
        );
        Ok(RasterImage::from_luma(&canvas, request.dpi_x, request.dpi_y))
    }
}

impl BarcodeRender for Renderer {
    type Raster = RasterImage;

    fn render(&self, request: &RenderRequest) -> Result<RasterImage, RenderFailure> {
        Renderer::render(self, request)
    }
}

fn compose_matrix(grid: &ModuleGrid, request: &RenderRequest) -> Result<RasterImage, RenderFailure> {
    let sx = (f64::from(request.dpi_x) / f64::from(BASE_DPI)).max(MIN_MATRIX_SCALE);
    let sy = (f64::from(request.dpi_y) / f64::from(BASE_DPI)).max(MIN_MATRIX_SCALE);
    let chars = request.data.chars().count().max(MIN_WIDTH_CHARS) as f64;
    let box_w = (f64::from(request.module_width) * chars * sx).round() as u64;
    let box_h = (f64::from(request.barcode_height) * sy).round() as u64;

    let grid_w = u64::from(grid.width + 2 * QUIET_MODULES);
    let grid_h = u64::from(grid.height + 2 * QUIET_MODULES);
    let cell = (box_w / grid_w)
        .min(box_h / grid_h)
        .max(sx.min(sy).floor() as u64)
        .max(1);

    let canvas_w = checked_dim(box_w.max(grid_w * cell))?;
    let canvas_h = checked_dim(box_h.max(grid_h * cell))?;
    let left = (u64::from(canvas_w) - grid_w * cell) / 2 + u64::from(QUIET_MODULES) * cell;
    let top = (u64::from(canvas_h) - grid_h * cell) / 2 + u64::from(QUIET_MODULES) * cell;
    checked_area(canvas_w, canvas_h)?;

    let mut img = GrayImage::from_pixel(canvas_w, canvas_h, WHITE);
    for my in 0..grid.height {
        for mx in 0..grid.width {
            if !grid.is_dark(mx, my) {
                continue;
            }
            let x0 = left + u64::from(mx) * cell;
            let y0 = top + u64::from(my) * cell;
            for y in y0..y0 + cell {
                for x in x0..x0 + cell {
                    img.put_pixel(x as u32, y as u32, BLACK);
                }
            }
        }
    }
    Ok(RasterImage::from_luma(&img, request.dpi_x, request.dpi_y))
}

fn checked_dim(v: u64) -> Result<u32, RenderFailure> {
    match u32::try_from(v) {
        Ok(d) if d > 0 && d <= MAX_DIMENSION => Ok(d),
        _ => Err(RenderFailure::new(format!(
            "image dimension {v} is outside 1..={MAX_DIMENSION}"
        ))),
    }
}

fn checked_area(w: u32, h: u32) -> Result<(), RenderFailure> {
    let area = u64::from(w) * u64::from(h);
    if area > MAX_PIXELS {
        return Err(RenderFailure::new(format!(
            "image of {w}x{h} pixels exceeds the {MAX_PIXELS} pixel limit"
        )));
    }
    Ok(())
}

fn scaled(v: u32, scale: f64) -> Result<u32, RenderFailure> {
    checked_dim(((f64::from(v) * scale).round() as u64).max(1))
}
