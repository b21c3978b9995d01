//! Label-batch core library.
//!
//! Provides symbology validation, batch ingestion and export, and barcode
//! raster synthesis. The main entry points are [`validate`] for checking a
//! payload, [`ingest::parse`] / [`ingest::load_file`] for reading batches,
//! and [`Renderer::render`] for producing a [`RasterImage`].

#![warn(missing_docs)]

/// Editable batches with a live validation snapshot.
pub mod batch;
/// CSV, plain-text, and validation-report export.
pub mod export;
/// Batch file ingestion (tabular and line-per-item).
pub mod ingest;
/// Batch items and render settings.
pub mod item;
/// Owned BGRA rasters.
pub mod raster;
/// Barcode raster synthesis.
pub mod render;
/// Supported symbologies.
pub mod symbology;
/// Per-symbology payload validation.
pub mod validate;

// ── Convenience re-exports ──────────────────────────────────────────────────
// Flat imports for the most common entry points. The full module paths
// remain available for less common types.

// Model
pub use item::{Item, RenderSettings};
pub use symbology::{Family, Symbology, UnknownSymbology};

// Validation
pub use validate::{ValidationResult, Verdict, validate, validate_batch, validate_named};

// Ingestion and export
pub use batch::{Batch, StatusFilter};
pub use export::{export_csv, export_text, export_validation_results};
pub use ingest::{IngestError, Row};

// Rendering
pub use raster::RasterImage;
pub use render::{BarcodeRender, FontError, LabelFont, RenderFailure, RenderRequest, Renderer};
