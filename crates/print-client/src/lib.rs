//! Label-batch print client: run a batch through a print sink.
//!
//! The [`Orchestrator`] validates, pre-renders, and prints a range of items
//! through any [`PrintSink`]. Two sinks ship with the crate:
//! [`DirectorySink`] writes one PNG per page, and `ZplTcpSink` (feature
//! `tcp`) streams pages as ZPL graphics to a network label printer.
//! [`BatchWorker`] runs the orchestrator on a dedicated thread.
//!
//! The core API is synchronous (`std::thread`, `std::sync::mpsc`), with no
//! async runtime required.
#[cfg(feature = "tcp")]
mod addr;
mod config;
mod directory;
mod error;
mod orchestrator;
mod page;
#[cfg(feature = "tcp")]
mod tcp;
mod worker;
pub mod zpl;

#[cfg(feature = "tcp")]
pub use addr::{DEFAULT_PORT, resolve_printer_addr};
pub use config::{BatchPrintOptions, PrinterConfig, PrinterTimeouts};
pub use directory::{DirectoryDocument, DirectorySink};
pub use error::{BatchError, PrintError};
pub use orchestrator::{
    CancelToken, Failure, Orchestrator, Phase, Progress, RunOutcome, RunResult, RunState,
    STATUS_GENERATING,
};
pub use page::compose_page;
#[cfg(feature = "tcp")]
pub use tcp::{ZplDocument, ZplTcpSink};
pub use worker::BatchWorker;

use labelbatch_core::RasterImage;
use labelbatch_profile::LabelLayout;

// ── Geometry ────────────────────────────────────────────────────────────

/// Destination rectangle on a page, in device pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct DestRect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width.
    pub width: u32,
    /// Height.
    pub height: u32,
}

impl DestRect {
    /// The label's rectangle, at the page origin or centred on `page` when
    /// the page size is known.
    pub fn for_label(label: &LabelLayout, page: Option<(u32, u32)>) -> Self {
        let (width, height) = label.size_px();
        let (x, y) = match page {
            Some((pw, ph)) => (pw.saturating_sub(width) / 2, ph.saturating_sub(height) / 2),
            None => (0, 0),
        };
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether the rectangle covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

// ── Traits ──────────────────────────────────────────────────────────────

/// A print destination with document/page semantics. All sinks implement
/// this.
///
/// A run opens exactly one document, draws every page into it, and always
/// ends it, even when the run is cancelled or aborted.
pub trait PrintSink {
    /// An open document.
    type Handle;

    /// Names accepted by [`begin_document`](Self::begin_document).
    fn list_printers(&self) -> Result<Vec<String>, PrintError>;

    /// Open a document on `printer`.
    fn begin_document(&mut self, printer: &str) -> Result<Self::Handle, PrintError>;

    /// Draw one page: `raster` scaled into `dest`.
    fn draw_page(
        &mut self,
        handle: &mut Self::Handle,
        raster: &RasterImage,
        dest: DestRect,
    ) -> Result<(), PrintError>;

    /// Finish and release the document.
    fn end_document(&mut self, handle: Self::Handle) -> Result<(), PrintError>;

    /// Printable page size in device pixels, if the sink knows it.
    fn page_size(&self, _handle: &Self::Handle) -> Option<(u32, u32)> {
        None
    }
}

impl<S: PrintSink + ?Sized> PrintSink for &mut S {
    type Handle = S::Handle;

    fn list_printers(&self) -> Result<Vec<String>, PrintError> {
        (**self).list_printers()
    }

    fn begin_document(&mut self, printer: &str) -> Result<Self::Handle, PrintError> {
        (**self).begin_document(printer)
    }

    fn draw_page(
        &mut self,
        handle: &mut Self::Handle,
        raster: &RasterImage,
        dest: DestRect,
    ) -> Result<(), PrintError> {
        (**self).draw_page(handle, raster, dest)
    }

    fn end_document(&mut self, handle: Self::Handle) -> Result<(), PrintError> {
        (**self).end_document(handle)
    }

    fn page_size(&self, handle: &Self::Handle) -> Option<(u32, u32)> {
        (**self).page_size(handle)
    }
}
