//! ZPL over TCP (port 9100 / JetDirect / RAW).
//!
//! [`ZplTcpSink`] opens one connection per document and sends each page as
//! a self-contained `^GFA` label.

use std::io::{self, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use labelbatch_core::RasterImage;
use socket2::{SockRef, TcpKeepalive};
use tracing::debug;

use crate::addr::resolve_printer_addr;
use crate::{DestRect, PrintError, PrintSink, PrinterConfig, compose_page, zpl};

const BASE_DPI: u64 = 96;

/// A print sink that streams pages to a network label printer.
#[derive(Debug, Clone)]
pub struct ZplTcpSink {
    addr: String,
    config: PrinterConfig,
    dpi: u32,
}

impl ZplTcpSink {
    /// A sink for the printer at `addr` (any form accepted by
    /// [`resolve_printer_addr`]) printing at `dpi` dots per inch.
    pub fn new(addr: impl Into<String>, dpi: u32) -> Self {
        Self {
            addr: addr.into(),
            config: PrinterConfig::default(),
            dpi,
        }
    }

    /// Replace the connection settings.
    pub fn with_config(mut self, config: PrinterConfig) -> Self {
        self.config = config;
        self
    }

    /// The configured printer address.
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Printer resolution in dots per inch.
    pub fn dpi(&self) -> u32 {
        self.dpi
    }

    fn to_dots(&self, px: u32) -> u32 {
        let dots = u64::from(px) * u64::from(self.dpi) / BASE_DPI;
        u32::try_from(dots).unwrap_or(u32::MAX).max(1)
    }
}

/// An open connection to the printer for the duration of one document.
#[derive(Debug)]
pub struct ZplDocument {
    stream: TcpStream,
    addr: SocketAddr,
    pages: usize,
}

impl ZplDocument {
    /// The resolved address of the printer.
    pub fn remote_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Labels sent so far.
    pub fn pages_sent(&self) -> usize {
        self.pages
    }
}

impl Drop for ZplDocument {
    fn drop(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

impl PrintSink for ZplTcpSink {
    type Handle = ZplDocument;

    fn list_printers(&self) -> Result<Vec<String>, PrintError> {
        Ok(vec![self.addr.clone()])
    }

    /// Connect to `printer`, or to the configured address when `printer`
    /// is blank.
    fn begin_document(&mut self, printer: &str) -> Result<ZplDocument, PrintError> {
        if self.dpi == 0 {
            return Err(PrintError::InvalidConfig("printer dpi must be positive".into()));
        }
        let target = if printer.trim().is_empty() {
            self.addr.as_str()
        } else {
            printer
        };
        let addr = resolve_printer_addr(target)?;
        let stream = open_stream(&addr, &self.config)?;
        debug!(%addr, "document opened");
        Ok(ZplDocument {
            stream,
            addr,
            pages: 0,
        })
    }

    fn draw_page(
        &mut self,
        handle: &mut ZplDocument,
        raster: &RasterImage,
        dest: DestRect,
    ) -> Result<(), PrintError> {
        if dest.is_empty() {
            return Err(PrintError::PageRejected(format!(
                "destination {}x{} is empty",
                dest.width, dest.height
            )));
        }
        let (w, h) = (self.to_dots(dest.width), self.to_dots(dest.height));
        let page = compose_page(
            raster,
            w,
            h,
            DestRect {
                x: 0,
                y: 0,
                width: w,
                height: h,
            },
        );
        let label = zpl::label_from_page(&page);
        handle
            .stream
            .write_all(label.as_bytes())
            .map_err(PrintError::WriteFailed)?;
        handle.stream.flush().map_err(PrintError::WriteFailed)?;
        handle.pages += 1;
        debug!(addr = %handle.addr, page = handle.pages, bytes = label.len(), "label sent");
        Ok(())
    }

    fn end_document(&mut self, mut handle: ZplDocument) -> Result<(), PrintError> {
        handle.stream.flush().map_err(PrintError::WriteFailed)?;
        handle
            .stream
            .shutdown(Shutdown::Write)
            .map_err(PrintError::WriteFailed)?;
        debug!(addr = %handle.addr, pages = handle.pages, "document closed");
        Ok(())
    }
}

// ── Helpers ────────────────────────────────────────────────────────────

/// Connect with the configured timeout and set nodelay, keepalive and the
/// write timeout.
fn open_stream(addr: &SocketAddr, config: &PrinterConfig) -> Result<TcpStream, PrintError> {
    let stream = TcpStream::connect_timeout(addr, config.timeouts.connect).map_err(|e| {
        match e.kind() {
            io::ErrorKind::ConnectionRefused => PrintError::ConnectionRefused {
                addr: addr.to_string(),
                source: e,
            },
            io::ErrorKind::TimedOut => PrintError::ConnectionTimeout {
                addr: addr.to_string(),
                timeout: config.timeouts.connect,
                source: e,
            },
            _ => PrintError::ConnectionFailed {
                addr: addr.to_string(),
                source: e,
            },
        }
    })?;

    let failed = |source| PrintError::ConnectionFailed {
        addr: addr.to_string(),
        source,
    };
    stream.set_nodelay(true).map_err(failed)?;
    configure_keepalive(&stream, Duration::from_secs(60)).map_err(failed)?;
    stream
        .set_write_timeout(Some(config.timeouts.write))
        .map_err(failed)?;
    Ok(stream)
}

fn configure_keepalive(stream: &TcpStream, interval: Duration) -> io::Result<()> {
    let keepalive = TcpKeepalive::new().with_time(interval);

    #[cfg(any(target_os = "linux", target_os = "macos"))]
    let keepalive = keepalive.with_interval(interval);

    SockRef::from(stream).set_tcp_keepalive(&keepalive)
}
