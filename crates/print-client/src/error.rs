//! Typed error types for print sinks and batch runs.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

/// Print sink error conditions, categorized by type.
///
/// Each variant carries enough context to produce a helpful error message.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum PrintError {
    // -- Connection --
    /// The printer actively refused the connection (e.g. port not open).
    #[error("connection refused: {addr}")]
    ConnectionRefused {
        /// The address that was attempted.
        addr: String,
        /// The underlying OS error.
        #[source]
        source: io::Error,
    },

    /// TCP connect timed out before the printer responded.
    #[error("connection timed out: {addr} ({timeout:?})")]
    ConnectionTimeout {
        /// The address that was attempted.
        addr: String,
        /// The configured timeout that elapsed.
        timeout: Duration,
        /// The underlying OS error.
        #[source]
        source: io::Error,
    },

    /// Connection failed for a reason other than refusal or timeout.
    #[error("connection failed: {addr}")]
    ConnectionFailed {
        /// The address that was attempted.
        addr: String,
        /// The underlying OS error.
        #[source]
        source: io::Error,
    },

    // -- Address --
    /// DNS resolution found no addresses for the given hostname.
    #[error("no address found for printer: {0}")]
    NoAddressFound(String),

    // -- Printer selection --
    /// The requested printer is not offered by the sink.
    #[error("printer not found: {0}")]
    PrinterNotFound(String),

    // -- I/O --
    /// Writing page data to the printer failed.
    #[error("write failed: {0}")]
    WriteFailed(#[source] io::Error),

    /// A filesystem operation in an output directory failed.
    #[error("I/O error at '{}'", .path.display())]
    Io {
        /// The path being created or written.
        path: PathBuf,
        /// The underlying OS error.
        #[source]
        source: io::Error,
    },

    /// A page could not be encoded for the output format.
    #[error("failed to encode page '{}'", .path.display())]
    Encode {
        /// The page file being written.
        path: PathBuf,
        /// The underlying image error.
        #[source]
        source: image::ImageError,
    },

    // -- Page --
    /// The sink refused a page (e.g. zero-sized destination).
    #[error("page rejected: {0}")]
    PageRejected(String),

    // -- Configuration --
    /// An invalid configuration was provided.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Orchestrator misuse or worker failure. Per-item problems never surface
/// here; they are collected in the run result.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchError {
    /// Another run is already active on this orchestrator.
    #[error("a batch run is already in progress")]
    AlreadyRunning,

    /// The worker thread could not be started.
    #[error("failed to start batch worker: {0}")]
    SpawnFailed(String),

    /// The worker thread panicked before producing a result.
    #[error("batch worker panicked: {0}")]
    WorkerPanicked(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_path() {
        let err = PrintError::Io {
            path: "/out/page-0001.png".into(),
            source: io::Error::other("disk full"),
        };
        assert_eq!(err.to_string(), "I/O error at '/out/page-0001.png'");
        assert_eq!(
            BatchError::AlreadyRunning.to_string(),
            "a batch run is already in progress"
        );
    }
}
