//! Supported barcode symbologies and their rendering families.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A barcode encoding standard.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Symbology {
    /// Code 128 (linear, full ASCII).
    #[default]
    Code128,
    /// EAN-13 retail code (linear, 12 or 13 digits).
    #[serde(rename = "EAN13")]
    Ean13,
    /// Code 39 (linear, uppercase alphanumeric subset).
    Code39,
    /// QR Code (matrix).
    #[serde(rename = "QRCode")]
    QrCode,
    /// Data Matrix ECC 200 (matrix).
    DataMatrix,
}

/// Rendering family: linear symbologies carry an optional human-readable
/// label, matrix symbologies never do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    /// One-dimensional bar/space patterns.
    Linear,
    /// Two-dimensional module grids.
    Matrix,
}

impl Symbology {
    /// Every supported symbology, in declaration order.
    pub const ALL: [Symbology; 5] = [
        Symbology::Code128,
        Symbology::Ean13,
        Symbology::Code39,
        Symbology::QrCode,
        Symbology::DataMatrix,
    ];

    /// Canonical name, as used in batch files and exports.
    pub fn name(self) -> &'static str {
        match self {
            Symbology::Code128 => "Code128",
            Symbology::Ean13 => "EAN13",
            Symbology::Code39 => "Code39",
            Symbology::QrCode => "QRCode",
            Symbology::DataMatrix => "DataMatrix",
        }
    }

    /// The rendering family this symbology belongs to.
    pub fn family(self) -> Family {
        match self {
            Symbology::Code128 | Symbology::Ean13 | Symbology::Code39 => Family::Linear,
            Symbology::QrCode | Symbology::DataMatrix => Family::Matrix,
        }
    }
}

impl fmt::Display for Symbology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error returned when a symbology name is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown symbology: {0}")]
pub struct UnknownSymbology(pub String);

impl FromStr for Symbology {
    type Err = UnknownSymbology;

    /// Case-insensitive match against the canonical names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        Symbology::ALL
            .into_iter()
            .find(|sym| sym.name().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| UnknownSymbology(trimmed.to_string()))
    }
}
