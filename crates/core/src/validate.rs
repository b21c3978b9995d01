//! Per-symbology grammar and length checks.
//!
//! Validation never fails: every input yields a boolean outcome and a fixed
//! English message. The messages below are part of the public contract.

use serde::Serialize;

use crate::item::Item;
use crate::symbology::Symbology;

/// Message for a valid payload.
pub const MSG_VALID: &str = "valid";
/// Message for a valid 12-digit EAN-13 payload.
pub const MSG_VALID_EAN13_CHECK_DIGIT: &str = "valid (12 digits, check digit will be calculated)";
/// Message for empty or whitespace-only data.
pub const MSG_EMPTY: &str = "data cannot be empty";
/// Message for a Code 128 length violation.
pub const MSG_CODE128_LENGTH: &str = "Code 128 requires 1-80 characters";
/// Message for an EAN-13 violation.
pub const MSG_EAN13_DIGITS: &str = "EAN-13 requires exactly 12 or 13 digits";
/// Message for a Code 39 charset violation.
pub const MSG_CODE39_CHARSET: &str = "Code 39 supports only: 0-9, A-Z, space and -.$/+%";
/// Message for a QR Code length violation.
pub const MSG_QR_LENGTH: &str = "QR code data is too long (maximum 2953 characters)";
/// Message for a Data Matrix length violation.
pub const MSG_DATAMATRIX_LENGTH: &str = "Data Matrix data is too long (maximum 2335 characters)";
/// Message for a symbology name that is not recognised.
pub const MSG_UNKNOWN_SYMBOLOGY: &str = "unknown symbology";

/// Outcome of validating one payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Verdict {
    /// Whether the payload can be encoded.
    pub is_valid: bool,
    /// Fixed message describing the outcome.
    pub message: &'static str,
}

impl Verdict {
    const fn ok(message: &'static str) -> Self {
        Self {
            is_valid: true,
            message,
        }
    }

    const fn reject(message: &'static str) -> Self {
        Self {
            is_valid: false,
            message,
        }
    }
}

/// Validation result for one item of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    /// The item that was validated.
    pub item: Item,
    /// Dense, 0-based position in the validated sequence.
    pub index: usize,
    /// Whether the item can be encoded.
    pub is_valid: bool,
    /// Outcome message.
    pub message: String,
}

// ── Rule table ──────────────────────────────────────────────────────────

enum Rule {
    MaxChars {
        max: usize,
        message: &'static str,
    },
    Ean13Digits,
    Code39Charset,
}

fn rule_for(symbology: Symbology) -> Rule {
    match symbology {
        Symbology::Code128 => Rule::MaxChars {
            max: 80,
            message: MSG_CODE128_LENGTH,
        },
        Symbology::Ean13 => Rule::Ean13Digits,
        Symbology::Code39 => Rule::Code39Charset,
        Symbology::QrCode => Rule::MaxChars {
            max: 2953,
            message: MSG_QR_LENGTH,
        },
        Symbology::DataMatrix => Rule::MaxChars {
            max: 2335,
            message: MSG_DATAMATRIX_LENGTH,
        },
    }
}

impl Rule {
    fn check(&self, data: &str) -> Verdict {
        match self {
            Rule::MaxChars { max, message } => {
                let len = data.chars().count();
                if (1..=*max).contains(&len) {
                    Verdict::ok(MSG_VALID)
                } else {
                    Verdict::reject(message)
                }
            }
            Rule::Ean13Digits => {
                let all_digits = data.bytes().all(|b| b.is_ascii_digit());
                match (all_digits, data.len()) {
                    (true, 12) => Verdict::ok(MSG_VALID_EAN13_CHECK_DIGIT),
                    (true, 13) => Verdict::ok(MSG_VALID),
                    _ => Verdict::reject(MSG_EAN13_DIGITS),
                }
            }
            Rule::Code39Charset => {
                if !data.is_empty() && data.chars().all(is_code39_char) {
                    Verdict::ok(MSG_VALID)
                } else {
                    Verdict::reject(MSG_CODE39_CHARSET)
                }
            }
        }
    }
}

/// Characters representable in (non-extended) Code 39.
pub fn is_code39_char(c: char) -> bool {
    c.is_ascii_digit() || c.is_ascii_uppercase() || matches!(c, ' ' | '-' | '.' | '$' | '/' | '+' | '%')
}

// ── Public API ──────────────────────────────────────────────────────────

/// Validate `data` for `symbology`.
pub fn validate(data: &str, symbology: Symbology) -> Verdict {
    if data.trim().is_empty() {
        return Verdict::reject(MSG_EMPTY);
    }
    rule_for(symbology).check(data)
}

/// Validate `data` against a symbology given by name (case-insensitive).
///
/// Names that do not resolve to a supported symbology are rejected with
/// [`MSG_UNKNOWN_SYMBOLOGY`]. Empty data is reported first.
pub fn validate_named(data: &str, symbology: &str) -> Verdict {
    if data.trim().is_empty() {
        return Verdict::reject(MSG_EMPTY);
    }
    match symbology.parse::<Symbology>() {
        Ok(sym) => rule_for(sym).check(data),
        Err(_) => Verdict::reject(MSG_UNKNOWN_SYMBOLOGY),
    }
}

/// Validate every item, preserving input order for indices.
pub fn validate_batch<'a, I>(items: I) -> Vec<ValidationResult>
where
    I: IntoIterator<Item = &'a Item>,
{
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            let verdict = validate(&item.data, item.symbology);
            ValidationResult {
                item: item.clone(),
                index,
                is_valid: verdict.is_valid,
                message: verdict.message.to_string(),
            }
        })
        .collect()
}
