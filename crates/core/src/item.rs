//! Batch item records and per-item render settings.

use serde::{Deserialize, Serialize};

use crate::symbology::Symbology;

/// One entry of a print batch.
///
/// The optional fields are per-item overrides; `None` inherits the batch
/// default (see [`Item::effective_settings`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    /// Payload to encode.
    pub data: String,
    /// Symbology to encode the payload with.
    pub symbology: Symbology,
    /// Number of copies to print. Always >= 1.
    pub quantity: u32,
    /// Module width override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module_width: Option<u32>,
    /// Barcode height override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barcode_height: Option<u32>,
    /// Human-readable label override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_text: Option<bool>,
}

impl Item {
    /// A single-copy item with no overrides.
    pub fn new(data: impl Into<String>, symbology: Symbology) -> Self {
        Self {
            data: data.into(),
            symbology,
            quantity: 1,
            module_width: None,
            barcode_height: None,
            show_text: None,
        }
    }

    /// Set the copy count, clamped to at least 1.
    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = quantity.max(1);
        self
    }

    /// Resolve overrides against the batch defaults.
    pub fn effective_settings(&self, defaults: &RenderSettings) -> RenderSettings {
        RenderSettings {
            module_width: self.module_width.unwrap_or(defaults.module_width),
            barcode_height: self.barcode_height.unwrap_or(defaults.barcode_height),
            show_text: self.show_text.unwrap_or(defaults.show_text),
        }
    }
}

/// Geometry and label settings applied when rendering an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderSettings {
    /// Width of the narrowest bar or cell, in pixels at 96 DPI.
    pub module_width: u32,
    /// Bar height, in pixels at 96 DPI.
    pub barcode_height: u32,
    /// Append a human-readable label (linear symbologies only).
    pub show_text: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            module_width: 2,
            barcode_height: 100,
            show_text: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_win_over_defaults() {
        let mut item = Item::new("ABC", Symbology::Code128);
        item.module_width = Some(4);
        item.show_text = Some(false);
        let eff = item.effective_settings(&RenderSettings::default());
        assert_eq!(
            eff,
            RenderSettings {
                module_width: 4,
                barcode_height: 100,
                show_text: false,
            }
        );
    }

    #[test]
    fn quantity_is_clamped() {
        assert_eq!(Item::new("x", Symbology::Code39).with_quantity(0).quantity, 1);
        assert_eq!(Item::new("x", Symbology::Code39).with_quantity(7).quantity, 7);
    }

    #[test]
    fn absent_overrides_are_not_serialized() {
        let json = serde_json::to_value(Item::new("42", Symbology::QrCode)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "data": "42", "symbology": "QRCode", "quantity": 1 })
        );
    }
}
