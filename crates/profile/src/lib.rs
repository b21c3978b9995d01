//! Label profile definitions and validation for label-batch.

use labelbatch_core::{RenderSettings, Symbology};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Device pixels per millimetre used when mapping label sizes to a page
/// (96 px per inch).
pub const PX_PER_MM: f64 = 3.779528;

/// Lowest supported output resolution.
pub const MIN_DPI: u32 = 72;
/// Highest supported output resolution.
pub const MAX_DPI: u32 = 1200;
/// Largest accepted label edge, in millimetres.
pub const MAX_LABEL_MM: f64 = 2000.0;

/// Errors that can occur when loading or validating a label profile.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProfileError {
    /// JSON deserialization failed.
    #[error("invalid profile JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// A field value is out of its valid range.
    #[error("invalid {field}: {reason}")]
    InvalidField {
        /// The name of the field that failed validation.
        field: String,
        /// A human-readable explanation of why the field value is invalid.
        reason: String,
    },
}

fn invalid(field: &str, reason: impl Into<String>) -> ProfileError {
    ProfileError::InvalidField {
        field: field.into(),
        reason: reason.into(),
    }
}

/// A label profile: output resolution, physical label size, and the
/// render settings applied to items without overrides.
///
/// # Example
/// ```
/// let profile = labelbatch_profile::Profile {
///     id: "shipping-4x2".into(),
///     schema_version: "1.0.0".into(),
///     dpi: 203,
///     label: labelbatch_profile::LabelLayout::four_by_two_inch(),
///     defaults: labelbatch_profile::RenderDefaults::default(),
/// };
/// assert_eq!(profile.label.size_px(), (384, 192));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    /// Unique profile identifier (e.g., `"shipping-4x2"`).
    pub id: String,
    /// Profile schema version for forward compatibility (e.g., `"1.0.0"`).
    pub schema_version: String,
    /// Render resolution in dots per inch.
    pub dpi: u32,
    /// Physical label size.
    #[serde(default)]
    pub label: LabelLayout,
    /// Settings for items that carry no overrides.
    #[serde(default)]
    pub defaults: RenderDefaults,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            id: "default".into(),
            schema_version: "1.0.0".into(),
            dpi: 96,
            label: LabelLayout::default(),
            defaults: RenderDefaults::default(),
        }
    }
}

impl Profile {
    /// Batch-level render settings.
    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            module_width: self.defaults.module_width,
            barcode_height: self.defaults.barcode_height,
            show_text: self.defaults.show_text,
        }
    }
}

/// A named physical label size in millimetres.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LabelLayout {
    /// Display name (e.g., `"A4"`).
    pub name: String,
    /// Width in millimetres.
    pub width_mm: f64,
    /// Height in millimetres.
    pub height_mm: f64,
}

impl Default for LabelLayout {
    fn default() -> Self {
        Self::a4()
    }
}

impl LabelLayout {
    /// ISO A4 sheet, 210 × 297 mm.
    pub fn a4() -> Self {
        Self::new("A4", 210.0, 297.0)
    }

    /// 2 × 1 inch label.
    pub fn two_by_one_inch() -> Self {
        Self::new("2x1 inch", 50.8, 25.4)
    }

    /// 4 × 2 inch label.
    pub fn four_by_two_inch() -> Self {
        Self::new("4x2 inch", 101.6, 50.8)
    }

    fn new(name: &str, width_mm: f64, height_mm: f64) -> Self {
        Self {
            name: name.into(),
            width_mm,
            height_mm,
        }
    }

    /// The built-in layouts, A4 first.
    pub fn presets() -> Vec<LabelLayout> {
        vec![Self::a4(), Self::two_by_one_inch(), Self::four_by_two_inch()]
    }

    /// Look up a built-in layout by name (case-insensitive).
    pub fn preset(name: &str) -> Option<LabelLayout> {
        Self::presets()
            .into_iter()
            .find(|l| l.name.eq_ignore_ascii_case(name.trim()))
    }

    /// Size in device pixels, rounded to the nearest pixel.
    pub fn size_px(&self) -> (u32, u32) {
        let px = |mm: f64| (mm * PX_PER_MM).round().max(0.0) as u32;
        (px(self.width_mm), px(self.height_mm))
    }
}

/// Render defaults applied to items that carry no overrides.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RenderDefaults {
    /// Symbology assigned to ingested rows without one.
    pub symbology: Symbology,
    /// Narrowest bar or cell width, in pixels at 96 DPI.
    pub module_width: u32,
    /// Bar height, in pixels at 96 DPI.
    pub barcode_height: u32,
    /// Append a human-readable label to linear symbologies.
    pub show_text: bool,
}

impl Default for RenderDefaults {
    fn default() -> Self {
        let settings = RenderSettings::default();
        Self {
            symbology: Symbology::default(),
            module_width: settings.module_width,
            barcode_height: settings.barcode_height,
            show_text: settings.show_text,
        }
    }
}

/// Load and validate a [`Profile`] from a JSON string.
///
/// The `id`, `schema_version`, and `dpi` fields are required; `label` and
/// `defaults` fall back to A4 and the standard render settings.
///
/// Performs structural validation after deserialization:
/// - `id` and `schema_version` must be non-empty
/// - `dpi` must be in range 72–1200
/// - `label.name` must be non-empty
/// - `label.width_mm` and `label.height_mm` must be finite, > 0 and <= 2000
/// - `defaults.module_width` and `defaults.barcode_height` must be > 0
pub fn load_profile_from_str(s: &str) -> Result<Profile, ProfileError> {
    let profile: Profile = serde_json::from_str(s)?;

    // -- Required string field validation --
    if profile.id.trim().is_empty() {
        return Err(invalid("id", "must not be empty"));
    }
    if profile.schema_version.trim().is_empty() {
        return Err(invalid("schema_version", "must not be empty"));
    }

    // -- DPI validation --
    if profile.dpi < MIN_DPI {
        return Err(invalid(
            "dpi",
            format!("{} is below minimum supported DPI ({MIN_DPI})", profile.dpi),
        ));
    }
    if profile.dpi > MAX_DPI {
        return Err(invalid(
            "dpi",
            format!("{} exceeds maximum supported DPI ({MAX_DPI})", profile.dpi),
        ));
    }

    // -- Label validation --
    if profile.label.name.trim().is_empty() {
        return Err(invalid("label.name", "must not be empty"));
    }
    for (field, mm) in [
        ("label.width_mm", profile.label.width_mm),
        ("label.height_mm", profile.label.height_mm),
    ] {
        if !mm.is_finite() || mm <= 0.0 {
            return Err(invalid(field, "must be > 0"));
        }
        if mm > MAX_LABEL_MM {
            return Err(invalid(
                field,
                format!("{mm} exceeds maximum label size ({MAX_LABEL_MM} mm)"),
            ));
        }
    }

    // -- Render default validation --
    if profile.defaults.module_width == 0 {
        return Err(invalid("defaults.module_width", "must be > 0"));
    }
    if profile.defaults.barcode_height == 0 {
        return Err(invalid("defaults.barcode_height", "must be > 0"));
    }

    Ok(profile)
}
