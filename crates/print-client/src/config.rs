//! Configuration types for print sinks and batch runs.

use std::time::Duration;

use labelbatch_core::RenderSettings;
use labelbatch_profile::{LabelLayout, Profile};

/// Network printer configuration.
#[non_exhaustive]
#[derive(Debug, Clone, Default)]
pub struct PrinterConfig {
    /// Network/transport timeout settings.
    pub timeouts: PrinterTimeouts,
}

/// Timeout settings for printer connections.
///
/// Defaults are tuned for LAN-connected label printers:
/// - `connect`: 5s
/// - `write`: 30s (a full-page `^GF` graphic can be several hundred KB)
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct PrinterTimeouts {
    /// Maximum time to wait for the connection to establish.
    pub connect: Duration,
    /// Maximum time to wait for a write to complete.
    pub write: Duration,
}

impl Default for PrinterTimeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(5),
            write: Duration::from_secs(30),
        }
    }
}

/// Options for one batch print run.
///
/// `start_index` and `end_index` are inclusive and clamped to the item
/// list, so the defaults select everything.
#[non_exhaustive]
#[derive(Debug, Clone)]
pub struct BatchPrintOptions {
    /// Printer name passed to the sink's `begin_document`.
    pub printer: String,
    /// First item to process (0-based, inclusive).
    pub start_index: usize,
    /// Last item to process (0-based, inclusive).
    pub end_index: usize,
    /// Record failures and keep going instead of aborting the run.
    pub continue_on_error: bool,
    /// Skip items that an earlier run on the same orchestrator printed.
    pub skip_printed_items: bool,
    /// Render resolution.
    pub dpi: u32,
    /// Physical label size each page is scaled into.
    pub label: LabelLayout,
    /// Settings for items without overrides.
    pub defaults: RenderSettings,
}

impl Default for BatchPrintOptions {
    fn default() -> Self {
        Self::from_profile(&Profile::default())
    }
}

impl BatchPrintOptions {
    /// Options carrying a profile's resolution, label size, and render
    /// defaults, covering every item.
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            printer: String::new(),
            start_index: 0,
            end_index: usize::MAX,
            continue_on_error: false,
            skip_printed_items: false,
            dpi: profile.dpi,
            label: profile.label.clone(),
            defaults: profile.render_settings(),
        }
    }

    /// Restrict the run to items `start..=end`.
    pub fn with_range(mut self, start: usize, end: usize) -> Self {
        self.start_index = start;
        self.end_index = end;
        self
    }

    /// Select the printer by name.
    pub fn with_printer(mut self, printer: impl Into<String>) -> Self {
        self.printer = printer.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_everything() {
        let opts = BatchPrintOptions::default();
        assert_eq!(opts.start_index, 0);
        assert_eq!(opts.end_index, usize::MAX);
        assert!(!opts.continue_on_error);
        assert!(!opts.skip_printed_items);
        assert_eq!(opts.dpi, 96);
        assert_eq!(opts.label, LabelLayout::a4());
        assert_eq!(opts.defaults, RenderSettings::default());
    }

    #[test]
    fn profile_values_carry_over() {
        let mut profile = Profile::default();
        profile.dpi = 300;
        profile.label = LabelLayout::two_by_one_inch();
        profile.defaults.show_text = false;
        let opts = BatchPrintOptions::from_profile(&profile)
            .with_range(2, 4)
            .with_printer("dock");
        assert_eq!(opts.dpi, 300);
        assert_eq!(opts.label.name, "2x1 inch");
        assert!(!opts.defaults.show_text);
        assert_eq!((opts.start_index, opts.end_index), (2, 4));
        assert_eq!(opts.printer, "dock");
    }
}
