//! Terminal output: ariadne reports for invalid batch rows, and the output
//! format switch shared by every command.

use std::io::{self, IsTerminal};

use ariadne::{Color, Config, Fmt, Label, Report, ReportKind, Source};
use labelbatch_core::ingest::Row;
use labelbatch_core::{Symbology, Verdict};
use serde::Serialize;

// ── Output format ───────────────────────────────────────────────────────

/// How command results are written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Format {
    /// Coloured, source-annotated output (ariadne) on stderr.
    Pretty,
    /// Machine-readable JSON on stdout.
    Json,
}

impl Format {
    /// Use the explicit choice, else pretty for terminals and JSON for pipes.
    pub(crate) fn resolve_or_detect(explicit: Option<&str>) -> Self {
        match explicit {
            Some("json") => Format::Json,
            Some("pretty") => Format::Pretty,
            _ => {
                if io::stdout().is_terminal() {
                    Format::Pretty
                } else {
                    Format::Json
                }
            }
        }
    }
}

/// Print `value` as pretty JSON on stdout.
pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ── Validation reports ──────────────────────────────────────────────────

/// One validated row of a batch file.
#[derive(Debug, Serialize)]
pub(crate) struct CheckedRow {
    /// Dense 0-based item index.
    pub(crate) index: usize,
    /// 1-based source line.
    pub(crate) line: usize,
    pub(crate) data: String,
    pub(crate) symbology: Symbology,
    pub(crate) quantity: u32,
    pub(crate) is_valid: bool,
    pub(crate) message: &'static str,
    #[serde(skip)]
    pub(crate) span: std::ops::Range<usize>,
}

impl CheckedRow {
    pub(crate) fn new(index: usize, row: &Row, verdict: Verdict) -> Self {
        Self {
            index,
            line: row.line,
            data: row.item.data.clone(),
            symbology: row.item.symbology,
            quantity: row.item.quantity,
            is_valid: verdict.is_valid,
            message: verdict.message,
            span: row.span.clone(),
        }
    }
}

/// Render one report per invalid row to stderr, pointing at the row in the
/// source text.
pub(crate) fn render_invalid_rows(source: &str, filename: &str, rows: &[CheckedRow]) {
    let config = Config::default().with_compact(false);
    let mut cache = (filename, Source::from(source));

    for row in rows.iter().filter(|r| !r.is_valid) {
        let start = row.span.start.min(source.len());
        let end = row.span.end.min(source.len()).max(start);

        Report::build(ReportKind::Error, (filename, start..end))
            .with_code(row.symbology.name())
            .with_message(format!("item {} cannot be encoded", row.index))
            .with_config(config)
            .with_label(
                Label::new((filename, start..end))
                    .with_message(row.message)
                    .with_color(Color::Red),
            )
            .with_note(format!("line {}, quantity {}", row.line, row.quantity))
            .finish()
            .eprint(&mut cache)
            .ok();
    }
}

/// Print a coloured `N valid, M invalid` line to stderr.
pub(crate) fn print_summary(rows: &[CheckedRow]) {
    let invalid = rows.iter().filter(|r| !r.is_valid).count();
    let valid = rows.len() - invalid;

    let mut parts = vec![format!("{}", format!("{valid} valid").fg(Color::Green))];
    if invalid > 0 {
        parts.push(format!("{}", format!("{invalid} invalid").fg(Color::Red)));
    }
    eprintln!("{}", parts.join(", "));
}
