//! Batch ingestion from delimited or line-oriented text.
//!
//! Tabular input may start with a header row; column roles are then
//! resolved heuristically from the header cell names. Without a header the
//! first column holds the data and every other column is ignored.

mod csv;

use std::fs;
use std::io::{self, BufRead, BufReader};
use std::ops::Range;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::item::Item;
use crate::symbology::Symbology;

pub use csv::escape_field;
use csv::{Record, read_records};

/// Field separator for tabular batch files.
pub const SEPARATOR: char = ',';

/// Number of leading lines sniffed by [`looks_like_tabular`].
const SNIFF_LINES: usize = 5;

const HEADER_KEYWORDS: [&str; 3] = ["data", "symbology", "quantity"];

/// Errors raised while reading a batch file.
///
/// On any error no items are returned, so callers can keep their current
/// batch untouched.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The file does not exist.
    #[error("batch file not found: {}", .path.display())]
    NotFound {
        /// The path that was opened.
        path: PathBuf,
        /// The underlying OS error.
        #[source]
        source: io::Error,
    },

    /// The file exists but could not be opened for reading.
    #[error("access denied reading batch file: {}", .path.display())]
    PermissionDenied {
        /// The path that was opened.
        path: PathBuf,
        /// The underlying OS error.
        #[source]
        source: io::Error,
    },

    /// Any other I/O failure, including non-UTF-8 content.
    #[error("failed to read batch file: {}", .path.display())]
    Io {
        /// The path that was opened.
        path: PathBuf,
        /// The underlying OS error.
        #[source]
        source: io::Error,
    },
}

impl IngestError {
    fn from_io(path: &Path, source: io::Error) -> Self {
        let path = path.to_path_buf();
        match source.kind() {
            io::ErrorKind::NotFound => IngestError::NotFound { path, source },
            io::ErrorKind::PermissionDenied => IngestError::PermissionDenied { path, source },
            _ => IngestError::Io { path, source },
        }
    }
}

/// An ingested item together with where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    /// The parsed item.
    pub item: Item,
    /// 1-based line number of the row in the source text.
    pub line: usize,
    /// Byte range of the row in the source text.
    pub span: Range<usize>,
}

// ── Column roles ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Data,
    Symbology,
    Quantity,
    ModuleWidth,
    Height,
    ShowText,
}

/// Header keywords per role, in resolution order.
const ROLE_KEYWORDS: [(Role, &[&str]); 6] = [
    (Role::Data, &["data", "value", "code"]),
    (Role::Symbology, &["symbology", "type", "format"]),
    (Role::Quantity, &["quantity", "qty", "count"]),
    (Role::ModuleWidth, &["module", "width"]),
    (Role::Height, &["height"]),
    (Role::ShowText, &["showtext", "text"]),
];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Columns {
    data: usize,
    symbology: Option<usize>,
    quantity: Option<usize>,
    module_width: Option<usize>,
    height: Option<usize>,
    show_text: Option<usize>,
}

impl Columns {
    fn from_header(cells: &[String]) -> Self {
        let mut data = None;
        let mut cols = Columns::default();
        for (i, cell) in cells.iter().enumerate() {
            let name = cell.trim().to_lowercase();
            for (role, keywords) in ROLE_KEYWORDS {
                if !keywords.iter().any(|k| name.contains(k)) {
                    continue;
                }
                let slot = match role {
                    Role::Data => &mut data,
                    Role::Symbology => &mut cols.symbology,
                    Role::Quantity => &mut cols.quantity,
                    Role::ModuleWidth => &mut cols.module_width,
                    Role::Height => &mut cols.height,
                    Role::ShowText => &mut cols.show_text,
                };
                if slot.is_none() {
                    *slot = Some(i);
                    break;
                }
            }
        }
        cols.data = data.unwrap_or(0);
        cols
    }
}

fn is_header(raw: &str) -> bool {
    if !raw.contains(SEPARATOR) {
        return false;
    }
    let lower = raw.to_lowercase();
    HEADER_KEYWORDS.iter().any(|k| lower.contains(k))
}

fn cell(fields: &[String], col: Option<usize>) -> Option<&str> {
    col.and_then(|c| fields.get(c)).map(|s| s.trim())
}

fn parse_positive(s: Option<&str>) -> Option<u32> {
    s.and_then(|v| v.parse::<u32>().ok()).filter(|&v| v > 0)
}

fn parse_bool(s: Option<&str>) -> Option<bool> {
    match s?.to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn parse_quantity(s: Option<&str>) -> u32 {
    match s.and_then(|v| v.parse::<i64>().ok()) {
        Some(q) if q > 0 => u32::try_from(q).unwrap_or(u32::MAX),
        _ => 1,
    }
}

fn row_from_record(
    record: &Record,
    cols: &Columns,
    default_symbology: Symbology,
) -> Option<Row> {
    let fields = &record.fields;
    let data = cell(fields, Some(cols.data)).unwrap_or_default();
    if data.is_empty() {
        return None;
    }

    let symbology = cell(fields, cols.symbology)
        .and_then(|s| s.parse::<Symbology>().ok())
        .unwrap_or(default_symbology);

    let item = Item {
        data: data.to_string(),
        symbology,
        quantity: parse_quantity(cell(fields, cols.quantity)),
        module_width: parse_positive(cell(fields, cols.module_width)),
        barcode_height: parse_positive(cell(fields, cols.height)),
        show_text: parse_bool(cell(fields, cols.show_text)),
    };

    Some(Row {
        item,
        line: record.line,
        span: record.span.clone(),
    })
}

// ── Public API ──────────────────────────────────────────────────────────

/// Parse delimited text into rows, keeping source positions.
pub fn parse_rows(raw: &str, default_symbology: Symbology) -> Vec<Row> {
    let records: Vec<Record> = read_records(raw, SEPARATOR)
        .into_iter()
        .filter(|r| !r.raw(raw).trim().is_empty())
        .collect();

    let Some(first) = records.first() else {
        return Vec::new();
    };

    let has_header = is_header(first.raw(raw));
    let cols = if has_header {
        Columns::from_header(&first.fields)
    } else {
        Columns::default()
    };
    debug!(has_header, ?cols, "resolved batch columns");

    records
        .iter()
        .skip(usize::from(has_header))
        .filter_map(|r| row_from_record(r, &cols, default_symbology))
        .collect()
}

/// Parse delimited text into ordered items.
pub fn parse(raw: &str, default_symbology: Symbology) -> Vec<Item> {
    parse_rows(strip_bom(raw), default_symbology)
        .into_iter()
        .map(|r| r.item)
        .collect()
}

const BOM: char = '\u{feff}';

/// `raw` without a leading UTF-8 byte order mark.
fn strip_bom(raw: &str) -> &str {
    raw.strip_prefix(BOM).unwrap_or(raw)
}

/// Parse plain text, one item per non-blank line.
pub fn parse_lines(raw: &str, default_symbology: Symbology) -> Vec<Item> {
    parse_line_rows(strip_bom(raw), default_symbology)
        .into_iter()
        .map(|r| r.item)
        .collect()
}

fn parse_line_rows(raw: &str, default_symbology: Symbology) -> Vec<Row> {
    let mut rows = Vec::new();
    let mut offset = 0usize;
    for (i, line) in raw.split('\n').enumerate() {
        let start = offset;
        offset += line.len() + 1;
        let data = line.trim();
        if data.is_empty() {
            continue;
        }
        rows.push(Row {
            item: Item::new(data, default_symbology),
            line: i + 1,
            span: start..start + line.trim_end_matches('\r').len(),
        });
    }
    rows
}

/// Whether the first lines of `text` look comma-separated.
pub fn looks_like_tabular_text(text: &str) -> bool {
    text.lines()
        .take(SNIFF_LINES)
        .any(|l| l.contains(SEPARATOR) && l.split(SEPARATOR).count() > 1)
}

/// Whether `path` should be ingested as tabular data.
///
/// True for a `.csv` extension, or when one of the first few lines contains
/// the separator. Unreadable files are reported as not tabular.
pub fn looks_like_tabular(path: &Path) -> bool {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    if is_csv {
        return true;
    }

    let Ok(file) = fs::File::open(path) else {
        return false;
    };
    BufReader::new(file)
        .lines()
        .take(SNIFF_LINES)
        .map_while(Result::ok)
        .any(|l| l.contains(SEPARATOR) && l.split(SEPARATOR).count() > 1)
}

/// Read a batch file, choosing tabular or line mode.
pub fn load_file_rows(
    path: &Path,
    default_symbology: Symbology,
) -> Result<(String, Vec<Row>), IngestError> {
    let mut text = fs::read_to_string(path).map_err(|e| IngestError::from_io(path, e))?;
    if let Some(rest) = text.strip_prefix(BOM) {
        text = rest.to_string();
    }

    let is_csv_ext = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
    let rows = if is_csv_ext || looks_like_tabular_text(&text) {
        parse_rows(&text, default_symbology)
    } else {
        parse_line_rows(&text, default_symbology)
    };
    debug!(path = %path.display(), rows = rows.len(), "loaded batch file");
    Ok((text, rows))
}

/// Read a batch file into ordered items.
pub fn load_file(path: &Path, default_symbology: Symbology) -> Result<Vec<Item>, IngestError> {
    let (_, rows) = load_file_rows(path, default_symbology)?;
    Ok(rows.into_iter().map(|r| r.item).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headerless_rows_use_first_column() {
        let items = parse("ABC123,ignored\nXYZ\n", Symbology::Code39);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].data, "ABC123");
        assert_eq!(items[0].symbology, Symbology::Code39);
        assert_eq!(items[0].quantity, 1);
        assert_eq!(items[1].data, "XYZ");
    }

    #[test]
    fn header_resolves_columns_in_any_order() {
        let text = "Quantity,Type,Value\n3,qrcode,hello\n0,bogus,world\n";
        let items = parse(text, Symbology::Code128);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].data, "hello");
        assert_eq!(items[0].symbology, Symbology::QrCode);
        assert_eq!(items[0].quantity, 3);
        assert_eq!(items[1].symbology, Symbology::Code128);
        assert_eq!(items[1].quantity, 1);
    }

    #[test]
    fn exported_header_maps_every_column() {
        let text = "Data,Symbology,Quantity,ModuleWidth,BarcodeHeight,ShowText\n\
                    A1,Code39,2,3,80,False\n\
                    B2,EAN13,1,,,\n";
        let items = parse(text, Symbology::Code128);
        assert_eq!(items[0].data, "A1");
        assert_eq!(items[0].module_width, Some(3));
        assert_eq!(items[0].barcode_height, Some(80));
        assert_eq!(items[0].show_text, Some(false));
        assert_eq!(items[1].module_width, None);
        assert_eq!(items[1].barcode_height, None);
        assert_eq!(items[1].show_text, None);
    }

    #[test]
    fn header_requires_separator_and_keyword() {
        // A single "data" line without a separator is an item, not a header.
        let items = parse("data\nmore\n", Symbology::Code128);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].data, "data");

        // Separator but no keyword: still data.
        let items = parse("A,B\nC,D\n", Symbology::Code128);
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn blank_lines_and_empty_data_are_skipped() {
        let text = "\n\nData,Qty\n\n  ,5\nX,2\n\n";
        let items = parse(text, Symbology::Code128);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].data, "X");
        assert_eq!(items[0].quantity, 2);
    }

    #[test]
    fn invalid_numbers_fall_back() {
        let text = "data,quantity,module,height,showtext\nA,-4,0,abc,maybe\n";
        let items = parse(text, Symbology::Code128);
        assert_eq!(items[0].quantity, 1);
        assert_eq!(items[0].module_width, None);
        assert_eq!(items[0].barcode_height, None);
        assert_eq!(items[0].show_text, None);
    }

    #[test]
    fn quoted_fields_preserve_separators() {
        let text = "data,symbology\n\"A,B\",Code128\n\"He said \"\"hi\"\"\",QRCode\n";
        let items = parse(text, Symbology::Code39);
        assert_eq!(items[0].data, "A,B");
        assert_eq!(items[1].data, "He said \"hi\"");
        assert_eq!(items[1].symbology, Symbology::QrCode);
    }

    #[test]
    fn rows_carry_line_numbers() {
        let text = "data\n\nfirst\nsecond";
        // No separator on the first line, so it is an item too.
        let rows = parse_rows(text, Symbology::Code128);
        assert_eq!(
            rows.iter().map(|r| r.line).collect::<Vec<_>>(),
            vec![1, 3, 4]
        );
        assert_eq!(&text[rows[2].span.clone()], "second");
    }

    #[test]
    fn line_mode_trims_and_skips_blanks() {
        let items = parse_lines("  one \r\n\n two,three\n", Symbology::Ean13);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].data, "one");
        assert_eq!(items[1].data, "two,three");
        assert!(items.iter().all(|i| i.symbology == Symbology::Ean13));
    }

    #[test]
    fn tabular_sniffing() {
        assert!(looks_like_tabular_text("a,b\n"));
        assert!(!looks_like_tabular_text("a\nb\nc\nd\ne\nf,g\n"));
        assert!(!looks_like_tabular_text(""));
    }

    #[test]
    fn tabular_by_extension_or_content() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("batch.CSV");
        fs::write(&csv, "one\ntwo\n").unwrap();
        assert!(looks_like_tabular(&csv));

        let txt = dir.path().join("batch.txt");
        fs::write(&txt, "one\ntwo\n").unwrap();
        assert!(!looks_like_tabular(&txt));

        fs::write(&txt, "one,1\n").unwrap();
        assert!(looks_like_tabular(&txt));

        assert!(!looks_like_tabular(&dir.path().join("missing.txt")));
    }

    #[test]
    fn load_file_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_file(&dir.path().join("nope.csv"), Symbology::Code128).unwrap_err();
        assert!(matches!(err, IngestError::NotFound { .. }), "got {err:?}");
    }

    #[test]
    fn load_file_picks_mode() {
        let dir = tempfile::tempdir().unwrap();
        let txt = dir.path().join("lines.txt");
        fs::write(&txt, "A B C\nD\n").unwrap();
        let items = load_file(&txt, Symbology::Code39).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].data, "A B C");

        let csv = dir.path().join("rows.csv");
        fs::write(&csv, "Data,Quantity\nA,3\n").unwrap();
        let items = load_file(&csv, Symbology::Code39).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 3);
    }

    #[test]
    fn byte_order_mark_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("excel.csv");
        fs::write(&csv, "\u{feff}ABC,1\nXYZ,2\n").unwrap();
        let items = load_file(&csv, Symbology::Code39).unwrap();
        assert_eq!(items[0].data, "ABC");
        assert!(crate::validate::validate(&items[0].data, Symbology::Code39).is_valid);

        let txt = dir.path().join("lines.txt");
        fs::write(&txt, "\u{feff}ABC123\nDEF\n").unwrap();
        let (text, rows) = load_file_rows(&txt, Symbology::Code128).unwrap();
        assert_eq!(rows[0].item.data, "ABC123");
        assert!(!text.starts_with('\u{feff}'));

        assert_eq!(parse("\u{feff}ABC,1\n", Symbology::Code39)[0].data, "ABC");
        assert_eq!(parse_lines("\u{feff}ABC\n", Symbology::Code39)[0].data, "ABC");
    }
}
