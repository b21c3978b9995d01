//! Minimal RFC 4180 record reader and field writer.
//!
//! Records end at an unquoted line feed; a carriage return directly before
//! it is dropped. Inside double quotes, separators and line breaks are kept
//! literally and `""` stands for one quote character.

use std::ops::Range;

/// One record of delimited text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Record {
    /// 1-based line number of the record's first line.
    pub(crate) line: usize,
    /// Byte range of the record in the source, excluding the line terminator.
    pub(crate) span: Range<usize>,
    /// Decoded field values.
    pub(crate) fields: Vec<String>,
}

impl Record {
    /// The record's raw source text.
    pub(crate) fn raw<'a>(&self, source: &'a str) -> &'a str {
        &source[self.span.clone()]
    }
}

/// Split `text` into records using `sep` as the field separator.
pub(crate) fn read_records(text: &str, sep: char) -> Vec<Record> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut start = 0usize;
    let mut line = 1usize;
    let mut record_line = 1usize;

    let mut chars = text.char_indices().peekable();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' if in_quotes => {
                if let Some(&(_, '"')) = chars.peek() {
                    current.push('"');
                    chars.next();
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            '\n' if in_quotes => {
                current.push('\n');
                line += 1;
            }
            '\n' => {
                let end = if text[..i].ends_with('\r') { i - 1 } else { i };
                if current.ends_with('\r') {
                    current.pop();
                }
                fields.push(std::mem::take(&mut current));
                records.push(Record {
                    line: record_line,
                    span: start..end,
                    fields: std::mem::take(&mut fields),
                });
                start = i + 1;
                line += 1;
                record_line = line;
            }
            c if c == sep && !in_quotes => fields.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }

    if start < text.len() {
        let end = if text.ends_with('\r') {
            text.len() - 1
        } else {
            text.len()
        };
        if current.ends_with('\r') && !in_quotes {
            current.pop();
        }
        fields.push(current);
        records.push(Record {
            line: record_line,
            span: start..end,
            fields,
        });
    }

    records
}

/// Quote `field` iff it contains the separator, a double quote, CR or LF.
pub fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}
