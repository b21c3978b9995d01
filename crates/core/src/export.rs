//! Re-export of batches in the tabular and line formats read by
//! [`crate::ingest`].

use crate::ingest::escape_field;
use crate::item::Item;
use crate::validate::ValidationResult;

/// Header row written by [`export_csv`].
pub const CSV_HEADER: &str = "Data,Symbology,Quantity,ModuleWidth,BarcodeHeight,ShowText";

/// Header row written by [`export_validation_results`].
pub const VALIDATION_HEADER: &str = "Index,Data,Symbology,Quantity,IsValid,ErrorMessage";

fn opt<T: ToString>(v: Option<T>) -> String {
    v.map(|v| v.to_string()).unwrap_or_default()
}

/// Render items as comma-separated text. Absent overrides become empty cells.
pub fn export_csv<'a, I>(items: I, include_header: bool) -> String
where
    I: IntoIterator<Item = &'a Item>,
{
    let mut out = String::new();
    if include_header {
        out.push_str(CSV_HEADER);
        out.push('\n');
    }
    for item in items {
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            escape_field(&item.data),
            item.symbology,
            item.quantity,
            opt(item.module_width),
            opt(item.barcode_height),
            opt(item.show_text),
        ));
    }
    out
}

/// Render one data value per line.
pub fn export_text<'a, I>(items: I) -> String
where
    I: IntoIterator<Item = &'a Item>,
{
    items.into_iter().fold(String::new(), |mut out, item| {
        out.push_str(&item.data);
        out.push('\n');
        out
    })
}

/// Render a validation report. The message column is empty for valid items.
pub fn export_validation_results<'a, I>(results: I) -> String
where
    I: IntoIterator<Item = &'a ValidationResult>,
{
    let mut out = String::from(VALIDATION_HEADER);
    out.push('\n');
    for r in results {
        let message = if r.is_valid { "" } else { r.message.as_str() };
        out.push_str(&format!(
            "{},{},{},{},{},{}\n",
            r.index,
            escape_field(&r.item.data),
            r.item.symbology,
            r.item.quantity,
            r.is_valid,
            escape_field(message),
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbology::Symbology;
    use crate::validate::validate_batch;

    #[test]
    fn csv_with_header_and_overrides() {
        let mut a = Item::new("A,1", Symbology::Code39).with_quantity(2);
        a.module_width = Some(3);
        a.show_text = Some(false);
        let b = Item::new("B", Symbology::QrCode);
        let out = export_csv([&a, &b], true);
        assert_eq!(
            out,
            "Data,Symbology,Quantity,ModuleWidth,BarcodeHeight,ShowText\n\
             \"A,1\",Code39,2,3,,false\n\
             B,QRCode,1,,,\n"
        );
    }

    #[test]
    fn csv_without_header() {
        let out = export_csv([&Item::new("X", Symbology::Ean13)], false);
        assert_eq!(out, "X,EAN13,1,,,\n");
    }

    #[test]
    fn text_is_one_value_per_line() {
        let items = [
            Item::new("one", Symbology::Code128),
            Item::new("two", Symbology::Code128),
        ];
        assert_eq!(export_text(&items), "one\ntwo\n");
    }

    #[test]
    fn validation_report() {
        let items = [
            Item::new("OK", Symbology::Code39),
            Item::new("bad, lower", Symbology::Code39),
        ];
        let out = export_validation_results(&validate_batch(&items));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], VALIDATION_HEADER);
        assert_eq!(lines[1], "0,OK,Code39,1,true,");
        assert_eq!(
            lines[2],
            "1,\"bad, lower\",Code39,1,false,\"Code 39 supports only: 0-9, A-Z, space and -.$/+%\""
        );
    }
}
