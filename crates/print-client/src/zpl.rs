//! ZPL graphic field encoding.
//!
//! A page becomes one label: `^XA ^PW ^LL ^FO0,0 ^GFA ... ^FS ^XZ`, with the
//! bitmap packed one bit per dot, most significant bit first, and written as
//! ASCII hex.

use std::fmt::Write as _;

use image::RgbaImage;

/// Luminance below which a pixel prints as a dot.
pub const DARK_THRESHOLD: u8 = 128;

/// A page packed into 1-bit rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackedRows {
    /// Width in dots.
    pub width: u32,
    /// Height in dots.
    pub height: u32,
    /// Bytes per row, `ceil(width / 8)`.
    pub bytes_per_row: usize,
    /// `bytes_per_row * height` bytes, row-major.
    pub data: Vec<u8>,
}

/// Pack `page` into 1-bit rows. Transparent pixels count as white.
pub fn pack_rows(page: &RgbaImage) -> PackedRows {
    let (width, height) = page.dimensions();
    let bytes_per_row = width.div_ceil(8) as usize;
    let mut data = vec![0u8; bytes_per_row * height as usize];

    for (x, y, px) in page.enumerate_pixels() {
        let [r, g, b, a] = px.0;
        if a == 0 {
            continue;
        }
        let luma = (u32::from(r) * 299 + u32::from(g) * 587 + u32::from(b) * 114) / 1000;
        if luma < u32::from(DARK_THRESHOLD) {
            let i = y as usize * bytes_per_row + (x as usize / 8);
            data[i] |= 1 << (7 - (x % 8));
        }
    }

    PackedRows {
        width,
        height,
        bytes_per_row,
        data,
    }
}

/// Build a complete ZPL label that prints `page` at the label origin.
pub fn label_from_page(page: &RgbaImage) -> String {
    let rows = pack_rows(page);
    let total = rows.data.len();
    let mut out = String::with_capacity(total * 2 + 64);
    let _ = write!(
        out,
        "^XA^PW{}^LL{}^FO0,0^GFA,{total},{total},{},",
        rows.width, rows.height, rows.bytes_per_row
    );
    for byte in &rows.data {
        let _ = write!(out, "{byte:02X}");
    }
    out.push_str("^FS^XZ\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    const BLACK: Rgba<u8> = Rgba([0, 0, 0, 0xFF]);
    const WHITE: Rgba<u8> = Rgba([0xFF; 4]);

    #[test]
    fn rows_pack_msb_first() {
        let mut page = RgbaImage::from_pixel(10, 2, WHITE);
        page.put_pixel(0, 0, BLACK);
        page.put_pixel(9, 0, BLACK);
        page.put_pixel(7, 1, BLACK);
        let rows = pack_rows(&page);
        assert_eq!(rows.bytes_per_row, 2);
        assert_eq!(rows.data, vec![0b1000_0000, 0b0100_0000, 0b0000_0001, 0]);
    }

    #[test]
    fn transparent_and_light_pixels_stay_blank() {
        let mut page = RgbaImage::from_pixel(8, 1, Rgba([0, 0, 0, 0]));
        page.put_pixel(1, 0, Rgba([200, 200, 200, 0xFF]));
        assert_eq!(pack_rows(&page).data, vec![0]);
    }

    #[test]
    fn label_wraps_graphic_field() {
        let mut page = RgbaImage::from_pixel(16, 1, WHITE);
        page.put_pixel(0, 0, BLACK);
        let zpl = label_from_page(&page);
        assert_eq!(zpl, "^XA^PW16^LL1^FO0,0^GFA,2,2,2,8000^FS^XZ\n");
    }
}
