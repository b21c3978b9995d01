//! Page composition shared by the bundled sinks.

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use labelbatch_core::RasterImage;

use crate::DestRect;

/// Place `raster` on a white `page_width` × `page_height` page, scaled
/// nearest-neighbour to fit inside `dest` with its aspect ratio kept and
/// centred there. Anything outside the page is clipped.
pub fn compose_page(
    raster: &RasterImage,
    page_width: u32,
    page_height: u32,
    dest: DestRect,
) -> RgbaImage {
    let mut page = RgbaImage::from_pixel(page_width, page_height, Rgba([0xFF; 4]));
    if dest.is_empty() || raster.width() == 0 || raster.height() == 0 {
        return page;
    }

    let sx = f64::from(dest.width) / f64::from(raster.width());
    let sy = f64::from(dest.height) / f64::from(raster.height());
    let scale = sx.min(sy);
    let w = ((f64::from(raster.width()) * scale).round() as u32).clamp(1, dest.width);
    let h = ((f64::from(raster.height()) * scale).round() as u32).clamp(1, dest.height);

    let src = raster.to_rgba();
    let fitted = if (w, h) == src.dimensions() {
        src
    } else {
        imageops::resize(&src, w, h, FilterType::Nearest)
    };
    let x = i64::from(dest.x) + i64::from((dest.width - w) / 2);
    let y = i64::from(dest.y) + i64::from((dest.height - h) / 2);
    imageops::replace(&mut page, &fitted, x, y);
    page
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma};

    fn black(w: u32, h: u32) -> RasterImage {
        RasterImage::from_luma(&GrayImage::from_pixel(w, h, Luma([0])), 96, 96)
    }

    #[test]
    fn raster_is_fitted_and_centred() {
        // 2:1 raster into a 100x100 rect: 100x50, centred vertically.
        let page = compose_page(
            &black(20, 10),
            100,
            100,
            DestRect {
                x: 0,
                y: 0,
                width: 100,
                height: 100,
            },
        );
        assert_eq!(page.get_pixel(50, 24), &Rgba([0xFF; 4]));
        assert_eq!(page.get_pixel(50, 25), &Rgba([0, 0, 0, 0xFF]));
        assert_eq!(page.get_pixel(50, 74), &Rgba([0, 0, 0, 0xFF]));
        assert_eq!(page.get_pixel(50, 75), &Rgba([0xFF; 4]));
    }

    #[test]
    fn offset_rect_and_clipping() {
        let page = compose_page(
            &black(10, 10),
            30,
            30,
            DestRect {
                x: 20,
                y: 20,
                width: 20,
                height: 20,
            },
        );
        assert_eq!(page.dimensions(), (30, 30));
        assert_eq!(page.get_pixel(19, 19), &Rgba([0xFF; 4]));
        assert_eq!(page.get_pixel(29, 29), &Rgba([0, 0, 0, 0xFF]));
    }

    #[test]
    fn empty_rect_leaves_page_blank() {
        let page = compose_page(
            &black(4, 4),
            8,
            8,
            DestRect {
                x: 0,
                y: 0,
                width: 0,
                height: 8,
            },
        );
        assert!(page.pixels().all(|p| *p == Rgba([0xFF; 4])));
    }
}
