//! Renderer behaviour across symbologies, resolutions, and threads.

use std::sync::Arc;

use labelbatch_core::{
    BarcodeRender, Item, LabelFont, RenderRequest, RenderSettings, Renderer, Symbology,
    validate_batch,
};

#[test]
fn every_valid_item_renders() {
    let items = vec![
        Item::new("ABC-123", Symbology::Code128),
        Item::new("5901234123457", Symbology::Ean13),
        Item::new("CODE 39", Symbology::Code39),
        Item::new("https://example.com/a?b=c", Symbology::QrCode),
        Item::new("Serial 000123", Symbology::DataMatrix),
    ];
    let renderer = Renderer::default();
    for result in validate_batch(&items) {
        assert!(result.is_valid, "{}: {}", result.item.data, result.message);
        for dpi in [96, 203, 300] {
            let req = RenderRequest::for_item(&result.item, &RenderSettings::default(), dpi);
            let raster = renderer
                .render(&req)
                .unwrap_or_else(|e| panic!("{} at {dpi}: {e}", result.item.data));
            assert!(raster.width() > 0 && raster.height() > 0);
            assert_eq!(raster.pixels().len(), raster.stride() * raster.height() as usize);
        }
    }
}

#[test]
fn higher_dpi_never_shrinks_output() {
    let renderer = Renderer::default();
    for sym in Symbology::ALL {
        let data = if sym == Symbology::Ean13 { "590123412345" } else { "ABC123" };
        let low = renderer
            .render(&RenderRequest::with_settings(data, sym, RenderSettings::default(), 96))
            .unwrap();
        let high = renderer
            .render(&RenderRequest::with_settings(data, sym, RenderSettings::default(), 600))
            .unwrap();
        assert!(high.width() >= low.width(), "{sym}");
        assert!(high.height() >= low.height(), "{sym}");
    }
}

#[test]
fn renderer_is_shareable_across_threads() {
    let renderer = Arc::new(Renderer::new(LabelFont::discover()));
    let req = RenderRequest::new("THREADED", Symbology::Code39);
    let expected = renderer.render(&req).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let renderer = Arc::clone(&renderer);
            let req = req.clone();
            std::thread::spawn(move || BarcodeRender::render(&*renderer, &req).unwrap())
        })
        .collect();
    for h in handles {
        assert_eq!(h.join().unwrap(), expected);
    }
}
