//! Module grids for the two-dimensional symbologies.

use datamatrix::{DataMatrix, SymbolList};
use qrcode::{Color, EcLevel, QrCode};

use super::RenderFailure;

/// Quiet margin added around a matrix symbol, in modules.
pub const QUIET_MODULES: u32 = 2;

/// A square or rectangular grid of dark/light modules, without margin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ModuleGrid {
    pub(crate) width: u32,
    pub(crate) height: u32,
    dark: Vec<bool>,
}

impl ModuleGrid {
    fn new(width: usize, height: usize, dark: Vec<bool>) -> Result<Self, RenderFailure> {
        if width == 0 || height == 0 || dark.len() != width * height {
            return Err(RenderFailure::new("encoder produced an empty module grid"));
        }
        let dim = |n: usize| {
            u32::try_from(n).map_err(|_| RenderFailure::new("module grid is too large"))
        };
        Ok(Self {
            width: dim(width)?,
            height: dim(height)?,
            dark,
        })
    }

    pub(crate) fn is_dark(&self, x: u32, y: u32) -> bool {
        self.dark[y as usize * self.width as usize + x as usize]
    }
}

/// QR Code at error-correction level L.
pub(crate) fn qr(data: &str) -> Result<ModuleGrid, RenderFailure> {
    let code = QrCode::with_error_correction_level(data.as_bytes(), EcLevel::L)
        .map_err(|e| RenderFailure::new(format!("QR encoding failed: {e}")))?;
    let width = code.width();
    let dark = code.to_colors().into_iter().map(|c| c == Color::Dark).collect();
    ModuleGrid::new(width, width, dark)
}

/// Data Matrix (ECC 200), smallest fitting symbol.
pub(crate) fn data_matrix(data: &str) -> Result<ModuleGrid, RenderFailure> {
    let code = DataMatrix::encode(data.as_bytes(), SymbolList::default())
        .map_err(|e| RenderFailure::new(format!("Data Matrix encoding failed: {e:?}")))?;
    let bitmap = code.bitmap();
    let (width, height) = (bitmap.width(), bitmap.height());
    let mut dark = vec![false; width * height];
    for (x, y) in bitmap.pixels() {
        if let Some(cell) = dark.get_mut(y * width + x) {
            *cell = true;
        }
    }
    ModuleGrid::new(width, height, dark)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn qr_version_1_is_21_modules() {
        let grid = qr("ABC123").unwrap();
        assert_eq!((grid.width, grid.height), (21, 21));
        // Finder pattern corners are dark.
        assert!(grid.is_dark(0, 0));
        assert!(grid.is_dark(20, 0));
        assert!(grid.is_dark(0, 20));
    }

    #[test]
    fn qr_accepts_maximum_byte_payload() {
        let grid = qr(&"x".repeat(2953)).unwrap();
        assert_eq!(grid.width, 177);
        assert!(qr(&"x".repeat(2954)).is_err());
    }

    #[test]
    fn data_matrix_grid_is_populated() {
        let grid = data_matrix("ABC123").unwrap();
        assert!(grid.width >= 10 && grid.height >= 10);
        let dark = (0..grid.height)
            .flat_map(|y| (0..grid.width).map(move |x| (x, y)))
            .filter(|&(x, y)| grid.is_dark(x, y))
            .count();
        assert!(dark > 0 && dark < (grid.width * grid.height) as usize);
    }
}
