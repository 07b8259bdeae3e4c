//! Worksheet view properties (`<sheetView>`)

use crate::cell::CellAddress;
use crate::error::{Error, Result};

/// A frozen split: rows above and columns left of the split stay visible
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FreezePane {
    /// Number of frozen columns (the split is right of this many columns)
    pub cols: u16,
    /// Number of frozen rows (the split is below this many rows)
    pub rows: u32,
}

impl FreezePane {
    /// First cell of the scrolling (bottom-right) pane
    pub fn top_left_cell(&self) -> CellAddress {
        CellAddress::new(self.rows, self.cols)
    }

    /// `activePane` attribute for this split
    pub fn active_pane(&self) -> &'static str {
        match (self.rows > 0, self.cols > 0) {
            (true, true) => "bottomRight",
            (true, false) => "bottomLeft",
            (false, true) => "topRight",
            (false, false) => "topLeft",
        }
    }
}

/// View settings of one worksheet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetView {
    pub freeze: Option<FreezePane>,
    /// Percent, 10..=400
    pub zoom_scale: u16,
    pub show_gridlines: bool,
    /// Tab is selected
    pub selected: bool,
    pub active_cell: Option<CellAddress>,
}

impl Default for SheetView {
    fn default() -> Self {
        Self {
            freeze: None,
            zoom_scale: 100,
            show_gridlines: true,
            selected: false,
            active_cell: None,
        }
    }
}

impl SheetView {
    /// Freeze `cols` columns and `rows` rows; zero for both unfreezes
    pub fn set_freeze(&mut self, cols: u16, rows: u32) {
        self.freeze = (cols > 0 || rows > 0).then_some(FreezePane { cols, rows });
    }

    pub fn set_zoom(&mut self, percent: u16) -> Result<()> {
        if !(10..=400).contains(&percent) {
            return Err(Error::OutOfRange {
                what: "zoom scale",
                value: percent as i64,
                min: 10,
                max: 400,
            });
        }
        self.zoom_scale = percent;
        Ok(())
    }

    /// Whether anything differs from Excel's defaults
    pub fn is_default(&self) -> bool {
        self == &SheetView::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_freeze() {
        let mut view = SheetView::default();
        view.set_freeze(1, 2);
        let pane = view.freeze.unwrap();
        assert_eq!(pane.top_left_cell().to_a1_string(), "B3");
        assert_eq!(pane.active_pane(), "bottomRight");

        view.set_freeze(0, 1);
        assert_eq!(view.freeze.unwrap().active_pane(), "bottomLeft");

        view.set_freeze(0, 0);
        assert!(view.freeze.is_none());
        assert!(view.is_default());
    }

    #[test]
    fn test_zoom_bounds() {
        let mut view = SheetView::default();
        assert!(view.set_zoom(150).is_ok());
        assert_eq!(view.zoom_scale, 150);
        assert!(view.set_zoom(5).is_err());
        assert!(view.set_zoom(401).is_err());
    }
}
