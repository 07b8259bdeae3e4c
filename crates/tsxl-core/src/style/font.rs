//! Font settings

use super::Color;

/// Font settings
///
/// The size is kept in hundredths of a point so the type can be hashed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FontStyle {
    pub name: String,
    size_centipoints: u32,
    pub bold: bool,
    pub italic: bool,
    pub underline: Underline,
    pub strikethrough: bool,
    pub color: Color,
}

impl Default for FontStyle {
    fn default() -> Self {
        Self {
            name: "Calibri".to_string(),
            size_centipoints: 1100,
            bold: false,
            italic: false,
            underline: Underline::None,
            strikethrough: false,
            color: Color::Auto,
        }
    }
}

impl FontStyle {
    /// Font size in points
    pub fn size(&self) -> f64 {
        self.size_centipoints as f64 / 100.0
    }

    /// Set font size in points (clamped to Excel's 1..=409)
    pub fn set_size(&mut self, points: f64) {
        let points = points.clamp(1.0, 409.0);
        self.size_centipoints = (points * 100.0).round() as u32;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Underline {
    #[default]
    None,
    Single,
    Double,
}

impl Underline {
    /// Parse the `val` attribute of `<u>` (absent means single)
    pub fn from_xlsx(val: Option<&str>) -> Self {
        match val {
            None | Some("single") | Some("singleAccounting") => Underline::Single,
            Some("double") | Some("doubleAccounting") => Underline::Double,
            Some(_) => Underline::None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_roundtrip() {
        let mut font = FontStyle::default();
        assert_eq!(font.size(), 11.0);
        font.set_size(10.5);
        assert_eq!(font.size(), 10.5);
        font.set_size(1000.0);
        assert_eq!(font.size(), 409.0);
    }
}
