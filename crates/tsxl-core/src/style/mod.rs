//! Cell styling types
//!
//! A [`Style`] is a complete description of a cell's appearance. Worksheets
//! store each distinct style once in a [`StylePool`] and cells refer to it by
//! index.

mod border;
mod color;
mod fill;
mod font;
mod number_format;
mod pool;

pub use border::{BorderEdge, BorderLineStyle, BorderStyle};
pub use color::Color;
pub use fill::{FillStyle, PatternType};
pub use font::{FontStyle, Underline};
pub use number_format::NumberFormat;
pub use pool::StylePool;

/// Complete cell style
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Style {
    pub font: FontStyle,
    pub fill: FillStyle,
    pub border: BorderStyle,
    pub alignment: Alignment,
    pub number_format: NumberFormat,
    pub protection: Protection,
}

impl Style {
    /// Create a new default style
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether this is the default style
    pub fn is_default(&self) -> bool {
        self == &Style::default()
    }

    pub fn bold(mut self, bold: bool) -> Self {
        self.font.bold = bold;
        self
    }

    pub fn italic(mut self, italic: bool) -> Self {
        self.font.italic = italic;
        self
    }

    /// Set font size in points
    pub fn font_size(mut self, points: f64) -> Self {
        self.font.set_size(points);
        self
    }

    pub fn font_color(mut self, color: Color) -> Self {
        self.font.color = color;
        self
    }

    /// Solid background fill
    pub fn fill_color(mut self, color: Color) -> Self {
        self.fill = FillStyle::Solid { color };
        self
    }

    pub fn number_format(mut self, format: NumberFormat) -> Self {
        self.number_format = format;
        self
    }

    /// Same line style and color on all four edges
    pub fn border_all(mut self, style: BorderLineStyle, color: Color) -> Self {
        self.border = BorderStyle::all(style, color);
        self
    }

    pub fn horizontal_alignment(mut self, align: HorizontalAlignment) -> Self {
        self.alignment.horizontal = align;
        self
    }

    pub fn wrap_text(mut self, wrap: bool) -> Self {
        self.alignment.wrap_text = wrap;
        self
    }

    /// Overlay the non-default parts of `other` onto this style
    ///
    /// Used when a conditional style is applied on top of a cell that
    /// already carries a number format (e.g. a date column).
    pub fn merged_with(&self, other: &Style) -> Style {
        let default = Style::default();
        let mut merged = self.clone();
        if other.font != default.font {
            merged.font = other.font.clone();
        }
        if other.fill != default.fill {
            merged.fill = other.fill;
        }
        if other.border != default.border {
            merged.border = other.border;
        }
        if other.alignment != default.alignment {
            merged.alignment = other.alignment;
        }
        if other.number_format != default.number_format {
            merged.number_format = other.number_format.clone();
        }
        if other.protection != default.protection {
            merged.protection = other.protection;
        }
        merged
    }
}

/// Text alignment within a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Alignment {
    pub horizontal: HorizontalAlignment,
    pub vertical: VerticalAlignment,
    pub wrap_text: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HorizontalAlignment {
    #[default]
    General,
    Left,
    Center,
    Right,
    Fill,
    Justify,
}

impl HorizontalAlignment {
    /// Attribute value in styles.xml
    pub fn as_xlsx(&self) -> &'static str {
        match self {
            HorizontalAlignment::General => "general",
            HorizontalAlignment::Left => "left",
            HorizontalAlignment::Center => "center",
            HorizontalAlignment::Right => "right",
            HorizontalAlignment::Fill => "fill",
            HorizontalAlignment::Justify => "justify",
        }
    }

    /// Parse, ignoring case
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s.trim().to_ascii_lowercase().as_str() {
            "general" => HorizontalAlignment::General,
            "left" => HorizontalAlignment::Left,
            "center" | "centre" => HorizontalAlignment::Center,
            "right" => HorizontalAlignment::Right,
            "fill" => HorizontalAlignment::Fill,
            "justify" => HorizontalAlignment::Justify,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VerticalAlignment {
    Top,
    Center,
    #[default]
    Bottom,
}

impl VerticalAlignment {
    pub fn as_xlsx(&self) -> &'static str {
        match self {
            VerticalAlignment::Top => "top",
            VerticalAlignment::Center => "center",
            VerticalAlignment::Bottom => "bottom",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Some(match s.trim().to_ascii_lowercase().as_str() {
            "top" => VerticalAlignment::Top,
            "center" | "centre" => VerticalAlignment::Center,
            "bottom" => VerticalAlignment::Bottom,
            _ => return None,
        })
    }
}

/// Cell protection settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Protection {
    /// Cell is locked when the sheet is protected
    pub locked: bool,
    /// Formula is hidden when the sheet is protected
    pub hidden: bool,
}

impl Default for Protection {
    fn default() -> Self {
        Self {
            locked: true,
            hidden: false,
        }
    }
}
