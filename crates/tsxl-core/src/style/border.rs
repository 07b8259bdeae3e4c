//! Cell borders

use super::Color;

/// One border edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BorderEdge {
    pub style: BorderLineStyle,
    pub color: Color,
}

/// Borders on the four edges of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BorderStyle {
    pub left: Option<BorderEdge>,
    pub right: Option<BorderEdge>,
    pub top: Option<BorderEdge>,
    pub bottom: Option<BorderEdge>,
}

impl BorderStyle {
    /// Same edge on all four sides; `BorderLineStyle::None` clears them
    pub fn all(style: BorderLineStyle, color: Color) -> Self {
        let edge = (style != BorderLineStyle::None).then_some(BorderEdge { style, color });
        Self {
            left: edge,
            right: edge,
            top: edge,
            bottom: edge,
        }
    }

    /// Edges in the order styles.xml expects them
    pub fn edges(&self) -> [(&'static str, &Option<BorderEdge>); 4] {
        [
            ("left", &self.left),
            ("right", &self.right),
            ("top", &self.top),
            ("bottom", &self.bottom),
        ]
    }

    /// Mutable edge by element name
    pub fn edge_mut(&mut self, name: &str) -> Option<&mut Option<BorderEdge>> {
        match name {
            "left" | "start" => Some(&mut self.left),
            "right" | "end" => Some(&mut self.right),
            "top" => Some(&mut self.top),
            "bottom" => Some(&mut self.bottom),
            _ => None,
        }
    }
}

/// Border line styles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BorderLineStyle {
    #[default]
    None,
    Thin,
    Medium,
    Thick,
    Dashed,
    Dotted,
    Double,
    Hair,
    MediumDashed,
    DashDot,
    MediumDashDot,
    DashDotDot,
    MediumDashDotDot,
    SlantDashDot,
}

const LINE_NAMES: &[(BorderLineStyle, &str)] = &[
    (BorderLineStyle::None, "none"),
    (BorderLineStyle::Thin, "thin"),
    (BorderLineStyle::Medium, "medium"),
    (BorderLineStyle::Thick, "thick"),
    (BorderLineStyle::Dashed, "dashed"),
    (BorderLineStyle::Dotted, "dotted"),
    (BorderLineStyle::Double, "double"),
    (BorderLineStyle::Hair, "hair"),
    (BorderLineStyle::MediumDashed, "mediumDashed"),
    (BorderLineStyle::DashDot, "dashDot"),
    (BorderLineStyle::MediumDashDot, "mediumDashDot"),
    (BorderLineStyle::DashDotDot, "dashDotDot"),
    (BorderLineStyle::MediumDashDotDot, "mediumDashDotDot"),
    (BorderLineStyle::SlantDashDot, "slantDashDot"),
];

impl BorderLineStyle {
    /// `style` attribute value
    pub fn as_xlsx(&self) -> &'static str {
        LINE_NAMES
            .iter()
            .find(|(s, _)| s == self)
            .map(|(_, name)| *name)
            .unwrap_or("none")
    }

    /// Parse a style name, ignoring case and `_` separators (`MEDIUM_DASHED`)
    pub fn parse(s: &str) -> Option<Self> {
        let key: String = s.trim().chars().filter(|c| *c != '_').collect();
        LINE_NAMES
            .iter()
            .find(|(_, name)| name.eq_ignore_ascii_case(&key))
            .map(|(style, _)| *style)
    }
}
