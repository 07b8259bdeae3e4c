//! Color representation

use std::fmt;

/// A color as stored in styles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Color {
    /// Automatic/default color
    #[default]
    Auto,

    /// RGB color
    Rgb { r: u8, g: u8, b: u8 },

    /// ARGB color with alpha channel
    Argb { a: u8, r: u8, g: u8, b: u8 },

    /// Theme color; tint is stored in thousandths (-1000..=1000)
    Theme { index: u8, tint: i16 },

    /// Legacy palette entry
    Indexed(u8),
}

/// The 56-entry default palette behind indexes 8..=63
const PALETTE: [u32; 56] = [
    0x000000, 0xFFFFFF, 0xFF0000, 0x00FF00, 0x0000FF, 0xFFFF00, 0xFF00FF, 0x00FFFF, //
    0x800000, 0x008000, 0x000080, 0x808000, 0x800080, 0x008080, 0xC0C0C0, 0x808080, //
    0x9999FF, 0x993366, 0xFFFFCC, 0xCCFFFF, 0x660066, 0xFF8080, 0x0066CC, 0xCCCCFF, //
    0x000080, 0xFF00FF, 0xFFFF00, 0x00FFFF, 0x800080, 0x800000, 0x008080, 0x0000FF, //
    0x00CCFF, 0xCCFFFF, 0xCCFFCC, 0xFFFF99, 0x99CCFF, 0xFF99CC, 0xCC99FF, 0xFFCC99, //
    0x3366FF, 0x33CCCC, 0x99CC00, 0xFFCC00, 0xFF9900, 0xFF6600, 0x666699, 0x969696, //
    0x003366, 0x339966, 0x003300, 0x333300, 0x993300, 0x993366, 0x333399, 0x333333, //
];

/// Palette names, normalized to lowercase without separators
const NAMED: &[(&str, u8)] = &[
    ("black", 8),
    ("white", 9),
    ("red", 10),
    ("brightgreen", 11),
    ("blue", 12),
    ("yellow", 13),
    ("pink", 14),
    ("magenta", 14),
    ("turquoise", 15),
    ("cyan", 15),
    ("darkred", 16),
    ("green", 17),
    ("darkblue", 18),
    ("navy", 18),
    ("darkyellow", 19),
    ("olive", 19),
    ("violet", 20),
    ("purple", 20),
    ("teal", 21),
    ("grey25percent", 22),
    ("lightgray", 22),
    ("lightgrey", 22),
    ("silver", 22),
    ("grey50percent", 23),
    ("gray", 23),
    ("grey", 23),
    ("cornflowerblue", 24),
    ("maroon", 25),
    ("lemonchiffon", 26),
    ("orchid", 28),
    ("coral", 29),
    ("royalblue", 30),
    ("lightcornflowerblue", 31),
    ("skyblue", 40),
    ("lightturquoise", 41),
    ("lightgreen", 42),
    ("lightyellow", 43),
    ("paleblue", 44),
    ("rose", 45),
    ("lavender", 46),
    ("tan", 47),
    ("lightblue", 48),
    ("aqua", 49),
    ("lime", 50),
    ("gold", 51),
    ("lightorange", 52),
    ("orange", 53),
    ("bluegrey", 54),
    ("grey40percent", 55),
    ("darkgray", 55),
    ("darkgrey", 55),
    ("darkteal", 56),
    ("seagreen", 57),
    ("darkgreen", 58),
    ("olivegreen", 59),
    ("brown", 60),
    ("plum", 61),
    ("indigo", 62),
    ("grey80percent", 63),
];

impl Color {
    pub const BLACK: Color = Color::Rgb { r: 0, g: 0, b: 0 };
    pub const WHITE: Color = Color::Rgb {
        r: 255,
        g: 255,
        b: 255,
    };
    pub const RED: Color = Color::Rgb { r: 255, g: 0, b: 0 };

    /// Create an RGB color
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Color::Rgb { r, g, b }
    }

    /// Create from a hex string (`#FF0000`, `FF0000`, `0xFF0000` or 8-digit ARGB)
    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim();
        let hex = hex
            .strip_prefix('#')
            .or_else(|| hex.strip_prefix("0x"))
            .or_else(|| hex.strip_prefix("0X"))
            .unwrap_or(hex);
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();

        match hex.len() {
            6 => Some(Color::Rgb {
                r: byte(0)?,
                g: byte(2)?,
                b: byte(4)?,
            }),
            8 => Some(Color::Argb {
                a: byte(0)?,
                r: byte(2)?,
                g: byte(4)?,
                b: byte(6)?,
            }),
            _ => None,
        }
    }

    /// Look up a palette color by name (`red`, `LIGHT_GREEN`, `Grey 25 Percent`)
    pub fn from_name(name: &str) -> Option<Self> {
        let key: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        if key == "auto" || key == "automatic" {
            return Some(Color::Auto);
        }
        NAMED
            .iter()
            .find(|(n, _)| *n == key)
            .map(|(_, idx)| Color::Indexed(*idx))
    }

    /// Parse any user-facing color form: name, hex, or `r,g,b`
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Some(c) = Self::from_name(s) {
            return Some(c);
        }
        if let Some(c) = Self::from_hex(s) {
            return Some(c);
        }
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        if parts.len() == 3 {
            let r = parts[0].parse().ok()?;
            let g = parts[1].parse().ok()?;
            let b = parts[2].parse().ok()?;
            return Some(Color::Rgb { r, g, b });
        }
        None
    }

    /// RGB components, resolving palette and theme entries
    pub fn to_rgb(&self) -> (u8, u8, u8) {
        match self {
            Color::Auto => (0, 0, 0),
            Color::Rgb { r, g, b } | Color::Argb { r, g, b, .. } => (*r, *g, *b),
            Color::Indexed(i) => split_rgb(Self::indexed_to_rgb(*i)),
            Color::Theme { index, .. } => split_rgb(Self::theme_to_rgb(*index)),
        }
    }

    /// ARGB hex string as used by XLSX (`FFFF0000` for opaque red)
    pub fn to_argb_hex(&self) -> String {
        match self {
            Color::Argb { a, r, g, b } => format!("{:02X}{:02X}{:02X}{:02X}", a, r, g, b),
            other => {
                let (r, g, b) = other.to_rgb();
                format!("FF{:02X}{:02X}{:02X}", r, g, b)
            }
        }
    }

    fn indexed_to_rgb(index: u8) -> u32 {
        match index {
            0..=7 => PALETTE[index as usize],
            8..=63 => PALETTE[index as usize - 8],
            65 => 0xFFFFFF,
            _ => 0x000000,
        }
    }

    /// Default Office theme; index 0 is light 1 and index 1 is dark 1
    fn theme_to_rgb(index: u8) -> u32 {
        match index {
            0 => 0xFFFFFF,
            1 => 0x000000,
            2 => 0xE7E6E6,
            3 => 0x44546A,
            4 => 0x4472C4,
            5 => 0xED7D31,
            6 => 0xA5A5A5,
            7 => 0xFFC000,
            8 => 0x5B9BD5,
            9 => 0x70AD47,
            _ => 0x000000,
        }
    }
}

fn split_rgb(v: u32) -> (u8, u8, u8) {
    ((v >> 16) as u8, (v >> 8) as u8, v as u8)
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Auto => f.write_str("auto"),
            other => {
                let (r, g, b) = other.to_rgb();
                write!(f, "#{:02X}{:02X}{:02X}", r, g, b)
            }
        }
    }
}
