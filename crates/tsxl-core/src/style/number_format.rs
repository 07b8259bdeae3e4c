//! Number formats and date-format detection

use lazy_regex::regex;

/// Number format of a cell
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum NumberFormat {
    #[default]
    General,
    /// Built-in format by id (never written to numFmts)
    BuiltIn(u32),
    /// Custom format code
    Custom(String),
}

const BUILTIN_CODES: &[(u32, &str)] = &[
    (1, "0"),
    (2, "0.00"),
    (3, "#,##0"),
    (4, "#,##0.00"),
    (9, "0%"),
    (10, "0.00%"),
    (11, "0.00E+00"),
    (12, "# ?/?"),
    (13, "# ??/??"),
    (14, "mm-dd-yy"),
    (15, "d-mmm-yy"),
    (16, "d-mmm"),
    (17, "mmm-yy"),
    (18, "h:mm AM/PM"),
    (19, "h:mm:ss AM/PM"),
    (20, "h:mm"),
    (21, "h:mm:ss"),
    (22, "m/d/yy h:mm"),
    (37, "#,##0 ;(#,##0)"),
    (38, "#,##0 ;[Red](#,##0)"),
    (39, "#,##0.00;(#,##0.00)"),
    (40, "#,##0.00;[Red](#,##0.00)"),
    (45, "mm:ss"),
    (46, "[h]:mm:ss"),
    (47, "mmss.0"),
    (48, "##0.0E+0"),
    (49, "@"),
];

impl NumberFormat {
    /// Text format (`@`)
    pub const TEXT: NumberFormat = NumberFormat::BuiltIn(49);

    /// Create a format from a code, using the built-in id when the code is one
    pub fn from_code(code: &str) -> Self {
        if code.is_empty() || code.eq_ignore_ascii_case("General") {
            return NumberFormat::General;
        }
        BUILTIN_CODES
            .iter()
            .find(|(_, c)| *c == code)
            .map(|(id, _)| NumberFormat::BuiltIn(*id))
            .unwrap_or_else(|| NumberFormat::Custom(code.to_string()))
    }

    /// Format with a fixed number of decimals (`0.00`), or an integer format
    pub fn decimals(precision: usize) -> Self {
        match precision {
            0 => NumberFormat::BuiltIn(1),
            2 => NumberFormat::BuiltIn(2),
            n => NumberFormat::Custom(format!("0.{}", "0".repeat(n))),
        }
    }

    /// Format code, when known
    pub fn code(&self) -> Option<&str> {
        match self {
            NumberFormat::General => Some("General"),
            NumberFormat::BuiltIn(0) => Some("General"),
            NumberFormat::BuiltIn(id) => BUILTIN_CODES
                .iter()
                .find(|(i, _)| i == id)
                .map(|(_, c)| *c),
            NumberFormat::Custom(code) => Some(code),
        }
    }

    /// Check whether numbers in this format display as dates or times
    ///
    /// ```
    /// use tsxl_core::NumberFormat;
    ///
    /// assert!(NumberFormat::BuiltIn(14).is_date_format());
    /// assert!(NumberFormat::Custom("yyyy-mm-dd hh:mm".into()).is_date_format());
    /// assert!(!NumberFormat::Custom("0.00".into()).is_date_format());
    /// ```
    pub fn is_date_format(&self) -> bool {
        match self {
            NumberFormat::General => false,
            NumberFormat::BuiltIn(id) => matches!(id, 14..=22 | 45..=47),
            NumberFormat::Custom(code) => is_date_code(code),
        }
    }
}

/// Heuristic date check on a custom format code
fn is_date_code(code: &str) -> bool {
    // The first section governs positive numbers, which is what dates are.
    let section = code.split(';').next().unwrap_or("");

    let mut cleaned = String::with_capacity(section.len());
    let mut chars = section.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => {
                for q in chars.by_ref() {
                    if q == '"' {
                        break;
                    }
                }
            }
            '\\' | '_' | '*' => {
                chars.next();
            }
            '[' => {
                let mut inner = String::new();
                for q in chars.by_ref() {
                    if q == ']' {
                        break;
                    }
                    inner.push(q);
                }
                // Elapsed-time brackets count as time tokens; colors, locales and conditions do not.
                if regex!(r"^(?i)(h+|m+|s+)$").is_match(&inner) {
                    cleaned.push_str(&inner);
                }
            }
            _ => cleaned.push(c),
        }
    }

    let cleaned = regex!(r"(?i)AM/PM|A/P").replace_all(&cleaned, "");
    if cleaned.trim().is_empty() || cleaned.eq_ignore_ascii_case("general") {
        return false;
    }

    regex!(r"(?i)[ymdhs]").is_match(&cleaned)
        && regex!(r"^(?i)[ymdhse\-/,.: T0@]+$").is_match(&cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_dates() {
        for id in [14, 15, 17, 22, 45, 46, 47] {
            assert!(NumberFormat::BuiltIn(id).is_date_format(), "id {}", id);
        }
        for id in [0, 1, 2, 9, 11, 49] {
            assert!(!NumberFormat::BuiltIn(id).is_date_format(), "id {}", id);
        }
    }

    #[test]
    fn test_custom_dates() {
        let yes = [
            "yyyy-mm-dd",
            "dd/mm/yyyy hh:mm:ss",
            "[$-409]mmmm d, yyyy;@",
            "[h]:mm",
            "hh:mm AM/PM",
            "yyyy-mm-dd\\Thh:mm",
            "[Red]yyyy",
            "mm:ss.0",
        ];
        for code in yes {
            assert!(NumberFormat::Custom(code.into()).is_date_format(), "{}", code);
        }

        let no = [
            "0.00",
            "#,##0",
            "\"days\" 0",
            "0.0 \"mm\"",
            "@",
            "[Red]0.00",
            "General",
        ];
        for code in no {
            assert!(!NumberFormat::Custom(code.into()).is_date_format(), "{}", code);
        }
    }

    #[test]
    fn test_from_code() {
        assert_eq!(NumberFormat::from_code("General"), NumberFormat::General);
        assert_eq!(NumberFormat::from_code("0.00"), NumberFormat::BuiltIn(2));
        assert_eq!(
            NumberFormat::from_code("yyyy-mm-dd"),
            NumberFormat::Custom("yyyy-mm-dd".into())
        );
        assert_eq!(NumberFormat::BuiltIn(14).code(), Some("mm-dd-yy"));
    }

    #[test]
    fn test_decimals() {
        assert_eq!(NumberFormat::decimals(0), NumberFormat::BuiltIn(1));
        assert_eq!(NumberFormat::decimals(3).code(), Some("0.000"));
    }
}
