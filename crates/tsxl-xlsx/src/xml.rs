//! Small XML helpers shared by the reader and writer

use std::str::FromStr;

use quick_xml::events::BytesStart;

/// Attribute value by qualified name (`r:id` includes the prefix)
pub(crate) fn attr(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

pub(crate) fn attr_parse<T: FromStr>(e: &BytesStart<'_>, key: &[u8]) -> Option<T> {
    attr(e, key).and_then(|v| v.trim().parse().ok())
}

/// Boolean attribute (`1`/`true`); `None` when absent
pub(crate) fn attr_bool(e: &BytesStart<'_>, key: &[u8]) -> Option<bool> {
    attr(e, key).map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
}

/// Escape text for element content and attribute values
pub(crate) fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn is_escape_at(s: &str, i: usize) -> bool {
    let b = s.as_bytes();
    b.len() >= i + 7
        && b[i] == b'_'
        && (b[i + 1] == b'x' || b[i + 1] == b'X')
        && b[i + 2..i + 6].iter().all(u8::is_ascii_hexdigit)
        && b[i + 6] == b'_'
}

/// Encode characters XML cannot carry as Excel's `_xHHHH_` sequences
///
/// A literal `_xHHHH_` in the text gets its underscore escaped so it reads
/// back unchanged.
pub(crate) fn encode_excel_escapes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for (i, c) in s.char_indices() {
        if c == '_' && is_escape_at(s, i) {
            out.push_str("_x005F_");
        } else if c.is_control() && c != '\t' && c != '\n' {
            out.push_str(&format!("_x{:04X}_", c as u32));
        } else {
            out.push(c);
        }
    }
    out
}

/// Decode Excel's `_xHHHH_` sequences (`_x000D_` is CR, `_x005F_` an underscore)
pub(crate) fn decode_excel_escapes(s: &str) -> String {
    if !s.contains("_x") && !s.contains("_X") {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut i = 0;
    while i < s.len() {
        if is_escape_at(s, i) {
            if let Some(c) = u32::from_str_radix(&s[i + 2..i + 6], 16)
                .ok()
                .and_then(char::from_u32)
            {
                out.push(c);
                i += 7;
                continue;
            }
        }
        // Safe: i always sits on a char boundary
        let c = s[i..].chars().next().unwrap_or('\u{FFFD}');
        out.push(c);
        i += c.len_utf8();
    }
    out
}

/// Resolve a relationship target against the directory of the source part
///
/// `resolve_target("xl/worksheets", "../tables/table1.xml")` gives
/// `xl/tables/table1.xml`.
pub(crate) fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut parts: Vec<&str> = base_dir.split('/').filter(|p| !p.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            s => parts.push(s),
        }
    }
    parts.join("/")
}

/// `(directory, file name)` of a part path
pub(crate) fn split_part_path(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(i) => (&path[..i], &path[i + 1..]),
        None => ("", path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_escapes() {
        assert_eq!(decode_excel_escapes("Line1_x000D_Line2"), "Line1\rLine2");
        assert_eq!(decode_excel_escapes("a_x0009_b"), "a\tb");
        assert_eq!(decode_excel_escapes("my_x005F_var"), "my_var");
        assert_eq!(decode_excel_escapes("_x000a_"), "\n");
        assert_eq!(decode_excel_escapes("_x00"), "_x00");
        assert_eq!(decode_excel_escapes("plain_text"), "plain_text");
        assert_eq!(decode_excel_escapes("débit_x000D_"), "débit\r");
    }

    #[test]
    fn test_encode_escapes() {
        assert_eq!(encode_excel_escapes("a\rb"), "a_x000D_b");
        assert_eq!(encode_excel_escapes("a\tb\nc"), "a\tb\nc");
        assert_eq!(encode_excel_escapes("_x0041_"), "_x005F_x0041_");
        assert_eq!(decode_excel_escapes(&encode_excel_escapes("_x0041_\u{1}")), "_x0041_\u{1}");
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape(r#"<a & "b">"#), "&lt;a &amp; &quot;b&quot;&gt;");
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(
            resolve_target("xl/worksheets", "../tables/table1.xml"),
            "xl/tables/table1.xml"
        );
        assert_eq!(resolve_target("xl", "worksheets/sheet1.xml"), "xl/worksheets/sheet1.xml");
        assert_eq!(resolve_target("xl", "/xl/styles.xml"), "xl/styles.xml");
        assert_eq!(split_part_path("xl/worksheets/sheet1.xml"), ("xl/worksheets", "sheet1.xml"));
    }
}
