//! Command text: `Name(Param1="value",Param2="value")`

use std::fmt::Write as _;

use crate::error::{CommandError, Result};

/// Ordered parameter list that keeps the case it was written in
///
/// Lookups ignore case. Setting an existing parameter keeps its position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandParameters {
    entries: Vec<(String, String)>,
}

impl CommandParameters {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    /// Raw value, before property expansion
    pub fn get(&self, name: &str) -> Option<&str> {
        self.position(name).map(|i| self.entries[i].1.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Set a value; returns the previous one
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(i) => Some(std::mem::replace(&mut self.entries[i].1, value)),
            None => {
                self.entries.push((name, value));
                None
            }
        }
    }

    /// Builder form of [`set`](Self::set)
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<String> {
        self.position(name).map(|i| self.entries.remove(i).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse one command line into its name and parameters
pub fn parse_command_text(text: &str) -> Result<(String, CommandParameters)> {
    Parser::new(text).parse()
}

/// Format a command
///
/// Parameters appear in `order` first (names matched ignoring case), then
/// any others in the order they were set. A parameter set to `""` is
/// written as such, since some commands give it a meaning.
pub fn format_command_text(name: &str, parameters: &CommandParameters, order: &[&str]) -> String {
    let mut out = String::with_capacity(name.len() + 2 + parameters.len() * 16);
    out.push_str(name);
    out.push('(');
    let known = order.iter().filter_map(|n| parameters.position(n));
    let unknown = (0..parameters.len()).filter(|i| {
        let key = &parameters.entries[*i].0;
        !order.iter().any(|n| n.eq_ignore_ascii_case(key))
    });
    let mut first = true;
    for i in known.chain(unknown) {
        let (key, value) = &parameters.entries[i];
        if !first {
            out.push(',');
        }
        first = false;
        let _ = write!(out, "{}=\"{}\"", key, value.replace('"', "\\\""));
    }
    out.push(')');
    out
}

struct Parser<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn error(&self, message: impl Into<String>) -> CommandError {
        CommandError::Syntax {
            position: self.pos,
            message: message.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn expect(&mut self, expected: char) -> Result<()> {
        match self.peek() {
            Some(c) if c == expected => {
                self.bump();
                Ok(())
            }
            Some(c) => Err(self.error(format!("expected '{}', found '{}'", expected, c))),
            None => Err(self.error(format!("expected '{}', found end of text", expected))),
        }
    }

    fn identifier(&mut self, what: &str) -> Result<String> {
        let start = self.pos;
        while self
            .peek()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.bump();
        }
        if start == self.pos {
            return Err(self.error(format!("expected {}", what)));
        }
        Ok(self.text[start..self.pos].to_string())
    }

    fn quoted(&mut self) -> Result<String> {
        let open = self.pos;
        self.expect('"')?;
        let mut value = String::new();
        loop {
            match self.bump() {
                Some('\\') if self.peek() == Some('"') => {
                    self.bump();
                    value.push('"');
                }
                Some('"') => return Ok(value),
                Some(c) => value.push(c),
                None => {
                    self.pos = open;
                    return Err(self.error("unterminated quoted value"));
                }
            }
        }
    }

    fn unquoted(&mut self) -> String {
        let start = self.pos;
        while self.peek().is_some_and(|c| c != ',' && c != ')') {
            self.bump();
        }
        self.text[start..self.pos].trim().to_string()
    }

    fn parse(mut self) -> Result<(String, CommandParameters)> {
        self.skip_whitespace();
        let name = self.identifier("command name")?;
        self.skip_whitespace();
        self.expect('(')?;

        let mut parameters = CommandParameters::new();
        self.skip_whitespace();
        if self.peek() == Some(')') {
            self.bump();
        } else {
            loop {
                self.skip_whitespace();
                let key = self.identifier("parameter name")?;
                self.skip_whitespace();
                self.expect('=')?;
                self.skip_whitespace();
                let value = if self.peek() == Some('"') {
                    self.quoted()?
                } else {
                    self.unquoted()
                };
                if parameters.set(key.as_str(), value).is_some() {
                    log::warn!("{}: parameter {} is given more than once; using the last", name, key);
                }
                self.skip_whitespace();
                match self.bump() {
                    Some(',') => continue,
                    Some(')') => break,
                    Some(c) => {
                        self.pos -= c.len_utf8();
                        return Err(self.error(format!("expected ',' or ')', found '{}'", c)));
                    }
                    None => return Err(self.error("missing ')'")),
                }
            }
        }

        self.skip_whitespace();
        if self.pos < self.text.len() {
            return Err(self.error("unexpected text after ')'"));
        }
        Ok((name, parameters))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_basic() {
        let (name, params) = parse_command_text(
            r#"ReadTableFromExcel(TableID="Flows", InputFile="data\in.xlsx",KeepOpen=True)"#,
        )
        .unwrap();
        assert_eq!(name, "ReadTableFromExcel");
        assert_eq!(params.get("tableid"), Some("Flows"));
        assert_eq!(params.get("InputFile"), Some(r"data\in.xlsx"));
        assert_eq!(params.get("KeepOpen"), Some("True"));
        assert_eq!(params.names().collect::<Vec<_>>(), vec!["TableID", "InputFile", "KeepOpen"]);
    }

    #[test]
    fn test_parse_escapes_and_empty() {
        let (name, params) = parse_command_text("Exit()").unwrap();
        assert_eq!(name, "Exit");
        assert!(params.is_empty());

        let (_, params) = parse_command_text(
            r#"SetExcelCell(Value="say \"hi\", ok",Formula="=SUM(A1:A3)",Worksheet= My Data ,Zoom=85)"#,
        )
        .unwrap();
        assert_eq!(params.get("Value"), Some(r#"say "hi", ok"#));
        assert_eq!(params.get("Formula"), Some("=SUM(A1:A3)"));
        assert_eq!(params.get("Worksheet"), Some("My Data"));
        assert_eq!(params.get("Zoom"), Some("85"));
    }

    #[test]
    fn test_parse_errors_have_positions() {
        match parse_command_text(r#"Cmd(A="x" B="y")"#) {
            Err(CommandError::Syntax { position, .. }) => assert_eq!(position, 10),
            other => panic!("expected syntax error, got {:?}", other),
        }
        match parse_command_text(r#"Cmd(A="unterminated)"#) {
            Err(CommandError::Syntax { position, .. }) => assert_eq!(position, 6),
            other => panic!("expected syntax error, got {:?}", other),
        }
        assert!(parse_command_text("Cmd").is_err());
        assert!(parse_command_text("(A=1)").is_err());
        assert!(parse_command_text("Cmd(A=1) extra").is_err());
        assert!(parse_command_text("Cmd(=1)").is_err());
    }

    #[test]
    fn test_format_orders_known_then_unknown() {
        let params = CommandParameters::new()
            .with("Extra", "1")
            .with("Worksheet", "Data")
            .with("OutputFile", "out.xlsx")
            .with("Comment", "")
            .with("Value", "a \"b\"");
        let text = format_command_text("SetExcelCell", &params, &["OutputFile", "Worksheet", "Value"]);
        assert_eq!(
            text,
            r#"SetExcelCell(OutputFile="out.xlsx",Worksheet="Data",Value="a \"b\"",Extra="1",Comment="")"#
        );
        let (_, reparsed) = parse_command_text(&text).unwrap();
        assert_eq!(reparsed.get("Value"), Some("a \"b\""));
        assert_eq!(reparsed.get("Comment"), Some(""));
        assert_eq!(reparsed.len(), 5);
    }

    #[test]
    fn test_set_keeps_position_and_case() {
        let mut params = CommandParameters::new().with("TableID", "a").with("Worksheet", "b");
        assert_eq!(params.set("tableid", "c"), Some("a".to_string()));
        assert_eq!(params.iter().next(), Some(("TableID", "c")));
        assert_eq!(params.remove("WORKSHEET"), Some("b".to_string()));
        assert_eq!(params.len(), 1);
    }
}
