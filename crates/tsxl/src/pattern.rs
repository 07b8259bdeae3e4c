//! Glob patterns and `Key:Value` lists used by command parameters

use regex::Regex;

use crate::error::{CommandError, Result};

/// A case-insensitive glob where `*` matches any run of characters
#[derive(Debug, Clone)]
pub struct Glob {
    text: String,
    regex: Regex,
}

impl Glob {
    pub fn new(pattern: &str) -> Result<Self> {
        let body = pattern
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        let regex = Regex::new(&format!("(?is)^{}$", body))
            .map_err(|e| CommandError::invalid_value(pattern, e.to_string()))?;
        Ok(Self {
            text: pattern.to_string(),
            regex,
        })
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }
}

/// Split a comma-separated list, trimming items and dropping empty ones
pub fn split_list(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse `Key1:Value1,Key2:Value2`
///
/// Only the first `:` separates key from value, so values may contain colons.
pub fn parse_pairs(text: &str) -> Result<Vec<(String, String)>> {
    split_list(text)
        .into_iter()
        .map(|item| match item.split_once(':') {
            Some((k, v)) if !k.trim().is_empty() => Ok((k.trim().to_string(), v.trim().to_string())),
            _ => Err(CommandError::invalid_value(item, "expected Key:Value")),
        })
        .collect()
}
