//! Reading and checking parameter values

use std::fmt::Display;
use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::str::FromStr;

use tsxl_core::CellRange;

use crate::area::ExcelArea;
use crate::command::parameters::CommandParameters;
use crate::error::{CommandError, Result};
use crate::pattern::{parse_pairs, split_list};
use crate::processor::CommandProcessor;

/// The parameters that name an area; at most one may be given
pub const AREA_PARAMETERS: &[&str] = &["ExcelAddress", "ExcelNamedRange", "ExcelTableName"];

pub(crate) fn parse_bool(value: &str) -> Option<bool> {
    if value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn missing(name: &str) -> CommandError {
    CommandError::InvalidParameters(vec![format!("{} must be specified", name)])
}

fn invalid(name: &str, value: &str, reason: impl Display) -> CommandError {
    CommandError::InvalidParameters(vec![format!("{} \"{}\" is invalid: {}", name, value, reason)])
}

/// Parameter values with `${Property}` references expanded
///
/// Blank values read as absent.
pub struct Args<'a> {
    parameters: &'a CommandParameters,
    processor: &'a CommandProcessor,
}

impl<'a> Args<'a> {
    pub fn new(parameters: &'a CommandParameters, processor: &'a CommandProcessor) -> Self {
        Self {
            parameters,
            processor,
        }
    }

    pub fn get(&self, name: &str) -> Option<String> {
        let raw = self.parameters.get(name)?;
        let expanded = self.processor.expand(raw);
        let trimmed = expanded.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    }

    /// Value without trimming; only an unset parameter is absent
    pub fn get_raw(&self, name: &str) -> Option<String> {
        self.parameters.get(name).map(|v| self.processor.expand(v))
    }

    pub fn require(&self, name: &str) -> Result<String> {
        self.get(name).ok_or_else(|| missing(name))
    }

    pub fn flag(&self, name: &str, default: bool) -> Result<bool> {
        match self.get(name) {
            None => Ok(default),
            Some(v) => parse_bool(&v).ok_or_else(|| invalid(name, &v, "expected True or False")),
        }
    }

    pub fn parse<T>(&self, name: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: Display,
    {
        self.get(name)
            .map(|v| v.parse::<T>().map_err(|e| invalid(name, &v, e)))
            .transpose()
    }

    /// A file path resolved against the working directory
    pub fn path(&self, name: &str) -> Option<PathBuf> {
        self.get(name).map(|v| self.processor.resolve_path(&v))
    }

    pub fn require_path(&self, name: &str) -> Result<PathBuf> {
        self.path(name).ok_or_else(|| missing(name))
    }

    pub fn list(&self, name: &str) -> Vec<String> {
        self.get(name).map(|v| split_list(&v)).unwrap_or_default()
    }

    pub fn pairs(&self, name: &str) -> Result<Vec<(String, String)>> {
        match self.get(name) {
            None => Ok(Vec::new()),
            Some(v) => parse_pairs(&v).map_err(|e| invalid(name, &v, e)),
        }
    }

    pub fn worksheet(&self) -> Option<String> {
        self.get("Worksheet")
    }

    pub fn keep_open(&self) -> Result<bool> {
        self.flag("KeepOpen", false)
    }

    pub fn area(&self) -> Result<ExcelArea> {
        ExcelArea::from_parameters(
            self.get("ExcelAddress").as_deref(),
            self.get("ExcelNamedRange").as_deref(),
            self.get("ExcelTableName").as_deref(),
        )
    }
}

/// Outcome of [`Command::check_parameters`](crate::command::Command::check_parameters)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckResult {
    pub problems: Vec<String>,
    pub warnings: Vec<String>,
}

impl CheckResult {
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn into_result(self) -> Result<Vec<String>> {
        if self.problems.is_empty() {
            Ok(self.warnings)
        } else {
            Err(CommandError::InvalidParameters(self.problems))
        }
    }
}

/// Collects every parameter problem instead of stopping at the first
///
/// A value that still holds a `${...}` reference after expansion is not
/// validated; the property may be set by an earlier command at run time.
pub struct ParameterCheck<'a> {
    args: Args<'a>,
    result: CheckResult,
}

impl<'a> ParameterCheck<'a> {
    pub fn new(parameters: &'a CommandParameters, processor: &'a CommandProcessor) -> Self {
        Self {
            args: Args::new(parameters, processor),
            result: CheckResult::default(),
        }
    }

    pub fn args(&self) -> &Args<'a> {
        &self.args
    }

    fn checkable(&self, name: &str) -> Option<String> {
        self.args.get(name).filter(|v| !v.contains("${"))
    }

    pub fn problem(&mut self, message: impl Into<String>) -> &mut Self {
        self.result.problems.push(message.into());
        self
    }

    pub fn warning(&mut self, message: impl Into<String>) -> &mut Self {
        self.result.warnings.push(message.into());
        self
    }

    pub fn require(&mut self, name: &str) -> &mut Self {
        if self.args.get(name).is_none() {
            self.problem(format!("{} must be specified", name));
        }
        self
    }

    /// Value must parse with `parse`; the error text becomes the reason
    pub fn validate<T, E: Display>(
        &mut self,
        name: &str,
        parse: impl FnOnce(&str) -> std::result::Result<T, E>,
    ) -> &mut Self {
        if let Some(v) = self.checkable(name) {
            if let Err(e) = parse(&v) {
                self.problem(format!("{} \"{}\" is invalid: {}", name, v, e));
            }
        }
        self
    }

    pub fn boolean(&mut self, name: &str) -> &mut Self {
        self.validate(name, |v| parse_bool(v).ok_or("expected True or False"))
    }

    /// Value must be one of `choices`, ignoring case
    pub fn enumeration(&mut self, name: &str, choices: &[&str]) -> &mut Self {
        self.validate(name, |v| {
            if choices.iter().any(|c| c.eq_ignore_ascii_case(v)) {
                Ok(())
            } else {
                Err(format!("expected one of {}", choices.join(", ")))
            }
        })
    }

    pub fn integer(&mut self, name: &str, range: RangeInclusive<i64>) -> &mut Self {
        self.validate(name, |v| match v.parse::<i64>() {
            Ok(n) if range.contains(&n) => Ok(()),
            Ok(_) => Err(format!("must be between {} and {}", range.start(), range.end())),
            Err(_) => Err("not an integer".to_string()),
        })
    }

    pub fn number(&mut self, name: &str) -> &mut Self {
        self.validate(name, |v| v.parse::<f64>().map_err(|_| "not a number"))
    }

    pub fn pairs(&mut self, name: &str) -> &mut Self {
        self.validate(name, parse_pairs)
    }

    /// At most one of `names` may be given
    pub fn exclusive(&mut self, names: &[&str]) -> &mut Self {
        let given: Vec<&str> = names
            .iter()
            .copied()
            .filter(|n| self.args.get(n).is_some())
            .collect();
        if given.len() > 1 {
            self.problem(format!("only one of {} can be specified", given.join(", ")));
        }
        self
    }

    /// The area parameters: mutually exclusive, and an address must parse
    pub fn area(&mut self) -> &mut Self {
        self.exclusive(AREA_PARAMETERS);
        self.validate("ExcelAddress", CellRange::parse)
    }

    /// Warn about parameters not in `valid`
    pub fn unknown(&mut self, valid: &[&str]) -> &mut Self {
        let unknown: Vec<String> = self
            .args
            .parameters
            .names()
            .filter(|n| !valid.iter().any(|v| v.eq_ignore_ascii_case(n)))
            .map(str::to_string)
            .collect();
        for name in unknown {
            self.warning(format!("unknown parameter {} is ignored", name));
        }
        self
    }

    pub fn finish(self) -> CheckResult {
        self.result
    }
}
