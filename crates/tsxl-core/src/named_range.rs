//! Defined names (named ranges)
//!
//! A defined name maps a name such as `FlowData` to a formula, usually an area
//! like `Sheet1!$A$1:$D$40`. Names are case-insensitive and are either
//! workbook-wide or local to one sheet.

use lazy_regex::regex;

use crate::cell::AreaReference;
use crate::error::{Error, Result};

/// Scope of a defined name
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameScope {
    /// Visible from every sheet
    Workbook,
    /// Local to the sheet at this index (`localSheetId`)
    Sheet(usize),
}

/// A defined name
#[derive(Debug, Clone, PartialEq)]
pub struct DefinedName {
    pub name: String,
    pub scope: NameScope,
    /// Formula text without a leading `=`, e.g. `Sheet1!$A$1:$A$10`
    pub refers_to: String,
    pub comment: Option<String>,
    pub hidden: bool,
}

impl DefinedName {
    pub fn new(name: impl Into<String>, refers_to: impl Into<String>, scope: NameScope) -> Self {
        let refers_to = refers_to.into();
        let refers_to = refers_to
            .strip_prefix('=')
            .map(str::to_string)
            .unwrap_or(refers_to);
        Self {
            name: name.into(),
            scope,
            refers_to,
            comment: None,
            hidden: false,
        }
    }

    /// Name pointing at an area
    pub fn for_area(name: impl Into<String>, area: &AreaReference, scope: NameScope) -> Self {
        Self::new(name, area.to_formula_string(), scope)
    }

    /// Interpret the formula as an area reference
    ///
    /// Fails for constants, formulas and names whose area was deleted (`#REF!`).
    pub fn area(&self) -> Result<AreaReference> {
        AreaReference::parse(&self.refers_to).map_err(|e| {
            Error::InvalidRange(format!(
                "name '{}' does not refer to a cell area ({}): {}",
                self.name, self.refers_to, e
            ))
        })
    }

    /// Excel's internal names (`_xlnm.Print_Area`, `_xlnm._FilterDatabase`)
    pub fn is_builtin(&self) -> bool {
        self.name.starts_with("_xlnm.")
    }
}

/// Check a name against Excel's naming rules
pub fn validate_name(name: &str) -> Result<()> {
    let invalid = |reason| {
        Err(Error::InvalidName {
            name: name.to_string(),
            reason,
        })
    };

    if name.is_empty() {
        return invalid("name cannot be empty");
    }
    if name.chars().count() > 255 {
        return invalid("name is longer than 255 characters");
    }
    if !regex!(r"^[\p{L}_\\][\p{L}\p{N}_.\\?]*$").is_match(name) {
        return invalid("names start with a letter, '_' or '\\' and contain no spaces or symbols");
    }
    if regex!(r"^(?i)[a-z]{1,3}[0-9]+$").is_match(name)
        || regex!(r"^(?i)r[0-9]*c[0-9]*$").is_match(name)
        || name.eq_ignore_ascii_case("r")
        || name.eq_ignore_ascii_case("c")
    {
        return invalid("name looks like a cell reference");
    }
    Ok(())
}

/// Defined names of a workbook, kept in definition order
#[derive(Debug, Clone, Default)]
pub struct DefinedNames {
    names: Vec<DefinedName>,
}

impl DefinedNames {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, name: &str, scope: NameScope) -> Option<usize> {
        self.names
            .iter()
            .position(|n| n.scope == scope && n.name.eq_ignore_ascii_case(name))
    }

    /// Add a name; fails when the name is invalid or already defined in the scope
    pub fn define(&mut self, name: DefinedName) -> Result<()> {
        if !name.is_builtin() {
            validate_name(&name.name)?;
        }
        if self.position(&name.name, name.scope).is_some() {
            return Err(Error::DuplicateName(name.name));
        }
        self.names.push(name);
        Ok(())
    }

    /// Add or replace a name in its scope
    pub fn define_or_replace(&mut self, name: DefinedName) -> Result<()> {
        if !name.is_builtin() {
            validate_name(&name.name)?;
        }
        match self.position(&name.name, name.scope) {
            Some(i) => self.names[i] = name,
            None => self.names.push(name),
        }
        Ok(())
    }

    /// Look up a name as seen from `current_sheet`
    ///
    /// A name local to the current sheet hides a workbook-wide name.
    pub fn get(&self, name: &str, current_sheet: Option<usize>) -> Option<&DefinedName> {
        current_sheet
            .and_then(|s| self.position(name, NameScope::Sheet(s)))
            .or_else(|| self.position(name, NameScope::Workbook))
            .map(|i| &self.names[i])
    }

    /// Find a name in any scope, preferring workbook scope
    pub fn find_any(&self, name: &str) -> Option<&DefinedName> {
        self.get(name, None).or_else(|| {
            self.names
                .iter()
                .find(|n| n.name.eq_ignore_ascii_case(name))
        })
    }

    pub fn remove(&mut self, name: &str, scope: NameScope) -> Option<DefinedName> {
        self.position(name, scope).map(|i| self.names.remove(i))
    }

    /// Adjust sheet-local names after the sheet at `index` was removed
    pub(crate) fn sheet_removed(&mut self, index: usize) {
        self.names.retain(|n| n.scope != NameScope::Sheet(index));
        for n in &mut self.names {
            if let NameScope::Sheet(i) = n.scope {
                if i > index {
                    n.scope = NameScope::Sheet(i - 1);
                }
            }
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &DefinedName> {
        self.names.iter()
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellRange;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_validate_name() {
        assert!(validate_name("FlowData").is_ok());
        assert!(validate_name("_total.2020").is_ok());
        assert!(validate_name("Débit").is_ok());

        assert!(validate_name("").is_err());
        assert!(validate_name("has space").is_err());
        assert!(validate_name("1abc").is_err());
        assert!(validate_name("A1").is_err());
        assert!(validate_name("XFD100").is_err());
        assert!(validate_name("R1C1").is_err());
        assert!(validate_name("r").is_err());
    }

    #[test]
    fn test_scope_lookup() {
        let mut names = DefinedNames::new();
        names
            .define(DefinedName::new("Data", "Sheet1!$A$1:$B$5", NameScope::Workbook))
            .unwrap();
        names
            .define(DefinedName::new("data", "Sheet2!$C$1", NameScope::Sheet(1)))
            .unwrap();

        assert_eq!(names.get("DATA", Some(0)).unwrap().refers_to, "Sheet1!$A$1:$B$5");
        assert_eq!(names.get("DATA", Some(1)).unwrap().refers_to, "Sheet2!$C$1");
        assert!(names
            .define(DefinedName::new("DATA", "Sheet1!$A$1", NameScope::Workbook))
            .is_err());
    }

    #[test]
    fn test_area() {
        let area = AreaReference::new("Flow Data", CellRange::parse("B2:D9").unwrap());
        let name = DefinedName::for_area("Flows", &area, NameScope::Workbook);
        assert_eq!(name.refers_to, "'Flow Data'!$B$2:$D$9");
        assert_eq!(name.area().unwrap().range, area.range);

        let constant = DefinedName::new("Rate", "=0.07", NameScope::Workbook);
        assert_eq!(constant.refers_to, "0.07");
        assert!(constant.area().is_err());
    }

    #[test]
    fn test_sheet_removed_shifts_scopes() {
        let mut names = DefinedNames::new();
        names
            .define(DefinedName::new("a", "S1!A1", NameScope::Sheet(0)))
            .unwrap();
        names
            .define(DefinedName::new("b", "S3!A1", NameScope::Sheet(2)))
            .unwrap();
        names.sheet_removed(0);
        assert_eq!(names.len(), 1);
        assert_eq!(names.iter().next().unwrap().scope, NameScope::Sheet(1));
    }
}
