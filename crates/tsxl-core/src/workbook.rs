//! Workbook type - the main document structure

use crate::error::{Error, Result};
use crate::named_range::{DefinedName, DefinedNames, NameScope};
use crate::table::WorksheetTable;
use crate::worksheet::Worksheet;
use crate::MAX_SHEET_NAME_LEN;

/// A workbook: ordered worksheets plus workbook-wide names and settings
#[derive(Debug, Clone)]
pub struct Workbook {
    worksheets: Vec<Worksheet>,
    names: DefinedNames,
    settings: WorkbookSettings,
}

/// Workbook-level settings
#[derive(Debug, Clone, PartialEq)]
pub struct WorkbookSettings {
    /// Date system: false = 1900 (Windows), true = 1904 (Mac)
    pub date_1904: bool,
    /// Index of the sheet shown when the file opens
    pub active_sheet: usize,
    /// Ask Excel to recalculate every formula on load
    pub full_calc_on_load: bool,
}

impl Default for WorkbookSettings {
    fn default() -> Self {
        Self {
            date_1904: false,
            active_sheet: 0,
            full_calc_on_load: true,
        }
    }
}

impl Workbook {
    /// Create a workbook with a single sheet named `Sheet1`
    pub fn new() -> Self {
        Self {
            worksheets: vec![Worksheet::new("Sheet1")],
            names: DefinedNames::new(),
            settings: WorkbookSettings::default(),
        }
    }

    /// Create a workbook with no worksheets
    pub fn empty() -> Self {
        Self {
            worksheets: Vec::new(),
            names: DefinedNames::new(),
            settings: WorkbookSettings::default(),
        }
    }

    pub fn sheet_count(&self) -> usize {
        self.worksheets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.worksheets.is_empty()
    }

    pub fn worksheet(&self, index: usize) -> Option<&Worksheet> {
        self.worksheets.get(index)
    }

    pub fn worksheet_mut(&mut self, index: usize) -> Option<&mut Worksheet> {
        self.worksheets.get_mut(index)
    }

    /// Worksheet by name, ignoring case
    pub fn worksheet_by_name(&self, name: &str) -> Option<&Worksheet> {
        self.sheet_index(name).and_then(|i| self.worksheets.get(i))
    }

    pub fn worksheet_by_name_mut(&mut self, name: &str) -> Option<&mut Worksheet> {
        self.sheet_index(name).and_then(move |i| self.worksheets.get_mut(i))
    }

    /// Index of the sheet with this name, ignoring case
    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        let lower = name.to_lowercase();
        self.worksheets
            .iter()
            .position(|ws| ws.name().to_lowercase() == lower)
    }

    pub fn worksheets(&self) -> impl Iterator<Item = &Worksheet> {
        self.worksheets.iter()
    }

    pub fn worksheets_mut(&mut self) -> impl Iterator<Item = &mut Worksheet> {
        self.worksheets.iter_mut()
    }

    /// Sheet names in tab order
    pub fn sheet_names(&self) -> Vec<&str> {
        self.worksheets.iter().map(|ws| ws.name()).collect()
    }

    // === Sheet Management ===

    /// Append a sheet with a generated `SheetN` name
    pub fn add_worksheet(&mut self) -> Result<usize> {
        let name = self.generate_sheet_name();
        self.add_worksheet_with_name(&name)
    }

    /// Append a sheet and return its index
    pub fn add_worksheet_with_name(&mut self, name: &str) -> Result<usize> {
        self.validate_sheet_name(name, None)?;
        self.worksheets.push(Worksheet::new(name));
        Ok(self.worksheets.len() - 1)
    }

    /// Append a sheet built elsewhere (used by readers)
    pub fn add_existing_worksheet(&mut self, worksheet: Worksheet) -> Result<usize> {
        self.validate_sheet_name(worksheet.name(), None)?;
        for table in worksheet.tables() {
            self.check_table_name(&table.name)?;
        }
        self.worksheets.push(worksheet);
        Ok(self.worksheets.len() - 1)
    }

    /// Insert a sheet at `index`
    ///
    /// Sheet-local names keep pointing at the same sheets.
    pub fn insert_worksheet(&mut self, index: usize, name: &str) -> Result<()> {
        if index > self.worksheets.len() {
            return Err(Error::SheetOutOfBounds(index, self.worksheets.len()));
        }
        self.validate_sheet_name(name, None)?;
        let shifted: Vec<DefinedName> = self
            .names
            .iter()
            .filter(|n| matches!(n.scope, NameScope::Sheet(i) if i >= index))
            .cloned()
            .collect();
        for mut name in shifted {
            self.names.remove(&name.name, name.scope);
            if let NameScope::Sheet(i) = name.scope {
                name.scope = NameScope::Sheet(i + 1);
            }
            self.names.define_or_replace(name)?;
        }
        self.worksheets.insert(index, Worksheet::new(name));
        if self.settings.active_sheet >= index && self.worksheets.len() > 1 {
            self.settings.active_sheet += 1;
        }
        Ok(())
    }

    /// Remove and return the sheet at `index`, along with its local names
    pub fn remove_worksheet(&mut self, index: usize) -> Result<Worksheet> {
        if index >= self.worksheets.len() {
            return Err(Error::SheetOutOfBounds(index, self.worksheets.len()));
        }
        let ws = self.worksheets.remove(index);
        self.names.sheet_removed(index);
        let active = self.settings.active_sheet;
        if active > index || (active == index && active >= self.worksheets.len()) {
            self.settings.active_sheet = active.saturating_sub(1);
        }
        Ok(ws)
    }

    pub fn rename_worksheet(&mut self, index: usize, new_name: &str) -> Result<()> {
        if index >= self.worksheets.len() {
            return Err(Error::SheetOutOfBounds(index, self.worksheets.len()));
        }
        self.validate_sheet_name(new_name, Some(index))?;
        self.worksheets[index].set_name(new_name);
        Ok(())
    }

    pub fn active_sheet(&self) -> usize {
        self.settings.active_sheet
    }

    pub fn set_active_sheet(&mut self, index: usize) -> Result<()> {
        if index >= self.worksheets.len() {
            return Err(Error::SheetOutOfBounds(index, self.worksheets.len()));
        }
        self.settings.active_sheet = index;
        Ok(())
    }

    pub fn settings(&self) -> &WorkbookSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut WorkbookSettings {
        &mut self.settings
    }

    pub fn is_date_1904(&self) -> bool {
        self.settings.date_1904
    }

    // === Defined Names ===

    /// Define a workbook-scoped name
    pub fn define_name(&mut self, name: &str, refers_to: &str) -> Result<()> {
        self.define(DefinedName::new(name, refers_to, NameScope::Workbook))
    }

    /// Define a name local to one sheet
    pub fn define_name_for_sheet(
        &mut self,
        name: &str,
        refers_to: &str,
        sheet_index: usize,
    ) -> Result<()> {
        if sheet_index >= self.worksheets.len() {
            return Err(Error::SheetOutOfBounds(sheet_index, self.worksheets.len()));
        }
        self.define(DefinedName::new(name, refers_to, NameScope::Sheet(sheet_index)))
    }

    /// Add a fully built name; table names are reserved
    pub fn define(&mut self, name: DefinedName) -> Result<()> {
        if self.table_by_name(&name.name).is_some() {
            return Err(Error::DuplicateName(name.name));
        }
        self.names.define(name)
    }

    /// Look up a name as seen from `current_sheet`
    pub fn named_range(&self, name: &str, current_sheet: Option<usize>) -> Option<&DefinedName> {
        self.names.get(name, current_sheet)
    }

    pub fn names(&self) -> &DefinedNames {
        &self.names
    }

    pub fn names_mut(&mut self) -> &mut DefinedNames {
        &mut self.names
    }

    // === Tables ===

    /// Add a table to a sheet and return its id
    ///
    /// Table names are unique across the workbook and share a namespace with
    /// defined names. Ids are assigned when the table has none.
    pub fn add_table(&mut self, sheet_index: usize, mut table: WorksheetTable) -> Result<u32> {
        let count = self.worksheets.len();
        if sheet_index >= count {
            return Err(Error::SheetOutOfBounds(sheet_index, count));
        }
        table.validate()?;
        self.check_table_name(&table.name)?;

        let max_id = self
            .worksheets
            .iter()
            .flat_map(|ws| ws.tables())
            .map(|t| t.id)
            .max()
            .unwrap_or(0);
        if table.id == 0 || self.worksheets.iter().flat_map(|ws| ws.tables()).any(|t| t.id == table.id) {
            table.id = max_id + 1;
        }
        let id = table.id;
        self.worksheets[sheet_index].push_table(table)?;
        Ok(id)
    }

    /// Table by name, ignoring case, with the index of its sheet
    pub fn table_by_name(&self, name: &str) -> Option<(usize, &WorksheetTable)> {
        self.worksheets
            .iter()
            .enumerate()
            .find_map(|(i, ws)| ws.table(name).map(|t| (i, t)))
    }

    fn check_table_name(&self, name: &str) -> Result<()> {
        if self.table_by_name(name).is_some() || self.names.find_any(name).is_some() {
            return Err(Error::InvalidTable {
                name: name.to_string(),
                reason: "name is already used in the workbook".into(),
            });
        }
        Ok(())
    }

    // === Validation ===

    fn validate_sheet_name(&self, name: &str, exclude_index: Option<usize>) -> Result<()> {
        validate_sheet_name(name)?;
        let lower = name.to_lowercase();
        let taken = self
            .worksheets
            .iter()
            .enumerate()
            .any(|(i, ws)| Some(i) != exclude_index && ws.name().to_lowercase() == lower);
        if taken {
            return Err(Error::DuplicateSheetName(name.into()));
        }
        Ok(())
    }

    fn generate_sheet_name(&self) -> String {
        let mut n = self.worksheets.len() + 1;
        loop {
            let name = format!("Sheet{}", n);
            if self.sheet_index(&name).is_none() {
                return name;
            }
            n += 1;
        }
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

/// Check a sheet name against Excel's rules (length, reserved characters)
pub fn validate_sheet_name(name: &str) -> Result<()> {
    let invalid = |reason| {
        Err(Error::InvalidSheetName {
            name: name.to_string(),
            reason,
        })
    };
    if name.trim().is_empty() {
        return invalid("sheet name cannot be empty");
    }
    if name.chars().count() > MAX_SHEET_NAME_LEN {
        return invalid("sheet name is longer than 31 characters");
    }
    if name.contains([':', '\\', '/', '?', '*', '[', ']']) {
        return invalid("sheet name cannot contain : \\ / ? * [ ]");
    }
    if name.starts_with('\'') || name.ends_with('\'') {
        return invalid("sheet name cannot begin or end with an apostrophe");
    }
    if name.eq_ignore_ascii_case("History") {
        return invalid("'History' is reserved");
    }
    Ok(())
}
