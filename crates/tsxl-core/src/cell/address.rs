//! Cell addresses, ranges and sheet-qualified area references

use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};
use std::fmt;
use std::str::FromStr;

/// A cell address (e.g., "A1", "$B$2")
///
/// Rows and columns are 0-based internally; A1 notation is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellAddress {
    /// Row index (0-based)
    pub row: u32,
    /// Column index (0-based, A=0)
    pub col: u16,
    /// Whether the row reference is absolute ($)
    pub row_absolute: bool,
    /// Whether the column reference is absolute ($)
    pub col_absolute: bool,
}

impl CellAddress {
    /// Create a relative cell address
    pub fn new(row: u32, col: u16) -> Self {
        Self {
            row,
            col,
            row_absolute: false,
            col_absolute: false,
        }
    }

    /// Create an absolute cell address ($A$1 style)
    pub fn absolute(row: u32, col: u16) -> Self {
        Self {
            row,
            col,
            row_absolute: true,
            col_absolute: true,
        }
    }

    /// Parse a cell address from A1-style notation
    ///
    /// ```
    /// use tsxl_core::CellAddress;
    ///
    /// let addr = CellAddress::parse("$C$7").unwrap();
    /// assert_eq!((addr.row, addr.col), (6, 2));
    /// assert!(addr.row_absolute && addr.col_absolute);
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidAddress("empty address".into()));
        }

        let bytes = s.as_bytes();
        let mut pos = 0;

        let col_absolute = bytes.first() == Some(&b'$');
        if col_absolute {
            pos += 1;
        }

        let col_start = pos;
        while pos < bytes.len() && bytes[pos].is_ascii_alphabetic() {
            pos += 1;
        }
        if pos == col_start {
            return Err(Error::InvalidAddress(format!("no column letters in '{}'", s)));
        }
        let col = Self::letters_to_column(&s[col_start..pos])?;

        let row_absolute = bytes.get(pos) == Some(&b'$');
        if row_absolute {
            pos += 1;
        }

        let row_str = &s[pos..];
        if row_str.is_empty() {
            return Err(Error::InvalidAddress(format!("no row number in '{}'", s)));
        }
        let row = Self::parse_row_number(row_str)
            .map_err(|_| Error::InvalidAddress(format!("invalid row number in '{}'", s)))?;

        Ok(Self {
            row,
            col,
            row_absolute,
            col_absolute,
        })
    }

    /// Parse a 1-based row number into a 0-based index
    fn parse_row_number(s: &str) -> Result<u32> {
        if !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidAddress(s.to_string()));
        }
        let row: u32 = s
            .parse()
            .map_err(|_| Error::InvalidAddress(s.to_string()))?;
        if row == 0 {
            return Err(Error::InvalidAddress("row number must be >= 1".into()));
        }
        if row > MAX_ROWS {
            return Err(Error::RowOutOfBounds(row - 1, MAX_ROWS - 1));
        }
        Ok(row - 1)
    }

    /// Convert a column index to letters (0 = A, 25 = Z, 26 = AA)
    pub fn column_to_letters(col: u16) -> String {
        let mut letters = Vec::with_capacity(3);
        let mut n = col as u32 + 1;
        while n > 0 {
            n -= 1;
            letters.push(b'A' + (n % 26) as u8);
            n /= 26;
        }
        letters.reverse();
        String::from_utf8(letters).unwrap_or_default()
    }

    /// Convert column letters to an index (A = 0, Z = 25, AA = 26)
    pub fn letters_to_column(letters: &str) -> Result<u16> {
        if letters.is_empty() {
            return Err(Error::InvalidAddress("empty column letters".into()));
        }

        let mut col: u32 = 0;
        for c in letters.chars() {
            if !c.is_ascii_alphabetic() {
                return Err(Error::InvalidAddress(format!(
                    "invalid column letter '{}'",
                    c
                )));
            }
            col = col * 26 + (c.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
            if col > MAX_COLS as u32 {
                return Err(Error::ColumnOutOfBounds(col - 1, MAX_COLS - 1));
            }
        }

        Ok((col - 1) as u16)
    }

    /// Format as A1-style string
    pub fn to_a1_string(&self) -> String {
        let mut result = String::new();
        if self.col_absolute {
            result.push('$');
        }
        result.push_str(&Self::column_to_letters(self.col));
        if self.row_absolute {
            result.push('$');
        }
        result.push_str(&(self.row + 1).to_string());
        result
    }

    /// Same cell with both references made absolute
    pub fn to_absolute(self) -> Self {
        Self::absolute(self.row, self.col)
    }

    /// Same cell with the `$` flags dropped
    pub fn to_relative(self) -> Self {
        Self::new(self.row, self.col)
    }

    /// Offset this address, failing when the result leaves the sheet
    pub fn offset(&self, rows: i64, cols: i64) -> Result<Self> {
        let row = self.row as i64 + rows;
        let col = self.col as i64 + cols;
        if row < 0 || row >= MAX_ROWS as i64 {
            return Err(Error::RowOutOfBounds(row.max(0) as u32, MAX_ROWS - 1));
        }
        if col < 0 || col >= MAX_COLS as i64 {
            return Err(Error::ColumnOutOfBounds(col.max(0) as u32, MAX_COLS - 1));
        }
        Ok(Self::new(row as u32, col as u16))
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1_string())
    }
}

impl FromStr for CellAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A rectangular block of cells (e.g., "A1:B10")
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    /// Top-left cell
    pub start: CellAddress,
    /// Bottom-right cell
    pub end: CellAddress,
}

impl CellRange {
    /// Create a range, normalizing so `start` is top-left
    pub fn new(start: CellAddress, end: CellAddress) -> Self {
        let (top, bottom) = if start.row <= end.row {
            (start.row, end.row)
        } else {
            (end.row, start.row)
        };
        let (left, right) = if start.col <= end.col {
            (start.col, end.col)
        } else {
            (end.col, start.col)
        };

        Self {
            start: CellAddress {
                row: top,
                col: left,
                row_absolute: start.row_absolute,
                col_absolute: start.col_absolute,
            },
            end: CellAddress {
                row: bottom,
                col: right,
                row_absolute: end.row_absolute,
                col_absolute: end.col_absolute,
            },
        }
    }

    /// Create a range from 0-based indices
    pub fn from_indices(start_row: u32, start_col: u16, end_row: u32, end_col: u16) -> Self {
        Self::new(
            CellAddress::new(start_row, start_col),
            CellAddress::new(end_row, end_col),
        )
    }

    /// Create a single-cell range
    pub fn single(addr: CellAddress) -> Self {
        Self {
            start: addr,
            end: addr,
        }
    }

    /// Parse `A1:B10`, `C3`, whole columns `A:C` or whole rows `2:5`
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let Some((left, right)) = s.split_once(':') else {
            return CellAddress::parse(s).map(Self::single);
        };

        let left = left.trim().trim_start_matches('$');
        let right = right.trim().trim_start_matches('$');

        if !left.is_empty() && left.bytes().all(|b| b.is_ascii_alphabetic()) {
            if !right.bytes().all(|b| b.is_ascii_alphabetic()) {
                return Err(Error::InvalidRange(s.to_string()));
            }
            let c1 = CellAddress::letters_to_column(left)?;
            let c2 = CellAddress::letters_to_column(right)?;
            return Ok(Self::from_indices(0, c1, MAX_ROWS - 1, c2));
        }

        if !left.is_empty() && left.bytes().all(|b| b.is_ascii_digit()) {
            let r1 = CellAddress::parse_row_number(left)
                .map_err(|_| Error::InvalidRange(s.to_string()))?;
            let r2 = CellAddress::parse_row_number(right)
                .map_err(|_| Error::InvalidRange(s.to_string()))?;
            return Ok(Self::from_indices(r1, 0, r2, MAX_COLS - 1));
        }

        let (left, right) = s.split_once(':').unwrap_or((s, s));
        let start = CellAddress::parse(left).map_err(|_| Error::InvalidRange(s.to_string()))?;
        let end = CellAddress::parse(right).map_err(|_| Error::InvalidRange(s.to_string()))?;
        Ok(Self::new(start, end))
    }

    /// Check if a cell is within this range
    pub fn contains(&self, row: u32, col: u16) -> bool {
        row >= self.start.row && row <= self.end.row && col >= self.start.col && col <= self.end.col
    }

    /// Number of rows in the range
    pub fn row_count(&self) -> u32 {
        self.end.row - self.start.row + 1
    }

    /// Number of columns in the range
    pub fn col_count(&self) -> u16 {
        self.end.col - self.start.col + 1
    }

    /// Total number of cells in the range
    pub fn cell_count(&self) -> u64 {
        self.row_count() as u64 * self.col_count() as u64
    }

    /// Check if this range overlaps with another
    pub fn overlaps(&self, other: &CellRange) -> bool {
        self.start.row <= other.end.row
            && self.end.row >= other.start.row
            && self.start.col <= other.end.col
            && self.end.col >= other.start.col
    }

    /// Intersection of two ranges, if any
    pub fn intersect(&self, other: &CellRange) -> Option<CellRange> {
        if !self.overlaps(other) {
            return None;
        }
        Some(CellRange::from_indices(
            self.start.row.max(other.start.row),
            self.start.col.max(other.start.col),
            self.end.row.min(other.end.row),
            self.end.col.min(other.end.col),
        ))
    }

    /// Same rectangle with `$` on every reference
    pub fn to_absolute(self) -> Self {
        Self {
            start: self.start.to_absolute(),
            end: self.end.to_absolute(),
        }
    }

    pub fn to_relative(self) -> Self {
        Self {
            start: self.start.to_relative(),
            end: self.end.to_relative(),
        }
    }

    /// Iterate over all cell addresses in the range, row by row
    pub fn cells(&self) -> CellRangeIterator {
        CellRangeIterator {
            range: *self,
            row: self.start.row,
            col: self.start.col,
            done: false,
        }
    }

    /// Format as `A1:B10` (or `A1` for a single cell)
    pub fn to_a1_string(&self) -> String {
        if self.start.row == self.end.row && self.start.col == self.end.col {
            self.start.to_a1_string()
        } else {
            format!("{}:{}", self.start.to_a1_string(), self.end.to_a1_string())
        }
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_a1_string())
    }
}

impl FromStr for CellRange {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Iterator over the cells of a [`CellRange`]
pub struct CellRangeIterator {
    range: CellRange,
    row: u32,
    col: u16,
    done: bool,
}

impl Iterator for CellRangeIterator {
    type Item = CellAddress;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let addr = CellAddress::new(self.row, self.col);
        if self.col < self.range.end.col {
            self.col += 1;
        } else if self.row < self.range.end.row {
            self.col = self.range.start.col;
            self.row += 1;
        } else {
            self.done = true;
        }
        Some(addr)
    }
}

/// A range optionally qualified by a sheet name (`'Data 2020'!$A$1:$C$9`)
///
/// This is the form used by defined names and table references.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AreaReference {
    /// Sheet qualifier, unquoted
    pub sheet: Option<String>,
    /// The cells
    pub range: CellRange,
}

impl AreaReference {
    /// Create an area on a named sheet
    pub fn new<S: Into<String>>(sheet: S, range: CellRange) -> Self {
        Self {
            sheet: Some(sheet.into()),
            range,
        }
    }

    /// Parse an area, accepting a leading `=` as used in defined names
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let s = s.strip_prefix('=').unwrap_or(s).trim();
        if s.is_empty() {
            return Err(Error::InvalidRange("empty area reference".into()));
        }

        let Some(bang) = s.rfind('!') else {
            return Ok(Self {
                sheet: None,
                range: CellRange::parse(s)?,
            });
        };

        let (sheet_part, range_part) = (&s[..bang], &s[bang + 1..]);
        let sheet = if let Some(quoted) = sheet_part
            .strip_prefix('\'')
            .and_then(|q| q.strip_suffix('\''))
        {
            quoted.replace("''", "'")
        } else {
            sheet_part.to_string()
        };

        if sheet.is_empty() {
            return Err(Error::InvalidRange(format!("missing sheet name in '{}'", s)));
        }
        if range_part.eq_ignore_ascii_case("#REF!") {
            return Err(Error::InvalidRange(format!("'{}' refers to a deleted area", s)));
        }

        Ok(Self {
            sheet: Some(sheet),
            range: CellRange::parse(range_part)?,
        })
    }

    /// Quote a sheet name when it contains anything other than letters, digits, `_` or `.`
    pub fn quote_sheet_name(name: &str) -> String {
        let plain = !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_alphanumeric() || c == '_' || c == '.')
            && !name.starts_with(|c: char| c.is_ascii_digit());
        if plain {
            name.to_string()
        } else {
            format!("'{}'", name.replace('\'', "''"))
        }
    }

    /// Absolute form used in `definedName` and formulas
    pub fn to_formula_string(&self) -> String {
        let range = self.range.to_absolute().to_a1_string();
        match &self.sheet {
            Some(sheet) => format!("{}!{}", Self::quote_sheet_name(sheet), range),
            None => range,
        }
    }
}

impl fmt::Display for AreaReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sheet {
            Some(sheet) => write!(f, "{}!{}", Self::quote_sheet_name(sheet), self.range),
            None => write!(f, "{}", self.range),
        }
    }
}
