//! A1-style cell and range addresses.

use std::fmt;
use std::str::FromStr;

use crate::error::IoError;

/// Zero-based cell position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellAddress {
    pub row: u32,
    pub col: u32,
}

impl CellAddress {
    pub fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }
}

fn bad(address: &str, reason: &str) -> IoError {
    IoError::BadAddress { address: address.to_string(), reason: reason.to_string() }
}

impl FromStr for CellAddress {
    type Err = IoError;

    /// `B5` → (4, 1). Absolute markers (`$F$17`) are accepted and ignored.
    fn from_str(s: &str) -> Result<Self, IoError> {
        let cleaned: String = s.trim().chars().filter(|c| *c != '$').collect();
        let split = cleaned.find(|c: char| !c.is_ascii_alphabetic()).unwrap_or(cleaned.len());
        let (letters, digits) = cleaned.split_at(split);

        if letters.is_empty() || letters.len() > 3 {
            return Err(bad(s, "expected column letters"));
        }
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(bad(s, "expected row number"));
        }

        let mut col: u32 = 0;
        for ch in letters.chars() {
            col = col * 26 + (ch.to_ascii_uppercase() as u32 - 'A' as u32 + 1);
        }
        let row: u32 = digits.parse().map_err(|_| bad(s, "row number out of range"))?;
        if row == 0 {
            return Err(bad(s, "rows start at 1"));
        }

        Ok(Self { row: row - 1, col: col - 1 })
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", col_to_letter(self.col), self.row + 1)
    }
}

/// Column index to letters (0 = A, 25 = Z, 26 = AA).
pub fn col_to_letter(col: u32) -> String {
    let mut result = String::new();
    let mut n = col;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

/// Inclusive rectangle. A single cell is a 1x1 range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RangeAddress {
    pub start: CellAddress,
    pub end: CellAddress,
}

impl RangeAddress {
    /// Corners in any order.
    pub fn from_corners(a: CellAddress, b: CellAddress) -> Self {
        Self {
            start: CellAddress::new(a.row.min(b.row), a.col.min(b.col)),
            end: CellAddress::new(a.row.max(b.row), a.col.max(b.col)),
        }
    }

    pub fn height(&self) -> usize {
        (self.end.row - self.start.row) as usize + 1
    }

    pub fn width(&self) -> usize {
        (self.end.col - self.start.col) as usize + 1
    }

    pub fn is_single_cell(&self) -> bool {
        self.start == self.end
    }
}

impl FromStr for RangeAddress {
    type Err = IoError;

    fn from_str(s: &str) -> Result<Self, IoError> {
        match s.split_once(':') {
            Some((a, b)) => Ok(Self::from_corners(a.parse()?, b.parse()?)),
            None => {
                let cell: CellAddress = s.parse()?;
                Ok(Self { start: cell, end: cell })
            }
        }
    }
}

impl fmt::Display for RangeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single_cell() {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}:{}", self.start, self.end)
        }
    }
}

/// A range, optionally qualified by sheet: `'View portfolios'!$F$21`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub sheet: Option<String>,
    pub range: RangeAddress,
}

impl FromStr for Reference {
    type Err = IoError;

    fn from_str(s: &str) -> Result<Self, IoError> {
        let s = s.trim().trim_start_matches('=');
        match s.rsplit_once('!') {
            Some((sheet, range)) => {
                let sheet = sheet
                    .strip_prefix('\'')
                    .and_then(|q| q.strip_suffix('\''))
                    .map(|q| q.replace("''", "'"))
                    .unwrap_or_else(|| sheet.to_string());
                if sheet.is_empty() {
                    return Err(bad(s, "empty sheet name"));
                }
                Ok(Self { sheet: Some(sheet), range: range.parse()? })
            }
            None => Ok(Self { sheet: None, range: s.parse()? }),
        }
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.sheet {
            Some(sheet) => write!(f, "'{}'!{}", sheet.replace('\'', "''"), self.range),
            None => write!(f, "{}", self.range),
        }
    }
}
