//! In-memory workbook model shared by every loader.

use std::collections::{BTreeMap, HashMap};

use gridcheck_recon::Value;

use crate::address::{CellAddress, RangeAddress, Reference};
use crate::error::IoError;

// ---------------------------------------------------------------------------
// Sheet
// ---------------------------------------------------------------------------

/// Sparse cell store. Cells never written read as `Value::Empty`.
#[derive(Debug, Clone, Default)]
pub struct Sheet {
    name: String,
    cells: HashMap<CellAddress, Value>,
    /// Bottom-right corner of every cell ever written.
    extent: Option<CellAddress>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Blank values are not stored.
    pub fn set(&mut self, at: CellAddress, value: Value) {
        if matches!(value, Value::Empty) {
            self.cells.remove(&at);
        } else {
            self.extent = Some(match self.extent {
                Some(e) => CellAddress::new(e.row.max(at.row), e.col.max(at.col)),
                None => at,
            });
            self.cells.insert(at, value);
        }
    }

    /// Used extent, if any cell was written.
    pub fn extent(&self) -> Option<CellAddress> {
        self.extent
    }

    pub fn cell(&self, at: CellAddress) -> Value {
        self.cells.get(&at).cloned().unwrap_or_default()
    }

    /// Dense grid over the part of `range` inside the used extent, padded
    /// with `Empty`. Rows and columns past the extent are left out.
    pub fn grid(&self, range: &RangeAddress) -> Vec<Vec<Value>> {
        let Some(extent) = self.extent else {
            return Vec::new();
        };
        let last_row = range.end.row.min(extent.row);
        let last_col = range.end.col.min(extent.col);
        (range.start.row..=last_row)
            .map(|row| {
                (range.start.col..=last_col)
                    .map(|col| self.cell(CellAddress::new(row, col)))
                    .collect()
            })
            .collect()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}

// ---------------------------------------------------------------------------
// Workbook
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct Workbook {
    name: String,
    sheets: Vec<Sheet>,
    /// Lower-cased name → target. Defined names are case-insensitive.
    names: BTreeMap<String, Reference>,
}

impl Workbook {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_sheet(&mut self, sheet: Sheet) {
        self.sheets.push(sheet);
    }

    pub fn define_name(&mut self, name: &str, target: Reference) {
        self.names.insert(name.to_lowercase(), target);
    }

    pub fn defined_name(&self, name: &str) -> Option<&Reference> {
        self.names.get(&name.to_lowercase())
    }

    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name.clone()).collect()
    }

    pub fn sheet(&self, name: &str) -> Result<SheetRef<'_>, IoError> {
        self.sheets
            .iter()
            .find(|s| s.name == name)
            .map(|sheet| SheetRef { workbook: self, sheet })
            .ok_or_else(|| IoError::SheetNotFound {
                workbook: self.name.clone(),
                sheet: name.to_string(),
                available: self.sheet_names(),
            })
    }
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Result of reading an address: one value for a single cell, rows otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum CellRead {
    Scalar(Value),
    Grid(Vec<Vec<Value>>),
}

impl CellRead {
    /// A grid collapses to its top-left cell.
    pub fn into_scalar(self) -> Value {
        match self {
            Self::Scalar(v) => v,
            Self::Grid(rows) => rows.into_iter().next().and_then(|r| r.into_iter().next()).unwrap_or_default(),
        }
    }

    pub fn into_grid(self) -> Vec<Vec<Value>> {
        match self {
            Self::Scalar(v) => vec![vec![v]],
            Self::Grid(rows) => rows,
        }
    }
}

/// A sheet together with its workbook, so reads can follow defined names
/// onto other sheets.
#[derive(Debug, Clone, Copy)]
pub struct SheetRef<'a> {
    workbook: &'a Workbook,
    sheet: &'a Sheet,
}

impl<'a> SheetRef<'a> {
    pub fn name(&self) -> &str {
        &self.sheet.name
    }

    pub fn workbook(&self) -> &'a Workbook {
        self.workbook
    }

    /// Read an A1 address (`F17`, `E30:M39`, `'Other'!A1`) or a defined name.
    pub fn read(&self, address: &str) -> Result<CellRead, IoError> {
        let target = match address.parse::<Reference>() {
            Ok(reference) => reference,
            Err(_) => self.workbook.defined_name(address.trim()).cloned().ok_or_else(|| {
                IoError::NameNotFound {
                    workbook: self.workbook.name.clone(),
                    name: address.to_string(),
                }
            })?,
        };

        let sheet = match &target.sheet {
            Some(other) if other != &self.sheet.name => self.workbook.sheet(other)?.sheet,
            _ => self.sheet,
        };

        log::trace!("read {}!{}", sheet.name, target.range);
        if target.range.is_single_cell() {
            Ok(CellRead::Scalar(sheet.cell(target.range.start)))
        } else {
            Ok(CellRead::Grid(sheet.grid(&target.range)))
        }
    }

    pub fn read_range(&self, range: &RangeAddress) -> Vec<Vec<Value>> {
        self.sheet.grid(range)
    }

    pub fn cell(&self, at: CellAddress) -> Value {
        self.sheet.cell(at)
    }
}
