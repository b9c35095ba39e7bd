//! `gridcheck-io`: read-only workbook access for spreadsheet validation.
//!
//! Workbooks load into an in-memory [`Workbook`]; reads go through
//! [`SheetRef::read`] with A1 addresses or defined names.

pub mod address;
pub mod csv;
pub mod error;
pub mod workbook;
pub mod xlsx;

use std::path::{Path, PathBuf};

pub use address::{CellAddress, RangeAddress, Reference};
pub use error::IoError;
pub use workbook::{CellRead, Sheet, SheetRef, Workbook};

/// Resolve `name` against `base_dir` (absolute names are used as-is).
pub fn resolve_path(base_dir: &Path, name: &str) -> PathBuf {
    let path = Path::new(name);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}

/// Open a workbook by name: a spreadsheet file, a single CSV file, or a
/// directory of CSV sheets.
pub fn open_workbook(base_dir: &Path, name: &str) -> Result<Workbook, IoError> {
    let path = resolve_path(base_dir, name);
    if !path.exists() {
        return Err(IoError::WorkbookNotFound { path });
    }
    if path.is_dir() {
        return csv::load_dir(&path);
    }

    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "csv" | "tsv" => csv::load_file(&path),
        e if xlsx::EXTENSIONS.contains(&e) => xlsx::load(&path),
        other => Err(IoError::Open {
            path: path.clone(),
            message: format!("unsupported workbook format '{other}'"),
        }),
    }
}
