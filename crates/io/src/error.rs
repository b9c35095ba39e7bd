use std::fmt;
use std::path::PathBuf;

#[derive(Debug)]
pub enum IoError {
    /// No workbook file or CSV directory at the resolved path.
    WorkbookNotFound { path: PathBuf },
    /// The workbook has no sheet with this name.
    SheetNotFound { workbook: String, sheet: String, available: Vec<String> },
    /// Malformed A1 address.
    BadAddress { address: String, reason: String },
    /// Neither a cell address nor a defined name of the workbook.
    NameNotFound { workbook: String, name: String },
    /// The file exists but could not be read as a workbook.
    Open { path: PathBuf, message: String },
    /// A CSV sheet could not be read.
    Csv { path: PathBuf, message: String },
}

impl fmt::Display for IoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WorkbookNotFound { path } => write!(f, "workbook not found: {}", path.display()),
            Self::SheetNotFound { workbook, sheet, available } => write!(
                f,
                "sheet '{sheet}' not found in book '{workbook}' (sheets: {})",
                available.join(", ")
            ),
            Self::BadAddress { address, reason } => write!(f, "bad address '{address}': {reason}"),
            Self::NameNotFound { workbook, name } => write!(
                f,
                "'{name}' is neither a cell address nor a defined name in book '{workbook}'"
            ),
            Self::Open { path, message } => write!(f, "cannot open {}: {message}", path.display()),
            Self::Csv { path, message } => write!(f, "{}: {message}", path.display()),
        }
    }
}

impl std::error::Error for IoError {}
