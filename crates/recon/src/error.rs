use std::fmt;

#[derive(Debug)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    ConfigParse(String),
    /// Config validation error (unknown key field, duplicate field, etc.).
    ConfigValidation(String),
    /// A header-named column is not present in the header row.
    MissingColumn { column: String },
    /// An extraction rule cannot be applied to the row shape it was given.
    Extractor { field: String, message: String },
    /// Date parse error.
    DateParse { field: Option<String>, value: String },
    /// The observed range produced no records.
    RangeEmpty { workbook: String, sheet: String, range: String },
    /// Reconciliation ran with no observed records.
    NothingToCompare { name: String },
    /// One or more discrepancies; `listing` has one line per discrepancy.
    Mismatch { name: String, count: usize, listing: String },
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConfigParse(msg) => write!(f, "config parse error: {msg}"),
            Self::ConfigValidation(msg) => write!(f, "config validation error: {msg}"),
            Self::MissingColumn { column } => {
                write!(f, "column '{column}' not found in header row")
            }
            Self::Extractor { field, message } => write!(f, "field '{field}': {message}"),
            Self::DateParse { field: Some(field), value } => {
                write!(f, "field '{field}': cannot parse date '{value}'")
            }
            Self::DateParse { field: None, value } => write!(f, "cannot parse date '{value}'"),
            Self::RangeEmpty { workbook, sheet, range } => {
                write!(f, "no data in range {range} of sheet '{sheet}' in book '{workbook}'")
            }
            Self::NothingToCompare { name } => {
                write!(f, "{name}: nothing to compare (observed set is empty)")
            }
            Self::Mismatch { name, count, listing } => {
                write!(f, "{name}: {count} discrepancy(ies)\n{listing}")
            }
        }
    }
}

impl std::error::Error for ReconError {}
