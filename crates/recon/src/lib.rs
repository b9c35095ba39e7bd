//! `gridcheck-recon`: record normalization and reconciliation.
//!
//! Pure crate: receives already-read sheet rows and API records, returns a
//! report. No workbook or network dependencies.

pub mod config;
pub mod date;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod extract;
pub mod model;
pub mod value;

pub use config::ScenarioConfig;
pub use date::{normalize_date, normalize_date_value};
pub use engine::{reconcile, reconcile_with};
pub use error::ReconError;
pub use extract::{camel_case, normalize, normalize_json, normalize_rows, Extractor, FieldExtractors, FieldKind, Presence, RawRow};
pub use model::{CanonicalRecord, ComparisonMode, Discrepancy, DiscrepancyKind, ReconOptions, ReconReport, ReconStatus};
pub use value::Value;
