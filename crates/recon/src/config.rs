use std::collections::{BTreeMap, HashSet};

use serde::Deserialize;

use crate::error::ReconError;
use crate::extract::{Extractor, FieldExtractor, FieldExtractors, FieldKind, Presence};
use crate::model::{ComparisonMode, ReconOptions};
use crate::value::Value;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// One validation scenario: which sheet range to read, how to shape its rows,
/// which API call supplies the reference data, and how to compare.
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Skip marker for incomplete scenarios; the value is the reason.
    #[serde(default)]
    pub skip: Option<String>,
    pub workbook: String,
    pub sheet: String,
    pub range: RangeSpec,
    /// First row of the range holds column headers.
    #[serde(default)]
    pub header: bool,
    pub key: String,
    #[serde(default)]
    pub mode: ComparisonMode,
    #[serde(default)]
    pub presence: Presence,
    #[serde(default)]
    pub tolerance: ToleranceConfig,
    pub fields: Vec<FieldConfig>,
    pub reference: ReferenceConfig,
}

/// `"E30:M39"` or `["E30", "M39"]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RangeSpec {
    Single(String),
    Corners([String; 2]),
}

impl std::fmt::Display for RangeSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Single(s) => write!(f, "{s}"),
            Self::Corners([a, b]) => write!(f, "{a}:{b}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Fields
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct FieldConfig {
    pub name: String,
    /// Sheet column: zero-based offset within the range, or a header name.
    #[serde(default)]
    pub column: Option<ColumnRef>,
    /// API attribute path, dotted for nested attributes.
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub kind: FieldKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ColumnRef {
    Index(usize),
    Header(String),
}

// ---------------------------------------------------------------------------
// Reference + Tolerance
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct ReferenceConfig {
    /// API call name (`scopes`, `portfolios`, `holdings`, `transactions`).
    pub call: String,
    /// Directory of recorded API responses. When unset the live API is used.
    #[serde(default)]
    pub fixtures: Option<String>,
    #[serde(default)]
    pub params: BTreeMap<String, ParamSource>,
}

/// Where a query parameter's value comes from.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ParamSource {
    Literal(String),
    Flag(bool),
    /// Read a cell (or defined name) from the scenario's sheet.
    Cell { cell: String },
    /// Read a cell and normalize it to a calendar date; blank means omitted.
    Date { date: String },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToleranceConfig {
    /// Absolute tolerance for numeric fields.
    #[serde(default)]
    pub number: f64,
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

impl ScenarioConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ScenarioConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        let invalid = |msg: String| Err(ReconError::ConfigValidation(format!("{}: {msg}", self.name)));

        if self.name.trim().is_empty() {
            return Err(ReconError::ConfigValidation("scenario name is empty".into()));
        }
        if self.fields.is_empty() {
            return invalid("at least one field is required".into());
        }

        let mut seen = HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.name.as_str()) {
                return invalid(format!("duplicate field '{}'", field.name));
            }
            if field.column.is_none() {
                return invalid(format!("field '{}' has no sheet column", field.name));
            }
            if field.path.as_deref().map_or(true, str::is_empty) {
                return invalid(format!("field '{}' has no API path", field.name));
            }
            if matches!(field.column, Some(ColumnRef::Header(_))) && !self.header {
                return invalid(format!(
                    "field '{}' names a header column but header = false",
                    field.name
                ));
            }
        }

        if !seen.contains(self.key.as_str()) {
            return invalid(format!("key field '{}' is not a mapped field", self.key));
        }
        if let Presence::Field(name) = &self.presence {
            if !seen.contains(name.as_str()) {
                return invalid(format!("presence field '{name}' is not a mapped field"));
            }
        }

        if !self.tolerance.number.is_finite() || self.tolerance.number < 0.0 {
            return invalid(format!("tolerance must be >= 0, got {}", self.tolerance.number));
        }
        if self.reference.call.trim().is_empty() {
            return invalid("reference.call is empty".into());
        }

        Ok(())
    }

    pub fn is_skipped(&self) -> bool {
        self.skip.is_some()
    }

    pub fn options(&self) -> ReconOptions {
        ReconOptions { name: self.name.clone(), tolerance: self.tolerance.number }
    }

    /// Extractors for sheet rows. Header-named columns resolve against
    /// `headers` (the range's first row).
    pub fn sheet_extractors(&self, headers: Option<&[Value]>) -> Result<FieldExtractors, ReconError> {
        let mut fields = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            let index = match &field.column {
                Some(ColumnRef::Index(i)) => *i,
                Some(ColumnRef::Header(name)) => headers
                    .and_then(|h| h.iter().position(|v| v.as_text().map(str::trim) == Some(name.trim())))
                    .ok_or_else(|| ReconError::MissingColumn { column: name.clone() })?,
                None => {
                    return Err(ReconError::Extractor {
                        field: field.name.clone(),
                        message: "no sheet column".into(),
                    })
                }
            };
            fields.push(FieldExtractor {
                name: field.name.clone(),
                rule: Extractor::Column(index),
                kind: field.kind,
            });
        }
        Ok(FieldExtractors { fields, presence: self.presence.clone() })
    }

    /// Extractors for API records.
    pub fn reference_extractors(&self) -> Result<FieldExtractors, ReconError> {
        let fields = self
            .fields
            .iter()
            .map(|field| match &field.path {
                Some(path) => Ok(FieldExtractor {
                    name: field.name.clone(),
                    rule: Extractor::Path(path.clone()),
                    kind: field.kind,
                }),
                None => Err(ReconError::Extractor {
                    field: field.name.clone(),
                    message: "no API path".into(),
                }),
            })
            .collect::<Result<Vec<_>, _>>()?;
        // Reference records are never padded rows; keep them all.
        Ok(FieldExtractors { fields, presence: Presence::Always })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
