//! Field extraction and row normalization.
//!
//! A [`FieldExtractors`] schema maps output field names to extraction rules:
//! a column offset for sheet rows, a dotted attribute path for API records.
//! [`normalize`] applies it to any [`RawRow`] shape.

use serde::Deserialize;

use crate::date::normalize_date_value;
use crate::error::ReconError;
use crate::model::CanonicalRecord;
use crate::value::Value;

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extractor {
    /// Zero-based column offset within a sheet row.
    Column(usize),
    /// Dotted attribute path within an API record, e.g. `cost.amount`.
    Path(String),
}

impl std::fmt::Display for Extractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Column(i) => write!(f, "column {i}"),
            Self::Path(p) => write!(f, "path '{p}'"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Copied verbatim.
    #[default]
    Value,
    /// Truncated to a calendar date.
    Date,
}

#[derive(Debug, Clone)]
pub struct FieldExtractor {
    pub name: String,
    pub rule: Extractor,
    pub kind: FieldKind,
}

/// Which rows count as present. Rows that fail the rule are skipped; this is
/// how blank trailing rows of a fixed-size range drop out.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    /// The first mapped field must be non-blank.
    #[default]
    FirstField,
    /// The named field must be non-blank.
    Field(String),
    /// At least one mapped field must be non-blank.
    AnyField,
    /// Every row is kept.
    Always,
}

#[derive(Debug, Clone, Default)]
pub struct FieldExtractors {
    pub fields: Vec<FieldExtractor>,
    pub presence: Presence,
}

impl FieldExtractors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, rule: Extractor) -> Self {
        self.fields.push(FieldExtractor { name: name.into(), rule, kind: FieldKind::Value });
        self
    }

    pub fn date_field(mut self, name: impl Into<String>, rule: Extractor) -> Self {
        self.fields.push(FieldExtractor { name: name.into(), rule, kind: FieldKind::Date });
        self
    }

    pub fn column(self, name: impl Into<String>, index: usize) -> Self {
        self.field(name, Extractor::Column(index))
    }

    pub fn path(self, name: impl Into<String>, path: impl Into<String>) -> Self {
        self.field(name, Extractor::Path(path.into()))
    }

    pub fn with_presence(mut self, presence: Presence) -> Self {
        self.presence = presence;
        self
    }

    /// Index of the field the presence rule inspects, if it inspects one.
    fn presence_index(&self) -> Result<Option<usize>, ReconError> {
        match &self.presence {
            Presence::FirstField => Ok(if self.fields.is_empty() { None } else { Some(0) }),
            Presence::Field(name) => self
                .fields
                .iter()
                .position(|f| &f.name == name)
                .map(Some)
                .ok_or_else(|| ReconError::Extractor {
                    field: name.clone(),
                    message: "presence field is not mapped".into(),
                }),
            Presence::AnyField | Presence::Always => Ok(None),
        }
    }
}

// ---------------------------------------------------------------------------
// Raw rows
// ---------------------------------------------------------------------------

/// A row shape extraction rules can be applied to.
pub trait RawRow {
    /// `None` when the rule does not apply to this shape.
    fn extract(&self, rule: &Extractor) -> Option<Value>;
}

impl RawRow for [Value] {
    fn extract(&self, rule: &Extractor) -> Option<Value> {
        match rule {
            Extractor::Column(i) => Some(self.get(*i).cloned().unwrap_or(Value::Empty)),
            Extractor::Path(_) => None,
        }
    }
}

impl RawRow for Vec<Value> {
    fn extract(&self, rule: &Extractor) -> Option<Value> {
        self.as_slice().extract(rule)
    }
}

impl RawRow for serde_json::Value {
    fn extract(&self, rule: &Extractor) -> Option<Value> {
        match rule {
            Extractor::Path(path) => Some(lookup_path(self, path)),
            Extractor::Column(_) => None,
        }
    }
}

/// Resolve a dotted path. Each segment matches the key as written, then its
/// camelCase and snake_case spellings; numeric segments index arrays.
pub fn lookup_path(record: &serde_json::Value, path: &str) -> Value {
    let mut current = record;
    for segment in path.split('.') {
        let next = match current {
            serde_json::Value::Object(map) => map
                .get(segment)
                .or_else(|| map.get(&camel_case(segment)))
                .or_else(|| map.get(&to_snake_case(segment))),
            serde_json::Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        };
        match next {
            Some(v) => current = v,
            None => return Value::Empty,
        }
    }
    Value::from_json(current)
}

/// `effective_at` → `effectiveAt`, the API's attribute and parameter spelling.
pub fn camel_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut upper = false;
    for ch in s.chars() {
        if ch == '_' {
            upper = true;
        } else if upper {
            out.extend(ch.to_uppercase());
            upper = false;
        } else {
            out.push(ch);
        }
    }
    out
}

fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, ch) in s.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Normalize
// ---------------------------------------------------------------------------

/// One canonical record per present row, in input order.
pub fn normalize<R: RawRow + ?Sized>(
    rows: &[&R],
    extractors: &FieldExtractors,
) -> Result<Vec<CanonicalRecord>, ReconError> {
    let presence_idx = extractors.presence_index()?;
    let mut records = Vec::with_capacity(rows.len());

    for row in rows {
        let mut raw = Vec::with_capacity(extractors.fields.len());
        for field in &extractors.fields {
            let value = row.extract(&field.rule).ok_or_else(|| ReconError::Extractor {
                field: field.name.clone(),
                message: format!("{} does not apply to this row shape", field.rule),
            })?;
            raw.push(value);
        }

        let present = match (&extractors.presence, presence_idx) {
            (Presence::Always, _) => true,
            (Presence::AnyField, _) => raw.iter().any(|v| !v.is_blank()),
            (_, Some(i)) => !raw[i].is_blank(),
            (_, None) => false,
        };
        if !present {
            continue;
        }

        let mut record = CanonicalRecord::new();
        for (field, value) in extractors.fields.iter().zip(raw) {
            let value = match field.kind {
                FieldKind::Value => value,
                FieldKind::Date => normalize_date_value(&value).map_err(|e| match e {
                    ReconError::DateParse { value, .. } => ReconError::DateParse {
                        field: Some(field.name.clone()),
                        value,
                    },
                    other => other,
                })?,
            };
            record.insert(field.name.clone(), value);
        }
        records.push(record);
    }

    log::debug!("normalized {} of {} rows", records.len(), rows.len());
    Ok(records)
}

/// [`normalize`] over sheet rows.
pub fn normalize_rows(
    rows: &[Vec<Value>],
    extractors: &FieldExtractors,
) -> Result<Vec<CanonicalRecord>, ReconError> {
    let refs: Vec<&Vec<Value>> = rows.iter().collect();
    normalize(&refs, extractors)
}

/// [`normalize`] over API records.
pub fn normalize_json(
    records: &[serde_json::Value],
    extractors: &FieldExtractors,
) -> Result<Vec<CanonicalRecord>, ReconError> {
    let refs: Vec<&serde_json::Value> = records.iter().collect();
    normalize(&refs, extractors)
}
