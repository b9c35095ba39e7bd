use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::value::Value;

static ABSENT: Value = Value::Empty;

// ---------------------------------------------------------------------------
// Canonical records
// ---------------------------------------------------------------------------

/// A normalized row: field name → value, identical shape for both sources.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CanonicalRecord {
    fields: BTreeMap<String, Value>,
}

impl CanonicalRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Value of the key field, `Empty` when the record lacks it.
    pub fn key(&self, key_field: &str) -> &Value {
        self.fields.get(key_field).unwrap_or(&ABSENT)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for CanonicalRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Comparison policy
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonMode {
    /// Same length, element-wise equal after sorting by key.
    Exact,
    /// Every observed record appears somewhere in the reference set.
    #[default]
    Containment,
}

impl std::fmt::Display for ComparisonMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Containment => write!(f, "containment"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ReconOptions {
    /// Label carried into the report and error messages.
    pub name: String,
    /// Absolute tolerance for numeric fields. Zero means exact.
    pub tolerance: f64,
}

// ---------------------------------------------------------------------------
// Discrepancies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyKind {
    /// Record counts differ (exact mode).
    Length,
    /// A field differs between an observed record and its counterpart.
    Field,
    /// No reference record carries the observed record's key.
    Missing,
}

impl std::fmt::Display for DiscrepancyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Length => write!(f, "length"),
            Self::Field => write!(f, "field"),
            Self::Missing => write!(f, "missing"),
        }
    }
}

/// One (key, field, observed, expected) tuple.
///
/// `observed`/`expected` are `None` when the field is absent from that side
/// of the pair. For `Length`, they hold the two record counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Discrepancy {
    pub kind: DiscrepancyKind,
    pub key: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub observed: Option<Value>,
    pub expected: Option<Value>,
}

impl Discrepancy {
    pub fn length(observed: usize, expected: usize) -> Self {
        Self {
            kind: DiscrepancyKind::Length,
            key: Value::Empty,
            field: None,
            observed: Some(Value::number(observed as f64)),
            expected: Some(Value::number(expected as f64)),
        }
    }

    pub fn field(key: Value, field: &str, observed: Option<Value>, expected: Option<Value>) -> Self {
        Self {
            kind: DiscrepancyKind::Field,
            key,
            field: Some(field.to_string()),
            observed,
            expected,
        }
    }

    pub fn missing(key: Value) -> Self {
        Self {
            kind: DiscrepancyKind::Missing,
            key,
            field: None,
            observed: None,
            expected: None,
        }
    }
}

impl std::fmt::Display for Discrepancy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn side(v: &Option<Value>) -> String {
            v.as_ref().map(|v| v.to_string()).unwrap_or_else(|| "<absent>".into())
        }
        match self.kind {
            DiscrepancyKind::Length => write!(
                f,
                "record count mismatch: observed {}, expected {}",
                side(&self.observed),
                side(&self.expected)
            ),
            DiscrepancyKind::Field => write!(
                f,
                "key {}: field '{}' observed {}, expected {}",
                self.key,
                self.field.as_deref().unwrap_or(""),
                side(&self.observed),
                side(&self.expected)
            ),
            DiscrepancyKind::Missing => {
                write!(f, "key {}: observed record not found in reference", self.key)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconStatus {
    Matched,
    Mismatched,
    /// The observed set was empty. Not a pass.
    NothingToCompare,
}

impl std::fmt::Display for ReconStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Matched => write!(f, "matched"),
            Self::Mismatched => write!(f, "mismatched"),
            Self::NothingToCompare => write!(f, "nothing_to_compare"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub name: String,
    pub mode: ComparisonMode,
    pub key_field: String,
    pub tolerance: f64,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconSummary {
    pub observed: usize,
    pub reference: usize,
    pub discrepancies: usize,
    pub field_mismatches: usize,
    pub missing: usize,
    pub length_mismatches: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconReport {
    pub meta: ReconMeta,
    pub status: ReconStatus,
    pub summary: ReconSummary,
    pub discrepancies: Vec<Discrepancy>,
}
