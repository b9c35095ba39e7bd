use std::path::PathBuf;

use chrono::NaiveDate;
use gridcheck_recon::{
    normalize_json, normalize_rows, reconcile_with, ComparisonMode, DiscrepancyKind, ReconError,
    ReconStatus, ScenarioConfig, Value,
};

fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load_scenario(file: &str) -> ScenarioConfig {
    let path = fixtures_dir().join(file);
    let toml = std::fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("cannot read {}: {e}", path.display()));
    ScenarioConfig::from_toml(&toml).unwrap()
}

fn load_records(file: &str) -> Vec<serde_json::Value> {
    let text = std::fs::read_to_string(fixtures_dir().join(file)).unwrap();
    match serde_json::from_str(&text).unwrap() {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut map) => match map.remove("values") {
            Some(serde_json::Value::Array(items)) => items,
            other => panic!("unexpected fixture shape: {other:?}"),
        },
        other => panic!("unexpected fixture shape: {other:?}"),
    }
}

fn holding_row(uid: &str, kind: &str, units: f64, cost: f64, ccy: &str) -> Vec<Value> {
    vec![
        Value::text(uid),
        Value::text(kind),
        Value::number(units),
        Value::number(units),
        Value::number(cost),
        Value::text(ccy),
        Value::Empty,
        Value::Empty,
    ]
}

/// Holdings sheet with trailing blank rows, the way a fixed `E32:L510` range reads.
fn holdings_sheet() -> Vec<Vec<Value>> {
    let mut rows = vec![
        holding_row("LUID_00003D4X", "P", 1000.0, 15250.5, "GBP"),
        holding_row("CCY_GBP", "B", -19350.5, -19350.5, "GBP"),
    ];
    rows.extend(std::iter::repeat(vec![Value::Empty; 8]).take(20));
    rows
}

// -------------------------------------------------------------------------
// Holdings (containment)
// -------------------------------------------------------------------------

#[test]
fn holdings_sheet_is_contained_in_api() {
    let config = load_scenario("holdings.scenario.toml");
    let observed = normalize_rows(&holdings_sheet(), &config.sheet_extractors(None).unwrap()).unwrap();
    let reference = normalize_json(&load_records("holdings.json"), &config.reference_extractors().unwrap()).unwrap();

    assert_eq!(observed.len(), 2);
    assert_eq!(reference.len(), 3);

    let report = reconcile_with(&observed, &reference, &config.key, config.mode, &config.options());
    assert_eq!(report.status, ReconStatus::Matched, "{}", report.listing());
    assert_eq!(report.meta.name, "View holdings");
    assert_eq!(report.meta.tolerance, 0.005);
}

#[test]
fn holdings_cost_drift_within_tolerance() {
    let config = load_scenario("holdings.scenario.toml");
    let rows = vec![holding_row("LUID_00003D4X", "P", 1000.0, 15250.504, "GBP")];
    let observed = normalize_rows(&rows, &config.sheet_extractors(None).unwrap()).unwrap();
    let reference = normalize_json(&load_records("holdings.json"), &config.reference_extractors().unwrap()).unwrap();

    let report = reconcile_with(&observed, &reference, &config.key, config.mode, &config.options());
    assert!(report.is_match());
}

#[test]
fn holdings_units_mismatch_names_key_and_field() {
    let config = load_scenario("holdings.scenario.toml");
    let rows = vec![holding_row("LUID_00003D58", "P", 260.0, 4100.0, "USD")];
    let observed = normalize_rows(&rows, &config.sheet_extractors(None).unwrap()).unwrap();
    let reference = normalize_json(&load_records("holdings.json"), &config.reference_extractors().unwrap()).unwrap();

    let report = reconcile_with(&observed, &reference, &config.key, config.mode, &config.options());
    assert_eq!(report.status, ReconStatus::Mismatched);
    let fields: Vec<_> = report.discrepancies.iter().filter_map(|d| d.field.as_deref()).collect();
    assert_eq!(fields, vec!["Settled Units", "Units"]);

    let err = report.into_result().unwrap_err();
    assert!(matches!(err, ReconError::Mismatch { count: 2, .. }));
    assert!(err.to_string().contains("key \"LUID_00003D58\": field 'Units' observed 260, expected 250"));
}

#[test]
fn holdings_unknown_instrument_is_missing() {
    let config = load_scenario("holdings.scenario.toml");
    let rows = vec![holding_row("LUID_NOPE", "P", 1.0, 1.0, "GBP")];
    let observed = normalize_rows(&rows, &config.sheet_extractors(None).unwrap()).unwrap();
    let reference = normalize_json(&load_records("holdings.json"), &config.reference_extractors().unwrap()).unwrap();

    let report = reconcile_with(&observed, &reference, &config.key, config.mode, &config.options());
    assert_eq!(report.summary.missing, 1);
    assert_eq!(report.discrepancies[0].kind, DiscrepancyKind::Missing);
}

// -------------------------------------------------------------------------
// Transactions (exact, header row, dates)
// -------------------------------------------------------------------------

fn transactions_sheet() -> Vec<Vec<Value>> {
    let serial = |y, m, d| {
        let date = NaiveDate::from_ymd_opt(y, m, d).unwrap();
        let epoch = NaiveDate::from_ymd_opt(1899, 12, 30).unwrap();
        Value::number((date - epoch).num_days() as f64)
    };
    vec![
        vec![Value::text("TransactionId"), Value::text("Type"), Value::text("TransactionDate"), Value::text("Units")],
        vec![Value::text("TXN001"), Value::text("Buy"), serial(2024, 3, 5), Value::number(1000.0)],
        vec![Value::text("TXN002"), Value::text("Buy"), Value::text("2024-03-06 09:30:00"), Value::number(250.0)],
        vec![Value::Empty, Value::Empty, Value::Empty, Value::Empty],
    ]
}

#[test]
fn transactions_match_exactly_after_date_truncation() {
    let config = load_scenario("transactions.scenario.toml");
    assert_eq!(config.mode, ComparisonMode::Exact);

    let sheet = transactions_sheet();
    let (headers, body) = sheet.split_first().unwrap();
    let observed = normalize_rows(body, &config.sheet_extractors(Some(headers.as_slice())).unwrap()).unwrap();
    let reference =
        normalize_json(&load_records("transactions.json"), &config.reference_extractors().unwrap()).unwrap();

    assert_eq!(observed.len(), 2);
    assert_eq!(
        observed[0].get("TransactionDate"),
        Some(&Value::Date(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()))
    );

    let report = reconcile_with(&observed, &reference, &config.key, config.mode, &config.options());
    assert_eq!(report.status, ReconStatus::Matched, "{}", report.listing());
}

#[test]
fn transactions_extra_reference_record_fails_exact() {
    let config = load_scenario("transactions.scenario.toml");
    let sheet = transactions_sheet();
    let (headers, body) = sheet.split_first().unwrap();
    let observed = normalize_rows(&body[..1], &config.sheet_extractors(Some(headers.as_slice())).unwrap()).unwrap();
    let reference =
        normalize_json(&load_records("transactions.json"), &config.reference_extractors().unwrap()).unwrap();

    let report = reconcile_with(&observed, &reference, &config.key, config.mode, &config.options());
    assert_eq!(report.summary.length_mismatches, 1);
    assert_eq!(report.discrepancies[0].to_string(), "record count mismatch: observed 1, expected 2");
}

#[test]
fn report_json_shape() {
    let config = load_scenario("transactions.scenario.toml");
    let sheet = transactions_sheet();
    let (headers, body) = sheet.split_first().unwrap();
    let observed = normalize_rows(body, &config.sheet_extractors(Some(headers.as_slice())).unwrap()).unwrap();
    let report = reconcile_with(&observed, &[], &config.key, config.mode, &config.options());

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["status"], "mismatched");
    assert_eq!(json["discrepancies"][0]["kind"], "length");
    assert_eq!(json["discrepancies"][0]["observed"], 2.0);
    assert_eq!(json["meta"]["key_field"], "TransactionId");
}
