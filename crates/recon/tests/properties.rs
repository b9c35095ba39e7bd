// Property-based tests for normalization and reconciliation.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use proptest::prelude::*;
use gridcheck_recon::{
    normalize_rows, reconcile, CanonicalRecord, ComparisonMode, FieldExtractors, ReconStatus, Value,
};

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        3 => (-10_000i64..10_000).prop_map(|n| Value::number(n as f64 / 100.0)),
        2 => r"[A-Z]{1,6}".prop_map(Value::text),
        1 => Just(Value::Empty),
    ]
}

/// Records with unique keys `K0..Kn`.
fn arb_records(max: usize) -> impl Strategy<Value = Vec<CanonicalRecord>> {
    proptest::collection::vec((arb_value(), arb_value()), 0..=max).prop_map(|pairs| {
        pairs
            .into_iter()
            .enumerate()
            .map(|(i, (a, b))| {
                CanonicalRecord::new().with("key", format!("K{i}")).with("a", a).with("b", b)
            })
            .collect()
    })
}

fn arb_sheet(max: usize) -> impl Strategy<Value = Vec<Vec<Value>>> {
    proptest::collection::vec(proptest::collection::vec(arb_value(), 0..4), 0..=max)
}

fn rotate<T: Clone>(items: &[T], by: usize) -> Vec<T> {
    if items.is_empty() {
        return Vec::new();
    }
    let by = by % items.len();
    items[by..].iter().chain(&items[..by]).cloned().collect()
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn normalize_is_deterministic_and_drops_blank_keys(rows in arb_sheet(30)) {
        let extractors = FieldExtractors::new().column("key", 0).column("a", 1).column("b", 2);
        let first = normalize_rows(&rows, &extractors).unwrap();
        let second = normalize_rows(&rows, &extractors).unwrap();
        prop_assert_eq!(&first, &second);

        let present = rows.iter().filter(|r| r.first().is_some_and(|v| !v.is_blank())).count();
        prop_assert_eq!(first.len(), present);
        for record in &first {
            prop_assert_eq!(record.len(), 3);
        }
    }

    #[test]
    fn every_set_matches_itself(records in arb_records(20), by in 0usize..20) {
        prop_assume!(!records.is_empty());
        let shuffled = rotate(&records, by);
        for mode in [ComparisonMode::Exact, ComparisonMode::Containment] {
            let report = reconcile(&records, &shuffled, "key", mode);
            prop_assert_eq!(report.status, ReconStatus::Matched);
        }
    }

    #[test]
    fn input_order_does_not_change_the_outcome(
        (observed, observed_shuffled) in arb_records(15).prop_flat_map(|r| (Just(r.clone()), Just(r).prop_shuffle())),
        (reference, reference_shuffled) in arb_records(15).prop_flat_map(|r| (Just(r.clone()), Just(r).prop_shuffle())),
    ) {
        for mode in [ComparisonMode::Exact, ComparisonMode::Containment] {
            let base = reconcile(&observed, &reference, "key", mode);
            for (o, r) in [
                (&observed_shuffled, &reference),
                (&observed, &reference_shuffled),
                (&observed_shuffled, &reference_shuffled),
            ] {
                let other = reconcile(o, r, "key", mode);
                prop_assert_eq!(base.status, other.status);
                prop_assert_eq!(&base.discrepancies, &other.discrepancies);
            }
        }
    }

    #[test]
    fn containment_survives_extra_reference_records(
        records in arb_records(15),
        extra in arb_records(5),
    ) {
        prop_assume!(!records.is_empty());
        let mut reference = records.clone();
        reference.extend(extra.into_iter().map(|r| {
            let key = format!("X{}", r.key("key"));
            r.with("key", key)
        }));
        let report = reconcile(&records, &reference, "key", ComparisonMode::Containment);
        prop_assert_eq!(report.status, ReconStatus::Matched);

        if reference.len() != records.len() {
            let exact = reconcile(&records, &reference, "key", ComparisonMode::Exact);
            prop_assert_eq!(exact.summary.length_mismatches, 1);
        }
    }
}
