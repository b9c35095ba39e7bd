use std::collections::{BTreeSet, HashMap};

use crate::evidence::compute_summary;
use crate::model::{
    CanonicalRecord, ComparisonMode, Discrepancy, ReconMeta, ReconOptions, ReconReport, ReconStatus,
};
use crate::value::Value;

/// Reconcile observed records against reference records with default options.
pub fn reconcile(
    observed: &[CanonicalRecord],
    reference: &[CanonicalRecord],
    key_field: &str,
    mode: ComparisonMode,
) -> ReconReport {
    reconcile_with(observed, reference, key_field, mode, &ReconOptions::default())
}

/// Sort both sides by `key_field`, then compare per `mode`.
///
/// Exact mode stops at the first discrepancy. Containment mode reports every
/// observed record that has no equal in the reference set.
pub fn reconcile_with(
    observed: &[CanonicalRecord],
    reference: &[CanonicalRecord],
    key_field: &str,
    mode: ComparisonMode,
    options: &ReconOptions,
) -> ReconReport {
    let observed_sorted = sort_by_key(observed, key_field, "observed");
    let reference_sorted = sort_by_key(reference, key_field, "reference");

    let discrepancies = if observed_sorted.is_empty() {
        Vec::new()
    } else {
        match mode {
            ComparisonMode::Exact => {
                compare_exact(&observed_sorted, &reference_sorted, key_field, options.tolerance)
            }
            ComparisonMode::Containment => {
                compare_containment(&observed_sorted, &reference_sorted, key_field, options.tolerance)
            }
        }
    };

    let status = if observed_sorted.is_empty() {
        ReconStatus::NothingToCompare
    } else if discrepancies.is_empty() {
        ReconStatus::Matched
    } else {
        ReconStatus::Mismatched
    };

    log::info!(
        "{}: {} mode on '{}': {} observed, {} reference, {} discrepancies ({status})",
        if options.name.is_empty() { "recon" } else { options.name.as_str() },
        mode,
        key_field,
        observed.len(),
        reference.len(),
        discrepancies.len(),
    );

    ReconReport {
        meta: ReconMeta {
            name: options.name.clone(),
            mode,
            key_field: key_field.to_string(),
            tolerance: options.tolerance,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        status,
        summary: compute_summary(observed.len(), reference.len(), &discrepancies),
        discrepancies,
    }
}

/// Stable ascending sort by key value. Duplicate keys keep input order.
fn sort_by_key<'a>(records: &'a [CanonicalRecord], key_field: &str, side: &str) -> Vec<&'a CanonicalRecord> {
    let mut sorted: Vec<&CanonicalRecord> = records.iter().collect();
    sorted.sort_by(|a, b| a.key(key_field).cmp(b.key(key_field)));

    for pair in sorted.windows(2) {
        if pair[0].key(key_field) == pair[1].key(key_field) {
            log::warn!("{side}: duplicate key {} in field '{key_field}'", pair[0].key(key_field));
        }
    }
    sorted
}

fn compare_exact(
    observed: &[&CanonicalRecord],
    reference: &[&CanonicalRecord],
    key_field: &str,
    tolerance: f64,
) -> Vec<Discrepancy> {
    if observed.len() != reference.len() {
        return vec![Discrepancy::length(observed.len(), reference.len())];
    }

    observed
        .iter()
        .zip(reference)
        .find_map(|(o, r)| field_diffs(o, r, key_field, tolerance).into_iter().next())
        .into_iter()
        .collect()
}

fn compare_containment(
    observed: &[&CanonicalRecord],
    reference: &[&CanonicalRecord],
    key_field: &str,
    tolerance: f64,
) -> Vec<Discrepancy> {
    let mut by_key: HashMap<&Value, &CanonicalRecord> = HashMap::new();
    for &r in reference {
        by_key.entry(r.key(key_field)).or_insert(r);
    }

    let mut discrepancies = Vec::new();
    for o in observed {
        if reference.iter().any(|r| records_match(o, r, tolerance)) {
            continue;
        }
        match by_key.get(o.key(key_field)) {
            Some(r) => discrepancies.extend(field_diffs(o, r, key_field, tolerance)),
            None => discrepancies.push(Discrepancy::missing(o.key(key_field).clone())),
        }
    }
    discrepancies
}

fn records_match(a: &CanonicalRecord, b: &CanonicalRecord, tolerance: f64) -> bool {
    a.len() == b.len()
        && a.iter().all(|(name, av)| b.get(name).is_some_and(|bv| av.matches(bv, tolerance)))
}

/// Every differing field of a pair, key field first, then by name. A field
/// present on only one side is a discrepancy with the other side absent.
fn field_diffs(
    observed: &CanonicalRecord,
    expected: &CanonicalRecord,
    key_field: &str,
    tolerance: f64,
) -> Vec<Discrepancy> {
    let names: BTreeSet<&str> = observed.field_names().chain(expected.field_names()).collect();
    let ordered = std::iter::once(key_field)
        .filter(|k| names.contains(k))
        .chain(names.iter().copied().filter(|n| *n != key_field));

    let key = observed.key(key_field).clone();
    ordered
        .filter_map(|name| {
            let o = observed.get(name);
            let e = expected.get(name);
            let same = match (o, e) {
                (Some(o), Some(e)) => o.matches(e, tolerance),
                _ => false,
            };
            (!same).then(|| Discrepancy::field(key.clone(), name, o.cloned(), e.cloned()))
        })
        .collect()
}
