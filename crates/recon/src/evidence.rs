use crate::error::ReconError;
use crate::model::{Discrepancy, DiscrepancyKind, ReconReport, ReconStatus, ReconSummary};

/// Compute summary counts from the discrepancy list.
pub fn compute_summary(observed: usize, reference: usize, discrepancies: &[Discrepancy]) -> ReconSummary {
    let mut summary = ReconSummary {
        observed,
        reference,
        discrepancies: discrepancies.len(),
        ..Default::default()
    };

    for d in discrepancies {
        match d.kind {
            DiscrepancyKind::Field => summary.field_mismatches += 1,
            DiscrepancyKind::Missing => summary.missing += 1,
            DiscrepancyKind::Length => summary.length_mismatches += 1,
        }
    }

    summary
}

impl ReconReport {
    pub fn is_match(&self) -> bool {
        self.status == ReconStatus::Matched
    }

    /// One line per discrepancy.
    pub fn listing(&self) -> String {
        self.discrepancies
            .iter()
            .map(|d| format!("  - {d}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Short human summary, e.g. for stderr.
    pub fn headline(&self) -> String {
        let s = &self.summary;
        format!(
            "{} ({} on '{}'): {}, {} observed, {} reference, {} discrepancies",
            self.meta.name, self.meta.mode, self.meta.key_field, self.status, s.observed, s.reference, s.discrepancies,
        )
    }

    /// `Ok` only when everything matched.
    pub fn into_result(self) -> Result<(), ReconError> {
        match self.status {
            ReconStatus::Matched => Ok(()),
            ReconStatus::NothingToCompare => Err(ReconError::NothingToCompare { name: self.meta.name }),
            ReconStatus::Mismatched => Err(ReconError::Mismatch {
                count: self.discrepancies.len(),
                listing: self.listing(),
                name: self.meta.name,
            }),
        }
    }
}
