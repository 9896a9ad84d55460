use std::collections::BTreeSet;

use crate::models::{flag, CheckOutput, FlaggedSeries};

/// Merge every test's verdicts over one parameter into a single series.
///
/// Per point, only tests that evaluated the point participate: the final
/// flag is their maximum severity, and a point no test evaluated is Good.
/// Reasons are split, deduplicated, sorted and rejoined with "; " so the
/// same finding reported by two tests appears once.
pub fn combine_outputs(len: usize, outputs: &[CheckOutput]) -> FlaggedSeries {
    let mut flags = Vec::with_capacity(len);
    let mut reasons = Vec::with_capacity(len);

    for idx in 0..len {
        let participating = outputs.iter().filter_map(|output| output.flags[idx]);
        flags.push(flag::combine(participating));

        let unique: BTreeSet<&str> = outputs
            .iter()
            .flat_map(|output| output.reasons[idx].split("; "))
            .filter(|reason| !reason.is_empty())
            .collect();
        reasons.push(unique.into_iter().collect::<Vec<_>>().join("; "));
    }

    FlaggedSeries { flags, reasons }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QualityFlag;

    #[test]
    fn test_max_severity_wins() {
        let mut a = CheckOutput::all_good(3);
        a.record(1, QualityFlag::Suspect, "stuck run");
        let mut b = CheckOutput::all_good(3);
        b.record(1, QualityFlag::Bad, "above maximum");
        b.record(2, QualityFlag::Missing, "no value");

        let combined = combine_outputs(3, &[a, b]);
        assert_eq!(
            combined.flags,
            vec![QualityFlag::Good, QualityFlag::Bad, QualityFlag::Missing]
        );
        assert_eq!(combined.reasons[1], "above maximum; stuck run");
    }

    #[test]
    fn test_unevaluated_point_defaults_to_good() {
        let outputs = vec![CheckOutput::not_evaluated(2)];
        let combined = combine_outputs(2, &outputs);
        assert_eq!(combined.flags, vec![QualityFlag::Good, QualityFlag::Good]);
        assert_eq!(combined.reasons, vec!["", ""]);
    }

    #[test]
    fn test_skipped_test_cannot_mask_a_verdict() {
        // An unevaluated point in one test must not dilute another test's
        // Bad verdict at the same point.
        let skipped = CheckOutput::not_evaluated(1);
        let mut failed = CheckOutput::all_good(1);
        failed.record(0, QualityFlag::Bad, "Value > Max (10)");

        let combined = combine_outputs(1, &[skipped, failed]);
        assert_eq!(combined.flags[0], QualityFlag::Bad);
    }

    #[test]
    fn test_duplicate_reasons_collapse() {
        let mut a = CheckOutput::all_good(1);
        a.record(0, QualityFlag::Suspect, "possible sensor drift");
        let mut b = CheckOutput::all_good(1);
        b.record(0, QualityFlag::Suspect, "possible sensor drift");

        let combined = combine_outputs(1, &[a, b]);
        assert_eq!(combined.reasons[0], "possible sensor drift");
    }
}
