use chrono::NaiveDateTime;

use crate::models::{CheckOutput, QualityFlag};

/// Stuck-value test: a run of identical consecutive readings of at least
/// `tolerance` points marks the whole run `Suspect` (frozen sensor).
///
/// Absent values break runs and are not evaluated themselves, so a point
/// adjacent to a gap is never counted as "unchanged". Single O(n) pass.
pub fn check_stuck_values(
    values: &[Option<f64>],
    timestamps: &[NaiveDateTime],
    tolerance: usize,
) -> CheckOutput {
    let mut output = CheckOutput::all_good(values.len());
    let tolerance = tolerance.max(1);

    let mut i = 0;
    while i < values.len() {
        let current = match values[i] {
            Some(v) => v,
            None => {
                output.flags[i] = None;
                i += 1;
                continue;
            }
        };

        let mut j = i;
        while j + 1 < values.len() && values[j + 1] == Some(current) {
            j += 1;
        }

        let run_len = j - i + 1;
        if run_len >= tolerance {
            let start = timestamps[i].format("%H:%M");
            let end = timestamps[j].format("%H:%M");
            let reason = format!("Value unchanged for {} hours ({}-{})", run_len, start, end);
            for idx in i..=j {
                output.flags[idx] = Some(QualityFlag::Suspect);
                output.reasons[idx] = reason.clone();
            }
        }

        i = j + 1;
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn hourly(n: usize) -> Vec<NaiveDateTime> {
        let start = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        (0..n)
            .map(|h| start + chrono::Duration::hours(h as i64))
            .collect()
    }

    #[test]
    fn test_constant_run_flagged_entirely() {
        let values = vec![Some(10.0); 4];
        let output = check_stuck_values(&values, &hourly(4), 3);

        for idx in 0..4 {
            assert_eq!(output.flags[idx], Some(QualityFlag::Suspect));
            assert_eq!(
                output.reasons[idx],
                "Value unchanged for 4 hours (00:00-03:00)"
            );
        }
    }

    #[test]
    fn test_run_below_tolerance_unflagged() {
        let values = vec![Some(10.0), Some(10.0), Some(11.0), Some(12.0)];
        let output = check_stuck_values(&values, &hourly(4), 3);

        assert!(output.flags.iter().all(|f| *f == Some(QualityFlag::Good)));
    }

    #[test]
    fn test_gap_breaks_run() {
        // Three equal readings split by a gap: two short runs, no flag.
        let values = vec![Some(5.0), Some(5.0), None, Some(5.0), Some(5.0)];
        let output = check_stuck_values(&values, &hourly(5), 3);

        assert_eq!(output.flags[0], Some(QualityFlag::Good));
        assert_eq!(output.flags[1], Some(QualityFlag::Good));
        assert_eq!(output.flags[2], None);
        assert_eq!(output.flags[3], Some(QualityFlag::Good));
        assert_eq!(output.flags[4], Some(QualityFlag::Good));
    }

    #[test]
    fn test_run_in_middle_of_series() {
        let values = vec![
            Some(1.0),
            Some(2.0),
            Some(2.0),
            Some(2.0),
            Some(3.0),
        ];
        let output = check_stuck_values(&values, &hourly(5), 3);

        assert_eq!(output.flags[0], Some(QualityFlag::Good));
        assert_eq!(output.flags[1], Some(QualityFlag::Suspect));
        assert_eq!(output.flags[3], Some(QualityFlag::Suspect));
        assert_eq!(output.flags[4], Some(QualityFlag::Good));
        assert_eq!(
            output.reasons[1],
            "Value unchanged for 3 hours (01:00-03:00)"
        );
    }
}
