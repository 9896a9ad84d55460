use chrono::{Datelike, NaiveDateTime};

use crate::config::rules::{ParameterRules, Season};
use crate::models::{CheckOutput, QualityFlag};

/// Range test: `Bad` on a breached bound, `Missing` on an absent value,
/// `Good` otherwise.
///
/// Bounds are re-selected per point by calendar month so seasonal tables
/// apply across month boundaries within one batch.
pub fn check_range(
    values: &[Option<f64>],
    timestamps: &[NaiveDateTime],
    rules: &ParameterRules,
) -> CheckOutput {
    let mut output = CheckOutput::all_good(values.len());

    for (idx, value) in values.iter().enumerate() {
        let value = match value {
            Some(v) => *v,
            None => {
                output.flags[idx] = Some(QualityFlag::Missing);
                output.reasons[idx] = "Missing value".to_string();
                continue;
            }
        };

        let season = Season::from_month(timestamps[idx].month());
        let bounds = match rules.bounds_for(season) {
            Some(b) => b,
            None => {
                // No applicable bounds: this point is not evaluated.
                output.flags[idx] = None;
                continue;
            }
        };

        if let Some(max) = bounds.max {
            if value > max {
                output.flags[idx] = Some(QualityFlag::Bad);
                output.reasons[idx] = format!("Value > Max ({})", max);
                continue;
            }
        }
        if let Some(min) = bounds.min {
            if value < min {
                output.flags[idx] = Some(QualityFlag::Bad);
                output.reasons[idx] = format!("Value < Min ({})", min);
            }
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn hourly_from(month: u32, n: usize) -> Vec<NaiveDateTime> {
        let start = NaiveDate::from_ymd_opt(2024, month, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        (0..n)
            .map(|h| start + chrono::Duration::hours(h as i64))
            .collect()
    }

    #[test]
    fn test_breach_above_max() {
        let rules = ParameterRules::new().with_range(0.0, 50.0);
        let timestamps = hourly_from(6, 1);

        let output = check_range(&[Some(65.0)], &timestamps, &rules);
        assert_eq!(output.flags[0], Some(QualityFlag::Bad));
        assert_eq!(output.reasons[0], "Value > Max (50)");
    }

    #[test]
    fn test_breach_below_min() {
        let rules = ParameterRules::new().with_range(0.0, 50.0);
        let timestamps = hourly_from(6, 1);

        let output = check_range(&[Some(-3.0)], &timestamps, &rules);
        assert_eq!(output.flags[0], Some(QualityFlag::Bad));
        assert_eq!(output.reasons[0], "Value < Min (0)");
    }

    #[test]
    fn test_missing_value_regardless_of_bounds() {
        let rules = ParameterRules::new().with_range(0.0, 50.0);
        let timestamps = hourly_from(6, 1);

        let output = check_range(&[None], &timestamps, &rules);
        assert_eq!(output.flags[0], Some(QualityFlag::Missing));
        assert_eq!(output.reasons[0], "Missing value");
    }

    #[test]
    fn test_open_bound() {
        let rules = ParameterRules {
            range: Some(crate::config::RangeBounds {
                min: None,
                max: Some(10.0),
            }),
            seasonal_range: None,
            spike_threshold: None,
            stuck_tolerance: None,
        };
        let timestamps = hourly_from(6, 2);

        let output = check_range(&[Some(-999.0), Some(11.0)], &timestamps, &rules);
        assert_eq!(output.flags[0], Some(QualityFlag::Good));
        assert_eq!(output.flags[1], Some(QualityFlag::Bad));
    }

    #[test]
    fn test_seasonal_bounds_selected_by_month() {
        let rules = ParameterRules::new()
            .with_range(0.0, 32.0)
            .with_seasonal_range(Season::Winter, -1.0, 10.0);

        // January point: winter bounds apply, 15 degrees is a breach.
        let january = hourly_from(1, 1);
        let output = check_range(&[Some(15.0)], &january, &rules);
        assert_eq!(output.flags[0], Some(QualityFlag::Bad));

        // July point: static bounds apply.
        let july = hourly_from(7, 1);
        let output = check_range(&[Some(15.0)], &july, &rules);
        assert_eq!(output.flags[0], Some(QualityFlag::Good));
    }
}
