use crate::models::{CheckOutput, QualityFlag};

/// Spike test: `Bad` when the change from the immediately preceding point
/// exceeds the parameter's plausible hourly rate of change.
///
/// No smoothing; the first point of a series is never flagged, and a point
/// whose predecessor (or itself) is absent is not evaluated.
pub fn check_spikes(values: &[Option<f64>], max_rate_of_change: f64) -> CheckOutput {
    let mut output = CheckOutput::all_good(values.len());

    for idx in 0..values.len() {
        let (prev, current) = if idx == 0 {
            // No predecessor to compare against.
            output.flags[0] = None;
            continue;
        } else {
            (values[idx - 1], values[idx])
        };

        let (prev, current) = match (prev, current) {
            (Some(p), Some(c)) => (p, c),
            _ => {
                output.flags[idx] = None;
                continue;
            }
        };

        let change = (current - prev).abs();
        if change > max_rate_of_change {
            output.flags[idx] = Some(QualityFlag::Bad);
            output.reasons[idx] = format!(
                "Change of {:.2} exceeds max rate of change ({})",
                change, max_rate_of_change
            );
        }
    }

    output
}
