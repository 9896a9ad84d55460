use std::collections::BTreeMap;

use tracing::debug;

use crate::error::Result;
use crate::models::{CheckOutput, QualityFlag, StationBatch};
use crate::utils::constants::*;
use crate::utils::stats;

/// A pluggable heuristic that inspects a whole station batch and emits
/// per-parameter verdicts under the same contract as the core tests, so
/// the combiner treats its output like any other check.
pub trait Advisory: Send + Sync {
    fn name(&self) -> &str;

    fn evaluate(&self, batch: &StationBatch) -> Result<BTreeMap<String, CheckOutput>>;
}

/// Relative and absolute margins a value must clear above its rolling
/// baseline to count as an indicator. Either margin suffices.
#[derive(Debug, Clone, Copy)]
pub struct SpikeMargin {
    pub relative: f64,
    pub absolute: f64,
}

/// Detects agricultural runoff events from coordinated rises of nitrate,
/// conductivity, turbidity and dissolved organic carbon above their
/// trailing rolling-median baselines.
///
/// A single elevated parameter is ignored; at least two parameters must
/// indicate in the same batch before any point is marked Suspect. This
/// keeps ordinary single-sensor drift out of the advisory.
pub struct RunoffAdvisory {
    lookback_hours: usize,
    margins: BTreeMap<String, SpikeMargin>,
}

impl RunoffAdvisory {
    pub fn new() -> Self {
        let mut margins = BTreeMap::new();
        margins.insert(
            PARAM_NITRATE.to_string(),
            SpikeMargin {
                relative: 0.3,
                absolute: 5.0,
            },
        );
        margins.insert(
            PARAM_CONDUCTIVITY.to_string(),
            SpikeMargin {
                relative: 0.2,
                absolute: 100.0,
            },
        );
        margins.insert(
            PARAM_TURBIDITY.to_string(),
            SpikeMargin {
                relative: 0.5,
                absolute: 10.0,
            },
        );
        margins.insert(
            PARAM_DOC.to_string(),
            SpikeMargin {
                relative: 0.25,
                absolute: 2.0,
            },
        );
        Self {
            lookback_hours: 72,
            margins,
        }
    }

    pub fn with_lookback(mut self, hours: usize) -> Self {
        self.lookback_hours = hours;
        self
    }

    /// Trailing rolling-median baseline per point. Windows with fewer than
    /// half the lookback's points fall back to the column-wide median.
    fn baseline(&self, values: &[Option<f64>]) -> Option<Vec<f64>> {
        let present: Vec<f64> = values.iter().filter_map(|v| *v).collect();
        if present.is_empty() {
            return None;
        }
        let overall = stats::median(&present)?;
        let min_periods = (self.lookback_hours / 2).max(1);

        let baseline = (0..values.len())
            .map(|idx| {
                let start = (idx + 1).saturating_sub(self.lookback_hours);
                let window: Vec<f64> = values[start..=idx].iter().filter_map(|v| *v).collect();
                if window.len() >= min_periods {
                    stats::median(&window).unwrap_or(overall)
                } else {
                    overall
                }
            })
            .collect();
        Some(baseline)
    }

    /// Points where the value rises above baseline by either margin.
    fn indicated_points(
        values: &[Option<f64>],
        baseline: &[f64],
        margin: SpikeMargin,
    ) -> Vec<usize> {
        values
            .iter()
            .enumerate()
            .filter_map(|(idx, value)| {
                let value = (*value)?;
                let base = baseline[idx];
                let abs_change = value - base;
                let rel_change = if base > 0.0 { abs_change / base } else { 0.0 };
                (abs_change >= margin.absolute || rel_change >= margin.relative).then_some(idx)
            })
            .collect()
    }
}

impl Default for RunoffAdvisory {
    fn default() -> Self {
        Self::new()
    }
}

impl Advisory for RunoffAdvisory {
    fn name(&self) -> &str {
        "agricultural_runoff"
    }

    fn evaluate(&self, batch: &StationBatch) -> Result<BTreeMap<String, CheckOutput>> {
        let n = batch.len();
        let mut outputs = BTreeMap::new();
        let mut indicated: BTreeMap<&str, (Vec<usize>, Vec<f64>)> = BTreeMap::new();

        for (param, margin) in &self.margins {
            let values = match batch.column(param) {
                Some(col) => col,
                None => continue,
            };
            let baseline = match self.baseline(values) {
                Some(b) => b,
                None => continue,
            };

            let points = Self::indicated_points(values, &baseline, *margin);

            // Covered parameters start as evaluated-good wherever a value
            // and baseline exist.
            let mut output = CheckOutput::not_evaluated(n);
            for (idx, value) in values.iter().enumerate() {
                if value.is_some() {
                    output.record(idx, QualityFlag::Good, String::new());
                }
            }
            outputs.insert(param.clone(), output);

            if !points.is_empty() {
                indicated.insert(param.as_str(), (points, baseline));
            }
        }

        // Corroboration rule: one parameter alone is not an event.
        if indicated.len() < 2 {
            if !indicated.is_empty() {
                debug!(
                    station = %batch.station_id,
                    "single runoff indicator, below corroboration threshold"
                );
            }
            return Ok(outputs);
        }

        for (param, (points, baseline)) in &indicated {
            let (Some(values), Some(output)) = (batch.column(param), outputs.get_mut(*param))
            else {
                continue;
            };
            for &idx in points {
                if let Some(value) = values[idx] {
                    output.record(
                        idx,
                        QualityFlag::Suspect,
                        format!(
                            "Suspected agricultural runoff: {} {:.1} above baseline {:.1}",
                            param, value, baseline[idx]
                        ),
                    );
                }
            }
        }

        Ok(outputs)
    }
}
