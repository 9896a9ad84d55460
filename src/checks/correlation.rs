use std::collections::BTreeMap;

use chrono::{Datelike, Timelike};
use serde::{Deserialize, Serialize};

use crate::models::{CheckOutput, QualityFlag, StationBatch};
use crate::utils::constants::*;
use crate::utils::stats;

/// Theoretical dissolved-oxygen saturation in mg/L after Benson & Krause,
/// freshwater coefficients.
pub fn o2_saturation_mg_l(temp_celsius: f64) -> f64 {
    let temp_kelvin = temp_celsius + 273.15;
    let ln_sat = O2_SAT_A1
        + O2_SAT_A2 * (100.0 / temp_kelvin)
        + O2_SAT_A3 * (temp_kelvin / 100.0).ln()
        + O2_SAT_A4 * (temp_kelvin / 100.0);
    ln_sat.exp() * O2_SAT_MG_PER_ML
}

/// Expected Pearson correlation band for a parameter pair under normal
/// limnological conditions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExpectedCorrelation {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairQuality {
    pub correlation: f64,
    pub quality: f64,
}

/// Dataset-level sensor-plausibility metric derived from realized vs
/// expected pair correlations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorrelationQuality {
    pub pairs: BTreeMap<String, PairQuality>,
    pub overall_quality: Option<f64>,
}

/// Cross-parameter plausibility test built on known physical and biological
/// relationships between lake parameters.
///
/// Each sub-check is evaluated per timestamp, aware of time of day and
/// month, and fans its verdict out onto every parameter it consumed.
/// Sub-check verdicts on the same point combine via the flag model and
/// reasons concatenate with "; ".
pub struct CorrelationCheck {
    expected: BTreeMap<(String, String), ExpectedCorrelation>,
}

impl CorrelationCheck {
    pub fn new() -> Self {
        let mut expected = BTreeMap::new();
        let defaults = [
            (PARAM_PH, PARAM_DISSOLVED_OXYGEN, 0.3, 0.9),
            (PARAM_WATER_TEMP_0_5M, PARAM_DISSOLVED_OXYGEN, -0.8, -0.3),
            (PARAM_CHLOROPHYLL_A, PARAM_PH, 0.2, 0.8),
            (PARAM_TURBIDITY, PARAM_CHLOROPHYLL_A, 0.3, 0.9),
            (PARAM_CONDUCTIVITY, PARAM_WATER_TEMP_0_5M, 0.1, 0.4),
        ];
        for (a, b, min, max) in defaults {
            expected.insert(
                (a.to_string(), b.to_string()),
                ExpectedCorrelation { min, max },
            );
        }
        Self { expected }
    }

    pub fn set_expected(
        &mut self,
        param_a: impl Into<String>,
        param_b: impl Into<String>,
        min: f64,
        max: f64,
    ) {
        self.expected.insert(
            (param_a.into(), param_b.into()),
            ExpectedCorrelation { min, max },
        );
    }

    /// Run every applicable sub-check over the batch. Parameters of a
    /// sub-check whose columns are absent are simply not covered; points
    /// with a missing operand are not evaluated by that sub-check.
    pub fn evaluate(&self, batch: &StationBatch) -> BTreeMap<String, CheckOutput> {
        let n = batch.len();
        let mut outputs: BTreeMap<String, CheckOutput> = BTreeMap::new();

        let has = |p: &str| batch.column(p).is_some();
        let value = |p: &str, idx: usize| batch.column(p).and_then(|col| col[idx]);

        // Pre-create an output for every parameter some runnable sub-check
        // covers, so coverage is stable across the whole batch.
        let mut covered: Vec<&str> = Vec::new();
        if has(PARAM_PH) && has(PARAM_DISSOLVED_OXYGEN) {
            covered.extend([PARAM_PH, PARAM_DISSOLVED_OXYGEN]);
        }
        if has(PARAM_WATER_TEMP_0_5M) && has(PARAM_DISSOLVED_OXYGEN) {
            covered.extend([PARAM_WATER_TEMP_0_5M, PARAM_DISSOLVED_OXYGEN]);
        }
        let has_stratification =
            has(PARAM_WATER_TEMP_0_5M) && has(PARAM_WATER_TEMP_1M) && has(PARAM_WATER_TEMP_2M);
        if has_stratification {
            covered.extend([PARAM_WATER_TEMP_0_5M, PARAM_WATER_TEMP_1M, PARAM_WATER_TEMP_2M]);
        }
        let has_algae = has(PARAM_CHLOROPHYLL_A)
            && has(PARAM_PH)
            && has(PARAM_DISSOLVED_OXYGEN)
            && has(PARAM_TURBIDITY);
        if has_algae {
            covered.extend([
                PARAM_CHLOROPHYLL_A,
                PARAM_PH,
                PARAM_DISSOLVED_OXYGEN,
                PARAM_TURBIDITY,
            ]);
        }
        if has(PARAM_CONDUCTIVITY) && has(PARAM_WATER_TEMP_0_5M) {
            covered.extend([PARAM_CONDUCTIVITY, PARAM_WATER_TEMP_0_5M]);
        }
        if has(PARAM_REDOX_POTENTIAL) && has(PARAM_DISSOLVED_OXYGEN) {
            covered.extend([PARAM_REDOX_POTENTIAL, PARAM_DISSOLVED_OXYGEN]);
        }
        let has_nutrient =
            has(PARAM_NITRATE) && has(PARAM_CHLOROPHYLL_A) && has(PARAM_PHYCOCYANIN);
        if has_nutrient {
            covered.extend([PARAM_NITRATE, PARAM_CHLOROPHYLL_A, PARAM_PHYCOCYANIN]);
        }

        for param in covered {
            outputs
                .entry(param.to_string())
                .or_insert_with(|| CheckOutput::not_evaluated(n));
        }

        for idx in 0..n {
            let timestamp = batch.timestamps()[idx];
            let hour = timestamp.hour();
            let month = timestamp.month();
            let is_daylight = (DAYLIGHT_START_HOUR..=DAYLIGHT_END_HOUR).contains(&hour);

            // A sub-check verdict lands on every parameter it consumed; an
            // unremarkable evaluation still marks those parameters Good so
            // coverage is visible downstream.
            let apply = |outputs: &mut BTreeMap<String, CheckOutput>,
                         params: &[&str],
                         verdict: Option<(QualityFlag, String)>| {
                let (flag, reason) = verdict.unwrap_or((QualityFlag::Good, String::new()));
                for param in params {
                    if let Some(output) = outputs.get_mut(*param) {
                        output.record(idx, flag, reason.clone());
                    }
                }
            };

            // pH vs dissolved oxygen, photosynthesis-driven.
            if let (Some(ph), Some(o2)) = (value(PARAM_PH, idx), value(PARAM_DISSOLVED_OXYGEN, idx))
            {
                let verdict = if is_daylight {
                    if ph > 8.5 && o2 < 6.0 {
                        Some((
                            QualityFlag::Suspect,
                            "High pH at low O2 during daylight (atypical for photosynthesis)"
                                .to_string(),
                        ))
                    } else if ph < 7.0 && o2 > 12.0 {
                        Some((
                            QualityFlag::Suspect,
                            "Low pH at high O2 during daylight (atypical)".to_string(),
                        ))
                    } else {
                        None
                    }
                } else if ph > 8.5 && o2 > 12.0 {
                    Some((
                        QualityFlag::Suspect,
                        "High pH and O2 at night (no photosynthesis expected)".to_string(),
                    ))
                } else {
                    None
                };
                apply(&mut outputs, &[PARAM_PH, PARAM_DISSOLVED_OXYGEN], verdict);
            }

            // Oxygen saturation against water temperature.
            if let (Some(temp), Some(o2)) = (
                value(PARAM_WATER_TEMP_0_5M, idx),
                value(PARAM_DISSOLVED_OXYGEN, idx),
            ) {
                let saturation_mg_l = o2_saturation_mg_l(temp);
                let saturation_pct = if saturation_mg_l > 0.0 {
                    o2 / saturation_mg_l * 100.0
                } else {
                    0.0
                };

                let verdict = if saturation_pct > 140.0 {
                    Some((
                        QualityFlag::Suspect,
                        format!(
                            "Extreme O2 supersaturation ({:.0}%) - possible strong algae bloom",
                            saturation_pct
                        ),
                    ))
                } else if saturation_pct > 120.0 {
                    Some((
                        QualityFlag::Suspect,
                        format!(
                            "O2 supersaturation ({:.0}%) - active photosynthesis",
                            saturation_pct
                        ),
                    ))
                } else if saturation_pct < 30.0 {
                    Some((
                        QualityFlag::Bad,
                        format!("Critically low O2 ({:.0}% saturation)", saturation_pct),
                    ))
                } else if saturation_pct < 60.0 {
                    Some((
                        QualityFlag::Suspect,
                        format!(
                            "Low O2 saturation ({:.0}%) - possible stress",
                            saturation_pct
                        ),
                    ))
                } else {
                    None
                };
                apply(
                    &mut outputs,
                    &[PARAM_WATER_TEMP_0_5M, PARAM_DISSOLVED_OXYGEN],
                    verdict,
                );
            }

            // Thermal stratification across the three depths.
            if has_stratification {
                if let (Some(t05), Some(t1), Some(t2)) = (
                    value(PARAM_WATER_TEMP_0_5M, idx),
                    value(PARAM_WATER_TEMP_1M, idx),
                    value(PARAM_WATER_TEMP_2M, idx),
                ) {
                    let depths = [PARAM_WATER_TEMP_0_5M, PARAM_WATER_TEMP_1M, PARAM_WATER_TEMP_2M];
                    let is_summer = (5..=9).contains(&month);
                    let mut fired = false;

                    if t2 > t05 + 0.5 {
                        fired = true;
                        let verdict = if is_summer {
                            (
                                QualityFlag::Bad,
                                "Inverse thermal stratification in summer (physically implausible)"
                                    .to_string(),
                            )
                        } else {
                            (
                                QualityFlag::Suspect,
                                "Inverse thermal stratification - check against season".to_string(),
                            )
                        };
                        apply(&mut outputs, &depths, Some(verdict));
                    }

                    if t05 - t1 > 3.0 || t1 - t2 > 3.0 {
                        fired = true;
                        apply(
                            &mut outputs,
                            &depths,
                            Some((
                                QualityFlag::Suspect,
                                "Extreme temperature gradient between adjacent depths (>3\u{b0}C)"
                                    .to_string(),
                            )),
                        );
                    }

                    let upper_inverse = t1 - t05;
                    let lower_inverse = t2 - t1;
                    if upper_inverse > 0.0
                        && upper_inverse < 0.2
                        && lower_inverse > 0.0
                        && lower_inverse < 0.2
                    {
                        fired = true;
                        apply(
                            &mut outputs,
                            &depths,
                            Some((
                                QualityFlag::Suspect,
                                "Unstable thermal stratification detected".to_string(),
                            )),
                        );
                    }

                    if !fired {
                        apply(&mut outputs, &depths, None);
                    }
                }
            }

            // Algae-bloom indicator score.
            if has_algae {
                if let (Some(chl_a), Some(ph), Some(o2), Some(turbidity)) = (
                    value(PARAM_CHLOROPHYLL_A, idx),
                    value(PARAM_PH, idx),
                    value(PARAM_DISSOLVED_OXYGEN, idx),
                    value(PARAM_TURBIDITY, idx),
                ) {
                    let mut indicators = 0;
                    let mut details: Vec<String> = Vec::new();

                    if chl_a > 50.0 {
                        indicators += 1;
                        details.push(format!("chl-a high ({:.1})", chl_a));
                    }
                    if ph > 8.5 && is_daylight {
                        indicators += 1;
                        details.push(format!("pH elevated ({:.2})", ph));
                    }
                    if o2 > 12.0 && is_daylight {
                        indicators += 1;
                        details.push(format!("O2 elevated ({:.1})", o2));
                    } else if o2 < 4.0 && !is_daylight {
                        indicators += 1;
                        details.push(format!("O2 critically low at night ({:.1})", o2));
                    }
                    if turbidity > 20.0 && chl_a > 30.0 {
                        indicators += 1;
                        details.push("turbidity consistent with algae".to_string());
                    }

                    let verdict = if indicators >= 3 {
                        Some((
                            QualityFlag::Suspect,
                            format!("Strong algae bloom likely: {}", details.join(", ")),
                        ))
                    } else if indicators >= 2 {
                        Some((
                            QualityFlag::Suspect,
                            format!("Algae bloom possible: {}", details.join(", ")),
                        ))
                    } else {
                        None
                    };
                    apply(
                        &mut outputs,
                        &[
                            PARAM_CHLOROPHYLL_A,
                            PARAM_PH,
                            PARAM_DISSOLVED_OXYGEN,
                            PARAM_TURBIDITY,
                        ],
                        verdict,
                    );
                }
            }

            // Conductivity normalized to 25 degrees (2% per degree).
            if let (Some(cond), Some(temp)) = (
                value(PARAM_CONDUCTIVITY, idx),
                value(PARAM_WATER_TEMP_0_5M, idx),
            ) {
                let denominator = 1.0 + 0.02 * (temp - 25.0);
                if denominator > 0.0 {
                    let cond_25 = cond / denominator;
                    let mut verdict: Option<(QualityFlag, String)> = None;

                    if cond_25 < 50.0 {
                        verdict = Some((
                            QualityFlag::Suspect,
                            format!("Very low conductivity ({:.0} \u{b5}S/cm at 25\u{b0}C)", cond_25),
                        ));
                    } else if cond_25 > 1000.0 {
                        verdict = Some((
                            QualityFlag::Suspect,
                            format!(
                                "High conductivity ({:.0} \u{b5}S/cm at 25\u{b0}C) - possible contamination",
                                cond_25
                            ),
                        ));
                    }

                    let expected_change = 0.02 * (temp - 25.0).abs() * cond_25;
                    if (cond - cond_25).abs() > expected_change * 2.0 {
                        verdict = Some((
                            QualityFlag::Suspect,
                            "Conductivity-temperature relationship implausible".to_string(),
                        ));
                    }

                    apply(
                        &mut outputs,
                        &[PARAM_CONDUCTIVITY, PARAM_WATER_TEMP_0_5M],
                        verdict,
                    );
                }
            }

            // Redox potential against oxygen.
            if let (Some(redox), Some(o2)) = (
                value(PARAM_REDOX_POTENTIAL, idx),
                value(PARAM_DISSOLVED_OXYGEN, idx),
            ) {
                let verdict = if redox > 300.0 && o2 < 2.0 {
                    Some((
                        QualityFlag::Suspect,
                        "High redox potential at low O2 (unusual)".to_string(),
                    ))
                } else if redox < 0.0 && o2 > 8.0 {
                    Some((
                        QualityFlag::Suspect,
                        "Negative redox potential at high O2 (contradictory)".to_string(),
                    ))
                } else if redox < -100.0 {
                    Some((
                        QualityFlag::Suspect,
                        "Strongly reducing conditions - possible anaerobic zone".to_string(),
                    ))
                } else {
                    None
                };
                apply(
                    &mut outputs,
                    &[PARAM_REDOX_POTENTIAL, PARAM_DISSOLVED_OXYGEN],
                    verdict,
                );
            }

            // Nutrient-algae balance.
            if has_nutrient {
                if let (Some(nitrate), Some(chl_a), Some(phyco)) = (
                    value(PARAM_NITRATE, idx),
                    value(PARAM_CHLOROPHYLL_A, idx),
                    value(PARAM_PHYCOCYANIN, idx),
                ) {
                    let params = [PARAM_NITRATE, PARAM_CHLOROPHYLL_A, PARAM_PHYCOCYANIN];
                    let mut fired = false;

                    if nitrate < 0.5 && chl_a > 100.0 {
                        fired = true;
                        apply(
                            &mut outputs,
                            &params,
                            Some((
                                QualityFlag::Suspect,
                                "High chl-a despite nitrate limitation".to_string(),
                            )),
                        );
                    }
                    if phyco > 50.0 && chl_a < 20.0 {
                        fired = true;
                        apply(
                            &mut outputs,
                            &params,
                            Some((
                                QualityFlag::Suspect,
                                "High phycocyanin at low chl-a - cyanobacteria dominance"
                                    .to_string(),
                            )),
                        );
                    }
                    if chl_a > 0.0 && phyco / chl_a > 0.5 {
                        fired = true;
                        apply(
                            &mut outputs,
                            &params,
                            Some((
                                QualityFlag::Suspect,
                                format!(
                                    "High phycocyanin/chl-a ratio ({:.2}) - blue-green algae",
                                    phyco / chl_a
                                ),
                            )),
                        );
                    }

                    if !fired {
                        apply(&mut outputs, &params, None);
                    }
                }
            }
        }

        outputs
    }

    /// Realized-vs-expected correlation quality over the trailing `window`
    /// points of the batch. Pairs with fewer than ten co-present points are
    /// skipped.
    pub fn quality_metrics(&self, batch: &StationBatch, window: usize) -> CorrelationQuality {
        let n = batch.len();
        let start = n.saturating_sub(window);
        let mut result = CorrelationQuality::default();

        for ((param_a, param_b), expected) in &self.expected {
            let (col_a, col_b) = match (batch.column(param_a), batch.column(param_b)) {
                (Some(a), Some(b)) => (a, b),
                _ => continue,
            };

            let mut xs = Vec::new();
            let mut ys = Vec::new();
            for idx in start..n {
                if let (Some(x), Some(y)) = (col_a[idx], col_b[idx]) {
                    xs.push(x);
                    ys.push(y);
                }
            }
            if xs.len() < MIN_CORRELATION_POINTS {
                continue;
            }

            let correlation = match stats::pearson(&xs, &ys) {
                Some(r) => r,
                None => continue,
            };

            let quality = if correlation >= expected.min && correlation <= expected.max {
                100.0
            } else {
                let deviation = if correlation < expected.min {
                    expected.min - correlation
                } else {
                    correlation - expected.max
                };
                (100.0 - deviation * 100.0).max(0.0)
            };

            result.pairs.insert(
                format!("{}-{}", param_a, param_b),
                PairQuality {
                    correlation,
                    quality,
                },
            );
        }

        if !result.pairs.is_empty() {
            let sum: f64 = result.pairs.values().map(|p| p.quality).sum();
            result.overall_quality = Some(sum / result.pairs.len() as f64);
        }

        result
    }
}

impl Default for CorrelationCheck {
    fn default() -> Self {
        Self::new()
    }
}
