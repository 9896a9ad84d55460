use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use crate::error::{QcError, Result};
use crate::models::{CheckOutput, QualityFlag, StationBatch};
use crate::utils::constants::{DEFAULT_CONTAMINATION, DEFAULT_DETECTOR_SEED};
use crate::utils::stats;

/// Strategy interface for the row scorer, so the statistical method can be
/// swapped without touching combination or consolidation logic.
///
/// `matrix` is row-major with one row per timestamp; the result marks each
/// row as outlier (`true`) or inlier.
pub trait AnomalyDetector: Send + Sync {
    fn score(&self, matrix: &[Vec<f64>]) -> Result<Vec<bool>>;
}

/// Isolation forest with fixed-seed sampling: identical input yields an
/// identical outlier set across runs.
pub struct IsolationForest {
    n_trees: usize,
    sample_size: usize,
    contamination: f64,
    seed: u64,
}

impl IsolationForest {
    pub fn new(contamination: f64, seed: u64) -> Self {
        Self {
            n_trees: 100,
            sample_size: 256,
            contamination,
            seed,
        }
    }
}

impl Default for IsolationForest {
    fn default() -> Self {
        Self::new(DEFAULT_CONTAMINATION, DEFAULT_DETECTOR_SEED)
    }
}

enum Node {
    Internal {
        feature: usize,
        split: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
    Leaf {
        size: usize,
    },
}

/// Average unsuccessful-search path length in a BST of `n` points.
fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + 0.577_215_664_9) - 2.0 * (n - 1.0) / n
        }
    }
}

fn build_tree(
    matrix: &[Vec<f64>],
    rows: &[usize],
    depth: usize,
    max_depth: usize,
    rng: &mut StdRng,
) -> Node {
    if rows.len() <= 1 || depth >= max_depth {
        return Node::Leaf { size: rows.len() };
    }

    let n_features = matrix[rows[0]].len();
    let splittable: Vec<usize> = (0..n_features)
        .filter(|&f| {
            let lo = rows.iter().map(|&r| matrix[r][f]).fold(f64::INFINITY, f64::min);
            let hi = rows
                .iter()
                .map(|&r| matrix[r][f])
                .fold(f64::NEG_INFINITY, f64::max);
            hi > lo
        })
        .collect();

    if splittable.is_empty() {
        return Node::Leaf { size: rows.len() };
    }

    let feature = splittable[rng.gen_range(0..splittable.len())];
    let lo = rows
        .iter()
        .map(|&r| matrix[r][feature])
        .fold(f64::INFINITY, f64::min);
    let hi = rows
        .iter()
        .map(|&r| matrix[r][feature])
        .fold(f64::NEG_INFINITY, f64::max);
    let split = rng.gen_range(lo..hi);

    let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
        rows.iter().partition(|&&r| matrix[r][feature] < split);

    Node::Internal {
        feature,
        split,
        left: Box::new(build_tree(matrix, &left_rows, depth + 1, max_depth, rng)),
        right: Box::new(build_tree(matrix, &right_rows, depth + 1, max_depth, rng)),
    }
}

fn path_length(node: &Node, row: &[f64], depth: usize) -> f64 {
    match node {
        Node::Leaf { size } => depth as f64 + average_path_length(*size),
        Node::Internal {
            feature,
            split,
            left,
            right,
        } => {
            if row[*feature] < *split {
                path_length(left, row, depth + 1)
            } else {
                path_length(right, row, depth + 1)
            }
        }
    }
}

impl AnomalyDetector for IsolationForest {
    fn score(&self, matrix: &[Vec<f64>]) -> Result<Vec<bool>> {
        let n = matrix.len();
        if n == 0 {
            return Err(QcError::ComputationFailure {
                check: "multivariate".to_string(),
                message: "empty matrix".to_string(),
            });
        }
        let width = matrix[0].len();
        if width == 0 || matrix.iter().any(|row| row.len() != width) {
            return Err(QcError::ComputationFailure {
                check: "multivariate".to_string(),
                message: "ragged or zero-width matrix".to_string(),
            });
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let psi = self.sample_size.min(n);
        let max_depth = (psi as f64).log2().ceil() as usize;

        let trees: Vec<Node> = (0..self.n_trees)
            .map(|_| {
                let sample = rand::seq::index::sample(&mut rng, n, psi).into_vec();
                build_tree(matrix, &sample, 0, max_depth.max(1), &mut rng)
            })
            .collect();

        let normalizer = average_path_length(psi);
        let scores: Vec<f64> = matrix
            .iter()
            .map(|row| {
                let mean_path: f64 = trees
                    .iter()
                    .map(|tree| path_length(tree, row, 0))
                    .sum::<f64>()
                    / self.n_trees as f64;
                2f64.powf(-mean_path / normalizer.max(1.0))
            })
            .collect();

        // Contamination semantics: the top-scoring share of rows is labeled
        // outlier, ties broken by row order for determinism.
        let n_outliers = ((self.contamination * n as f64).ceil() as usize).min(n);
        let mut order: Vec<usize> = (0..n).collect();
        order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));

        let mut outliers = vec![false; n];
        for &idx in order.iter().take(n_outliers) {
            outliers[idx] = true;
        }
        Ok(outliers)
    }
}

/// Multivariate anomaly test over two or more aligned parameter columns.
///
/// Missing values are median-filled per column (zero as last resort), each
/// row is scored by the detector, and blame for an outlier row is
/// attributed to the columns outside their own 5th/95th empirical
/// percentile. Output fans out per column; it is never one shared series.
pub struct MultivariateCheck {
    parameters: Vec<String>,
    detector: Box<dyn AnomalyDetector>,
}

impl MultivariateCheck {
    pub fn new(parameters: Vec<String>) -> Self {
        Self {
            parameters,
            detector: Box::new(IsolationForest::default()),
        }
    }

    pub fn with_detector(mut self, detector: Box<dyn AnomalyDetector>) -> Self {
        self.detector = detector;
        self
    }

    pub fn evaluate(&self, batch: &StationBatch) -> Result<BTreeMap<String, CheckOutput>> {
        let columns: Vec<(&str, &[Option<f64>])> = self
            .parameters
            .iter()
            .filter_map(|p| batch.column(p).map(|col| (p.as_str(), col)))
            .collect();

        if columns.len() < 2 || batch.is_empty() {
            debug!(
                station = %batch.station_id,
                columns = columns.len(),
                "skipping multivariate check, needs at least two columns"
            );
            return Ok(BTreeMap::new());
        }

        let present: Vec<&str> = columns.iter().map(|(param, _)| *param).collect();
        let n = batch.len();

        // Median-fill per column so the detector sees a dense matrix.
        let filled: Vec<Vec<f64>> = columns
            .iter()
            .map(|(_, column)| {
                let observed: Vec<f64> = column.iter().flatten().copied().collect();
                let fill = stats::median(&observed).unwrap_or(0.0);
                column.iter().map(|v| v.unwrap_or(fill)).collect()
            })
            .collect();

        let matrix: Vec<Vec<f64>> = (0..n)
            .map(|row| filled.iter().map(|col| col[row]).collect())
            .collect();

        let outliers = self.detector.score(&matrix)?;

        let lower: Vec<f64> = filled
            .iter()
            .map(|col| stats::percentile(col, 0.05).unwrap_or(f64::NEG_INFINITY))
            .collect();
        let upper: Vec<f64> = filled
            .iter()
            .map(|col| stats::percentile(col, 0.95).unwrap_or(f64::INFINITY))
            .collect();

        let mut outputs: BTreeMap<String, CheckOutput> = present
            .iter()
            .map(|param| (param.to_string(), CheckOutput::all_good(n)))
            .collect();

        for row in 0..n {
            if !outliers[row] {
                continue;
            }

            let mut blamed = false;
            for (c, param) in present.iter().enumerate() {
                let value = filled[c][row];
                let Some(output) = outputs.get_mut(*param) else {
                    continue;
                };

                if value < lower[c] {
                    output.record(
                        row,
                        QualityFlag::Suspect,
                        format!("Multivariate anomaly: {} unusually low", param),
                    );
                    blamed = true;
                } else if value > upper[c] {
                    output.record(
                        row,
                        QualityFlag::Suspect,
                        format!("Multivariate anomaly: {} unusually high", param),
                    );
                    blamed = true;
                }
            }

            // Jointly implausible without any single extreme column.
            if !blamed {
                for param in &present {
                    if let Some(output) = outputs.get_mut(*param) {
                        output.record(
                            row,
                            QualityFlag::Suspect,
                            "Implausible parameter combination",
                        );
                    }
                }
            }
        }

        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn batch_with(columns: &[(&str, Vec<Option<f64>>)]) -> StationBatch {
        let n = columns[0].1.len();
        let start = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let timestamps = (0..n)
            .map(|h| start + chrono::Duration::hours(h as i64))
            .collect();

        let mut batch = StationBatch::new("wamo00010", timestamps).unwrap();
        for (name, values) in columns {
            batch.insert_column(*name, values.clone()).unwrap();
        }
        batch
    }

    fn ramp(n: usize, base: f64, step: f64) -> Vec<Option<f64>> {
        (0..n).map(|i| Some(base + step * i as f64)).collect()
    }

    #[test]
    fn test_extreme_row_is_blamed_on_the_extreme_column() {
        let n = 100;
        let mut temp = ramp(n, 18.0, 0.01);
        let ph = ramp(n, 7.4, 0.002);
        temp[50] = Some(90.0); // far outside the column's empirical spread

        let check = MultivariateCheck::new(vec![
            "water_temp_0_5m".to_string(),
            "ph".to_string(),
        ]);
        let outputs = check
            .evaluate(&batch_with(&[("water_temp_0_5m", temp), ("ph", ph)]))
            .unwrap();

        let temp_output = &outputs["water_temp_0_5m"];
        assert_eq!(temp_output.flags[50], Some(QualityFlag::Suspect));
        assert!(temp_output.reasons[50].contains("unusually high"));

        // The pH column was not individually extreme at that row.
        assert_eq!(outputs["ph"].flags[50], Some(QualityFlag::Good));
    }

    #[test]
    fn test_deterministic_for_fixed_seed() {
        let n = 80;
        let mut o2 = ramp(n, 9.0, 0.01);
        o2[10] = Some(0.1);
        let cond = ramp(n, 450.0, 0.5);

        let columns = [("dissolved_oxygen", o2), ("conductivity", cond)];
        let params = vec!["dissolved_oxygen".to_string(), "conductivity".to_string()];

        let first = MultivariateCheck::new(params.clone())
            .evaluate(&batch_with(&columns))
            .unwrap();
        let second = MultivariateCheck::new(params)
            .evaluate(&batch_with(&columns))
            .unwrap();

        for (param, output) in &first {
            assert_eq!(output.flags, second[param].flags);
        }
    }

    #[test]
    fn test_single_column_skipped() {
        let check = MultivariateCheck::new(vec!["ph".to_string()]);
        let outputs = check.evaluate(&batch_with(&[("ph", ramp(24, 7.5, 0.0))])).unwrap();
        assert!(outputs.is_empty());
    }

    #[test]
    fn test_median_fill_keeps_gappy_column_usable() {
        let n = 60;
        let mut turbidity = ramp(n, 10.0, 0.05);
        turbidity[5] = None;
        turbidity[6] = None;
        let ph = ramp(n, 7.8, 0.001);

        let check = MultivariateCheck::new(vec!["turbidity".to_string(), "ph".to_string()]);
        let outputs = check
            .evaluate(&batch_with(&[("turbidity", turbidity), ("ph", ph)]))
            .unwrap();

        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs["turbidity"].len(), n);
    }
}
