use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::utils::constants::*;

/// Daily statistic selectable per parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Statistic {
    Mean,
    Min,
    Max,
    Median,
    StdDev,
}

impl Statistic {
    pub fn name(&self) -> &'static str {
        match self {
            Statistic::Mean => "mean",
            Statistic::Min => "min",
            Statistic::Max => "max",
            Statistic::Median => "median",
            Statistic::StdDev => "stddev",
        }
    }
}

/// Per-parameter consolidation settings: which statistics to compute and
/// how many decimal places to keep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidationConfig {
    statistics: BTreeMap<String, Vec<Statistic>>,
    precision: BTreeMap<String, u32>,
    pub default_statistics: Vec<Statistic>,
    pub default_precision: u32,
    /// Interior gaps up to this many hours are interpolated on good days.
    pub max_interpolation_gap: usize,
    /// Good-value ratio (%) from which a day is rated Good.
    pub good_threshold: f64,
    /// Good-value ratio (%) from which a day is rated Suspect rather
    /// than Bad.
    pub suspect_threshold: f64,
}

impl ConsolidationConfig {
    pub fn new() -> Self {
        Self {
            statistics: BTreeMap::new(),
            precision: BTreeMap::new(),
            default_statistics: vec![Statistic::Min, Statistic::Max, Statistic::Mean],
            default_precision: DEFAULT_PRECISION,
            max_interpolation_gap: DEFAULT_MAX_INTERPOLATION_GAP,
            good_threshold: GOOD_RATIO_THRESHOLD,
            suspect_threshold: SUSPECT_RATIO_THRESHOLD,
        }
    }

    /// Network-standard consolidation rules: the biologically active
    /// parameters carry a spread measure, pH and dissolved oxygen the full
    /// five-statistic set.
    pub fn with_defaults() -> Self {
        let mut config = Self::new();

        let all_five = vec![
            Statistic::Min,
            Statistic::Max,
            Statistic::Mean,
            Statistic::Median,
            Statistic::StdDev,
        ];
        let with_spread = vec![
            Statistic::Min,
            Statistic::Max,
            Statistic::Mean,
            Statistic::StdDev,
        ];

        config.set_statistics(PARAM_PH, all_five.clone());
        config.set_statistics(PARAM_DISSOLVED_OXYGEN, all_five);
        for param in [
            PARAM_PHYCOCYANIN,
            PARAM_TURBIDITY,
            PARAM_CHLOROPHYLL_A,
            PARAM_REDOX_POTENTIAL,
        ] {
            config.set_statistics(param, with_spread.clone());
        }

        let precisions = [
            (PARAM_PHYCOCYANIN, 1),
            (PARAM_TOC, 1),
            (PARAM_TURBIDITY, 1),
            (PARAM_CHLOROPHYLL_A, 1),
            (PARAM_DOC, 1),
            (PARAM_NITRATE, 1),
            (PARAM_DISSOLVED_OXYGEN, 2),
            (PARAM_CONDUCTIVITY, 0),
            (PARAM_PH, 2),
            (PARAM_REDOX_POTENTIAL, 0),
            (PARAM_AIR_TEMPERATURE, 1),
        ];
        for (param, digits) in precisions {
            config.set_precision(param, digits);
        }

        config
    }

    pub fn set_statistics(&mut self, parameter: impl Into<String>, stats: Vec<Statistic>) {
        self.statistics.insert(parameter.into(), stats);
    }

    pub fn set_precision(&mut self, parameter: impl Into<String>, precision: u32) {
        self.precision.insert(parameter.into(), precision);
    }

    pub fn statistics_for(&self, parameter: &str) -> &[Statistic] {
        self.statistics
            .get(parameter)
            .unwrap_or(&self.default_statistics)
    }

    pub fn precision_for(&self, parameter: &str) -> u32 {
        self.precision
            .get(parameter)
            .copied()
            .unwrap_or(self.default_precision)
    }
}

impl Default for ConsolidationConfig {
    fn default() -> Self {
        Self::new()
    }
}
