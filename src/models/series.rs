use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{QcError, Result};
use crate::models::QualityFlag;

/// One station's cleaned, time-indexed table of hourly measurements.
///
/// Columns are keyed by canonical parameter name and aligned to a shared,
/// strictly increasing timestamp index. Absent readings are `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationBatch {
    pub station_id: String,
    timestamps: Vec<NaiveDateTime>,
    columns: BTreeMap<String, Vec<Option<f64>>>,
}

impl StationBatch {
    pub fn new(station_id: impl Into<String>, timestamps: Vec<NaiveDateTime>) -> Result<Self> {
        if timestamps.windows(2).any(|w| w[0] >= w[1]) {
            return Err(QcError::MalformedInput(
                "timestamps must be strictly increasing".to_string(),
            ));
        }

        Ok(Self {
            station_id: station_id.into(),
            timestamps,
            columns: BTreeMap::new(),
        })
    }

    pub fn insert_column(
        &mut self,
        parameter: impl Into<String>,
        values: Vec<Option<f64>>,
    ) -> Result<()> {
        let parameter = parameter.into();
        if values.len() != self.timestamps.len() {
            return Err(QcError::MalformedInput(format!(
                "column '{}' has {} values but the index has {} timestamps",
                parameter,
                values.len(),
                self.timestamps.len()
            )));
        }

        self.columns.insert(parameter, values);
        Ok(())
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn column(&self, parameter: &str) -> Option<&[Option<f64>]> {
        self.columns.get(parameter).map(|v| v.as_slice())
    }

    /// Parameter names in deterministic (sorted) order.
    pub fn parameters(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }
}

/// Per-point verdicts of a single test over one parameter series.
///
/// `None` means the test did not evaluate that point; such points neither
/// mask nor manufacture a verdict during combination.
#[derive(Debug, Clone, Default)]
pub struct CheckOutput {
    pub flags: Vec<Option<QualityFlag>>,
    pub reasons: Vec<String>,
}

impl CheckOutput {
    /// An output in which no point has been evaluated yet.
    pub fn not_evaluated(len: usize) -> Self {
        Self {
            flags: vec![None; len],
            reasons: vec![String::new(); len],
        }
    }

    /// An output that marks every point `Good` with no reason, the baseline
    /// for tests that evaluate the full series.
    pub fn all_good(len: usize) -> Self {
        Self {
            flags: vec![Some(QualityFlag::Good); len],
            reasons: vec![String::new(); len],
        }
    }

    /// Record a verdict at `idx`, escalating any existing flag under the
    /// severity order and concatenating reasons with "; ".
    pub fn record(&mut self, idx: usize, flag: QualityFlag, reason: impl Into<String>) {
        self.flags[idx] = Some(match self.flags[idx] {
            Some(existing) => existing.worst(flag),
            None => flag,
        });

        let reason = reason.into();
        if reason.is_empty() {
            return;
        }
        if self.reasons[idx].is_empty() {
            self.reasons[idx] = reason;
        } else {
            self.reasons[idx].push_str("; ");
            self.reasons[idx].push_str(&reason);
        }
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }
}

/// Final, combined verdict series for one (station, parameter).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlaggedSeries {
    pub flags: Vec<QualityFlag>,
    pub reasons: Vec<String>,
}

impl FlaggedSeries {
    /// Zip the series with its index and values into per-hour export
    /// units. Lengths are taken on trust; the pipeline aligns all three
    /// to the batch index.
    pub fn points(
        &self,
        timestamps: &[NaiveDateTime],
        values: &[Option<f64>],
    ) -> Vec<FlaggedPoint> {
        timestamps
            .iter()
            .zip(values)
            .zip(self.flags.iter().zip(&self.reasons))
            .map(|((timestamp, value), (flag, reason))| FlaggedPoint {
                timestamp: *timestamp,
                value: *value,
                flag: *flag,
                reason: reason.clone(),
            })
            .collect()
    }
}

/// A single annotated measurement, the exported per-hour unit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlaggedPoint {
    pub timestamp: NaiveDateTime,
    pub value: Option<f64>,
    pub flag: QualityFlag,
    pub reason: String,
}
