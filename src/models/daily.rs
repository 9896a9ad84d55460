use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::QualityFlag;

/// Flag-aware daily roll-up for one (station, day, parameter).
///
/// The only entity exported downstream; recomputed from scratch every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAggregateRecord {
    pub station_id: String,
    pub date: NaiveDate,
    pub parameter: String,

    /// Configured statistic subset, keyed by statistic name ("mean", "min",
    /// "max", "median", "stddev"). A statistic that could not be computed
    /// (e.g. stddev over a single value) is simply absent.
    pub statistics: BTreeMap<String, f64>,

    /// Share of `Good` points among points with a present value, percent.
    pub good_ratio: f64,
    pub day_flag: QualityFlag,
    pub reason: String,
    /// Number of hourly values that entered the statistics.
    pub hour_count: usize,
}

impl DailyAggregateRecord {
    /// Flatten into a single `key -> value` map for the persistence and
    /// reporting collaborators.
    pub fn to_flat_map(&self) -> BTreeMap<String, serde_json::Value> {
        let mut flat = BTreeMap::new();

        for (stat, value) in &self.statistics {
            flat.insert(stat.clone(), serde_json::json!(value));
        }
        flat.insert("good_ratio".to_string(), serde_json::json!(self.good_ratio));
        flat.insert(
            "day_flag".to_string(),
            serde_json::json!(self.day_flag.as_u8()),
        );
        flat.insert("reason".to_string(), serde_json::json!(self.reason));
        flat.insert("hour_count".to_string(), serde_json::json!(self.hour_count));

        flat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flat_map_layout() {
        let mut statistics = BTreeMap::new();
        statistics.insert("mean".to_string(), 7.52);
        statistics.insert("max".to_string(), 8.1);

        let record = DailyAggregateRecord {
            station_id: "wamo00010".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
            parameter: "ph".to_string(),
            statistics,
            good_ratio: 91.67,
            day_flag: QualityFlag::Good,
            reason: String::new(),
            hour_count: 22,
        };

        let flat = record.to_flat_map();
        assert_eq!(flat["mean"], serde_json::json!(7.52));
        assert_eq!(flat["day_flag"], serde_json::json!(1));
        assert_eq!(flat["hour_count"], serde_json::json!(22));
        assert_eq!(flat["good_ratio"], serde_json::json!(91.67));
    }
}
