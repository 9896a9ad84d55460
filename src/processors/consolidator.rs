use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDateTime;
use tracing::debug;

use crate::config::{ConsolidationConfig, Statistic};
use crate::models::{DailyAggregateRecord, FlaggedSeries, QualityFlag, StationBatch};
use crate::utils::stats;

/// Rolls combined hourly verdicts up into one record per
/// (station, day, parameter).
///
/// The trust ratio decides how the day's statistics are computed: a day
/// rated Bad keeps all raw values untouched, while better days mask
/// Bad/Suspect hours and bridge short interior gaps by linear
/// interpolation before aggregating.
pub struct DailyConsolidator {
    config: ConsolidationConfig,
}

impl DailyConsolidator {
    pub fn new(config: ConsolidationConfig) -> Self {
        Self { config }
    }

    pub fn with_defaults() -> Self {
        Self::new(ConsolidationConfig::with_defaults())
    }

    /// Consolidate every flagged parameter of the batch. Records come out
    /// ordered by parameter, then by day.
    pub fn consolidate(
        &self,
        batch: &StationBatch,
        flagged: &BTreeMap<String, FlaggedSeries>,
    ) -> Vec<DailyAggregateRecord> {
        let mut records = Vec::new();

        for (parameter, series) in flagged {
            let values = match batch.column(parameter) {
                Some(col) => col,
                None => {
                    debug!(parameter, "flagged series without a data column, skipping");
                    continue;
                }
            };
            records.extend(self.consolidate_parameter(
                &batch.station_id,
                parameter,
                batch.timestamps(),
                values,
                series,
            ));
        }

        records
    }

    /// Consolidate one parameter's flagged series into daily records. Days
    /// without a single present value produce no record.
    pub fn consolidate_parameter(
        &self,
        station_id: &str,
        parameter: &str,
        timestamps: &[NaiveDateTime],
        values: &[Option<f64>],
        series: &FlaggedSeries,
    ) -> Vec<DailyAggregateRecord> {
        let mut records = Vec::new();
        let mut day_start = 0;

        while day_start < timestamps.len() {
            let date = timestamps[day_start].date();
            let mut day_end = day_start;
            while day_end + 1 < timestamps.len() && timestamps[day_end + 1].date() == date {
                day_end += 1;
            }

            let range = day_start..=day_end;
            if let Some(record) = self.consolidate_day(
                station_id,
                parameter,
                date,
                &values[range.clone()],
                &series.flags[range.clone()],
                &series.reasons[range],
            ) {
                records.push(record);
            }

            day_start = day_end + 1;
        }

        records
    }

    fn consolidate_day(
        &self,
        station_id: &str,
        parameter: &str,
        date: chrono::NaiveDate,
        values: &[Option<f64>],
        flags: &[QualityFlag],
        reasons: &[String],
    ) -> Option<DailyAggregateRecord> {
        let present = values.iter().filter(|v| v.is_some()).count();
        if present == 0 {
            return None;
        }

        let good = values
            .iter()
            .zip(flags)
            .filter(|(value, flag)| value.is_some() && **flag == QualityFlag::Good)
            .count();
        let good_ratio = good as f64 / present as f64 * 100.0;

        let day_flag = if good_ratio >= self.config.good_threshold {
            QualityFlag::Good
        } else if good_ratio >= self.config.suspect_threshold {
            QualityFlag::Suspect
        } else {
            QualityFlag::Bad
        };

        let usable: Vec<f64> = if day_flag == QualityFlag::Bad {
            // Not enough trust to mask anything: aggregate the raw values
            // and let the flag warn downstream consumers.
            values.iter().filter_map(|v| *v).collect()
        } else {
            let mut masked: Vec<Option<f64>> = values
                .iter()
                .zip(flags)
                .map(|(value, flag)| {
                    if flag.is_usable() {
                        *value
                    } else {
                        None
                    }
                })
                .collect();
            stats::interpolate_gaps(&mut masked, self.config.max_interpolation_gap);
            masked.into_iter().flatten().collect()
        };

        let precision = self.config.precision_for(parameter);
        let mut statistics = BTreeMap::new();
        for statistic in self.config.statistics_for(parameter) {
            let computed = match statistic {
                Statistic::Mean => stats::mean(&usable),
                Statistic::Min => stats::min(&usable),
                Statistic::Max => stats::max(&usable),
                Statistic::Median => stats::median(&usable),
                Statistic::StdDev => stats::std_dev(&usable),
            };
            if let Some(value) = computed {
                statistics.insert(
                    statistic.name().to_string(),
                    stats::round_to(value, precision),
                );
            }
        }

        let unique: BTreeSet<&str> = reasons
            .iter()
            .flat_map(|reason| reason.split("; "))
            .filter(|reason| !reason.is_empty())
            .collect();
        let reason = unique.into_iter().collect::<Vec<_>>().join("; ");

        Some(DailyAggregateRecord {
            station_id: station_id.to_string(),
            date,
            parameter: parameter.to_string(),
            statistics,
            good_ratio: stats::round_to(good_ratio, 2),
            day_flag,
            reason,
            hour_count: usable.len(),
        })
    }
}

impl Default for DailyConsolidator {
    fn default() -> Self {
        Self::with_defaults()
    }
}
