use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Datelike;
use rayon::prelude::*;
use serde::Serialize;
use tracing::warn;

use crate::checks::{
    check_range, check_spikes, check_stuck_values, Advisory, CorrelationCheck, CorrelationQuality,
    MultivariateCheck,
};
use crate::config::{RuleResolver, Season, StaticRuleResolver};
use crate::error::{QcError, Result};
use crate::models::{CheckOutput, DailyAggregateRecord, FlaggedSeries, StationBatch};
use crate::processors::{combine_outputs, DailyConsolidator};
use crate::utils::constants::*;
use crate::utils::progress::ProgressReporter;

/// Everything the engine produces for one station batch.
#[derive(Debug, Clone, Serialize)]
pub struct StationReport {
    pub station_id: String,
    /// Combined per-point verdicts, keyed by parameter.
    pub flagged: BTreeMap<String, FlaggedSeries>,
    pub daily_records: Vec<DailyAggregateRecord>,
    pub correlation_quality: CorrelationQuality,
}

/// Runs the full QC sequence over station batches: single-series tests
/// per parameter, then the cross-parameter tests and advisories, then the
/// combiner and the daily consolidator.
///
/// The whole computation is pure and deterministic; two runs over the
/// same input and configuration produce identical reports.
pub struct QcPipeline {
    max_workers: usize,
    resolver: Arc<dyn RuleResolver>,
    multivariate: MultivariateCheck,
    correlation: CorrelationCheck,
    correlation_window: usize,
    advisories: Vec<Box<dyn Advisory>>,
    consolidator: DailyConsolidator,
    deadline: Option<Duration>,
}

impl QcPipeline {
    pub fn new() -> Self {
        let multivariate_parameters = vec![
            PARAM_WATER_TEMP_0_5M.to_string(),
            PARAM_PH.to_string(),
            PARAM_DISSOLVED_OXYGEN.to_string(),
            PARAM_CONDUCTIVITY.to_string(),
            PARAM_TURBIDITY.to_string(),
        ];

        Self {
            max_workers: num_cpus::get(),
            resolver: Arc::new(StaticRuleResolver::with_defaults()),
            multivariate: MultivariateCheck::new(multivariate_parameters),
            correlation: CorrelationCheck::new(),
            correlation_window: 24,
            advisories: Vec::new(),
            consolidator: DailyConsolidator::with_defaults(),
            deadline: None,
        }
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn RuleResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_multivariate(mut self, check: MultivariateCheck) -> Self {
        self.multivariate = check;
        self
    }

    pub fn with_correlation(mut self, check: CorrelationCheck) -> Self {
        self.correlation = check;
        self
    }

    pub fn with_correlation_window(mut self, window: usize) -> Self {
        self.correlation_window = window;
        self
    }

    pub fn with_advisory(mut self, advisory: Box<dyn Advisory>) -> Self {
        self.advisories.push(advisory);
        self
    }

    pub fn with_consolidator(mut self, consolidator: DailyConsolidator) -> Self {
        self.consolidator = consolidator;
        self
    }

    /// Bound the wall-clock time spent on a single station batch. The
    /// deadline is checked between test stages; an overrun abandons the
    /// station.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Run every station batch, isolating failures: a station whose input
    /// is malformed or whose deadline is exceeded is logged and skipped
    /// while the others complete. Reports come out sorted by station.
    pub fn run_stations(
        &self,
        batches: &[StationBatch],
        progress: Option<&ProgressReporter>,
    ) -> Result<Vec<StationReport>> {
        let processed = Arc::new(AtomicUsize::new(0));

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_workers)
            .build()
            .map_err(|e| QcError::InvalidConfig(e.to_string()))?;

        let mut reports: Vec<StationReport> = pool.install(|| {
            batches
                .par_iter()
                .filter_map(|batch| {
                    let result = self.run_station(batch);

                    let count = processed.fetch_add(1, Ordering::Relaxed) + 1;
                    if let Some(p) = progress {
                        p.update(count as u64);
                    }

                    match result {
                        Ok(report) => Some(report),
                        Err(err) => {
                            warn!(
                                station = %batch.station_id,
                                error = %err,
                                "station skipped"
                            );
                            None
                        }
                    }
                })
                .collect()
        });

        reports.sort_by(|a, b| a.station_id.cmp(&b.station_id));

        if let Some(p) = progress {
            p.finish_with_message(&format!(
                "Processed {} of {} stations",
                reports.len(),
                batches.len()
            ));
        }

        Ok(reports)
    }

    /// Run the full QC sequence over one station batch.
    pub fn run_station(&self, batch: &StationBatch) -> Result<StationReport> {
        let started = Instant::now();
        let n = batch.len();

        if batch.is_empty() {
            return Ok(StationReport {
                station_id: batch.station_id.clone(),
                flagged: BTreeMap::new(),
                daily_records: Vec::new(),
                correlation_quality: CorrelationQuality::default(),
            });
        }

        let season = Season::from_month(batch.timestamps()[0].month());
        let columns: Vec<(&str, &[Option<f64>])> = batch
            .parameters()
            .filter_map(|param| batch.column(param).map(|col| (param, col)))
            .collect();

        // Stage 1: independent single-series tests, one task per parameter.
        let mut outputs: BTreeMap<String, Vec<CheckOutput>> = columns
            .par_iter()
            .map(|(param, values)| {
                let mut parameter_outputs = Vec::new();

                if let Some(rules) = self.resolver.resolve(&batch.station_id, param, season) {
                    parameter_outputs.push(check_range(values, batch.timestamps(), &rules));
                    if let Some(tolerance) = rules.stuck_tolerance {
                        parameter_outputs.push(check_stuck_values(
                            values,
                            batch.timestamps(),
                            tolerance,
                        ));
                    }
                    if let Some(threshold) = rules.spike_threshold {
                        parameter_outputs.push(check_spikes(values, threshold));
                    }
                }

                (param.to_string(), parameter_outputs)
            })
            .collect();
        self.check_deadline(batch, started)?;

        // Stage 2: cross-parameter tests. A failing test is logged and
        // contributes no verdict; it never fails the station.
        match self.multivariate.evaluate(batch) {
            Ok(multivariate_outputs) => {
                for (param, output) in multivariate_outputs {
                    outputs.entry(param).or_default().push(output);
                }
            }
            Err(err) => {
                warn!(station = %batch.station_id, error = %err, "multivariate test skipped");
            }
        }
        self.check_deadline(batch, started)?;

        for (param, output) in self.correlation.evaluate(batch) {
            outputs.entry(param).or_default().push(output);
        }
        let correlation_quality = self
            .correlation
            .quality_metrics(batch, self.correlation_window);
        self.check_deadline(batch, started)?;

        // Stage 3: pluggable advisories under the same contract.
        for advisory in &self.advisories {
            match advisory.evaluate(batch) {
                Ok(advisory_outputs) => {
                    for (param, output) in advisory_outputs {
                        outputs.entry(param).or_default().push(output);
                    }
                }
                Err(err) => {
                    warn!(
                        station = %batch.station_id,
                        advisory = advisory.name(),
                        error = %err,
                        "advisory skipped"
                    );
                }
            }
            self.check_deadline(batch, started)?;
        }

        // Stage 4: reduce to one verdict series per parameter.
        let flagged: BTreeMap<String, FlaggedSeries> = outputs
            .into_iter()
            .map(|(param, parameter_outputs)| (param, combine_outputs(n, &parameter_outputs)))
            .collect();

        let daily_records = self.consolidator.consolidate(batch, &flagged);

        Ok(StationReport {
            station_id: batch.station_id.clone(),
            flagged,
            daily_records,
            correlation_quality,
        })
    }

    fn check_deadline(&self, batch: &StationBatch, started: Instant) -> Result<()> {
        let Some(deadline) = self.deadline else {
            return Ok(());
        };

        let elapsed = started.elapsed();
        if elapsed > deadline {
            warn!(
                station = %batch.station_id,
                elapsed_ms = elapsed.as_millis() as u64,
                "station deadline exceeded"
            );
            return Err(QcError::DeadlineExceeded {
                elapsed_ms: elapsed.as_millis() as u64,
            });
        }
        Ok(())
    }
}

impl Default for QcPipeline {
    fn default() -> Self {
        Self::new()
    }
}
