use std::collections::BTreeMap;

use crate::config::rules::{ParameterRules, Season};
use crate::error::Result;
use crate::utils::constants::*;

/// Supplies per-station, per-parameter QC thresholds.
///
/// The engine is agnostic to where rules come from; a database-backed
/// implementation plugs in here. A missing rule set disables the
/// corresponding tests for that parameter, it is never an error.
pub trait RuleResolver: Send + Sync {
    fn resolve(&self, station_id: &str, parameter: &str, season: Season)
        -> Option<ParameterRules>;
}

/// In-memory resolver with an exact-key fallback chain:
/// station-specific rule, then global rule. Seasonal bounds are part of
/// the rule itself and picked per point by calendar month.
#[derive(Debug, Clone, Default)]
pub struct StaticRuleResolver {
    global: BTreeMap<String, ParameterRules>,
    station_overrides: BTreeMap<String, BTreeMap<String, ParameterRules>>,
}

impl StaticRuleResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolver preloaded with the monitoring network's standard limits
    /// per parameter (EU bathing-water guideline derived).
    pub fn with_defaults() -> Self {
        let mut resolver = Self::new();

        let defaults = [
            (PARAM_PHYCOCYANIN, 0.0, 200.0, None),
            (PARAM_TOC, 1.0, 70.0, None),
            (PARAM_TURBIDITY, 0.0, 150.0, Some(50.0)),
            (PARAM_CHLOROPHYLL_A, 0.0, 250.0, None),
            (PARAM_DOC, 1.0, 60.0, None),
            (PARAM_NITRATE, 0.0, 50.0, Some(10.0)),
            (PARAM_DISSOLVED_OXYGEN, 0.0, 20.0, Some(5.0)),
            (PARAM_CONDUCTIVITY, 100.0, 1500.0, Some(100.0)),
            (PARAM_PH, 6.0, 10.0, Some(0.5)),
            (PARAM_REDOX_POTENTIAL, -300.0, 600.0, None),
            (PARAM_WATER_TEMP_0_5M, -0.5, 32.0, Some(2.0)),
            (PARAM_WATER_TEMP_1M, -0.5, 32.0, Some(2.0)),
            (PARAM_WATER_TEMP_2M, -0.5, 32.0, Some(2.0)),
            (PARAM_AIR_TEMPERATURE, -25.0, 40.0, None),
        ];

        for (param, min, max, spike) in defaults {
            let mut rules = ParameterRules::new()
                .with_range(min, max)
                .with_stuck_tolerance(DEFAULT_STUCK_TOLERANCE);
            if let Some(threshold) = spike {
                rules = rules.with_spike_threshold(threshold);
            }
            resolver.global.insert(param.to_string(), rules);
        }

        resolver
    }

    /// Structurally invalid rules are rejected here, before any station
    /// is processed against them.
    pub fn insert_global(
        &mut self,
        parameter: impl Into<String>,
        rules: ParameterRules,
    ) -> Result<()> {
        rules.check_valid()?;
        self.global.insert(parameter.into(), rules);
        Ok(())
    }

    pub fn insert_station_override(
        &mut self,
        station_id: impl Into<String>,
        parameter: impl Into<String>,
        rules: ParameterRules,
    ) -> Result<()> {
        rules.check_valid()?;
        self.station_overrides
            .entry(station_id.into())
            .or_default()
            .insert(parameter.into(), rules);
        Ok(())
    }

    /// Validate every stored rule set; call once after construction.
    pub fn check_valid(&self) -> Result<()> {
        for rules in self.global.values() {
            rules.check_valid()?;
        }
        for station in self.station_overrides.values() {
            for rules in station.values() {
                rules.check_valid()?;
            }
        }
        Ok(())
    }
}

impl RuleResolver for StaticRuleResolver {
    fn resolve(
        &self,
        station_id: &str,
        parameter: &str,
        _season: Season,
    ) -> Option<ParameterRules> {
        self.station_overrides
            .get(station_id)
            .and_then(|overrides| overrides.get(parameter))
            .or_else(|| self.global.get(parameter))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_station_override_wins_over_global() {
        let mut resolver = StaticRuleResolver::with_defaults();
        resolver
            .insert_station_override(
                "wamo00019",
                PARAM_PH,
                ParameterRules::new().with_range(6.0, 11.0),
            )
            .unwrap();

        let shallow_lake = resolver
            .resolve("wamo00019", PARAM_PH, Season::Summer)
            .unwrap();
        assert_eq!(shallow_lake.range.unwrap().max, Some(11.0));

        let other = resolver
            .resolve("wamo00010", PARAM_PH, Season::Summer)
            .unwrap();
        assert_eq!(other.range.unwrap().max, Some(10.0));
    }

    #[test]
    fn test_unknown_parameter_has_no_rules() {
        let resolver = StaticRuleResolver::with_defaults();
        assert!(resolver
            .resolve("wamo00010", "supply_voltage", Season::Winter)
            .is_none());
    }

    #[test]
    fn test_inverted_range_never_reaches_the_engine() {
        // An inverted bound would flag every normal reading Bad, so it has
        // to be refused at configuration time rather than at run time.
        let mut resolver = StaticRuleResolver::new();
        let inverted = ParameterRules::new().with_range(10.0, 0.0);

        assert!(resolver.insert_global(PARAM_PH, inverted.clone()).is_err());
        assert!(resolver
            .insert_station_override("wamo00010", PARAM_PH, inverted)
            .is_err());
        assert!(resolver
            .resolve("wamo00010", PARAM_PH, Season::Summer)
            .is_none());
    }

    #[test]
    fn test_default_tables_are_structurally_valid() {
        let resolver = StaticRuleResolver::with_defaults();
        assert!(resolver.check_valid().is_ok());
    }
}
