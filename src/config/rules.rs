use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::error::Result;

/// Meteorological season, keyed by calendar month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Season {
    Winter,
    Spring,
    Summer,
    Autumn,
}

impl Season {
    pub fn from_month(month: u32) -> Self {
        match month {
            12 | 1 | 2 => Season::Winter,
            3..=5 => Season::Spring,
            6..=8 => Season::Summer,
            _ => Season::Autumn,
        }
    }
}

/// Plausible value range for one parameter; either bound may be open.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_bounds"))]
pub struct RangeBounds {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl RangeBounds {
    pub fn new(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }
}

fn validate_bounds(bounds: &RangeBounds) -> std::result::Result<(), ValidationError> {
    if let (Some(min), Some(max)) = (bounds.min, bounds.max) {
        if min > max {
            return Err(ValidationError::new("range_min_above_max"));
        }
    }
    Ok(())
}

/// Resolved QC thresholds for one (station, parameter).
///
/// Absent members switch the corresponding test off for that parameter;
/// the test then contributes nothing to combination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct ParameterRules {
    #[validate(nested)]
    pub range: Option<RangeBounds>,

    /// Season-specific bounds override `range` for matching months.
    pub seasonal_range: Option<BTreeMap<Season, RangeBounds>>,

    /// Maximum plausible change between consecutive hourly points.
    #[validate(range(exclusive_min = 0.0))]
    pub spike_threshold: Option<f64>,

    /// Run length from which an unchanged value is considered stuck.
    pub stuck_tolerance: Option<usize>,
}

impl ParameterRules {
    pub fn new() -> Self {
        Self {
            range: None,
            seasonal_range: None,
            spike_threshold: None,
            stuck_tolerance: None,
        }
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.range = Some(RangeBounds::new(min, max));
        self
    }

    pub fn with_seasonal_range(mut self, season: Season, min: f64, max: f64) -> Self {
        self.seasonal_range
            .get_or_insert_with(BTreeMap::new)
            .insert(season, RangeBounds::new(min, max));
        self
    }

    pub fn with_spike_threshold(mut self, threshold: f64) -> Self {
        self.spike_threshold = Some(threshold);
        self
    }

    pub fn with_stuck_tolerance(mut self, tolerance: usize) -> Self {
        self.stuck_tolerance = Some(tolerance);
        self
    }

    /// Bounds applicable in `season`: the seasonal entry when present,
    /// otherwise the static range.
    pub fn bounds_for(&self, season: Season) -> Option<RangeBounds> {
        self.seasonal_range
            .as_ref()
            .and_then(|table| table.get(&season).copied())
            .or(self.range)
    }

    /// Structural validation; the only error class a caller ever sees.
    pub fn check_valid(&self) -> Result<()> {
        self.validate()?;
        if let Some(table) = &self.seasonal_range {
            for bounds in table.values() {
                bounds.validate()?;
            }
        }
        Ok(())
    }
}

impl Default for ParameterRules {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_season_from_month() {
        assert_eq!(Season::from_month(12), Season::Winter);
        assert_eq!(Season::from_month(2), Season::Winter);
        assert_eq!(Season::from_month(3), Season::Spring);
        assert_eq!(Season::from_month(8), Season::Summer);
        assert_eq!(Season::from_month(11), Season::Autumn);
    }

    #[test]
    fn test_seasonal_bounds_override_static() {
        let rules = ParameterRules::new()
            .with_range(0.0, 32.0)
            .with_seasonal_range(Season::Winter, -1.0, 10.0);

        assert_eq!(
            rules.bounds_for(Season::Winter),
            Some(RangeBounds::new(-1.0, 10.0))
        );
        assert_eq!(
            rules.bounds_for(Season::Summer),
            Some(RangeBounds::new(0.0, 32.0))
        );
    }

    #[test]
    fn test_invalid_rules_rejected() {
        let inverted = ParameterRules::new().with_range(10.0, 0.0);
        assert!(inverted.check_valid().is_err());

        let negative_spike = ParameterRules::new().with_spike_threshold(-2.0);
        assert!(negative_spike.check_valid().is_err());

        let fine = ParameterRules::new()
            .with_range(0.0, 20.0)
            .with_spike_threshold(5.0);
        assert!(fine.check_valid().is_ok());
    }
}
