use serde::{Deserialize, Serialize};

use crate::error::{QcError, Result};

/// QARTOD-style quality flag assigned to a single measurement point.
///
/// The numeric codes follow the QARTOD convention used by the monitoring
/// network. Severity increases from `Good` to `Missing`; `Missing` is the
/// single most severe state and always wins combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QualityFlag {
    Good = 1,
    NotEvaluated = 2,
    Suspect = 3,
    Bad = 4,
    Missing = 9,
}

impl QualityFlag {
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            1 => Ok(QualityFlag::Good),
            2 => Ok(QualityFlag::NotEvaluated),
            3 => Ok(QualityFlag::Suspect),
            4 => Ok(QualityFlag::Bad),
            9 => Ok(QualityFlag::Missing),
            _ => Err(QcError::InvalidFlag(value)),
        }
    }

    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    /// Position in the total severity order. Higher is worse.
    pub fn severity(&self) -> u8 {
        match self {
            QualityFlag::Good => 0,
            QualityFlag::NotEvaluated => 1,
            QualityFlag::Suspect => 2,
            QualityFlag::Bad => 3,
            QualityFlag::Missing => 4,
        }
    }

    pub fn is_good(&self) -> bool {
        matches!(self, QualityFlag::Good)
    }

    /// Whether a value carrying this flag may enter masked statistics.
    pub fn is_usable(&self) -> bool {
        matches!(self, QualityFlag::Good | QualityFlag::NotEvaluated)
    }

    /// Worst of two flags under the severity order.
    pub fn worst(self, other: QualityFlag) -> QualityFlag {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }
}

impl PartialOrd for QualityFlag {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QualityFlag {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.severity().cmp(&other.severity())
    }
}

/// Combine any number of flags into a single verdict.
///
/// Commutative, associative and idempotent: the result is the most severe
/// element, or `Good` for an empty input (a point no test evaluated is
/// presumed good).
pub fn combine<I>(flags: I) -> QualityFlag
where
    I: IntoIterator<Item = QualityFlag>,
{
    flags
        .into_iter()
        .fold(QualityFlag::Good, QualityFlag::worst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_codes_round_trip() {
        for code in [1u8, 2, 3, 4, 9] {
            assert_eq!(QualityFlag::from_u8(code).unwrap().as_u8(), code);
        }
        assert!(QualityFlag::from_u8(0).is_err());
        assert!(QualityFlag::from_u8(5).is_err());
    }

    #[test]
    fn test_severity_order() {
        assert!(QualityFlag::Good < QualityFlag::NotEvaluated);
        assert!(QualityFlag::NotEvaluated < QualityFlag::Suspect);
        assert!(QualityFlag::Suspect < QualityFlag::Bad);
        assert!(QualityFlag::Bad < QualityFlag::Missing);
    }

    #[test]
    fn test_combine_empty_is_good() {
        assert_eq!(combine([]), QualityFlag::Good);
    }

    #[test]
    fn test_combine_picks_most_severe() {
        assert_eq!(
            combine([QualityFlag::Good, QualityFlag::Suspect, QualityFlag::Good]),
            QualityFlag::Suspect
        );
        assert_eq!(
            combine([QualityFlag::Bad, QualityFlag::Missing]),
            QualityFlag::Missing
        );
    }

    #[test]
    fn test_combine_good_iff_all_good() {
        assert_eq!(
            combine([QualityFlag::Good, QualityFlag::Good]),
            QualityFlag::Good
        );
        assert_ne!(
            combine([QualityFlag::Good, QualityFlag::NotEvaluated]),
            QualityFlag::Good
        );
    }

    #[test]
    fn test_combine_commutative_associative_idempotent() {
        use QualityFlag::*;
        let all = [Good, NotEvaluated, Suspect, Bad, Missing];

        for a in all {
            assert_eq!(combine([a, a]), a);
            for b in all {
                assert_eq!(combine([a, b]), combine([b, a]));
                for c in all {
                    assert_eq!(
                        combine([combine([a, b]), c]),
                        combine([a, combine([b, c])])
                    );
                }
            }
        }
    }
}
