pub mod consolidation;
pub mod resolver;
pub mod rules;

pub use consolidation::{ConsolidationConfig, Statistic};
pub use resolver::{RuleResolver, StaticRuleResolver};
pub use rules::{ParameterRules, RangeBounds, Season};
