pub mod defaults;
pub mod rule;
pub mod ruleset;
pub mod scoring;
pub mod validation;

pub use defaults::{default_name, default_rules, default_value};
pub use rule::{Rule, RuleCategory, RuleKey, RuleValue};
pub use ruleset::{NewRule, RuleSet, RuleUpdate};
pub use scoring::ScoringRules;
pub use validation::{ValidationContext, ValidationReport};
