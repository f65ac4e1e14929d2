use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Entity, RuleId};
use crate::errors::ClubError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleCategory {
    Scoring,
    Match,
    Timing,
    Serving,
    Registration,
    Tournament,
    Custom,
}

impl RuleCategory {
    pub const ALL: [RuleCategory; 7] = [
        RuleCategory::Scoring,
        RuleCategory::Match,
        RuleCategory::Timing,
        RuleCategory::Serving,
        RuleCategory::Registration,
        RuleCategory::Tournament,
        RuleCategory::Custom,
    ];

    /// Rules in these categories can be neither deleted nor deactivated
    pub fn is_protected(self) -> bool {
        matches!(self, RuleCategory::Scoring | RuleCategory::Match)
    }

    pub fn as_str(&self) -> &str {
        match self {
            RuleCategory::Scoring => "scoring",
            RuleCategory::Match => "match",
            RuleCategory::Timing => "timing",
            RuleCategory::Serving => "serving",
            RuleCategory::Registration => "registration",
            RuleCategory::Tournament => "tournament",
            RuleCategory::Custom => "custom",
        }
    }
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleCategory {
    type Err = ClubError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        RuleCategory::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| ClubError::validation(format!("unknown rule category: {}", value)))
    }
}

/// Stable identity of the built-in rules, independent of their display names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleKey {
    SetWinningScore,
    SetsToWin,
    MinWinMargin,
    MaxSetScore,
    BreakBetweenSets,
    TimeoutDuration,
    MaxTimeouts,
    ServeRotation,
    RegistrationLeadHours,
    MaxParticipants,
}

impl RuleKey {
    /// Smallest value that still makes sense for the rule
    pub fn minimum(self) -> f64 {
        match self {
            RuleKey::SetWinningScore | RuleKey::SetsToWin | RuleKey::MinWinMargin | RuleKey::MaxSetScore => 1.0,
            RuleKey::ServeRotation => 1.0,
            RuleKey::MaxParticipants => 2.0,
            RuleKey::BreakBetweenSets
            | RuleKey::TimeoutDuration
            | RuleKey::MaxTimeouts
            | RuleKey::RegistrationLeadHours => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    Number(f64),
    Text(String),
}

impl RuleValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            RuleValue::Number(value) => Some(*value),
            RuleValue::Text(_) => None,
        }
    }
}

impl fmt::Display for RuleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleValue::Number(value) => write!(f, "{}", value),
            RuleValue::Text(text) => f.write_str(text),
        }
    }
}

impl From<f64> for RuleValue {
    fn from(value: f64) -> Self {
        RuleValue::Number(value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: RuleId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<RuleKey>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub value: RuleValue,
    pub category: RuleCategory,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
    /// Lower numbers come first
    #[serde(default)]
    pub priority: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn active_by_default() -> bool {
    true
}

impl Rule {
    pub fn new(
        name: &str,
        description: &str,
        value: RuleValue,
        category: RuleCategory,
        priority: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RuleId::generate(),
            key: None,
            name: name.trim().to_string(),
            description: description.trim().to_string(),
            value,
            category,
            is_active: true,
            priority,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_protected(&self) -> bool {
        self.category.is_protected()
    }

    /// Field problems, empty when the rule is valid on its own
    pub fn validate(&self) -> Vec<String> {
        let mut violations = Vec::new();
        if self.name.trim().is_empty() {
            violations.push("rule name is required".to_string());
        }
        match (&self.value, self.key) {
            (RuleValue::Number(value), key) => {
                if !value.is_finite() || *value < 0.0 {
                    violations.push(format!("rule {} must be a non-negative number", self.name));
                } else if let Some(key) = key {
                    if *value < key.minimum() {
                        violations.push(format!("rule {} must be at least {}", self.name, key.minimum()));
                    }
                }
            }
            (RuleValue::Text(_), Some(_)) => {
                violations.push(format!("rule {} must be numeric", self.name));
            }
            (RuleValue::Text(_), None) => {}
        }
        violations
    }

    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        self.name.to_lowercase().contains(&term)
            || self.description.to_lowercase().contains(&term)
            || self.category.as_str().contains(&term)
    }
}

impl Entity for Rule {
    type Id = RuleId;
    const KIND: &'static str = "rule";

    fn id(&self) -> &RuleId {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_rules_reject_negative_values() {
        let mut rule = Rule::new("Bonus", "", RuleValue::Number(-1.0), RuleCategory::Custom, 5, Utc::now());
        assert_eq!(rule.validate().len(), 1);
        rule.value = RuleValue::Number(0.0);
        assert!(rule.validate().is_empty());
    }

    #[test]
    fn test_keyed_rules_respect_minimum() {
        let mut rule = Rule::new("Sets", "", RuleValue::Number(0.0), RuleCategory::Match, 1, Utc::now());
        rule.key = Some(RuleKey::SetsToWin);
        assert!(!rule.validate().is_empty());
    }

    #[test]
    fn test_rule_value_serializes_untagged() {
        assert_eq!(serde_json::to_value(RuleValue::Number(11.0)).unwrap(), serde_json::json!(11.0));
        let text: RuleValue = serde_json::from_value(serde_json::json!("ittf")).unwrap();
        assert_eq!(text, RuleValue::Text("ittf".into()));
    }
}
