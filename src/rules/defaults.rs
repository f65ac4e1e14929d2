use chrono::{DateTime, Utc};

use super::rule::{Rule, RuleCategory, RuleKey, RuleValue};

struct DefaultRule {
    key: RuleKey,
    name: &'static str,
    description: &'static str,
    value: f64,
    category: RuleCategory,
    priority: u32,
}

const DEFAULT_RULES: [DefaultRule; 10] = [
    DefaultRule {
        key: RuleKey::SetWinningScore,
        name: "Điểm thắng set",
        description: "Points needed to win a set",
        value: 11.0,
        category: RuleCategory::Scoring,
        priority: 1,
    },
    DefaultRule {
        key: RuleKey::SetsToWin,
        name: "Số set thắng trận",
        description: "Sets needed to win a match",
        value: 3.0,
        category: RuleCategory::Match,
        priority: 1,
    },
    DefaultRule {
        key: RuleKey::MinWinMargin,
        name: "Chênh lệch điểm tối thiểu",
        description: "Minimum point lead to close a set",
        value: 2.0,
        category: RuleCategory::Scoring,
        priority: 1,
    },
    DefaultRule {
        key: RuleKey::MaxSetScore,
        name: "Điểm tối đa một set",
        description: "Score ceiling of a set after deuce",
        value: 21.0,
        category: RuleCategory::Scoring,
        priority: 1,
    },
    DefaultRule {
        key: RuleKey::BreakBetweenSets,
        name: "Thời gian nghỉ giữa các set",
        description: "Break between sets (minutes)",
        value: 1.0,
        category: RuleCategory::Timing,
        priority: 2,
    },
    DefaultRule {
        key: RuleKey::TimeoutDuration,
        name: "Thời gian timeout",
        description: "Length of a timeout (minutes)",
        value: 1.0,
        category: RuleCategory::Timing,
        priority: 2,
    },
    DefaultRule {
        key: RuleKey::MaxTimeouts,
        name: "Số timeout tối đa",
        description: "Timeouts allowed per side in a match",
        value: 1.0,
        category: RuleCategory::Match,
        priority: 2,
    },
    DefaultRule {
        key: RuleKey::ServeRotation,
        name: "Đổi phát bóng",
        description: "Points played before the serve changes sides",
        value: 2.0,
        category: RuleCategory::Serving,
        priority: 1,
    },
    DefaultRule {
        key: RuleKey::RegistrationLeadHours,
        name: "Bắt buộc đăng ký trước",
        description: "Registration must happen this many hours before the start",
        value: 24.0,
        category: RuleCategory::Registration,
        priority: 3,
    },
    DefaultRule {
        key: RuleKey::MaxParticipants,
        name: "Tối đa người tham gia",
        description: "Maximum participants in a tournament",
        value: 32.0,
        category: RuleCategory::Tournament,
        priority: 2,
    },
];

/// The club's standard rule book
pub fn default_rules(now: DateTime<Utc>) -> Vec<Rule> {
    DEFAULT_RULES
        .iter()
        .map(|spec| {
            let mut rule = Rule::new(
                spec.name,
                spec.description,
                RuleValue::Number(spec.value),
                spec.category,
                spec.priority,
                now,
            );
            rule.key = Some(spec.key);
            rule
        })
        .collect()
}

pub fn default_value(key: RuleKey) -> f64 {
    DEFAULT_RULES
        .iter()
        .find(|spec| spec.key == key)
        .map(|spec| spec.value)
        .unwrap_or_default()
}

pub fn default_name(key: RuleKey) -> &'static str {
    DEFAULT_RULES
        .iter()
        .find(|spec| spec.key == key)
        .map(|spec| spec.name)
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rule_book_is_valid() {
        let rules = default_rules(Utc::now());
        assert_eq!(rules.len(), 10);
        assert!(rules.iter().all(|rule| rule.validate().is_empty()));
        assert_eq!(default_name(RuleKey::SetWinningScore), "Điểm thắng set");
        assert_eq!(default_value(RuleKey::MaxParticipants), 32.0);
    }
}
