use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use log::debug;

use super::defaults::{default_rules, default_value};
use super::rule::{Rule, RuleCategory, RuleKey, RuleValue};
use super::scoring::ScoringRules;
use crate::domain::{Collection, RuleId, Side};
use crate::errors::{ClubError, ClubResult};

const DEFAULT_PRIORITY: u32 = 1;

#[derive(Debug, Clone)]
pub struct NewRule {
    pub name: String,
    pub description: String,
    pub value: RuleValue,
    pub category: RuleCategory,
    pub priority: Option<u32>,
}

#[derive(Debug, Clone, Default)]
pub struct RuleUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub value: Option<RuleValue>,
    pub category: Option<RuleCategory>,
    pub priority: Option<u32>,
}

/// The club's configurable rule book and the thresholds derived from it
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Collection<Rule>,
}

impl RuleSet {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self {
            rules: Collection::from_vec(rules),
        }
    }

    pub fn with_defaults(now: DateTime<Utc>) -> Self {
        Self::new(default_rules(now))
    }

    pub fn rules(&self) -> &Collection<Rule> {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    // --- Derived values ---

    /// Value of an active numeric rule
    pub fn get_value(&self, key: RuleKey) -> Option<f64> {
        active_value(self.rules.iter(), key)
    }

    pub fn get_value_by_name(&self, name: &str) -> Option<f64> {
        self.by_name(name)
            .filter(|rule| rule.is_active)
            .and_then(|rule| rule.value.as_number())
    }

    pub fn scoring(&self) -> ScoringRules {
        scoring_from(self.rules.iter())
    }

    pub fn is_set_won(&self, score1: u32, score2: u32) -> Option<Side> {
        self.scoring().is_set_won(score1, score2)
    }

    pub fn is_match_won(&self, sets_won1: u32, sets_won2: u32) -> Option<Side> {
        self.scoring().is_match_won(sets_won1, sets_won2)
    }

    pub fn max_participants(&self) -> usize {
        self.value_or_default(RuleKey::MaxParticipants).round() as usize
    }

    pub fn registration_lead_hours(&self) -> f64 {
        self.value_or_default(RuleKey::RegistrationLeadHours)
    }

    fn value_or_default(&self, key: RuleKey) -> f64 {
        self.get_value(key).unwrap_or_else(|| default_value(key))
    }

    // --- Queries ---

    pub fn by_id(&self, id: &RuleId) -> ClubResult<&Rule> {
        self.rules.require(id)
    }

    pub fn by_name(&self, name: &str) -> Option<&Rule> {
        let lowered = name.trim().to_lowercase();
        self.rules.iter().find(|rule| rule.name.to_lowercase() == lowered)
    }

    pub fn by_category(&self, category: RuleCategory) -> Vec<&Rule> {
        self.rules.iter().filter(|rule| rule.category == category).collect()
    }

    pub fn active_by_priority(&self) -> Vec<&Rule> {
        let mut active: Vec<&Rule> = self.rules.iter().filter(|rule| rule.is_active).collect();
        active.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.name.cmp(&b.name)));
        active
    }

    pub fn search(&self, term: &str) -> Vec<&Rule> {
        if term.trim().is_empty() {
            return self.rules.iter().collect();
        }
        self.rules.iter().filter(|rule| rule.matches_search(term.trim())).collect()
    }

    pub fn categories(&self) -> Vec<RuleCategory> {
        let categories: BTreeSet<RuleCategory> = self.rules.iter().map(|rule| rule.category).collect();
        categories.into_iter().collect()
    }

    // --- Commands ---

    pub fn create(&mut self, input: NewRule, now: DateTime<Utc>) -> ClubResult<Rule> {
        let rule = Rule::new(
            &input.name,
            &input.description,
            input.value,
            input.category,
            input.priority.unwrap_or(DEFAULT_PRIORITY),
            now,
        );
        let mut violations = rule.validate();
        violations.extend(self.name_conflict(&rule.name, None));
        ClubError::from_violations(violations)?;

        debug!("Created rule {} ({})", rule.name, rule.id);
        self.rules.add(rule.clone());
        Ok(rule)
    }

    pub fn update(&mut self, id: &RuleId, changes: RuleUpdate, now: DateTime<Utc>) -> ClubResult<Rule> {
        let current = self.rules.require(id)?;
        let mut candidate = current.clone();

        if let Some(category) = changes.category {
            if current.is_protected() && category != current.category {
                return Err(ClubError::ProtectedResource(format!(
                    "cannot move core rule {} out of {}",
                    current.name, current.category
                )));
            }
            candidate.category = category;
        }
        if let Some(name) = changes.name {
            candidate.name = name.trim().to_string();
        }
        if let Some(description) = changes.description {
            candidate.description = description.trim().to_string();
        }
        if let Some(value) = changes.value {
            candidate.value = value;
        }
        if let Some(priority) = changes.priority {
            candidate.priority = priority;
        }
        candidate.updated_at = now;

        let mut violations = candidate.validate();
        violations.extend(self.name_conflict(&candidate.name, Some(id)));
        if candidate.key.is_some() {
            let others = self.rules.iter().filter(|rule| &rule.id != id);
            violations.extend(scoring_from(others.chain(std::iter::once(&candidate))).validate());
        }
        ClubError::from_violations(violations)?;

        self.rules.add(candidate.clone());
        Ok(candidate)
    }

    pub fn delete(&mut self, id: &RuleId) -> ClubResult<Rule> {
        let rule = self.rules.require(id)?;
        if rule.is_protected() {
            return Err(ClubError::ProtectedResource(format!("cannot delete core rule {}", rule.name)));
        }
        self.rules.remove(id).ok_or_else(|| ClubError::not_found("rule", id))
    }

    pub fn activate(&mut self, id: &RuleId, now: DateTime<Utc>) -> ClubResult<Rule> {
        let rule = self.rules.require_mut(id)?;
        rule.is_active = true;
        rule.updated_at = now;
        Ok(rule.clone())
    }

    pub fn deactivate(&mut self, id: &RuleId, now: DateTime<Utc>) -> ClubResult<Rule> {
        let rule = self.rules.require_mut(id)?;
        if rule.is_protected() {
            return Err(ClubError::ProtectedResource(format!("cannot deactivate core rule {}", rule.name)));
        }
        rule.is_active = false;
        rule.updated_at = now;
        Ok(rule.clone())
    }

    pub fn reset(&mut self, now: DateTime<Utc>) {
        self.rules = Collection::from_vec(default_rules(now));
    }

    /// Swap the whole rule book after checking every incoming rule.
    pub fn replace_all(&mut self, rules: Vec<Rule>) -> ClubResult<()> {
        let mut violations = Vec::new();
        let mut seen = BTreeSet::new();
        for rule in &rules {
            violations.extend(rule.validate());
            if !seen.insert(rule.name.to_lowercase()) {
                violations.push(format!("duplicate rule name: {}", rule.name));
            }
        }
        violations.extend(scoring_from(rules.iter()).validate());
        ClubError::from_violations(violations)?;

        self.rules = Collection::from_vec(rules);
        Ok(())
    }

    fn name_conflict(&self, name: &str, except: Option<&RuleId>) -> Option<String> {
        let lowered = name.to_lowercase();
        self.rules
            .iter()
            .filter(|rule| Some(&rule.id) != except)
            .any(|rule| rule.name.to_lowercase() == lowered)
            .then(|| format!("rule name already exists: {}", name))
    }
}

fn active_value<'a>(mut rules: impl Iterator<Item = &'a Rule>, key: RuleKey) -> Option<f64> {
    rules
        .find(|rule| rule.key == Some(key) && rule.is_active)
        .and_then(|rule| rule.value.as_number())
}

fn scoring_from<'a>(rules: impl Iterator<Item = &'a Rule> + Clone) -> ScoringRules {
    let value = |key: RuleKey| {
        active_value(rules.clone(), key)
            .unwrap_or_else(|| default_value(key))
            .round()
            .max(0.0) as u32
    };
    let sets_to_win = value(RuleKey::SetsToWin).max(1);
    ScoringRules {
        best_of: sets_to_win * 2 - 1,
        winning_score: value(RuleKey::SetWinningScore),
        min_win_margin: value(RuleKey::MinWinMargin),
        max_score: value(RuleKey::MaxSetScore),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> RuleSet {
        RuleSet::with_defaults(Utc::now())
    }

    fn custom(name: &str) -> NewRule {
        NewRule {
            name: name.into(),
            description: "house rule".into(),
            value: RuleValue::Number(3.0),
            category: RuleCategory::Custom,
            priority: None,
        }
    }

    #[test]
    fn test_default_scoring_is_best_of_five_to_eleven() {
        let scoring = rules().scoring();
        assert_eq!(scoring, ScoringRules::default());
        assert_eq!(rules().max_participants(), 32);
    }

    #[test]
    fn test_deactivating_core_rule_is_rejected() {
        let mut rules = rules();
        let id = rules.by_name("Điểm thắng set").unwrap().id.clone();
        let err = rules.deactivate(&id, Utc::now()).unwrap_err();
        assert!(matches!(err, ClubError::ProtectedResource(_)));
        assert!(rules.by_id(&id).unwrap().is_active);
        assert!(matches!(rules.delete(&id), Err(ClubError::ProtectedResource(_))));
    }

    #[test]
    fn test_inactive_rules_have_no_value() {
        let mut rules = rules();
        let id = rules.by_name("Tối đa người tham gia").unwrap().id.clone();
        rules.deactivate(&id, Utc::now()).unwrap();
        assert_eq!(rules.get_value(RuleKey::MaxParticipants), None);
        assert_eq!(rules.max_participants(), 32);
        rules.activate(&id, Utc::now()).unwrap();
        assert_eq!(rules.get_value(RuleKey::MaxParticipants), Some(32.0));
    }

    #[test]
    fn test_create_rejects_duplicate_and_empty_names() {
        let mut rules = rules();
        rules.create(custom("Let serve"), Utc::now()).unwrap();
        assert!(matches!(rules.create(custom("LET SERVE"), Utc::now()), Err(ClubError::Validation(_))));
        assert!(matches!(rules.create(custom("  "), Utc::now()), Err(ClubError::Validation(_))));
        assert_eq!(rules.len(), 11);
    }

    #[test]
    fn test_update_keeps_scoring_consistent() {
        let mut rules = rules();
        let id = rules.by_name("Điểm tối đa một set").unwrap().id.clone();
        let lowered = RuleUpdate {
            value: Some(RuleValue::Number(9.0)),
            ..RuleUpdate::default()
        };
        assert!(rules.update(&id, lowered, Utc::now()).is_err());
        assert_eq!(rules.scoring().max_score, 21);

        let sets = rules.by_name("Số set thắng trận").unwrap().id.clone();
        let two = RuleUpdate {
            value: Some(RuleValue::Number(2.0)),
            ..RuleUpdate::default()
        };
        rules.update(&sets, two, Utc::now()).unwrap();
        assert_eq!(rules.scoring().best_of, 3);
    }

    #[test]
    fn test_protected_rule_cannot_change_category() {
        let mut rules = rules();
        let id = rules.by_name("Chênh lệch điểm tối thiểu").unwrap().id.clone();
        let change = RuleUpdate {
            category: Some(RuleCategory::Custom),
            ..RuleUpdate::default()
        };
        assert!(matches!(rules.update(&id, change, Utc::now()), Err(ClubError::ProtectedResource(_))));
    }

    #[test]
    fn test_active_rules_sorted_by_priority() {
        let rules = rules();
        let priorities: Vec<u32> = rules.active_by_priority().iter().map(|r| r.priority).collect();
        let mut sorted = priorities.clone();
        sorted.sort();
        assert_eq!(priorities, sorted);
        assert_eq!(rules.categories().len(), 6);
    }
}
