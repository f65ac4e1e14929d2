use chrono::{DateTime, Utc};
use log::info;

use crate::domain::RuleId;
use crate::errors::ClubResult;
use crate::events::{EventBus, EventKind};
use crate::rules::{NewRule, Rule, RuleSet, RuleUpdate};

/// Rule book commands with change notifications
pub struct RuleService {
    rules: RuleSet,
}

impl RuleService {
    pub fn new(rules: RuleSet) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    pub fn create(&mut self, input: NewRule, now: DateTime<Utc>, bus: &mut EventBus) -> ClubResult<Rule> {
        let rule = self.rules.create(input, now)?;
        info!("Created rule {}", rule.name);
        bus.publish(EventKind::RuleCreated, &rule);
        Ok(rule)
    }

    pub fn update(
        &mut self,
        id: &RuleId,
        changes: RuleUpdate,
        now: DateTime<Utc>,
        bus: &mut EventBus,
    ) -> ClubResult<Rule> {
        let rule = self.rules.update(id, changes, now)?;
        bus.publish(EventKind::RuleUpdated, &rule);
        Ok(rule)
    }

    pub fn delete(&mut self, id: &RuleId, bus: &mut EventBus) -> ClubResult<Rule> {
        let rule = self.rules.delete(id)?;
        info!("Deleted rule {}", rule.name);
        bus.publish(EventKind::RuleDeleted, &rule);
        Ok(rule)
    }

    pub fn activate(&mut self, id: &RuleId, now: DateTime<Utc>, bus: &mut EventBus) -> ClubResult<Rule> {
        let rule = self.rules.activate(id, now)?;
        bus.publish(EventKind::RuleActivated, &rule);
        Ok(rule)
    }

    pub fn deactivate(&mut self, id: &RuleId, now: DateTime<Utc>, bus: &mut EventBus) -> ClubResult<Rule> {
        let rule = self.rules.deactivate(id, now)?;
        bus.publish(EventKind::RuleDeactivated, &rule);
        Ok(rule)
    }

    pub fn reset(&mut self, now: DateTime<Utc>, bus: &mut EventBus) {
        self.rules.reset(now);
        info!("Rules reset to {} defaults", self.rules.len());
        bus.publish(EventKind::RulesReset, self.rules.rules().as_slice());
    }

    /// Replace the whole rule book; nothing changes when any rule is rejected.
    pub fn import(&mut self, rules: Vec<Rule>, bus: &mut EventBus) -> ClubResult<usize> {
        let count = rules.len();
        self.rules.replace_all(rules)?;
        info!("Imported {} rules", count);
        bus.publish(EventKind::DataImported, &serde_json::json!({ "rules": count }));
        Ok(count)
    }

    pub fn export(&self) -> Vec<Rule> {
        self.rules.rules().as_slice().to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ClubError;
    use crate::rules::{RuleCategory, RuleValue};

    #[test]
    fn test_failed_commands_publish_nothing() {
        let mut bus = EventBus::new();
        let mut service = RuleService::new(RuleSet::with_defaults(Utc::now()));
        let core = service.rules().by_name("Điểm thắng set").unwrap().id.clone();

        let err = service.deactivate(&core, Utc::now(), &mut bus).unwrap_err();
        assert!(matches!(err, ClubError::ProtectedResource(_)));
        assert!(service.rules().by_id(&core).unwrap().is_active);
        assert_eq!(bus.published_count(), 0);

        let custom = service
            .create(
                NewRule {
                    name: "Khăn lau".into(),
                    description: "Towel breaks every 6 points".into(),
                    value: RuleValue::Number(6.0),
                    category: RuleCategory::Custom,
                    priority: Some(4),
                },
                Utc::now(),
                &mut bus,
            )
            .unwrap();
        service.deactivate(&custom.id, Utc::now(), &mut bus).unwrap();
        service.delete(&custom.id, &mut bus).unwrap();
        assert_eq!(bus.published_count(), 3);
    }

    #[test]
    fn test_import_keeps_rules_on_rejection() {
        let mut bus = EventBus::new();
        let mut service = RuleService::new(RuleSet::with_defaults(Utc::now()));
        let mut exported = service.export();
        exported[1].name = exported[0].name.clone();

        assert!(service.import(exported, &mut bus).is_err());
        assert_eq!(service.rules().len(), 10);

        let exported = service.export();
        let count = service.import(exported, &mut bus).unwrap();
        assert_eq!(count, 10);
    }
}
