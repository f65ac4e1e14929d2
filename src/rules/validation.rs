use chrono::{DateTime, Utc};
use serde::Serialize;

use super::defaults::default_name;
use super::rule::RuleKey;
use super::ruleset::RuleSet;
use crate::matches::{Match, MatchStatus};
use crate::tournament::Tournament;

/// What to check the active rules against
#[derive(Debug, Clone, Copy)]
pub enum ValidationContext<'a> {
    Tournament {
        tournament: &'a Tournament,
        now: DateTime<Utc>,
    },
    Match(&'a Match),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub valid: bool,
    pub violations: Vec<String>,
}

impl ValidationReport {
    fn from_violations(violations: Vec<String>) -> Self {
        Self {
            valid: violations.is_empty(),
            violations,
        }
    }
}

impl RuleSet {
    pub fn validate(&self, context: ValidationContext<'_>) -> ValidationReport {
        let violations = match context {
            ValidationContext::Tournament { tournament, now } => self.tournament_violations(tournament, now),
            ValidationContext::Match(m) => self.match_violations(m),
        };
        ValidationReport::from_violations(violations)
    }

    fn tournament_violations(&self, tournament: &Tournament, now: DateTime<Utc>) -> Vec<String> {
        let mut violations = Vec::new();
        if let Some(limit) = self.get_value(RuleKey::MaxParticipants) {
            if tournament.participants.len() as f64 > limit {
                violations.push(self.unsatisfied(RuleKey::MaxParticipants));
            }
        }
        if let (Some(lead_hours), Some(start)) = (self.get_value(RuleKey::RegistrationLeadHours), tournament.start_date) {
            let hours_until_start = (start - now).num_minutes() as f64 / 60.0;
            if hours_until_start < lead_hours {
                violations.push(self.unsatisfied(RuleKey::RegistrationLeadHours));
            }
        }
        violations
    }

    fn match_violations(&self, m: &Match) -> Vec<String> {
        let scoring = self.scoring();
        let mut violations = Vec::new();

        for set in m.score.sets.iter().filter(|set| set.completed) {
            let Some(winner) = set.winner else {
                continue;
            };
            if scoring.is_set_won(set.score1, set.score2) != Some(winner) {
                violations.push(format!(
                    "set {} ({}-{}) does not satisfy rule \"{}\"",
                    set.set_number,
                    set.score1,
                    set.score2,
                    self.rule_name(RuleKey::SetWinningScore)
                ));
            }
        }

        if m.status == MatchStatus::Completed {
            if let Some(side) = m.winner_side() {
                let sets = m
                    .score
                    .sets
                    .iter()
                    .filter(|set| set.winner == Some(side))
                    .count() as u32;
                if sets < scoring.sets_to_win() {
                    violations.push(self.unsatisfied(RuleKey::SetsToWin));
                }
            }
        }
        violations
    }

    fn unsatisfied(&self, key: RuleKey) -> String {
        format!("rule \"{}\" is not satisfied", self.rule_name(key))
    }

    fn rule_name(&self, key: RuleKey) -> String {
        self.rules()
            .iter()
            .find(|rule| rule.key == Some(key))
            .map(|rule| rule.name.clone())
            .unwrap_or_else(|| default_name(key).to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Participant, PlayerId, Side};
    use crate::matches::SetScore;
    use crate::tournament::{TournamentFormat, TournamentType};
    use chrono::Duration;

    fn player(id: &str) -> Participant {
        Participant::Player(PlayerId::from(id))
    }

    #[test]
    fn test_tournament_starting_too_soon_breaks_lead_time() {
        let rules = RuleSet::with_defaults(Utc::now());
        let mut t = Tournament::new("Cup", TournamentType::Singles, TournamentFormat::RoundRobin, 32, Utc::now());
        t.start_date = Some(Utc::now() + Duration::hours(2));
        let report = rules.validate(ValidationContext::Tournament {
            tournament: &t,
            now: Utc::now(),
        });
        assert!(!report.valid);
        assert!(report.violations[0].contains("Bắt buộc đăng ký trước"));

        t.start_date = Some(Utc::now() + Duration::days(3));
        assert!(rules.validate(ValidationContext::Tournament { tournament: &t, now: Utc::now() }).valid);
    }

    #[test]
    fn test_match_with_bad_set_is_reported() {
        let rules = RuleSet::with_defaults(Utc::now());
        let mut m = Match::new(player("a"), player("b"), rules.scoring(), Utc::now());
        m.start(Utc::now()).unwrap();
        for _ in 0..3 {
            m.update_score(11, 4, Utc::now()).unwrap();
        }
        assert!(rules.validate(ValidationContext::Match(&m)).valid);

        m.score.sets[0] = SetScore {
            set_number: 1,
            score1: 11,
            score2: 10,
            completed: true,
            winner: Some(Side::One),
        };
        let report = rules.validate(ValidationContext::Match(&m));
        assert_eq!(report.violations.len(), 1);
    }

    #[test]
    fn test_early_explicit_end_breaks_sets_to_win() {
        let rules = RuleSet::with_defaults(Utc::now());
        let mut m = Match::new(player("a"), player("b"), rules.scoring(), Utc::now());
        m.start(Utc::now()).unwrap();
        m.update_score(11, 4, Utc::now()).unwrap();
        m.end(None, Utc::now()).unwrap();
        assert_eq!(m.winner, Some(player("a")));
        let report = rules.validate(ValidationContext::Match(&m));
        assert!(report.violations[0].contains("Số set thắng trận"));
    }
}
