use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::collection::Entity;
use super::ids::PlayerId;
use super::participant::Participant;
use super::stats::{CompetitionRecord, MatchOutcome, MatchResult, Opponent};
use crate::config::PointsSettings;
use crate::ranking::{Rank, player_win_points};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub email: String,
    pub address: String,
    #[serde(default)]
    pub rank: Rank,
    #[serde(flatten)]
    pub record: CompetitionRecord,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Player {
    pub fn new(name: &str, email: &str, address: &str, rank: Rank, now: DateTime<Utc>) -> Self {
        Self {
            id: PlayerId::generate(),
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            address: address.trim().to_string(),
            rank,
            record: CompetitionRecord::default(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn participant(&self) -> Participant {
        Participant::Player(self.id.clone())
    }

    /// Field problems, empty when the player is valid
    pub fn validate(&self, email_pattern: &Regex) -> Vec<String> {
        let mut violations = Vec::new();
        if self.name.trim().chars().count() < 2 {
            violations.push("name must have at least 2 characters".to_string());
        }
        if !email_pattern.is_match(self.email.trim()) {
            violations.push("email is invalid".to_string());
        }
        if self.address.trim().chars().count() < 5 {
            violations.push("address must have at least 5 characters".to_string());
        }
        violations
    }

    /// Update counters and history; points are only awarded on a win.
    pub fn add_match_result(
        &mut self,
        outcome: MatchOutcome,
        opponent: &Opponent,
        settings: &PointsSettings,
    ) -> MatchResult {
        let points_earned = if outcome.is_win {
            player_win_points(outcome.match_type, opponent.rank, settings)
        } else {
            0
        };
        self.updated_at = outcome.date;
        self.record
            .record(MatchResult {
                match_id: outcome.match_id,
                opponent: opponent.participant.clone(),
                opponent_name: opponent.name.clone(),
                is_win: outcome.is_win,
                match_type: outcome.match_type,
                score: outcome.score,
                date: outcome.date,
                points_earned,
            })
            .clone()
    }

    /// Re-derive the tier from points; true when it changed
    pub fn update_rank(&mut self, settings: &PointsSettings) -> bool {
        let derived = Rank::from_points(self.record.points, settings);
        if derived == self.rank {
            return false;
        }
        self.rank = derived;
        true
    }

    pub fn as_opponent(&self) -> Opponent {
        Opponent {
            participant: self.participant(),
            name: self.name.clone(),
            rank: Some(self.rank),
            points: self.record.points,
        }
    }

    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        [self.name.as_str(), self.email.as_str(), self.address.as_str(), self.rank.as_str()]
            .iter()
            .any(|field| field.to_lowercase().contains(&term))
    }
}

impl Entity for Player {
    type Id = PlayerId;
    const KIND: &'static str = "player";

    fn id(&self) -> &PlayerId {
        &self.id
    }
}
