use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::collection::Entity;
use super::ids::{PlayerId, TeamId};
use super::participant::{MatchType, Participant};
use super::stats::{CompetitionRecord, MatchOutcome, MatchResult, Opponent};
use crate::config::PointsSettings;
use crate::errors::{ClubError, ClubResult};
use crate::ranking::relative_strength_points;

pub const MIN_TEAM_SIZE: usize = 3;
pub const MAX_TEAM_SIZE: usize = 4;

/// A roster of 3-4 players; the first player is the captain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub player_ids: Vec<PlayerId>,
    #[serde(default)]
    pub description: String,
    #[serde(flatten)]
    pub record: CompetitionRecord,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn active_by_default() -> bool {
    true
}

impl Team {
    pub fn new(name: &str, player_ids: Vec<PlayerId>, now: DateTime<Utc>) -> Self {
        Self {
            id: TeamId::generate(),
            name: name.trim().to_string(),
            player_ids,
            description: String::new(),
            record: CompetitionRecord::default(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn participant(&self) -> Participant {
        Participant::Team(self.id.clone())
    }

    pub fn captain(&self) -> Option<&PlayerId> {
        self.player_ids.first()
    }

    pub fn has_player(&self, player_id: &PlayerId) -> bool {
        self.player_ids.contains(player_id)
    }

    pub fn has_minimum_players(&self) -> bool {
        self.player_ids.len() >= MIN_TEAM_SIZE
    }

    pub fn is_full(&self) -> bool {
        self.player_ids.len() >= MAX_TEAM_SIZE
    }

    pub fn add_player(&mut self, player_id: PlayerId, now: DateTime<Utc>) -> ClubResult<()> {
        if self.is_full() {
            return Err(ClubError::validation(format!(
                "team {} already has {} players",
                self.name, MAX_TEAM_SIZE
            )));
        }
        if self.has_player(&player_id) {
            return Err(ClubError::validation(format!("player {} is already in team {}", player_id, self.name)));
        }
        self.player_ids.push(player_id);
        self.updated_at = now;
        Ok(())
    }

    /// Remove a member; the next player takes over as captain. Returns false when absent.
    pub fn remove_player(&mut self, player_id: &PlayerId, now: DateTime<Utc>) -> bool {
        let Some(position) = self.player_ids.iter().position(|id| id == player_id) else {
            return false;
        };
        self.player_ids.remove(position);
        self.updated_at = now;
        true
    }

    pub fn set_captain(&mut self, player_id: &PlayerId, now: DateTime<Utc>) -> ClubResult<()> {
        let Some(position) = self.player_ids.iter().position(|id| id == player_id) else {
            return Err(ClubError::validation(format!("player {} is not in team {}", player_id, self.name)));
        };
        let captain = self.player_ids.remove(position);
        self.player_ids.insert(0, captain);
        self.updated_at = now;
        Ok(())
    }

    pub fn points_against(&self, opponent: &Opponent, settings: &PointsSettings) -> u32 {
        relative_strength_points(settings.team_entity_base, self.record.points, opponent.points, settings)
    }

    pub fn add_match_result(
        &mut self,
        outcome: MatchOutcome,
        opponent: &Opponent,
        settings: &PointsSettings,
    ) -> MatchResult {
        let points_earned = if outcome.is_win {
            self.points_against(opponent, settings)
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
                match_type: MatchType::Teams,
                score: outcome.score,
                date: outcome.date,
                points_earned,
            })
            .clone()
    }

    pub fn as_opponent(&self) -> Opponent {
        Opponent {
            participant: self.participant(),
            name: self.name.clone(),
            rank: None,
            points: self.record.points,
        }
    }
}

impl Entity for Team {
    type Id = TeamId;
    const KIND: &'static str = "team";

    fn id(&self) -> &TeamId {
        &self.id
    }
}
