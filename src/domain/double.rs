use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::collection::Entity;
use super::ids::{DoubleId, PlayerId};
use super::participant::{MatchType, Participant};
use super::stats::{CompetitionRecord, MatchOutcome, MatchResult, Opponent};
use crate::config::PointsSettings;
use crate::ranking::relative_strength_points;

/// A fixed pair of players competing in doubles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Double {
    pub id: DoubleId,
    pub player1_id: PlayerId,
    pub player2_id: PlayerId,
    pub name: String,
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

impl Double {
    pub fn new(player1_id: PlayerId, player2_id: PlayerId, name: String, now: DateTime<Utc>) -> Self {
        Self {
            id: DoubleId::generate(),
            player1_id,
            player2_id,
            name,
            record: CompetitionRecord::default(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn default_name(player1_name: &str, player2_name: &str) -> String {
        format!("{} & {}", player1_name, player2_name)
    }

    pub fn participant(&self) -> Participant {
        Participant::Double(self.id.clone())
    }

    pub fn has_player(&self, player_id: &PlayerId) -> bool {
        &self.player1_id == player_id || &self.player2_id == player_id
    }

    pub fn partner_of(&self, player_id: &PlayerId) -> Option<&PlayerId> {
        if &self.player1_id == player_id {
            Some(&self.player2_id)
        } else if &self.player2_id == player_id {
            Some(&self.player1_id)
        } else {
            None
        }
    }

    /// Same two players, in either order
    pub fn is_same_pair(&self, a: &PlayerId, b: &PlayerId) -> bool {
        (&self.player1_id == a && &self.player2_id == b) || (&self.player1_id == b && &self.player2_id == a)
    }

    /// Relative-strength points against another double, flat base points otherwise.
    pub fn points_against(&self, opponent: &Opponent, settings: &PointsSettings) -> u32 {
        match opponent.participant {
            Participant::Double(_) => relative_strength_points(
                settings.double_entity_base,
                self.record.points,
                opponent.points,
                settings,
            ),
            _ => settings.double_entity_base.round() as u32,
        }
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
                match_type: MatchType::Doubles,
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

impl Entity for Double {
    type Id = DoubleId;
    const KIND: &'static str = "double";

    fn id(&self) -> &DoubleId {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> Double {
        Double::new(
            PlayerId::from("player_a"),
            PlayerId::from("player_b"),
            Double::default_name("Anna", "Bo"),
            Utc::now(),
        )
    }

    #[test]
    fn test_partner_lookup() {
        let d = pair();
        assert_eq!(d.name, "Anna & Bo");
        assert_eq!(d.partner_of(&PlayerId::from("player_a")), Some(&PlayerId::from("player_b")));
        assert_eq!(d.partner_of(&PlayerId::from("player_c")), None);
        assert!(d.is_same_pair(&PlayerId::from("player_b"), &PlayerId::from("player_a")));
    }

    #[test]
    fn test_points_against_other_double_use_relative_strength() {
        let settings = PointsSettings::default();
        let mut d = pair();
        d.record.points = 30;
        let mut other = pair().as_opponent();
        other.points = 60;
        assert_eq!(d.points_against(&other, &settings), 30);

        let solo = Opponent {
            participant: Participant::Player(PlayerId::from("player_z")),
            name: "Z".into(),
            rank: None,
            points: 999,
        };
        assert_eq!(d.points_against(&solo, &settings), 15);
    }
}
