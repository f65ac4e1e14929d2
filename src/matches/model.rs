use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Entity, MatchId, MatchType, Participant, Side, TournamentId};
use crate::rules::ScoringRules;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchStatus {
    #[default]
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
    Postponed,
}

impl MatchStatus {
    pub fn as_str(&self) -> &str {
        match self {
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::InProgress => "in-progress",
            MatchStatus::Completed => "completed",
            MatchStatus::Cancelled => "cancelled",
            MatchStatus::Postponed => "postponed",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, MatchStatus::Completed | MatchStatus::Cancelled)
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetScore {
    pub set_number: u32,
    pub score1: u32,
    pub score2: u32,
    pub completed: bool,
    pub winner: Option<Side>,
}

impl SetScore {
    pub fn open(set_number: u32) -> Self {
        Self {
            set_number,
            score1: 0,
            score2: 0,
            completed: false,
            winner: None,
        }
    }

    pub fn score_for(&self, side: Side) -> (u32, u32) {
        match side {
            Side::One => (self.score1, self.score2),
            Side::Two => (self.score2, self.score1),
        }
    }
}

/// Per-set scores plus running totals for both sides
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MatchScore {
    pub sets: Vec<SetScore>,
    pub sets_won1: u32,
    pub sets_won2: u32,
    pub points1: u32,
    pub points2: u32,
}

impl MatchScore {
    pub fn sets_won(&self, side: Side) -> u32 {
        match side {
            Side::One => self.sets_won1,
            Side::Two => self.sets_won2,
        }
    }

    pub fn points(&self, side: Side) -> u32 {
        match side {
            Side::One => self.points1,
            Side::Two => self.points2,
        }
    }

    pub fn open_set(&self) -> Option<&SetScore> {
        self.sets.iter().find(|set| !set.completed)
    }

    pub fn open_set_mut(&mut self) -> Option<&mut SetScore> {
        self.sets.iter_mut().find(|set| !set.completed)
    }

    pub fn refresh_points(&mut self) {
        self.points1 = self.sets.iter().map(|set| set.score1).sum();
        self.points2 = self.sets.iter().map(|set| set.score2).sum();
    }

    /// `3-1 (11-9, 8-11, 11-5, 11-7)` as seen from `side`
    pub fn summary_for(&self, side: Side) -> String {
        let (own, other) = match side {
            Side::One => (self.sets_won1, self.sets_won2),
            Side::Two => (self.sets_won2, self.sets_won1),
        };
        let sets: Vec<String> = self
            .sets
            .iter()
            .filter(|set| set.completed || set.score1 + set.score2 > 0)
            .map(|set| {
                let (a, b) = set.score_for(side);
                format!("{}-{}", a, b)
            })
            .collect();
        if sets.is_empty() {
            format!("{}-{}", own, other)
        } else {
            format!("{}-{} ({})", own, other, sets.join(", "))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: MatchId,
    pub match_type: MatchType,
    pub participant1: Participant,
    pub participant2: Participant,
    pub tournament_id: Option<TournamentId>,
    pub round: u32,
    pub match_number: Option<u32>,
    pub status: MatchStatus,
    pub winner: Option<Participant>,
    #[serde(default)]
    pub score: MatchScore,
    pub scoring: ScoringRules,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub venue: String,
    #[serde(default)]
    pub referee: String,
    pub court: Option<u32>,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Match {
    pub fn new(
        participant1: Participant,
        participant2: Participant,
        scoring: ScoringRules,
        now: DateTime<Utc>,
    ) -> Self {
        Self::with_id(MatchId::generate(), participant1, participant2, scoring, now)
    }

    pub fn with_id(
        id: MatchId,
        participant1: Participant,
        participant2: Participant,
        scoring: ScoringRules,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            match_type: participant1.match_type(),
            participant1,
            participant2,
            tournament_id: None,
            round: 1,
            match_number: None,
            status: MatchStatus::Scheduled,
            winner: None,
            score: MatchScore::default(),
            scoring,
            scheduled_date: None,
            start_time: None,
            end_time: None,
            venue: String::new(),
            referee: String::new(),
            court: None,
            notes: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn in_tournament(mut self, tournament_id: TournamentId, round: u32, match_number: u32) -> Self {
        self.tournament_id = Some(tournament_id);
        self.round = round;
        self.match_number = Some(match_number);
        self
    }

    pub fn participant(&self, side: Side) -> &Participant {
        match side {
            Side::One => &self.participant1,
            Side::Two => &self.participant2,
        }
    }

    pub fn side_of(&self, participant: &Participant) -> Option<Side> {
        if &self.participant1 == participant {
            Some(Side::One)
        } else if &self.participant2 == participant {
            Some(Side::Two)
        } else {
            None
        }
    }

    pub fn involves(&self, participant: &Participant) -> bool {
        self.side_of(participant).is_some()
    }

    pub fn winner_side(&self) -> Option<Side> {
        self.winner.as_ref().and_then(|winner| self.side_of(winner))
    }

    pub fn loser(&self) -> Option<&Participant> {
        self.winner_side().map(|side| self.participant(side.other()))
    }

    pub fn duration_minutes(&self, now: DateTime<Utc>) -> i64 {
        match self.start_time {
            Some(start) => (self.end_time.unwrap_or(now) - start).num_minutes(),
            None => 0,
        }
    }

    /// Structural problems, empty when the match is valid
    pub fn validate(&self, now: DateTime<Utc>) -> Vec<String> {
        let mut violations = self.validate_pairing();
        if self.status == MatchStatus::Scheduled {
            if let Some(date) = self.scheduled_date {
                if date < now {
                    violations.push("cannot schedule a match in the past".to_string());
                }
            }
        }
        violations
    }

    /// Checks that hold regardless of when the match is played.
    pub fn validate_pairing(&self) -> Vec<String> {
        let mut violations = Vec::new();
        if self.participant1 == self.participant2 {
            violations.push("participants must differ".to_string());
        }
        for participant in [&self.participant1, &self.participant2] {
            if participant.match_type() != self.match_type {
                violations.push(format!(
                    "{} cannot play a {} match",
                    participant, self.match_type
                ));
            }
        }
        violations.extend(self.scoring.validate());
        violations
    }

    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        [
            self.venue.as_str(),
            self.referee.as_str(),
            self.notes.as_str(),
            self.match_type.as_str(),
            self.status.as_str(),
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&term))
    }
}

impl Entity for Match {
    type Id = MatchId;
    const KIND: &'static str = "match";

    fn id(&self) -> &MatchId {
        &self.id
    }
}
