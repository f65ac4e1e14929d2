use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::bracket::Bracket;
use super::standings::StandingEntry;
use crate::domain::{Entity, MatchId, MatchType, Participant, TournamentId};
use crate::errors::ClubError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TournamentType {
    Singles,
    Doubles,
    Teams,
    Mixed,
}

impl TournamentType {
    pub fn accepts(self, participant: &Participant) -> bool {
        match self {
            TournamentType::Singles => participant.match_type() == MatchType::Singles,
            TournamentType::Doubles => participant.match_type() == MatchType::Doubles,
            TournamentType::Teams => participant.match_type() == MatchType::Teams,
            TournamentType::Mixed => true,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            TournamentType::Singles => "singles",
            TournamentType::Doubles => "doubles",
            TournamentType::Teams => "teams",
            TournamentType::Mixed => "mixed",
        }
    }
}

impl FromStr for TournamentType {
    type Err = ClubError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        [
            TournamentType::Singles,
            TournamentType::Doubles,
            TournamentType::Teams,
            TournamentType::Mixed,
        ]
        .into_iter()
        .find(|kind| kind.as_str().eq_ignore_ascii_case(value.trim()))
        .ok_or_else(|| ClubError::validation(format!("unknown tournament type: {}", value)))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TournamentFormat {
    #[default]
    RoundRobin,
    #[serde(alias = "elimination")]
    SingleElimination,
    /// Paired as a round robin
    Swiss,
}

impl TournamentFormat {
    pub fn as_str(&self) -> &str {
        match self {
            TournamentFormat::RoundRobin => "round-robin",
            TournamentFormat::SingleElimination => "single-elimination",
            TournamentFormat::Swiss => "swiss",
        }
    }
}

impl FromStr for TournamentFormat {
    type Err = ClubError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "round-robin" => Ok(TournamentFormat::RoundRobin),
            "single-elimination" | "elimination" => Ok(TournamentFormat::SingleElimination),
            "swiss" => Ok(TournamentFormat::Swiss),
            other => Err(ClubError::validation(format!("unknown tournament format: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TournamentStatus {
    #[default]
    Planning,
    Registration,
    InProgress,
    Completed,
    Cancelled,
}

impl TournamentStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TournamentStatus::Planning => "planning",
            TournamentStatus::Registration => "registration",
            TournamentStatus::InProgress => "in-progress",
            TournamentStatus::Completed => "completed",
            TournamentStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TournamentStatus::Completed | TournamentStatus::Cancelled)
    }
}

impl fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TournamentMetadata {
    pub venue: String,
    pub organizer: String,
    pub entry_fee: f64,
    pub currency: String,
    pub contact_info: String,
    pub website: String,
}

impl Default for TournamentMetadata {
    fn default() -> Self {
        Self {
            venue: String::new(),
            organizer: String::new(),
            entry_fee: 0.0,
            currency: "VND".to_string(),
            contact_info: String::new(),
            website: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prize {
    pub place: u32,
    pub description: String,
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub total_matches: usize,
    pub completed_matches: usize,
    pub percentage: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tournament {
    pub id: TournamentId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub tournament_type: TournamentType,
    #[serde(default)]
    pub format: TournamentFormat,
    #[serde(default)]
    pub status: TournamentStatus,
    pub max_participants: usize,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub matches: Vec<MatchId>,
    #[serde(default)]
    pub standings: Vec<StandingEntry>,
    pub bracket: Option<Bracket>,
    #[serde(default)]
    pub metadata: TournamentMetadata,
    #[serde(default)]
    pub prizes: Vec<Prize>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tournament {
    pub fn new(
        name: &str,
        tournament_type: TournamentType,
        format: TournamentFormat,
        max_participants: usize,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: TournamentId::generate(),
            name: name.trim().to_string(),
            description: String::new(),
            tournament_type,
            format,
            status: TournamentStatus::Planning,
            max_participants,
            registration_deadline: None,
            start_date: None,
            end_date: None,
            participants: Vec::new(),
            matches: Vec::new(),
            standings: Vec::new(),
            bracket: None,
            metadata: TournamentMetadata::default(),
            prizes: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_participant(&self, participant: &Participant) -> bool {
        self.participants.contains(participant)
    }

    /// Field problems, empty when the tournament is valid
    pub fn validate(&self) -> Vec<String> {
        let mut violations = Vec::new();
        if self.name.trim().chars().count() < 2 {
            violations.push("tournament name must have at least 2 characters".to_string());
        }
        if self.max_participants < 2 {
            violations.push("a tournament needs room for at least 2 participants".to_string());
        }
        if self.participants.len() > self.max_participants {
            violations.push("more participants than the tournament allows".to_string());
        }
        if let (Some(start), Some(end)) = (self.start_date, self.end_date) {
            if start > end {
                violations.push("start date cannot be after the end date".to_string());
            }
        }
        if let (Some(deadline), Some(start)) = (self.registration_deadline, self.start_date) {
            if deadline > start {
                violations.push("registration deadline cannot be after the start date".to_string());
            }
        }
        if let Some(outsider) = self.participants.iter().find(|p| !self.tournament_type.accepts(p)) {
            violations.push(format!(
                "{} cannot enter a {} tournament",
                outsider,
                self.tournament_type.as_str()
            ));
        }
        violations
    }

    pub fn matches_search(&self, term: &str) -> bool {
        let term = term.to_lowercase();
        [
            self.name.as_str(),
            self.description.as_str(),
            self.tournament_type.as_str(),
            self.format.as_str(),
            self.status.as_str(),
            self.metadata.venue.as_str(),
            self.metadata.organizer.as_str(),
        ]
        .iter()
        .any(|field| field.to_lowercase().contains(&term))
    }
}

impl Entity for Tournament {
    type Id = TournamentId;
    const KIND: &'static str = "tournament";

    fn id(&self) -> &TournamentId {
        &self.id
    }
}
