use std::fmt;

use serde::{Deserialize, Serialize};

use super::ids::{DoubleId, PlayerId, TeamId};

/// Discipline of a match; also the kind of entity that competes in it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MatchType {
    Singles,
    Doubles,
    Teams,
}

impl MatchType {
    pub fn as_str(&self) -> &str {
        match self {
            MatchType::Singles => "singles",
            MatchType::Doubles => "doubles",
            MatchType::Teams => "teams",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A competitor in a match or tournament, tagged with its registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "lowercase")]
pub enum Participant {
    Player(PlayerId),
    Double(DoubleId),
    Team(TeamId),
}

impl Participant {
    pub fn match_type(&self) -> MatchType {
        match self {
            Participant::Player(_) => MatchType::Singles,
            Participant::Double(_) => MatchType::Doubles,
            Participant::Team(_) => MatchType::Teams,
        }
    }

    pub fn id_str(&self) -> &str {
        match self {
            Participant::Player(id) => id.as_str(),
            Participant::Double(id) => id.as_str(),
            Participant::Team(id) => id.as_str(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Participant::Player(_) => "player",
            Participant::Double(_) => "double",
            Participant::Team(_) => "team",
        }
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id_str())
    }
}

impl From<PlayerId> for Participant {
    fn from(id: PlayerId) -> Self {
        Participant::Player(id)
    }
}

impl From<DoubleId> for Participant {
    fn from(id: DoubleId) -> Self {
        Participant::Double(id)
    }
}

impl From<TeamId> for Participant {
    fn from(id: TeamId) -> Self {
        Participant::Team(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Side {
    One,
    Two,
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::One => Side::Two,
            Side::Two => Side::One,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_serializes_with_kind_tag() {
        let participant = Participant::Double(DoubleId::from("double_1"));
        let json = serde_json::to_value(&participant).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "double", "id": "double_1"}));
        assert_eq!(participant.match_type(), MatchType::Doubles);
    }
}
