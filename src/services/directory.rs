use crate::domain::{Collection, Double, Opponent, Participant, Player, PlayerId, Team};
use crate::errors::{ClubError, ClubResult};
use crate::ranking::Rank;

/// Read-only view over the three registries, resolving a participant by its kind.
#[derive(Clone, Copy)]
pub struct ParticipantDirectory<'a> {
    players: &'a Collection<Player>,
    doubles: &'a Collection<Double>,
    teams: &'a Collection<Team>,
}

impl<'a> ParticipantDirectory<'a> {
    pub fn new(players: &'a Collection<Player>, doubles: &'a Collection<Double>, teams: &'a Collection<Team>) -> Self {
        Self { players, doubles, teams }
    }

    pub fn exists(&self, participant: &Participant) -> bool {
        match participant {
            Participant::Player(id) => self.players.contains(id),
            Participant::Double(id) => self.doubles.contains(id),
            Participant::Team(id) => self.teams.contains(id),
        }
    }

    pub fn require(&self, participant: &Participant) -> ClubResult<()> {
        if self.exists(participant) {
            Ok(())
        } else {
            Err(ClubError::validation(format!("{} does not exist", participant)))
        }
    }

    pub fn name(&self, participant: &Participant) -> Option<&'a str> {
        match participant {
            Participant::Player(id) => self.players.get(id).map(|p| p.name.as_str()),
            Participant::Double(id) => self.doubles.get(id).map(|d| d.name.as_str()),
            Participant::Team(id) => self.teams.get(id).map(|t| t.name.as_str()),
        }
    }

    /// Display name, falling back to the raw id for unknown participants
    pub fn label(&self, participant: &Participant) -> String {
        self.name(participant)
            .map(str::to_string)
            .unwrap_or_else(|| participant.id_str().to_string())
    }

    pub fn opponent(&self, participant: &Participant) -> ClubResult<Opponent> {
        match participant {
            Participant::Player(id) => self.players.require(id).map(Player::as_opponent),
            Participant::Double(id) => self.doubles.require(id).map(Double::as_opponent),
            Participant::Team(id) => self.teams.require(id).map(Team::as_opponent),
        }
    }

    /// Own rank for players, average member rank for doubles and teams
    pub fn rank(&self, participant: &Participant) -> Option<Rank> {
        match participant {
            Participant::Player(id) => self.players.get(id).map(|p| p.rank),
            Participant::Double(id) => {
                let double = self.doubles.get(id)?;
                self.average_rank([&double.player1_id, &double.player2_id])
            }
            Participant::Team(id) => {
                let team = self.teams.get(id)?;
                self.average_rank(team.player_ids.iter())
            }
        }
    }

    fn average_rank<'b, I>(&self, ids: I) -> Option<Rank>
    where
        I: IntoIterator<Item = &'b PlayerId>,
    {
        Rank::average(ids.into_iter().filter_map(|id| self.players.get(id)).map(|p| p.rank))
    }
}
