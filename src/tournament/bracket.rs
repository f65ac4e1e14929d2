use serde::{Deserialize, Serialize};

use crate::domain::{MatchId, Participant, TournamentId};
use crate::errors::{ClubError, ClubResult};

/// One side of a bracket pairing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum Slot {
    Entrant(Participant),
    WinnerOf(MatchId),
    Bye,
}

impl Slot {
    fn entrant(&self) -> Option<&Participant> {
        match self {
            Slot::Entrant(participant) => Some(participant),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pairing {
    pub round: u32,
    pub position: u32,
    pub side1: Slot,
    pub side2: Slot,
    /// Id of the deciding match; `None` for a bye
    pub match_id: Option<MatchId>,
    #[serde(default)]
    pub materialized: bool,
    pub advancer: Option<Participant>,
}

impl Pairing {
    fn outcome_slot(&self) -> Slot {
        match (&self.advancer, &self.match_id) {
            (Some(advancer), _) => Slot::Entrant(advancer.clone()),
            (None, Some(match_id)) => Slot::WinnerOf(match_id.clone()),
            (None, None) => Slot::Bye,
        }
    }
}

/// A pairing whose two sides are known and whose match must now be created
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadyPairing {
    pub match_id: MatchId,
    pub round: u32,
    pub position: u32,
    pub participant1: Participant,
    pub participant2: Participant,
}

/// Single-elimination draw padded with byes to a power of two.
///
/// Byes go to the first entrants, so no pairing is ever bye against bye and
/// each bye hands its entrant straight into round two without a match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bracket {
    pub rounds: Vec<Vec<Pairing>>,
}

impl Bracket {
    pub fn build(tournament_id: &TournamentId, entrants: &[Participant]) -> ClubResult<Self> {
        if entrants.len() < 2 {
            return Err(ClubError::validation("an elimination bracket needs at least 2 entrants"));
        }
        let size = entrants.len().next_power_of_two();
        let byes = size - entrants.len();

        let mut queue = entrants.iter().cloned();
        let mut first_round = Vec::with_capacity(size / 2);
        for position in 0..size / 2 {
            let side1 = queue.next().map(Slot::Entrant).unwrap_or(Slot::Bye);
            let side2 = if position < byes {
                Slot::Bye
            } else {
                queue.next().map(Slot::Entrant).unwrap_or(Slot::Bye)
            };
            first_round.push(new_pairing(tournament_id, 1, position as u32, side1, side2));
        }

        let mut rounds = vec![first_round];
        while rounds.last().is_some_and(|round| round.len() > 1) {
            let previous = &rounds[rounds.len() - 1];
            let round_number = rounds.len() as u32 + 1;
            let next: Vec<Pairing> = previous
                .chunks(2)
                .enumerate()
                .map(|(position, feeders)| {
                    let side1 = feeders[0].outcome_slot();
                    let side2 = feeders.get(1).map(Pairing::outcome_slot).unwrap_or(Slot::Bye);
                    new_pairing(tournament_id, round_number, position as u32, side1, side2)
                })
                .collect();
            rounds.push(next);
        }
        Ok(Self { rounds })
    }

    /// Pairings with both sides known that have no match yet; marks them created.
    pub fn take_ready(&mut self) -> Vec<ReadyPairing> {
        let mut ready = Vec::new();
        for pairing in self.rounds.iter_mut().flatten() {
            if pairing.materialized || pairing.advancer.is_some() {
                continue;
            }
            let (Some(match_id), Some(p1), Some(p2)) =
                (&pairing.match_id, pairing.side1.entrant(), pairing.side2.entrant())
            else {
                continue;
            };
            ready.push(ReadyPairing {
                match_id: match_id.clone(),
                round: pairing.round,
                position: pairing.position,
                participant1: p1.clone(),
                participant2: p2.clone(),
            });
            pairing.materialized = true;
        }
        ready
    }

    /// Write a decided match's winner into the pairing it feeds.
    pub fn record_winner(&mut self, match_id: &MatchId, winner: &Participant) -> ClubResult<()> {
        let pairing = self
            .rounds
            .iter_mut()
            .flatten()
            .find(|pairing| pairing.match_id.as_ref() == Some(match_id))
            .ok_or_else(|| ClubError::not_found("bracket match", match_id))?;
        if pairing.side1.entrant() != Some(winner) && pairing.side2.entrant() != Some(winner) {
            return Err(ClubError::validation(format!("{} did not play bracket match {}", winner, match_id)));
        }
        pairing.advancer = Some(winner.clone());

        let feeder = Slot::WinnerOf(match_id.clone());
        for pairing in self.rounds.iter_mut().flatten() {
            for slot in [&mut pairing.side1, &mut pairing.side2] {
                if *slot == feeder {
                    *slot = Slot::Entrant(winner.clone());
                }
            }
        }
        Ok(())
    }

    pub fn contains_match(&self, match_id: &MatchId) -> bool {
        self.rounds
            .iter()
            .flatten()
            .any(|pairing| pairing.match_id.as_ref() == Some(match_id))
    }

    pub fn champion(&self) -> Option<&Participant> {
        self.rounds.last()?.first()?.advancer.as_ref()
    }

    pub fn round_count(&self) -> usize {
        self.rounds.len()
    }

    /// Number of matches the whole draw will produce
    pub fn match_count(&self) -> usize {
        self.rounds
            .iter()
            .flatten()
            .filter(|pairing| pairing.match_id.is_some())
            .count()
    }
}

pub fn bracket_match_id(tournament_id: &TournamentId, round: u32, position: u32) -> MatchId {
    MatchId::new(format!("match_{}_r{}_{}", tournament_id, round, position))
}

fn new_pairing(tournament_id: &TournamentId, round: u32, position: u32, side1: Slot, side2: Slot) -> Pairing {
    let bye_entrant = match (&side1, &side2) {
        (Slot::Entrant(participant), Slot::Bye) | (Slot::Bye, Slot::Entrant(participant)) => Some(participant.clone()),
        _ => None,
    };
    let is_contest = bye_entrant.is_none() && side1 != Slot::Bye && side2 != Slot::Bye;
    Pairing {
        round,
        position,
        match_id: is_contest.then(|| bracket_match_id(tournament_id, round, position)),
        materialized: false,
        advancer: bye_entrant,
        side1,
        side2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PlayerId;

    fn entrants(names: &[&str]) -> Vec<Participant> {
        names.iter().map(|n| Participant::Player(PlayerId::from(*n))).collect()
    }

    fn tid() -> TournamentId {
        TournamentId::from("t1")
    }

    #[test]
    fn test_five_entrants_pad_to_eight_slots() {
        let players = entrants(&["a", "b", "c", "d", "e"]);
        let mut bracket = Bracket::build(&tid(), &players).unwrap();

        assert_eq!(bracket.round_count(), 3);
        assert_eq!(bracket.rounds[0].len(), 4);
        let byes = bracket.rounds[0].iter().filter(|p| p.match_id.is_none()).count();
        assert_eq!(byes, 3);
        assert_eq!(bracket.rounds[2].len(), 1);
        assert!(bracket.rounds[2][0].match_id.is_some());
        assert_eq!(bracket.match_count(), 4);

        let ready = bracket.take_ready();
        let ids: Vec<&str> = ready.iter().map(|r| r.match_id.as_str()).collect();
        assert_eq!(ids, vec!["match_t1_r1_3", "match_t1_r2_0"]);
        assert_eq!(ready[1].participant1, players[0]);
        assert_eq!(ready[1].participant2, players[1]);
        assert!(bracket.take_ready().is_empty());
    }

    #[test]
    fn test_winners_advance_until_champion() {
        let players = entrants(&["a", "b", "c", "d", "e"]);
        let mut bracket = Bracket::build(&tid(), &players).unwrap();
        bracket.take_ready();

        bracket.record_winner(&MatchId::from("match_t1_r1_3"), &players[4]).unwrap();
        let ready = bracket.take_ready();
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].participant1, players[2]);
        assert_eq!(ready[0].participant2, players[4]);

        bracket.record_winner(&MatchId::from("match_t1_r2_0"), &players[0]).unwrap();
        assert!(bracket.take_ready().is_empty());
        bracket.record_winner(&MatchId::from("match_t1_r2_1"), &players[4]).unwrap();
        let final_match = bracket.take_ready();
        assert_eq!(final_match[0].round, 3);

        bracket.record_winner(&MatchId::from("match_t1_r3_0"), &players[0]).unwrap();
        assert_eq!(bracket.champion(), Some(&players[0]));
    }

    #[test]
    fn test_power_of_two_has_no_byes() {
        let mut bracket = Bracket::build(&tid(), &entrants(&["a", "b", "c", "d"])).unwrap();
        assert_eq!(bracket.take_ready().len(), 2);
        assert_eq!(bracket.match_count(), 3);
    }

    #[test]
    fn test_unknown_winner_is_rejected() {
        let players = entrants(&["a", "b"]);
        let mut bracket = Bracket::build(&tid(), &players).unwrap();
        let outsider = Participant::Player(PlayerId::from("z"));
        assert!(bracket.record_winner(&MatchId::from("match_t1_r1_0"), &outsider).is_err());
        assert!(bracket.record_winner(&MatchId::from("nope"), &players[0]).is_err());
    }
}
