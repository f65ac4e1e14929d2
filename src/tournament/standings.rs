use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::domain::{Participant, Side, TournamentId};
use crate::matches::{Match, MatchStatus};

pub const WIN_POINTS: u32 = 3;
pub const DRAW_POINTS: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandingEntry {
    pub participant: Participant,
    pub matches_played: u32,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    pub points: u32,
    pub sets_won: u32,
    pub sets_lost: u32,
    pub games_won: u32,
    pub games_lost: u32,
    pub final_rank: Option<u32>,
}

impl StandingEntry {
    pub fn new(participant: Participant) -> Self {
        Self {
            participant,
            matches_played: 0,
            wins: 0,
            losses: 0,
            draws: 0,
            points: 0,
            sets_won: 0,
            sets_lost: 0,
            games_won: 0,
            games_lost: 0,
            final_rank: None,
        }
    }

    pub fn set_difference(&self) -> i64 {
        i64::from(self.sets_won) - i64::from(self.sets_lost)
    }

    pub fn game_difference(&self) -> i64 {
        i64::from(self.games_won) - i64::from(self.games_lost)
    }

    fn absorb(&mut self, m: &Match, side: Side) {
        self.matches_played += 1;
        match m.winner_side() {
            Some(winner) if winner == side => {
                self.wins += 1;
                self.points += WIN_POINTS;
            }
            Some(_) => self.losses += 1,
            None => {
                self.draws += 1;
                self.points += DRAW_POINTS;
            }
        }
        for set in &m.score.sets {
            match set.winner {
                Some(winner) if winner == side => self.sets_won += 1,
                Some(_) => self.sets_lost += 1,
                None => {}
            }
            let (own, other) = set.score_for(side);
            self.games_won += own;
            self.games_lost += other;
        }
    }
}

/// Table of every registered participant built from the tournament's completed matches.
///
/// Ordered by points, then wins, then set difference, then game difference;
/// remaining ties keep registration order.
pub fn calculate_standings<'a, I>(
    tournament_id: &TournamentId,
    participants: &[Participant],
    matches: I,
) -> Vec<StandingEntry>
where
    I: IntoIterator<Item = &'a Match>,
{
    let mut table: Vec<StandingEntry> = participants.iter().cloned().map(StandingEntry::new).collect();

    let completed = matches
        .into_iter()
        .filter(|m| m.status == MatchStatus::Completed && m.tournament_id.as_ref() == Some(tournament_id));
    for m in completed {
        let first = table.iter().position(|entry| entry.participant == m.participant1);
        let second = table.iter().position(|entry| entry.participant == m.participant2);
        let (Some(first), Some(second)) = (first, second) else {
            continue;
        };
        table[first].absorb(m, Side::One);
        table[second].absorb(m, Side::Two);
    }

    table.sort_by(compare_entries);
    table
}

/// Number the table 1..n in its current order
pub fn assign_final_ranks(table: &mut [StandingEntry]) {
    for (index, entry) in table.iter_mut().enumerate() {
        entry.final_rank = Some(index as u32 + 1);
    }
}

fn compare_entries(a: &StandingEntry, b: &StandingEntry) -> Ordering {
    b.points
        .cmp(&a.points)
        .then_with(|| b.wins.cmp(&a.wins))
        .then_with(|| b.set_difference().cmp(&a.set_difference()))
        .then_with(|| b.game_difference().cmp(&a.game_difference()))
}
