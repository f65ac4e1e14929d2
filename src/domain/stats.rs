use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::MatchId;
use super::participant::{MatchType, Participant};
use crate::ranking::Rank;

/// One entry of a participant's match history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub match_id: Option<MatchId>,
    pub opponent: Participant,
    pub opponent_name: String,
    pub is_win: bool,
    pub match_type: MatchType,
    /// Score from this participant's point of view, e.g. `3-1 (11-9, 8-11, 11-5, 11-7)`
    pub score: String,
    pub date: DateTime<Utc>,
    pub points_earned: u32,
}

/// What the points engine needs to know about the other side
#[derive(Debug, Clone, PartialEq)]
pub struct Opponent {
    pub participant: Participant,
    pub name: String,
    pub rank: Option<Rank>,
    pub points: u32,
}

/// Result details shared by every registry's `add_match_result`
#[derive(Debug, Clone, PartialEq)]
pub struct MatchOutcome {
    pub match_id: Option<MatchId>,
    pub is_win: bool,
    pub match_type: MatchType,
    pub score: String,
    pub date: DateTime<Utc>,
}

/// Counters and history shared by players, doubles and teams.
///
/// `matches_played == matches_won + matches_lost` always holds and
/// `win_rate` is the rounded percentage of wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompetitionRecord {
    pub points: u32,
    pub matches_played: u32,
    pub matches_won: u32,
    pub matches_lost: u32,
    pub win_rate: u32,
    pub history: Vec<MatchResult>,
}

impl CompetitionRecord {
    pub fn record(&mut self, result: MatchResult) -> &MatchResult {
        self.matches_played += 1;
        if result.is_win {
            self.matches_won += 1;
            self.points += result.points_earned;
        } else {
            self.matches_lost += 1;
        }
        self.win_rate = win_rate(self.matches_won, self.matches_played);
        self.history.push(result);
        &self.history[self.history.len() - 1]
    }

    /// Newest first
    pub fn recent(&self, limit: usize) -> Vec<&MatchResult> {
        let mut entries: Vec<&MatchResult> = self.history.iter().collect();
        entries.sort_by(|a, b| b.date.cmp(&a.date));
        entries.truncate(limit);
        entries
    }

    pub fn total_points_earned(&self) -> u32 {
        self.history.iter().map(|entry| entry.points_earned).sum()
    }

    pub fn average_points_per_match(&self) -> u32 {
        if self.matches_played == 0 {
            0
        } else {
            (f64::from(self.points) / f64::from(self.matches_played)).round() as u32
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.matches_played == self.matches_won + self.matches_lost
            && self.win_rate == win_rate(self.matches_won, self.matches_played)
    }
}

pub fn win_rate(won: u32, played: u32) -> u32 {
    if played == 0 {
        return 0;
    }
    (100.0 * f64::from(won) / f64::from(played)).round() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PlayerId;
    use chrono::TimeZone;

    fn result(is_win: bool, points: u32, day: u32) -> MatchResult {
        MatchResult {
            match_id: None,
            opponent: Participant::Player(PlayerId::from("player_x")),
            opponent_name: "X".into(),
            is_win,
            match_type: MatchType::Singles,
            score: "3-0".into(),
            date: Utc.with_ymd_and_hms(2024, 3, day, 10, 0, 0).unwrap(),
            points_earned: points,
        }
    }

    #[test]
    fn test_record_keeps_counters_consistent() {
        let mut record = CompetitionRecord::default();
        for (i, win) in [true, false, true].into_iter().enumerate() {
            record.record(result(win, if win { 10 } else { 0 }, i as u32 + 1));
            assert!(record.is_consistent());
        }
        assert_eq!(record.matches_played, 3);
        assert_eq!(record.win_rate, 67);
        assert_eq!(record.points, 20);
    }

    #[test]
    fn test_recent_returns_newest_first() {
        let mut record = CompetitionRecord::default();
        record.record(result(true, 10, 1));
        record.record(result(false, 0, 5));
        record.record(result(true, 12, 3));
        let days: Vec<_> = record.recent(2).iter().map(|r| r.points_earned).collect();
        assert_eq!(days, vec![0, 12]);
    }

    #[test]
    fn test_win_rate_without_matches_is_zero() {
        assert_eq!(win_rate(0, 0), 0);
        assert_eq!(win_rate(1, 2), 50);
    }
}
