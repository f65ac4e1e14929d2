use chrono::{DateTime, Utc};
use serde::Serialize;

use super::model::{Match, MatchStatus};
use crate::domain::{MatchId, Participant, win_rate};

const RECENT_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentMatch {
    pub match_id: MatchId,
    pub opponent: Participant,
    pub is_win: bool,
    pub date: Option<DateTime<Utc>>,
    pub score: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Streak {
    pub wins: bool,
    pub length: u32,
}

/// Aggregates over a participant's completed matches
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantStats {
    pub total_matches: u32,
    pub wins: u32,
    pub losses: u32,
    pub win_rate: u32,
    pub points_scored: u32,
    pub points_conceded: u32,
    pub average_points_per_match: f64,
    pub current_streak: Streak,
    pub longest_win_streak: u32,
    pub recent: Vec<RecentMatch>,
}

pub fn participant_stats<'a, I>(matches: I, participant: &Participant) -> ParticipantStats
where
    I: IntoIterator<Item = &'a Match>,
{
    let mut played: Vec<&Match> = matches
        .into_iter()
        .filter(|m| m.status == MatchStatus::Completed && m.involves(participant))
        .collect();
    // newest first
    played.sort_by(|a, b| b.end_time.cmp(&a.end_time));

    let mut stats = ParticipantStats::default();
    let mut run = 0;
    for m in played.iter().rev() {
        let Some(side) = m.side_of(participant) else {
            continue;
        };
        let is_win = m.winner.as_ref() == Some(participant);
        if is_win {
            stats.wins += 1;
            run += 1;
            stats.longest_win_streak = stats.longest_win_streak.max(run);
        } else {
            stats.losses += 1;
            run = 0;
        }
        for set in &m.score.sets {
            let (own, other) = set.score_for(side);
            stats.points_scored += own;
            stats.points_conceded += other;
        }
    }

    stats.total_matches = played.len() as u32;
    stats.win_rate = win_rate(stats.wins, stats.total_matches);
    if stats.total_matches > 0 {
        stats.average_points_per_match = f64::from(stats.points_scored) / f64::from(stats.total_matches);
    }
    stats.current_streak = current_streak(&played, participant);
    stats.recent = played
        .iter()
        .take(RECENT_LIMIT)
        .filter_map(|m| {
            let side = m.side_of(participant)?;
            Some(RecentMatch {
                match_id: m.id.clone(),
                opponent: m.participant(side.other()).clone(),
                is_win: m.winner.as_ref() == Some(participant),
                date: m.end_time,
                score: m.score.summary_for(side),
            })
        })
        .collect();
    stats
}

fn current_streak(newest_first: &[&Match], participant: &Participant) -> Streak {
    let mut results = newest_first.iter().map(|m| m.winner.as_ref() == Some(participant));
    let Some(latest) = results.next() else {
        return Streak::default();
    };
    let length = 1 + results.take_while(|&is_win| is_win == latest).count() as u32;
    Streak { wins: latest, length }
}
