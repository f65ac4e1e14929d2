use serde::{Deserialize, Serialize};

use crate::domain::Side;

/// Set and match thresholds snapshotted into every match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoringRules {
    pub best_of: u32,
    pub winning_score: u32,
    pub min_win_margin: u32,
    pub max_score: u32,
}

impl Default for ScoringRules {
    fn default() -> Self {
        Self {
            best_of: 5,
            winning_score: 11,
            min_win_margin: 2,
            max_score: 21,
        }
    }
}

impl ScoringRules {
    pub fn sets_to_win(&self) -> u32 {
        self.best_of.div_ceil(2)
    }

    /// A side wins the set on reaching `winning_score` with the required
    /// margin, or on reaching `max_score` with any lead at all.
    pub fn is_set_won(&self, score1: u32, score2: u32) -> Option<Side> {
        if score1 == score2 {
            return None;
        }
        let leader = if score1 > score2 { Side::One } else { Side::Two };
        let high = score1.max(score2);
        let margin = score1.abs_diff(score2);

        let reached_with_margin = high >= self.winning_score && margin >= self.min_win_margin;
        let hit_ceiling = high >= self.max_score;
        (reached_with_margin || hit_ceiling).then_some(leader)
    }

    pub fn is_match_won(&self, sets_won1: u32, sets_won2: u32) -> Option<Side> {
        let needed = self.sets_to_win();
        if sets_won1 >= needed && sets_won1 > sets_won2 {
            Some(Side::One)
        } else if sets_won2 >= needed && sets_won2 > sets_won1 {
            Some(Side::Two)
        } else {
            None
        }
    }

    pub fn validate(&self) -> Vec<String> {
        let mut violations = Vec::new();
        if self.best_of == 0 {
            violations.push("best-of must be at least 1".to_string());
        }
        if self.winning_score == 0 {
            violations.push("winning score must be at least 1".to_string());
        }
        if self.max_score < self.winning_score {
            violations.push("max score cannot be below the winning score".to_string());
        }
        violations
    }
}
