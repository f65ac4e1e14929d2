use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::config::PointsSettings;
use crate::errors::ClubError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rank {
    #[default]
    Beginner,     // < 200 points
    Intermediate, // 200-499
    Advanced,     // 500-999
    Professional, // 1000+
}

impl Rank {
    pub const ALL: [Rank; 4] = [
        Rank::Beginner,
        Rank::Intermediate,
        Rank::Advanced,
        Rank::Professional,
    ];

    pub fn from_points(points: u32, settings: &PointsSettings) -> Self {
        if points < settings.intermediate_threshold {
            Rank::Beginner
        } else if points < settings.advanced_threshold {
            Rank::Intermediate
        } else if points < settings.professional_threshold {
            Rank::Advanced
        } else {
            Rank::Professional
        }
    }

    /// 1 for Beginner up to 4 for Professional
    pub fn level(self) -> u8 {
        match self {
            Rank::Beginner => 1,
            Rank::Intermediate => 2,
            Rank::Advanced => 3,
            Rank::Professional => 4,
        }
    }

    /// Nearest tier for an averaged level, rounding halves up.
    pub fn from_average_level(level: f64) -> Self {
        if level >= 3.5 {
            Rank::Professional
        } else if level >= 2.5 {
            Rank::Advanced
        } else if level >= 1.5 {
            Rank::Intermediate
        } else {
            Rank::Beginner
        }
    }

    pub fn average<I: IntoIterator<Item = Rank>>(ranks: I) -> Option<Self> {
        let levels: Vec<f64> = ranks.into_iter().map(|r| f64::from(r.level())).collect();
        if levels.is_empty() {
            return None;
        }
        let mean = levels.iter().sum::<f64>() / levels.len() as f64;
        Some(Self::from_average_level(mean))
    }

    pub fn multiplier(self, settings: &PointsSettings) -> f64 {
        settings.rank_multipliers[usize::from(self.level() - 1)]
    }

    pub fn as_str(&self) -> &str {
        match self {
            Rank::Beginner => "beginner",
            Rank::Intermediate => "intermediate",
            Rank::Advanced => "advanced",
            Rank::Professional => "professional",
        }
    }
}

impl fmt::Display for Rank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rank {
    type Err = ClubError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Rank::ALL
            .into_iter()
            .find(|rank| rank.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| ClubError::validation(format!("unknown rank: {}", value)))
    }
}
