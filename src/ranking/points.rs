use crate::config::PointsSettings;
use crate::domain::MatchType;

use super::Rank;

/// Points a player earns for beating an opponent of the given rank.
///
/// Base points shrink as the discipline needs more coordination
/// (singles > doubles > teams); a missing rank counts as Beginner.
pub fn player_win_points(match_type: MatchType, opponent_rank: Option<Rank>, settings: &PointsSettings) -> u32 {
    let base = match match_type {
        MatchType::Singles => settings.singles_base,
        MatchType::Doubles => settings.doubles_base,
        MatchType::Teams => settings.teams_base,
    };
    let multiplier = opponent_rank.unwrap_or_default().multiplier(settings);
    round_points(base * multiplier)
}

/// `clamp(opponent / max(own, 1), min, max) * base`
pub fn relative_strength_points(base: f64, own_points: u32, opponent_points: u32, settings: &PointsSettings) -> u32 {
    let ratio = f64::from(opponent_points) / f64::from(own_points.max(1));
    let multiplier = ratio.clamp(settings.min_strength_ratio, settings.max_strength_ratio);
    round_points(base * multiplier)
}

fn round_points(value: f64) -> u32 {
    value.round().max(0.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_points_scale_with_opponent_rank() {
        let settings = PointsSettings::default();
        assert_eq!(player_win_points(MatchType::Singles, None, &settings), 10);
        assert_eq!(player_win_points(MatchType::Singles, Some(Rank::Intermediate), &settings), 12);
        assert_eq!(player_win_points(MatchType::Doubles, Some(Rank::Advanced), &settings), 12);
        assert_eq!(player_win_points(MatchType::Teams, Some(Rank::Professional), &settings), 12);
    }

    #[test]
    fn test_relative_strength_is_clamped() {
        let settings = PointsSettings::default();
        assert_eq!(relative_strength_points(15.0, 0, 0, &settings), 8);
        assert_eq!(relative_strength_points(15.0, 100, 100, &settings), 15);
        assert_eq!(relative_strength_points(20.0, 10, 1000, &settings), 40);
        assert_eq!(relative_strength_points(20.0, 1000, 10, &settings), 10);
    }
}
