pub mod points;
pub mod tiers;

pub use points::{player_win_points, relative_strength_points};
pub use tiers::Rank;
