pub mod lifecycle;
pub mod model;
pub mod schedule;
pub mod stats;

pub use lifecycle::ScoreOutcome;
pub use model::{Match, MatchScore, MatchStatus, SetScore};
pub use schedule::{ScheduleSlot, plan_schedule};
pub use stats::{ParticipantStats, RecentMatch, Streak, participant_stats};
