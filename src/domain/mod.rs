pub mod collection;
pub mod double;
pub mod ids;
pub mod participant;
pub mod player;
pub mod record;
pub mod stats;
pub mod team;

pub use collection::{Collection, Entity};
pub use double::Double;
pub use ids::{DoubleId, MatchId, PlayerId, RuleId, TeamId, TournamentId};
pub use participant::{MatchType, Participant, Side};
pub use player::Player;
pub use record::{Record, from_records, to_records};
pub use stats::{CompetitionRecord, MatchOutcome, MatchResult, Opponent, win_rate};
pub use team::{MAX_TEAM_SIZE, MIN_TEAM_SIZE, Team};
