pub mod bracket;
pub mod lifecycle;
pub mod model;
pub mod standings;

pub use bracket::{Bracket, Pairing, ReadyPairing, Slot, bracket_match_id};
pub use model::{Progress, Prize, Tournament, TournamentFormat, TournamentMetadata, TournamentStatus, TournamentType};
pub use standings::{StandingEntry, assign_final_ranks, calculate_standings};
