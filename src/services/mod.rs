pub mod club;
pub mod directory;
pub mod doubles;
pub mod matches;
pub mod players;
pub mod rules;
pub mod teams;
pub mod tournaments;

use std::collections::BTreeSet;

use crate::domain::Entity;

pub use club::{Club, PlayerRemoval};
pub use directory::ParticipantDirectory;
pub use doubles::{DoubleService, DoubleUpdate};
pub use matches::{MatchService, MatchUpdate, NewMatch};
pub use players::{ImportError, ImportReport, NewPlayer, PlayerService, PlayerStatistics, PlayerUpdate};
pub use rules::RuleService;
pub use teams::{NewTeam, RosterChanges, TeamService, TeamUpdate};
pub use tournaments::{NewTournament, TournamentService, TournamentUpdate};

/// One message per id that appears more than once
fn duplicate_ids<T: Entity>(items: &[T]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    items
        .iter()
        .map(|item| item.id().to_string())
        .filter(|id| !seen.insert(id.clone()))
        .map(|id| format!("{} {} appears more than once", T::KIND, id))
        .collect()
}
