use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! event_kinds {
    ($($variant:ident => $name:literal),+ $(,)?) => {
        /// Closed vocabulary of change notifications
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum EventKind {
            $(#[serde(rename = $name)] $variant,)+
        }

        impl EventKind {
            pub const ALL: &'static [EventKind] = &[$(EventKind::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $(EventKind::$variant => $name,)+
                }
            }
        }
    };
}

event_kinds! {
    PlayerCreated => "player_created",
    PlayerUpdated => "player_updated",
    PlayerDeleted => "player_deleted",
    PlayerMatchResult => "player_match_result",
    PlayerRankChanged => "player_rank_changed",
    PlayersImported => "players_imported",
    DoubleCreated => "double_created",
    DoubleUpdated => "double_updated",
    DoubleDeleted => "double_deleted",
    DoubleMatchResult => "double_match_result",
    DoublesAutoDeleted => "doubles_auto_deleted",
    TeamCreated => "team_created",
    TeamUpdated => "team_updated",
    TeamDeleted => "team_deleted",
    TeamMatchResult => "team_match_result",
    TeamsAutoModified => "teams_auto_modified",
    PlayerAddedToTeam => "player_added_to_team",
    PlayerRemovedFromTeam => "player_removed_from_team",
    TeamCaptainChanged => "team_captain_changed",
    MatchCreated => "match_created",
    MatchUpdated => "match_updated",
    MatchDeleted => "match_deleted",
    MatchStarted => "match_started",
    MatchScoreUpdated => "match_score_updated",
    MatchSetCompleted => "match_set_completed",
    MatchCompleted => "match_completed",
    MatchCancelled => "match_cancelled",
    MatchPostponed => "match_postponed",
    MatchRescheduled => "match_rescheduled",
    TournamentCreated => "tournament_created",
    TournamentUpdated => "tournament_updated",
    TournamentDeleted => "tournament_deleted",
    TournamentRegistrationOpened => "tournament_registration_opened",
    TournamentStarted => "tournament_started",
    TournamentCompleted => "tournament_completed",
    TournamentCancelled => "tournament_cancelled",
    ParticipantAdded => "participant_added",
    ParticipantRemoved => "participant_removed",
    RuleCreated => "rule_created",
    RuleUpdated => "rule_updated",
    RuleDeleted => "rule_deleted",
    RuleActivated => "rule_activated",
    RuleDeactivated => "rule_deactivated",
    RulesReset => "rules_reset",
    DataImported => "data_imported",
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
