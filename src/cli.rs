use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

use crate::config::StorageBackend;
use crate::domain::{DoubleId, Participant, PlayerId, TeamId};
use crate::ranking::Rank;
use crate::tournament::{TournamentFormat, TournamentType};

#[derive(Parser, Debug)]
#[command(author, version, about = "ping-pong club tournament manager")]
pub struct Cli {
    /// Storage backend: json, sqlite or memory (defaults to PINGPONG_STORE, then json)
    #[arg(long, global = true)]
    pub store: Option<StorageBackend>,

    /// Data directory (defaults to PINGPONG_DATA_PATH, then ./club-data)
    #[arg(long, global = true)]
    pub data: Option<PathBuf>,

    /// Command
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
#[clap(rename_all = "lower_case")]
pub enum Command {
    /// Create the data store and seed the default rules
    Init {
        /// Wipe existing data first
        #[arg(long)]
        reset: bool,
    },
    /// Manage players
    Players {
        #[clap(subcommand)]
        action: PlayerAction,
    },
    /// Manage tournaments
    Tournaments {
        #[clap(subcommand)]
        action: TournamentAction,
    },
    /// Record match play
    Matches {
        #[clap(subcommand)]
        action: MatchAction,
    },
    /// Manage the rule book
    Rules {
        #[clap(subcommand)]
        action: RuleAction,
    },
    /// Restore the default rule book
    #[command(name = "reset-rules")]
    ResetRules,
    /// Print the standings table of a tournament
    Standings { id: String },
    /// Write every collection to a JSON bundle
    Export {
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Load collections from a JSON bundle
    Import {
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Generate shell completions
    Completions { shell: Shell },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
#[clap(rename_all = "lower_case")]
pub enum PlayerAction {
    /// List players, optionally filtered
    List {
        #[arg(short, long)]
        search: Option<String>,
        #[arg(short, long)]
        rank: Option<Rank>,
    },
    /// Register a new player
    Add {
        name: String,
        email: String,
        address: String,
        #[arg(short, long)]
        rank: Option<Rank>,
    },
    /// Delete a player along with their doubles and roster spots
    Remove { id: String },
    /// Import players from a JSON array of rows
    Import { file: PathBuf },
    /// Show ranking statistics
    Stats,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
#[clap(rename_all = "lower_case")]
pub enum TournamentAction {
    List,
    /// Create a tournament in the planning state
    Create {
        name: String,
        #[arg(short = 't', long, default_value = "singles")]
        kind: TournamentType,
        #[arg(short, long, default_value = "round-robin")]
        format: TournamentFormat,
        #[arg(short, long)]
        max: Option<usize>,
    },
    /// Open registration
    Open { id: String },
    /// Register a participant, written as player:<id>, double:<id> or team:<id>
    Register {
        id: String,
        #[arg(value_parser = parse_participant)]
        participant: Participant,
    },
    /// Start the tournament and generate its matches
    Start { id: String },
    /// Finalise standings
    Complete { id: String },
    Cancel { id: String },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
#[clap(rename_all = "lower_case")]
pub enum MatchAction {
    /// List matches, optionally only those of one tournament
    List {
        #[arg(short, long)]
        tournament: Option<String>,
    },
    Start { id: String },
    /// Set the score of the current set
    Score { id: String, score1: i64, score2: i64 },
    /// End the match, optionally naming the winner
    End {
        id: String,
        #[arg(short, long, value_parser = parse_participant)]
        winner: Option<Participant>,
    },
    Cancel {
        id: String,
        #[arg(short, long)]
        reason: Option<String>,
    },
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
#[clap(rename_all = "lower_case")]
pub enum RuleAction {
    /// List active rules by priority
    List,
    /// Restore the default rule book
    Reset,
    Export {
        #[arg(short, long)]
        output: PathBuf,
    },
    Import {
        #[arg(short, long)]
        input: PathBuf,
    },
}

/// Parse `player:<id>`, `double:<id>` or `team:<id>`
pub fn parse_participant(value: &str) -> Result<Participant, String> {
    let (kind, id) = value
        .split_once(':')
        .ok_or_else(|| format!("expected <kind>:<id>, got '{}'", value))?;
    let id = id.trim();
    if id.is_empty() {
        return Err(format!("missing id in '{}'", value));
    }
    match kind.trim().to_lowercase().as_str() {
        "player" => Ok(Participant::Player(PlayerId::from(id))),
        "double" => Ok(Participant::Double(DoubleId::from(id))),
        "team" => Ok(Participant::Team(TeamId::from(id))),
        other => Err(format!("unknown participant kind '{}'", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_participant() {
        assert_eq!(
            parse_participant("team:t1").unwrap(),
            Participant::Team(TeamId::from("t1"))
        );
        assert!(parse_participant("coach:c1").is_err());
        assert!(parse_participant("player:").is_err());
        assert!(parse_participant("p1").is_err());
    }

    #[test]
    fn test_global_storage_flags() {
        let cli = Cli::parse_from(["pingpong-club", "players", "list", "--store", "memory"]);
        assert_eq!(cli.store, Some(StorageBackend::Memory));
        assert_eq!(
            cli.command,
            Command::Players {
                action: PlayerAction::List { search: None, rank: None }
            }
        );
    }
}
