pub mod cli;
pub mod config;
pub mod domain;
pub mod errors;
pub mod events;
pub mod exchange;
pub mod matches;
pub mod ranking;
pub mod rules;
pub mod services;
pub mod storage;
pub mod tournament;

use std::path::Path;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use cli::Cli;
use colored::Colorize;
use log::info;

use crate::cli::{MatchAction, PlayerAction, RuleAction, TournamentAction};
use crate::config::AppConfig;
use crate::domain::{MatchId, PlayerId, TournamentId};
use crate::exchange::{ExportBundle, RuleBook};
use crate::services::{Club, NewPlayer, NewTournament};

pub fn interpret() -> Cli {
    Cli::parse()
}

/// Environment settings with command-line overrides applied
pub fn load_config(cli: &Cli) -> Result<AppConfig> {
    Ok(AppConfig::from_env()?.with_storage(cli.store, cli.data.clone()))
}

pub fn handle_init(config: AppConfig, reset: bool) -> Result<()> {
    let mut club = Club::open(config)?;
    if reset {
        club.reset_all()?;
    }
    println!(
        "{} {} rules ready in {}",
        "Initialised:".green().bold(),
        club.rules().len(),
        club.config().storage.path.display()
    );
    Ok(())
}

pub fn handle_players(config: AppConfig, action: &PlayerAction) -> Result<()> {
    let mut club = Club::open(config)?;
    match action {
        PlayerAction::List { search, rank } => {
            let players = club.players().search(search.as_deref().unwrap_or(""), *rank);
            for player in players {
                println!(
                    "{}  {:<24} {:<14} {:>5} pts  {}",
                    player.id,
                    player.name.bold(),
                    player.rank,
                    player.record.points,
                    player.email
                );
            }
        }
        PlayerAction::Add {
            name,
            email,
            address,
            rank,
        } => {
            let player = club.create_player(NewPlayer {
                name: name.clone(),
                email: email.clone(),
                address: address.clone(),
                rank: *rank,
            })?;
            println!("{} {} ({})", "Created".green(), player.name, player.id);
        }
        PlayerAction::Remove { id } => {
            let removal = club.delete_player(&PlayerId::from(id.as_str()))?;
            println!(
                "{} {}, {} doubles removed, {} teams deactivated",
                "Deleted".yellow(),
                removal.player.name,
                removal.removed_doubles.len(),
                removal.teams.deactivated.len()
            );
        }
        PlayerAction::Import { file } => {
            let rows: Vec<NewPlayer> = read_json_file(file)?;
            let report = club.import_players(rows)?;
            println!("{} {} players", "Imported".green(), report.imported.len());
            for error in &report.errors {
                println!("{} row {}: {}", "Rejected".red(), error.row, error.message);
            }
        }
        PlayerAction::Stats => {
            let stats = club.players().statistics();
            println!("{}", serde_json::to_string_pretty(&stats)?);
        }
    }
    Ok(())
}

pub fn handle_tournaments(config: AppConfig, action: &TournamentAction) -> Result<()> {
    let mut club = Club::open(config)?;
    match action {
        TournamentAction::List => {
            for tournament in club.tournaments().tournaments().iter() {
                println!(
                    "{}  {:<28} {:<12} {:<18} {}/{}",
                    tournament.id,
                    tournament.name.bold(),
                    tournament.status,
                    tournament.format.as_str(),
                    tournament.participants.len(),
                    tournament.max_participants
                );
            }
        }
        TournamentAction::Create {
            name,
            kind,
            format,
            max,
        } => {
            let mut input = NewTournament::named(name, *kind, *format);
            input.max_participants = *max;
            let tournament = club.create_tournament(input)?;
            println!("{} {} ({})", "Created".green(), tournament.name, tournament.id);
        }
        TournamentAction::Open { id } => {
            let tournament = club.open_registration(&TournamentId::from(id.as_str()))?;
            println!("Registration open for {}", tournament.name);
        }
        TournamentAction::Register { id, participant } => {
            let tournament = club.register(&TournamentId::from(id.as_str()), participant.clone())?;
            println!(
                "{} {} ({}/{})",
                "Registered in".green(),
                tournament.name,
                tournament.participants.len(),
                tournament.max_participants
            );
        }
        TournamentAction::Start { id } => {
            let (tournament, generated) = club.start_tournament(&TournamentId::from(id.as_str()))?;
            println!("{} {} with {} matches", "Started".green(), tournament.name, generated.len());
        }
        TournamentAction::Complete { id } => {
            let tournament = club.complete_tournament(&TournamentId::from(id.as_str()))?;
            println!("{} {}", "Completed".green(), tournament.name);
            print_standings(&club, &tournament.id)?;
        }
        TournamentAction::Cancel { id } => {
            let tournament = club.cancel_tournament(&TournamentId::from(id.as_str()))?;
            println!("{} {}", "Cancelled".yellow(), tournament.name);
        }
    }
    Ok(())
}

pub fn handle_matches(config: AppConfig, action: &MatchAction) -> Result<()> {
    let mut club = Club::open(config)?;
    match action {
        MatchAction::List { tournament } => {
            let directory = club.directory();
            let listed = match tournament {
                Some(id) => club.matches().by_tournament(&TournamentId::from(id.as_str())),
                None => club.matches().matches().iter().collect(),
            };
            for listed_match in listed {
                println!(
                    "{}  {:<11} {} vs {}  {}",
                    listed_match.id,
                    listed_match.status,
                    directory.label(&listed_match.participant1),
                    directory.label(&listed_match.participant2),
                    listed_match.score.summary_for(crate::domain::Side::One)
                );
            }
        }
        MatchAction::Start { id } => {
            club.start_match(&MatchId::from(id.as_str()))?;
            println!("{} {}", "Started".green(), id);
        }
        MatchAction::Score { id, score1, score2 } => {
            let (updated, outcome) = club.record_score(&MatchId::from(id.as_str()), *score1, *score2)?;
            println!("{:?}: {}", outcome, updated.score.summary_for(crate::domain::Side::One));
        }
        MatchAction::End { id, winner } => {
            let ended = club.end_match(&MatchId::from(id.as_str()), winner.as_ref())?;
            let winner = ended
                .winner
                .as_ref()
                .map(|w| club.directory().label(w))
                .unwrap_or_else(|| "nobody".to_string());
            println!("{} {}, winner {}", "Ended".green(), ended.id, winner);
        }
        MatchAction::Cancel { id, reason } => {
            club.cancel_match(&MatchId::from(id.as_str()), reason.as_deref())?;
            println!("{} {}", "Cancelled".yellow(), id);
        }
    }
    Ok(())
}

pub fn handle_rules(config: AppConfig, action: &RuleAction) -> Result<()> {
    let mut club = Club::open(config)?;
    match action {
        RuleAction::List => {
            for rule in club.rules().active_by_priority() {
                println!("{:>3}  {:<32} {}", rule.priority, rule.name.bold(), rule.value);
            }
        }
        RuleAction::Reset => {
            club.reset_rules()?;
            println!("{} {} default rules", "Restored".green(), club.rules().len());
        }
        RuleAction::Export { output } => {
            club.export_rules().write_to(output)?;
            println!("{} rules to {}", "Exported".green(), output.display());
        }
        RuleAction::Import { input } => {
            let count = club.import_rules(RuleBook::read_from(input)?)?;
            println!("{} {} rules", "Imported".green(), count);
        }
    }
    Ok(())
}

pub fn handle_standings(config: AppConfig, id: &str) -> Result<()> {
    let club = Club::open(config)?;
    print_standings(&club, &TournamentId::from(id))
}

pub fn handle_export(config: AppConfig, output: &Path) -> Result<()> {
    let club = Club::open(config)?;
    let bundle = club.export_bundle();
    bundle.write_to(output)?;
    info!("Exported bundle to {}", output.display());
    println!("{} {}", "Exported to".green(), output.display());
    Ok(())
}

pub fn handle_import(config: AppConfig, input: &Path) -> Result<()> {
    let mut club = Club::open(config)?;
    let results = club.import_bundle(ExportBundle::read_from(input)?)?;
    for (collection, count) in &results.imported {
        println!("{} {:<12} {}", "ok".green(), collection, count);
    }
    for (collection, error) in &results.errors {
        println!("{} {:<12} {}", "failed".red(), collection, error);
    }
    Ok(())
}

pub fn handle_completions(shell: clap_complete::Shell) -> Result<()> {
    let mut command = Cli::command();
    let name = command.get_name().to_string();
    clap_complete::generate(shell, &mut command, name, &mut std::io::stdout());
    Ok(())
}

fn print_standings(club: &Club, id: &TournamentId) -> Result<()> {
    let standings = club.standings(id)?;
    let directory = club.directory();
    println!(
        "{}",
        format!(
            "{:>3}  {:<28} {:>3} {:>3} {:>3} {:>5} {:>7}",
            "#", "participant", "P", "W", "L", "pts", "sets"
        )
        .bold()
    );
    for (position, entry) in standings.iter().enumerate() {
        let place = entry.final_rank.unwrap_or(position as u32 + 1);
        let line = format!(
            "{:>3}  {:<28} {:>3} {:>3} {:>3} {:>5} {:>3}-{:<3}",
            place,
            directory.label(&entry.participant),
            entry.matches_played,
            entry.wins,
            entry.losses,
            entry.points,
            entry.sets_won,
            entry.sets_lost
        );
        if place == 1 {
            println!("{}", line.yellow().bold());
        } else {
            println!("{}", line);
        }
    }
    Ok(())
}

fn read_json_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {}", path.display()))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse JSON from {}", path.display()))
}
