use anyhow::Result;

use pingpong_club::cli::{Cli, Command, RuleAction};
use pingpong_club::{
    handle_completions, handle_export, handle_import, handle_init, handle_matches, handle_players, handle_rules,
    handle_standings, handle_tournaments, interpret, load_config,
};

fn main() {
    setup_logging();
    parse_and_execute().unwrap_or_else(|e| {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    });
}

fn setup_logging() {
    sensible_env_logger::init!();
}

fn parse_and_execute() -> Result<()> {
    let cli = interpret();
    execute_command(&cli)
}

fn execute_command(cli: &Cli) -> Result<()> {
    if let Command::Completions { shell } = &cli.command {
        return handle_completions(*shell);
    }

    let config = load_config(cli)?;
    match &cli.command {
        Command::Init { reset } => handle_init(config, *reset),
        Command::Players { action } => handle_players(config, action),
        Command::Tournaments { action } => handle_tournaments(config, action),
        Command::Matches { action } => handle_matches(config, action),
        Command::Rules { action } => handle_rules(config, action),
        Command::ResetRules => handle_rules(config, &RuleAction::Reset),
        Command::Standings { id } => handle_standings(config, id),
        Command::Export { output } => handle_export(config, output),
        Command::Import { input } => handle_import(config, input),
        Command::Completions { shell } => handle_completions(*shell),
    }
}
