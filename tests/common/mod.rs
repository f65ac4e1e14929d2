#![allow(dead_code)]

use pingpong_club::config::AppConfig;
use pingpong_club::domain::Player;
use pingpong_club::domain::MatchId;
use pingpong_club::matches::{Match, ScoreOutcome};
use pingpong_club::services::{Club, NewPlayer};

pub fn club() -> Club {
    Club::in_memory(AppConfig::new()).unwrap()
}

pub fn sign_up(club: &mut Club, name: &str) -> Player {
    club.create_player(NewPlayer {
        name: name.to_string(),
        email: format!("{}@club.test", name.to_lowercase()),
        address: "12 Club Street".to_string(),
        rank: None,
    })
    .unwrap()
}

/// Start the match and let side one take three straight sets.
pub fn play_out(club: &mut Club, id: &MatchId) -> Match {
    club.start_match(id).unwrap();
    let mut last = None;
    for _ in 0..3 {
        last = Some(club.record_score(id, 11, 4).unwrap());
    }
    let (finished, outcome) = last.unwrap();
    assert!(matches!(outcome, ScoreOutcome::MatchClosed { .. }));
    finished
}
