use std::collections::{BTreeMap, BTreeSet};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use log::{debug, info};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::PointsSettings;
use crate::domain::{Collection, MatchOutcome, MatchResult, Opponent, Player, PlayerId};
use crate::errors::{ClubError, ClubResult};
use super::duplicate_ids;
use crate::events::{EventBus, EventKind};
use crate::ranking::Rank;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPlayer {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub rank: Option<Rank>,
}

#[derive(Debug, Clone, Default)]
pub struct PlayerUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub rank: Option<Rank>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportError {
    /// 1-based row in the imported list
    pub row: usize,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub imported: Vec<PlayerId>,
    pub errors: Vec<ImportError>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStatistics {
    pub total_players: usize,
    pub by_rank: BTreeMap<Rank, usize>,
    pub total_matches: u32,
    pub total_points: u32,
    pub average_points: f64,
    pub average_win_rate: f64,
}

/// Player registry with unique, validated emails
pub struct PlayerService {
    players: Collection<Player>,
    email_pattern: Regex,
}

impl PlayerService {
    pub fn new(players: Vec<Player>) -> Result<Self> {
        Ok(Self {
            players: Collection::from_vec(players),
            email_pattern: Self::compile_regex()?,
        })
    }

    pub fn players(&self) -> &Collection<Player> {
        &self.players
    }

    /// Swap in an imported player list after validating every entry.
    pub fn import_all(&mut self, players: Vec<Player>) -> ClubResult<usize> {
        let mut violations = duplicate_ids(&players);
        let mut emails = BTreeSet::new();
        for player in &players {
            violations.extend(
                player
                    .validate(&self.email_pattern)
                    .into_iter()
                    .map(|v| format!("player {}: {}", player.id, v)),
            );
            if !emails.insert(player.email.to_lowercase()) {
                violations.push(format!("email {} is used twice", player.email));
            }
        }
        ClubError::from_violations(violations)?;

        let count = players.len();
        self.players = Collection::from_vec(players);
        Ok(count)
    }

    // --- Commands ---

    pub fn create(&mut self, input: NewPlayer, now: DateTime<Utc>, bus: &mut EventBus) -> ClubResult<Player> {
        let player = self.insert(input, now)?;
        info!("Created player {} ({})", player.name, player.id);
        bus.publish(EventKind::PlayerCreated, &player);
        Ok(player)
    }

    pub fn update(
        &mut self,
        id: &PlayerId,
        changes: PlayerUpdate,
        now: DateTime<Utc>,
        bus: &mut EventBus,
    ) -> ClubResult<Player> {
        let mut candidate = self.players.require(id)?.clone();
        if let Some(name) = changes.name {
            candidate.name = name.trim().to_string();
        }
        if let Some(email) = changes.email {
            candidate.email = email.trim().to_string();
        }
        if let Some(address) = changes.address {
            candidate.address = address.trim().to_string();
        }
        if let Some(rank) = changes.rank {
            candidate.rank = rank;
        }
        candidate.updated_at = now;
        self.check(&candidate)?;

        self.players.add(candidate.clone());
        bus.publish(EventKind::PlayerUpdated, &candidate);
        Ok(candidate)
    }

    /// Remove the player only; dependent doubles and teams are handled by the caller.
    pub fn delete(&mut self, id: &PlayerId, bus: &mut EventBus) -> ClubResult<Player> {
        let player = self.players.remove(id).ok_or_else(|| ClubError::not_found("player", id))?;
        info!("Deleted player {} ({})", player.name, player.id);
        bus.publish(EventKind::PlayerDeleted, &player);
        Ok(player)
    }

    /// Create every valid row; invalid rows are reported and skipped.
    pub fn import(&mut self, rows: Vec<NewPlayer>, now: DateTime<Utc>, bus: &mut EventBus) -> ImportReport {
        let mut report = ImportReport::default();
        for (index, row) in rows.into_iter().enumerate() {
            match self.insert(row, now) {
                Ok(player) => report.imported.push(player.id),
                Err(err) => report.errors.push(ImportError {
                    row: index + 1,
                    message: err.to_string(),
                }),
            }
        }
        info!("Imported {} players, {} rows rejected", report.imported.len(), report.errors.len());
        bus.publish(EventKind::PlayersImported, &report);
        report
    }

    /// Apply a finished match to the player's record; the flag reports a rank tier change.
    pub fn record_result(
        &mut self,
        id: &PlayerId,
        outcome: MatchOutcome,
        opponent: &Opponent,
        settings: &PointsSettings,
        bus: &mut EventBus,
    ) -> ClubResult<(MatchResult, bool)> {
        let player = self.players.require_mut(id)?;
        let previous = player.rank;
        let result = player.add_match_result(outcome, opponent, settings);
        let rank_changed = player.update_rank(settings);

        bus.publish(EventKind::PlayerMatchResult, &json!({ "playerId": id, "result": &result }));
        if rank_changed {
            debug!("Player {} moved from {} to {}", player.name, previous, player.rank);
            bus.publish(
                EventKind::PlayerRankChanged,
                &json!({ "playerId": id, "oldRank": previous, "newRank": player.rank }),
            );
        }
        Ok((result, rank_changed))
    }

    // --- Queries ---

    pub fn get(&self, id: &PlayerId) -> ClubResult<&Player> {
        self.players.require(id)
    }

    pub fn by_email(&self, email: &str) -> Option<&Player> {
        let email = email.trim();
        self.players.iter().find(|p| p.email.eq_ignore_ascii_case(email))
    }

    pub fn search(&self, term: &str, rank: Option<Rank>) -> Vec<&Player> {
        let term = term.trim();
        self.players
            .iter()
            .filter(|p| rank.is_none_or(|rank| p.rank == rank))
            .filter(|p| term.is_empty() || p.matches_search(term))
            .collect()
    }

    pub fn by_rank(&self, rank: Rank) -> Vec<&Player> {
        self.players.iter().filter(|p| p.rank == rank).collect()
    }

    pub fn top_by_points(&self, limit: usize) -> Vec<&Player> {
        let mut players: Vec<&Player> = self.players.iter().collect();
        players.sort_by(|a, b| b.record.points.cmp(&a.record.points));
        players.truncate(limit);
        players
    }

    /// Best win rates among players with at least `min_matches` played
    pub fn top_by_win_rate(&self, limit: usize, min_matches: u32) -> Vec<&Player> {
        let mut players: Vec<&Player> = self
            .players
            .iter()
            .filter(|p| p.record.matches_played >= min_matches)
            .collect();
        players.sort_by(|a, b| {
            b.record
                .win_rate
                .cmp(&a.record.win_rate)
                .then_with(|| b.record.matches_played.cmp(&a.record.matches_played))
        });
        players.truncate(limit);
        players
    }

    pub fn statistics(&self) -> PlayerStatistics {
        let mut stats = PlayerStatistics {
            total_players: self.players.len(),
            by_rank: Rank::ALL.into_iter().map(|rank| (rank, 0)).collect(),
            ..PlayerStatistics::default()
        };
        if self.players.is_empty() {
            return stats;
        }

        let mut win_rates = 0u32;
        for player in self.players.iter() {
            *stats.by_rank.entry(player.rank).or_insert(0) += 1;
            stats.total_matches += player.record.matches_played;
            stats.total_points += player.record.points;
            win_rates += player.record.win_rate;
        }
        let count = self.players.len() as f64;
        stats.average_points = round_tenth(f64::from(stats.total_points) / count);
        stats.average_win_rate = round_tenth(f64::from(win_rates) / count);
        stats
    }

    pub fn recent_history(&self, id: &PlayerId, limit: usize) -> ClubResult<Vec<&MatchResult>> {
        Ok(self.players.require(id)?.record.recent(limit))
    }

    // --- Helpers ---

    fn insert(&mut self, input: NewPlayer, now: DateTime<Utc>) -> ClubResult<Player> {
        let player = Player::new(
            &input.name,
            &input.email,
            &input.address,
            input.rank.unwrap_or_default(),
            now,
        );
        self.check(&player)?;
        self.players.add(player.clone());
        Ok(player)
    }

    fn check(&self, candidate: &Player) -> ClubResult<()> {
        let mut violations = candidate.validate(&self.email_pattern);
        if let Some(existing) = self.by_email(&candidate.email) {
            if existing.id != candidate.id {
                violations.push(format!("email {} is already registered", candidate.email));
            }
        }
        ClubError::from_violations(violations)
    }

    fn compile_regex() -> Result<Regex> {
        Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").context("Failed to compile email regex")
    }
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MatchType;

    fn new_player(name: &str, email: &str) -> NewPlayer {
        NewPlayer {
            name: name.into(),
            email: email.into(),
            address: "12 Nguyen Hue".into(),
            rank: None,
        }
    }

    fn service() -> PlayerService {
        PlayerService::new(Vec::new()).unwrap()
    }

    #[test]
    fn test_create_rejects_duplicate_email() {
        let mut bus = EventBus::new();
        let mut service = service();
        service.create(new_player("Anna", "anna@club.vn"), Utc::now(), &mut bus).unwrap();

        let err = service
            .create(new_player("Anna Two", "ANNA@club.vn"), Utc::now(), &mut bus)
            .unwrap_err();
        assert!(matches!(err, ClubError::Validation(_)));
        assert_eq!(service.players().len(), 1);
        assert_eq!(bus.published_count(), 1);
    }

    #[test]
    fn test_update_keeps_player_when_invalid() {
        let mut bus = EventBus::new();
        let mut service = service();
        let anna = service.create(new_player("Anna", "anna@club.vn"), Utc::now(), &mut bus).unwrap();

        let changes = PlayerUpdate {
            email: Some("broken".into()),
            ..PlayerUpdate::default()
        };
        assert!(service.update(&anna.id, changes, Utc::now(), &mut bus).is_err());
        assert_eq!(service.get(&anna.id).unwrap().email, "anna@club.vn");
    }

    #[test]
    fn test_import_reports_rejected_rows() {
        let mut bus = EventBus::new();
        let mut service = service();
        let rows = vec![
            new_player("Anna", "anna@club.vn"),
            new_player("B", "bad"),
            new_player("Chi", "anna@club.vn"),
            new_player("Dung", "dung@club.vn"),
        ];
        let report = service.import(rows, Utc::now(), &mut bus);

        assert_eq!(report.imported.len(), 2);
        let rows: Vec<usize> = report.errors.iter().map(|e| e.row).collect();
        assert_eq!(rows, vec![2, 3]);
    }

    #[test]
    fn test_record_result_announces_rank_change() {
        let mut bus = EventBus::new();
        let mut service = service();
        let anna = service.create(new_player("Anna", "anna@club.vn"), Utc::now(), &mut bus).unwrap();
        service.players.require_mut(&anna.id).unwrap().record.points = 195;

        let opponent = Opponent {
            participant: crate::domain::Participant::Player("player_x".into()),
            name: "X".into(),
            rank: Some(Rank::Beginner),
            points: 0,
        };
        let outcome = MatchOutcome {
            match_id: None,
            is_win: true,
            match_type: MatchType::Singles,
            score: "3-0".into(),
            date: Utc::now(),
        };
        let (result, changed) = service
            .record_result(&anna.id, outcome, &opponent, &PointsSettings::default(), &mut bus)
            .unwrap();

        assert_eq!(result.points_earned, 10);
        assert!(changed);
        assert_eq!(service.get(&anna.id).unwrap().rank, Rank::Intermediate);
    }

    #[test]
    fn test_rankings_and_statistics() {
        let mut bus = EventBus::new();
        let mut service = service();
        let anna = service.create(new_player("Anna", "anna@club.vn"), Utc::now(), &mut bus).unwrap();
        let bo = service.create(new_player("Bao", "bao@club.vn"), Utc::now(), &mut bus).unwrap();
        {
            let record = &mut service.players.require_mut(&bo.id).unwrap().record;
            record.points = 40;
            record.matches_played = 4;
            record.matches_won = 3;
            record.matches_lost = 1;
            record.win_rate = 75;
        }

        assert_eq!(service.top_by_points(1)[0].id, bo.id);
        assert_eq!(service.top_by_win_rate(5, 1).len(), 1);
        assert_eq!(service.search("", Some(Rank::Beginner)).len(), 2);
        assert_eq!(service.search("anna", None)[0].id, anna.id);

        let stats = service.statistics();
        assert_eq!(stats.total_players, 2);
        assert_eq!(stats.by_rank[&Rank::Beginner], 2);
        assert_eq!(stats.average_points, 20.0);
        assert_eq!(stats.average_win_rate, 37.5);
    }
}
