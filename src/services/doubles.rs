use chrono::{DateTime, Utc};
use log::info;
use serde_json::json;

use crate::config::PointsSettings;
use crate::domain::{Collection, Double, DoubleId, MatchOutcome, MatchResult, Opponent, Player, PlayerId};
use crate::errors::{ClubError, ClubResult};
use super::duplicate_ids;
use crate::events::{EventBus, EventKind};
use crate::ranking::Rank;

#[derive(Debug, Clone, Default)]
pub struct DoubleUpdate {
    pub name: Option<String>,
    pub is_active: Option<bool>,
}

pub struct DoubleService {
    doubles: Collection<Double>,
}

impl DoubleService {
    pub fn new(doubles: Vec<Double>) -> Self {
        Self {
            doubles: Collection::from_vec(doubles),
        }
    }

    pub fn doubles(&self) -> &Collection<Double> {
        &self.doubles
    }

    /// Swap in imported doubles whose players all exist.
    pub fn import_all(&mut self, doubles: Vec<Double>, players: &Collection<Player>) -> ClubResult<usize> {
        let mut violations = duplicate_ids(&doubles);
        for double in &doubles {
            if double.player1_id == double.player2_id {
                violations.push(format!("double {} pairs a player with themselves", double.id));
            }
            for player_id in [&double.player1_id, &double.player2_id] {
                if !players.contains(player_id) {
                    violations.push(format!("double {} references unknown player {}", double.id, player_id));
                }
            }
        }
        ClubError::from_violations(violations)?;

        let count = doubles.len();
        self.doubles = Collection::from_vec(doubles);
        Ok(count)
    }

    // --- Commands ---

    /// Pair two existing players; the name defaults to "<p1> & <p2>".
    pub fn create(
        &mut self,
        player1_id: &PlayerId,
        player2_id: &PlayerId,
        name: Option<&str>,
        players: &Collection<Player>,
        now: DateTime<Utc>,
        bus: &mut EventBus,
    ) -> ClubResult<Double> {
        if player1_id == player2_id {
            return Err(ClubError::validation("a double needs two different players"));
        }
        let player1 = players
            .get(player1_id)
            .ok_or_else(|| ClubError::validation(format!("player {} does not exist", player1_id)))?;
        let player2 = players
            .get(player2_id)
            .ok_or_else(|| ClubError::validation(format!("player {} does not exist", player2_id)))?;
        if self.by_pair(player1_id, player2_id).is_some() {
            return Err(ClubError::validation(format!(
                "{} and {} already play as a double",
                player1.name, player2.name
            )));
        }

        let name = match name.map(str::trim).filter(|n| !n.is_empty()) {
            Some(name) => name.to_string(),
            None => Double::default_name(&player1.name, &player2.name),
        };
        let double = Double::new(player1_id.clone(), player2_id.clone(), name, now);
        self.doubles.add(double.clone());

        info!("Created double {} ({})", double.name, double.id);
        bus.publish(EventKind::DoubleCreated, &double);
        Ok(double)
    }

    pub fn update(
        &mut self,
        id: &DoubleId,
        changes: DoubleUpdate,
        now: DateTime<Utc>,
        bus: &mut EventBus,
    ) -> ClubResult<Double> {
        if let Some(name) = &changes.name {
            if name.trim().chars().count() < 2 {
                return Err(ClubError::validation("double name must have at least 2 characters"));
            }
        }
        let double = self.doubles.require_mut(id)?;
        if let Some(name) = changes.name {
            double.name = name.trim().to_string();
        }
        if let Some(is_active) = changes.is_active {
            double.is_active = is_active;
        }
        double.updated_at = now;

        let double = double.clone();
        bus.publish(EventKind::DoubleUpdated, &double);
        Ok(double)
    }

    pub fn delete(&mut self, id: &DoubleId, bus: &mut EventBus) -> ClubResult<Double> {
        let double = self.doubles.remove(id).ok_or_else(|| ClubError::not_found("double", id))?;
        info!("Deleted double {} ({})", double.name, double.id);
        bus.publish(EventKind::DoubleDeleted, &double);
        Ok(double)
    }

    /// Drop every double the player belonged to.
    pub fn remove_for_player(&mut self, player_id: &PlayerId, bus: &mut EventBus) -> Vec<Double> {
        let ids: Vec<DoubleId> = self.by_player(player_id).into_iter().map(|d| d.id.clone()).collect();
        let removed: Vec<Double> = ids.iter().filter_map(|id| self.doubles.remove(id)).collect();
        if !removed.is_empty() {
            info!("Removed {} doubles of deleted player {}", removed.len(), player_id);
            bus.publish(
                EventKind::DoublesAutoDeleted,
                &json!({ "playerId": player_id, "doubles": &removed }),
            );
        }
        removed
    }

    pub fn record_result(
        &mut self,
        id: &DoubleId,
        outcome: MatchOutcome,
        opponent: &Opponent,
        settings: &PointsSettings,
        bus: &mut EventBus,
    ) -> ClubResult<MatchResult> {
        let result = self.doubles.require_mut(id)?.add_match_result(outcome, opponent, settings);
        bus.publish(EventKind::DoubleMatchResult, &json!({ "doubleId": id, "result": &result }));
        Ok(result)
    }

    // --- Queries ---

    pub fn get(&self, id: &DoubleId) -> ClubResult<&Double> {
        self.doubles.require(id)
    }

    pub fn active(&self) -> Vec<&Double> {
        self.doubles.iter().filter(|d| d.is_active).collect()
    }

    pub fn by_player(&self, player_id: &PlayerId) -> Vec<&Double> {
        self.doubles.iter().filter(|d| d.has_player(player_id)).collect()
    }

    pub fn by_pair(&self, a: &PlayerId, b: &PlayerId) -> Option<&Double> {
        self.doubles.iter().find(|d| d.is_same_pair(a, b))
    }

    pub fn partners_of(&self, player_id: &PlayerId) -> Vec<&PlayerId> {
        self.doubles.iter().filter_map(|d| d.partner_of(player_id)).collect()
    }

    pub fn average_rank(&self, id: &DoubleId, players: &Collection<Player>) -> ClubResult<Option<Rank>> {
        let double = self.doubles.require(id)?;
        Ok(Rank::average(
            [&double.player1_id, &double.player2_id]
                .into_iter()
                .filter_map(|player_id| players.get(player_id))
                .map(|p| p.rank),
        ))
    }

    pub fn search(&self, term: &str) -> Vec<&Double> {
        let term = term.trim().to_lowercase();
        self.doubles
            .iter()
            .filter(|d| term.is_empty() || d.name.to_lowercase().contains(&term))
            .collect()
    }

    pub fn top_by_points(&self, limit: usize) -> Vec<&Double> {
        let mut doubles: Vec<&Double> = self.doubles.iter().collect();
        doubles.sort_by(|a, b| b.record.points.cmp(&a.record.points));
        doubles.truncate(limit);
        doubles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn players() -> Collection<Player> {
        let now = Utc::now();
        Collection::from_vec(vec![
            Player::new("Anna", "anna@club.vn", "12 Le Loi", Rank::Professional, now),
            Player::new("Bao", "bao@club.vn", "34 Tran Phu", Rank::Advanced, now),
            Player::new("Chi", "chi@club.vn", "56 Hai Ba Trung", Rank::Beginner, now),
        ])
    }

    #[test]
    fn test_create_uses_default_name_and_rejects_same_pair() {
        let players = players();
        let ids: Vec<PlayerId> = players.iter().map(|p| p.id.clone()).collect();
        let mut bus = EventBus::new();
        let mut service = DoubleService::new(Vec::new());

        let double = service.create(&ids[0], &ids[1], None, &players, Utc::now(), &mut bus).unwrap();
        assert_eq!(double.name, "Anna & Bao");
        assert_eq!(
            service.average_rank(&double.id, &players).unwrap(),
            Some(Rank::Professional)
        );

        let err = service.create(&ids[1], &ids[0], Some("Again"), &players, Utc::now(), &mut bus);
        assert!(matches!(err, Err(ClubError::Validation(_))));
        let err = service.create(&ids[2], &ids[2], None, &players, Utc::now(), &mut bus);
        assert!(matches!(err, Err(ClubError::Validation(_))));
        let missing = PlayerId::from("player_missing");
        assert!(service.create(&ids[0], &missing, None, &players, Utc::now(), &mut bus).is_err());
    }

    #[test]
    fn test_remove_for_player_drops_only_their_doubles() {
        let players = players();
        let ids: Vec<PlayerId> = players.iter().map(|p| p.id.clone()).collect();
        let mut bus = EventBus::new();
        let mut service = DoubleService::new(Vec::new());
        service.create(&ids[0], &ids[1], None, &players, Utc::now(), &mut bus).unwrap();
        service.create(&ids[0], &ids[2], None, &players, Utc::now(), &mut bus).unwrap();
        service.create(&ids[1], &ids[2], None, &players, Utc::now(), &mut bus).unwrap();

        let removed = service.remove_for_player(&ids[0], &mut bus);
        assert_eq!(removed.len(), 2);
        assert_eq!(service.doubles().len(), 1);
        assert_eq!(service.partners_of(&ids[1]), vec![&ids[2]]);
    }
}
