use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use log::{info, warn};
use serde::Serialize;
use serde_json::json;

use crate::config::PointsSettings;
use crate::domain::{
    Collection, MAX_TEAM_SIZE, MIN_TEAM_SIZE, MatchOutcome, MatchResult, Opponent, Player, PlayerId, Team, TeamId,
};
use crate::errors::{ClubError, ClubResult};
use super::duplicate_ids;
use crate::events::{EventBus, EventKind};
use crate::ranking::Rank;

#[derive(Debug, Clone, Default)]
pub struct NewTeam {
    pub name: String,
    /// First player becomes captain
    pub player_ids: Vec<PlayerId>,
    pub description: String,
}

#[derive(Debug, Clone, Default)]
pub struct TeamUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

/// Teams touched when a player leaves the club
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterChanges {
    pub updated: Vec<TeamId>,
    pub deactivated: Vec<TeamId>,
}

impl RosterChanges {
    pub fn is_empty(&self) -> bool {
        self.updated.is_empty() && self.deactivated.is_empty()
    }
}

pub struct TeamService {
    teams: Collection<Team>,
}

impl TeamService {
    pub fn new(teams: Vec<Team>) -> Self {
        Self {
            teams: Collection::from_vec(teams),
        }
    }

    pub fn teams(&self) -> &Collection<Team> {
        &self.teams
    }

    /// Swap in imported teams; inactive teams may carry a short roster.
    pub fn import_all(&mut self, teams: Vec<Team>, players: &Collection<Player>) -> ClubResult<usize> {
        let mut violations = duplicate_ids(&teams);
        for team in &teams {
            if team.player_ids.len() > MAX_TEAM_SIZE || (team.is_active && !team.has_minimum_players()) {
                violations.push(format!("team {} has {} players", team.name, team.player_ids.len()));
            }
            if let Some(missing) = team.player_ids.iter().find(|id| !players.contains(id)) {
                violations.push(format!("team {} references unknown player {}", team.name, missing));
            }
        }
        ClubError::from_violations(violations)?;

        let count = teams.len();
        self.teams = Collection::from_vec(teams);
        Ok(count)
    }

    // --- Commands ---

    pub fn create(
        &mut self,
        input: NewTeam,
        players: &Collection<Player>,
        now: DateTime<Utc>,
        bus: &mut EventBus,
    ) -> ClubResult<Team> {
        let mut team = Team::new(&input.name, input.player_ids, now);
        team.description = input.description.trim().to_string();

        let mut violations = self.check_name(&team.name, None);
        violations.extend(self.check_roster(&team, players));
        ClubError::from_violations(violations)?;

        self.teams.add(team.clone());
        info!("Created team {} with {} players", team.name, team.player_ids.len());
        bus.publish(EventKind::TeamCreated, &team);
        Ok(team)
    }

    pub fn update(
        &mut self,
        id: &TeamId,
        changes: TeamUpdate,
        players: &Collection<Player>,
        now: DateTime<Utc>,
        bus: &mut EventBus,
    ) -> ClubResult<Team> {
        let mut candidate = self.teams.require(id)?.clone();
        let reactivating = changes.is_active == Some(true) && !candidate.is_active;
        if let Some(name) = changes.name {
            candidate.name = name.trim().to_string();
        }
        if let Some(description) = changes.description {
            candidate.description = description.trim().to_string();
        }
        if let Some(is_active) = changes.is_active {
            candidate.is_active = is_active;
        }
        candidate.updated_at = now;

        let mut violations = self.check_name(&candidate.name, Some(id));
        if reactivating {
            violations.extend(self.check_roster(&candidate, players));
        }
        ClubError::from_violations(violations)?;

        self.teams.add(candidate.clone());
        bus.publish(EventKind::TeamUpdated, &candidate);
        Ok(candidate)
    }

    pub fn delete(&mut self, id: &TeamId, bus: &mut EventBus) -> ClubResult<Team> {
        let team = self.teams.remove(id).ok_or_else(|| ClubError::not_found("team", id))?;
        info!("Deleted team {} ({})", team.name, team.id);
        bus.publish(EventKind::TeamDeleted, &team);
        Ok(team)
    }

    pub fn add_player(
        &mut self,
        id: &TeamId,
        player_id: &PlayerId,
        players: &Collection<Player>,
        now: DateTime<Utc>,
        bus: &mut EventBus,
    ) -> ClubResult<Team> {
        if !players.contains(player_id) {
            return Err(ClubError::validation(format!("player {} does not exist", player_id)));
        }
        if let Some(other) = self.active_team_of(player_id) {
            if &other.id != id {
                return Err(ClubError::validation(format!(
                    "player {} already plays for team {}",
                    player_id, other.name
                )));
            }
        }
        let team = self.teams.require_mut(id)?;
        team.add_player(player_id.clone(), now)?;

        let team = team.clone();
        bus.publish(
            EventKind::PlayerAddedToTeam,
            &json!({ "teamId": id, "playerId": player_id }),
        );
        Ok(team)
    }

    /// Remove a member; the team is deactivated when it drops below the minimum roster.
    pub fn remove_player(
        &mut self,
        id: &TeamId,
        player_id: &PlayerId,
        now: DateTime<Utc>,
        bus: &mut EventBus,
    ) -> ClubResult<Team> {
        let team = self.teams.require_mut(id)?;
        if !team.remove_player(player_id, now) {
            return Err(ClubError::validation(format!("player {} is not in team {}", player_id, team.name)));
        }
        if !team.has_minimum_players() && team.is_active {
            warn!("Team {} fell below {} players and was deactivated", team.name, MIN_TEAM_SIZE);
            team.is_active = false;
        }

        let team = team.clone();
        bus.publish(
            EventKind::PlayerRemovedFromTeam,
            &json!({ "teamId": id, "playerId": player_id }),
        );
        Ok(team)
    }

    pub fn set_captain(
        &mut self,
        id: &TeamId,
        player_id: &PlayerId,
        now: DateTime<Utc>,
        bus: &mut EventBus,
    ) -> ClubResult<Team> {
        let team = self.teams.require_mut(id)?;
        team.set_captain(player_id, now)?;

        let team = team.clone();
        bus.publish(
            EventKind::TeamCaptainChanged,
            &json!({ "teamId": id, "captainId": player_id }),
        );
        Ok(team)
    }

    /// Take a deleted player off every roster, deactivating teams left short.
    pub fn remove_player_everywhere(
        &mut self,
        player_id: &PlayerId,
        now: DateTime<Utc>,
        bus: &mut EventBus,
    ) -> RosterChanges {
        let mut changes = RosterChanges::default();
        for team in self.teams.iter_mut() {
            if !team.remove_player(player_id, now) {
                continue;
            }
            if team.has_minimum_players() {
                changes.updated.push(team.id.clone());
            } else {
                team.is_active = false;
                changes.deactivated.push(team.id.clone());
            }
        }
        if !changes.is_empty() {
            info!(
                "Player {} left {} teams, {} deactivated",
                player_id,
                changes.updated.len() + changes.deactivated.len(),
                changes.deactivated.len()
            );
            bus.publish(EventKind::TeamsAutoModified, &changes);
        }
        changes
    }

    pub fn record_result(
        &mut self,
        id: &TeamId,
        outcome: MatchOutcome,
        opponent: &Opponent,
        settings: &PointsSettings,
        bus: &mut EventBus,
    ) -> ClubResult<MatchResult> {
        let result = self.teams.require_mut(id)?.add_match_result(outcome, opponent, settings);
        bus.publish(EventKind::TeamMatchResult, &json!({ "teamId": id, "result": &result }));
        Ok(result)
    }

    // --- Queries ---

    pub fn get(&self, id: &TeamId) -> ClubResult<&Team> {
        self.teams.require(id)
    }

    pub fn by_name(&self, name: &str) -> Option<&Team> {
        let lowered = name.trim().to_lowercase();
        self.teams.iter().find(|t| t.name.to_lowercase() == lowered)
    }

    pub fn active(&self) -> Vec<&Team> {
        self.teams.iter().filter(|t| t.is_active).collect()
    }

    pub fn by_player(&self, player_id: &PlayerId) -> Vec<&Team> {
        self.teams.iter().filter(|t| t.has_player(player_id)).collect()
    }

    pub fn active_team_of(&self, player_id: &PlayerId) -> Option<&Team> {
        self.teams.iter().find(|t| t.is_active && t.has_player(player_id))
    }

    /// Mean points of the current members
    pub fn strength(&self, id: &TeamId, players: &Collection<Player>) -> ClubResult<f64> {
        let team = self.teams.require(id)?;
        let points: Vec<u32> = team
            .player_ids
            .iter()
            .filter_map(|player_id| players.get(player_id))
            .map(|p| p.record.points)
            .collect();
        if points.is_empty() {
            return Ok(0.0);
        }
        Ok(points.iter().map(|p| f64::from(*p)).sum::<f64>() / points.len() as f64)
    }

    pub fn average_rank(&self, id: &TeamId, players: &Collection<Player>) -> ClubResult<Option<Rank>> {
        let team = self.teams.require(id)?;
        Ok(Rank::average(
            team.player_ids
                .iter()
                .filter_map(|player_id| players.get(player_id))
                .map(|p| p.rank),
        ))
    }

    pub fn search(&self, term: &str) -> Vec<&Team> {
        let term = term.trim().to_lowercase();
        self.teams
            .iter()
            .filter(|t| {
                term.is_empty() || t.name.to_lowercase().contains(&term) || t.description.to_lowercase().contains(&term)
            })
            .collect()
    }

    // --- Helpers ---

    fn check_name(&self, name: &str, except: Option<&TeamId>) -> Vec<String> {
        let mut violations = Vec::new();
        if name.chars().count() < 2 {
            violations.push("team name must have at least 2 characters".to_string());
        }
        if let Some(existing) = self.by_name(name) {
            if Some(&existing.id) != except {
                violations.push(format!("team name {} is already taken", name));
            }
        }
        violations
    }

    fn check_roster(&self, team: &Team, players: &Collection<Player>) -> Vec<String> {
        let mut violations = Vec::new();
        let size = team.player_ids.len();
        if !(MIN_TEAM_SIZE..=MAX_TEAM_SIZE).contains(&size) {
            violations.push(format!(
                "a team needs {} to {} players, got {}",
                MIN_TEAM_SIZE, MAX_TEAM_SIZE, size
            ));
        }
        let distinct: BTreeSet<&str> = team.player_ids.iter().map(|id| id.as_str()).collect();
        if distinct.len() != size {
            violations.push("team players must be distinct".to_string());
        }
        for player_id in &team.player_ids {
            if !players.contains(player_id) {
                violations.push(format!("player {} does not exist", player_id));
            } else if let Some(other) = self.active_team_of(player_id) {
                if other.id != team.id {
                    violations.push(format!("player {} already plays for team {}", player_id, other.name));
                }
            }
        }
        violations
    }
}
