use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use log::{info, warn};
use serde::Serialize;

use super::directory::ParticipantDirectory;
use super::doubles::{DoubleService, DoubleUpdate};
use super::matches::{MatchService, MatchUpdate, NewMatch};
use super::players::{ImportReport, NewPlayer, PlayerService, PlayerUpdate};
use super::rules::RuleService;
use super::teams::{NewTeam, RosterChanges, TeamService, TeamUpdate};
use super::tournaments::{NewTournament, TournamentService, TournamentUpdate};
use crate::config::AppConfig;
use crate::domain::{
    Double, DoubleId, MatchId, MatchOutcome, MatchType, Participant, Player, PlayerId, Record, Side, Team, TeamId,
    TournamentId, from_records, to_records,
};
use crate::errors::{ClubError, storage_context};
use crate::events::EventBus;
use crate::exchange::{ExportBundle, ImportResults, RuleBook};
use crate::matches::{Match, ScheduleSlot, ScoreOutcome};
use crate::rules::{NewRule, Rule, RuleSet, RuleUpdate, ValidationContext, ValidationReport};
use crate::storage::{CollectionKey, MemoryStore, Store, open_store};
use crate::tournament::{Progress, StandingEntry, Tournament};

/// What a player deletion took with it
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRemoval {
    pub player: Player,
    pub removed_doubles: Vec<DoubleId>,
    pub teams: RosterChanges,
}

/// Application root: owns the registries, the rule book, the event bus and the store.
///
/// Every command validates through the services first, then persists only
/// the collections it touched.
pub struct Club {
    config: AppConfig,
    store: Box<dyn Store>,
    bus: EventBus,
    players: PlayerService,
    doubles: DoubleService,
    teams: TeamService,
    matches: MatchService,
    tournaments: TournamentService,
    rules: RuleService,
}

impl Club {
    pub fn open(config: AppConfig) -> Result<Self> {
        let store = open_store(&config.storage)?;
        Self::with_store(config, store)
    }

    pub fn in_memory(config: AppConfig) -> Result<Self> {
        Self::with_store(config, Box::new(MemoryStore::new()))
    }

    pub fn with_store(config: AppConfig, store: Box<dyn Store>) -> Result<Self> {
        let players = load::<Player>(store.as_ref(), CollectionKey::Players)?.unwrap_or_default();
        let doubles = load::<Double>(store.as_ref(), CollectionKey::Doubles)?.unwrap_or_default();
        let teams = load::<Team>(store.as_ref(), CollectionKey::Teams)?.unwrap_or_default();
        let tournaments = load::<Tournament>(store.as_ref(), CollectionKey::Tournaments)?.unwrap_or_default();
        let matches = load::<Match>(store.as_ref(), CollectionKey::Matches)?.unwrap_or_default();
        let stored_rules = load::<Rule>(store.as_ref(), CollectionKey::Rules)?.filter(|rules| !rules.is_empty());

        let seed_rules = stored_rules.is_none();
        let rules = match stored_rules {
            Some(rules) => RuleSet::new(rules),
            None => RuleSet::with_defaults(Utc::now()),
        };

        let mut club = Self {
            config,
            store,
            bus: EventBus::new(),
            players: PlayerService::new(players)?,
            doubles: DoubleService::new(doubles),
            teams: TeamService::new(teams),
            matches: MatchService::new(matches),
            tournaments: TournamentService::new(tournaments),
            rules: RuleService::new(rules),
        };
        if seed_rules {
            info!("No stored rules, seeding {} defaults", club.rules.rules().len());
            club.save(&[CollectionKey::Rules])?;
        }
        Ok(club)
    }

    // --- Accessors ---

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn events(&mut self) -> &mut EventBus {
        &mut self.bus
    }

    pub fn players(&self) -> &PlayerService {
        &self.players
    }

    pub fn doubles(&self) -> &DoubleService {
        &self.doubles
    }

    pub fn teams(&self) -> &TeamService {
        &self.teams
    }

    pub fn matches(&self) -> &MatchService {
        &self.matches
    }

    pub fn tournaments(&self) -> &TournamentService {
        &self.tournaments
    }

    pub fn rules(&self) -> &RuleSet {
        self.rules.rules()
    }

    pub fn directory(&self) -> ParticipantDirectory<'_> {
        ParticipantDirectory::new(self.players.players(), self.doubles.doubles(), self.teams.teams())
    }

    // --- Players ---

    pub fn create_player(&mut self, input: NewPlayer) -> Result<Player> {
        let player = self.players.create(input, Utc::now(), &mut self.bus)?;
        self.save(&[CollectionKey::Players])?;
        Ok(player)
    }

    pub fn update_player(&mut self, id: &PlayerId, changes: PlayerUpdate) -> Result<Player> {
        let player = self.players.update(id, changes, Utc::now(), &mut self.bus)?;
        self.save(&[CollectionKey::Players])?;
        Ok(player)
    }

    /// Delete a player, dropping their doubles and taking them off every team roster.
    pub fn delete_player(&mut self, id: &PlayerId) -> Result<PlayerRemoval> {
        let now = Utc::now();
        let player = self.players.delete(id, &mut self.bus)?;
        let removed_doubles = self
            .doubles
            .remove_for_player(id, &mut self.bus)
            .into_iter()
            .map(|double| double.id)
            .collect();
        let teams = self.teams.remove_player_everywhere(id, now, &mut self.bus);

        self.save(&[CollectionKey::Players, CollectionKey::Doubles, CollectionKey::Teams])?;
        Ok(PlayerRemoval {
            player,
            removed_doubles,
            teams,
        })
    }

    pub fn import_players(&mut self, rows: Vec<NewPlayer>) -> Result<ImportReport> {
        let report = self.players.import(rows, Utc::now(), &mut self.bus);
        if !report.imported.is_empty() {
            self.save(&[CollectionKey::Players])?;
        }
        Ok(report)
    }

    // --- Doubles ---

    pub fn create_double(&mut self, player1: &PlayerId, player2: &PlayerId, name: Option<&str>) -> Result<Double> {
        let double = self
            .doubles
            .create(player1, player2, name, self.players.players(), Utc::now(), &mut self.bus)?;
        self.save(&[CollectionKey::Doubles])?;
        Ok(double)
    }

    pub fn update_double(&mut self, id: &DoubleId, changes: DoubleUpdate) -> Result<Double> {
        let double = self.doubles.update(id, changes, Utc::now(), &mut self.bus)?;
        self.save(&[CollectionKey::Doubles])?;
        Ok(double)
    }

    pub fn delete_double(&mut self, id: &DoubleId) -> Result<Double> {
        let double = self.doubles.delete(id, &mut self.bus)?;
        self.save(&[CollectionKey::Doubles])?;
        Ok(double)
    }

    // --- Teams ---

    pub fn create_team(&mut self, input: NewTeam) -> Result<Team> {
        let team = self.teams.create(input, self.players.players(), Utc::now(), &mut self.bus)?;
        self.save(&[CollectionKey::Teams])?;
        Ok(team)
    }

    pub fn update_team(&mut self, id: &TeamId, changes: TeamUpdate) -> Result<Team> {
        let team = self
            .teams
            .update(id, changes, self.players.players(), Utc::now(), &mut self.bus)?;
        self.save(&[CollectionKey::Teams])?;
        Ok(team)
    }

    pub fn delete_team(&mut self, id: &TeamId) -> Result<Team> {
        let team = self.teams.delete(id, &mut self.bus)?;
        self.save(&[CollectionKey::Teams])?;
        Ok(team)
    }

    pub fn add_team_player(&mut self, id: &TeamId, player_id: &PlayerId) -> Result<Team> {
        let team = self
            .teams
            .add_player(id, player_id, self.players.players(), Utc::now(), &mut self.bus)?;
        self.save(&[CollectionKey::Teams])?;
        Ok(team)
    }

    pub fn remove_team_player(&mut self, id: &TeamId, player_id: &PlayerId) -> Result<Team> {
        let team = self.teams.remove_player(id, player_id, Utc::now(), &mut self.bus)?;
        self.save(&[CollectionKey::Teams])?;
        Ok(team)
    }

    pub fn set_team_captain(&mut self, id: &TeamId, player_id: &PlayerId) -> Result<Team> {
        let team = self.teams.set_captain(id, player_id, Utc::now(), &mut self.bus)?;
        self.save(&[CollectionKey::Teams])?;
        Ok(team)
    }

    // --- Matches ---

    pub fn create_match(&mut self, input: NewMatch) -> Result<Match> {
        let directory = ParticipantDirectory::new(self.players.players(), self.doubles.doubles(), self.teams.teams());
        let created = self
            .matches
            .create(input, &directory, self.rules.rules().scoring(), Utc::now(), &mut self.bus)?;
        self.save(&[CollectionKey::Matches])?;
        Ok(created)
    }

    pub fn update_match(&mut self, id: &MatchId, changes: MatchUpdate) -> Result<Match> {
        let updated = self.matches.update(id, changes, Utc::now(), &mut self.bus)?;
        self.save(&[CollectionKey::Matches])?;
        Ok(updated)
    }

    pub fn delete_match(&mut self, id: &MatchId) -> Result<Match> {
        let removed = self.matches.delete(id, &mut self.bus)?;
        self.save(&[CollectionKey::Matches])?;
        Ok(removed)
    }

    pub fn start_match(&mut self, id: &MatchId) -> Result<Match> {
        let started = self.matches.start(id, Utc::now(), &mut self.bus)?;
        self.save(&[CollectionKey::Matches])?;
        Ok(started)
    }

    pub fn record_score(&mut self, id: &MatchId, score1: i64, score2: i64) -> Result<(Match, ScoreOutcome)> {
        let now = Utc::now();
        let (updated, outcome) = self.matches.update_score(id, score1, score2, now, &mut self.bus)?;
        self.after_score(&updated, &outcome, now)?;
        Ok((updated, outcome))
    }

    pub fn increment_score(&mut self, id: &MatchId, side: Side, points: u32) -> Result<(Match, ScoreOutcome)> {
        let now = Utc::now();
        let (updated, outcome) = self.matches.increment_score(id, side, points, now, &mut self.bus)?;
        self.after_score(&updated, &outcome, now)?;
        Ok((updated, outcome))
    }

    pub fn decrement_score(&mut self, id: &MatchId, side: Side, points: u32) -> Result<(Match, ScoreOutcome)> {
        let now = Utc::now();
        let (updated, outcome) = self.matches.decrement_score(id, side, points, now, &mut self.bus)?;
        self.after_score(&updated, &outcome, now)?;
        Ok((updated, outcome))
    }

    pub fn end_match(&mut self, id: &MatchId, winner: Option<&Participant>) -> Result<Match> {
        let now = Utc::now();
        let ended = self.matches.end(id, winner, now, &mut self.bus)?;
        let touched = self.settle(&ended, now)?;
        self.save(&touched)?;
        Ok(ended)
    }

    pub fn cancel_match(&mut self, id: &MatchId, reason: Option<&str>) -> Result<Match> {
        let cancelled = self.matches.cancel(id, reason, Utc::now(), &mut self.bus)?;
        self.save(&[CollectionKey::Matches])?;
        Ok(cancelled)
    }

    pub fn postpone_match(
        &mut self,
        id: &MatchId,
        new_date: Option<DateTime<Utc>>,
        reason: Option<&str>,
    ) -> Result<Match> {
        let postponed = self.matches.postpone(id, new_date, reason, Utc::now(), &mut self.bus)?;
        self.save(&[CollectionKey::Matches])?;
        Ok(postponed)
    }

    pub fn reschedule_match(&mut self, id: &MatchId, date: DateTime<Utc>, venue: Option<&str>) -> Result<Match> {
        let rescheduled = self.matches.reschedule(id, date, venue, Utc::now(), &mut self.bus)?;
        self.save(&[CollectionKey::Matches])?;
        Ok(rescheduled)
    }

    // --- Tournaments ---

    pub fn create_tournament(&mut self, input: NewTournament) -> Result<Tournament> {
        let tournament = self
            .tournaments
            .create(input, self.rules.rules(), Utc::now(), &mut self.bus)?;
        self.save(&[CollectionKey::Tournaments])?;
        Ok(tournament)
    }

    pub fn update_tournament(&mut self, id: &TournamentId, changes: TournamentUpdate) -> Result<Tournament> {
        let tournament = self.tournaments.update(id, changes, Utc::now(), &mut self.bus)?;
        self.save(&[CollectionKey::Tournaments])?;
        Ok(tournament)
    }

    pub fn delete_tournament(&mut self, id: &TournamentId) -> Result<Tournament> {
        let tournament = self.tournaments.delete(id, &mut self.bus)?;
        self.save(&[CollectionKey::Tournaments])?;
        Ok(tournament)
    }

    pub fn open_registration(&mut self, id: &TournamentId) -> Result<Tournament> {
        let tournament = self.tournaments.open_registration(id, Utc::now(), &mut self.bus)?;
        self.save(&[CollectionKey::Tournaments])?;
        Ok(tournament)
    }

    pub fn register(&mut self, id: &TournamentId, participant: Participant) -> Result<Tournament> {
        let directory = ParticipantDirectory::new(self.players.players(), self.doubles.doubles(), self.teams.teams());
        let tournament = self
            .tournaments
            .add_participant(id, participant, &directory, Utc::now(), &mut self.bus)?;
        self.save(&[CollectionKey::Tournaments])?;
        Ok(tournament)
    }

    pub fn withdraw(&mut self, id: &TournamentId, participant: &Participant) -> Result<Tournament> {
        let tournament = self
            .tournaments
            .remove_participant(id, participant, Utc::now(), &mut self.bus)?;
        self.save(&[CollectionKey::Tournaments])?;
        Ok(tournament)
    }

    pub fn start_tournament(&mut self, id: &TournamentId) -> Result<(Tournament, Vec<Match>)> {
        let (tournament, generated) = self
            .tournaments
            .start(id, self.rules.rules(), Utc::now(), &mut self.bus)?;
        self.matches.insert_generated(generated.clone(), &mut self.bus);
        self.save(&[CollectionKey::Tournaments, CollectionKey::Matches])?;
        Ok((tournament, generated))
    }

    pub fn complete_tournament(&mut self, id: &TournamentId) -> Result<Tournament> {
        let tournament = self
            .tournaments
            .complete(id, self.matches.by_tournament(id), Utc::now(), &mut self.bus)?;
        self.save(&[CollectionKey::Tournaments])?;
        Ok(tournament)
    }

    pub fn cancel_tournament(&mut self, id: &TournamentId) -> Result<Tournament> {
        let tournament = self.tournaments.cancel(id, Utc::now(), &mut self.bus)?;
        self.save(&[CollectionKey::Tournaments])?;
        Ok(tournament)
    }

    pub fn standings(&self, id: &TournamentId) -> Result<Vec<StandingEntry>> {
        Ok(self.tournaments.standings(id, self.matches.by_tournament(id))?)
    }

    pub fn progress(&self, id: &TournamentId) -> Result<Progress> {
        Ok(self.tournaments.progress(id, self.matches.by_tournament(id))?)
    }

    /// Lay the tournament's scheduled matches out over courts from `start_date`.
    pub fn schedule_tournament(&mut self, id: &TournamentId, start_date: NaiveDate, courts: u32) -> Result<Vec<ScheduleSlot>> {
        self.tournaments.get(id)?;
        let slots = self.matches.apply_schedule(
            id,
            start_date,
            courts,
            &self.config.schedule,
            Utc::now(),
            &mut self.bus,
        );
        self.save(&[CollectionKey::Matches])?;
        Ok(slots)
    }

    // --- Rules ---

    pub fn create_rule(&mut self, input: NewRule) -> Result<Rule> {
        let rule = self.rules.create(input, Utc::now(), &mut self.bus)?;
        self.save(&[CollectionKey::Rules])?;
        Ok(rule)
    }

    pub fn update_rule(&mut self, id: &crate::domain::RuleId, changes: RuleUpdate) -> Result<Rule> {
        let rule = self.rules.update(id, changes, Utc::now(), &mut self.bus)?;
        self.save(&[CollectionKey::Rules])?;
        Ok(rule)
    }

    pub fn delete_rule(&mut self, id: &crate::domain::RuleId) -> Result<Rule> {
        let rule = self.rules.delete(id, &mut self.bus)?;
        self.save(&[CollectionKey::Rules])?;
        Ok(rule)
    }

    pub fn activate_rule(&mut self, id: &crate::domain::RuleId) -> Result<Rule> {
        let rule = self.rules.activate(id, Utc::now(), &mut self.bus)?;
        self.save(&[CollectionKey::Rules])?;
        Ok(rule)
    }

    pub fn deactivate_rule(&mut self, id: &crate::domain::RuleId) -> Result<Rule> {
        let rule = self.rules.deactivate(id, Utc::now(), &mut self.bus)?;
        self.save(&[CollectionKey::Rules])?;
        Ok(rule)
    }

    pub fn reset_rules(&mut self) -> Result<()> {
        self.rules.reset(Utc::now(), &mut self.bus);
        self.save(&[CollectionKey::Rules])
    }

    pub fn validate_match(&self, id: &MatchId) -> Result<ValidationReport> {
        let target = self.matches.get(id)?;
        Ok(self.rules().validate(ValidationContext::Match(target)))
    }

    pub fn validate_tournament(&self, id: &TournamentId) -> Result<ValidationReport> {
        let tournament = self.tournaments.get(id)?;
        Ok(self.rules().validate(ValidationContext::Tournament {
            tournament,
            now: Utc::now(),
        }))
    }

    // --- Exchange ---

    pub fn export_bundle(&self) -> ExportBundle {
        ExportBundle::new(
            self.players.players().as_slice().to_vec(),
            self.doubles.doubles().as_slice().to_vec(),
            self.teams.teams().as_slice().to_vec(),
            self.tournaments.tournaments().as_slice().to_vec(),
            self.matches.matches().as_slice().to_vec(),
            self.rules.export(),
            Utc::now(),
        )
    }

    /// Replace each collection present in the bundle; a rejected collection keeps its current contents.
    pub fn import_bundle(&mut self, bundle: ExportBundle) -> Result<ImportResults> {
        let mut results = ImportResults::default();
        let mut touched = Vec::new();

        if let Some(players) = bundle.players {
            let outcome = self.players.import_all(players);
            mark(&mut touched, CollectionKey::Players, &outcome);
            results.record(CollectionKey::Players.as_str(), outcome);
        }
        if let Some(doubles) = bundle.doubles {
            let outcome = self.doubles.import_all(doubles, self.players.players());
            mark(&mut touched, CollectionKey::Doubles, &outcome);
            results.record(CollectionKey::Doubles.as_str(), outcome);
        }
        if let Some(teams) = bundle.teams {
            let outcome = self.teams.import_all(teams, self.players.players());
            mark(&mut touched, CollectionKey::Teams, &outcome);
            results.record(CollectionKey::Teams.as_str(), outcome);
        }
        if let Some(tournaments) = bundle.tournaments {
            let outcome = self.tournaments.import_all(tournaments);
            mark(&mut touched, CollectionKey::Tournaments, &outcome);
            results.record(CollectionKey::Tournaments.as_str(), outcome);
        }
        if let Some(matches) = bundle.matches {
            let outcome = self.matches.import_all(matches);
            mark(&mut touched, CollectionKey::Matches, &outcome);
            results.record(CollectionKey::Matches.as_str(), outcome);
        }
        if let Some(rules) = bundle.rules {
            let outcome = self.rules.import(rules, &mut self.bus);
            mark(&mut touched, CollectionKey::Rules, &outcome);
            results.record(CollectionKey::Rules.as_str(), outcome);
        }

        self.save(&touched)?;
        self.bus.publish(crate::events::EventKind::DataImported, &results);
        Ok(results)
    }

    pub fn export_rules(&self) -> RuleBook {
        RuleBook::new(self.rules.export(), Utc::now())
    }

    pub fn import_rules(&mut self, book: RuleBook) -> Result<usize> {
        let count = self.rules.import(book.rules, &mut self.bus)?;
        self.save(&[CollectionKey::Rules])?;
        Ok(count)
    }

    /// Wipe the store and start over with the default rule book.
    pub fn reset_all(&mut self) -> Result<()> {
        self.store.clear().context("Failed to clear club data")?;
        self.players.import_all(Vec::new())?;
        self.doubles.import_all(Vec::new(), self.players.players())?;
        self.teams.import_all(Vec::new(), self.players.players())?;
        self.tournaments.import_all(Vec::new())?;
        self.matches.import_all(Vec::new())?;
        self.rules.reset(Utc::now(), &mut self.bus);
        self.save(&CollectionKey::ALL)
    }

    // --- Helpers ---

    fn after_score(&mut self, updated: &Match, outcome: &ScoreOutcome, now: DateTime<Utc>) -> Result<()> {
        let touched = match outcome {
            ScoreOutcome::MatchClosed { .. } => self.settle(updated, now)?,
            _ => vec![CollectionKey::Matches],
        };
        self.save(&touched)
    }

    /// Credit both sides of a completed match and push its winner through the bracket.
    fn settle(&mut self, finished: &Match, now: DateTime<Utc>) -> Result<Vec<CollectionKey>> {
        let mut touched = vec![CollectionKey::Matches];
        let Some(winner) = finished.winner_side() else {
            return Ok(touched);
        };

        let directory = ParticipantDirectory::new(self.players.players(), self.doubles.doubles(), self.teams.teams());
        match (
            directory.opponent(&finished.participant1),
            directory.opponent(&finished.participant2),
        ) {
            (Ok(first), Ok(second)) => {
                for (side, opponent) in [(Side::One, &second), (Side::Two, &first)] {
                    let outcome = MatchOutcome {
                        match_id: Some(finished.id.clone()),
                        is_win: side == winner,
                        match_type: finished.match_type,
                        score: finished.score.summary_for(side),
                        date: finished.end_time.unwrap_or(now),
                    };
                    let participant = finished.participant(side);
                    self.credit(participant, outcome, opponent)?;
                    let key = registry_key(participant.match_type());
                    if !touched.contains(&key) {
                        touched.push(key);
                    }
                }
            }
            _ => warn!("Match {} has an unregistered participant, records not updated", finished.id),
        }

        if finished.tournament_id.is_some() {
            let created = self
                .tournaments
                .advance_bracket(finished, self.rules.rules(), now, &mut self.bus)?;
            if !created.is_empty() {
                info!("Bracket advanced, {} new matches", created.len());
            }
            self.matches.insert_generated(created, &mut self.bus);
            touched.push(CollectionKey::Tournaments);
        }
        Ok(touched)
    }

    fn credit(
        &mut self,
        participant: &Participant,
        outcome: MatchOutcome,
        opponent: &crate::domain::Opponent,
    ) -> Result<(), ClubError> {
        let settings = &self.config.points;
        match participant {
            Participant::Player(id) => {
                self.players.record_result(id, outcome, opponent, settings, &mut self.bus)?;
            }
            Participant::Double(id) => {
                self.doubles.record_result(id, outcome, opponent, settings, &mut self.bus)?;
            }
            Participant::Team(id) => {
                self.teams.record_result(id, outcome, opponent, settings, &mut self.bus)?;
            }
        }
        Ok(())
    }

    fn save(&mut self, keys: &[CollectionKey]) -> Result<()> {
        for &key in keys {
            let records = match key {
                CollectionKey::Players => to_records(self.players.players().as_slice(), "player")?,
                CollectionKey::Doubles => to_records(self.doubles.doubles().as_slice(), "double")?,
                CollectionKey::Teams => to_records(self.teams.teams().as_slice(), "team")?,
                CollectionKey::Tournaments => to_records(self.tournaments.tournaments().as_slice(), "tournament")?,
                CollectionKey::Matches => to_records(self.matches.matches().as_slice(), "match")?,
                CollectionKey::Rules => to_records(self.rules.rules().rules().as_slice(), "rule")?,
            };
            self.store
                .save(key, &records)
                .with_context(|| storage_context("save", key.as_str()))?;
        }
        Ok(())
    }
}

fn load<T: Record>(store: &dyn Store, key: CollectionKey) -> Result<Option<Vec<T>>> {
    let Some(records) = store.load(key).with_context(|| storage_context("load", key.as_str()))? else {
        return Ok(None);
    };
    Ok(Some(from_records(records, key.as_str())?))
}

fn registry_key(match_type: MatchType) -> CollectionKey {
    match match_type {
        MatchType::Singles => CollectionKey::Players,
        MatchType::Doubles => CollectionKey::Doubles,
        MatchType::Teams => CollectionKey::Teams,
    }
}

fn mark<T>(touched: &mut Vec<CollectionKey>, key: CollectionKey, outcome: &Result<T, ClubError>) {
    if outcome.is_ok() {
        touched.push(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageBackend;
    use crate::storage::JsonStore;

    fn club() -> Club {
        Club::in_memory(AppConfig::new()).unwrap()
    }

    fn sign_up(club: &mut Club, name: &str) -> Player {
        club.create_player(NewPlayer {
            name: name.to_string(),
            email: format!("{}@club.test", name.to_lowercase()),
            address: "12 Club Street".to_string(),
            rank: None,
        })
        .unwrap()
    }

    #[test]
    fn test_seeds_default_rules_on_empty_store() {
        let club = club();
        assert!(!club.rules().is_empty());
        assert_eq!(club.rules().scoring().sets_to_win(), 3);
    }

    #[test]
    fn test_core_rules_cannot_be_removed() {
        let mut club = club();
        let id = club.rules().by_name("Điểm thắng set").unwrap().id.clone();

        let err = club.delete_rule(&id).unwrap_err();
        assert!(matches!(err.downcast_ref::<ClubError>(), Some(ClubError::ProtectedResource(_))));
        let err = club.deactivate_rule(&id).unwrap_err();
        assert!(matches!(err.downcast_ref::<ClubError>(), Some(ClubError::ProtectedResource(_))));
        assert!(club.rules().by_name("Điểm thắng set").unwrap().is_active);
    }

    #[test]
    fn test_rejected_collection_keeps_current_contents() {
        let mut club = club();
        let anna = sign_up(&mut club, "Anna");
        let mut broken = anna.clone();
        broken.email = "not-an-email".to_string();

        let bundle = ExportBundle {
            players: Some(vec![broken]),
            ..club.export_bundle()
        };
        let results = club.import_bundle(bundle).unwrap();

        assert!(results.errors.contains_key("players"));
        assert_eq!(club.players().get(&anna.id).unwrap().email, "anna@club.test");
    }

    #[test]
    fn test_json_store_survives_reopen() {
        let dir = std::env::temp_dir().join(format!("club-reopen-{}", uuid::Uuid::new_v4()));
        let config = AppConfig::new().with_storage(Some(StorageBackend::Json), Some(dir.clone()));

        let mut first = Club::open(config.clone()).unwrap();
        let anna = sign_up(&mut first, "Anna");
        drop(first);

        let reopened = Club::with_store(config, Box::new(JsonStore::new(&dir).unwrap())).unwrap();
        assert_eq!(reopened.players().get(&anna.id).unwrap().name, "Anna");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_settled_records_persist_for_both_kinds() {
        let dir = std::env::temp_dir().join(format!("club-settle-{}", uuid::Uuid::new_v4()));
        let config = AppConfig::new().with_storage(Some(StorageBackend::Json), Some(dir.clone()));

        let mut first = Club::open(config.clone()).unwrap();
        let anna = sign_up(&mut first, "Anna");
        let binh = sign_up(&mut first, "Binh");
        let chau = sign_up(&mut first, "Chau");
        let pair = first.create_double(&binh.id, &chau.id, None).unwrap();

        // Older data can still hold a player against a double.
        let legacy = Match::with_id(
            MatchId::from("match_legacy"),
            anna.participant(),
            pair.participant(),
            first.rules().scoring(),
            Utc::now(),
        );
        first.matches.insert_generated(vec![legacy], &mut first.bus);
        first.start_match(&MatchId::from("match_legacy")).unwrap();
        first
            .end_match(&MatchId::from("match_legacy"), Some(&anna.participant()))
            .unwrap();
        drop(first);

        let reopened = Club::open(config).unwrap();
        assert_eq!(reopened.players().get(&anna.id).unwrap().record.matches_played, 1);
        assert_eq!(reopened.doubles().get(&pair.id).unwrap().record.matches_lost, 1);
        std::fs::remove_dir_all(&dir).ok();
    }
}
