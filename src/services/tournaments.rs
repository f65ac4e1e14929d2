use chrono::{DateTime, Utc};
use log::{info, warn};
use serde_json::json;

use super::directory::ParticipantDirectory;
use super::duplicate_ids;
use crate::domain::{Collection, Participant, TournamentId};
use crate::errors::{ClubError, ClubResult};
use crate::events::{EventBus, EventKind};
use crate::matches::Match;
use crate::rules::{RuleSet, ValidationContext};
use crate::tournament::{
    Prize, Progress, StandingEntry, Tournament, TournamentFormat, TournamentMetadata, TournamentStatus,
    TournamentType,
};

#[derive(Debug, Clone)]
pub struct NewTournament {
    pub name: String,
    pub description: String,
    pub tournament_type: TournamentType,
    pub format: TournamentFormat,
    /// Falls back to the participant-cap rule
    pub max_participants: Option<usize>,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub metadata: TournamentMetadata,
    pub prizes: Vec<Prize>,
}

impl NewTournament {
    pub fn named(name: &str, tournament_type: TournamentType, format: TournamentFormat) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            tournament_type,
            format,
            max_participants: None,
            registration_deadline: None,
            start_date: None,
            end_date: None,
            metadata: TournamentMetadata::default(),
            prizes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TournamentUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub max_participants: Option<usize>,
    pub registration_deadline: Option<DateTime<Utc>>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub metadata: Option<TournamentMetadata>,
    pub prizes: Option<Vec<Prize>>,
}

pub struct TournamentService {
    tournaments: Collection<Tournament>,
}

impl TournamentService {
    pub fn new(tournaments: Vec<Tournament>) -> Self {
        Self {
            tournaments: Collection::from_vec(tournaments),
        }
    }

    pub fn tournaments(&self) -> &Collection<Tournament> {
        &self.tournaments
    }

    pub fn import_all(&mut self, tournaments: Vec<Tournament>) -> ClubResult<usize> {
        let mut violations = duplicate_ids(&tournaments);
        for tournament in &tournaments {
            violations.extend(
                tournament
                    .validate()
                    .into_iter()
                    .map(|v| format!("tournament {}: {}", tournament.name, v)),
            );
        }
        ClubError::from_violations(violations)?;

        let count = tournaments.len();
        self.tournaments = Collection::from_vec(tournaments);
        Ok(count)
    }

    // --- Commands ---

    pub fn create(
        &mut self,
        input: NewTournament,
        rules: &RuleSet,
        now: DateTime<Utc>,
        bus: &mut EventBus,
    ) -> ClubResult<Tournament> {
        let max_participants = input.max_participants.unwrap_or_else(|| rules.max_participants());
        let mut tournament = Tournament::new(&input.name, input.tournament_type, input.format, max_participants, now);
        tournament.description = input.description.trim().to_string();
        tournament.registration_deadline = input.registration_deadline;
        tournament.start_date = input.start_date;
        tournament.end_date = input.end_date;
        tournament.metadata = input.metadata;
        tournament.prizes = input.prizes;

        let mut violations = tournament.validate();
        if max_participants > rules.max_participants() {
            violations.push(format!(
                "at most {} participants are allowed per tournament",
                rules.max_participants()
            ));
        }
        if tournament.start_date.is_some() {
            let report = rules.validate(ValidationContext::Tournament {
                tournament: &tournament,
                now,
            });
            violations.extend(report.violations);
        }
        ClubError::from_violations(violations)?;

        self.tournaments.add(tournament.clone());
        info!("Created {} tournament {}", tournament.format.as_str(), tournament.name);
        bus.publish(EventKind::TournamentCreated, &tournament);
        Ok(tournament)
    }

    pub fn update(
        &mut self,
        id: &TournamentId,
        changes: TournamentUpdate,
        now: DateTime<Utc>,
        bus: &mut EventBus,
    ) -> ClubResult<Tournament> {
        let mut candidate = self.tournaments.require(id)?.clone();
        if candidate.status.is_terminal() {
            return Err(ClubError::invalid_state(format!(
                "tournament {} is {} and cannot be edited",
                candidate.name, candidate.status
            )));
        }
        if let Some(name) = changes.name {
            candidate.name = name.trim().to_string();
        }
        if let Some(description) = changes.description {
            candidate.description = description.trim().to_string();
        }
        if let Some(max_participants) = changes.max_participants {
            candidate.max_participants = max_participants;
        }
        if changes.registration_deadline.is_some() {
            candidate.registration_deadline = changes.registration_deadline;
        }
        if changes.start_date.is_some() {
            candidate.start_date = changes.start_date;
        }
        if changes.end_date.is_some() {
            candidate.end_date = changes.end_date;
        }
        if let Some(metadata) = changes.metadata {
            candidate.metadata = metadata;
        }
        if let Some(prizes) = changes.prizes {
            candidate.prizes = prizes;
        }
        candidate.updated_at = now;
        ClubError::from_violations(candidate.validate())?;

        self.tournaments.add(candidate.clone());
        bus.publish(EventKind::TournamentUpdated, &candidate);
        Ok(candidate)
    }

    pub fn delete(&mut self, id: &TournamentId, bus: &mut EventBus) -> ClubResult<Tournament> {
        let existing = self.tournaments.require(id)?;
        if existing.status == TournamentStatus::InProgress {
            return Err(ClubError::invalid_state(format!(
                "tournament {} is in progress and cannot be deleted",
                existing.name
            )));
        }
        let removed = self
            .tournaments
            .remove(id)
            .ok_or_else(|| ClubError::not_found("tournament", id))?;
        info!("Deleted tournament {}", removed.name);
        bus.publish(EventKind::TournamentDeleted, &removed);
        Ok(removed)
    }

    pub fn open_registration(
        &mut self,
        id: &TournamentId,
        now: DateTime<Utc>,
        bus: &mut EventBus,
    ) -> ClubResult<Tournament> {
        let tournament = self.tournaments.require_mut(id)?;
        tournament.open_registration(now)?;
        let tournament = tournament.clone();
        bus.publish(EventKind::TournamentRegistrationOpened, &tournament);
        Ok(tournament)
    }

    pub fn add_participant(
        &mut self,
        id: &TournamentId,
        participant: Participant,
        directory: &ParticipantDirectory<'_>,
        now: DateTime<Utc>,
        bus: &mut EventBus,
    ) -> ClubResult<Tournament> {
        directory.require(&participant)?;
        let tournament = self.tournaments.require_mut(id)?;
        tournament.add_participant(participant.clone(), now)?;

        let tournament = tournament.clone();
        bus.publish(
            EventKind::ParticipantAdded,
            &json!({ "tournamentId": id, "participant": &participant }),
        );
        Ok(tournament)
    }

    pub fn remove_participant(
        &mut self,
        id: &TournamentId,
        participant: &Participant,
        now: DateTime<Utc>,
        bus: &mut EventBus,
    ) -> ClubResult<Tournament> {
        let tournament = self.tournaments.require_mut(id)?;
        if !tournament.remove_participant(participant, now)? {
            return Err(ClubError::validation(format!(
                "{} is not registered for {}",
                participant, tournament.name
            )));
        }

        let tournament = tournament.clone();
        bus.publish(
            EventKind::ParticipantRemoved,
            &json!({ "tournamentId": id, "participant": participant }),
        );
        Ok(tournament)
    }

    /// Start play and return the generated matches for the match registry.
    pub fn start(
        &mut self,
        id: &TournamentId,
        rules: &RuleSet,
        now: DateTime<Utc>,
        bus: &mut EventBus,
    ) -> ClubResult<(Tournament, Vec<Match>)> {
        let tournament = self.tournaments.require_mut(id)?;
        if tournament.format == TournamentFormat::Swiss {
            warn!("Tournament {} uses swiss format, pairing as round robin", tournament.name);
        }
        let generated = tournament.start(rules.scoring(), now)?;

        let tournament = tournament.clone();
        info!("Tournament {} started with {} matches", tournament.name, generated.len());
        bus.publish(EventKind::TournamentStarted, &tournament);
        Ok((tournament, generated))
    }

    /// Push a completed match through its tournament's bracket.
    pub fn advance_bracket(
        &mut self,
        completed: &Match,
        rules: &RuleSet,
        now: DateTime<Utc>,
        bus: &mut EventBus,
    ) -> ClubResult<Vec<Match>> {
        let Some(id) = completed.tournament_id.as_ref() else {
            return Ok(Vec::new());
        };
        let Some(tournament) = self.tournaments.get_mut(id) else {
            warn!("Match {} references unknown tournament {}", completed.id, id);
            return Ok(Vec::new());
        };
        let created = tournament.advance_bracket(completed, rules.scoring(), now)?;
        if !created.is_empty() {
            bus.publish(EventKind::TournamentUpdated, &*tournament);
        }
        Ok(created)
    }

    pub fn complete<'a, I>(
        &mut self,
        id: &TournamentId,
        matches: I,
        now: DateTime<Utc>,
        bus: &mut EventBus,
    ) -> ClubResult<Tournament>
    where
        I: IntoIterator<Item = &'a Match>,
    {
        let tournament = self.tournaments.require_mut(id)?;
        tournament.complete(matches, now)?;

        let tournament = tournament.clone();
        info!("Tournament {} completed", tournament.name);
        bus.publish(EventKind::TournamentCompleted, &tournament);
        Ok(tournament)
    }

    pub fn cancel(&mut self, id: &TournamentId, now: DateTime<Utc>, bus: &mut EventBus) -> ClubResult<Tournament> {
        let tournament = self.tournaments.require_mut(id)?;
        tournament.cancel(now)?;
        let tournament = tournament.clone();
        bus.publish(EventKind::TournamentCancelled, &tournament);
        Ok(tournament)
    }

    // --- Queries ---

    pub fn get(&self, id: &TournamentId) -> ClubResult<&Tournament> {
        self.tournaments.require(id)
    }

    /// Finalised table for completed tournaments, live calculation otherwise
    pub fn standings<'a, I>(&self, id: &TournamentId, matches: I) -> ClubResult<Vec<StandingEntry>>
    where
        I: IntoIterator<Item = &'a Match>,
    {
        let tournament = self.tournaments.require(id)?;
        if tournament.status == TournamentStatus::Completed {
            return Ok(tournament.standings.clone());
        }
        Ok(tournament.calculate_standings(matches))
    }

    pub fn progress<'a, I>(&self, id: &TournamentId, matches: I) -> ClubResult<Progress>
    where
        I: IntoIterator<Item = &'a Match>,
    {
        Ok(self.tournaments.require(id)?.progress(matches))
    }

    pub fn by_status(&self, status: TournamentStatus) -> Vec<&Tournament> {
        self.tournaments.iter().filter(|t| t.status == status).collect()
    }

    pub fn by_participant(&self, participant: &Participant) -> Vec<&Tournament> {
        self.tournaments.iter().filter(|t| t.has_participant(participant)).collect()
    }

    pub fn search(&self, term: &str) -> Vec<&Tournament> {
        let term = term.trim();
        self.tournaments
            .iter()
            .filter(|t| term.is_empty() || t.matches_search(term))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Double, Player, Team};
    use crate::ranking::Rank;
    use chrono::Duration;

    fn players(count: usize) -> Collection<Player> {
        let now = Utc::now();
        Collection::from_vec(
            (0..count)
                .map(|i| Player::new(&format!("Player {}", i), &format!("p{}@club.vn", i), "1 Dong Khoi", Rank::Beginner, now))
                .collect(),
        )
    }

    #[test]
    fn test_create_applies_rule_defaults_and_lead_time() {
        let rules = RuleSet::with_defaults(Utc::now());
        let mut bus = EventBus::new();
        let mut service = TournamentService::new(Vec::new());

        let created = service
            .create(
                NewTournament::named("Spring Cup", TournamentType::Singles, TournamentFormat::RoundRobin),
                &rules,
                Utc::now(),
                &mut bus,
            )
            .unwrap();
        assert_eq!(created.max_participants, 32);

        let mut too_soon = NewTournament::named("Night Cup", TournamentType::Singles, TournamentFormat::RoundRobin);
        too_soon.start_date = Some(Utc::now() + Duration::hours(2));
        assert!(matches!(
            service.create(too_soon, &rules, Utc::now(), &mut bus),
            Err(ClubError::Validation(_))
        ));

        let mut oversized = NewTournament::named("Open", TournamentType::Singles, TournamentFormat::RoundRobin);
        oversized.max_participants = Some(64);
        assert!(service.create(oversized, &rules, Utc::now(), &mut bus).is_err());
    }

    #[test]
    fn test_registration_and_start_generate_matches() {
        let rules = RuleSet::with_defaults(Utc::now());
        let roster = players(4);
        let doubles: Collection<Double> = Collection::new();
        let teams: Collection<Team> = Collection::new();
        let directory = ParticipantDirectory::new(&roster, &doubles, &teams);
        let mut bus = EventBus::new();
        let mut service = TournamentService::new(Vec::new());

        let cup = service
            .create(
                NewTournament::named("Spring Cup", TournamentType::Singles, TournamentFormat::RoundRobin),
                &rules,
                Utc::now(),
                &mut bus,
            )
            .unwrap();
        service.open_registration(&cup.id, Utc::now(), &mut bus).unwrap();
        for player in roster.iter() {
            service
                .add_participant(&cup.id, player.participant(), &directory, Utc::now(), &mut bus)
                .unwrap();
        }
        let ghost = Participant::Player("player_ghost".into());
        assert!(service.add_participant(&cup.id, ghost, &directory, Utc::now(), &mut bus).is_err());

        let (started, generated) = service.start(&cup.id, &rules, Utc::now(), &mut bus).unwrap();
        assert_eq!(started.status, TournamentStatus::InProgress);
        assert_eq!(generated.len(), 6);
        assert!(matches!(service.delete(&cup.id, &mut bus), Err(ClubError::InvalidState(_))));
        assert_eq!(service.progress(&cup.id, &generated).unwrap().total_matches, 6);
    }
}
