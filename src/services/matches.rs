use chrono::{DateTime, NaiveDate, Utc};
use log::info;
use serde_json::json;

use super::directory::ParticipantDirectory;
use super::duplicate_ids;
use crate::config::ScheduleSettings;
use crate::domain::{Collection, MatchId, Participant, Side, TournamentId};
use crate::errors::{ClubError, ClubResult};
use crate::events::{EventBus, EventKind};
use crate::matches::{
    Match, MatchStatus, ParticipantStats, ScheduleSlot, ScoreOutcome, participant_stats, plan_schedule,
};
use crate::rules::ScoringRules;

#[derive(Debug, Clone)]
pub struct NewMatch {
    pub participant1: Participant,
    pub participant2: Participant,
    pub scheduled_date: Option<DateTime<Utc>>,
    pub venue: String,
    pub referee: String,
    pub court: Option<u32>,
    pub notes: String,
}

impl NewMatch {
    pub fn between(participant1: Participant, participant2: Participant) -> Self {
        Self {
            participant1,
            participant2,
            scheduled_date: None,
            venue: String::new(),
            referee: String::new(),
            court: None,
            notes: String::new(),
        }
    }
}

/// Descriptive fields only; scores and status change through the lifecycle commands
#[derive(Debug, Clone, Default)]
pub struct MatchUpdate {
    pub scheduled_date: Option<DateTime<Utc>>,
    pub venue: Option<String>,
    pub referee: Option<String>,
    pub court: Option<u32>,
    pub notes: Option<String>,
}

pub struct MatchService {
    matches: Collection<Match>,
}

impl MatchService {
    pub fn new(matches: Vec<Match>) -> Self {
        Self {
            matches: Collection::from_vec(matches),
        }
    }

    pub fn matches(&self) -> &Collection<Match> {
        &self.matches
    }

    pub fn import_all(&mut self, matches: Vec<Match>) -> ClubResult<usize> {
        let mut violations = duplicate_ids(&matches);
        for imported in &matches {
            if imported.participant1 == imported.participant2 {
                violations.push(format!("match {} pits a participant against itself", imported.id));
            }
            violations.extend(
                imported
                    .scoring
                    .validate()
                    .into_iter()
                    .map(|v| format!("match {}: {}", imported.id, v)),
            );
        }
        ClubError::from_violations(violations)?;

        let count = matches.len();
        self.matches = Collection::from_vec(matches);
        Ok(count)
    }

    // --- Commands ---

    /// Friendly match between two registered participants, scored by the current rules.
    pub fn create(
        &mut self,
        input: NewMatch,
        directory: &ParticipantDirectory<'_>,
        scoring: ScoringRules,
        now: DateTime<Utc>,
        bus: &mut EventBus,
    ) -> ClubResult<Match> {
        let mut violations = Vec::new();
        for participant in [&input.participant1, &input.participant2] {
            if !directory.exists(participant) {
                violations.push(format!("{} does not exist", participant));
            }
        }

        let mut created = Match::new(input.participant1, input.participant2, scoring, now);
        created.scheduled_date = input.scheduled_date;
        created.venue = input.venue.trim().to_string();
        created.referee = input.referee.trim().to_string();
        created.court = input.court;
        created.notes = input.notes.trim().to_string();
        violations.extend(created.validate(now));
        ClubError::from_violations(violations)?;

        self.matches.add(created.clone());
        info!("Created {} match {}", created.match_type, created.id);
        bus.publish(EventKind::MatchCreated, &created);
        Ok(created)
    }

    /// Store matches produced by a tournament.
    pub fn insert_generated(&mut self, generated: Vec<Match>, bus: &mut EventBus) {
        for created in generated {
            bus.publish(EventKind::MatchCreated, &created);
            self.matches.add(created);
        }
    }

    pub fn update(
        &mut self,
        id: &MatchId,
        changes: MatchUpdate,
        now: DateTime<Utc>,
        bus: &mut EventBus,
    ) -> ClubResult<Match> {
        let mut candidate = self.matches.require(id)?.clone();
        if candidate.status == MatchStatus::Completed {
            return Err(ClubError::invalid_state(format!("match {} is completed and cannot be edited", id)));
        }
        let rescheduled = changes.scheduled_date.is_some();
        if rescheduled {
            candidate.scheduled_date = changes.scheduled_date;
        }
        if let Some(venue) = changes.venue {
            candidate.venue = venue.trim().to_string();
        }
        if let Some(referee) = changes.referee {
            candidate.referee = referee.trim().to_string();
        }
        if changes.court.is_some() {
            candidate.court = changes.court;
        }
        if let Some(notes) = changes.notes {
            candidate.notes = notes.trim().to_string();
        }
        candidate.updated_at = now;
        // A date already in the past only matters when this edit sets it.
        let violations = if rescheduled {
            candidate.validate(now)
        } else {
            candidate.validate_pairing()
        };
        ClubError::from_violations(violations)?;

        self.matches.add(candidate.clone());
        bus.publish(EventKind::MatchUpdated, &candidate);
        Ok(candidate)
    }

    pub fn delete(&mut self, id: &MatchId, bus: &mut EventBus) -> ClubResult<Match> {
        let existing = self.matches.require(id)?;
        if existing.status == MatchStatus::InProgress {
            return Err(ClubError::invalid_state(format!("match {} is in progress and cannot be deleted", id)));
        }
        let removed = self.matches.remove(id).ok_or_else(|| ClubError::not_found("match", id))?;
        info!("Deleted match {}", removed.id);
        bus.publish(EventKind::MatchDeleted, &removed);
        Ok(removed)
    }

    pub fn start(&mut self, id: &MatchId, now: DateTime<Utc>, bus: &mut EventBus) -> ClubResult<Match> {
        let target = self.matches.require_mut(id)?;
        target.start(now)?;
        let started = target.clone();
        bus.publish(EventKind::MatchStarted, &started);
        Ok(started)
    }

    pub fn update_score(
        &mut self,
        id: &MatchId,
        score1: i64,
        score2: i64,
        now: DateTime<Utc>,
        bus: &mut EventBus,
    ) -> ClubResult<(Match, ScoreOutcome)> {
        let target = self.matches.require_mut(id)?;
        let outcome = target.update_score(score1, score2, now)?;
        let updated = target.clone();
        publish_score(bus, &updated, &outcome);
        Ok((updated, outcome))
    }

    pub fn increment_score(
        &mut self,
        id: &MatchId,
        side: Side,
        points: u32,
        now: DateTime<Utc>,
        bus: &mut EventBus,
    ) -> ClubResult<(Match, ScoreOutcome)> {
        let target = self.matches.require_mut(id)?;
        let outcome = target.increment_score(side, points, now)?;
        let updated = target.clone();
        publish_score(bus, &updated, &outcome);
        Ok((updated, outcome))
    }

    pub fn decrement_score(
        &mut self,
        id: &MatchId,
        side: Side,
        points: u32,
        now: DateTime<Utc>,
        bus: &mut EventBus,
    ) -> ClubResult<(Match, ScoreOutcome)> {
        let target = self.matches.require_mut(id)?;
        let outcome = target.decrement_score(side, points, now)?;
        let updated = target.clone();
        publish_score(bus, &updated, &outcome);
        Ok((updated, outcome))
    }

    pub fn end(
        &mut self,
        id: &MatchId,
        winner: Option<&Participant>,
        now: DateTime<Utc>,
        bus: &mut EventBus,
    ) -> ClubResult<Match> {
        let target = self.matches.require_mut(id)?;
        target.end(winner, now)?;
        let ended = target.clone();
        bus.publish(EventKind::MatchCompleted, &ended);
        Ok(ended)
    }

    pub fn cancel(
        &mut self,
        id: &MatchId,
        reason: Option<&str>,
        now: DateTime<Utc>,
        bus: &mut EventBus,
    ) -> ClubResult<Match> {
        let target = self.matches.require_mut(id)?;
        target.cancel(reason, now)?;
        let cancelled = target.clone();
        bus.publish(EventKind::MatchCancelled, &cancelled);
        Ok(cancelled)
    }

    pub fn postpone(
        &mut self,
        id: &MatchId,
        new_date: Option<DateTime<Utc>>,
        reason: Option<&str>,
        now: DateTime<Utc>,
        bus: &mut EventBus,
    ) -> ClubResult<Match> {
        let target = self.matches.require_mut(id)?;
        target.postpone(new_date, reason, now)?;
        let postponed = target.clone();
        bus.publish(EventKind::MatchPostponed, &postponed);
        Ok(postponed)
    }

    pub fn reschedule(
        &mut self,
        id: &MatchId,
        date: DateTime<Utc>,
        venue: Option<&str>,
        now: DateTime<Utc>,
        bus: &mut EventBus,
    ) -> ClubResult<Match> {
        let target = self.matches.require_mut(id)?;
        target.reschedule(date, venue, now)?;
        let rescheduled = target.clone();
        bus.publish(EventKind::MatchRescheduled, &rescheduled);
        Ok(rescheduled)
    }

    /// Give the tournament's scheduled matches a court and start time.
    pub fn apply_schedule(
        &mut self,
        tournament_id: &TournamentId,
        start_date: NaiveDate,
        courts: u32,
        settings: &ScheduleSettings,
        now: DateTime<Utc>,
        bus: &mut EventBus,
    ) -> Vec<ScheduleSlot> {
        let slots = plan_schedule(self.by_tournament(tournament_id), start_date, courts, settings);
        for slot in &slots {
            if let Some(target) = self.matches.get_mut(&slot.match_id) {
                target.scheduled_date = Some(slot.start_time);
                target.court = Some(slot.court);
                target.updated_at = now;
            }
        }
        info!("Scheduled {} matches of tournament {}", slots.len(), tournament_id);
        bus.publish(
            EventKind::MatchUpdated,
            &json!({ "tournamentId": tournament_id, "schedule": &slots }),
        );
        slots
    }

    // --- Queries ---

    pub fn get(&self, id: &MatchId) -> ClubResult<&Match> {
        self.matches.require(id)
    }

    pub fn by_status(&self, status: MatchStatus) -> Vec<&Match> {
        self.matches.iter().filter(|m| m.status == status).collect()
    }

    pub fn by_tournament(&self, tournament_id: &TournamentId) -> Vec<&Match> {
        self.matches
            .iter()
            .filter(|m| m.tournament_id.as_ref() == Some(tournament_id))
            .collect()
    }

    pub fn by_participant(&self, participant: &Participant) -> Vec<&Match> {
        self.matches.iter().filter(|m| m.involves(participant)).collect()
    }

    pub fn by_round(&self, tournament_id: &TournamentId, round: u32) -> Vec<&Match> {
        self.by_tournament(tournament_id)
            .into_iter()
            .filter(|m| m.round == round)
            .collect()
    }

    pub fn live(&self) -> Vec<&Match> {
        self.by_status(MatchStatus::InProgress)
    }

    /// Scheduled matches with a date, soonest first
    pub fn upcoming(&self, limit: usize) -> Vec<&Match> {
        let mut upcoming: Vec<&Match> = self
            .matches
            .iter()
            .filter(|m| m.status == MatchStatus::Scheduled && m.scheduled_date.is_some())
            .collect();
        upcoming.sort_by_key(|m| m.scheduled_date);
        upcoming.truncate(limit);
        upcoming
    }

    /// Match on participant names as well as the match's own fields.
    pub fn search(&self, term: &str, directory: &ParticipantDirectory<'_>) -> Vec<&Match> {
        let term = term.trim();
        if term.is_empty() {
            return self.matches.iter().collect();
        }
        let lowered = term.to_lowercase();
        self.matches
            .iter()
            .filter(|m| {
                m.matches_search(term)
                    || [&m.participant1, &m.participant2]
                        .into_iter()
                        .filter_map(|p| directory.name(p))
                        .any(|name| name.to_lowercase().contains(&lowered))
            })
            .collect()
    }

    pub fn participant_stats(&self, participant: &Participant) -> ParticipantStats {
        participant_stats(self.matches.iter(), participant)
    }
}

fn publish_score(bus: &mut EventBus, updated: &Match, outcome: &ScoreOutcome) {
    bus.publish(EventKind::MatchScoreUpdated, updated);
    match outcome {
        ScoreOutcome::Accepted => {}
        ScoreOutcome::SetClosed { set_number, winner } => {
            bus.publish(
                EventKind::MatchSetCompleted,
                &json!({ "matchId": &updated.id, "setNumber": set_number, "winner": winner }),
            );
        }
        ScoreOutcome::MatchClosed { set_number, winner } => {
            bus.publish(
                EventKind::MatchSetCompleted,
                &json!({ "matchId": &updated.id, "setNumber": set_number, "winner": winner }),
            );
            bus.publish(EventKind::MatchCompleted, updated);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Double, Player, Team};
    use crate::ranking::Rank;
    use chrono::Duration;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Fixture {
        players: Collection<Player>,
        doubles: Collection<Double>,
        teams: Collection<Team>,
    }

    impl Fixture {
        fn new() -> Self {
            let now = Utc::now();
            Self {
                players: Collection::from_vec(vec![
                    Player::new("Anna", "anna@club.vn", "12 Le Loi", Rank::Beginner, now),
                    Player::new("Bao", "bao@club.vn", "34 Tran Phu", Rank::Beginner, now),
                ]),
                doubles: Collection::new(),
                teams: Collection::new(),
            }
        }

        fn directory(&self) -> ParticipantDirectory<'_> {
            ParticipantDirectory::new(&self.players, &self.doubles, &self.teams)
        }

        fn pairing(&self) -> NewMatch {
            let slice = self.players.as_slice();
            NewMatch::between(slice[0].participant(), slice[1].participant())
        }
    }

    fn recorded_kinds(bus: &mut EventBus) -> Rc<RefCell<Vec<EventKind>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        bus.subscribe_all(move |event| sink.borrow_mut().push(event.kind));
        seen
    }

    #[test]
    fn test_create_requires_known_participants() {
        let fixture = Fixture::new();
        let mut bus = EventBus::new();
        let mut service = MatchService::new(Vec::new());

        let mut input = fixture.pairing();
        input.participant2 = Participant::Player("player_ghost".into());
        let err = service.create(input, &fixture.directory(), ScoringRules::default(), Utc::now(), &mut bus);
        assert!(matches!(err, Err(ClubError::Validation(_))));

        let mut input = fixture.pairing();
        input.scheduled_date = Some(Utc::now() - Duration::days(1));
        assert!(service
            .create(input, &fixture.directory(), ScoringRules::default(), Utc::now(), &mut bus)
            .is_err());
        assert!(service.matches().is_empty());
    }

    #[test]
    fn test_scoring_publishes_set_and_match_events() {
        let fixture = Fixture::new();
        let mut bus = EventBus::new();
        let mut service = MatchService::new(Vec::new());
        let scoring = ScoringRules {
            best_of: 3,
            ..ScoringRules::default()
        };
        let created = service
            .create(fixture.pairing(), &fixture.directory(), scoring, Utc::now(), &mut bus)
            .unwrap();
        let seen = recorded_kinds(&mut bus);

        service.start(&created.id, Utc::now(), &mut bus).unwrap();
        service.update_score(&created.id, 5, 3, Utc::now(), &mut bus).unwrap();
        service.update_score(&created.id, 11, 3, Utc::now(), &mut bus).unwrap();
        let (finished, outcome) = service.update_score(&created.id, 11, 7, Utc::now(), &mut bus).unwrap();

        assert_eq!(outcome, ScoreOutcome::MatchClosed { set_number: 2, winner: Side::One });
        assert_eq!(finished.status, MatchStatus::Completed);
        assert_eq!(
            *seen.borrow(),
            vec![
                EventKind::MatchStarted,
                EventKind::MatchScoreUpdated,
                EventKind::MatchScoreUpdated,
                EventKind::MatchSetCompleted,
                EventKind::MatchScoreUpdated,
                EventKind::MatchSetCompleted,
                EventKind::MatchCompleted,
            ]
        );
        assert!(service.update(&created.id, MatchUpdate::default(), Utc::now(), &mut bus).is_err());
    }

    #[test]
    fn test_overdue_match_keeps_descriptive_edits() {
        let fixture = Fixture::new();
        let mut bus = EventBus::new();
        let mut service = MatchService::new(Vec::new());
        let created = service
            .create(fixture.pairing(), &fixture.directory(), ScoringRules::default(), Utc::now(), &mut bus)
            .unwrap();
        let overdue = Utc::now() - Duration::days(2);
        service.matches.require_mut(&created.id).unwrap().scheduled_date = Some(overdue);

        let edited = service
            .update(
                &created.id,
                MatchUpdate {
                    venue: Some("Hall B".into()),
                    notes: Some("waiting on a court".into()),
                    ..MatchUpdate::default()
                },
                Utc::now(),
                &mut bus,
            )
            .unwrap();
        assert_eq!(edited.venue, "Hall B");
        assert_eq!(edited.scheduled_date, Some(overdue));

        let err = service
            .update(
                &created.id,
                MatchUpdate {
                    scheduled_date: Some(Utc::now() - Duration::hours(1)),
                    ..MatchUpdate::default()
                },
                Utc::now(),
                &mut bus,
            )
            .unwrap_err();
        assert!(matches!(err, ClubError::Validation(_)));
    }

    #[test]
    fn test_in_progress_match_cannot_be_deleted() {
        let fixture = Fixture::new();
        let mut bus = EventBus::new();
        let mut service = MatchService::new(Vec::new());
        let created = service
            .create(fixture.pairing(), &fixture.directory(), ScoringRules::default(), Utc::now(), &mut bus)
            .unwrap();

        service.start(&created.id, Utc::now(), &mut bus).unwrap();
        let err = service.delete(&created.id, &mut bus).unwrap_err();
        assert!(matches!(err, ClubError::InvalidState(_)));
        assert_eq!(service.live().len(), 1);

        service.cancel(&created.id, Some("rain"), Utc::now(), &mut bus).unwrap();
        assert!(service.delete(&created.id, &mut bus).is_ok());
    }

    #[test]
    fn test_search_matches_participant_names() {
        let fixture = Fixture::new();
        let mut bus = EventBus::new();
        let mut service = MatchService::new(Vec::new());
        let mut input = fixture.pairing();
        input.venue = "Hall A".into();
        service
            .create(input, &fixture.directory(), ScoringRules::default(), Utc::now(), &mut bus)
            .unwrap();

        assert_eq!(service.search("bao", &fixture.directory()).len(), 1);
        assert_eq!(service.search("hall", &fixture.directory()).len(), 1);
        assert!(service.search("nobody", &fixture.directory()).is_empty());
    }
}
