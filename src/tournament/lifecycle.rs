use chrono::{DateTime, Utc};
use log::debug;

use super::bracket::{Bracket, ReadyPairing};
use super::model::{Progress, Tournament, TournamentFormat, TournamentStatus};
use super::standings::{StandingEntry, assign_final_ranks, calculate_standings};
use crate::domain::{MatchId, Participant};
use crate::errors::{ClubError, ClubResult};
use crate::matches::{Match, MatchStatus};
use crate::rules::ScoringRules;

impl Tournament {
    pub fn open_registration(&mut self, now: DateTime<Utc>) -> ClubResult<()> {
        if self.status != TournamentStatus::Planning {
            return Err(ClubError::invalid_state(format!(
                "tournament {} is {}, registration opens only from planning",
                self.name, self.status
            )));
        }
        self.status = TournamentStatus::Registration;
        self.updated_at = now;
        Ok(())
    }

    pub fn add_participant(&mut self, participant: Participant, now: DateTime<Utc>) -> ClubResult<()> {
        if !matches!(self.status, TournamentStatus::Planning | TournamentStatus::Registration) {
            return Err(ClubError::invalid_state(format!(
                "tournament {} is {} and no longer takes entries",
                self.name, self.status
            )));
        }
        if self.participants.len() >= self.max_participants {
            return Err(ClubError::validation(format!(
                "tournament {} is full ({} participants)",
                self.name, self.max_participants
            )));
        }
        if self.has_participant(&participant) {
            return Err(ClubError::validation(format!("{} is already registered", participant)));
        }
        if self.registration_deadline.is_some_and(|deadline| now > deadline) {
            return Err(ClubError::validation(format!("registration for {} has closed", self.name)));
        }
        if !self.tournament_type.accepts(&participant) {
            return Err(ClubError::validation(format!(
                "{} cannot enter a {} tournament",
                participant,
                self.tournament_type.as_str()
            )));
        }
        // Mixed events take any kind, but the first entrant fixes it for the rest.
        if let Some(first) = self.participants.first() {
            if first.match_type() != participant.match_type() {
                return Err(ClubError::validation(format!(
                    "{} cannot enter {}, its entrants play {}",
                    participant,
                    self.name,
                    first.match_type()
                )));
            }
        }
        self.participants.push(participant);
        self.updated_at = now;
        Ok(())
    }

    /// Returns false when the participant was not registered
    pub fn remove_participant(&mut self, participant: &Participant, now: DateTime<Utc>) -> ClubResult<bool> {
        if matches!(self.status, TournamentStatus::InProgress | TournamentStatus::Completed) {
            return Err(ClubError::invalid_state(format!(
                "cannot withdraw from tournament {} while it is {}",
                self.name, self.status
            )));
        }
        let Some(position) = self.participants.iter().position(|p| p == participant) else {
            return Ok(false);
        };
        self.participants.remove(position);
        self.updated_at = now;
        Ok(true)
    }

    /// Move to in-progress and return the matches to create.
    ///
    /// Round robin (and swiss) pairs everyone once in round 1; single
    /// elimination builds the bracket and returns every match whose sides
    /// are already known.
    pub fn start(&mut self, scoring: ScoringRules, now: DateTime<Utc>) -> ClubResult<Vec<Match>> {
        if self.status != TournamentStatus::Registration {
            return Err(ClubError::invalid_state(format!(
                "tournament {} is {}, only tournaments in registration can start",
                self.name, self.status
            )));
        }
        if self.participants.len() < 2 {
            return Err(ClubError::validation(format!(
                "tournament {} needs at least 2 participants",
                self.name
            )));
        }
        if let Some(first) = self.participants.first() {
            let kind = first.match_type();
            if let Some(odd) = self.participants.iter().find(|p| p.match_type() != kind) {
                return Err(ClubError::validation(format!(
                    "tournament {} mixes {} entrants with {}",
                    self.name, kind, odd
                )));
            }
        }

        let (matches, bracket) = match self.format {
            TournamentFormat::RoundRobin | TournamentFormat::Swiss => (self.round_robin(scoring, now), None),
            TournamentFormat::SingleElimination => {
                let mut bracket = Bracket::build(&self.id, &self.participants)?;
                let ready = bracket.take_ready();
                (self.bracket_matches(ready, scoring, now), Some(bracket))
            }
        };

        self.status = TournamentStatus::InProgress;
        self.bracket = bracket;
        self.matches = matches.iter().map(|m| m.id.clone()).collect();
        self.start_date.get_or_insert(now);
        self.updated_at = now;
        debug!("Tournament {} started with {} matches", self.name, matches.len());
        Ok(matches)
    }

    /// Feed a completed elimination match into the bracket; returns newly playable matches.
    ///
    /// Only a running tournament advances; a completed or cancelled one keeps its bracket as is.
    pub fn advance_bracket(&mut self, completed: &Match, scoring: ScoringRules, now: DateTime<Utc>) -> ClubResult<Vec<Match>> {
        if self.status != TournamentStatus::InProgress {
            debug!("Tournament {} is {}, bracket left unchanged", self.name, self.status);
            return Ok(Vec::new());
        }
        if completed.status != MatchStatus::Completed {
            return Err(ClubError::invalid_state(format!("match {} is not completed", completed.id)));
        }
        let Some(winner) = completed.winner.clone() else {
            return Err(ClubError::validation(format!("match {} has no winner to advance", completed.id)));
        };
        let Some(bracket) = self.bracket.as_mut() else {
            return Ok(Vec::new());
        };
        if !bracket.contains_match(&completed.id) {
            return Ok(Vec::new());
        }
        bracket.record_winner(&completed.id, &winner)?;
        let ready = bracket.take_ready();

        let created = self.bracket_matches(ready, scoring, now);
        self.matches.extend(created.iter().map(|m| m.id.clone()));
        self.updated_at = now;
        Ok(created)
    }

    pub fn calculate_standings<'a, I>(&self, matches: I) -> Vec<StandingEntry>
    where
        I: IntoIterator<Item = &'a Match>,
    {
        calculate_standings(&self.id, &self.participants, matches)
    }

    /// Finalise standings with 1-based ranks.
    pub fn complete<'a, I>(&mut self, matches: I, now: DateTime<Utc>) -> ClubResult<&[StandingEntry]>
    where
        I: IntoIterator<Item = &'a Match>,
    {
        if self.status != TournamentStatus::InProgress {
            return Err(ClubError::invalid_state(format!(
                "tournament {} is {}, only running tournaments can complete",
                self.name, self.status
            )));
        }
        let mut standings = self.calculate_standings(matches);
        assign_final_ranks(&mut standings);

        self.standings = standings;
        self.status = TournamentStatus::Completed;
        self.end_date = Some(now);
        self.updated_at = now;
        Ok(&self.standings)
    }

    pub fn cancel(&mut self, now: DateTime<Utc>) -> ClubResult<()> {
        if self.status.is_terminal() {
            return Err(ClubError::invalid_state(format!(
                "tournament {} is already {}",
                self.name, self.status
            )));
        }
        self.status = TournamentStatus::Cancelled;
        self.updated_at = now;
        Ok(())
    }

    pub fn progress<'a, I>(&self, matches: I) -> Progress
    where
        I: IntoIterator<Item = &'a Match>,
    {
        let total_matches = self.matches.len();
        let completed_matches = matches
            .into_iter()
            .filter(|m| m.status == MatchStatus::Completed && self.matches.contains(&m.id))
            .count();
        let percentage = if total_matches == 0 {
            0
        } else {
            (100.0 * completed_matches as f64 / total_matches as f64).round() as u32
        };
        Progress {
            total_matches,
            completed_matches,
            percentage,
        }
    }

    fn round_robin(&self, scoring: ScoringRules, now: DateTime<Utc>) -> Vec<Match> {
        let mut matches = Vec::new();
        for (i, first) in self.participants.iter().enumerate() {
            for (j, second) in self.participants.iter().enumerate().skip(i + 1) {
                let id = MatchId::new(format!("match_{}_{}_{}", self.id, i, j));
                let number = matches.len() as u32 + 1;
                matches.push(
                    Match::with_id(id, first.clone(), second.clone(), scoring, now)
                        .in_tournament(self.id.clone(), 1, number),
                );
            }
        }
        matches
    }

    fn bracket_matches(&self, ready: Vec<ReadyPairing>, scoring: ScoringRules, now: DateTime<Utc>) -> Vec<Match> {
        let offset = self.matches.len() as u32;
        ready
            .into_iter()
            .enumerate()
            .map(|(index, pairing)| {
                Match::with_id(pairing.match_id, pairing.participant1, pairing.participant2, scoring, now)
                    .in_tournament(self.id.clone(), pairing.round, offset + index as u32 + 1)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{DoubleId, PlayerId};
    use crate::tournament::TournamentType;
    use chrono::Duration;

    fn player(id: &str) -> Participant {
        Participant::Player(PlayerId::from(id))
    }

    fn open_tournament(format: TournamentFormat, names: &[&str]) -> Tournament {
        let mut t = Tournament::new("Spring Cup", TournamentType::Singles, format, 32, Utc::now());
        t.open_registration(Utc::now()).unwrap();
        for name in names {
            t.add_participant(player(name), Utc::now()).unwrap();
        }
        t
    }

    #[test]
    fn test_round_robin_pairs_everyone_once() {
        let mut t = open_tournament(TournamentFormat::RoundRobin, &["a", "b", "c", "d"]);
        let matches = t.start(ScoringRules::default(), Utc::now()).unwrap();

        assert_eq!(matches.len(), 6);
        assert!(matches.iter().all(|m| m.round == 1));
        let mut pairs: Vec<(String, String)> = matches
            .iter()
            .map(|m| {
                let mut pair = [m.participant1.id_str().to_string(), m.participant2.id_str().to_string()];
                pair.sort();
                (pair[0].clone(), pair[1].clone())
            })
            .collect();
        pairs.sort();
        pairs.dedup();
        assert_eq!(pairs.len(), 6);
        assert_eq!(t.status, TournamentStatus::InProgress);
        assert_eq!(t.matches.len(), 6);
        assert!(t.start_date.is_some());
    }

    #[test]
    fn test_swiss_falls_back_to_round_robin() {
        let mut t = open_tournament(TournamentFormat::Swiss, &["a", "b", "c"]);
        assert_eq!(t.start(ScoringRules::default(), Utc::now()).unwrap().len(), 3);
    }

    #[test]
    fn test_elimination_creates_only_playable_matches() {
        let mut t = open_tournament(TournamentFormat::SingleElimination, &["a", "b", "c", "d", "e"]);
        let matches = t.start(ScoringRules::default(), Utc::now()).unwrap();
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].round, 1);
        assert_eq!(matches[1].round, 2);
        assert_eq!(t.bracket.as_ref().unwrap().match_count(), 4);
    }

    #[test]
    fn test_start_requires_registration_and_two_entrants() {
        let mut t = Tournament::new("Cup", TournamentType::Singles, TournamentFormat::RoundRobin, 8, Utc::now());
        assert!(matches!(t.start(ScoringRules::default(), Utc::now()), Err(ClubError::InvalidState(_))));
        t.open_registration(Utc::now()).unwrap();
        t.add_participant(player("a"), Utc::now()).unwrap();
        assert!(matches!(t.start(ScoringRules::default(), Utc::now()), Err(ClubError::Validation(_))));
        assert_eq!(t.status, TournamentStatus::Registration);
    }

    #[test]
    fn test_registration_limits() {
        let mut t = Tournament::new("Cup", TournamentType::Singles, TournamentFormat::RoundRobin, 2, Utc::now());
        t.add_participant(player("a"), Utc::now()).unwrap();
        assert!(t.add_participant(player("a"), Utc::now()).is_err());
        t.add_participant(player("b"), Utc::now()).unwrap();
        assert!(t.add_participant(player("c"), Utc::now()).is_err());

        let mut late = Tournament::new("Late", TournamentType::Singles, TournamentFormat::RoundRobin, 8, Utc::now());
        late.registration_deadline = Some(Utc::now() - Duration::hours(1));
        assert!(late.add_participant(player("a"), Utc::now()).is_err());

        let mut doubles = Tournament::new("Pairs", TournamentType::Doubles, TournamentFormat::RoundRobin, 8, Utc::now());
        assert!(doubles.add_participant(player("a"), Utc::now()).is_err());
    }

    #[test]
    fn test_withdrawal_blocked_once_running() {
        let mut t = open_tournament(TournamentFormat::RoundRobin, &["a", "b", "c"]);
        assert!(t.remove_participant(&player("c"), Utc::now()).unwrap());
        assert!(!t.remove_participant(&player("z"), Utc::now()).unwrap());
        t.start(ScoringRules::default(), Utc::now()).unwrap();
        assert!(t.remove_participant(&player("a"), Utc::now()).is_err());
        assert!(t.add_participant(player("d"), Utc::now()).is_err());
    }

    #[test]
    fn test_complete_ranks_and_blocks_cancel() {
        let mut t = open_tournament(TournamentFormat::RoundRobin, &["a", "b"]);
        let mut matches = t.start(ScoringRules::default(), Utc::now()).unwrap();
        let m = &mut matches[0];
        m.start(Utc::now()).unwrap();
        for _ in 0..3 {
            m.update_score(3, 11, Utc::now()).unwrap();
        }

        assert_eq!(t.progress(&matches).percentage, 100);
        let standings = t.complete(&matches, Utc::now()).unwrap();
        assert_eq!(standings[0].participant, player("b"));
        assert_eq!(standings[0].final_rank, Some(1));
        assert!(matches!(t.cancel(Utc::now()), Err(ClubError::InvalidState(_))));
    }

    #[test]
    fn test_advance_bracket_materialises_next_round() {
        let mut t = open_tournament(TournamentFormat::SingleElimination, &["a", "b", "c", "d"]);
        let mut matches = t.start(ScoringRules::default(), Utc::now()).unwrap();
        let mut created = Vec::new();
        for m in matches.iter_mut() {
            m.start(Utc::now()).unwrap();
            m.end(Some(&m.participant1.clone()), Utc::now()).unwrap();
            created.extend(t.advance_bracket(m, ScoringRules::default(), Utc::now()).unwrap());
        }
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].round, 2);
        assert_eq!(created[0].participant1, player("a"));
        assert_eq!(created[0].participant2, player("c"));
        assert_eq!(t.matches.len(), 3);
    }

    #[test]
    fn test_cancelled_bracket_stops_advancing() {
        let mut t = open_tournament(TournamentFormat::SingleElimination, &["a", "b", "c", "d"]);
        let mut matches = t.start(ScoringRules::default(), Utc::now()).unwrap();
        t.cancel(Utc::now()).unwrap();

        for m in matches.iter_mut() {
            m.start(Utc::now()).unwrap();
            m.end(Some(&m.participant1.clone()), Utc::now()).unwrap();
            assert!(t.advance_bracket(m, ScoringRules::default(), Utc::now()).unwrap().is_empty());
        }
        assert_eq!(t.status, TournamentStatus::Cancelled);
        assert_eq!(t.matches.len(), 2);
    }

    #[test]
    fn test_mixed_entrants_share_one_kind() {
        let mut t = Tournament::new("Open", TournamentType::Mixed, TournamentFormat::RoundRobin, 8, Utc::now());
        t.open_registration(Utc::now()).unwrap();
        t.add_participant(Participant::Double(DoubleId::from("double_1")), Utc::now()).unwrap();

        let err = t.add_participant(player("a"), Utc::now()).unwrap_err();
        assert!(matches!(err, ClubError::Validation(_)));
        t.add_participant(Participant::Double(DoubleId::from("double_2")), Utc::now()).unwrap();
        assert_eq!(t.participants.len(), 2);
    }

    #[test]
    fn test_start_refuses_entrants_of_different_kinds() {
        let mut t = Tournament::new("Open", TournamentType::Mixed, TournamentFormat::RoundRobin, 8, Utc::now());
        t.open_registration(Utc::now()).unwrap();
        t.participants = vec![Participant::Double(DoubleId::from("double_1")), player("a")];

        let err = t.start(ScoringRules::default(), Utc::now()).unwrap_err();
        assert!(matches!(err, ClubError::Validation(_)));
        assert_eq!(t.status, TournamentStatus::Registration);
    }
}
