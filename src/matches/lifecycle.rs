use chrono::{DateTime, Utc};
use log::debug;

use super::model::{Match, MatchStatus, SetScore};
use crate::domain::{Participant, Side};
use crate::errors::{ClubError, ClubResult};

/// What a score update did to the match
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScoreOutcome {
    /// Scores recorded, no threshold crossed
    Accepted,
    SetClosed { set_number: u32, winner: Side },
    MatchClosed { set_number: u32, winner: Side },
}

impl Match {
    pub fn start(&mut self, now: DateTime<Utc>) -> ClubResult<()> {
        if self.status != MatchStatus::Scheduled {
            return Err(ClubError::invalid_state(format!(
                "match {} is {}, only scheduled matches can start",
                self.id, self.status
            )));
        }
        self.status = MatchStatus::InProgress;
        self.start_time = Some(now);
        self.updated_at = now;
        if self.score.open_set().is_none() {
            self.open_next_set();
        }
        debug!("Match {} started", self.id);
        Ok(())
    }

    /// Record the open set's scores. Negative inputs count as zero; scores
    /// above the set ceiling are rejected without touching the match.
    pub fn update_score(&mut self, score1: i64, score2: i64, now: DateTime<Utc>) -> ClubResult<ScoreOutcome> {
        self.require_in_progress("score")?;
        let score1 = clamp_score(score1);
        let score2 = clamp_score(score2);
        let ceiling = self.scoring.max_score;
        if score1 > ceiling || score2 > ceiling {
            return Err(ClubError::validation(format!(
                "set score {}-{} exceeds the maximum of {}",
                score1, score2, ceiling
            )));
        }

        let scoring = self.scoring;
        let set = self
            .score
            .open_set_mut()
            .ok_or_else(|| ClubError::invalid_state(format!("match {} has no open set", self.id)))?;
        set.score1 = score1;
        set.score2 = score2;
        let set_number = set.set_number;
        self.updated_at = now;

        let Some(set_winner) = scoring.is_set_won(score1, score2) else {
            return Ok(ScoreOutcome::Accepted);
        };
        set.completed = true;
        set.winner = Some(set_winner);
        match set_winner {
            Side::One => self.score.sets_won1 += 1,
            Side::Two => self.score.sets_won2 += 1,
        }
        debug!("Match {} set {} won by side {:?}", self.id, set_number, set_winner);

        match scoring.is_match_won(self.score.sets_won1, self.score.sets_won2) {
            Some(winner) => {
                self.complete(winner, now);
                Ok(ScoreOutcome::MatchClosed { set_number, winner })
            }
            None => {
                self.open_next_set();
                Ok(ScoreOutcome::SetClosed {
                    set_number,
                    winner: set_winner,
                })
            }
        }
    }

    pub fn increment_score(&mut self, side: Side, points: u32, now: DateTime<Utc>) -> ClubResult<ScoreOutcome> {
        let (score1, score2) = self.open_scores()?;
        let delta = i64::from(points);
        match side {
            Side::One => self.update_score(score1 + delta, score2, now),
            Side::Two => self.update_score(score1, score2 + delta, now),
        }
    }

    pub fn decrement_score(&mut self, side: Side, points: u32, now: DateTime<Utc>) -> ClubResult<ScoreOutcome> {
        let (score1, score2) = self.open_scores()?;
        let delta = i64::from(points);
        match side {
            Side::One => self.update_score(score1 - delta, score2, now),
            Side::Two => self.update_score(score1, score2 - delta, now),
        }
    }

    /// Finish early. Without an explicit winner the set tally must name one.
    pub fn end(&mut self, explicit_winner: Option<&Participant>, now: DateTime<Utc>) -> ClubResult<Side> {
        self.require_in_progress("end")?;
        let winner = match explicit_winner {
            Some(participant) => self.side_of(participant).ok_or_else(|| {
                ClubError::validation(format!("{} does not play in match {}", participant, self.id))
            })?,
            None => self.derive_winner().ok_or_else(|| {
                ClubError::invalid_state(format!(
                    "match {} is tied {}-{}, a winner must be given",
                    self.id, self.score.sets_won1, self.score.sets_won2
                ))
            })?,
        };

        if let Some(index) = self.score.sets.iter().position(|set| !set.completed) {
            let open = &mut self.score.sets[index];
            if open.score1 == 0 && open.score2 == 0 {
                self.score.sets.remove(index);
            } else {
                open.completed = true;
            }
        }
        self.complete(winner, now);
        Ok(winner)
    }

    pub fn cancel(&mut self, reason: Option<&str>, now: DateTime<Utc>) -> ClubResult<()> {
        if self.status.is_terminal() {
            return Err(ClubError::invalid_state(format!(
                "match {} is {} and cannot be cancelled",
                self.id, self.status
            )));
        }
        self.status = MatchStatus::Cancelled;
        self.notes = annotate("Cancelled", reason);
        self.updated_at = now;
        Ok(())
    }

    pub fn postpone(
        &mut self,
        new_date: Option<DateTime<Utc>>,
        reason: Option<&str>,
        now: DateTime<Utc>,
    ) -> ClubResult<()> {
        if self.status.is_terminal() {
            return Err(ClubError::invalid_state(format!(
                "match {} is {} and cannot be postponed",
                self.id, self.status
            )));
        }
        self.status = MatchStatus::Postponed;
        if new_date.is_some() {
            self.scheduled_date = new_date;
        }
        self.notes = annotate("Postponed", reason);
        self.updated_at = now;
        Ok(())
    }

    /// Put a postponed (or still scheduled) match back on the calendar.
    pub fn reschedule(&mut self, date: DateTime<Utc>, venue: Option<&str>, now: DateTime<Utc>) -> ClubResult<()> {
        if !matches!(self.status, MatchStatus::Scheduled | MatchStatus::Postponed) {
            return Err(ClubError::invalid_state(format!(
                "match {} is {} and cannot be rescheduled",
                self.id, self.status
            )));
        }
        if date < now {
            return Err(ClubError::validation("cannot schedule a match in the past"));
        }
        self.scheduled_date = Some(date);
        if let Some(venue) = venue {
            self.venue = venue.trim().to_string();
        }
        self.status = MatchStatus::Scheduled;
        self.updated_at = now;
        Ok(())
    }

    pub fn current_set(&self) -> Option<&SetScore> {
        self.score.open_set()
    }

    fn complete(&mut self, winner: Side, now: DateTime<Utc>) {
        self.status = MatchStatus::Completed;
        self.winner = Some(self.participant(winner).clone());
        self.end_time = Some(now);
        self.updated_at = now;
        self.score.refresh_points();
        debug!("Match {} completed, winner {}", self.id, self.participant(winner));
    }

    fn derive_winner(&self) -> Option<Side> {
        let (won1, won2) = (self.score.sets_won1, self.score.sets_won2);
        self.scoring.is_match_won(won1, won2).or(match won1.cmp(&won2) {
            std::cmp::Ordering::Greater => Some(Side::One),
            std::cmp::Ordering::Less => Some(Side::Two),
            std::cmp::Ordering::Equal => None,
        })
    }

    fn open_next_set(&mut self) {
        let set_number = self.score.sets.len() as u32 + 1;
        self.score.sets.push(SetScore::open(set_number));
    }

    fn open_scores(&self) -> ClubResult<(i64, i64)> {
        self.require_in_progress("score")?;
        self.score
            .open_set()
            .map(|set| (i64::from(set.score1), i64::from(set.score2)))
            .ok_or_else(|| ClubError::invalid_state(format!("match {} has no open set", self.id)))
    }

    fn require_in_progress(&self, action: &str) -> ClubResult<()> {
        if self.status == MatchStatus::InProgress {
            Ok(())
        } else {
            Err(ClubError::invalid_state(format!(
                "cannot {} match {} while it is {}",
                action, self.id, self.status
            )))
        }
    }
}

fn clamp_score(score: i64) -> u32 {
    score.clamp(0, i64::from(u32::MAX)) as u32
}

fn annotate(label: &str, reason: Option<&str>) -> String {
    match reason.map(str::trim).filter(|reason| !reason.is_empty()) {
        Some(reason) => format!("{}: {}", label, reason),
        None => label.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::PlayerId;
    use crate::rules::ScoringRules;
    use chrono::Duration;

    fn player(id: &str) -> Participant {
        Participant::Player(PlayerId::from(id))
    }

    fn started() -> Match {
        let mut m = Match::new(player("a"), player("b"), ScoringRules::default(), Utc::now());
        m.start(Utc::now()).unwrap();
        m
    }

    fn play_set(m: &mut Match, score1: i64, score2: i64) -> ScoreOutcome {
        m.update_score(score1, score2, Utc::now()).unwrap()
    }

    #[test]
    fn test_start_opens_first_set_once() {
        let mut m = started();
        assert_eq!(m.score.sets.len(), 1);
        assert_eq!(m.current_set().unwrap().set_number, 1);
        assert!(matches!(m.start(Utc::now()), Err(ClubError::InvalidState(_))));
    }

    #[test]
    fn test_scoring_a_scheduled_match_fails() {
        let mut m = Match::new(player("a"), player("b"), ScoringRules::default(), Utc::now());
        assert!(matches!(m.update_score(1, 0, Utc::now()), Err(ClubError::InvalidState(_))));
    }

    #[test]
    fn test_three_one_completes_with_first_side_winning() {
        let mut m = started();
        assert_eq!(play_set(&mut m, 11, 9), ScoreOutcome::SetClosed { set_number: 1, winner: Side::One });
        play_set(&mut m, 8, 11);
        play_set(&mut m, 11, 5);
        assert_eq!(m.status, MatchStatus::InProgress);
        assert_eq!(play_set(&mut m, 11, 7), ScoreOutcome::MatchClosed { set_number: 4, winner: Side::One });

        assert_eq!(m.status, MatchStatus::Completed);
        assert_eq!(m.winner, Some(player("a")));
        assert_eq!((m.score.sets_won1, m.score.sets_won2), (3, 1));
        assert_eq!((m.score.points1, m.score.points2), (41, 32));
        assert!(m.current_set().is_none());
        assert_eq!(m.score.summary_for(Side::One), "3-1 (11-9, 8-11, 11-5, 11-7)");
        assert_eq!(m.score.summary_for(Side::Two), "1-3 (9-11, 11-8, 5-11, 7-11)");
    }

    #[test]
    fn test_two_one_keeps_match_running() {
        let mut m = started();
        play_set(&mut m, 11, 3);
        play_set(&mut m, 4, 11);
        play_set(&mut m, 12, 10);
        assert_eq!(m.status, MatchStatus::InProgress);
        assert_eq!(m.current_set().unwrap().set_number, 4);
    }

    #[test]
    fn test_partial_scores_are_silently_accepted() {
        let mut m = started();
        assert_eq!(play_set(&mut m, 10, 10), ScoreOutcome::Accepted);
        assert_eq!(play_set(&mut m, 11, 10), ScoreOutcome::Accepted);
        assert_eq!(play_set(&mut m, -3, 2), ScoreOutcome::Accepted);
        assert_eq!(m.current_set().unwrap().score1, 0);
    }

    #[test]
    fn test_deuce_ceiling_closes_set() {
        let mut m = started();
        assert_eq!(play_set(&mut m, 21, 20), ScoreOutcome::SetClosed { set_number: 1, winner: Side::One });
    }

    #[test]
    fn test_score_above_ceiling_is_rejected_without_mutation() {
        let mut m = started();
        play_set(&mut m, 15, 15);
        let before = m.clone();
        assert!(matches!(m.update_score(22, 20, Utc::now()), Err(ClubError::Validation(_))));
        assert_eq!(m, before);
    }

    #[test]
    fn test_increment_and_decrement_work_on_open_set() {
        let mut m = started();
        m.increment_score(Side::Two, 3, Utc::now()).unwrap();
        m.decrement_score(Side::Two, 5, Utc::now()).unwrap();
        let set = m.current_set().unwrap();
        assert_eq!((set.score1, set.score2), (0, 0));
    }

    #[test]
    fn test_end_requires_derivable_winner() {
        let mut m = started();
        assert!(matches!(m.end(None, Utc::now()), Err(ClubError::InvalidState(_))));
        assert_eq!(m.status, MatchStatus::InProgress);

        play_set(&mut m, 11, 2);
        assert_eq!(m.end(None, Utc::now()).unwrap(), Side::One);
        assert_eq!(m.status, MatchStatus::Completed);
        assert_eq!(m.score.sets.len(), 1);
    }

    #[test]
    fn test_end_with_explicit_winner_checks_participant() {
        let mut m = started();
        assert!(matches!(m.end(Some(&player("zzz")), Utc::now()), Err(ClubError::Validation(_))));
        assert_eq!(m.end(Some(&player("b")), Utc::now()).unwrap(), Side::Two);
        assert_eq!(m.winner, Some(player("b")));
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        let mut m = started();
        m.cancel(Some("rain"), Utc::now()).unwrap();
        assert_eq!(m.notes, "Cancelled: rain");
        assert!(m.postpone(None, None, Utc::now()).is_err());
        assert!(m.cancel(None, Utc::now()).is_err());
        assert!(m.start(Utc::now()).is_err());
    }

    #[test]
    fn test_postpone_and_reschedule_round_trip() {
        let mut m = Match::new(player("a"), player("b"), ScoringRules::default(), Utc::now());
        let later = Utc::now() + Duration::days(3);
        m.postpone(Some(later), Some("hall booked"), Utc::now()).unwrap();
        assert_eq!(m.status, MatchStatus::Postponed);
        assert!(m.start(Utc::now()).is_err());

        m.reschedule(later, Some("Court hall B"), Utc::now()).unwrap();
        assert_eq!(m.status, MatchStatus::Scheduled);
        assert_eq!(m.venue, "Court hall B");
        assert!(m.reschedule(Utc::now() - Duration::days(1), None, Utc::now()).is_err());
    }

    #[test]
    fn test_validate_rejects_self_match_and_past_date() {
        let mut m = Match::new(player("a"), player("a"), ScoringRules::default(), Utc::now());
        m.scheduled_date = Some(Utc::now() - Duration::hours(2));
        assert_eq!(m.validate(Utc::now()).len(), 2);

        m.status = MatchStatus::Postponed;
        assert_eq!(m.validate(Utc::now()).len(), 1);
    }
}
