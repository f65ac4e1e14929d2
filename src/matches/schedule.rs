use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Timelike, Utc};
use serde::Serialize;

use super::model::{Match, MatchStatus};
use crate::config::ScheduleSettings;
use crate::domain::MatchId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSlot {
    pub match_id: MatchId,
    pub start_time: DateTime<Utc>,
    pub court: u32,
    pub round: u32,
}

/// Lay scheduled matches out over courts and daily time slots, earliest
/// round first. A slot that would start at or after the end hour moves to
/// the next morning.
pub fn plan_schedule<'a, I>(matches: I, start_date: NaiveDate, courts: u32, settings: &ScheduleSettings) -> Vec<ScheduleSlot>
where
    I: IntoIterator<Item = &'a Match>,
{
    let courts = courts.max(1);
    let mut pending: Vec<&Match> = matches
        .into_iter()
        .filter(|m| m.status == MatchStatus::Scheduled)
        .collect();
    pending.sort_by_key(|m| (m.round, m.match_number.unwrap_or(u32::MAX)));

    let mut day = start_date;
    let mut slot_time = day_start(day, settings);
    let mut slots = Vec::with_capacity(pending.len());

    for (index, m) in pending.into_iter().enumerate() {
        let court = (index as u32 % courts) + 1;
        if court == 1 && index > 0 {
            slot_time += Duration::minutes(settings.match_minutes + settings.break_minutes);
            if slot_time.date_naive() != day || slot_time.hour() >= settings.day_end_hour {
                day = day.succ_opt().unwrap_or(day);
                slot_time = day_start(day, settings);
            }
        }
        slots.push(ScheduleSlot {
            match_id: m.id.clone(),
            start_time: slot_time,
            court,
            round: m.round,
        });
    }
    slots
}

fn day_start(day: NaiveDate, settings: &ScheduleSettings) -> DateTime<Utc> {
    let time = NaiveTime::from_hms_opt(settings.day_start_hour, 0, 0).unwrap_or(NaiveTime::MIN);
    Utc.from_utc_datetime(&day.and_time(time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Participant, PlayerId};
    use crate::rules::ScoringRules;

    fn scheduled(n: usize) -> Vec<Match> {
        (0..n)
            .map(|i| {
                let mut m = Match::new(
                    Participant::Player(PlayerId::new(format!("p{i}"))),
                    Participant::Player(PlayerId::new(format!("q{i}"))),
                    ScoringRules::default(),
                    Utc::now(),
                );
                m.round = if i % 2 == 0 { 2 } else { 1 };
                m
            })
            .collect()
    }

    #[test]
    fn test_slots_rotate_courts_then_advance_time() {
        let matches = scheduled(4);
        let day = NaiveDate::from_ymd_opt(2025, 5, 10).unwrap();
        let slots = plan_schedule(&matches, day, 2, &ScheduleSettings::default());

        assert_eq!(slots.len(), 4);
        assert_eq!(slots[0].round, 1);
        assert_eq!(slots[0].start_time.hour(), 9);
        assert_eq!(slots[1].court, 2);
        assert_eq!(slots[1].start_time, slots[0].start_time);
        assert_eq!(slots[2].court, 1);
        assert_eq!(slots[2].start_time - slots[0].start_time, Duration::minutes(75));
    }

    #[test]
    fn test_late_slots_roll_to_next_day() {
        let matches = scheduled(12);
        let day = NaiveDate::from_ymd_opt(2025, 5, 10).unwrap();
        let slots = plan_schedule(&matches, day, 1, &ScheduleSettings::default());

        // 09:00 + 9 * 75 min = 20:15 is the last slot of the day
        assert_eq!(slots[9].start_time.date_naive(), day);
        assert_eq!(slots[10].start_time.date_naive(), day.succ_opt().unwrap());
        assert_eq!(slots[10].start_time.hour(), 9);
    }

    #[test]
    fn test_only_scheduled_matches_are_planned() {
        let mut matches = scheduled(2);
        matches[0].status = MatchStatus::Cancelled;
        let day = NaiveDate::from_ymd_opt(2025, 5, 10).unwrap();
        assert_eq!(plan_schedule(&matches, day, 1, &ScheduleSettings::default()).len(), 1);
    }
}
