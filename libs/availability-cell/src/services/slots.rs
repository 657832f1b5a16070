use chrono::{NaiveDate, NaiveDateTime, Timelike};
use tracing::{debug, warn};

use crate::models::{BlockedRange, DaySchedule, Slot, SlotRules, TimeOfDay};

/// Generates the bookable slot sheet for a single day.
///
/// Every method is pure: the current wall-clock time is an explicit
/// parameter, so a given (schedule, date, now) triple always produces the
/// same output and tests can pin "now" to a fixed value.
pub struct SlotCalculator {
    rules: SlotRules,
}

impl SlotCalculator {
    pub fn new(rules: SlotRules) -> Self {
        Self { rules }
    }

    /// Generate the ordered slot sheet for `date`.
    ///
    /// Closed days and days without opening hours yield an empty sheet;
    /// the consuming layer renders that as a "no slots" state. Slots are
    /// emitted in strictly increasing start order, so no sort is needed.
    pub fn generate_slots(
        &self,
        day: &DaySchedule,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> Vec<Slot> {
        if day.is_closed {
            return Vec::new();
        }
        let (Some(opening), Some(closing)) = (day.opening, day.closing) else {
            return Vec::new();
        };

        let duration = self.rules.slot_duration_minutes;
        if duration == 0 {
            warn!("Slot duration of zero configured, generating no slots");
            return Vec::new();
        }

        let closing_minutes = closing.minutes_from_midnight();
        let mut start = opening.minutes_from_midnight();
        let mut slots = Vec::new();

        // Only full-length slots inside the opening window are offered; a
        // trailing partial window is never emitted. Saturating keeps an
        // oversized duration from wrapping the bound check.
        while start.saturating_add(duration) <= closing_minutes {
            let end = start + duration;
            let available =
                !self.is_slot_unavailable(start, end, &day.unavailable_slots, date, now);

            slots.push(Slot {
                // Derived from the start offset so regeneration for the same
                // day is stable across renders.
                id: format!("slot-{}", start),
                time: TimeOfDay::from_minutes(start).to_string(),
                start_minutes: start,
                end_minutes: end,
                available,
            });

            start += duration;
        }

        debug!(
            "Generated {} slots for {} ({} bookable)",
            slots.len(),
            date,
            slots.iter().filter(|slot| slot.available).count()
        );

        slots
    }

    /// A slot cannot be booked when it is too close to "now" on the current
    /// day, or when it overlaps a blocked range.
    pub fn is_slot_unavailable(
        &self,
        slot_start_minutes: u32,
        slot_end_minutes: u32,
        blocked: &[BlockedRange],
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> bool {
        // Past-slot rule: on the current day, anything starting at or before
        // now + buffer is gone. Future dates skip this entirely.
        if date == now.date() {
            let now_minutes = now.hour() * 60 + now.minute();
            let cutoff = now_minutes.saturating_add(self.rules.booking_buffer_minutes);
            if slot_start_minutes <= cutoff {
                return true;
            }
        }

        blocked
            .iter()
            .any(|range| range.overlaps(slot_start_minutes, slot_end_minutes))
    }

    /// First bookable slot of the day, if any.
    pub fn first_available_slot(
        &self,
        day: &DaySchedule,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> Option<Slot> {
        self.generate_slots(day, date, now)
            .into_iter()
            .find(|slot| slot.available)
    }
}

impl Default for SlotCalculator {
    fn default() -> Self {
        Self::new(SlotRules::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_day(opening: &str, closing: &str) -> DaySchedule {
        DaySchedule {
            is_closed: false,
            opening: Some(TimeOfDay::parse(opening).unwrap()),
            closing: Some(TimeOfDay::parse(closing).unwrap()),
            unavailable_slots: Vec::new(),
        }
    }

    fn blocked(start: &str, end: &str) -> BlockedRange {
        BlockedRange {
            start_time: TimeOfDay::parse(start).unwrap(),
            end_time: TimeOfDay::parse(end).unwrap(),
        }
    }

    // A Wednesday well in the future relative to `now` below.
    fn future_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, 15).unwrap()
    }

    // Fixed "now": 2026-03-10 at 2:00 PM.
    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 10)
            .unwrap()
            .and_hms_opt(14, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_generation_completeness() {
        let calculator = SlotCalculator::default();
        let slots = calculator.generate_slots(&open_day("9:00 AM", "11:00 AM"), future_date(), now());

        assert_eq!(slots.len(), 4);
        assert_eq!(slots[0].time, "9:00 AM");
        assert_eq!(slots[1].time, "9:30 AM");
        assert_eq!(slots[2].time, "10:00 AM");
        assert_eq!(slots[3].time, "10:30 AM");
        assert_eq!(slots[0].id, "slot-540");
        assert_eq!(slots[3].end_minutes, 660);

        for pair in slots.windows(2) {
            assert!(pair[0].start_minutes < pair[1].start_minutes);
        }
        assert!(slots.iter().all(|slot| slot.available));
    }

    #[test]
    fn test_closed_day_generates_nothing() {
        let calculator = SlotCalculator::default();

        let mut day = open_day("9:00 AM", "5:00 PM");
        day.is_closed = true;
        assert!(calculator.generate_slots(&day, future_date(), now()).is_empty());

        assert!(calculator
            .generate_slots(&DaySchedule::closed(), future_date(), now())
            .is_empty());

        // Missing hours behave the same way.
        let mut day = open_day("9:00 AM", "5:00 PM");
        day.opening = None;
        assert!(calculator.generate_slots(&day, future_date(), now()).is_empty());
    }

    #[test]
    fn test_inverted_window_generates_nothing() {
        let calculator = SlotCalculator::default();

        assert!(calculator
            .generate_slots(&open_day("5:00 PM", "9:00 AM"), future_date(), now())
            .is_empty());

        // A window that opens and closes on the same minute is just as empty.
        assert!(calculator
            .generate_slots(&open_day("9:00 AM", "9:00 AM"), future_date(), now())
            .is_empty());
    }

    #[test]
    fn test_partial_trailing_window_is_not_emitted() {
        let calculator = SlotCalculator::default();
        let slots = calculator.generate_slots(&open_day("9:00 AM", "10:45 AM"), future_date(), now());

        // 9:00, 9:30, 10:00 fit; 10:30-11:00 would overhang the closing time.
        assert_eq!(slots.len(), 3);
        assert_eq!(slots.last().unwrap().end_minutes, 630);
    }

    #[test]
    fn test_empty_blocked_list_never_blocks_future_dates() {
        let calculator = SlotCalculator::default();
        assert!(!calculator.is_slot_unavailable(540, 570, &[], future_date(), now()));
        assert!(!calculator.is_slot_unavailable(1380, 1410, &[], future_date(), now()));
    }

    #[test]
    fn test_blocked_overlap_cases() {
        let calculator = SlotCalculator::default();
        let ranges = vec![blocked("10:00 AM", "11:00 AM")];
        let date = future_date();

        // Inside, containing, and edge-crossing slots all collide.
        assert!(calculator.is_slot_unavailable(615, 645, &ranges, date, now()));
        assert!(calculator.is_slot_unavailable(570, 690, &ranges, date, now()));
        assert!(calculator.is_slot_unavailable(590, 620, &ranges, date, now()));
        assert!(calculator.is_slot_unavailable(650, 680, &ranges, date, now()));

        // Strictly before and strictly after do not.
        assert!(!calculator.is_slot_unavailable(540, 570, &ranges, date, now()));
        assert!(!calculator.is_slot_unavailable(570, 600, &ranges, date, now()));
        assert!(!calculator.is_slot_unavailable(660, 690, &ranges, date, now()));
    }

    #[test]
    fn test_today_buffer_rule() {
        let calculator = SlotCalculator::default();
        let today = now().date();

        // now = 2:00 PM, buffer 30: cutoff is 2:30 PM.
        assert!(calculator.is_slot_unavailable(855, 885, &[], today, now())); // 2:15 PM
        assert!(calculator.is_slot_unavailable(780, 810, &[], today, now())); // 1:00 PM, already past
        assert!(calculator.is_slot_unavailable(870, 900, &[], today, now())); // 2:30 PM, exactly at cutoff
        assert!(!calculator.is_slot_unavailable(875, 905, &[], today, now())); // 2:35 PM

        // The same slots on a future date are unaffected.
        assert!(!calculator.is_slot_unavailable(855, 885, &[], future_date(), now()));
        assert!(!calculator.is_slot_unavailable(780, 810, &[], future_date(), now()));
    }

    #[test]
    fn test_generation_is_idempotent() {
        let calculator = SlotCalculator::default();
        let mut day = open_day("9:00 AM", "12:00 PM");
        day.unavailable_slots.push(blocked("10:00 AM", "10:30 AM"));

        let first = calculator.generate_slots(&day, future_date(), now());
        let second = calculator.generate_slots(&day, future_date(), now());

        assert_eq!(first, second);
        assert_eq!(first.iter().filter(|slot| !slot.available).count(), 1);
    }

    #[test]
    fn test_custom_rules_are_honored() {
        let calculator = SlotCalculator::new(SlotRules {
            slot_duration_minutes: 60,
            booking_buffer_minutes: 0,
        });

        let slots = calculator.generate_slots(&open_day("9:00 AM", "12:00 PM"), future_date(), now());
        assert_eq!(slots.len(), 3);
        assert_eq!(slots[0].end_minutes, 600);

        // Zero buffer: a slot starting right now is still cut off (start <= now).
        let today = now().date();
        assert!(calculator.is_slot_unavailable(840, 900, &[], today, now()));
        assert!(!calculator.is_slot_unavailable(841, 901, &[], today, now()));
    }

    #[test]
    fn test_zero_duration_generates_nothing() {
        let calculator = SlotCalculator::new(SlotRules {
            slot_duration_minutes: 0,
            booking_buffer_minutes: 30,
        });

        assert!(calculator.generate_slots(&open_day("9:00 AM", "5:00 PM"), future_date(), now()).is_empty());
    }

    #[test]
    fn test_oversized_rules_generate_nothing() {
        let calculator = SlotCalculator::new(SlotRules {
            slot_duration_minutes: u32::MAX,
            booking_buffer_minutes: u32::MAX,
        });

        let slots =
            calculator.generate_slots(&open_day("9:00 AM", "5:00 PM"), future_date(), now());
        assert!(slots.is_empty());

        // A buffer past the end of the day rules out all of today, and
        // nothing else.
        let today = now().date();
        assert!(calculator.is_slot_unavailable(1380, 1410, &[], today, now()));
        assert!(!calculator.is_slot_unavailable(1380, 1410, &[], future_date(), now()));
    }

    #[test]
    fn test_first_available_skips_blocked_morning() {
        let calculator = SlotCalculator::default();
        let mut day = open_day("9:00 AM", "12:00 PM");
        day.unavailable_slots.push(blocked("9:00 AM", "10:30 AM"));

        let slot = calculator.first_available_slot(&day, future_date(), now()).unwrap();
        assert_eq!(slot.time, "10:30 AM");
        assert!(slot.available);
    }
}
