use chrono::{Duration, NaiveDate, NaiveDateTime};
use tracing::debug;

use crate::models::{ClinicSchedule, DayAvailability, SlotRules, SuggestedSlot};
use crate::services::slots::SlotCalculator;

/// Answers availability questions against a clinic's weekly schedule.
pub struct AvailabilityService {
    calculator: SlotCalculator,
}

impl AvailabilityService {
    pub fn new(rules: SlotRules) -> Self {
        Self {
            calculator: SlotCalculator::new(rules),
        }
    }

    /// The full slot sheet for one calendar day.
    pub fn day_availability(
        &self,
        clinic: &ClinicSchedule,
        date: NaiveDate,
        now: NaiveDateTime,
    ) -> DayAvailability {
        let day = clinic.weekly_schedule.day_for(date);
        let slots = self.calculator.generate_slots(day, date, now);

        debug!(
            "Availability for clinic {} on {}: {} of {} slots bookable",
            clinic.clinic_id,
            date,
            slots.iter().filter(|slot| slot.available).count(),
            slots.len()
        );

        DayAvailability {
            date,
            is_closed: day.is_closed,
            slots,
        }
    }

    /// Scan forward from `from_date` for the earliest bookable slot.
    ///
    /// Searches `max_search_days` days starting at `from_date` itself, so
    /// today's remaining slots are considered before tomorrow's.
    pub fn find_next_available(
        &self,
        clinic: &ClinicSchedule,
        from_date: NaiveDate,
        now: NaiveDateTime,
        max_search_days: u32,
    ) -> Option<SuggestedSlot> {
        for offset in 0..max_search_days as i64 {
            let date = from_date + Duration::days(offset);
            let day = clinic.weekly_schedule.day_for(date);

            if let Some(slot) = self.calculator.first_available_slot(day, date, now) {
                debug!(
                    "Next available slot for clinic {}: {} at {}",
                    clinic.clinic_id, date, slot.time
                );
                return Some(SuggestedSlot { date, slot });
            }
        }

        debug!(
            "No available slot for clinic {} within {} days of {}",
            clinic.clinic_id, max_search_days, from_date
        );
        None
    }
}

impl Default for AvailabilityService {
    fn default() -> Self {
        Self::new(SlotRules::default())
    }
}
