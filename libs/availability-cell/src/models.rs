use chrono::{Datelike, NaiveDate, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Display times arrive from the backend as 12-hour strings ("9:00 AM").
static TIME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*(\d{1,2}):(\d{2})\s*([AP]M)\s*$").unwrap());

/// Wall-clock time of day, normalized to the 24-hour convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TimeOfDay {
    pub hour: u32,   // 0-23 after meridiem normalization
    pub minute: u32, // 0-59
}

impl TimeOfDay {
    /// Parse a display time string of the form `H:MM AM|PM`.
    ///
    /// The meridiem is case-insensitive and the hour may omit a leading
    /// zero. Malformed strings are reported instead of degrading to a
    /// nonsense minute value: the caller decides on a fallback.
    pub fn parse(input: &str) -> Result<Self, ScheduleError> {
        let captures = TIME_PATTERN
            .captures(input)
            .ok_or_else(|| ScheduleError::UnrecognizedTimeFormat(input.to_string()))?;

        let hour: u32 = captures[1]
            .parse()
            .map_err(|_| ScheduleError::UnrecognizedTimeFormat(input.to_string()))?;
        let minute: u32 = captures[2]
            .parse()
            .map_err(|_| ScheduleError::UnrecognizedTimeFormat(input.to_string()))?;

        if !(1..=12).contains(&hour) || minute > 59 {
            return Err(ScheduleError::TimeComponentOutOfRange(input.to_string()));
        }

        // 12 AM is midnight, 12 PM stays noon, other PM hours shift by 12.
        let is_pm = captures[3].eq_ignore_ascii_case("PM");
        let hour = match (hour, is_pm) {
            (12, false) => 0,
            (12, true) => 12,
            (hour, false) => hour,
            (hour, true) => hour + 12,
        };

        Ok(Self { hour, minute })
    }

    /// Minutes since midnight, in 0-1439.
    pub fn minutes_from_midnight(&self) -> u32 {
        self.hour * 60 + self.minute
    }

    /// Inverse of `minutes_from_midnight`; wraps past 24 hours.
    pub fn from_minutes(minutes: u32) -> Self {
        let minutes = minutes % (24 * 60);
        Self {
            hour: minutes / 60,
            minute: minutes % 60,
        }
    }
}

impl std::fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let meridiem = if self.hour < 12 { "AM" } else { "PM" };
        let hour = match self.hour % 12 {
            0 => 12,
            hour => hour,
        };
        write!(f, "{}:{:02} {}", hour, self.minute, meridiem)
    }
}

impl TryFrom<String> for TimeOfDay {
    type Error = ScheduleError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<TimeOfDay> for String {
    fn from(value: TimeOfDay) -> Self {
        value.to_string()
    }
}

/// Sub-interval of a day already taken by an existing booking or a manual
/// block, supplied by the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockedRange {
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
}

impl BlockedRange {
    pub fn start_minutes(&self) -> u32 {
        self.start_time.minutes_from_midnight()
    }

    pub fn end_minutes(&self) -> u32 {
        self.end_time.minutes_from_midnight()
    }

    /// Half-open interval overlap test: a candidate slot collides with this
    /// range when slot_start < blocked_end AND slot_end > blocked_start.
    pub fn overlaps(&self, slot_start_minutes: u32, slot_end_minutes: u32) -> bool {
        slot_start_minutes < self.end_minutes() && slot_end_minutes > self.start_minutes()
    }

    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.start_minutes() > self.end_minutes() {
            return Err(ScheduleError::InvertedBlockedRange {
                start: self.start_time,
                end: self.end_time,
            });
        }
        Ok(())
    }
}

/// Opening hours and blocked ranges for one day of the week.
///
/// Empty or null opening/closing strings deserialize to `None`; slot
/// generation treats a day without both as having no bookable slots.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySchedule {
    #[serde(default)]
    pub is_closed: bool,
    #[serde(default, deserialize_with = "time_or_none")]
    pub opening: Option<TimeOfDay>,
    #[serde(default, deserialize_with = "time_or_none")]
    pub closing: Option<TimeOfDay>,
    #[serde(default)]
    pub unavailable_slots: Vec<BlockedRange>,
}

impl DaySchedule {
    /// A day the clinic never opens.
    pub fn closed() -> Self {
        Self {
            is_closed: true,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ScheduleError> {
        if let (Some(opening), Some(closing)) = (self.opening, self.closing) {
            if opening.minutes_from_midnight() >= closing.minutes_from_midnight() {
                return Err(ScheduleError::InvalidOpeningHours { opening, closing });
            }
        }
        for blocked in &self.unavailable_slots {
            blocked.validate()?;
        }
        Ok(())
    }
}

fn time_or_none<'de, D>(deserializer: D) -> Result<Option<TimeOfDay>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some(value) => TimeOfDay::parse(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

/// One `DaySchedule` per weekday for a single clinic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WeekSchedule {
    #[serde(default)]
    pub monday: DaySchedule,
    #[serde(default)]
    pub tuesday: DaySchedule,
    #[serde(default)]
    pub wednesday: DaySchedule,
    #[serde(default)]
    pub thursday: DaySchedule,
    #[serde(default)]
    pub friday: DaySchedule,
    #[serde(default)]
    pub saturday: DaySchedule,
    #[serde(default)]
    pub sunday: DaySchedule,
}

impl WeekSchedule {
    /// The schedule day matching the calendar date's weekday.
    pub fn day_for(&self, date: NaiveDate) -> &DaySchedule {
        match date.weekday() {
            Weekday::Mon => &self.monday,
            Weekday::Tue => &self.tuesday,
            Weekday::Wed => &self.wednesday,
            Weekday::Thu => &self.thursday,
            Weekday::Fri => &self.friday,
            Weekday::Sat => &self.saturday,
            Weekday::Sun => &self.sunday,
        }
    }

    pub fn validate(&self) -> Result<(), ScheduleError> {
        for day in [
            &self.monday,
            &self.tuesday,
            &self.wednesday,
            &self.thursday,
            &self.friday,
            &self.saturday,
            &self.sunday,
        ] {
            day.validate()?;
        }
        Ok(())
    }
}

/// The per-clinic schedule envelope the backend returns.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicSchedule {
    pub clinic_id: Uuid,
    pub clinic_name: String,
    pub weekly_schedule: WeekSchedule,
}

impl ClinicSchedule {
    pub fn validate(&self) -> Result<(), ScheduleError> {
        self.weekly_schedule.validate()
    }
}

/// Slot policy knobs. The defaults preserve the production behavior:
/// 30-minute slots and a 30-minute same-day booking buffer.
#[derive(Debug, Clone, Copy)]
pub struct SlotRules {
    pub slot_duration_minutes: u32,
    pub booking_buffer_minutes: u32,
}

impl Default for SlotRules {
    fn default() -> Self {
        Self {
            slot_duration_minutes: 30,
            booking_buffer_minutes: 30,
        }
    }
}

/// A fixed-duration bookable window, generated fresh on every calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    pub id: String,
    pub time: String,
    pub start_minutes: u32,
    pub end_minutes: u32,
    pub available: bool,
}

// Per-day view model handed to the rendering layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub is_closed: bool,
    pub slots: Vec<Slot>,
}

impl DayAvailability {
    pub fn available_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.available).count()
    }

    pub fn has_availability(&self) -> bool {
        self.slots.iter().any(|slot| slot.available)
    }
}

// Result of scanning forward for the next bookable slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestedSlot {
    pub date: NaiveDate,
    pub slot: Slot,
}

// Error types specific to schedule parsing and validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum ScheduleError {
    #[error("unrecognized time format: {0:?}")]
    UnrecognizedTimeFormat(String),

    #[error("time component out of range: {0:?}")]
    TimeComponentOutOfRange(String),

    #[error("opening time {opening} must be before closing time {closing}")]
    InvalidOpeningHours {
        opening: TimeOfDay,
        closing: TimeOfDay,
    },

    #[error("blocked range starts at {start} but ends at {end}")]
    InvertedBlockedRange { start: TimeOfDay, end: TimeOfDay },
}
