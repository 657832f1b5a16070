use std::{env, fs};

use anyhow::Context;
use chrono::{Local, NaiveDate};
use dotenv::dotenv;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use availability_cell::models::{ClinicSchedule, DayAvailability, SlotRules};
use availability_cell::services::AvailabilityService;

const NEXT_AVAILABLE_SEARCH_DAYS: u32 = 14;
const MAX_RULE_MINUTES: u32 = 24 * 60;

#[derive(Debug, Clone)]
struct PreviewConfig {
    schedule_file: String,
    rules: SlotRules,
}

impl PreviewConfig {
    fn from_env() -> Self {
        let schedule_file = env::var("SCHEDULE_FILE").unwrap_or_else(|_| {
            warn!("SCHEDULE_FILE not set, using schedule.json");
            "schedule.json".to_string()
        });

        let defaults = SlotRules::default();
        Self {
            schedule_file,
            rules: SlotRules {
                slot_duration_minutes: minutes_var(
                    "SLOT_DURATION_MINUTES",
                    defaults.slot_duration_minutes,
                ),
                booking_buffer_minutes: minutes_var(
                    "BOOKING_BUFFER_MINUTES",
                    defaults.booking_buffer_minutes,
                ),
            },
        }
    }
}

fn minutes_var(name: &str, default: u32) -> u32 {
    match env::var(name) {
        Ok(raw) => parse_minutes(name, &raw, default),
        Err(_) => default,
    }
}

// Rules are minutes within a day; anything else falls back to the default.
fn parse_minutes(name: &str, raw: &str, default: u32) -> u32 {
    match raw.parse::<u32>() {
        Ok(minutes) if minutes <= MAX_RULE_MINUTES => minutes,
        _ => {
            warn!(
                "{} must be a number of minutes within a day, using {}",
                name, default
            );
            default
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = PreviewConfig::from_env();
    let clinic = load_schedule(&config.schedule_file)?;

    if let Err(error) = clinic.validate() {
        warn!("Schedule for {} has issues: {}", clinic.clinic_name, error);
    }

    let now = Local::now().naive_local();
    let date = match env::args().nth(1) {
        Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
            .with_context(|| format!("invalid date argument {:?}, expected YYYY-MM-DD", raw))?,
        None => now.date(),
    };

    let service = AvailabilityService::new(config.rules);
    let sheet = service.day_availability(&clinic, date, now);

    info!("Slot sheet for {} on {}", clinic.clinic_name, date);
    print_sheet(&sheet);

    if !sheet.has_availability() {
        match service.find_next_available(&clinic, date, now, NEXT_AVAILABLE_SEARCH_DAYS) {
            Some(suggestion) => {
                println!("Next available: {} at {}", suggestion.date, suggestion.slot.time)
            }
            None => println!(
                "No availability within the next {} days",
                NEXT_AVAILABLE_SEARCH_DAYS
            ),
        }
    }

    Ok(())
}

fn load_schedule(path: &str) -> anyhow::Result<ClinicSchedule> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read schedule file {}", path))?;
    let clinic = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse schedule file {}", path))?;
    Ok(clinic)
}

fn print_sheet(sheet: &DayAvailability) {
    if sheet.is_closed {
        println!("{}: closed", sheet.date);
        return;
    }
    if sheet.slots.is_empty() {
        println!("{}: no bookable hours", sheet.date);
        return;
    }

    for slot in &sheet.slots {
        let marker = if slot.available { "open" } else { "----" };
        println!("  {:>8}  [{}]", slot.time, marker);
    }
    println!(
        "{} of {} slots available",
        sheet.available_count(),
        sheet.slots.len()
    );
}
