pub mod schedule;
pub mod slots;

pub use schedule::AvailabilityService;
pub use slots::SlotCalculator;
