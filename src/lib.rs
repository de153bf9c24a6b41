//! Cycle and fertility predictions from logged period history, plus
//! projection of future cycles into calendar events.
//!
//! Everything outside [`storage`] and [`commands`] is pure: no I/O, no shared
//! state, safe to call from any number of threads.

pub mod bbt;
pub mod calendar;
pub mod commands;
pub mod dates;
pub mod models;
pub mod prediction;
pub mod storage;
pub mod symptoms;

pub use calendar::{deep_link, project_events, to_ics, EventFilter};
pub use models::{
    BbtSample, Cycle, CycleEvent, CyclePrediction, EventType, ProfileDefaults, ResolvedProfile,
    TrackerData,
};
pub use prediction::{compute_prediction, detect_irregularity, AccuracyLabel};
