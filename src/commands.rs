use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::bbt::{self, OvulationShift};
use crate::calendar::{self, EventFilter};
use crate::models::*;
use crate::prediction::{self, AccuracyLabel, Confidence, Countdown, PhaseInfo};
use crate::storage::{self, StorageError};
use crate::symptoms::{self, SymptomCount};

/// Cycles projected when the caller does not say otherwise.
pub const DEFAULT_CYCLES_AHEAD: u32 = 3;
/// Ten years of roughly monthly cycles.
pub const MAX_CYCLES_AHEAD: u32 = 120;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("tracker data already exists at {0}")]
    AlreadySetUp(String),
    #[error("no projected event at index {index} ({available} available)")]
    EventIndex { index: usize, available: usize },
}

/// Everything the predictions view needs, computed in one pass.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PredictionReport {
    pub logged_cycles: usize,
    pub profile: ResolvedProfile,
    pub last_period_date: Option<NaiveDate>,
    pub prediction: Option<CyclePrediction>,
    pub accuracy_label: Option<AccuracyLabel>,
    pub confidence: Option<Confidence>,
    pub countdown: Option<Countdown>,
    pub phase: PhaseInfo,
    pub irregularity: Option<Irregularity>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExportOptions {
    pub cycles_ahead: u32,
    pub filter: EventFilter,
    /// Prepend the engine's next-period prediction as its own event.
    pub include_prediction: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            cycles_ahead: DEFAULT_CYCLES_AHEAD,
            filter: EventFilter::default(),
            include_prediction: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportSummary {
    pub path: String,
    pub events: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BbtReport {
    pub unit: TemperatureUnit,
    pub samples: usize,
    pub average: Option<f64>,
    pub shift: Option<OvulationShift>,
}

/// Write a fresh data file holding only the profile.
pub fn setup(path: &Path, profile: ProfileDefaults, force: bool) -> Result<(), CommandError> {
    if storage::data_exists(path) && !force {
        return Err(CommandError::AlreadySetUp(path.display().to_string()));
    }
    let data = TrackerData {
        profile,
        ..Default::default()
    };
    storage::save(path, &data)?;
    Ok(())
}

pub fn get_predictions(data: &TrackerData, today: NaiveDate) -> PredictionReport {
    let profile = data.profile.resolve();
    let anchor = profile.anchor(&data.cycles);
    let forecast = prediction::compute_prediction(&data.cycles, anchor, profile.cycle_length);

    if forecast.is_none() {
        log::info!("no period date logged yet, predictions unavailable");
    }

    PredictionReport {
        logged_cycles: data.cycles.len(),
        profile,
        last_period_date: anchor,
        accuracy_label: forecast
            .as_ref()
            .map(|p| prediction::accuracy_label(p.accuracy_score)),
        confidence: forecast
            .as_ref()
            .map(|p| prediction::confidence(data.cycles.len(), p.accuracy_score)),
        countdown: forecast
            .as_ref()
            .map(|p| prediction::period_countdown(p.next_period_date, today)),
        phase: prediction::current_phase(anchor, &profile, today),
        irregularity: prediction::detect_irregularity(&data.cycles, profile.cycle_length),
        prediction: forecast,
    }
}

pub fn get_stats(data: &TrackerData) -> CycleStats {
    prediction::cycle_stats(&data.cycles)
}

/// Projected events after filtering. Empty when no period date is known.
pub fn calendar_events(data: &TrackerData, options: &ExportOptions) -> Vec<CycleEvent> {
    let profile = data.profile.resolve();
    let Some(anchor) = profile.anchor(&data.cycles) else {
        return Vec::new();
    };

    let mut events = Vec::new();
    if options.include_prediction {
        if let Some(p) =
            prediction::compute_prediction(&data.cycles, Some(anchor), profile.cycle_length)
        {
            events.push(calendar::prediction_event(&p));
        }
    }
    let cycles_ahead = options.cycles_ahead.min(MAX_CYCLES_AHEAD);
    if cycles_ahead < options.cycles_ahead {
        log::warn!(
            "projecting {cycles_ahead} cycles instead of the requested {}",
            options.cycles_ahead
        );
    }
    events.extend(calendar::project_profile(anchor, &profile, cycles_ahead));

    options.filter.apply(events)
}

pub fn export_calendar(
    data: &TrackerData,
    options: &ExportOptions,
    out: &Path,
    stamp: DateTime<Utc>,
) -> Result<ExportSummary, CommandError> {
    let events = calendar_events(data, options);
    let ics = calendar::to_ics(&events, stamp);
    storage::write_calendar(out, &ics)?;

    Ok(ExportSummary {
        path: out.display().to_string(),
        events: events.len(),
    })
}

pub fn calendar_link(
    data: &TrackerData,
    options: &ExportOptions,
    index: usize,
) -> Result<String, CommandError> {
    let events = calendar_events(data, options);
    let event = events.get(index).ok_or(CommandError::EventIndex {
        index,
        available: events.len(),
    })?;
    Ok(calendar::deep_link(event))
}

pub fn bbt_report(data: &TrackerData) -> BbtReport {
    BbtReport {
        unit: data.bbt_unit,
        samples: data.bbt.len(),
        average: bbt::average_temperature(&data.bbt, data.bbt_unit),
        shift: bbt::detect_ovulation_shift(&data.bbt, data.bbt_unit),
    }
}

pub fn symptom_summary(data: &TrackerData, limit: usize) -> Vec<SymptomCount> {
    symptoms::top_symptoms(&data.symptoms, limit)
}
