use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dates::days_between;

pub const DEFAULT_CYCLE_LENGTH: u32 = 28;
pub const DEFAULT_PERIOD_LENGTH: u32 = 5;

pub const MIN_CYCLE_LENGTH: u32 = 20;
pub const MAX_CYCLE_LENGTH: u32 = 45;
pub const MIN_PERIOD_LENGTH: u32 = 3;
pub const MAX_PERIOD_LENGTH: u32 = 10;

/// One logged cycle. An absent `end_date` means the period has not been closed yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cycle {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl Cycle {
    pub fn new(start_date: NaiveDate, end_date: Option<NaiveDate>) -> Self {
        Self {
            id: Uuid::new_v4(),
            start_date,
            end_date,
        }
    }

    /// Bleeding days, inclusive of both ends. `None` for open or malformed cycles.
    pub fn period_length(&self) -> Option<i64> {
        let end = self.end_date?;
        let days = days_between(self.start_date, end);
        if days < 0 {
            log::warn!(
                "cycle {} ends ({}) before it starts ({})",
                self.id,
                end,
                self.start_date
            );
            return None;
        }
        Some(days + 1)
    }
}

/// Per-user settings as stored. Every field may be missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ProfileDefaults {
    #[serde(default)]
    pub average_cycle_length: Option<u32>,
    #[serde(default)]
    pub average_period_length: Option<u32>,
    #[serde(default)]
    pub last_period_date: Option<NaiveDate>,
}

impl ProfileDefaults {
    /// Fill in defaults and clamp lengths into their plausible ranges.
    pub fn resolve(&self) -> ResolvedProfile {
        ResolvedProfile {
            cycle_length: resolve_cycle_length(self.average_cycle_length),
            period_length: resolve_period_length(self.average_period_length),
            last_period_date: self.last_period_date,
        }
    }
}

/// Cycle length in days, defaulted when missing or zero and clamped to 20-45.
pub fn resolve_cycle_length(value: Option<u32>) -> u32 {
    resolve_length(value, DEFAULT_CYCLE_LENGTH, MIN_CYCLE_LENGTH, MAX_CYCLE_LENGTH)
}

/// Period length in days, defaulted when missing or zero and clamped to 3-10.
pub fn resolve_period_length(value: Option<u32>) -> u32 {
    resolve_length(value, DEFAULT_PERIOD_LENGTH, MIN_PERIOD_LENGTH, MAX_PERIOD_LENGTH)
}

fn resolve_length(value: Option<u32>, default: u32, min: u32, max: u32) -> u32 {
    match value {
        None | Some(0) => default,
        Some(v) => {
            let clamped = v.clamp(min, max);
            if clamped != v {
                log::debug!("profile length {v} clamped to {clamped}");
            }
            clamped
        }
    }
}

/// Profile with every parameter present and in range.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct ResolvedProfile {
    pub cycle_length: u32,
    pub period_length: u32,
    pub last_period_date: Option<NaiveDate>,
}

impl Default for ResolvedProfile {
    fn default() -> Self {
        ProfileDefaults::default().resolve()
    }
}

impl ResolvedProfile {
    /// Most recent known period start: the later of the profile date and the
    /// newest logged cycle.
    pub fn anchor(&self, cycles: &[Cycle]) -> Option<NaiveDate> {
        let latest_logged = cycles.iter().map(|c| c.start_date).max();
        match (self.last_period_date, latest_logged) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CyclePrediction {
    pub next_period_date: NaiveDate,
    pub next_ovulation_date: NaiveDate,
    pub fertility_window_start: NaiveDate,
    pub fertility_window_end: NaiveDate,
    /// Population standard deviation of the sampled cycle lengths, in days.
    pub cycle_variability: f64,
    pub accuracy_score: u8,
    pub effective_cycle_length: u32,
    /// Number of valid cycle lengths behind the prediction.
    pub sample_size: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Period,
    Fertile,
    Ovulation,
    Prediction,
}

impl EventType {
    /// iCalendar `CATEGORIES` token.
    pub fn category(self) -> &'static str {
        match self {
            EventType::Period => "PERIOD",
            EventType::Fertile => "FERTILE",
            EventType::Ovulation => "OVULATION",
            EventType::Prediction => "PREDICTION",
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventType::Period => "period",
            EventType::Fertile => "fertile",
            EventType::Ovulation => "ovulation",
            EventType::Prediction => "prediction",
        };
        f.write_str(name)
    }
}

/// All-day calendar entry. `end_date` is inclusive.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CycleEvent {
    pub title: String,
    pub description: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(rename = "type")]
    pub event_type: EventType,
}

impl CycleEvent {
    pub fn single_day(
        title: impl Into<String>,
        description: impl Into<String>,
        date: NaiveDate,
        event_type: EventType,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            start_date: date,
            end_date: date,
            event_type,
        }
    }

    /// Number of days covered, counting both ends.
    pub fn span_days(&self) -> i64 {
        days_between(self.start_date, self.end_date) + 1
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Fahrenheit,
    Celsius,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BbtSample {
    pub date: NaiveDate,
    pub temperature: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SymptomTag {
    Cramps,
    Headache,
    Bloating,
    Fatigue,
    BreastTenderness,
    Acne,
    Backache,
    Nausea,
    Cravings,
    Insomnia,
    MoodSwings,
    Anxiety,
    Irritability,
    LowMood,
    HighEnergy,
}

/// Raw symptom row as stored: free-form tag strings for one day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SymptomLog {
    pub date: NaiveDate,
    #[serde(default)]
    pub symptoms: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CycleStats {
    pub total_cycles: usize,
    pub avg_cycle_length: Option<f64>,
    pub avg_period_length: Option<f64>,
    pub shortest_cycle: Option<i64>,
    pub longest_cycle: Option<i64>,
    pub last_period_start: Option<NaiveDate>,
    pub last_period_end: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DeviationKind {
    Short,
    Long,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Irregularity {
    pub latest_cycle_length: i64,
    pub average_length: u32,
    pub deviation: i64,
    pub is_irregular: bool,
    /// Only set when the cycle is irregular.
    pub kind: Option<DeviationKind>,
}

/// Everything the caller fetched for one user.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TrackerData {
    #[serde(default)]
    pub cycles: Vec<Cycle>,
    #[serde(default)]
    pub profile: ProfileDefaults,
    #[serde(default)]
    pub bbt: Vec<BbtSample>,
    #[serde(default)]
    pub bbt_unit: TemperatureUnit,
    #[serde(default)]
    pub symptoms: Vec<SymptomLog>,
}
