use std::ops::RangeInclusive;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{BbtSample, TemperatureUnit};

/// Fewest plausible samples needed before looking for a shift.
pub const MIN_SAMPLES: usize = 6;
const ROLLING_WINDOW: usize = 3;

impl TemperatureUnit {
    /// Readings outside this band are treated as entry errors.
    pub fn plausible_range(self) -> RangeInclusive<f64> {
        match self {
            TemperatureUnit::Fahrenheit => 95.0..=101.0,
            TemperatureUnit::Celsius => 35.0..=38.3,
        }
    }

    /// Rise over the baseline mean that counts as a post-ovulation shift.
    pub fn rise_threshold(self) -> f64 {
        match self {
            TemperatureUnit::Fahrenheit => 0.2,
            TemperatureUnit::Celsius => 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct OvulationShift {
    /// First day of the sustained rise.
    pub date: NaiveDate,
    pub baseline_mean: f64,
    pub rolling_average: f64,
}

/// Find the first sustained temperature rise in a BBT series.
///
/// The earlier half of the (chronologically sorted, plausibility-filtered)
/// series is the baseline. Scanning the later half, the first day whose
/// 3-day rolling mean exceeds `baseline mean + threshold` is reported.
/// This is a plain threshold crossing, not a change-point model.
pub fn detect_ovulation_shift(
    samples: &[BbtSample],
    unit: TemperatureUnit,
) -> Option<OvulationShift> {
    let series = clean_series(samples, unit);
    if series.len() < MIN_SAMPLES {
        log::debug!(
            "{} usable BBT samples, need {MIN_SAMPLES} to look for a shift",
            series.len()
        );
        return None;
    }

    let baseline_len = series.len() / 2;
    let baseline_mean = mean(series[..baseline_len].iter().map(|s| s.temperature));
    let threshold = baseline_mean + unit.rise_threshold();

    series[baseline_len..]
        .windows(ROLLING_WINDOW)
        .find_map(|window| {
            let rolling_average = mean(window.iter().map(|s| s.temperature));
            (rolling_average > threshold).then(|| OvulationShift {
                date: window[0].date,
                baseline_mean,
                rolling_average,
            })
        })
}

/// Mean of the plausible readings, rounded to two decimals.
pub fn average_temperature(samples: &[BbtSample], unit: TemperatureUnit) -> Option<f64> {
    let series = clean_series(samples, unit);
    if series.is_empty() {
        return None;
    }
    let avg = mean(series.iter().map(|s| s.temperature));
    Some((avg * 100.0).round() / 100.0)
}

fn clean_series(samples: &[BbtSample], unit: TemperatureUnit) -> Vec<BbtSample> {
    let range = unit.plausible_range();
    let mut series: Vec<BbtSample> = samples
        .iter()
        .filter(|s| {
            let keep = range.contains(&s.temperature);
            if !keep {
                log::debug!("dropping implausible BBT reading {} on {}", s.temperature, s.date);
            }
            keep
        })
        .copied()
        .collect();
    series.sort_by_key(|s| s.date);
    series
}

fn mean(values: impl ExactSizeIterator<Item = f64>) -> f64 {
    let len = values.len();
    if len == 0 {
        return 0.0;
    }
    values.sum::<f64>() / len as f64
}
