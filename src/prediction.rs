use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::dates::{add_days, days_between};
use crate::models::{
    Cycle, CyclePrediction, CycleStats, DeviationKind, Irregularity, ResolvedProfile,
    DEFAULT_CYCLE_LENGTH,
};

/// Ovulation is assumed to fall this many days before the next period.
pub const LUTEAL_PHASE_DAYS: i64 = 14;
pub const FERTILE_DAYS_BEFORE_OVULATION: i64 = 5;
pub const FERTILE_DAYS_AFTER_OVULATION: i64 = 1;
/// Longest gap between two starts still counted as one cycle.
pub const MAX_PLAUSIBLE_CYCLE: i64 = 60;
/// Trailing number of cycle lengths used for the estimate.
pub const SAMPLE_WINDOW: usize = 6;
pub const IRREGULAR_DEVIATION_DAYS: i64 = 7;
/// Below this many logged cycles the confidence is reported as still building.
pub const MIN_CYCLES_FOR_PATTERN: usize = 3;

pub fn is_plausible_length(days: i64) -> bool {
    days > 0 && days <= MAX_PLAUSIBLE_CYCLE
}

/// Lengths between consecutive cycle starts, oldest first, with outliers removed.
/// Input order does not matter.
pub fn observed_cycle_lengths(cycles: &[Cycle]) -> Vec<i64> {
    let mut starts: Vec<NaiveDate> = cycles.iter().map(|c| c.start_date).collect();
    starts.sort();

    starts
        .windows(2)
        .filter_map(|w| {
            let length = days_between(w[0], w[1]);
            if is_plausible_length(length) {
                Some(length)
            } else {
                log::debug!(
                    "discarding implausible cycle length {length} ({} -> {})",
                    w[0],
                    w[1]
                );
                None
            }
        })
        .collect()
}

/// Predict the next period, ovulation and fertile window.
///
/// Returns `None` when there is no anchor date to project from, or when the
/// projected dates fall outside the representable calendar. With no valid
/// history the profile's average cycle length is used; otherwise the mean of the
/// last [`SAMPLE_WINDOW`] valid lengths, rounded half away from zero.
pub fn compute_prediction(
    cycles: &[Cycle],
    last_period_date: Option<NaiveDate>,
    average_cycle_length: u32,
) -> Option<CyclePrediction> {
    let last_period_date = last_period_date?;

    let lengths = observed_cycle_lengths(cycles);
    let sample = &lengths[lengths.len().saturating_sub(SAMPLE_WINDOW)..];

    let effective_cycle_length = if sample.is_empty() {
        if average_cycle_length == 0 {
            DEFAULT_CYCLE_LENGTH
        } else {
            average_cycle_length
        }
    } else {
        mean_length(sample).round() as u32
    };

    let cycle_variability = population_std_dev(sample);

    let Some(next_period_date) = add_days(last_period_date, i64::from(effective_cycle_length))
    else {
        log::warn!(
            "next period {effective_cycle_length} days after {last_period_date} is out of range"
        );
        return None;
    };
    let next_ovulation_date = add_days(next_period_date, -LUTEAL_PHASE_DAYS)?;

    Some(CyclePrediction {
        next_period_date,
        next_ovulation_date,
        fertility_window_start: add_days(next_ovulation_date, -FERTILE_DAYS_BEFORE_OVULATION)?,
        fertility_window_end: add_days(next_ovulation_date, FERTILE_DAYS_AFTER_OVULATION)?,
        cycle_variability,
        accuracy_score: accuracy_score(sample.len(), cycle_variability),
        effective_cycle_length,
        sample_size: sample.len(),
    })
}

/// Confidence in a prediction, 0-100.
///
/// Each valid cycle length adds 10 points on top of a base of 40, saturating at
/// [`SAMPLE_WINDOW`] lengths. Every day of standard deviation costs 5 points.
pub fn accuracy_score(sample_size: usize, variability: f64) -> u8 {
    let data_points = 10 * sample_size.min(SAMPLE_WINDOW) as i64;
    let penalty = if variability.is_nan() {
        100
    } else {
        (variability.max(0.0) * 5.0).round() as i64
    };

    (40 + data_points).saturating_sub(penalty).clamp(0, 100) as u8
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum AccuracyLabel {
    Moderate,
    Good,
    High,
}

impl AccuracyLabel {
    pub fn from_score(score: u8) -> Self {
        match score {
            80..=u8::MAX => AccuracyLabel::High,
            60..=79 => AccuracyLabel::Good,
            _ => AccuracyLabel::Moderate,
        }
    }
}

impl fmt::Display for AccuracyLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AccuracyLabel::High => "High",
            AccuracyLabel::Good => "Good",
            AccuracyLabel::Moderate => "Moderate",
        };
        f.write_str(label)
    }
}

pub fn accuracy_label(score: u8) -> AccuracyLabel {
    AccuracyLabel::from_score(score)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "state", content = "label", rename_all = "snake_case")]
pub enum Confidence {
    /// Not enough cycles logged for the score to mean much yet.
    Building,
    Rated(AccuracyLabel),
}

pub fn confidence(logged_cycles: usize, score: u8) -> Confidence {
    if logged_cycles < MIN_CYCLES_FOR_PATTERN {
        Confidence::Building
    } else {
        Confidence::Rated(AccuracyLabel::from_score(score))
    }
}

/// Compare one cycle length against the profile average.
/// `None` when the length itself is implausible.
pub fn classify_cycle_length(latest_cycle_length: i64, average_length: u32) -> Option<Irregularity> {
    if !is_plausible_length(latest_cycle_length) {
        log::debug!("not classifying implausible cycle length {latest_cycle_length}");
        return None;
    }

    let average = i64::from(average_length);
    let deviation = (latest_cycle_length - average).abs();
    let is_irregular = deviation >= IRREGULAR_DEVIATION_DAYS;
    let kind = is_irregular.then(|| {
        if latest_cycle_length < average {
            DeviationKind::Short
        } else {
            DeviationKind::Long
        }
    });

    Some(Irregularity {
        latest_cycle_length,
        average_length,
        deviation,
        is_irregular,
        kind,
    })
}

/// Check whether the most recent cycle strayed from the usual length.
/// Needs two logged starts.
pub fn detect_irregularity(cycles: &[Cycle], average_length: u32) -> Option<Irregularity> {
    let mut starts: Vec<NaiveDate> = cycles.iter().map(|c| c.start_date).collect();
    starts.sort_by(|a, b| b.cmp(a));

    let (latest, previous) = match starts.as_slice() {
        [latest, previous, ..] => (*latest, *previous),
        _ => return None,
    };

    classify_cycle_length(days_between(previous, latest), average_length)
}

/// Compute cycle statistics for the stats view.
pub fn cycle_stats(cycles: &[Cycle]) -> CycleStats {
    let mut ordered: Vec<&Cycle> = cycles.iter().collect();
    ordered.sort_by_key(|c| c.start_date);

    let Some(last) = ordered.last() else {
        return CycleStats {
            total_cycles: 0,
            avg_cycle_length: None,
            avg_period_length: None,
            shortest_cycle: None,
            longest_cycle: None,
            last_period_start: None,
            last_period_end: None,
        };
    };

    let period_lengths: Vec<f64> = ordered
        .iter()
        .filter_map(|c| c.period_length())
        .map(|days| days as f64)
        .collect();

    let cycle_lengths = observed_cycle_lengths(cycles);

    CycleStats {
        total_cycles: ordered.len(),
        avg_cycle_length: (!cycle_lengths.is_empty()).then(|| mean_length(&cycle_lengths)),
        avg_period_length: (!period_lengths.is_empty()).then(|| mean(&period_lengths)),
        shortest_cycle: cycle_lengths.iter().copied().min(),
        longest_cycle: cycle_lengths.iter().copied().max(),
        last_period_start: Some(last.start_date),
        last_period_end: last.end_date,
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CyclePhase {
    Menstrual,
    Follicular,
    Ovulation,
    Luteal,
    Unknown,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PhaseInfo {
    pub phase: CyclePhase,
    /// 1-based day within the current cycle.
    pub cycle_day: Option<u32>,
    /// Negative once ovulation has passed in the current cycle.
    pub days_until_ovulation: Option<i64>,
}

impl PhaseInfo {
    fn unknown() -> Self {
        Self {
            phase: CyclePhase::Unknown,
            cycle_day: None,
            days_until_ovulation: None,
        }
    }
}

/// Where `today` falls in the cycle that started at `anchor`, repeating the
/// profile cycle length for cycles that were never logged.
pub fn current_phase(
    anchor: Option<NaiveDate>,
    profile: &ResolvedProfile,
    today: NaiveDate,
) -> PhaseInfo {
    let Some(anchor) = anchor else {
        return PhaseInfo::unknown();
    };
    let elapsed = days_between(anchor, today);
    if elapsed < 0 || profile.cycle_length == 0 {
        return PhaseInfo::unknown();
    }

    let cycle_length = i64::from(profile.cycle_length);
    let day_index = elapsed.rem_euclid(cycle_length);
    let ovulation_index = cycle_length - LUTEAL_PHASE_DAYS;

    let phase = if day_index < i64::from(profile.period_length) {
        CyclePhase::Menstrual
    } else if (day_index - ovulation_index).abs() <= 1 {
        CyclePhase::Ovulation
    } else if day_index < ovulation_index {
        CyclePhase::Follicular
    } else {
        CyclePhase::Luteal
    };

    PhaseInfo {
        phase,
        cycle_day: Some(day_index as u32 + 1),
        days_until_ovulation: Some(ovulation_index - day_index),
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "status", content = "days", rename_all = "snake_case")]
pub enum Countdown {
    Upcoming(i64),
    Today,
    Late(i64),
}

pub fn period_countdown(next_period: NaiveDate, today: NaiveDate) -> Countdown {
    match days_between(today, next_period) {
        0 => Countdown::Today,
        days if days > 0 => Countdown::Upcoming(days),
        days => Countdown::Late(-days),
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn mean_length(lengths: &[i64]) -> f64 {
    if lengths.is_empty() {
        return 0.0;
    }
    lengths.iter().sum::<i64>() as f64 / lengths.len() as f64
}

fn population_std_dev(values: &[i64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let avg = mean_length(values);
    let variance = values
        .iter()
        .map(|&v| (v as f64 - avg).powi(2))
        .sum::<f64>()
        / values.len() as f64;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ProfileDefaults;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn make_cycle(start: &str, end: Option<&str>) -> Cycle {
        Cycle::new(date(start), end.map(date))
    }

    fn cycles_from_lengths(first: &str, lengths: &[i64]) -> Vec<Cycle> {
        let mut start = date(first);
        let mut cycles = vec![Cycle::new(start, None)];
        for &len in lengths {
            start = add_days(start, len).unwrap();
            cycles.push(Cycle::new(start, None));
        }
        cycles
    }

    #[test]
    fn no_prediction_without_anchor() {
        assert!(compute_prediction(&[], None, 28).is_none());
        let cycles = vec![make_cycle("2024-01-01", Some("2024-01-05"))];
        assert!(compute_prediction(&cycles, None, 28).is_none());
    }

    #[test]
    fn falls_back_to_profile_average() {
        let pred = compute_prediction(&[], Some(date("2024-01-01")), 28).unwrap();
        assert_eq!(pred.next_period_date, date("2024-01-29"));
        assert_eq!(pred.next_ovulation_date, date("2024-01-15"));
        assert_eq!(pred.fertility_window_start, date("2024-01-10"));
        assert_eq!(pred.fertility_window_end, date("2024-01-16"));
        assert_eq!(pred.cycle_variability, 0.0);
        assert_eq!(pred.sample_size, 0);
    }

    #[test]
    fn zero_average_uses_default() {
        let pred = compute_prediction(&[], Some(date("2024-01-01")), 0).unwrap();
        assert_eq!(pred.effective_cycle_length, 28);
    }

    #[test]
    fn unrepresentable_dates_give_no_prediction() {
        assert!(compute_prediction(&[], Some(date("2024-01-01")), u32::MAX).is_none());
        assert!(compute_prediction(&[], Some(NaiveDate::MAX), 28).is_none());
        // ovulation would land before the first representable day
        let earliest = add_days(NaiveDate::MIN, 5).unwrap();
        assert!(compute_prediction(&[], Some(earliest), 1).is_none());
    }

    #[test]
    fn averages_observed_lengths() {
        let cycles = vec![
            make_cycle("2024-02-25", None),
            make_cycle("2024-01-30", Some("2024-02-03")),
            make_cycle("2024-01-01", Some("2024-01-05")),
        ];
        assert_eq!(observed_cycle_lengths(&cycles), vec![29, 26]);

        let pred = compute_prediction(&cycles, Some(date("2024-02-25")), 30).unwrap();
        // 27.5 rounds half away from zero
        assert_eq!(pred.effective_cycle_length, 28);
        assert!((pred.cycle_variability - 1.5).abs() < 1e-9);
        assert_eq!(pred.next_period_date, date("2024-03-24"));
    }

    #[test]
    fn outliers_are_ignored() {
        let cycles = vec![
            make_cycle("2024-01-01", None),
            make_cycle("2024-01-01", None),
            make_cycle("2024-01-29", None),
            make_cycle("2024-05-01", None),
        ];
        assert_eq!(observed_cycle_lengths(&cycles), vec![28]);
        let pred = compute_prediction(&cycles, Some(date("2024-05-01")), 35).unwrap();
        assert_eq!(pred.effective_cycle_length, 28);
        assert_eq!(pred.sample_size, 1);
    }

    #[test]
    fn only_last_six_lengths_are_sampled() {
        let cycles = cycles_from_lengths("2023-01-01", &[40, 40, 28, 28, 28, 28, 28, 28]);
        let anchor = cycles.last().map(|c| c.start_date);
        let pred = compute_prediction(&cycles, anchor, 28).unwrap();
        assert_eq!(pred.effective_cycle_length, 28);
        assert_eq!(pred.cycle_variability, 0.0);
        assert_eq!(pred.sample_size, 6);
        assert_eq!(pred.accuracy_score, 100);
    }

    #[test]
    fn ovulation_and_window_offsets_hold() {
        for lengths in [vec![], vec![21], vec![35, 33, 36], vec![26, 30, 24, 31]] {
            let cycles = cycles_from_lengths("2024-01-01", &lengths);
            let anchor = cycles.last().map(|c| c.start_date);
            let pred = compute_prediction(&cycles, anchor, 28).unwrap();
            assert_eq!(add_days(pred.next_ovulation_date, 14), Some(pred.next_period_date));
            assert_eq!(add_days(pred.next_ovulation_date, -5), Some(pred.fertility_window_start));
            assert_eq!(add_days(pred.next_ovulation_date, 1), Some(pred.fertility_window_end));
        }
    }

    #[test]
    fn prediction_is_deterministic() {
        let cycles = cycles_from_lengths("2024-01-01", &[27, 31, 29]);
        let anchor = Some(date("2024-04-28"));
        let first = compute_prediction(&cycles, anchor, 28);
        let second = compute_prediction(&cycles, anchor, 28);
        assert_eq!(first, second);
    }

    #[test]
    fn accuracy_grows_with_consistent_history() {
        let mut lengths = vec![28];
        let mut previous = 0;
        for _ in 0..8 {
            let cycles = cycles_from_lengths("2022-01-01", &lengths);
            let pred = compute_prediction(&cycles, cycles.last().map(|c| c.start_date), 28).unwrap();
            assert!(pred.accuracy_score >= previous);
            previous = pred.accuracy_score;
            lengths.push(28);
        }
    }

    #[test]
    fn accuracy_drops_with_variability() {
        let steady = cycles_from_lengths("2024-01-01", &[28, 28, 28, 28]);
        let noisy = cycles_from_lengths("2024-01-01", &[24, 32, 25, 31]);
        let wild = cycles_from_lengths("2024-01-01", &[21, 38, 22, 36]);
        let score = |cycles: &[Cycle]| {
            compute_prediction(cycles, cycles.last().map(|c| c.start_date), 28)
                .unwrap()
                .accuracy_score
        };
        assert!(score(&steady) >= score(&noisy));
        assert!(score(&noisy) >= score(&wild));
    }

    #[test]
    fn accuracy_score_is_clamped() {
        assert_eq!(accuracy_score(0, 0.0), 40);
        assert_eq!(accuracy_score(20, 0.0), 100);
        assert_eq!(accuracy_score(1, 40.0), 0);
        assert_eq!(accuracy_score(6, f64::NAN), 0);
        for count in 0..10 {
            for tenths in 0..200 {
                let v = f64::from(tenths) / 10.0;
                assert!(accuracy_score(count, v) <= accuracy_score(count + 1, v));
                assert!(accuracy_score(count, v + 0.1) <= accuracy_score(count, v));
            }
        }
    }

    #[test]
    fn labels_follow_score_order() {
        assert_eq!(accuracy_label(95), AccuracyLabel::High);
        assert_eq!(accuracy_label(80), AccuracyLabel::High);
        assert_eq!(accuracy_label(79), AccuracyLabel::Good);
        assert_eq!(accuracy_label(60), AccuracyLabel::Good);
        assert_eq!(accuracy_label(59), AccuracyLabel::Moderate);
        assert!(AccuracyLabel::High > AccuracyLabel::Good);
        assert!(AccuracyLabel::Good > AccuracyLabel::Moderate);
        assert_eq!(AccuracyLabel::Good.to_string(), "Good");
    }

    #[test]
    fn confidence_waits_for_three_cycles() {
        assert_eq!(confidence(2, 100), Confidence::Building);
        assert_eq!(confidence(3, 85), Confidence::Rated(AccuracyLabel::High));
    }

    #[test]
    fn short_cycle_flagged_irregular() {
        let irregular = classify_cycle_length(21, 28).unwrap();
        assert!(irregular.is_irregular);
        assert_eq!(irregular.deviation, 7);
        assert_eq!(irregular.kind, Some(DeviationKind::Short));

        let cycles = cycles_from_lengths("2024-01-01", &[28, 21]);
        assert_eq!(detect_irregularity(&cycles, 28), Some(irregular));
    }

    #[test]
    fn long_and_regular_cycles_classified() {
        let long = classify_cycle_length(36, 28).unwrap();
        assert_eq!(long.kind, Some(DeviationKind::Long));

        let regular = classify_cycle_length(31, 28).unwrap();
        assert!(!regular.is_irregular);
        assert_eq!(regular.kind, None);
    }

    #[test]
    fn irregularity_guards_bad_data() {
        assert!(classify_cycle_length(0, 28).is_none());
        assert!(classify_cycle_length(61, 28).is_none());
        assert!(detect_irregularity(&[make_cycle("2024-01-01", None)], 28).is_none());
        let far_apart = vec![make_cycle("2024-01-01", None), make_cycle("2024-06-01", None)];
        assert!(detect_irregularity(&far_apart, 28).is_none());
    }

    #[test]
    fn cycle_stats_computed() {
        let cycles = vec![
            make_cycle("2026-01-01", Some("2026-01-05")),
            make_cycle("2026-01-29", Some("2026-02-02")),
        ];
        let stats = cycle_stats(&cycles);
        assert_eq!(stats.total_cycles, 2);
        assert_eq!(stats.avg_cycle_length, Some(28.0));
        assert_eq!(stats.avg_period_length, Some(5.0));
        assert_eq!(stats.last_period_start, Some(date("2026-01-29")));
    }

    #[test]
    fn cycle_stats_empty_history() {
        let stats = cycle_stats(&[]);
        assert_eq!(stats.total_cycles, 0);
        assert_eq!(stats.avg_cycle_length, None);
        assert_eq!(stats.last_period_start, None);
    }

    #[test]
    fn phase_tracks_cycle_day() {
        let profile = ProfileDefaults::default().resolve();
        let anchor = Some(date("2024-01-01"));

        let day1 = current_phase(anchor, &profile, date("2024-01-01"));
        assert_eq!(day1.phase, CyclePhase::Menstrual);
        assert_eq!(day1.cycle_day, Some(1));
        assert_eq!(day1.days_until_ovulation, Some(14));

        let follicular = current_phase(anchor, &profile, date("2024-01-08"));
        assert_eq!(follicular.phase, CyclePhase::Follicular);

        let ovulation = current_phase(anchor, &profile, date("2024-01-15"));
        assert_eq!(ovulation.phase, CyclePhase::Ovulation);
        assert_eq!(ovulation.days_until_ovulation, Some(0));

        let luteal = current_phase(anchor, &profile, date("2024-01-25"));
        assert_eq!(luteal.phase, CyclePhase::Luteal);

        // wraps into the next unlogged cycle
        let wrapped = current_phase(anchor, &profile, date("2024-01-30"));
        assert_eq!(wrapped.cycle_day, Some(2));
        assert_eq!(wrapped.phase, CyclePhase::Menstrual);

        let before = current_phase(anchor, &profile, date("2023-12-31"));
        assert_eq!(before.phase, CyclePhase::Unknown);
        assert_eq!(current_phase(None, &profile, date("2024-01-01")).phase, CyclePhase::Unknown);
    }

    #[test]
    fn countdown_reports_late_periods() {
        let next = date("2024-01-29");
        assert_eq!(period_countdown(next, date("2024-01-26")), Countdown::Upcoming(3));
        assert_eq!(period_countdown(next, next), Countdown::Today);
        assert_eq!(period_countdown(next, date("2024-02-02")), Countdown::Late(4));
    }
}
