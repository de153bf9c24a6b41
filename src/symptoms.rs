use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::{SymptomLog, SymptomTag};

/// How many tags the summary view shows.
pub const DEFAULT_TOP_SYMPTOMS: usize = 5;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown symptom tag: {0}")]
pub struct UnknownSymptom(pub String);

impl FromStr for SymptomTag {
    type Err = UnknownSymptom;

    /// Accepts `snake_case`, spaced or hyphenated spellings, in any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .map(|c| match c {
                ' ' | '-' => '_',
                c => c.to_ascii_lowercase(),
            })
            .collect();

        let tag = match normalized.as_str() {
            "cramps" => SymptomTag::Cramps,
            "headache" => SymptomTag::Headache,
            "bloating" => SymptomTag::Bloating,
            "fatigue" => SymptomTag::Fatigue,
            "breast_tenderness" => SymptomTag::BreastTenderness,
            "acne" => SymptomTag::Acne,
            "backache" | "back_pain" => SymptomTag::Backache,
            "nausea" => SymptomTag::Nausea,
            "cravings" => SymptomTag::Cravings,
            "insomnia" => SymptomTag::Insomnia,
            "mood_swings" => SymptomTag::MoodSwings,
            "anxiety" | "anxious" => SymptomTag::Anxiety,
            "irritability" | "irritable" => SymptomTag::Irritability,
            "low_mood" | "sad" => SymptomTag::LowMood,
            "high_energy" | "energetic" => SymptomTag::HighEnergy,
            _ => return Err(UnknownSymptom(s.to_string())),
        };
        Ok(tag)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SymptomCount {
    pub tag: SymptomTag,
    pub count: usize,
}

/// Count every recognised tag across the logs.
pub fn symptom_frequency(logs: &[SymptomLog]) -> BTreeMap<SymptomTag, usize> {
    let mut frequency = BTreeMap::new();
    for raw in logs.iter().flat_map(|log| log.symptoms.iter()) {
        match raw.parse::<SymptomTag>() {
            Ok(tag) => *frequency.entry(tag).or_insert(0) += 1,
            Err(e) => log::debug!("skipping symptom: {e}"),
        }
    }
    frequency
}

/// Most frequent tags, highest count first. Ties keep tag order.
pub fn top_symptoms(logs: &[SymptomLog], limit: usize) -> Vec<SymptomCount> {
    let mut counts: Vec<SymptomCount> = symptom_frequency(logs)
        .into_iter()
        .map(|(tag, count)| SymptomCount { tag, count })
        .collect();
    // stable sort keeps the BTreeMap's tag order for ties
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(limit);
    counts
}
