//! Date-impossibility heuristics.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::identifiers::{extract_years, strip_identifiers};
use crate::types::LayerResult;

const CONSISTENT_CONFIDENCE: f64 = 0.9;

/// Before this year, modern AI vocabulary in a citation is an anachronism.
const AI_ERA_START: i32 = 1950;

lazy_static! {
    static ref AI_TERMS: Regex = Regex::new(
        r"(?i)\b(ai|artificial intelligence|machine learning|deep learning|neural networks?|transformers?|gpt(?:-\d)?|large language models?|llms?|chatbots?)\b"
    )
    .unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TemporalFlag {
    /// Cited year is after the current calendar year
    FutureYear { year: i32, current_year: i32 },
    /// The surrounding text is dated before the work it cites
    TimeTravel { cited_year: i32, context_year: i32 },
    /// Pre-1950 citation using modern AI vocabulary
    Anachronism { year: i32, term: String },
}

impl TemporalFlag {
    pub fn describe(&self) -> String {
        match self {
            Self::FutureYear { year, current_year } => {
                format!("Cited year {} is after the current year {}", year, current_year)
            }
            Self::TimeTravel {
                cited_year,
                context_year,
            } => format!(
                "TIME TRAVEL: text dated {} cites a work from {}",
                context_year, cited_year
            ),
            Self::Anachronism { year, term } => {
                format!("ANACHRONISM: a {} work mentions \"{}\"", year, term)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemporalCheck {
    pub consistent: bool,
    pub confidence: f64,
    pub years_found: Vec<i32>,
    pub flags: Vec<TemporalFlag>,
}

/// Run every temporal rule. Each rule flags independently.
pub fn check_temporal_consistency(
    citation: &str,
    context: Option<&str>,
    current_year: i32,
) -> TemporalCheck {
    let cited = strip_identifiers(citation);
    let years = extract_years(&cited);
    let mut flags = Vec::new();

    for &year in &years {
        if year > current_year {
            flags.push(TemporalFlag::FutureYear { year, current_year });
        }
    }

    let context_year = context
        .map(strip_identifiers)
        .and_then(|c| extract_years(&c).first().copied());
    if let Some(context_year) = context_year {
        for &year in &years {
            if context_year < year {
                flags.push(TemporalFlag::TimeTravel {
                    cited_year: year,
                    context_year,
                });
            }
        }
    }

    if let Some(term) = AI_TERMS.find(&cited) {
        for &year in years.iter().filter(|&&y| y < AI_ERA_START) {
            flags.push(TemporalFlag::Anachronism {
                year,
                term: term.as_str().to_string(),
            });
        }
    }

    let consistent = flags.is_empty();
    TemporalCheck {
        consistent,
        confidence: if consistent { CONSISTENT_CONFIDENCE } else { 0.0 },
        years_found: years,
        flags,
    }
}

impl TemporalCheck {
    pub fn to_layer(&self) -> LayerResult {
        let layer = if self.consistent {
            let details = if self.years_found.is_empty() {
                "No years to check".to_string()
            } else {
                "No temporal inconsistencies".to_string()
            };
            LayerResult::passed(self.confidence, details)
        } else {
            let details = self
                .flags
                .iter()
                .map(TemporalFlag::describe)
                .collect::<Vec<_>>()
                .join("; ");
            LayerResult::failed(self.confidence, details)
        };
        layer
            .with_metadata("years_found", &self.years_found)
            .with_metadata("flags", &self.flags)
    }
}
