//! Weighted inspection scoring.
//!
//! Each inspected component gets an ordinal [`Choice`] from 1 to 5. The
//! score is the weight-normalized mean choice mapped onto 0–100:
//!
//! ```text
//! score = round( Σ(choice × weight) / Σ(weight) × 20 )
//! ```
//!
//! so all-5 ratings give 100 and all-1 ratings give 20. Components missing
//! from the [`WeightTable`] weigh 1. An empty rating set scores 0, as does a
//! set whose weights all come out to zero.
//!
//! Scoring is pure: the same ratings and weights always produce the same
//! score, and nothing is cached between calls.
//!
//! ```
//! use fieldproof::scoring::{score, Choice, ComponentCategory, ComponentRating, WeightTable};
//!
//! let ratings = vec![
//!     ComponentRating::new("floor", ComponentCategory::Visual, Choice::new(5).unwrap()),
//!     ComponentRating::new("odor", ComponentCategory::Aroma, Choice::new(3).unwrap()),
//! ];
//! let weights = WeightTable::default();
//! assert_eq!(score(&ratings, &weights).value, 80);
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Points per ordinal step; maps choice 5 to 100.
const POINTS_PER_CHOICE: f64 = 20.0;
const DEFAULT_WEIGHT: f64 = 1.0;

#[derive(Error, Debug, PartialEq)]
pub enum ScoringError {
    #[error("choice must be between 1 and 5, got {0}")]
    ChoiceOutOfRange(u8),
    #[error("weight for '{component}' must be finite and non-negative, got {weight}")]
    InvalidWeight { component: String, weight: f64 },
}

/// What aspect of the facility a component judges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentCategory {
    Aroma,
    Visual,
    Availability,
    Functional,
}

impl ComponentCategory {
    pub const ALL: [ComponentCategory; 4] = [
        ComponentCategory::Aroma,
        ComponentCategory::Visual,
        ComponentCategory::Availability,
        ComponentCategory::Functional,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ComponentCategory::Aroma => "aroma",
            ComponentCategory::Visual => "visual",
            ComponentCategory::Availability => "availability",
            ComponentCategory::Functional => "functional",
        }
    }
}

impl fmt::Display for ComponentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An ordinal rating in `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Choice(u8);

impl Choice {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(value: u8) -> Result<Self, ScoringError> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(ScoringError::ChoiceOutOfRange(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Choice {
    type Error = ScoringError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Choice> for u8 {
    fn from(choice: Choice) -> Self {
        choice.0
    }
}

/// One inspector judgment for one component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ComponentRating {
    pub component: String,
    pub category: ComponentCategory,
    pub choice: Choice,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ComponentRating {
    pub fn new(component: impl Into<String>, category: ComponentCategory, choice: Choice) -> Self {
        Self {
            component: component.into(),
            category,
            choice,
            note: None,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// A file of ratings, e.g. one inspection's submissions.
///
/// ```toml
/// [[ratings]]
/// component = "floor"
/// category = "visual"
/// choice = 4
/// note = "dry, one scuff mark"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RatingSheet {
    #[serde(default)]
    pub ratings: Vec<ComponentRating>,
}

/// Component id → relative weight. Immutable once built.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<String, f64>", into = "BTreeMap<String, f64>")]
pub struct WeightTable(BTreeMap<String, f64>);

impl WeightTable {
    pub fn new(weights: BTreeMap<String, f64>) -> Result<Self, ScoringError> {
        if let Some((component, &weight)) = weights
            .iter()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            return Err(ScoringError::InvalidWeight {
                component: component.clone(),
                weight,
            });
        }
        Ok(Self(weights))
    }

    /// Weight for `component`, 1 when not configured.
    pub fn weight(&self, component: &str) -> f64 {
        self.0.get(component).copied().unwrap_or(DEFAULT_WEIGHT)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl TryFrom<BTreeMap<String, f64>> for WeightTable {
    type Error = ScoringError;

    fn try_from(weights: BTreeMap<String, f64>) -> Result<Self, Self::Error> {
        Self::new(weights)
    }
}

impl From<WeightTable> for BTreeMap<String, f64> {
    fn from(table: WeightTable) -> Self {
        table.0
    }
}

/// Derived inspection score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct InspectionScore {
    /// 0–100.
    pub value: u8,
    pub component_count: usize,
}

/// Score a set of ratings.
pub fn score(ratings: &[ComponentRating], weights: &WeightTable) -> InspectionScore {
    score_iter(ratings.iter(), weights)
}

/// Score each category on its own; categories without ratings are omitted.
pub fn category_breakdown(
    ratings: &[ComponentRating],
    weights: &WeightTable,
) -> BTreeMap<ComponentCategory, InspectionScore> {
    ComponentCategory::ALL
        .into_iter()
        .filter_map(|category| {
            let result = score_iter(
                ratings.iter().filter(|r| r.category == category),
                weights,
            );
            (result.component_count > 0).then_some((category, result))
        })
        .collect()
}

fn score_iter<'a>(
    ratings: impl Iterator<Item = &'a ComponentRating>,
    weights: &WeightTable,
) -> InspectionScore {
    let entries: Vec<(f64, f64)> = ratings
        .map(|rating| {
            (
                f64::from(rating.choice.value()),
                weights.weight(&rating.component),
            )
        })
        .collect();
    let component_count = entries.len();

    let (mut weighted, mut total_weight) = weighted_sums(&entries, 1.0);
    if !weighted.is_finite() || !total_weight.is_finite() {
        // Weights near f64::MAX overflow the sums; only their ratios matter.
        let largest = entries.iter().map(|&(_, w)| w).fold(0.0, f64::max);
        (weighted, total_weight) = weighted_sums(&entries, largest);
    }

    let value = if total_weight > 0.0 {
        // Non-negative, so `round` is round-half-up.
        (weighted * POINTS_PER_CHOICE / total_weight)
            .round()
            .clamp(0.0, 100.0) as u8
    } else {
        0
    };

    InspectionScore {
        value,
        component_count,
    }
}

/// `(Σ choice·weight, Σ weight)` with every weight divided by `scale`.
fn weighted_sums(entries: &[(f64, f64)], scale: f64) -> (f64, f64) {
    entries
        .iter()
        .fold((0.0, 0.0), |(weighted, total), &(choice, weight)| {
            let weight = weight / scale;
            (weighted + choice * weight, total + weight)
        })
}
