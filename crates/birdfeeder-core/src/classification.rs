//! # Classification Module
//!
//! Turns raw backend output into a ranked, labelled result.

use crate::labels::LabelMap;
use crate::score::Score;
use serde::{Deserialize, Serialize};

/// One `(label id, score)` pair as reported by the model backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawClass {
    pub id: u32,
    pub score: Score,
}

impl RawClass {
    #[must_use]
    pub fn new(id: u32, score: Score) -> Self {
        Self { id, score }
    }
}

/// A labelled class.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
    pub label: String,
    pub score: Score,
}

impl Class {
    #[must_use]
    pub fn new(label: impl Into<String>, score: Score) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// Ranked classes for a single frame, highest score first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub classes: Vec<Class>,
}

impl Classification {
    /// Rank raw backend output.
    ///
    /// Classes scoring below `threshold` are dropped, the rest are sorted by
    /// score descending (ties broken by id ascending) and cut to `top_k`.
    /// A `top_k` of zero keeps one class.
    #[must_use]
    pub fn rank(raw: &[RawClass], labels: &LabelMap, threshold: Score, top_k: usize) -> Self {
        let mut kept: Vec<RawClass> = raw
            .iter()
            .copied()
            .filter(|c| c.score >= threshold)
            .collect();

        kept.sort_by(|a, b| b.score.cmp(&a.score).then(a.id.cmp(&b.id)));
        kept.truncate(top_k.max(1));

        Self {
            classes: kept
                .into_iter()
                .map(|c| Class::new(labels.name(c.id), c.score))
                .collect(),
        }
    }

    /// The highest scoring class, if any survived ranking.
    #[must_use]
    pub fn top(&self) -> Option<&Class> {
        self.classes.first()
    }

    /// Labels in rank order.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.classes.iter().map(|c| c.label.as_str())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// Compact one-line form for logs: `house finch (0.83), jay (0.10)`.
    #[must_use]
    pub fn summary(&self) -> String {
        if self.classes.is_empty() {
            return String::from("(none)");
        }
        self.classes
            .iter()
            .map(|c| format!("{} ({})", c.label, c.score))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

// =============================================================================
// TESTS
// =============================================================================
