//! Pairwise paper similarity
//!
//! A paper is reduced to the lower-cased blob `"{title} {abstract} {category}"`,
//! split on whitespace, and tokens shorter than four characters are dropped.
//! The score is
//!
//! ```text
//! min(1, jaccard(tokens_a, tokens_b) + category_bonus + year_bonus)
//! ```
//!
//! where the category bonus applies on an exact category match and the year
//! bonus decays linearly from 0.1 (same year) to 0 (ten or more years apart).

use rkive_common::db::models::Paper;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

/// Scoring parameters
#[derive(Debug, Clone)]
pub struct SimilarityScorer {
    /// Shortest token kept, in characters
    pub min_token_chars: usize,

    /// Added when both papers carry the same category
    pub category_bonus: f64,

    /// Year gap at which the year bonus reaches zero
    pub year_window: i64,

    /// Bonus per year inside the window
    pub year_step: f64,
}

impl Default for SimilarityScorer {
    fn default() -> Self {
        Self {
            min_token_chars: 4,
            category_bonus: 0.2,
            year_window: 10,
            year_step: 0.01,
        }
    }
}

/// The terms that make up one score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimilarityBreakdown {
    pub jaccard: f64,
    pub category_bonus: f64,
    pub year_bonus: f64,
    /// Clamped sum of the three terms
    pub score: f64,
}

/// A paper reduced to what the scorer looks at.
///
/// Build once per paper and reuse it against any number of candidates.
#[derive(Debug, Clone)]
pub struct PaperProfile {
    pub id: Uuid,
    tokens: HashSet<String>,
    category: Option<String>,
    year: i64,
}

impl PaperProfile {
    pub fn new(
        scorer: &SimilarityScorer,
        id: Uuid,
        title: &str,
        abstract_text: Option<&str>,
        category: Option<&str>,
        year_published: Option<i32>,
    ) -> Self {
        let blob = text_blob(title, abstract_text, category);

        Self {
            id,
            tokens: tokenize(&blob, scorer.min_token_chars),
            category: category.filter(|c| !c.is_empty()).map(str::to_string),
            year: year_published.map(i64::from).unwrap_or(0),
        }
    }

    pub fn from_paper(scorer: &SimilarityScorer, paper: &Paper) -> Self {
        Self::new(
            scorer,
            paper.id,
            &paper.title,
            paper.abstract_text.as_deref(),
            paper.category.as_deref(),
            paper.year_published,
        )
    }

    pub fn tokens(&self) -> &HashSet<String> {
        &self.tokens
    }
}

impl SimilarityScorer {
    /// Profile a paper with this scorer's tokenization
    pub fn profile(&self, paper: &Paper) -> PaperProfile {
        PaperProfile::from_paper(self, paper)
    }

    /// Score two papers
    pub fn score(&self, a: &Paper, b: &Paper) -> f64 {
        self.compare(&self.profile(a), &self.profile(b)).score
    }

    /// Score two profiles, keeping the individual terms
    pub fn compare(&self, a: &PaperProfile, b: &PaperProfile) -> SimilarityBreakdown {
        let jaccard = jaccard(&a.tokens, &b.tokens);

        let category_bonus = match (&a.category, &b.category) {
            (Some(x), Some(y)) if x == y => self.category_bonus,
            _ => 0.0,
        };

        let gap = (a.year - b.year).abs();
        let year_bonus = ((self.year_window - gap) as f64 * self.year_step).max(0.0);

        SimilarityBreakdown {
            jaccard,
            category_bonus,
            year_bonus,
            score: (jaccard + category_bonus + year_bonus).min(1.0),
        }
    }
}

/// Concatenate the scored fields, missing ones as empty strings
pub fn text_blob(title: &str, abstract_text: Option<&str>, category: Option<&str>) -> String {
    format!(
        "{} {} {}",
        title,
        abstract_text.unwrap_or_default(),
        category.unwrap_or_default()
    )
    .to_lowercase()
}

/// Unique whitespace-separated tokens of at least `min_chars` characters
pub fn tokenize(blob: &str, min_chars: usize) -> HashSet<String> {
    blob.split_whitespace()
        .filter(|t| t.chars().count() >= min_chars)
        .map(str::to_string)
        .collect()
}

/// |A ∩ B| / |A ∪ B|, or 0 when both sets are empty
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    let (small, large) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    let intersection = small.iter().filter(|t| large.contains(*t)).count();
    let union = a.len() + b.len() - intersection;

    if union == 0 {
        0.0
    } else {
        intersection as f64 / union as f64
    }
}
