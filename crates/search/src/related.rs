//! Related-paper ranking
//!
//! One pass fetches a bounded candidate set, scores every candidate against
//! the reference paper, keeps those at or above the threshold and returns the
//! best few. Nothing is cached between passes.

use crate::similarity::SimilarityScorer;
use rkive_common::config::RelatedConfig;
use rkive_common::db::{models::Paper, PaperSource};
use rkive_common::errors::{AppError, Result};
use rkive_common::metrics;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, error};
use uuid::Uuid;

/// Threshold used when the caller has no preference
pub const DEFAULT_THRESHOLD: f64 = 0.6;

/// A similarity cut-off within [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(transparent)]
pub struct SimilarityThreshold(f64);

impl SimilarityThreshold {
    /// Rejects values outside [0, 1], including NaN
    pub fn new(value: f64) -> Result<Self> {
        if (0.0..=1.0).contains(&value) {
            Ok(Self(value))
        } else {
            Err(AppError::InvalidThreshold { value })
        }
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl Default for SimilarityThreshold {
    fn default() -> Self {
        Self(DEFAULT_THRESHOLD)
    }
}

impl TryFrom<f64> for SimilarityThreshold {
    type Error = AppError;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}

/// Candidate-set and result sizes for one pass
#[derive(Debug, Clone, Copy)]
pub struct RankingOptions {
    pub candidate_limit: u64,
    pub max_results: usize,
}

impl Default for RankingOptions {
    fn default() -> Self {
        Self {
            candidate_limit: 50,
            max_results: 10,
        }
    }
}

impl From<&RelatedConfig> for RankingOptions {
    fn from(config: &RelatedConfig) -> Self {
        Self {
            candidate_limit: config.candidate_limit,
            max_results: config.max_results,
        }
    }
}

/// A candidate that passed the threshold
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelatedPaper {
    pub paper_id: Uuid,
    pub title: String,
    pub authors: Option<String>,
    pub category: Option<String>,
    pub year_published: Option<i32>,
    pub score: f64,
}

impl RelatedPaper {
    fn from_scored(paper: Paper, score: f64) -> Self {
        Self {
            paper_id: paper.id,
            title: paper.title,
            authors: paper.authors,
            category: paper.category,
            year_published: paper.year_published,
            score,
        }
    }
}

/// Keep items scoring at or above `threshold`, best first, at most `max_results`.
///
/// Ties keep their input order.
pub fn rank_scored<T>(
    scored: impl IntoIterator<Item = (T, f64)>,
    threshold: SimilarityThreshold,
    max_results: usize,
) -> Vec<(T, f64)> {
    let mut kept: Vec<(T, f64)> = scored
        .into_iter()
        .filter(|(_, score)| *score >= threshold.value())
        .collect();

    kept.sort_by(|a, b| b.1.total_cmp(&a.1));
    kept.truncate(max_results);
    kept
}

/// Ranks papers from a [`PaperSource`] against a reference paper
pub struct RelatedPaperFinder<'a, S: PaperSource + ?Sized> {
    source: &'a S,
    scorer: SimilarityScorer,
    options: RankingOptions,
}

impl<'a, S: PaperSource + ?Sized> RelatedPaperFinder<'a, S> {
    pub fn new(source: &'a S, options: RankingOptions) -> Self {
        Self {
            source,
            scorer: SimilarityScorer::default(),
            options,
        }
    }

    pub fn with_scorer(mut self, scorer: SimilarityScorer) -> Self {
        self.scorer = scorer;
        self
    }

    /// Related papers for `reference`.
    ///
    /// A failed candidate fetch is logged and yields an empty list.
    pub async fn find_related(
        &self,
        reference: &Paper,
        threshold: SimilarityThreshold,
    ) -> Vec<RelatedPaper> {
        self.find_related_excluding(reference, threshold, &HashSet::new())
            .await
    }

    /// Like [`find_related`](Self::find_related), skipping the given papers
    /// before ranking (e.g. those already linked by a citation edge).
    pub async fn find_related_excluding(
        &self,
        reference: &Paper,
        threshold: SimilarityThreshold,
        exclude: &HashSet<Uuid>,
    ) -> Vec<RelatedPaper> {
        let start = Instant::now();

        let candidates = match self
            .source
            .fetch_candidate_papers(reference.id, self.options.candidate_limit)
            .await
        {
            Ok(candidates) => candidates,
            Err(e) => {
                error!(
                    paper_id = %reference.id,
                    error = %e,
                    "Failed to fetch candidate papers"
                );
                metrics::record_candidate_fetch_failure();
                return Vec::new();
            }
        };

        let candidate_count = candidates.len();
        let profile = self.scorer.profile(reference);

        let scored = candidates
            .into_iter()
            .filter(|c| c.id != reference.id && !exclude.contains(&c.id))
            .map(|c| {
                let score = self.scorer.compare(&profile, &self.scorer.profile(&c)).score;
                (c, score)
            });

        let related: Vec<RelatedPaper> = rank_scored(scored, threshold, self.options.max_results)
            .into_iter()
            .map(|(paper, score)| RelatedPaper::from_scored(paper, score))
            .collect();

        metrics::record_related_pass(
            start.elapsed().as_secs_f64(),
            candidate_count,
            related.len(),
        );

        debug!(
            paper_id = %reference.id,
            candidates = candidate_count,
            related = related.len(),
            threshold = threshold.value(),
            "Related papers ranked"
        );

        related
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::paper;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct StaticSource {
        papers: Vec<Paper>,
        calls: Mutex<Vec<(Uuid, u64)>>,
    }

    impl StaticSource {
        fn new(papers: Vec<Paper>) -> Self {
            Self {
                papers,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PaperSource for StaticSource {
        async fn fetch_candidate_papers(&self, exclude_id: Uuid, limit: u64) -> Result<Vec<Paper>> {
            self.calls.lock().unwrap().push((exclude_id, limit));
            Ok(self
                .papers
                .iter()
                .filter(|p| p.id != exclude_id)
                .take(limit as usize)
                .cloned()
                .collect())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl PaperSource for FailingSource {
        async fn fetch_candidate_papers(&self, _exclude_id: Uuid, _limit: u64) -> Result<Vec<Paper>> {
            Err(AppError::DatabaseConnection {
                message: "connection reset".to_string(),
            })
        }
    }

    fn reference() -> Paper {
        paper(1, "Crop Yield Prediction using Machine Learning", None, Some("software"), Some(2021))
    }

    #[test]
    fn test_threshold_bounds() {
        assert!(SimilarityThreshold::new(0.0).is_ok());
        assert!(SimilarityThreshold::new(1.0).is_ok());
        assert!(matches!(
            SimilarityThreshold::new(1.2),
            Err(AppError::InvalidThreshold { .. })
        ));
        assert!(SimilarityThreshold::new(-0.1).is_err());
        assert!(SimilarityThreshold::new(f64::NAN).is_err());
        assert_eq!(SimilarityThreshold::default().value(), 0.6);
    }

    #[test]
    fn test_rank_scored_filters_and_sorts() {
        let threshold = SimilarityThreshold::new(0.6).unwrap();
        let ranked = rank_scored(vec![("a", 0.8), ("b", 0.5), ("c", 0.65), ("d", 0.3)], threshold, 10);

        assert_eq!(ranked, vec![("a", 0.8), ("c", 0.65)]);
    }

    #[test]
    fn test_rank_scored_keeps_boundary_and_truncates() {
        let threshold = SimilarityThreshold::new(0.6).unwrap();
        let ranked = rank_scored(
            vec![("a", 0.6), ("b", 0.9), ("c", 0.7), ("d", 0.6)],
            threshold,
            3,
        );

        // Equal scores keep input order
        assert_eq!(ranked, vec![("b", 0.9), ("c", 0.7), ("a", 0.6)]);
    }

    #[tokio::test]
    async fn test_find_related() {
        let source = StaticSource::new(vec![
            // 6/8 shared tokens, same category, six years apart: 0.75 + 0.2 + 0.04
            paper(2, "Crop Yield Prediction using Deep Learning", None, Some("software"), Some(2015)),
            // 5/9 shared tokens, other category, six years apart: 0.596, just under
            paper(5, "Crop Yield Prediction using Deep Learning", None, Some("hardware"), Some(2015)),
            paper(3, "Mobile Banking App", None, Some("mobile app"), Some(2021)),
            paper(4, "Machine Learning Crop Yield Prediction", None, Some("software"), Some(2019)),
        ]);
        let finder = RelatedPaperFinder::new(&source, RankingOptions::default());

        let related = finder.find_related(&reference(), SimilarityThreshold::default()).await;

        let ids: Vec<Uuid> = related.iter().map(|r| r.paper_id).collect();
        assert_eq!(ids, vec![Uuid::from_u128(4), Uuid::from_u128(2)]);
        assert_eq!(related[0].score, 1.0);
        assert!((related[1].score - 0.99).abs() < 1e-9);
        assert!(related.windows(2).all(|w| w[0].score >= w[1].score));
        assert_eq!(*source.calls.lock().unwrap(), vec![(Uuid::from_u128(1), 50)]);
    }

    #[tokio::test]
    async fn test_find_related_respects_max_results() {
        let papers = (2..30)
            .map(|n| paper(n, "Crop Yield Prediction using Machine Learning", None, Some("software"), Some(2021)))
            .collect();
        let source = StaticSource::new(papers);
        let finder = RelatedPaperFinder::new(
            &source,
            RankingOptions {
                candidate_limit: 20,
                max_results: 5,
            },
        );

        let related = finder.find_related(&reference(), SimilarityThreshold::default()).await;
        assert_eq!(related.len(), 5);
        assert!(related.iter().all(|r| r.score == 1.0));
    }

    #[tokio::test]
    async fn test_find_related_excluding() {
        let source = StaticSource::new(vec![
            paper(2, "Crop Yield Prediction using Deep Learning", None, Some("software"), Some(2021)),
            paper(4, "Machine Learning Crop Yield Prediction", None, Some("software"), Some(2019)),
        ]);
        let finder = RelatedPaperFinder::new(&source, RankingOptions::default());
        let exclude: HashSet<Uuid> = [Uuid::from_u128(4)].into_iter().collect();

        let related = finder
            .find_related_excluding(&reference(), SimilarityThreshold::default(), &exclude)
            .await;
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].paper_id, Uuid::from_u128(2));
    }

    #[tokio::test]
    async fn test_fetch_failure_yields_empty() {
        let finder = RelatedPaperFinder::new(&FailingSource, RankingOptions::default());
        let related = finder.find_related(&reference(), SimilarityThreshold::default()).await;
        assert!(related.is_empty());
    }

    #[test]
    fn test_options_from_config() {
        let options = RankingOptions::from(&RelatedConfig::default());
        assert_eq!(options.candidate_limit, 50);
        assert_eq!(options.max_results, 10);
    }

    #[test]
    fn test_fetch_failure_blocking() {
        let finder = RelatedPaperFinder::new(&FailingSource, RankingOptions::default());
        let related = tokio_test::block_on(finder.find_related(&reference(), SimilarityThreshold::new(0.0).unwrap()));
        assert!(related.is_empty());
    }
}
