//! R-kive Search
//!
//! Library behind the citation-exploration page:
//! - Pairwise paper similarity (token Jaccard plus category and year bonuses)
//! - Related-paper ranking against a bounded candidate set
//! - Citation graph traversal and the citation tree payload

pub mod citation;
pub mod related;
pub mod similarity;

pub use citation::{CitationEdge, CitationGraph, CitationTree, TraversalDirection};
pub use related::{rank_scored, RankingOptions, RelatedPaper, RelatedPaperFinder, SimilarityThreshold};
pub use similarity::{PaperProfile, SimilarityBreakdown, SimilarityScorer};
