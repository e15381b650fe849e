//! Citation tree handler

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use rkive_common::{db::Repository, errors::Result, Session};
use rkive_search::{
    citation::linked_ids, CitationGraph, CitationTree, RankingOptions, RelatedPaperFinder,
    SimilarityThreshold,
};

#[derive(Debug, Deserialize, Validate)]
pub struct TreeQuery {
    pub threshold: Option<f64>,

    /// Citation hops to follow; larger values are capped by configuration
    #[validate(range(min = 1))]
    pub depth: Option<usize>,
}

/// Root paper, its citation neighbourhood and its similarity links
pub async fn get_citation_tree(
    State(state): State<AppState>,
    session: Session,
    Path(paper_id): Path<Uuid>,
    Query(query): Query<TreeQuery>,
) -> Result<Json<CitationTree>> {
    query.validate()?;
    let related_config = &state.config.related;
    let threshold = SimilarityThreshold::new(query.threshold.unwrap_or(related_config.default_threshold))?;
    let depth = query.depth.unwrap_or(1).min(related_config.max_tree_depth.max(1));

    let repo = Repository::new(state.db.clone());
    let root = repo.require_paper(paper_id).await?;

    let graph = CitationGraph::from_rows(&repo.load_citation_edges().await?);
    let linked = linked_ids(&graph, root.id, depth);

    let ids: Vec<Uuid> = linked.iter().copied().collect();
    let papers: HashMap<Uuid, _> = repo
        .find_papers_by_ids(&ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

    let related = RelatedPaperFinder::new(&repo, RankingOptions::from(related_config))
        .find_related_excluding(&root, threshold, &linked)
        .await;

    let tree = CitationTree::assemble(&root, &graph, depth, threshold, &papers, related);

    tracing::debug!(
        paper_id = %paper_id,
        request_id = %session.request_id,
        depth,
        nodes = tree.nodes.len(),
        edges = tree.edges.len(),
        "Citation tree assembled"
    );

    Ok(Json(tree))
}

#[cfg(test)]
mod tests {
    use crate::test_support::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use rkive_common::db::models::Citation;
    use rkive_common::Role;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use tower::ServiceExt;
    use uuid::Uuid;

    fn citation(n: u128, citing: u128, cited: u128) -> Citation {
        Citation {
            id: Uuid::from_u128(n),
            citing_paper_id: Uuid::from_u128(citing),
            cited_paper_id: Uuid::from_u128(cited),
            origin: "automated".to_string(),
            created_at: chrono::Utc::now().fixed_offset(),
        }
    }

    #[tokio::test]
    async fn test_tree_with_citations_and_related() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            // root
            .append_query_results([vec![paper(1, "Smart Irrigation Controller", Some("hardware"), Some(2022))]])
            // all edges
            .append_query_results([vec![citation(10, 1, 2), citation(11, 4, 1)]])
            // linked papers
            .append_query_results([vec![
                paper(2, "Soil Moisture Sensor Network", Some("hardware"), Some(2019)),
                paper(4, "Greenhouse Automation", Some("hardware"), Some(2023)),
            ]])
            // candidates
            .append_query_results([vec![
                paper(2, "Soil Moisture Sensor Network", Some("hardware"), Some(2019)),
                paper(3, "Smart Irrigation Controller Prototype", Some("hardware"), Some(2021)),
            ]]);
        let state = state_with(db);
        let auth = token(&state, Role::Student);

        let response = router(state)
            .oneshot(
                Request::get(format!("/v1/papers/{}/citation-tree?depth=9", Uuid::from_u128(1)))
                    .header("authorization", auth)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;

        // Capped by configuration
        assert_eq!(body["depth"], 3);

        let kinds: Vec<&str> = body["nodes"]
            .as_array()
            .unwrap()
            .iter()
            .map(|n| n["kind"].as_str().unwrap())
            .collect();
        assert_eq!(kinds, vec!["root", "cited", "citing", "related"]);

        let edges = body["edges"].as_array().unwrap();
        assert_eq!(edges.iter().filter(|e| e["kind"] == "cites").count(), 2);
        assert_eq!(edges.iter().filter(|e| e["kind"] == "similar").count(), 1);
    }

    #[tokio::test]
    async fn test_zero_depth_rejected() {
        let state = empty_state();
        let auth = token(&state, Role::Student);

        let response = router(state)
            .oneshot(
                Request::get(format!("/v1/papers/{}/citation-tree?depth=0", Uuid::from_u128(1)))
                    .header("authorization", auth)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
