//! Related-paper handler

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use rkive_common::{db::Repository, errors::Result, Session};
use rkive_search::{RankingOptions, RelatedPaper, RelatedPaperFinder, SimilarityThreshold};

#[derive(Debug, Deserialize, Validate)]
pub struct RelatedQuery {
    /// Minimum score, within [0, 1]; the configured default when absent
    pub threshold: Option<f64>,

    #[validate(range(min = 1, max = 50))]
    pub limit: Option<usize>,
}

#[derive(Serialize)]
pub struct RelatedResponse {
    pub paper_id: Uuid,
    pub threshold: f64,
    pub related: Vec<RelatedPaper>,
}

/// Papers similar to the given one, best first
pub async fn get_related(
    State(state): State<AppState>,
    session: Session,
    Path(paper_id): Path<Uuid>,
    Query(query): Query<RelatedQuery>,
) -> Result<Json<RelatedResponse>> {
    query.validate()?;
    let threshold = SimilarityThreshold::new(
        query
            .threshold
            .unwrap_or(state.config.related.default_threshold),
    )?;

    let mut options = RankingOptions::from(&state.config.related);
    if let Some(limit) = query.limit {
        options.max_results = limit;
    }

    let repo = Repository::new(state.db.clone());
    let paper = repo.require_paper(paper_id).await?;

    let related = RelatedPaperFinder::new(&repo, options)
        .find_related(&paper, threshold)
        .await;

    tracing::debug!(
        paper_id = %paper_id,
        request_id = %session.request_id,
        related = related.len(),
        "Related papers served"
    );

    Ok(Json(RelatedResponse {
        paper_id,
        threshold: threshold.value(),
        related,
    }))
}

#[cfg(test)]
mod tests {
    use crate::test_support::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use rkive_common::db::models::Paper;
    use rkive_common::Role;
    use sea_orm::{DatabaseBackend, DbErr, MockDatabase};
    use tower::ServiceExt;
    use uuid::Uuid;

    async fn get(state: crate::AppState, uri: String) -> axum::response::Response {
        let auth = token(&state, Role::Student);
        router(state)
            .oneshot(
                Request::get(uri)
                    .header("authorization", auth)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_invalid_threshold() {
        let uri = format!("/v1/papers/{}/related?threshold=1.5", Uuid::from_u128(1));
        let response = get(empty_state(), uri).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["numeric_code"], 1002);
        assert_eq!(body["error"]["field"], "threshold");
    }

    #[tokio::test]
    async fn test_related_ranked() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![paper(1, "Smart Irrigation Controller", Some("hardware"), Some(2022))]])
            .append_query_results([vec![
                paper(2, "Library Kiosk", Some("web app"), Some(2012)),
                paper(3, "Smart Irrigation Controller Prototype", Some("hardware"), Some(2021)),
            ]]);

        let uri = format!("/v1/papers/{}/related", Uuid::from_u128(1));
        let response = get(state_with(db), uri).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["threshold"], 0.6);
        let related = body["related"].as_array().unwrap();
        assert_eq!(related.len(), 1);
        assert_eq!(related[0]["paper_id"], Uuid::from_u128(3).to_string());
    }

    #[tokio::test]
    async fn test_candidate_failure_is_empty_list() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![paper(1, "Smart Irrigation Controller", Some("hardware"), Some(2022))]])
            .append_query_errors([DbErr::Custom("statement timeout".to_string())]);

        let uri = format!("/v1/papers/{}/related?threshold=0.3", Uuid::from_u128(1));
        let response = get(state_with(db), uri).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert!(body["related"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_paper() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).append_query_results([Vec::<Paper>::new()]);

        let uri = format!("/v1/papers/{}/related", Uuid::from_u128(5));
        let response = get(state_with(db), uri).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
