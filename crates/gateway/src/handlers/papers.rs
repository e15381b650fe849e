//! Paper read handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::AppState;
use rkive_common::{
    db::{models::Paper, Repository},
    errors::Result,
    Session,
};

#[derive(Debug, Deserialize, Validate)]
pub struct ListPapersQuery {
    #[serde(default)]
    #[validate(range(max = 1_000_000))]
    pub offset: u64,

    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100))]
    pub limit: u64,
}

fn default_limit() -> u64 {
    20
}

#[derive(Serialize)]
pub struct PaperListResponse {
    pub papers: Vec<Paper>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

/// List papers, newest first
pub async fn list_papers(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<ListPapersQuery>,
) -> Result<Json<PaperListResponse>> {
    query.validate()?;

    let repo = Repository::new(state.db.clone());
    let (papers, total) = repo.list_papers(query.offset, query.limit).await?;

    tracing::debug!(
        user_id = %session.user_id,
        returned = papers.len(),
        total,
        "Papers listed"
    );

    Ok(Json(PaperListResponse {
        papers,
        total,
        offset: query.offset,
        limit: query.limit,
    }))
}

/// Get a paper by ID
pub async fn get_paper(
    State(state): State<AppState>,
    _session: Session,
    Path(paper_id): Path<Uuid>,
) -> Result<Json<Paper>> {
    let repo = Repository::new(state.db.clone());
    let paper = repo.require_paper(paper_id).await?;

    Ok(Json(paper))
}

#[cfg(test)]
mod tests {
    use crate::test_support::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use rkive_common::Role;
    use sea_orm::{DatabaseBackend, MockDatabase};
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_get_paper() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![paper(7, "Smart Irrigation Controller", Some("hardware"), Some(2022))]]);
        let state = state_with(db);
        let auth = token(&state, Role::Student);

        let response = router(state)
            .oneshot(
                Request::get(format!("/v1/papers/{}", uuid::Uuid::from_u128(7)))
                    .header("authorization", auth)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["title"], "Smart Irrigation Controller");
        assert_eq!(body["year_published"], 2022);
    }

    #[tokio::test]
    async fn test_get_missing_paper() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<rkive_common::db::models::Paper>::new()]);
        let state = state_with(db);
        let auth = token(&state, Role::Student);

        let response = router(state)
            .oneshot(
                Request::get(format!("/v1/papers/{}", uuid::Uuid::from_u128(8)))
                    .header("authorization", auth)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_json(response).await;
        assert_eq!(body["error"]["numeric_code"], 4002);
    }

    #[tokio::test]
    async fn test_list_rejects_oversized_page() {
        let state = empty_state();
        let auth = token(&state, Role::Student);

        let response = router(state)
            .oneshot(
                Request::get("/v1/papers?limit=500")
                    .header("authorization", auth)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"]["field"], "limit");
    }
}
