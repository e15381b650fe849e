//! Citation edge handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::AppState;
use rkive_common::{
    db::models::{Citation, CitationOrigin},
    db::Repository,
    errors::{AppError, Result},
    events::{ChangeAction, TableEvent},
    metrics, Session,
};

const CITATIONS_TABLE: &str = "citations";

#[derive(Serialize)]
pub struct PaperCitationsResponse {
    pub paper_id: Uuid,
    pub paper_title: String,
    pub outgoing: Vec<CitationLink>,
    pub incoming: Vec<CitationLink>,
    pub stats: CitationStats,
}

/// One edge seen from the requested paper; `paper_*` describe the other end
#[derive(Serialize)]
pub struct CitationLink {
    pub citation_id: Uuid,
    pub paper_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paper_title: Option<String>,
    pub origin: CitationOrigin,
}

#[derive(Serialize)]
pub struct CitationStats {
    pub outgoing_count: usize,
    pub incoming_count: usize,
}

#[derive(Debug, Deserialize)]
pub struct CreateCitationRequest {
    pub citing_paper_id: Uuid,
    pub cited_paper_id: Uuid,
}

#[derive(Serialize)]
pub struct CitationResponse {
    pub id: Uuid,
    pub citing_paper_id: Uuid,
    pub cited_paper_id: Uuid,
    pub origin: CitationOrigin,
    pub created_at: String,
}

impl From<Citation> for CitationResponse {
    fn from(c: Citation) -> Self {
        Self {
            origin: c.citation_origin(),
            id: c.id,
            citing_paper_id: c.citing_paper_id,
            cited_paper_id: c.cited_paper_id,
            created_at: c.created_at.to_rfc3339(),
        }
    }
}

/// Outgoing and incoming edges of a paper, with the other paper's title
pub async fn get_citations(
    State(state): State<AppState>,
    _session: Session,
    Path(paper_id): Path<Uuid>,
) -> Result<Json<PaperCitationsResponse>> {
    let repo = Repository::new(state.db.clone());

    let paper = repo.require_paper(paper_id).await?;
    let (outgoing, incoming) = repo.get_citations(paper_id).await?;

    let linked: Vec<Uuid> = outgoing
        .iter()
        .map(|c| c.cited_paper_id)
        .chain(incoming.iter().map(|c| c.citing_paper_id))
        .collect();
    let titles: HashMap<Uuid, String> = repo
        .find_papers_by_ids(&linked)
        .await?
        .into_iter()
        .map(|p| (p.id, p.title))
        .collect();

    let link = |c: &Citation, other: Uuid| CitationLink {
        citation_id: c.id,
        paper_id: other,
        paper_title: titles.get(&other).cloned(),
        origin: c.citation_origin(),
    };

    let outgoing_links: Vec<CitationLink> = outgoing.iter().map(|c| link(c, c.cited_paper_id)).collect();
    let incoming_links: Vec<CitationLink> = incoming.iter().map(|c| link(c, c.citing_paper_id)).collect();

    Ok(Json(PaperCitationsResponse {
        paper_id: paper.id,
        paper_title: paper.title,
        stats: CitationStats {
            outgoing_count: outgoing_links.len(),
            incoming_count: incoming_links.len(),
        },
        outgoing: outgoing_links,
        incoming: incoming_links,
    }))
}

/// Record a manual citation edge (admin only)
pub async fn create_citation(
    State(state): State<AppState>,
    session: Session,
    Json(request): Json<CreateCitationRequest>,
) -> Result<(StatusCode, Json<CitationResponse>)> {
    session.require_citation_manager()?;

    let repo = Repository::new(state.db.clone());
    let citation = repo
        .create_citation(
            request.citing_paper_id,
            request.cited_paper_id,
            CitationOrigin::Manual,
        )
        .await?;

    metrics::record_citation_write("create");
    state
        .events
        .publish(TableEvent::new(CITATIONS_TABLE, ChangeAction::Insert, citation.id));

    tracing::info!(
        citation_id = %citation.id,
        citing = %citation.citing_paper_id,
        cited = %citation.cited_paper_id,
        user_id = %session.user_id,
        request_id = %session.request_id,
        "Citation created"
    );

    Ok((StatusCode::CREATED, Json(citation.into())))
}

/// Remove a citation edge (admin only)
pub async fn delete_citation(
    State(state): State<AppState>,
    session: Session,
    Path(citation_id): Path<Uuid>,
) -> Result<StatusCode> {
    session.require_citation_manager()?;

    let repo = Repository::new(state.db.clone());
    if !repo.delete_citation(citation_id).await? {
        return Err(AppError::CitationNotFound {
            id: citation_id.to_string(),
        });
    }

    metrics::record_citation_write("delete");
    state
        .events
        .publish(TableEvent::new(CITATIONS_TABLE, ChangeAction::Delete, citation_id));

    tracing::info!(
        citation_id = %citation_id,
        user_id = %session.user_id,
        request_id = %session.request_id,
        "Citation deleted"
    );

    Ok(StatusCode::NO_CONTENT)
}
