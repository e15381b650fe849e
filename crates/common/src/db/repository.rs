//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations
//! with proper error handling.

use crate::db::models::*;
use crate::db::{DbPool, PaperSource};
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use uuid::Uuid;

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Paper Operations
    // ========================================================================

    /// Find paper by ID
    pub async fn find_paper_by_id(&self, id: Uuid) -> Result<Option<Paper>> {
        PaperEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find a paper or fail with `PaperNotFound`
    pub async fn require_paper(&self, id: Uuid) -> Result<Paper> {
        self.find_paper_by_id(id)
            .await?
            .ok_or_else(|| AppError::PaperNotFound { id: id.to_string() })
    }

    /// Fetch several papers at once; unknown ids are skipped
    pub async fn find_papers_by_ids(&self, ids: &[Uuid]) -> Result<Vec<Paper>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        PaperEntity::find()
            .filter(PaperColumn::Id.is_in(ids.iter().copied()))
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// List papers, newest first
    pub async fn list_papers(&self, offset: u64, limit: u64) -> Result<(Vec<Paper>, u64)> {
        let total = PaperEntity::find().count(self.read_conn()).await?;

        let papers = PaperEntity::find()
            .order_by_desc(PaperColumn::CreatedAt)
            .offset(offset)
            .limit(limit)
            .all(self.read_conn())
            .await?;

        Ok((papers, total))
    }

    // ========================================================================
    // Citation Operations
    // ========================================================================

    /// Get citations for a paper as (outgoing, incoming)
    pub async fn get_citations(&self, paper_id: Uuid) -> Result<(Vec<Citation>, Vec<Citation>)> {
        let outgoing = CitationEntity::find()
            .filter(CitationColumn::CitingPaperId.eq(paper_id))
            .order_by_asc(CitationColumn::CreatedAt)
            .all(self.read_conn())
            .await?;

        let incoming = CitationEntity::find()
            .filter(CitationColumn::CitedPaperId.eq(paper_id))
            .order_by_asc(CitationColumn::CreatedAt)
            .all(self.read_conn())
            .await?;

        Ok((outgoing, incoming))
    }

    /// Load every citation edge, for building the in-memory graph
    pub async fn load_citation_edges(&self) -> Result<Vec<Citation>> {
        CitationEntity::find()
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find citation by ID
    pub async fn find_citation_by_id(&self, id: Uuid) -> Result<Option<Citation>> {
        CitationEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Record a citation edge.
    ///
    /// Both papers must exist, must differ, and the pair must not already be
    /// linked in the same direction.
    pub async fn create_citation(
        &self,
        citing_paper_id: Uuid,
        cited_paper_id: Uuid,
        origin: CitationOrigin,
    ) -> Result<Citation> {
        if citing_paper_id == cited_paper_id {
            return Err(AppError::SelfCitation {
                paper_id: citing_paper_id.to_string(),
            });
        }

        self.require_paper(citing_paper_id).await?;
        self.require_paper(cited_paper_id).await?;

        let existing = CitationEntity::find()
            .filter(CitationColumn::CitingPaperId.eq(citing_paper_id))
            .filter(CitationColumn::CitedPaperId.eq(cited_paper_id))
            .one(self.write_conn())
            .await?;

        if existing.is_some() {
            return Err(AppError::DuplicateCitation {
                citing: citing_paper_id.to_string(),
                cited: cited_paper_id.to_string(),
            });
        }

        let citation = CitationActiveModel {
            id: Set(Uuid::new_v4()),
            citing_paper_id: Set(citing_paper_id),
            cited_paper_id: Set(cited_paper_id),
            origin: Set(origin.into()),
            created_at: Set(chrono::Utc::now().fixed_offset()),
        };

        citation.insert(self.write_conn()).await.map_err(Into::into)
    }

    /// Delete citation by ID
    pub async fn delete_citation(&self, id: Uuid) -> Result<bool> {
        let result = CitationEntity::delete_by_id(id)
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }
}

#[async_trait]
impl PaperSource for Repository {
    async fn fetch_candidate_papers(&self, exclude_id: Uuid, limit: u64) -> Result<Vec<Paper>> {
        PaperEntity::find()
            .filter(PaperColumn::Id.ne(exclude_id))
            .order_by_desc(PaperColumn::CreatedAt)
            .limit(limit)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }
}
