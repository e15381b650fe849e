//! Citation entity for graph relationships

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// How a citation edge came to exist
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CitationOrigin {
    /// Found by the reference-extraction job
    Automated,
    /// Asserted by an admin
    Manual,
}

impl CitationOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            CitationOrigin::Automated => "automated",
            CitationOrigin::Manual => "manual",
        }
    }
}

impl From<String> for CitationOrigin {
    fn from(s: String) -> Self {
        match s.as_str() {
            "automated" => CitationOrigin::Automated,
            _ => CitationOrigin::Manual,
        }
    }
}

impl From<CitationOrigin> for String {
    fn from(origin: CitationOrigin) -> Self {
        origin.as_str().to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "citations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Paper that contains the citation
    pub citing_paper_id: Uuid,

    /// Paper that is being cited
    pub cited_paper_id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub origin: String,

    pub created_at: DateTimeWithTimeZone,
}

impl Model {
    pub fn citation_origin(&self) -> CitationOrigin {
        CitationOrigin::from(self.origin.clone())
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::paper::Entity",
        from = "Column::CitingPaperId",
        to = "super::paper::Column::Id",
        on_delete = "Cascade"
    )]
    CitingPaper,

    #[sea_orm(
        belongs_to = "super::paper::Entity",
        from = "Column::CitedPaperId",
        to = "super::paper::Column::Id",
        on_delete = "Cascade"
    )]
    CitedPaper,
}

impl ActiveModelBehavior for ActiveModel {}
