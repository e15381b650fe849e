//! Paper entity
//!
//! Bibliographic record as stored by the hosted backend. Read-only here.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "papers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    #[sea_orm(column_type = "Text")]
    pub title: String,

    /// Free-form author list, as typed at upload time
    #[sea_orm(column_type = "Text", nullable)]
    pub authors: Option<String>,

    #[sea_orm(column_name = "abstract", column_type = "Text", nullable)]
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub category: Option<String>,

    pub year_published: Option<i32>,

    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
