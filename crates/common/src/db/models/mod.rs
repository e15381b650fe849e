//! SeaORM entity models
//!
//! Tables owned by the hosted backend that this service reads and writes

mod citation;
mod paper;

pub use paper::{
    Entity as PaperEntity,
    Model as Paper,
    ActiveModel as PaperActiveModel,
    Column as PaperColumn,
};

pub use citation::{
    Entity as CitationEntity,
    Model as Citation,
    ActiveModel as CitationActiveModel,
    Column as CitationColumn,
    CitationOrigin,
};
