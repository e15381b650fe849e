//! API handlers module

pub mod citations;
pub mod events;
pub mod health;
pub mod papers;
pub mod related;
pub mod tree;
