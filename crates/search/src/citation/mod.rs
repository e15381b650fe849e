//! Citation graph and tree assembly
//!
//! Edges come from the `citations` table. The graph is rebuilt per request;
//! it is small enough that no incremental structure is kept.

mod graph;
mod tree;

pub use graph::{CitationEdge, CitationGraph, TraversalDirection};
pub use tree::{linked_ids, CitationTree, EdgeKind, NodeKind, TreeEdge, TreeNode};
