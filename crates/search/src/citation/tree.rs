//! Citation tree payload
//!
//! Nodes and edges for the exploration view: the root paper, what it cites,
//! what cites it, and the papers scored as related to it.

use super::graph::{CitationGraph, TraversalDirection};
use crate::related::{RelatedPaper, SimilarityThreshold};
use rkive_common::db::models::Paper;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Root,
    /// Reached by following references
    Cited,
    /// Reached by following incoming citations
    Citing,
    /// Not linked by citations, only by similarity
    Related,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeNode {
    pub id: Uuid,
    pub title: String,
    pub year_published: Option<i32>,
    pub category: Option<String>,
    pub kind: NodeKind,
    /// Citation hops from the root; related nodes sit at 1
    pub hop: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    Cites,
    Similar,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeEdge {
    pub source: Uuid,
    pub target: Uuid,
    pub kind: EdgeKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitationTree {
    pub root_id: Uuid,
    pub depth: usize,
    pub threshold: f64,
    pub nodes: Vec<TreeNode>,
    pub edges: Vec<TreeEdge>,
}

/// Every paper within `depth` citation hops of `root`, either direction
pub fn linked_ids(graph: &CitationGraph, root: Uuid, depth: usize) -> HashSet<Uuid> {
    graph
        .traverse(root, depth, TraversalDirection::Both)
        .into_iter()
        .map(|(id, _)| id)
        .collect()
}

impl CitationTree {
    /// Build the tree around `root`.
    ///
    /// `papers` must hold the rows for the linked ids. An id without a row is
    /// left out along with its edges, and traversal does not continue past
    /// it. Related papers already present as citation nodes are not repeated.
    pub fn assemble(
        root: &Paper,
        graph: &CitationGraph,
        depth: usize,
        threshold: SimilarityThreshold,
        papers: &HashMap<Uuid, Paper>,
        related: Vec<RelatedPaper>,
    ) -> Self {
        let mut nodes = vec![TreeNode {
            id: root.id,
            title: root.title.clone(),
            year_published: root.year_published,
            category: root.category.clone(),
            kind: NodeKind::Root,
            hop: 0,
            score: None,
        }];
        let mut included = HashSet::from([root.id]);

        // A missing row ends the path; nothing is reached through it
        let has_row = |id: Uuid| {
            let found = papers.contains_key(&id);
            if !found {
                tracing::debug!(paper_id = %id, "Linked paper missing, skipping node");
            }
            found
        };

        let reached = graph
            .traverse_where(root.id, depth, TraversalDirection::Forward, has_row)
            .into_iter()
            .map(|(id, hop)| (id, hop, NodeKind::Cited))
            .chain(
                graph
                    .traverse_where(root.id, depth, TraversalDirection::Backward, has_row)
                    .into_iter()
                    .map(|(id, hop)| (id, hop, NodeKind::Citing)),
            );

        for (id, hop, kind) in reached {
            let Some(paper) = papers.get(&id) else {
                continue;
            };
            if !included.insert(id) {
                continue;
            }
            nodes.push(TreeNode {
                id,
                title: paper.title.clone(),
                year_published: paper.year_published,
                category: paper.category.clone(),
                kind,
                hop,
                score: None,
            });
        }

        let mut edges: Vec<TreeEdge> = graph
            .edges_within(&included)
            .into_iter()
            .map(|e| TreeEdge {
                source: e.citing(),
                target: e.cited(),
                kind: EdgeKind::Cites,
                weight: None,
            })
            .collect();

        for r in related {
            if !included.insert(r.paper_id) {
                continue;
            }
            edges.push(TreeEdge {
                source: root.id,
                target: r.paper_id,
                kind: EdgeKind::Similar,
                weight: Some(r.score),
            });
            nodes.push(TreeNode {
                id: r.paper_id,
                title: r.title,
                year_published: r.year_published,
                category: r.category,
                kind: NodeKind::Related,
                hop: 1,
                score: Some(r.score),
            });
        }

        Self {
            root_id: root.id,
            depth,
            threshold: threshold.value(),
            nodes,
            edges,
        }
    }

    pub fn node(&self, id: Uuid) -> Option<&TreeNode> {
        self.nodes.iter().find(|n| n.id == id)
    }
}
