//! Citation graph representation
//!
//! In-memory adjacency built from the `citations` table

use rkive_common::db::models::Citation;
use rkive_common::errors::{AppError, Result};
use std::collections::{HashMap, HashSet, VecDeque};
use uuid::Uuid;

/// Directed edge: `citing_paper_id` cites `cited_paper_id`.
///
/// The endpoints always differ; construction fails otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CitationEdge {
    citing_paper_id: Uuid,
    cited_paper_id: Uuid,
}

impl CitationEdge {
    pub fn new(citing_paper_id: Uuid, cited_paper_id: Uuid) -> Result<Self> {
        if citing_paper_id == cited_paper_id {
            return Err(AppError::SelfCitation {
                paper_id: citing_paper_id.to_string(),
            });
        }

        Ok(Self {
            citing_paper_id,
            cited_paper_id,
        })
    }

    pub fn citing(&self) -> Uuid {
        self.citing_paper_id
    }

    pub fn cited(&self) -> Uuid {
        self.cited_paper_id
    }
}

impl TryFrom<&Citation> for CitationEdge {
    type Error = AppError;

    fn try_from(row: &Citation) -> Result<Self> {
        Self::new(row.citing_paper_id, row.cited_paper_id)
    }
}

/// Direction for graph traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraversalDirection {
    /// Follow references (papers cited by this paper)
    Forward,
    /// Follow citations (papers citing this paper)
    Backward,
    /// Both directions
    Both,
}

/// In-memory citation graph
#[derive(Debug, Default)]
pub struct CitationGraph {
    /// paper_id -> papers it cites
    outgoing: HashMap<Uuid, Vec<Uuid>>,

    /// paper_id -> papers citing it
    incoming: HashMap<Uuid, Vec<Uuid>>,

    nodes: HashSet<Uuid>,
    edges: HashSet<CitationEdge>,
}

impl CitationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from stored rows. Self-citing rows are skipped with a warning.
    pub fn from_rows(rows: &[Citation]) -> Self {
        let mut graph = Self::new();
        for row in rows {
            match CitationEdge::try_from(row) {
                Ok(edge) => graph.add_edge(edge),
                Err(_) => tracing::warn!(citation_id = %row.id, "Skipping self-citation row"),
            }
        }
        graph
    }

    /// Add an edge; repeated edges are ignored
    pub fn add_edge(&mut self, edge: CitationEdge) {
        if !self.edges.insert(edge) {
            return;
        }

        self.nodes.insert(edge.citing());
        self.nodes.insert(edge.cited());

        self.outgoing.entry(edge.citing()).or_default().push(edge.cited());
        self.incoming.entry(edge.cited()).or_default().push(edge.citing());
    }

    /// Papers cited by this paper
    pub fn get_references(&self, paper_id: Uuid) -> &[Uuid] {
        self.outgoing.get(&paper_id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Papers citing this paper
    pub fn get_citations(&self, paper_id: Uuid) -> &[Uuid] {
        self.incoming.get(&paper_id).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn contains_edge(&self, citing: Uuid, cited: Uuid) -> bool {
        CitationEdge::new(citing, cited)
            .map(|edge| self.edges.contains(&edge))
            .unwrap_or(false)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Incoming edge count
    pub fn citation_count(&self, paper_id: Uuid) -> usize {
        self.get_citations(paper_id).len()
    }

    /// Outgoing edge count
    pub fn reference_count(&self, paper_id: Uuid) -> usize {
        self.get_references(paper_id).len()
    }

    /// Breadth-first walk from `start`, up to `depth` hops.
    ///
    /// Returns each reached paper once with its shortest hop distance, in
    /// discovery order. `start` itself is not included.
    pub fn traverse(
        &self,
        start: Uuid,
        depth: usize,
        direction: TraversalDirection,
    ) -> Vec<(Uuid, usize)> {
        self.traverse_where(start, depth, direction, |_| true)
    }

    /// Like [`traverse`](Self::traverse), but ids rejected by `keep` are
    /// neither reported nor expanded
    pub fn traverse_where(
        &self,
        start: Uuid,
        depth: usize,
        direction: TraversalDirection,
        keep: impl Fn(Uuid) -> bool,
    ) -> Vec<(Uuid, usize)> {
        let mut visited = HashSet::from([start]);
        let mut result = Vec::new();
        let mut queue = VecDeque::from([(start, 0usize)]);

        while let Some((current, hop)) = queue.pop_front() {
            if hop == depth {
                continue;
            }

            let forward = matches!(direction, TraversalDirection::Forward | TraversalDirection::Both);
            let backward = matches!(direction, TraversalDirection::Backward | TraversalDirection::Both);

            let neighbors = forward
                .then(|| self.get_references(current))
                .into_iter()
                .chain(backward.then(|| self.get_citations(current)))
                .flatten();

            for &neighbor in neighbors {
                if keep(neighbor) && visited.insert(neighbor) {
                    result.push((neighbor, hop + 1));
                    queue.push_back((neighbor, hop + 1));
                }
            }
        }

        result
    }

    /// Edges whose both endpoints are in `ids`
    pub fn edges_within(&self, ids: &HashSet<Uuid>) -> Vec<CitationEdge> {
        let mut edges: Vec<CitationEdge> = self
            .edges
            .iter()
            .filter(|e| ids.contains(&e.citing()) && ids.contains(&e.cited()))
            .copied()
            .collect();
        edges.sort_by_key(|e| (e.citing(), e.cited()));
        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u128) -> Uuid {
        Uuid::from_u128(n)
    }

    fn edge(a: u128, b: u128) -> CitationEdge {
        CitationEdge::new(id(a), id(b)).unwrap()
    }

    #[test]
    fn test_self_citation_rejected() {
        assert!(matches!(
            CitationEdge::new(id(1), id(1)),
            Err(AppError::SelfCitation { .. })
        ));
    }

    #[test]
    fn test_graph_construction() {
        let mut graph = CitationGraph::new();

        // A cites B, B cites C
        graph.add_edge(edge(1, 2));
        graph.add_edge(edge(2, 3));

        assert_eq!(graph.node_count(), 3);
        assert_eq!(graph.get_references(id(1)), &[id(2)]);
        assert_eq!(graph.get_citations(id(2)), &[id(1)]);
        assert_eq!(graph.get_references(id(2)), &[id(3)]);
        assert!(graph.contains_edge(id(1), id(2)));
        assert!(!graph.contains_edge(id(2), id(1)));
    }

    #[test]
    fn test_citation_counts_ignore_duplicates() {
        let mut graph = CitationGraph::new();

        // Both A and C cite B; A's edge is reported twice
        graph.add_edge(edge(1, 2));
        graph.add_edge(edge(3, 2));
        graph.add_edge(edge(1, 2));

        assert_eq!(graph.citation_count(id(2)), 2);
        assert_eq!(graph.reference_count(id(1)), 1);
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_from_rows_skips_self_citations() {
        let now = chrono::Utc::now().fixed_offset();
        let row = |n: u128, a: u128, b: u128| Citation {
            id: id(100 + n),
            citing_paper_id: id(a),
            cited_paper_id: id(b),
            origin: "automated".to_string(),
            created_at: now,
        };

        let graph = CitationGraph::from_rows(&[row(1, 1, 2), row(2, 3, 3)]);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.node_count(), 2);
    }

    #[test]
    fn test_traverse_forward_depth() {
        let mut graph = CitationGraph::new();
        graph.add_edge(edge(1, 2));
        graph.add_edge(edge(2, 3));
        graph.add_edge(edge(3, 4));

        assert_eq!(
            graph.traverse(id(1), 2, TraversalDirection::Forward),
            vec![(id(2), 1), (id(3), 2)]
        );
        assert!(graph.traverse(id(1), 0, TraversalDirection::Forward).is_empty());
    }

    #[test]
    fn test_traverse_backward() {
        let mut graph = CitationGraph::new();
        graph.add_edge(edge(2, 1));
        graph.add_edge(edge(3, 2));

        assert_eq!(
            graph.traverse(id(1), 3, TraversalDirection::Backward),
            vec![(id(2), 1), (id(3), 2)]
        );
        assert!(graph.traverse(id(1), 3, TraversalDirection::Forward).is_empty());
    }

    #[test]
    fn test_traverse_both_uses_shortest_hop() {
        let mut graph = CitationGraph::new();
        // 1 -> 2 -> 3, and 3 -> 1 closes a cycle
        graph.add_edge(edge(1, 2));
        graph.add_edge(edge(2, 3));
        graph.add_edge(edge(3, 1));

        let reached = graph.traverse(id(1), 2, TraversalDirection::Both);
        assert_eq!(reached, vec![(id(2), 1), (id(3), 1)]);
    }

    #[test]
    fn test_traverse_where_stops_at_rejected_ids() {
        let mut graph = CitationGraph::new();
        graph.add_edge(edge(1, 2));
        graph.add_edge(edge(2, 3));
        graph.add_edge(edge(1, 4));

        let result = graph.traverse_where(id(1), 3, TraversalDirection::Forward, |n| n != id(2));

        assert_eq!(result, vec![(id(4), 1)]);
    }

    #[test]
    fn test_edges_within() {
        let mut graph = CitationGraph::new();
        graph.add_edge(edge(1, 2));
        graph.add_edge(edge(2, 3));
        graph.add_edge(edge(4, 1));

        let ids: HashSet<Uuid> = [id(1), id(2), id(3)].into_iter().collect();
        assert_eq!(graph.edges_within(&ids), vec![edge(1, 2), edge(2, 3)]);
    }
}
