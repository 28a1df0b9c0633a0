//! Seeded traversal over the enriched graph.

use std::collections::{HashMap, HashSet, VecDeque};

use super::{group_levels, ImpactResult, ImpactSummary, ImpactedNode, Severity, TraversalOptions};
use super::Direction;
use crate::diff::ChangeResult;
use crate::graph::enrich::{EnrichedGraph, EnrichedGraphEdge, EnrichedGraphNode, NodeKind, RelationshipKind};

/// Adjacency lists over an [`EnrichedGraph`], built once per analysis.
pub struct GraphIndex<'g> {
    nodes: HashMap<&'g str, &'g EnrichedGraphNode>,
    outgoing: HashMap<&'g str, Vec<&'g EnrichedGraphEdge>>,
    incoming: HashMap<&'g str, Vec<&'g EnrichedGraphEdge>>,
}

impl<'g> GraphIndex<'g> {
    pub fn new(graph: &'g EnrichedGraph) -> Self {
        let mut outgoing: HashMap<&str, Vec<&EnrichedGraphEdge>> = HashMap::new();
        let mut incoming: HashMap<&str, Vec<&EnrichedGraphEdge>> = HashMap::new();
        for edge in &graph.edges {
            outgoing.entry(edge.from.as_str()).or_default().push(edge);
            incoming.entry(edge.to.as_str()).or_default().push(edge);
        }
        Self {
            nodes: graph.index(),
            outgoing,
            incoming,
        }
    }

    pub fn node(&self, id: &str) -> Option<&'g EnrichedGraphNode> {
        self.nodes.get(id).copied()
    }

    pub fn outgoing(&self, id: &str) -> &[&'g EnrichedGraphEdge] {
        self.outgoing.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn incoming(&self, id: &str) -> &[&'g EnrichedGraphEdge] {
        self.incoming.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Neighbors of `id` reachable in one hop under `options`.
    fn neighbors(&self, id: &str, options: &TraversalOptions) -> Vec<&'g str> {
        let mut out = Vec::new();
        if matches!(options.direction, Direction::Forward | Direction::Both) {
            out.extend(
                self.outgoing(id)
                    .iter()
                    .filter(|e| options.follows(e.kind))
                    .map(|e| e.to.as_str()),
            );
        }
        if matches!(options.direction, Direction::Backward | Direction::Both) {
            out.extend(
                self.incoming(id)
                    .iter()
                    .filter(|e| options.follows(e.kind))
                    .map(|e| e.from.as_str()),
            );
        }
        out
    }

    /// Every node reachable from `seed`, the seed included.
    ///
    /// Each node is pushed at most once, so cycles terminate.
    fn reachable(&self, seed: &'g str, options: &TraversalOptions) -> HashSet<&'g str> {
        let mut visited = HashSet::new();
        let mut stack = vec![seed];
        visited.insert(seed);
        while let Some(current) = stack.pop() {
            for next in self.neighbors(current, options) {
                if visited.insert(next) {
                    stack.push(next);
                }
            }
        }
        visited
    }

    /// Shortest hop count from `seed` to each visited node.
    fn levels(
        &self,
        seed: &'g str,
        visited: &HashSet<&'g str>,
        options: &TraversalOptions,
    ) -> HashMap<&'g str, usize> {
        let mut levels = HashMap::new();
        let mut queue = VecDeque::new();
        levels.insert(seed, 0);
        queue.push_back(seed);
        while let Some(current) = queue.pop_front() {
            let level = levels[current];
            for next in self.neighbors(current, options) {
                if visited.contains(next) && !levels.contains_key(next) {
                    levels.insert(next, level + 1);
                    queue.push_back(next);
                }
            }
        }
        levels
    }

    /// Strongest coupling over edges between `id` and the visited set, any kind.
    fn severity(&self, id: &str, visited: &HashSet<&str>) -> Severity {
        let out = self
            .outgoing(id)
            .iter()
            .filter(|e| visited.contains(e.to.as_str()));
        let inc = self
            .incoming(id)
            .iter()
            .filter(|e| visited.contains(e.from.as_str()));
        out.chain(inc)
            .map(|e| Severity::of(e.kind))
            .max()
            .unwrap_or(Severity::Low)
    }

    fn sources(&self, id: &str, kind: RelationshipKind) -> Vec<String> {
        let mut ids: Vec<String> = self
            .incoming(id)
            .iter()
            .filter(|e| e.kind == kind)
            .map(|e| e.from.clone())
            .collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// Impact of a single seed.
    pub fn impact(&self, seed: &str, options: &TraversalOptions) -> ImpactResult {
        let Some(seed_node) = self.node(seed) else {
            log::warn!("impact seed {} is not in the graph", seed);
            return ImpactResult {
                seed: seed.to_string(),
                levels: Vec::new(),
                summary: ImpactSummary::default(),
            };
        };
        let seed_id = seed_node.id.as_str();

        let visited = self.reachable(seed_id, options);
        let levels = self.levels(seed_id, &visited, options);

        let mut impacted = Vec::new();
        for (id, level) in &levels {
            if *id == seed_id {
                continue;
            }
            if options.max_depth.map(|max| *level > max).unwrap_or(false) {
                continue;
            }
            let Some(node) = self.node(id) else {
                continue;
            };
            // type and file nodes are hops, not results
            if node.kind != NodeKind::Function {
                continue;
            }
            impacted.push(ImpactedNode {
                id: node.id.clone(),
                name: node.name.clone(),
                kind: node.kind,
                severity: self.severity(id, &visited),
                level: *level,
                file_path: node.file_path.clone(),
                called_by: self.sources(id, RelationshipKind::Calls),
                imported_by: self.sources(id, RelationshipKind::Imports),
            });
        }

        let levels = group_levels(impacted);
        let summary = ImpactSummary::from_levels(&levels);
        log::debug!(
            "impact of {}: {} nodes visited, {} reported",
            seed,
            visited.len(),
            summary.total
        );
        ImpactResult {
            seed: seed.to_string(),
            levels,
            summary,
        }
    }
}

/// Traverse from each seed; one result per seed, in seed order.
///
/// # Arguments
/// * `graph` - Enriched graph to walk
/// * `seeds` - Node ids of changed functions
/// * `options` - Direction, followed relationship kinds, depth limit
///
/// # Guarantees
/// - Terminates on cyclic graphs; each node is visited at most once per seed
/// - The seed itself is never reported
/// - Only FUNCTION nodes are reported; type and file nodes are traversed through
pub fn traverse(graph: &EnrichedGraph, seeds: &[String], options: &TraversalOptions) -> Vec<ImpactResult> {
    let index = GraphIndex::new(graph);
    seeds.iter().map(|seed| index.impact(seed, options)).collect()
}

/// Impact of the added and modified functions of `change`.
///
/// Their ids are keys of the head snapshot, so `graph` must be the head's
/// enriched graph. Deleted functions only exist in the base snapshot; seed
/// them with [`traverse`] over the base graph and [`ChangeResult::base_ids`].
pub fn impact_of(graph: &EnrichedGraph, change: &ChangeResult, options: &TraversalOptions) -> Vec<ImpactResult> {
    traverse(graph, &change.head_ids(), options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn node(id: &str, kind: NodeKind) -> EnrichedGraphNode {
        EnrichedGraphNode {
            id: id.to_string(),
            name: id.to_string(),
            kind,
            file: "a.ts".to_string(),
            file_path: "/r/a.ts".to_string(),
            position: None,
        }
    }

    fn edge(from: &str, to: &str, kind: RelationshipKind) -> EnrichedGraphEdge {
        EnrichedGraphEdge {
            from: from.to_string(),
            to: to.to_string(),
            kind,
            from_path: "/r/a.ts".to_string(),
            to_path: "/r/a.ts".to_string(),
        }
    }

    fn chain_graph() -> EnrichedGraph {
        EnrichedGraph {
            nodes: vec![
                node("f", NodeKind::Function),
                node("g", NodeKind::Function),
                node("h", NodeKind::Function),
                node("C", NodeKind::Class),
                node("file", NodeKind::File),
            ],
            edges: vec![
                edge("g", "f", RelationshipKind::Calls),
                edge("h", "g", RelationshipKind::Calls),
                edge("C", "h", RelationshipKind::HasMethod),
                edge("file", "g", RelationshipKind::Imports),
            ],
        }
    }

    #[test]
    fn test_backward_calls_levels() {
        let options = TraversalOptions::new(Direction::Backward).with_kinds([RelationshipKind::Calls]);
        let results = traverse(&chain_graph(), &["f".to_string()], &options);
        assert_eq!(results.len(), 1);
        let result = &results[0];

        let g = result.find("g").unwrap();
        assert_eq!((g.level, g.severity), (1, Severity::High));
        assert_eq!(g.called_by, vec!["h".to_string()]);
        assert_eq!(g.imported_by, vec!["file".to_string()]);
        let h = result.find("h").unwrap();
        assert_eq!((h.level, h.severity), (2, Severity::High));

        assert!(result.find("f").is_none());
        assert_eq!(result.summary.total, 2);
        assert_eq!(result.summary.max_level, 2);
        assert_eq!(result.summary.by_kind.get(&NodeKind::Function), Some(&2));
    }

    #[test]
    fn test_max_depth_limits_levels() {
        let options = TraversalOptions::new(Direction::Backward)
            .with_kinds([RelationshipKind::Calls])
            .with_max_depth(Some(1));
        let result = &traverse(&chain_graph(), &["f".to_string()], &options)[0];
        let ids: Vec<&str> = result.nodes().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["g"]);
    }

    #[test]
    fn test_type_nodes_are_hops_not_results() {
        let graph = EnrichedGraph {
            nodes: vec![
                node("I.m", NodeKind::Function),
                node("I", NodeKind::Interface),
                node("A", NodeKind::Class),
                node("A.m", NodeKind::Function),
            ],
            edges: vec![
                edge("I", "I.m", RelationshipKind::HasMethod),
                edge("A", "I", RelationshipKind::Implements),
                edge("A", "A.m", RelationshipKind::HasMethod),
            ],
        };
        let options = TraversalOptions::new(Direction::Both);
        let result = &traverse(&graph, &["I.m".to_string()], &options)[0];
        let ids: Vec<&str> = result.nodes().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["A.m"]);
        let a_m = result.find("A.m").unwrap();
        assert_eq!(a_m.level, 3);
        assert_eq!(a_m.severity, Severity::Low);
    }

    #[test]
    fn test_cycles_terminate() {
        let graph = EnrichedGraph {
            nodes: vec![node("a", NodeKind::Function), node("b", NodeKind::Function)],
            edges: vec![
                edge("a", "b", RelationshipKind::Calls),
                edge("b", "a", RelationshipKind::Calls),
            ],
        };
        let result = &traverse(&graph, &["a".to_string()], &TraversalOptions::new(Direction::Forward))[0];
        assert_eq!(result.summary.total, 1);
        assert_eq!(result.find("b").unwrap().level, 1);
    }

    #[test]
    fn test_both_direction_visits_symmetric_set() {
        let graph = chain_graph();
        let index = GraphIndex::new(&graph);
        let options = TraversalOptions::new(Direction::Both);
        let from_f = index.reachable("f", &options);
        for id in &from_f {
            let back = index.reachable(*id, &options);
            assert_eq!(back, from_f);
        }
    }

    #[test]
    fn test_unknown_seed_yields_empty_result() {
        let result = &traverse(&chain_graph(), &["nope".to_string()], &TraversalOptions::default())[0];
        assert!(result.levels.is_empty());
        assert_eq!(result.summary.total, 0);
    }
}
