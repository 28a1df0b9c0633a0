//! Change impact analysis over the enriched graph.
//!
//! Starting from changed functions, walks relationships in the requested
//! direction and reports every reachable function with its hop distance
//! (level) and how tightly it is coupled to the change (severity).

pub mod report;
pub mod traverse;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::str::FromStr;

use crate::graph::enrich::{NodeKind, RelationshipKind};

pub use report::ImpactReport;
pub use traverse::{impact_of, traverse, GraphIndex};

/// Which way edges are followed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Follow `edge.to`: what the change depends on
    Forward,
    /// Follow `edge.from`: what depends on the change
    #[default]
    Backward,
    Both,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
            Direction::Both => "both",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "forward" | "out" | "outgoing" | "downstream" => Ok(Direction::Forward),
            "backward" | "in" | "incoming" | "upstream" => Ok(Direction::Backward),
            "both" | "all" | "any" => Ok(Direction::Both),
            other => Err(format!(
                "unknown direction: {} (expected forward, backward or both)",
                other
            )),
        }
    }
}

/// Coupling of an impacted node to the change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// Severity contributed by one relationship.
    pub fn of(kind: RelationshipKind) -> Self {
        match kind {
            RelationshipKind::Calls | RelationshipKind::CallsImplementation => Severity::High,
            RelationshipKind::Implements
            | RelationshipKind::Extends
            | RelationshipKind::ImplementedBy => Severity::Medium,
            _ => Severity::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Traversal parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraversalOptions {
    pub direction: Direction,
    /// Relationship kinds to follow; `None` follows every kind
    pub allowed_kinds: Option<HashSet<RelationshipKind>>,
    /// Deepest level reported; `None` is unlimited
    pub max_depth: Option<usize>,
}

impl TraversalOptions {
    pub fn new(direction: Direction) -> Self {
        Self {
            direction,
            ..Default::default()
        }
    }

    pub fn with_kinds(mut self, kinds: impl IntoIterator<Item = RelationshipKind>) -> Self {
        self.allowed_kinds = Some(kinds.into_iter().collect());
        self
    }

    pub fn with_max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn follows(&self, kind: RelationshipKind) -> bool {
        self.allowed_kinds
            .as_ref()
            .map(|kinds| kinds.contains(&kind))
            .unwrap_or(true)
    }
}

/// A function reached from a changed function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactedNode {
    pub id: String,
    pub name: String,
    pub kind: NodeKind,
    pub severity: Severity,
    /// Shortest hop count from the seed
    pub level: usize,
    pub file_path: String,
    /// Ids of nodes with a CALLS edge into this one
    pub called_by: Vec<String>,
    /// Ids of nodes with an IMPORTS edge into this one
    pub imported_by: Vec<String>,
}

/// Impacted nodes at one hop distance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactLevel {
    pub level: usize,
    pub nodes: Vec<ImpactedNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactSummary {
    pub total: usize,
    /// Highest level reached, 0 when nothing is impacted
    pub max_level: usize,
    pub by_kind: BTreeMap<NodeKind, usize>,
    pub by_severity: BTreeMap<Severity, usize>,
}

impl ImpactSummary {
    pub fn from_levels(levels: &[ImpactLevel]) -> Self {
        let mut summary = ImpactSummary::default();
        for level in levels {
            for node in &level.nodes {
                summary.total += 1;
                summary.max_level = summary.max_level.max(node.level);
                *summary.by_kind.entry(node.kind).or_default() += 1;
                *summary.by_severity.entry(node.severity).or_default() += 1;
            }
        }
        summary
    }
}

/// Impact of one changed function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactResult {
    pub seed: String,
    pub levels: Vec<ImpactLevel>,
    pub summary: ImpactSummary,
}

impl ImpactResult {
    pub fn nodes(&self) -> impl Iterator<Item = &ImpactedNode> {
        self.levels.iter().flat_map(|l| l.nodes.iter())
    }

    pub fn find(&self, id: &str) -> Option<&ImpactedNode> {
        self.nodes().find(|n| n.id == id)
    }
}

/// Group nodes by level, ordered by level then id.
pub(crate) fn group_levels(mut nodes: Vec<ImpactedNode>) -> Vec<ImpactLevel> {
    nodes.sort_by(|a, b| a.level.cmp(&b.level).then_with(|| a.id.cmp(&b.id)));
    let mut levels: Vec<ImpactLevel> = Vec::new();
    for node in nodes {
        match levels.last_mut() {
            Some(last) if last.level == node.level => last.nodes.push(node),
            _ => levels.push(ImpactLevel {
                level: node.level,
                nodes: vec![node],
            }),
        }
    }
    levels
}
