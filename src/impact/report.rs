//! Combined impact of several changed functions.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::{group_levels, ImpactLevel, ImpactResult, ImpactSummary, ImpactedNode};

/// Impact of a whole change set.
///
/// A node reached from several seeds appears once, at its lowest level and
/// with its highest severity. Seeds are never reported, even when reached
/// from another seed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImpactReport {
    pub seeds: Vec<String>,
    pub levels: Vec<ImpactLevel>,
    pub summary: ImpactSummary,
}

impl ImpactReport {
    pub fn from_results(results: &[ImpactResult]) -> Self {
        let seeds: Vec<String> = results
            .iter()
            .map(|r| r.seed.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut merged: BTreeMap<&str, ImpactedNode> = BTreeMap::new();
        for node in results.iter().flat_map(|r| r.nodes()) {
            if seeds.binary_search(&node.id).is_ok() {
                continue;
            }
            match merged.get_mut(node.id.as_str()) {
                None => {
                    merged.insert(node.id.as_str(), node.clone());
                }
                Some(existing) => {
                    existing.level = existing.level.min(node.level);
                    existing.severity = existing.severity.max(node.severity);
                    union_sorted(&mut existing.called_by, &node.called_by);
                    union_sorted(&mut existing.imported_by, &node.imported_by);
                }
            }
        }

        let levels = group_levels(merged.into_values().collect());
        let summary = ImpactSummary::from_levels(&levels);
        Self {
            seeds,
            levels,
            summary,
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = &ImpactedNode> {
        self.levels.iter().flat_map(|l| l.nodes.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.summary.total == 0
    }
}

fn union_sorted(target: &mut Vec<String>, extra: &[String]) {
    target.extend(extra.iter().cloned());
    target.sort();
    target.dedup();
}
