// Diff tree: per-metric counter/ratio comparison between two statistics trees

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Metric;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricDiff {
    pub counter: Option<f64>,
    pub ratio: Option<f64>,
}

/// `None` for a metric means the reference side has no value for it.
pub type DiffTree = BTreeMap<String, BTreeMap<String, BTreeMap<Metric, Option<MetricDiff>>>>;

/// Optional `node` / `interface` query filters of the scaled diff.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiffFilter {
    pub node: Option<String>,
    pub interface: Option<String>,
}

impl DiffFilter {
    pub fn accepts_device(&self, device: &str) -> bool {
        self.node.as_deref().is_none_or(|n| n == device)
    }

    pub fn accepts_interface(&self, interface: &str) -> bool {
        self.interface.as_deref().is_none_or(|i| i == interface)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotDiff {
    pub network: String,
    pub source_snapshot: String,
    pub destination_snapshot: String,
    pub diff: DiffTree,
}
