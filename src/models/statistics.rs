// Interface traffic metrics and the device -> interface -> metric tree

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use wincode::{SchemaRead, SchemaWrite};

/// Traffic direction of a metric series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Rx,
    Tx,
}

/// The fixed set of per-interface rate series captured for every interval.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    SchemaRead,
    SchemaWrite,
)]
pub enum Metric {
    #[serde(rename = "RX_BPS_AVG")]
    RxBpsAvg,
    #[serde(rename = "RX_BPS_MAX")]
    RxBpsMax,
    #[serde(rename = "RX_BPS_MIN")]
    RxBpsMin,
    #[serde(rename = "TX_BPS_AVG")]
    TxBpsAvg,
    #[serde(rename = "TX_BPS_MAX")]
    TxBpsMax,
    #[serde(rename = "TX_BPS_MIN")]
    TxBpsMin,
}

impl Metric {
    pub const ALL: [Metric; 6] = [
        Metric::RxBpsAvg,
        Metric::RxBpsMax,
        Metric::RxBpsMin,
        Metric::TxBpsAvg,
        Metric::TxBpsMax,
        Metric::TxBpsMin,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Metric::RxBpsAvg => "RX_BPS_AVG",
            Metric::RxBpsMax => "RX_BPS_MAX",
            Metric::RxBpsMin => "RX_BPS_MIN",
            Metric::TxBpsAvg => "TX_BPS_AVG",
            Metric::TxBpsMax => "TX_BPS_MAX",
            Metric::TxBpsMin => "TX_BPS_MIN",
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            Metric::RxBpsAvg | Metric::RxBpsMax | Metric::RxBpsMin => Direction::Rx,
            Metric::TxBpsAvg | Metric::TxBpsMax | Metric::TxBpsMin => Direction::Tx,
        }
    }

    /// Aggregation applied over the interval ("avg", "max" or "min").
    pub fn aggregation(&self) -> &'static str {
        match self {
            Metric::RxBpsAvg | Metric::TxBpsAvg => "avg",
            Metric::RxBpsMax | Metric::TxBpsMax => "max",
            Metric::RxBpsMin | Metric::TxBpsMin => "min",
        }
    }
}

pub type InterfaceMetrics = BTreeMap<Metric, f64>;

/// device -> interface -> metric -> value.
pub type StatisticsTree = BTreeMap<String, BTreeMap<String, InterfaceMetrics>>;

/// Flattened tree entry; persisted form of a StatisticsTree.
#[derive(Debug, Clone, PartialEq, SchemaRead, SchemaWrite)]
pub struct StatRow {
    pub device: String,
    pub interface: String,
    pub metric: Metric,
    pub value: f64,
}

pub fn tree_to_rows(tree: &StatisticsTree) -> Vec<StatRow> {
    let mut rows = Vec::new();
    for (device, interfaces) in tree {
        for (interface, metrics) in interfaces {
            for (metric, value) in metrics {
                rows.push(StatRow {
                    device: device.clone(),
                    interface: interface.clone(),
                    metric: *metric,
                    value: *value,
                });
            }
        }
    }
    rows
}

/// Later rows win on duplicate keys.
pub fn rows_to_tree(rows: Vec<StatRow>) -> StatisticsTree {
    let mut tree = StatisticsTree::new();
    for row in rows {
        tree.entry(row.device)
            .or_default()
            .entry(row.interface)
            .or_default()
            .insert(row.metric, row.value);
    }
    tree
}

/// GET .../state response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotStatistics {
    pub network: String,
    pub snapshot: String,
    pub state: StatisticsTree,
}
