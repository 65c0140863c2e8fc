// Domain models: sampling markers/state, statistics trees, diff trees

mod diff;
mod sampling;
mod statistics;

pub use diff::{DiffFilter, DiffTree, MetricDiff, SnapshotDiff};
pub use sampling::{ActionOutcome, SamplingAction, SamplingRecord, SamplingState};
pub use statistics::{
    Direction, InterfaceMetrics, Metric, SnapshotStatistics, StatRow, StatisticsTree,
    rows_to_tree, tree_to_rows,
};
