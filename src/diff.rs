// Diff engine: compares two statistics trees per device/interface/metric.
// Unscaled mode compares a snapshot against the fixed baseline snapshot; scaled mode compares
// two arbitrary snapshots and divides the counter by the usecase traffic scale.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::error::{ConductorError, Result};
use crate::gateway::UsecaseParams;
use crate::models::{DiffFilter, DiffTree, MetricDiff, SnapshotDiff, StatisticsTree};
use crate::store::SamplingRepo;

fn finite(v: f64) -> Option<f64> {
    v.is_finite().then_some(v)
}

/// counter = (value - reference) / scale; ratio = value / reference, null when reference is 0.
pub fn metric_diff(reference: f64, value: f64, scale: f64) -> MetricDiff {
    MetricDiff {
        counter: finite((value - reference) / scale),
        ratio: if reference == 0.0 {
            None
        } else {
            finite(value / reference)
        },
    }
}

/// Walks `target` devices, interfaces and metrics. Pairs missing on the reference side are
/// skipped; a metric missing on the reference side maps to `None`.
pub fn compare(
    reference: &StatisticsTree,
    target: &StatisticsTree,
    filter: &DiffFilter,
    scale: f64,
) -> DiffTree {
    let mut diff = DiffTree::new();
    for (device, interfaces) in target {
        if !filter.accepts_device(device) {
            continue;
        }
        let Some(reference_interfaces) = reference.get(device) else {
            debug!(%device, "device missing on reference side, skipping");
            continue;
        };
        for (interface, metrics) in interfaces {
            if !filter.accepts_interface(interface) {
                continue;
            }
            let Some(reference_metrics) = reference_interfaces.get(interface) else {
                debug!(%device, %interface, "interface missing on reference side, skipping");
                continue;
            };
            let entry = metrics
                .iter()
                .map(|(metric, value)| {
                    let d = reference_metrics
                        .get(metric)
                        .map(|r| metric_diff(*r, *value, scale));
                    (*metric, d)
                })
                .collect();
            diff.entry(device.clone())
                .or_default()
                .insert(interface.clone(), entry);
        }
    }
    diff
}

/// sample - baseline, ratio sample / baseline.
pub fn diff_against_baseline(baseline: &StatisticsTree, sample: &StatisticsTree) -> DiffTree {
    compare(baseline, sample, &DiffFilter::default(), 1.0)
}

/// (destination - source) / scale, ratio destination / source, restricted by `filter`.
pub fn diff_scaled(
    source: &StatisticsTree,
    destination: &StatisticsTree,
    scale: f64,
    filter: &DiffFilter,
) -> Result<DiffTree> {
    if !(scale.is_finite() && scale > 0.0) {
        return Err(ConductorError::Validation(format!(
            "traffic scale must be > 0, got {}",
            scale
        )));
    }
    Ok(compare(source, destination, filter, scale))
}

/// Loads stored snapshots and runs either diff mode.
pub struct DiffEngine {
    repo: Arc<SamplingRepo>,
    usecase: Arc<dyn UsecaseParams>,
    baseline_snapshot: String,
}

impl DiffEngine {
    pub fn new(
        repo: Arc<SamplingRepo>,
        usecase: Arc<dyn UsecaseParams>,
        baseline_snapshot: String,
    ) -> Self {
        Self {
            repo,
            usecase,
            baseline_snapshot,
        }
    }

    pub fn baseline_snapshot(&self) -> &str {
        &self.baseline_snapshot
    }

    #[instrument(skip(self), fields(operation = "diff_to_baseline"))]
    pub async fn diff_to_baseline(&self, network: &str, snapshot: &str) -> Result<SnapshotDiff> {
        let baseline = self
            .repo
            .load_statistics(network, &self.baseline_snapshot)
            .await?;
        let sample = self.repo.load_statistics(network, snapshot).await?;
        Ok(SnapshotDiff {
            network: network.to_string(),
            source_snapshot: self.baseline_snapshot.clone(),
            destination_snapshot: snapshot.to_string(),
            diff: diff_against_baseline(&baseline, &sample),
        })
    }

    #[instrument(skip(self), fields(operation = "diff_scaled"))]
    pub async fn diff_scaled(
        &self,
        usecase: &str,
        network: &str,
        source: &str,
        destination: &str,
        filter: &DiffFilter,
    ) -> Result<SnapshotDiff> {
        let source_tree = self.repo.load_statistics(network, source).await?;
        let destination_tree = self.repo.load_statistics(network, destination).await?;
        let scale = self.usecase.traffic_scale(usecase, network).await?;
        if !(scale.is_finite() && scale > 0.0) {
            return Err(ConductorError::Gateway(format!(
                "usecase parameters for {}/{} carry invalid traffic scale {}",
                usecase, network, scale
            )));
        }
        debug!(scale, "traffic scale resolved");
        Ok(SnapshotDiff {
            network: network.to_string(),
            source_snapshot: source.to_string(),
            destination_snapshot: destination.to_string(),
            diff: diff_scaled(&source_tree, &destination_tree, scale, filter)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Metric;

    fn tree(entries: &[(&str, &str, Metric, f64)]) -> StatisticsTree {
        let mut t = StatisticsTree::new();
        for (d, i, m, v) in entries {
            t.entry(d.to_string())
                .or_default()
                .entry(i.to_string())
                .or_default()
                .insert(*m, *v);
        }
        t
    }

    #[test]
    fn baseline_diff_counter_and_ratio() {
        let baseline = tree(&[("leaf1", "eth1", Metric::RxBpsAvg, 50.0)]);
        let sample = tree(&[("leaf1", "eth1", Metric::RxBpsAvg, 100.0)]);
        let diff = diff_against_baseline(&baseline, &sample);
        let d = diff["leaf1"]["eth1"][&Metric::RxBpsAvg].unwrap();
        assert_eq!(d.counter, Some(50.0));
        assert_eq!(d.ratio, Some(2.0));
    }

    #[test]
    fn scaled_diff_divides_counter_only() {
        let source = tree(&[("leaf1", "eth1", Metric::TxBpsMax, 50.0)]);
        let destination = tree(&[("leaf1", "eth1", Metric::TxBpsMax, 150.0)]);
        let diff = diff_scaled(&source, &destination, 2.0, &DiffFilter::default()).unwrap();
        let d = diff["leaf1"]["eth1"][&Metric::TxBpsMax].unwrap();
        assert_eq!(d.counter, Some(50.0));
        assert_eq!(d.ratio, Some(3.0));
    }

    #[test]
    fn zero_reference_gives_null_ratio() {
        let reference = tree(&[("d", "i", Metric::RxBpsMin, 0.0)]);
        let target = tree(&[("d", "i", Metric::RxBpsMin, 12.0)]);
        let d = diff_against_baseline(&reference, &target)["d"]["i"][&Metric::RxBpsMin].unwrap();
        assert_eq!(d.ratio, None);
        assert_eq!(d.counter, Some(12.0));

        let d = metric_diff(-0.0, 4.0, 2.0);
        assert_eq!(d.ratio, None);
        assert_eq!(d.counter, Some(2.0));
    }

    #[test]
    fn metric_missing_on_reference_is_null_entry() {
        let reference = tree(&[("d", "i", Metric::RxBpsAvg, 1.0)]);
        let target = tree(&[
            ("d", "i", Metric::RxBpsAvg, 2.0),
            ("d", "i", Metric::TxBpsAvg, 3.0),
        ]);
        let diff = diff_against_baseline(&reference, &target);
        let metrics = &diff["d"]["i"];
        assert!(metrics[&Metric::RxBpsAvg].is_some());
        assert_eq!(metrics[&Metric::TxBpsAvg], None);
        let json = serde_json::to_value(&diff).unwrap();
        assert!(json["d"]["i"]["TX_BPS_AVG"].is_null());
        assert_eq!(json["d"]["i"]["RX_BPS_AVG"]["ratio"], 2.0);
    }

    #[test]
    fn one_sided_devices_and_interfaces_are_skipped() {
        let reference = tree(&[
            ("leaf1", "eth1", Metric::RxBpsAvg, 1.0),
            ("leaf2", "eth1", Metric::RxBpsAvg, 1.0),
        ]);
        let target = tree(&[
            ("leaf1", "eth1", Metric::RxBpsAvg, 2.0),
            ("leaf1", "eth9", Metric::RxBpsAvg, 2.0),
            ("leaf3", "eth1", Metric::RxBpsAvg, 2.0),
        ]);
        let diff = diff_against_baseline(&reference, &target);
        assert_eq!(diff.len(), 1);
        assert_eq!(diff["leaf1"].len(), 1);
        assert!(diff["leaf1"].contains_key("eth1"));
    }

    #[test]
    fn no_overlap_is_empty_diff() {
        let reference = tree(&[("a", "x", Metric::RxBpsAvg, 1.0)]);
        let target = tree(&[("b", "y", Metric::RxBpsAvg, 1.0)]);
        assert!(diff_against_baseline(&reference, &target).is_empty());
        assert!(diff_against_baseline(&StatisticsTree::new(), &StatisticsTree::new()).is_empty());
    }

    #[test]
    fn filters_restrict_walk() {
        let both = tree(&[
            ("leaf1", "eth1", Metric::RxBpsAvg, 1.0),
            ("leaf1", "eth2", Metric::RxBpsAvg, 1.0),
            ("leaf2", "eth1", Metric::RxBpsAvg, 1.0),
        ]);
        let filter = DiffFilter {
            node: Some("leaf1".into()),
            interface: None,
        };
        let diff = diff_scaled(&both, &both, 1.0, &filter).unwrap();
        assert_eq!(diff.len(), 1);
        assert_eq!(diff["leaf1"].len(), 2);

        let filter = DiffFilter {
            node: None,
            interface: Some("eth1".into()),
        };
        let diff = diff_scaled(&both, &both, 1.0, &filter).unwrap();
        assert_eq!(diff.len(), 2);
        assert!(diff.values().all(|i| i.len() == 1 && i.contains_key("eth1")));
    }

    #[test]
    fn non_positive_scale_is_rejected() {
        let t = StatisticsTree::new();
        for scale in [0.0, -1.0, f64::NAN] {
            assert!(matches!(
                diff_scaled(&t, &t, scale, &DiffFilter::default()),
                Err(ConductorError::Validation(_))
            ));
        }
    }
}
