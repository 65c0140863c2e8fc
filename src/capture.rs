// Metric capture for a closed sampling interval: query every series, filter rows, build the tree.

use futures_util::future::try_join_all;
use tracing::{debug, instrument, warn};

use crate::error::{ConductorError, Result};
use crate::gateway::{CaptureWindow, GatewayRow, MetricsGateway};
use crate::models::{Metric, StatisticsTree};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterfacePattern {
    Prefix(&'static str),
    Exact(&'static str),
}

impl InterfacePattern {
    pub fn matches(&self, interface: &str) -> bool {
        match self {
            InterfacePattern::Prefix(p) => interface.starts_with(p),
            InterfacePattern::Exact(e) => interface == *e,
        }
    }
}

/// Virtual, tunnel and management interfaces; never part of a capture.
pub const INTERFACE_DENYLIST: &[InterfacePattern] = &[
    InterfacePattern::Prefix("erspan"),
    // gre0, gretap0
    InterfacePattern::Prefix("gre"),
    InterfacePattern::Prefix("ip6tnl"),
    // loopback-switch
    InterfacePattern::Prefix("lsi"),
    InterfacePattern::Prefix("sit"),
    InterfacePattern::Prefix("tunl"),
    InterfacePattern::Prefix("irb"),
    InterfacePattern::Exact("eth0"),
];

pub fn is_denylisted(interface: &str) -> bool {
    INTERFACE_DENYLIST.iter().any(|p| p.matches(interface))
}

/// Applies the row filters in order (interface label, denylist, device label, finite numeric value)
/// and inserts the survivors under `metric`. Last write wins on duplicates.
pub fn insert_rows(tree: &mut StatisticsTree, metric: Metric, rows: Vec<GatewayRow>) {
    for row in rows {
        let Some(interface) = row.interface else {
            continue;
        };
        if is_denylisted(&interface) {
            debug!(%interface, metric = metric.name(), "skipping denylisted interface");
            continue;
        }
        let Some(device) = row.device else {
            continue;
        };
        let value: f64 = match row.value.trim().parse() {
            Ok(v) => v,
            Err(e) => {
                warn!(%device, %interface, value = %row.value, error = %e, "unparsable metric value");
                continue;
            }
        };
        if !value.is_finite() {
            warn!(%device, %interface, value = %row.value, "non-finite metric value");
            continue;
        }
        tree.entry(device)
            .or_default()
            .entry(interface)
            .or_default()
            .insert(metric, value);
    }
}

/// Queries all metric series for `window`. Any failing series fails the whole capture.
#[instrument(skip(gateway), fields(operation = "capture_statistics", duration_secs = window.duration_secs()))]
pub async fn capture_statistics(
    gateway: &dyn MetricsGateway,
    window: CaptureWindow,
) -> Result<StatisticsTree> {
    let results = try_join_all(Metric::ALL.iter().map(|&metric| async move {
        gateway
            .query_metric(metric, window)
            .await
            .map(|rows| (metric, rows))
            .map_err(|e| match e {
                ConductorError::Gateway(msg) => {
                    ConductorError::Gateway(format!("{}: {}", metric.name(), msg))
                }
                other => ConductorError::Gateway(format!("{}: {}", metric.name(), other)),
            })
    }))
    .await?;

    let mut tree = StatisticsTree::new();
    for (metric, rows) in results {
        insert_rows(&mut tree, metric, rows);
    }
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(device: Option<&str>, interface: Option<&str>, value: &str) -> GatewayRow {
        GatewayRow {
            device: device.map(str::to_string),
            interface: interface.map(str::to_string),
            value: value.to_string(),
        }
    }

    #[test]
    fn denylist_matches_virtual_interfaces() {
        for name in [
            "erspan0", "gre0", "gretap0", "ip6tnl0", "lsi", "sit0", "tunl0", "irb.100", "eth0",
        ] {
            assert!(is_denylisted(name), "{name}");
        }
        for name in ["eth1", "eth00", "ge-0/0/0", "Ethernet1", "xe-0/0/1.0"] {
            assert!(!is_denylisted(name), "{name}");
        }
    }

    #[test]
    fn insert_rows_filters_in_order() {
        let mut tree = StatisticsTree::new();
        insert_rows(
            &mut tree,
            Metric::RxBpsAvg,
            vec![
                row(Some("leaf1"), Some("eth1"), "100.0"),
                row(Some("leaf1"), None, "1"),
                row(Some("leaf1"), Some("gre0"), "2"),
                row(None, Some("eth2"), "3"),
                row(Some("leaf1"), Some("eth3"), "n/a"),
            ],
        );
        assert_eq!(tree.len(), 1);
        assert_eq!(tree["leaf1"].len(), 1);
        assert_eq!(tree["leaf1"]["eth1"][&Metric::RxBpsAvg], 100.0);
    }

    #[test]
    fn denylisted_interface_never_appears_with_any_metric() {
        let mut tree = StatisticsTree::new();
        for metric in Metric::ALL {
            insert_rows(
                &mut tree,
                metric,
                vec![
                    row(Some("spine1"), Some("tunl0"), "5"),
                    row(Some("spine1"), Some("eth2"), "5"),
                ],
            );
        }
        assert!(!tree["spine1"].contains_key("tunl0"));
        assert_eq!(tree["spine1"]["eth2"].len(), Metric::ALL.len());
    }

    #[test]
    fn non_finite_values_are_dropped() {
        let mut tree = StatisticsTree::new();
        insert_rows(
            &mut tree,
            Metric::RxBpsMax,
            vec![
                row(Some("d"), Some("eth1"), "NaN"),
                row(Some("d"), Some("eth2"), "+Inf"),
                row(Some("d"), Some("eth3"), "-Inf"),
                row(Some("d"), Some("eth4"), "0"),
            ],
        );
        assert_eq!(tree["d"].len(), 1);
        assert_eq!(tree["d"]["eth4"][&Metric::RxBpsMax], 0.0);
    }

    #[test]
    fn duplicate_rows_last_write_wins() {
        let mut tree = StatisticsTree::new();
        insert_rows(
            &mut tree,
            Metric::TxBpsMax,
            vec![
                row(Some("d"), Some("eth1"), "1"),
                row(Some("d"), Some("eth1"), "9"),
            ],
        );
        assert_eq!(tree["d"]["eth1"][&Metric::TxBpsMax], 9.0);
    }
}
