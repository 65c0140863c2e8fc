// BLOB codec for statistics trees. [version: u8][wincode Vec<StatRow>].

use crate::error::{ConductorError, Result};
use crate::models::StatRow;

pub(super) const BLOB_VERSION: u8 = 1;

pub(super) fn with_version_prefix(version: u8, payload: Vec<u8>) -> Vec<u8> {
    let mut out = Vec::with_capacity(1 + payload.len());
    out.push(version);
    out.extend_from_slice(&payload);
    out
}

pub(super) fn encode_rows(rows: Vec<StatRow>) -> Result<Vec<u8>> {
    let payload = wincode::serialize(&rows)
        .map_err(|e| ConductorError::Storage(format!("wincode encode statistics: {}", e)))?;
    Ok(with_version_prefix(BLOB_VERSION, payload))
}

pub(super) fn decode_rows(bytes: &[u8]) -> Result<Vec<StatRow>> {
    match bytes.split_first() {
        Some((&BLOB_VERSION, payload)) => wincode::deserialize(payload)
            .map_err(|e| ConductorError::Storage(format!("wincode decode statistics: {}", e))),
        Some((v, _)) => Err(ConductorError::Storage(format!(
            "unsupported statistics blob version {}",
            v
        ))),
        None => Err(ConductorError::Storage("empty statistics blob".into())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Metric;

    #[test]
    fn prefix_is_prepended() {
        assert_eq!(with_version_prefix(7, vec![1, 2]), vec![7, 1, 2]);
    }

    #[test]
    fn rows_survive_encoding() {
        let rows = vec![
            StatRow {
                device: "leaf1".into(),
                interface: "eth1".into(),
                metric: Metric::RxBpsAvg,
                value: 100.0,
            },
            StatRow {
                device: "spine1".into(),
                interface: "Ethernet1/1".into(),
                metric: Metric::TxBpsMin,
                value: 0.5,
            },
        ];
        let blob = encode_rows(rows.clone()).unwrap();
        assert_eq!(blob[0], BLOB_VERSION);
        assert_eq!(decode_rows(&blob).unwrap(), rows);
    }

    #[test]
    fn unknown_version_and_empty_are_rejected() {
        assert!(matches!(decode_rows(&[]), Err(ConductorError::Storage(_))));
        assert!(matches!(decode_rows(&[9, 0, 0]), Err(ConductorError::Storage(_))));
    }
}
