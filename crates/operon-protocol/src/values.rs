//! Record payloads.
//!
//! These are the MessagePack-encoded bodies carried in the record envelope's
//! `value` field. Field names are part of the wire contract and follow the
//! camelCase convention of the envelope.

use serde::{Deserialize, Serialize};

use crate::intent::Intent;
use crate::record::{PartitionId, ValueType};

/// Payload of the `DeleteResource` command and its bracketing
/// `ResourceDeletion` events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDeletionRecord {
    /// Key of the process definition or decision requirements graph to
    /// delete.
    pub resource_key: i64,
}

/// Payload of `Process` lifecycle events.
///
/// Deletion events omit `checksum` and `resource` to bound event size; the
/// full payload appears only on deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRecord {
    pub bpmn_process_id: String,
    pub version: i32,
    pub key: i64,
    pub resource_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<Vec<u8>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<Vec<u8>>,
}

impl ProcessRecord {
    /// A copy with `checksum` and `resource` stripped, as emitted on
    /// deletion events.
    pub fn without_payload(&self) -> Self {
        Self {
            bpmn_process_id: self.bpmn_process_id.clone(),
            version: self.version,
            key: self.key,
            resource_name: self.resource_name.clone(),
            checksum: None,
            resource: None,
        }
    }
}

/// Payload of `Decision` lifecycle events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRecord {
    pub decision_id: String,
    pub decision_name: String,
    pub version: i32,
    pub decision_key: i64,
    /// Id of the decision requirements graph this decision belongs to.
    pub drg_id: String,
    /// Key of the decision requirements graph this decision belongs to.
    pub drg_key: i64,
}

/// Payload of `DecisionRequirements` lifecycle events. Carries the full
/// graph including the deployed resource and its checksum.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecisionRequirementsRecord {
    pub drg_id: String,
    pub drg_name: String,
    pub drg_version: i32,
    pub drg_key: i64,
    pub resource_name: String,
    pub checksum: Vec<u8>,
    pub resource: Vec<u8>,
}

/// Payload of `CommandDistribution` records.
///
/// On `DISTRIBUTING` events `partition_id` names the peer the copy is
/// scheduled for and `command_value` carries the wrapped command payload so
/// unacknowledged copies can be rebuilt after a restart. On `ACKNOWLEDGE`
/// commands and `ACKNOWLEDGED` events `partition_id` names the acknowledging
/// peer and `command_value` is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommandDistributionRecord {
    pub partition_id: PartitionId,
    pub value_type: ValueType,
    pub intent: Intent,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command_value: Vec<u8>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;

    #[test]
    fn process_record_roundtrips_with_payload() {
        let record = ProcessRecord {
            bpmn_process_id: "order-fulfilment".to_string(),
            version: 3,
            key: 0x0008_0000_0000_002a,
            resource_name: "order.bpmn".to_string(),
            checksum: Some(vec![0xde, 0xad]),
            resource: Some(b"<definitions/>".to_vec()),
        };

        let bytes = codec::encode(&record).unwrap();
        let decoded: ProcessRecord = codec::decode(&bytes).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn stripped_process_record_omits_optional_fields_on_the_wire() {
        let full = ProcessRecord {
            bpmn_process_id: "p".to_string(),
            version: 1,
            key: 100,
            resource_name: "p.bpmn".to_string(),
            checksum: Some(vec![1]),
            resource: Some(vec![2]),
        };
        let stripped = full.without_payload();
        assert_eq!(stripped.checksum, None);
        assert_eq!(stripped.resource, None);

        // The omitted fields must not appear in the encoding at all.
        let bytes = codec::encode(&stripped).unwrap();
        assert!(codec::encode(&full).unwrap().len() > bytes.len());
        let decoded: ProcessRecord = codec::decode(&bytes).unwrap();
        assert_eq!(decoded, stripped);
    }

    #[test]
    fn decision_and_drg_records_roundtrip() {
        let decision = DecisionRecord {
            decision_id: "approve".to_string(),
            decision_name: "Approve order".to_string(),
            version: 2,
            decision_key: 70,
            drg_id: "orders".to_string(),
            drg_key: 7,
        };
        let bytes = codec::encode(&decision).unwrap();
        assert_eq!(codec::decode::<DecisionRecord>(&bytes).unwrap(), decision);

        let drg = DecisionRequirementsRecord {
            drg_id: "orders".to_string(),
            drg_name: "Order decisions".to_string(),
            drg_version: 1,
            drg_key: 7,
            resource_name: "orders.dmn".to_string(),
            checksum: vec![9, 9],
            resource: b"<drd/>".to_vec(),
        };
        let bytes = codec::encode(&drg).unwrap();
        assert_eq!(
            codec::decode::<DecisionRequirementsRecord>(&bytes).unwrap(),
            drg
        );
    }

    #[test]
    fn decode_rejects_garbage() {
        // A MessagePack string where a record map is expected.
        let garbage = [0xa1, 0x78];
        assert!(codec::decode::<ResourceDeletionRecord>(&garbage).is_err());
    }
}
