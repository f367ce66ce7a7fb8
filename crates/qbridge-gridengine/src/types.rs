//! Grid Engine job and topology types.

use chrono::{DateTime, Utc};
use qbridge_state::QueueLimits;
use serde::Serialize;
use std::collections::BTreeMap;

/// One job entry of a `qstat -xml` listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobStatusRecord {
    /// Scheduler job ID (`JB_job_number`)
    #[serde(rename = "WMSID")]
    pub wms_id: String,

    /// Literal state flags (`state`), e.g. "qw" or "Eqw"
    #[serde(rename = "RAW_STATUS")]
    pub raw_status: String,

    /// Queue part of `queue_name`
    #[serde(rename = "QUEUE", skip_serializing_if = "Option::is_none")]
    pub queue: Option<String>,

    /// Host part of `queue_name`
    #[serde(rename = "WN", skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,

    /// Every other element of the entry, by tag name
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
}

impl JobStatusRecord {
    /// Look up a value by its record key (`WMSID`, `RAW_STATUS`, `QUEUE`,
    /// `WN`) or by its original qstat tag name.
    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            "WMSID" => Some(&self.wms_id),
            "RAW_STATUS" => Some(&self.raw_status),
            "QUEUE" => self.queue.as_deref(),
            "WN" => self.node.as_deref(),
            other => self.fields.get(other).map(String::as_str),
        }
    }
}

/// Snapshot of the cluster layout.
#[derive(Debug, Clone, Serialize)]
pub struct Topology {
    /// Queue name to configured limits
    pub queues: BTreeMap<String, QueueLimits>,

    /// Host groups and their hosts, None when nothing was found
    pub nodes: Option<Vec<String>>,

    /// When the snapshot was taken
    pub discovered_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use qbridge_state::RequirementKind;
    use serde_json::{Value, json};

    fn record(queue: Option<(&str, &str)>) -> JobStatusRecord {
        let mut fields = BTreeMap::new();
        fields.insert("JB_owner".to_string(), "alice".to_string());
        fields.insert("slots".to_string(), "1".to_string());
        if let Some((queue, host)) = queue {
            fields.insert("queue_name".to_string(), format!("{}@{}", queue, host));
        }
        JobStatusRecord {
            wms_id: "42".to_string(),
            raw_status: "r".to_string(),
            queue: queue.map(|(q, _)| q.to_string()),
            node: queue.map(|(_, h)| h.to_string()),
            fields,
        }
    }

    #[test]
    fn test_record_json_keys() {
        let value = serde_json::to_value(record(Some(("all.q", "node01")))).unwrap();
        assert_eq!(
            value,
            json!({
                "WMSID": "42",
                "RAW_STATUS": "r",
                "QUEUE": "all.q",
                "WN": "node01",
                "JB_owner": "alice",
                "slots": "1",
                "queue_name": "all.q@node01",
            })
        );
    }

    #[test]
    fn test_record_json_without_queue() {
        let value = serde_json::to_value(record(None)).unwrap();
        let Value::Object(map) = value else {
            panic!("expected object");
        };
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(keys.len(), 4);
        for key in ["WMSID", "RAW_STATUS", "JB_owner", "slots"] {
            assert!(keys.contains(&key), "missing {}", key);
        }
        assert!(!map.contains_key("QUEUE"));
        assert!(!map.contains_key("WN"));
    }

    #[test]
    fn test_record_get() {
        let job = record(Some(("all.q", "node01")));
        assert_eq!(job.get("WMSID"), Some("42"));
        assert_eq!(job.get("WN"), Some("node01"));
        assert_eq!(job.get("JB_owner"), Some("alice"));
        assert_eq!(record(None).get("QUEUE"), None);
    }

    #[test]
    fn test_topology_json() {
        let mut limits = QueueLimits::new();
        limits.insert(RequirementKind::Memory, 4096);
        let mut queues = BTreeMap::new();
        queues.insert("all.q".to_string(), limits);
        let topology = Topology {
            queues,
            nodes: None,
            discovered_at: "2024-03-01T12:00:00Z".parse().unwrap(),
        };

        let value = serde_json::to_value(&topology).unwrap();
        assert_eq!(value["queues"]["all.q"]["MEMORY"], json!(4096));
        assert_eq!(value["nodes"], Value::Null);
        assert_eq!(value["discovered_at"], json!("2024-03-01T12:00:00Z"));
    }
}
