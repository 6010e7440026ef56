//! 📦 Batches: the server's own grouping of tasks it processed together.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchStatusCounts {
    pub succeeded: Option<u64>,
    pub failed: Option<u64>,
    #[serde(alias = "cancelled")]
    pub canceled: Option<u64>,
    pub processing: Option<u64>,
    pub enqueued: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchStats {
    pub total_nb_tasks: u64,
    #[serde(default)]
    pub status: BatchStatusCounts,
    #[serde(rename = "types")]
    pub batch_types: Option<Value>,
    pub index_uids: Option<Value>,
    pub progress_trace: Option<Value>,
    pub write_channel_congestion: Option<Value>,
    pub internal_database_sizes: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResult {
    pub uid: u64,
    pub details: Option<Value>,
    pub progress: Option<Value>,
    pub stats: BatchStats,
    pub duration: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// 📚 One page of `GET /batches`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPage {
    pub results: Vec<BatchResult>,
    #[serde(default)]
    pub total: u64,
    pub limit: u32,
    pub from: Option<u64>,
    pub next: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_cancelled_has_two_ls_and_we_forgive_it() {
        let raw = r#"{
            "uid": 1,
            "details": {},
            "progress": null,
            "stats": {"totalNbTasks": 3, "status": {"succeeded": 2, "cancelled": 1}, "types": {}, "indexUids": {}},
            "duration": "PT1S",
            "startedAt": "2024-05-01T10:00:00Z",
            "finishedAt": null
        }"#;

        let batch: BatchResult = serde_json::from_str(raw).expect("💀 batch should parse");
        assert_eq!(batch.stats.total_nb_tasks, 3);
        assert_eq!(batch.stats.status.canceled, Some(1));
        assert!(batch.finished_at.is_none());
    }
}
