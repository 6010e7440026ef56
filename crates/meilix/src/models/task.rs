//! ⏳ Tasks: the receipts Meilisearch hands out for every write.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 🚦 Where a task is in its short, asynchronous life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Enqueued,
    Processing,
    Succeeded,
    Failed,
    Canceled,
}

impl TaskStatus {
    /// 🔤 The wire spelling, used in query strings.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Enqueued => "enqueued",
            TaskStatus::Processing => "processing",
            TaskStatus::Succeeded => "succeeded",
            TaskStatus::Failed => "failed",
            TaskStatus::Canceled => "canceled",
        }
    }

    /// 🏁 The statuses that end a wait. Canceled is not one of them: a wait on a canceled
    /// task keeps polling until its timeout runs out.
    pub fn ends_wait(self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::Failed)
    }

    /// ⚰️ True once the task will never change again.
    pub fn is_final(self) -> bool {
        matches!(
            self,
            TaskStatus::Succeeded | TaskStatus::Failed | TaskStatus::Canceled
        )
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 🏷️ Task type: usually a plain name like `documentAdditionOrUpdate`, sometimes richer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TaskType {
    Named(String),
    Detailed(Value),
}

impl std::fmt::Display for TaskType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskType::Named(name) => f.write_str(name),
            TaskType::Detailed(detail) => write!(f, "{detail}"),
        }
    }
}

/// 📋 The full record of a task, as returned by `GET /tasks/{uid}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
    pub uid: u64,
    pub index_uid: Option<String>,
    pub status: TaskStatus,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub details: Option<Value>,
    pub error: Option<Value>,
    pub canceled_by: Option<u64>,
    pub duration: Option<String>,
    pub enqueued_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub batch_uid: Option<u64>,
}

/// 🧾 The short receipt returned by every enqueuing call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInfo {
    pub task_uid: u64,
    pub index_uid: Option<String>,
    pub status: TaskStatus,
    #[serde(rename = "type")]
    pub task_type: TaskType,
    pub enqueued_at: DateTime<Utc>,
    #[serde(default)]
    pub batch_uid: Option<u64>,
}

/// 📚 One page of `GET /tasks`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskPage {
    pub results: Vec<TaskResult>,
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
    fn the_one_where_a_task_arrives_with_nanoseconds_and_we_dont_flinch() {
        let raw = r#"{
            "uid": 12,
            "indexUid": "movies",
            "status": "succeeded",
            "type": "documentAdditionOrUpdate",
            "details": {"receivedDocuments": 2, "indexedDocuments": 2},
            "error": null,
            "canceledBy": null,
            "duration": "PT0.01S",
            "enqueuedAt": "2024-05-01T10:00:00.123456789Z",
            "startedAt": "2024-05-01T10:00:00.2Z",
            "finishedAt": "2024-05-01T10:00:01Z",
            "batchUid": 3
        }"#;

        let task: TaskResult = serde_json::from_str(raw).expect("💀 task should parse");
        assert_eq!(task.uid, 12);
        assert_eq!(task.status, TaskStatus::Succeeded);
        assert_eq!(task.task_type.to_string(), "documentAdditionOrUpdate");
        assert_eq!(task.batch_uid, Some(3));
        assert!(task.finished_at.is_some());
    }

    #[test]
    fn the_one_where_canceled_is_final_but_does_not_end_the_wait() {
        assert!(TaskStatus::Canceled.is_final());
        assert!(!TaskStatus::Canceled.ends_wait());
        assert!(TaskStatus::Failed.ends_wait());
        assert!(!TaskStatus::Processing.is_final());
        assert_eq!(TaskStatus::Enqueued.to_string(), "enqueued");
    }
}
