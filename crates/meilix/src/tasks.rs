//! ⏳ Tasks: waiting on them, listing them, canceling them, deleting them.
//!
//! 🧠 Every write to Meilisearch returns a task receipt and does the work later.
//! [`wait_for_task`] turns that receipt back into an answer by polling `GET /tasks/{uid}`
//! until the status says succeeded or failed, or until the deadline says stop.
//!
//! 🔗 The filter helpers share one encoding: list values comma-joined, timestamps as
//! ISO-8601 with a `Z` suffix, every value percent-encoded.

use std::time::{Duration, Instant};

use chrono::{NaiveDateTime, Timelike};
use reqwest::Method;
use tracing::{debug, info, trace, warn};

use crate::errors::{MeilixError, Result};
use crate::http::{HttpRequests, with_query};
use crate::models::task::{TaskInfo, TaskPage, TaskResult, TaskStatus};

pub const DEFAULT_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_INTERVAL_MS: u64 = 50;

const CANCEL_DEFAULT_STATUSES: [TaskStatus; 2] = [TaskStatus::Enqueued, TaskStatus::Processing];
const DELETE_DEFAULT_STATUSES: [TaskStatus; 5] = [
    TaskStatus::Canceled,
    TaskStatus::Enqueued,
    TaskStatus::Failed,
    TaskStatus::Processing,
    TaskStatus::Succeeded,
];

/// ⏱️ How to wait for a task.
///
/// `timeout: None` waits forever, and so does a zero timeout. The defaults (5000 ms, 50 ms, no raise) are shared by the
/// async and blocking clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    pub timeout: Option<Duration>,
    pub interval: Duration,
    pub raise_for_status: bool,
}

impl Default for WaitOptions {
    fn default() -> Self {
        WaitOptions {
            timeout: Some(Duration::from_millis(DEFAULT_TIMEOUT_MS)),
            interval: Duration::from_millis(DEFAULT_INTERVAL_MS),
            raise_for_status: false,
        }
    }
}

impl WaitOptions {
    pub fn new() -> Self {
        WaitOptions::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// ♾️ Patience of a saint.
    pub fn without_timeout(mut self) -> Self {
        self.timeout = None;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn raise_for_status(mut self, raise: bool) -> Self {
        self.raise_for_status = raise;
        self
    }
}

/// 🔎 Which tasks a list/cancel/delete call applies to. Empty dimensions are left out.
///
/// Timestamps are interpreted as UTC. Pass `datetime.naive_utc()` if you hold a
/// `DateTime<Utc>`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilter {
    pub uids: Vec<u64>,
    pub batch_uids: Vec<u64>,
    pub index_uids: Vec<String>,
    pub statuses: Vec<TaskStatus>,
    pub types: Vec<String>,
    pub before_enqueued_at: Option<NaiveDateTime>,
    pub after_enqueued_at: Option<NaiveDateTime>,
    pub before_started_at: Option<NaiveDateTime>,
    pub after_finished_at: Option<NaiveDateTime>,
}

impl TaskFilter {
    pub fn new() -> Self {
        TaskFilter::default()
    }

    pub fn with_uids(mut self, uids: impl IntoIterator<Item = u64>) -> Self {
        self.uids = uids.into_iter().collect();
        self
    }

    pub fn with_batch_uids(mut self, batch_uids: impl IntoIterator<Item = u64>) -> Self {
        self.batch_uids = batch_uids.into_iter().collect();
        self
    }

    pub fn with_index_uids<S: Into<String>>(mut self, index_uids: impl IntoIterator<Item = S>) -> Self {
        self.index_uids = index_uids.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = TaskStatus>) -> Self {
        self.statuses = statuses.into_iter().collect();
        self
    }

    pub fn with_types<S: Into<String>>(mut self, types: impl IntoIterator<Item = S>) -> Self {
        self.types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn before_enqueued_at(mut self, at: NaiveDateTime) -> Self {
        self.before_enqueued_at = Some(at);
        self
    }

    pub fn after_enqueued_at(mut self, at: NaiveDateTime) -> Self {
        self.after_enqueued_at = Some(at);
        self
    }

    pub fn before_started_at(mut self, at: NaiveDateTime) -> Self {
        self.before_started_at = Some(at);
        self
    }

    pub fn after_finished_at(mut self, at: NaiveDateTime) -> Self {
        self.after_finished_at = Some(at);
        self
    }

    /// 🔗 Query pairs in a fixed order, values not yet percent-encoded.
    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        push_joined(&mut pairs, "uids", self.uids.iter().map(u64::to_string));
        push_joined(&mut pairs, "batchUids", self.batch_uids.iter().map(u64::to_string));
        push_joined(&mut pairs, "indexUids", self.index_uids.iter().cloned());
        push_joined(
            &mut pairs,
            "statuses",
            self.statuses.iter().map(|status| status.as_str().to_string()),
        );
        push_joined(&mut pairs, "types", self.types.iter().cloned());

        let timestamps = [
            ("beforeEnqueuedAt", self.before_enqueued_at),
            ("afterEnqueuedAt", self.after_enqueued_at),
            ("beforeStartedAt", self.before_started_at),
            ("afterFinishedAt", self.after_finished_at),
        ];
        for (key, at) in timestamps {
            if let Some(at) = at {
                pairs.push((key, format_timestamp(&at)));
            }
        }
        pairs
    }
}

fn push_joined(
    pairs: &mut Vec<(&'static str, String)>,
    key: &'static str,
    values: impl Iterator<Item = String>,
) {
    let joined = values.collect::<Vec<_>>().join(",");
    if !joined.is_empty() {
        pairs.push((key, joined));
    }
}

/// 🕰️ `2024-01-01T00:00:00Z`, with microseconds only when there are any.
pub(crate) fn format_timestamp(at: &NaiveDateTime) -> String {
    if at.nanosecond() == 0 {
        format!("{}Z", at.format("%Y-%m-%dT%H:%M:%S"))
    } else {
        format!("{}Z", at.format("%Y-%m-%dT%H:%M:%S%.6f"))
    }
}

/// 📖 Pagination for list calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Page {
    pub limit: Option<u32>,
    pub from: Option<u64>,
    pub reverse: Option<bool>,
}

impl Page {
    pub fn new() -> Self {
        Page::default()
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn starting_from(mut self, from: u64) -> Self {
        self.from = Some(from);
        self
    }

    pub fn reversed(mut self, reverse: bool) -> Self {
        self.reverse = Some(reverse);
        self
    }

    pub(crate) fn push_pairs(&self, pairs: &mut Vec<(&'static str, String)>) {
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        if let Some(from) = self.from {
            pairs.push(("from", from.to_string()));
        }
        if let Some(reverse) = self.reverse {
            pairs.push(("reverse", reverse.to_string()));
        }
    }
}

/// 🎯 Substitute a default status set when the caller narrowed nothing.
fn pairs_or_default_statuses(filter: &TaskFilter, defaults: &[TaskStatus]) -> Vec<(&'static str, String)> {
    let pairs = filter.to_query_pairs();
    if !pairs.is_empty() {
        return pairs;
    }
    let statuses = defaults
        .iter()
        .map(|status| status.as_str())
        .collect::<Vec<_>>()
        .join(",");
    warn!("🛟 no filter given, falling back to statuses={}", statuses);
    vec![("statuses", statuses)]
}

/// ⏳ Poll `GET /tasks/{uid}` until the task succeeds or fails.
///
/// Each round: fetch, stop on succeeded/failed, sleep `interval`, then check the clock.
/// A canceled task keeps being polled until the timeout fires. With `raise_for_status`,
/// a failed task becomes [`MeilixError::TaskFailed`] instead of an `Ok`.
pub(crate) async fn wait_for_task(
    http: &HttpRequests,
    task_uid: u64,
    options: &WaitOptions,
) -> Result<TaskResult> {
    if options.interval.is_zero() {
        return Err(MeilixError::Validation(
            "poll interval must be greater than zero".to_string(),
        ));
    }

    let path = format!("tasks/{task_uid}");
    let started = Instant::now();
    let mut polls: u64 = 0;

    loop {
        let task: TaskResult = http.get(&path).await?;
        polls += 1;
        trace!("⏳ task {} is {} after {} poll(s)", task_uid, task.status, polls);

        if task.status.ends_wait() {
            if options.raise_for_status && task.status == TaskStatus::Failed {
                debug!("🔥 task {} failed and the caller asked us to make a scene", task_uid);
                return Err(MeilixError::TaskFailed {
                    task_uid,
                    result: Box::new(task),
                });
            }
            info!(
                "✅ task {} resolved as {} after {} poll(s) in {:?}",
                task_uid,
                task.status,
                polls,
                started.elapsed()
            );
            return Ok(task);
        }

        tokio::time::sleep(options.interval).await;

        // ♾️ zero means "no deadline", not "already late"
        if let Some(timeout) = options.timeout.filter(|timeout| !timeout.is_zero()) {
            if started.elapsed() >= timeout {
                debug!("💀 gave up on task {} after {} poll(s)", task_uid, polls);
                return Err(MeilixError::Timeout {
                    task_uid,
                    timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
                });
            }
        }
    }
}

pub(crate) async fn get_task(http: &HttpRequests, task_uid: u64) -> Result<TaskResult> {
    http.get(&format!("tasks/{task_uid}")).await
}

/// 📚 `GET /tasks` with the filter and pagination applied.
pub(crate) async fn get_tasks(http: &HttpRequests, filter: &TaskFilter, page: &Page) -> Result<TaskPage> {
    let mut pairs = filter.to_query_pairs();
    page.push_pairs(&mut pairs);
    http.get(&with_query("tasks", &pairs)).await
}

/// 🛑 `POST /tasks/cancel`. An empty filter cancels everything enqueued or processing.
pub(crate) async fn cancel_tasks(http: &HttpRequests, filter: &TaskFilter) -> Result<TaskInfo> {
    let pairs = pairs_or_default_statuses(filter, &CANCEL_DEFAULT_STATUSES);
    http.send_empty(Method::POST, &with_query("tasks/cancel", &pairs)).await
}

/// 🗑️ `DELETE /tasks`. An empty filter deletes tasks of every status.
pub(crate) async fn delete_tasks(http: &HttpRequests, filter: &TaskFilter) -> Result<TaskInfo> {
    let pairs = pairs_or_default_statuses(filter, &DELETE_DEFAULT_STATUSES);
    http.send_empty(Method::DELETE, &with_query("tasks", &pairs)).await
}
