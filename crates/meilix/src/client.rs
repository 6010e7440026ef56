//! 🔎 The client: the front door to a Meilisearch instance.
//!
//! 🧠 One `Client` owns one transport (behind an `Arc`), and every [`Index`] it hands out
//! shares that transport. Clone the client freely, it is a pointer and two flags.

use std::sync::Arc;

use reqwest::Method;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::app_config::{AppConfig, ClientConfig};
use crate::batches;
use crate::errors::{MeilixError, Result};
use crate::http::{HttpRequests, with_query};
use crate::index::Index;
use crate::models::batch::{BatchPage, BatchResult};
use crate::models::client::{ClientStats, Health, Version};
use crate::models::index::{IndexInfo, IndexPage};
use crate::models::search::{
    FederatedSearchResults, Federation, MultiSearchQuery, MultiSearchResponse, SearchResultsWithUid,
};
use crate::models::settings::Settings;
use crate::models::task::{TaskInfo, TaskPage, TaskResult};
use crate::tasks::{self, Page, TaskFilter, WaitOptions};

#[derive(Debug, Clone)]
pub struct Client {
    http: Arc<HttpRequests>,
    wait: WaitOptions,
    compress: bool,
}

impl Client {
    /// 🚀 A client for `url`, optionally authenticated with `api_key`.
    pub fn new(url: impl Into<String>, api_key: Option<&str>) -> Result<Self> {
        let mut config = ClientConfig::new(url);
        config.api_key = api_key.map(str::to_string);
        Client::from_config(&config)
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let http = HttpRequests::new(config)?;
        debug!("🔌 client ready for {}", http.base_url());
        Ok(Client {
            http: Arc::new(http),
            wait: WaitOptions::default(),
            compress: false,
        })
    }

    /// 🔧 Build from a loaded [`AppConfig`], picking up its wait and compression defaults.
    pub fn from_app_config(config: &AppConfig) -> Result<Self> {
        Ok(Client::from_config(&config.client)?
            .with_default_wait(config.tasks.into())
            .with_compression(config.documents.compress))
    }

    /// ⏳ Wait options used by operations that wait on their own (e.g. [`Client::create_index`]).
    pub fn with_default_wait(mut self, wait: WaitOptions) -> Self {
        self.wait = wait;
        self
    }

    pub fn default_wait(&self) -> &WaitOptions {
        &self.wait
    }

    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    pub fn url(&self) -> &str {
        self.http.base_url()
    }

    /// 🗂️ A local handle on an index. No request is made.
    pub fn index(&self, uid: impl Into<String>) -> Index {
        Index::new(Arc::clone(&self.http), uid).with_compression(self.compress)
    }

    fn index_from_info(&self, info: IndexInfo) -> Index {
        Index::from_info(Arc::clone(&self.http), info).with_compression(self.compress)
    }

    // ── 🗂️ indexes ───────────────────────────────────────────────────────

    /// 🔍 Fetch an index's metadata. A missing index is an `index_not_found` API error.
    pub async fn get_index(&self, uid: &str) -> Result<Index> {
        let info: IndexInfo = self.http.get(&format!("indexes/{uid}")).await?;
        Ok(self.index_from_info(info))
    }

    /// 🔍 Raw metadata, or `None` when the index does not exist.
    pub async fn get_raw_index(&self, uid: &str) -> Result<Option<IndexInfo>> {
        match self.http.get(&format!("indexes/{uid}")).await {
            Ok(info) => Ok(Some(info)),
            Err(MeilixError::Api(api_error)) if api_error.status == 404 => Ok(None),
            Err(error) => Err(error),
        }
    }

    pub async fn get_raw_indexes(&self, offset: Option<u32>, limit: Option<u32>) -> Result<Vec<IndexInfo>> {
        let mut pairs = Vec::new();
        if let Some(offset) = offset {
            pairs.push(("offset", offset.to_string()));
        }
        if let Some(limit) = limit {
            pairs.push(("limit", limit.to_string()));
        }
        let page: IndexPage = self.http.get(&with_query("indexes", &pairs)).await?;
        Ok(page.results)
    }

    pub async fn get_indexes(&self, offset: Option<u32>, limit: Option<u32>) -> Result<Vec<Index>> {
        Ok(self
            .get_raw_indexes(offset, limit)
            .await?
            .into_iter()
            .map(|info| self.index_from_info(info))
            .collect())
    }

    /// 🏗️ Create an index, wait for the creation task, and return the fetched handle.
    pub async fn create_index(&self, uid: &str, primary_key: Option<&str>) -> Result<Index> {
        let mut body = json!({ "uid": uid });
        if let Some(primary_key) = primary_key {
            body["primaryKey"] = json!(primary_key);
        }
        let task: TaskInfo = self
            .http
            .send_json(Method::POST, "indexes", &body, false)
            .await?;
        self.wait_for_task(task.task_uid, &self.wait).await?;
        info!("🏗️ index {} created", uid);
        self.get_index(uid).await
    }

    /// 🏗️ Create an index, then apply settings and wait for those too.
    pub async fn create_index_with_settings(
        &self,
        uid: &str,
        primary_key: Option<&str>,
        settings: &Settings,
    ) -> Result<Index> {
        let index = self.create_index(uid, primary_key).await?;
        let task = index.update_settings(settings).await?;
        self.wait_for_task(task.task_uid, &self.wait).await?;
        Ok(index)
    }

    /// 🔁 Fetch the index, or create it when the server says it does not exist.
    pub async fn get_or_create_index(&self, uid: &str, primary_key: Option<&str>) -> Result<Index> {
        match self.get_index(uid).await {
            Ok(index) => Ok(index),
            Err(error) if error.is_index_not_found() => {
                debug!("🔁 index {} not found, creating it", uid);
                self.create_index(uid, primary_key).await
            }
            Err(error) => Err(error),
        }
    }

    pub async fn delete_index_if_exists(&self, uid: &str) -> Result<bool> {
        self.index(uid).delete_if_exists().await
    }

    /// 🔀 Swap each pair of indexes atomically.
    pub async fn swap_indexes(&self, pairs: &[(String, String)]) -> Result<TaskInfo> {
        let body = pairs
            .iter()
            .map(|(left, right)| json!({ "indexes": [left, right] }))
            .collect::<Vec<_>>();
        self.http
            .send_json(Method::POST, "swap-indexes", &body, false)
            .await
    }

    // ── 🔍 multi-search ─────────────────────────────────────────────────

    /// 🗂️ Run several queries in one round trip. Each answer comes back tagged with its index.
    pub async fn multi_search(&self, queries: &[MultiSearchQuery]) -> Result<Vec<SearchResultsWithUid>> {
        for query in queries {
            query.search.validate()?;
        }
        let body = json!({ "federation": Value::Null, "queries": queries });
        let response: MultiSearchResponse = self
            .http
            .send_json(Method::POST, "multi-search", &body, false)
            .await?;
        debug!("🗂️ multi-search answered for {} queries", response.results.len());
        Ok(response.results)
    }

    /// 🪢 Run several queries and merge their hits into one ranked list.
    ///
    /// Paging belongs to the federation, so each query's `limit` and `offset` are left off the wire.
    pub async fn federated_search(
        &self,
        queries: &[MultiSearchQuery],
        federation: &Federation,
    ) -> Result<FederatedSearchResults> {
        let mut rendered = Vec::with_capacity(queries.len());
        for query in queries {
            query.search.validate()?;
            let mut value = serde_json::to_value(query)?;
            if let Value::Object(fields) = &mut value {
                fields.remove("limit");
                fields.remove("offset");
            }
            rendered.push(value);
        }
        let body = json!({ "federation": federation, "queries": rendered });
        self.http
            .send_json(Method::POST, "multi-search", &body, false)
            .await
    }

    // ── 🩺 instance ─────────────────────────────────────────────────────

    pub async fn health(&self) -> Result<Health> {
        self.http.get("health").await
    }

    /// 🩺 `true` when the health check answers `available`, `false` on any error.
    pub async fn is_healthy(&self) -> bool {
        matches!(self.health().await, Ok(health) if health.status == "available")
    }

    pub async fn get_version(&self) -> Result<Version> {
        self.http.get("version").await
    }

    pub async fn get_all_stats(&self) -> Result<ClientStats> {
        self.http.get("stats").await
    }

    pub async fn create_dump(&self) -> Result<TaskInfo> {
        self.http.send_empty(Method::POST, "dumps").await
    }

    pub async fn create_snapshot(&self) -> Result<TaskInfo> {
        self.http.send_empty(Method::POST, "snapshots").await
    }

    // ── ⏳ tasks and batches ────────────────────────────────────────────

    pub async fn get_task(&self, task_uid: u64) -> Result<TaskResult> {
        tasks::get_task(&self.http, task_uid).await
    }

    pub async fn get_tasks(&self, filter: &TaskFilter, page: &Page) -> Result<TaskPage> {
        tasks::get_tasks(&self.http, filter, page).await
    }

    pub async fn cancel_tasks(&self, filter: &TaskFilter) -> Result<TaskInfo> {
        tasks::cancel_tasks(&self.http, filter).await
    }

    pub async fn delete_tasks(&self, filter: &TaskFilter) -> Result<TaskInfo> {
        tasks::delete_tasks(&self.http, filter).await
    }

    pub async fn wait_for_task(&self, task_uid: u64, options: &WaitOptions) -> Result<TaskResult> {
        tasks::wait_for_task(&self.http, task_uid, options).await
    }

    pub async fn get_batch(&self, batch_uid: u64) -> Result<BatchResult> {
        batches::get_batch(&self.http, batch_uid).await
    }

    pub async fn get_batches(&self, filter: &TaskFilter, page: &Page) -> Result<BatchPage> {
        batches::get_batches(&self.http, filter, page).await
    }
}
