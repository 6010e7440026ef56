//! 🧱 Blocking twins of [`crate::Client`] and [`crate::Index`].
//!
//! 🧠 Each blocking client owns a current-thread tokio runtime and drives the async
//! implementation with `block_on`. Same requests, same defaults, same errors. Only the
//! waiting is different: the calling thread just sits there, like the rest of us on Mondays.
//!
//! ⚠️ Do not call these from inside an async runtime. `block_on` inside a runtime panics,
//! and it panics loudly.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::runtime::{Builder, Runtime};

use crate::app_config::{AppConfig, ClientConfig};
use crate::errors::Result;
use crate::files::DocumentFileType;
use crate::hooks::IndexHooks;
use crate::index::{DocumentsQuery, FileOptions};
use crate::models::batch::{BatchPage, BatchResult};
use crate::models::client::{ClientStats, Health, Version};
use crate::models::documents::DocumentsInfo;
use crate::models::index::{IndexInfo, IndexStats};
use crate::models::search::{
    FacetSearchQuery, FacetSearchResults, FederatedSearchResults, Federation, MultiSearchQuery,
    SearchQuery, SearchResults, SearchResultsWithUid, SimilarQuery, SimilarSearchResults,
};
use crate::models::settings::Settings;
use crate::models::task::{TaskInfo, TaskPage, TaskResult};
use crate::tasks::{Page, TaskFilter, WaitOptions};

fn runtime() -> Result<Arc<Runtime>> {
    Ok(Arc::new(Builder::new_current_thread().enable_all().build()?))
}

#[derive(Debug, Clone)]
pub struct Client {
    inner: crate::Client,
    runtime: Arc<Runtime>,
}

impl Client {
    pub fn new(url: impl Into<String>, api_key: Option<&str>) -> Result<Self> {
        Ok(Client {
            inner: crate::Client::new(url, api_key)?,
            runtime: runtime()?,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        Ok(Client {
            inner: crate::Client::from_config(config)?,
            runtime: runtime()?,
        })
    }

    pub fn from_app_config(config: &AppConfig) -> Result<Self> {
        Ok(Client {
            inner: crate::Client::from_app_config(config)?,
            runtime: runtime()?,
        })
    }

    pub fn with_default_wait(mut self, wait: WaitOptions) -> Self {
        self.inner = self.inner.with_default_wait(wait);
        self
    }

    pub fn default_wait(&self) -> &WaitOptions {
        self.inner.default_wait()
    }

    pub fn with_compression(mut self, compress: bool) -> Self {
        self.inner = self.inner.with_compression(compress);
        self
    }

    pub fn url(&self) -> &str {
        self.inner.url()
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    fn wrap(&self, inner: crate::Index) -> Index {
        Index {
            inner,
            runtime: Arc::clone(&self.runtime),
        }
    }

    pub fn index(&self, uid: impl Into<String>) -> Index {
        self.wrap(self.inner.index(uid))
    }

    pub fn get_index(&self, uid: &str) -> Result<Index> {
        let inner = self.block_on(self.inner.get_index(uid))?;
        Ok(self.wrap(inner))
    }

    pub fn get_raw_index(&self, uid: &str) -> Result<Option<IndexInfo>> {
        self.block_on(self.inner.get_raw_index(uid))
    }

    pub fn get_indexes(&self, offset: Option<u32>, limit: Option<u32>) -> Result<Vec<Index>> {
        let indexes = self.block_on(self.inner.get_indexes(offset, limit))?;
        Ok(indexes.into_iter().map(|inner| self.wrap(inner)).collect())
    }

    pub fn get_raw_indexes(&self, offset: Option<u32>, limit: Option<u32>) -> Result<Vec<IndexInfo>> {
        self.block_on(self.inner.get_raw_indexes(offset, limit))
    }

    pub fn create_index(&self, uid: &str, primary_key: Option<&str>) -> Result<Index> {
        let inner = self.block_on(self.inner.create_index(uid, primary_key))?;
        Ok(self.wrap(inner))
    }

    pub fn create_index_with_settings(
        &self,
        uid: &str,
        primary_key: Option<&str>,
        settings: &Settings,
    ) -> Result<Index> {
        let inner = self.block_on(self.inner.create_index_with_settings(uid, primary_key, settings))?;
        Ok(self.wrap(inner))
    }

    pub fn get_or_create_index(&self, uid: &str, primary_key: Option<&str>) -> Result<Index> {
        let inner = self.block_on(self.inner.get_or_create_index(uid, primary_key))?;
        Ok(self.wrap(inner))
    }

    pub fn delete_index_if_exists(&self, uid: &str) -> Result<bool> {
        self.block_on(self.inner.delete_index_if_exists(uid))
    }

    pub fn swap_indexes(&self, pairs: &[(String, String)]) -> Result<TaskInfo> {
        self.block_on(self.inner.swap_indexes(pairs))
    }

    pub fn multi_search(&self, queries: &[MultiSearchQuery]) -> Result<Vec<SearchResultsWithUid>> {
        self.block_on(self.inner.multi_search(queries))
    }

    pub fn federated_search(
        &self,
        queries: &[MultiSearchQuery],
        federation: &Federation,
    ) -> Result<FederatedSearchResults> {
        self.block_on(self.inner.federated_search(queries, federation))
    }

    pub fn health(&self) -> Result<Health> {
        self.block_on(self.inner.health())
    }

    pub fn is_healthy(&self) -> bool {
        self.block_on(self.inner.is_healthy())
    }

    pub fn get_version(&self) -> Result<Version> {
        self.block_on(self.inner.get_version())
    }

    pub fn get_all_stats(&self) -> Result<ClientStats> {
        self.block_on(self.inner.get_all_stats())
    }

    pub fn create_dump(&self) -> Result<TaskInfo> {
        self.block_on(self.inner.create_dump())
    }

    pub fn create_snapshot(&self) -> Result<TaskInfo> {
        self.block_on(self.inner.create_snapshot())
    }

    pub fn get_task(&self, task_uid: u64) -> Result<TaskResult> {
        self.block_on(self.inner.get_task(task_uid))
    }

    pub fn get_tasks(&self, filter: &TaskFilter, page: &Page) -> Result<TaskPage> {
        self.block_on(self.inner.get_tasks(filter, page))
    }

    pub fn cancel_tasks(&self, filter: &TaskFilter) -> Result<TaskInfo> {
        self.block_on(self.inner.cancel_tasks(filter))
    }

    pub fn delete_tasks(&self, filter: &TaskFilter) -> Result<TaskInfo> {
        self.block_on(self.inner.delete_tasks(filter))
    }

    /// ⏳ Same loop as the async poller, the sleep just parks this thread.
    pub fn wait_for_task(&self, task_uid: u64, options: &WaitOptions) -> Result<TaskResult> {
        self.block_on(self.inner.wait_for_task(task_uid, options))
    }

    pub fn get_batch(&self, batch_uid: u64) -> Result<BatchResult> {
        self.block_on(self.inner.get_batch(batch_uid))
    }

    pub fn get_batches(&self, filter: &TaskFilter, page: &Page) -> Result<BatchPage> {
        self.block_on(self.inner.get_batches(filter, page))
    }
}

#[derive(Debug, Clone)]
pub struct Index {
    inner: crate::Index,
    runtime: Arc<Runtime>,
}

impl Index {
    fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    fn rewrap(&self, inner: crate::Index) -> Index {
        Index {
            inner,
            runtime: Arc::clone(&self.runtime),
        }
    }

    pub fn uid(&self) -> &str {
        &self.inner.uid
    }

    pub fn primary_key(&self) -> Option<&str> {
        self.inner.primary_key.as_deref()
    }

    /// 🔓 The async handle underneath, for when you find yourself in async land after all.
    pub fn as_async(&self) -> &crate::Index {
        &self.inner
    }

    pub fn with_hooks(mut self, hooks: IndexHooks) -> Self {
        self.inner = self.inner.with_hooks(hooks);
        self
    }

    pub fn with_compression(mut self, compress: bool) -> Self {
        self.inner = self.inner.with_compression(compress);
        self
    }

    pub fn fetch_info(&self) -> Result<Index> {
        let inner = self.block_on(self.inner.fetch_info())?;
        Ok(self.rewrap(inner))
    }

    pub fn get_primary_key(&self) -> Result<Option<String>> {
        self.block_on(self.inner.get_primary_key())
    }

    pub fn update(&self, primary_key: &str) -> Result<Index> {
        let inner = self.block_on(self.inner.update(primary_key))?;
        Ok(self.rewrap(inner))
    }

    pub fn delete(&self) -> Result<TaskInfo> {
        self.block_on(self.inner.delete())
    }

    pub fn delete_if_exists(&self) -> Result<bool> {
        self.block_on(self.inner.delete_if_exists())
    }

    pub fn get_stats(&self) -> Result<IndexStats> {
        self.block_on(self.inner.get_stats())
    }

    pub fn wait_for_task(&self, task_uid: u64, options: &WaitOptions) -> Result<TaskResult> {
        self.block_on(self.inner.wait_for_task(task_uid, options))
    }

    pub fn get_document(&self, document_id: &str, fields: Option<&[String]>) -> Result<Value> {
        self.block_on(self.inner.get_document(document_id, fields))
    }

    pub fn get_documents(&self, query: &DocumentsQuery) -> Result<DocumentsInfo> {
        self.block_on(self.inner.get_documents(query))
    }

    pub fn add_documents<T: Serialize>(&self, documents: &[T], primary_key: Option<&str>) -> Result<TaskInfo> {
        self.block_on(self.inner.add_documents(documents, primary_key))
    }

    pub fn add_documents_in_batches<T: Serialize>(
        &self,
        documents: &[T],
        batch_size: usize,
        primary_key: Option<&str>,
    ) -> Result<Vec<TaskInfo>> {
        self.block_on(self.inner.add_documents_in_batches(documents, batch_size, primary_key))
    }

    pub fn add_documents_auto_batch<T: Serialize>(
        &self,
        documents: &[T],
        max_payload_size: usize,
        primary_key: Option<&str>,
    ) -> Result<Vec<TaskInfo>> {
        self.block_on(self.inner.add_documents_auto_batch(documents, max_payload_size, primary_key))
    }

    pub fn add_documents_from_file(&self, path: &Path, options: &FileOptions<'_>) -> Result<TaskInfo> {
        self.block_on(self.inner.add_documents_from_file(path, options))
    }

    pub fn add_documents_from_file_in_batches(
        &self,
        path: &Path,
        batch_size: usize,
        options: &FileOptions<'_>,
    ) -> Result<Vec<TaskInfo>> {
        self.block_on(self.inner.add_documents_from_file_in_batches(path, batch_size, options))
    }

    pub fn add_documents_from_directory(
        &self,
        directory: &Path,
        file_type: DocumentFileType,
        options: &FileOptions<'_>,
    ) -> Result<Vec<TaskInfo>> {
        self.block_on(self.inner.add_documents_from_directory(directory, file_type, options))
    }

    pub fn add_documents_from_directory_in_batches(
        &self,
        directory: &Path,
        file_type: DocumentFileType,
        batch_size: usize,
        options: &FileOptions<'_>,
    ) -> Result<Vec<TaskInfo>> {
        self.block_on(self.inner.add_documents_from_directory_in_batches(
            directory, file_type, batch_size, options,
        ))
    }

    pub fn add_documents_from_directory_auto_batch(
        &self,
        directory: &Path,
        file_type: DocumentFileType,
        max_payload_size: usize,
        options: &FileOptions<'_>,
    ) -> Result<Vec<TaskInfo>> {
        self.block_on(self.inner.add_documents_from_directory_auto_batch(
            directory,
            file_type,
            max_payload_size,
            options,
        ))
    }

    pub fn add_documents_from_raw_file(&self, path: &Path, options: &FileOptions<'_>) -> Result<TaskInfo> {
        self.block_on(self.inner.add_documents_from_raw_file(path, options))
    }

    pub fn update_documents<T: Serialize>(&self, documents: &[T], primary_key: Option<&str>) -> Result<TaskInfo> {
        self.block_on(self.inner.update_documents(documents, primary_key))
    }

    pub fn update_documents_in_batches<T: Serialize>(
        &self,
        documents: &[T],
        batch_size: usize,
        primary_key: Option<&str>,
    ) -> Result<Vec<TaskInfo>> {
        self.block_on(self.inner.update_documents_in_batches(documents, batch_size, primary_key))
    }

    pub fn update_documents_auto_batch<T: Serialize>(
        &self,
        documents: &[T],
        max_payload_size: usize,
        primary_key: Option<&str>,
    ) -> Result<Vec<TaskInfo>> {
        self.block_on(self.inner.update_documents_auto_batch(documents, max_payload_size, primary_key))
    }

    pub fn update_documents_from_file(&self, path: &Path, options: &FileOptions<'_>) -> Result<TaskInfo> {
        self.block_on(self.inner.update_documents_from_file(path, options))
    }

    pub fn update_documents_from_file_in_batches(
        &self,
        path: &Path,
        batch_size: usize,
        options: &FileOptions<'_>,
    ) -> Result<Vec<TaskInfo>> {
        self.block_on(self.inner.update_documents_from_file_in_batches(path, batch_size, options))
    }

    pub fn update_documents_from_directory(
        &self,
        directory: &Path,
        file_type: DocumentFileType,
        options: &FileOptions<'_>,
    ) -> Result<Vec<TaskInfo>> {
        self.block_on(self.inner.update_documents_from_directory(directory, file_type, options))
    }

    pub fn update_documents_from_directory_in_batches(
        &self,
        directory: &Path,
        file_type: DocumentFileType,
        batch_size: usize,
        options: &FileOptions<'_>,
    ) -> Result<Vec<TaskInfo>> {
        self.block_on(self.inner.update_documents_from_directory_in_batches(
            directory, file_type, batch_size, options,
        ))
    }

    pub fn update_documents_from_directory_auto_batch(
        &self,
        directory: &Path,
        file_type: DocumentFileType,
        max_payload_size: usize,
        options: &FileOptions<'_>,
    ) -> Result<Vec<TaskInfo>> {
        self.block_on(self.inner.update_documents_from_directory_auto_batch(
            directory,
            file_type,
            max_payload_size,
            options,
        ))
    }

    pub fn update_documents_from_raw_file(&self, path: &Path, options: &FileOptions<'_>) -> Result<TaskInfo> {
        self.block_on(self.inner.update_documents_from_raw_file(path, options))
    }

    pub fn delete_document(&self, document_id: &str) -> Result<TaskInfo> {
        self.block_on(self.inner.delete_document(document_id))
    }

    pub fn delete_documents(&self, ids: &[String]) -> Result<TaskInfo> {
        self.block_on(self.inner.delete_documents(ids))
    }

    pub fn delete_documents_by_filter(&self, filter: impl Into<Value>) -> Result<TaskInfo> {
        self.block_on(self.inner.delete_documents_by_filter(filter))
    }

    pub fn delete_documents_in_batches_by_filter(&self, filters: &[Value]) -> Result<Vec<TaskInfo>> {
        self.block_on(self.inner.delete_documents_in_batches_by_filter(filters))
    }

    pub fn delete_all_documents(&self) -> Result<TaskInfo> {
        self.block_on(self.inner.delete_all_documents())
    }

    pub fn search(&self, query: &SearchQuery) -> Result<SearchResults> {
        self.block_on(self.inner.search(query))
    }

    pub fn search_as<T: DeserializeOwned>(&self, query: &SearchQuery) -> Result<SearchResults<T>> {
        self.block_on(self.inner.search_as(query))
    }

    pub fn facet_search(&self, query: &FacetSearchQuery) -> Result<FacetSearchResults> {
        self.block_on(self.inner.facet_search(query))
    }

    pub fn search_similar_documents(&self, query: &SimilarQuery) -> Result<SimilarSearchResults> {
        self.block_on(self.inner.search_similar_documents(query))
    }

    pub fn get_settings(&self) -> Result<Settings> {
        self.block_on(self.inner.get_settings())
    }

    pub fn update_settings(&self, settings: &Settings) -> Result<TaskInfo> {
        self.block_on(self.inner.update_settings(settings))
    }

    pub fn reset_settings(&self) -> Result<TaskInfo> {
        self.block_on(self.inner.reset_settings())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::MeilixError;
    use crate::models::TaskStatus;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn task_json(status: &str) -> Value {
        json!({
            "uid": 9,
            "indexUid": "movies",
            "status": status,
            "type": "documentAdditionOrUpdate",
            "enqueuedAt": "2024-01-01T00:00:00Z"
        })
    }

    /// 🧪 The mock server lives on its own runtime; the blocking client brings its own.
    fn server_with(mocks: Vec<Mock>) -> (tokio::runtime::Runtime, MockServer) {
        let server_runtime = tokio::runtime::Runtime::new().expect("💀 test runtime");
        let server = server_runtime.block_on(async {
            let server = MockServer::start().await;
            for mock in mocks {
                mock.mount(&server).await;
            }
            server
        });
        (server_runtime, server)
    }

    #[test]
    fn the_one_where_the_blocking_waiter_waits_just_like_its_async_sibling() {
        let (_runtime, server) = server_with(vec![
            Mock::given(method("GET"))
                .and(path("/tasks/9"))
                .respond_with(ResponseTemplate::new(200).set_body_json(task_json("processing")))
                .up_to_n_times(1),
            Mock::given(method("GET"))
                .and(path("/tasks/9"))
                .respond_with(ResponseTemplate::new(200).set_body_json(task_json("succeeded"))),
        ]);

        let client = Client::new(server.uri(), None).expect("💀 client should build");
        assert_eq!(client.default_wait(), &WaitOptions::default());
        let task = client
            .wait_for_task(9, client.default_wait())
            .expect("💀 task should resolve");
        assert_eq!(task.status, TaskStatus::Succeeded);
    }

    #[test]
    fn the_one_where_the_blocking_timeout_is_the_same_timeout() {
        let (_runtime, server) = server_with(vec![
            Mock::given(method("GET"))
                .and(path("/tasks/9"))
                .respond_with(ResponseTemplate::new(200).set_body_json(task_json("enqueued"))),
        ]);

        let client = Client::new(server.uri(), None).expect("💀 client should build");
        let options = WaitOptions::new()
            .with_timeout(Duration::from_millis(80))
            .with_interval(Duration::from_millis(20));
        let error = client
            .wait_for_task(9, &options)
            .expect_err("💀 should time out");
        assert!(matches!(error, MeilixError::Timeout { task_uid: 9, timeout_ms: 80 }));
    }

    #[test]
    fn the_one_where_blocking_documents_get_added_without_an_await_in_sight() {
        let (_runtime, server) = server_with(vec![
            Mock::given(method("POST"))
                .and(path("/indexes/movies/documents"))
                .respond_with(ResponseTemplate::new(202).set_body_json(json!({
                    "taskUid": 1,
                    "indexUid": "movies",
                    "status": "enqueued",
                    "type": "documentAdditionOrUpdate",
                    "enqueuedAt": "2024-01-01T00:00:00Z"
                }))),
        ]);

        let client = Client::new(server.uri(), None).expect("💀 client should build");
        let index = client.index("movies");
        assert_eq!(index.uid(), "movies");
        let tasks = index
            .add_documents_in_batches(&[json!({"id": 1}), json!({"id": 2})], 1, Some("id"))
            .expect("💀 blocking batched add should work");
        assert_eq!(tasks.len(), 2);
    }

    #[test]
    fn the_one_where_a_blocking_similar_search_comes_back_with_neighbours() {
        let (_runtime, server) = server_with(vec![
            Mock::given(method("POST"))
                .and(path("/indexes/movies/similar"))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "hits": [{"id": 2}],
                    "id": 1,
                    "processingTimeMs": 1,
                    "limit": 20,
                    "offset": 0,
                    "estimatedTotalHits": 1
                }))),
        ]);

        let client = Client::new(server.uri(), None).expect("💀 client should build");
        let results = client
            .index("movies")
            .search_similar_documents(&SimilarQuery::new(1))
            .expect("💀 blocking similar search should work");
        assert_eq!(results.hits, vec![json!({"id": 2})]);
    }
}
