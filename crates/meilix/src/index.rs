//! 🗂️ The index handle: documents in, documents out, searches, settings.
//!
//! 🧠 An [`Index`] is cheap to clone. It borrows the client's transport through an `Arc`
//! and carries its own hook registry. Every add has an update twin that PUTs instead of
//! POSTs, so both go through the same private helpers and differ only by [`DocumentWrite`].
//!
//! 📦 Batched uploads fire their requests concurrently and hand back task receipts in
//! batch order. The server still applies them in the order it enqueued them, which is
//! whatever order the requests landed in. If order matters across batches, wait on each.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::batching::{batch, generate_auto_batches};
use crate::errors::{MeilixError, Result};
use crate::files::{
    DocumentFileType, combine_documents, load_documents_from_directory, load_documents_from_file,
    validate_csv_delimiter,
};
use crate::hooks::{self, Hook, HookContext, HookEvent, IndexHooks};
use crate::http::{HttpRequests, Payload, with_query};
use crate::models::documents::DocumentsInfo;
use crate::models::index::{IndexInfo, IndexStats};
use crate::models::search::{
    FacetSearchQuery, FacetSearchResults, SearchQuery, SearchResults, SimilarQuery,
    SimilarSearchResults,
};
use crate::models::settings::Settings;
use crate::models::task::{TaskInfo, TaskResult, TaskStatus};
use crate::tasks::{self, WaitOptions};

/// ⏳ Index-level waits (primary key updates, delete-if-exists) get a longer leash.
const INDEX_WAIT_TIMEOUT: Duration = Duration::from_millis(100_000);

/// ✍️ Add (POST, merge-replace) or update (PUT, partial merge).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentWrite {
    Add,
    Update,
}

impl DocumentWrite {
    fn method(self) -> Method {
        match self {
            DocumentWrite::Add => Method::POST,
            DocumentWrite::Update => Method::PUT,
        }
    }

    fn hooks(self, registry: &IndexHooks) -> &[Arc<dyn Hook>] {
        match self {
            DocumentWrite::Add => &registry.add_documents,
            DocumentWrite::Update => &registry.update_documents,
        }
    }
}

/// 🔪 How a directory's documents are cut into requests.
#[derive(Debug, Clone, Copy)]
enum Split {
    Whole,
    Count(usize),
    Bytes(usize),
}

/// 📂 Knobs for file and directory uploads. Directories are combined unless told otherwise.
#[derive(Debug, Clone, Copy)]
pub struct FileOptions<'a> {
    pub primary_key: Option<&'a str>,
    pub csv_delimiter: Option<char>,
    /// 🧺 Directory uploads only: merge every file into one document list before batching.
    pub combine_documents: bool,
}

impl Default for FileOptions<'_> {
    fn default() -> Self {
        FileOptions {
            primary_key: None,
            csv_delimiter: None,
            combine_documents: true,
        }
    }
}

impl<'a> FileOptions<'a> {
    pub fn new() -> Self {
        FileOptions::default()
    }

    pub fn with_primary_key(mut self, primary_key: &'a str) -> Self {
        self.primary_key = Some(primary_key);
        self
    }

    pub fn with_csv_delimiter(mut self, delimiter: char) -> Self {
        self.csv_delimiter = Some(delimiter);
        self
    }

    pub fn combined(mut self, combine: bool) -> Self {
        self.combine_documents = combine;
        self
    }
}

/// 📄 Which documents to read back, and which fields of them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentsQuery {
    pub offset: u32,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub retrieve_vectors: bool,
}

impl Default for DocumentsQuery {
    fn default() -> Self {
        DocumentsQuery {
            offset: 0,
            limit: 20,
            fields: None,
            filter: None,
            ids: None,
            retrieve_vectors: false,
        }
    }
}

impl DocumentsQuery {
    pub fn new() -> Self {
        DocumentsQuery::default()
    }

    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_fields(mut self, fields: Vec<String>) -> Self {
        self.fields = Some(fields);
        self
    }

    pub fn with_filter(mut self, filter: impl Into<Value>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_ids(mut self, ids: Vec<String>) -> Self {
        self.ids = Some(ids);
        self
    }

    fn needs_fetch_route(&self) -> bool {
        self.filter.is_some() || self.ids.is_some()
    }
}

/// 🗂️ A handle on one index.
#[derive(Debug, Clone)]
pub struct Index {
    pub uid: String,
    pub primary_key: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    http: Arc<HttpRequests>,
    hooks: IndexHooks,
    compress: bool,
}

impl Index {
    pub(crate) fn new(http: Arc<HttpRequests>, uid: impl Into<String>) -> Self {
        Index {
            uid: uid.into(),
            primary_key: None,
            created_at: None,
            updated_at: None,
            http,
            hooks: IndexHooks::default(),
            compress: false,
        }
    }

    pub(crate) fn from_info(http: Arc<HttpRequests>, info: IndexInfo) -> Self {
        Index {
            uid: info.uid,
            primary_key: info.primary_key,
            created_at: info.created_at,
            updated_at: info.updated_at,
            http,
            hooks: IndexHooks::default(),
            compress: false,
        }
    }

    /// 🪝 Swap in a hook registry.
    pub fn with_hooks(mut self, hooks: IndexHooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn hooks(&self) -> &IndexHooks {
        &self.hooks
    }

    /// 🫁 Gzip JSON document and settings bodies.
    pub fn with_compression(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    fn path(&self, suffix: &str) -> String {
        if suffix.is_empty() {
            format!("indexes/{}", self.uid)
        } else {
            format!("indexes/{}/{}", self.uid, suffix)
        }
    }

    /// 🔗 Document ids are user data, so they get percent-encoded before joining the path.
    fn document_path(&self, document_id: &str) -> String {
        self.path(&format!("documents/{}", urlencoding::encode(document_id)))
    }

    fn documents_path(&self, primary_key: Option<&str>, csv_delimiter: Option<u8>) -> String {
        let mut pairs = Vec::new();
        if let Some(primary_key) = primary_key {
            pairs.push(("primaryKey", primary_key.to_string()));
        }
        if let Some(delimiter) = csv_delimiter {
            pairs.push(("csvDelimiter", char::from(delimiter).to_string()));
        }
        with_query(&self.path("documents"), &pairs)
    }

    // ── 🔎 index metadata ────────────────────────────────────────────────

    /// 🔄 Fetch the latest metadata and return a refreshed handle.
    pub async fn fetch_info(&self) -> Result<Index> {
        let info: IndexInfo = self.http.get(&self.path("")).await?;
        Ok(Index {
            uid: info.uid,
            primary_key: info.primary_key,
            created_at: info.created_at,
            updated_at: info.updated_at,
            http: Arc::clone(&self.http),
            hooks: self.hooks.clone(),
            compress: self.compress,
        })
    }

    pub async fn get_primary_key(&self) -> Result<Option<String>> {
        Ok(self.fetch_info().await?.primary_key)
    }

    /// 🔑 Change the primary key, wait for it to apply, return the refreshed handle.
    pub async fn update(&self, primary_key: &str) -> Result<Index> {
        let task: TaskInfo = self
            .http
            .send_json(
                Method::PATCH,
                &self.path(""),
                &json!({ "primaryKey": primary_key }),
                false,
            )
            .await?;
        let options = WaitOptions::new().with_timeout(INDEX_WAIT_TIMEOUT);
        tasks::wait_for_task(&self.http, task.task_uid, &options).await?;
        self.fetch_info().await
    }

    pub async fn delete(&self) -> Result<TaskInfo> {
        self.http.send_empty(Method::DELETE, &self.path("")).await
    }

    /// 🗑️ Delete and wait. `false` when there was nothing to delete.
    pub async fn delete_if_exists(&self) -> Result<bool> {
        let task = match self.delete().await {
            Ok(task) => task,
            Err(error) if error.is_index_not_found() => return Ok(false),
            Err(error) => return Err(error),
        };
        let options = WaitOptions::new().with_timeout(INDEX_WAIT_TIMEOUT);
        let result = tasks::wait_for_task(&self.http, task.task_uid, &options).await?;
        Ok(result.status == TaskStatus::Succeeded)
    }

    pub async fn get_stats(&self) -> Result<IndexStats> {
        self.http.get(&self.path("stats")).await
    }

    pub async fn wait_for_task(&self, task_uid: u64, options: &WaitOptions) -> Result<TaskResult> {
        tasks::wait_for_task(&self.http, task_uid, options).await
    }

    // ── 📄 reading documents ─────────────────────────────────────────────

    pub async fn get_document(&self, document_id: &str, fields: Option<&[String]>) -> Result<Value> {
        let mut pairs = Vec::new();
        if let Some(fields) = fields {
            pairs.push(("fields", fields.join(",")));
        }
        let path = with_query(&self.document_path(document_id), &pairs);
        self.http.get(&path).await
    }

    /// 📚 GET with query params, or POST `documents/fetch` when a filter or ids are given.
    pub async fn get_documents(&self, query: &DocumentsQuery) -> Result<DocumentsInfo> {
        if query.needs_fetch_route() {
            return self
                .http
                .send_json(Method::POST, &self.path("documents/fetch"), query, false)
                .await;
        }

        let mut pairs = vec![
            ("offset", query.offset.to_string()),
            ("limit", query.limit.to_string()),
        ];
        if let Some(fields) = &query.fields {
            pairs.push(("fields", fields.join(",")));
        }
        if query.retrieve_vectors {
            pairs.push(("retrieveVectors", "true".to_string()));
        }
        self.http.get(&with_query(&self.path("documents"), &pairs)).await
    }

    // ── ✍️ shared write machinery ────────────────────────────────────────

    /// 🧠 The one place documents hit the wire. Hooks only cost a JSON round trip when
    /// someone registered one.
    async fn write_documents<T: Serialize>(
        &self,
        write: DocumentWrite,
        documents: &[T],
        primary_key: Option<&str>,
    ) -> Result<TaskInfo> {
        let path = self.documents_path(primary_key, None);
        let registered = write.hooks(&self.hooks);
        debug!("✍️ {:?} {} documents to {}", write, documents.len(), self.uid);

        if registered.is_empty() {
            return self
                .http
                .send_json(write.method(), &path, documents, self.compress)
                .await;
        }

        let values = documents
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let values = hooks::run_document_pre(registered, values, primary_key).await?;
        let context = HookContext::Documents {
            documents: &values,
            primary_key,
        };
        let request = self
            .http
            .send_json(write.method(), &path, values.as_slice(), self.compress);
        let task = hooks::run_concurrent(registered, &context, request).await?;
        hooks::run_task_post(registered, task).await
    }

    async fn write_in_batches<T: Serialize>(
        &self,
        write: DocumentWrite,
        documents: &[T],
        batch_size: usize,
        primary_key: Option<&str>,
    ) -> Result<Vec<TaskInfo>> {
        let requests = batch(documents, batch_size)?
            .map(|chunk| self.write_documents(write, chunk, primary_key))
            .collect::<Vec<_>>();
        try_join_all(requests).await
    }

    async fn write_auto_batch<T: Serialize>(
        &self,
        write: DocumentWrite,
        documents: &[T],
        max_payload_size: usize,
        primary_key: Option<&str>,
    ) -> Result<Vec<TaskInfo>> {
        let requests = generate_auto_batches(documents, max_payload_size)?
            .map(|chunk| self.write_documents(write, chunk, primary_key))
            .collect::<Vec<_>>();
        info!(
            "📦 {} documents packed into {} request(s) for {}",
            documents.len(),
            requests.len(),
            self.uid
        );
        try_join_all(requests).await
    }

    async fn write_split(
        &self,
        write: DocumentWrite,
        documents: &[Value],
        split: Split,
        primary_key: Option<&str>,
    ) -> Result<Vec<TaskInfo>> {
        match split {
            Split::Whole => Ok(vec![self.write_documents(write, documents, primary_key).await?]),
            Split::Count(batch_size) => {
                self.write_in_batches(write, documents, batch_size, primary_key).await
            }
            Split::Bytes(max_payload_size) => {
                self.write_auto_batch(write, documents, max_payload_size, primary_key)
                    .await
            }
        }
    }

    async fn write_from_file(
        &self,
        write: DocumentWrite,
        path: &Path,
        split: Split,
        options: &FileOptions<'_>,
    ) -> Result<Vec<TaskInfo>> {
        let documents = load_documents_from_file(path, options.csv_delimiter).await?;
        self.write_split(write, &documents, split, options.primary_key).await
    }

    /// 📁 Combined: one pile, one split. Not combined: each file split on its own,
    /// receipts concatenated in file order.
    async fn write_from_directory(
        &self,
        write: DocumentWrite,
        directory: &Path,
        file_type: DocumentFileType,
        split: Split,
        options: &FileOptions<'_>,
    ) -> Result<Vec<TaskInfo>> {
        let per_file =
            load_documents_from_directory(directory, file_type, options.csv_delimiter).await?;

        if options.combine_documents {
            let combined = combine_documents(per_file);
            return self.write_split(write, &combined, split, options.primary_key).await;
        }

        let mut receipts = Vec::new();
        for documents in &per_file {
            receipts.extend(
                self.write_split(write, documents, split, options.primary_key)
                    .await?,
            );
        }
        Ok(receipts)
    }

    /// 📤 Ship a file's bytes untouched, with the content type its extension implies.
    async fn write_raw_file(
        &self,
        write: DocumentWrite,
        path: &Path,
        options: &FileOptions<'_>,
    ) -> Result<TaskInfo> {
        let file_type = DocumentFileType::from_path(path)?;
        let delimiter = match (file_type, options.csv_delimiter) {
            (DocumentFileType::Csv, Some(delimiter)) => Some(validate_csv_delimiter(delimiter)?),
            (_, Some(_)) => {
                return Err(MeilixError::Validation(
                    "A csv_delimiter can only be used with csv files".to_string(),
                ));
            }
            (_, None) => None,
        };

        let bytes = tokio::fs::read(path).await?;
        let url = self.documents_path(options.primary_key, delimiter);
        debug!("📤 raw {} upload of {} bytes to {}", file_type.extension(), bytes.len(), self.uid);
        let payload = Payload::raw(bytes, file_type.content_type(), self.compress);
        self.http.send_raw(write.method(), &url, payload).await
    }

    // ── ➕ add ───────────────────────────────────────────────────────────

    pub async fn add_documents<T: Serialize>(
        &self,
        documents: &[T],
        primary_key: Option<&str>,
    ) -> Result<TaskInfo> {
        self.write_documents(DocumentWrite::Add, documents, primary_key).await
    }

    pub async fn add_documents_in_batches<T: Serialize>(
        &self,
        documents: &[T],
        batch_size: usize,
        primary_key: Option<&str>,
    ) -> Result<Vec<TaskInfo>> {
        self.write_in_batches(DocumentWrite::Add, documents, batch_size, primary_key)
            .await
    }

    /// 🎯 Split by serialized size so no request exceeds `max_payload_size` bytes.
    pub async fn add_documents_auto_batch<T: Serialize>(
        &self,
        documents: &[T],
        max_payload_size: usize,
        primary_key: Option<&str>,
    ) -> Result<Vec<TaskInfo>> {
        self.write_auto_batch(DocumentWrite::Add, documents, max_payload_size, primary_key)
            .await
    }

    pub async fn add_documents_from_file(
        &self,
        path: &Path,
        options: &FileOptions<'_>,
    ) -> Result<TaskInfo> {
        let documents = load_documents_from_file(path, options.csv_delimiter).await?;
        self.add_documents(&documents, options.primary_key).await
    }

    pub async fn add_documents_from_file_in_batches(
        &self,
        path: &Path,
        batch_size: usize,
        options: &FileOptions<'_>,
    ) -> Result<Vec<TaskInfo>> {
        self.write_from_file(DocumentWrite::Add, path, Split::Count(batch_size), options)
            .await
    }

    pub async fn add_documents_from_directory(
        &self,
        directory: &Path,
        file_type: DocumentFileType,
        options: &FileOptions<'_>,
    ) -> Result<Vec<TaskInfo>> {
        self.write_from_directory(DocumentWrite::Add, directory, file_type, Split::Whole, options)
            .await
    }

    pub async fn add_documents_from_directory_in_batches(
        &self,
        directory: &Path,
        file_type: DocumentFileType,
        batch_size: usize,
        options: &FileOptions<'_>,
    ) -> Result<Vec<TaskInfo>> {
        self.write_from_directory(
            DocumentWrite::Add,
            directory,
            file_type,
            Split::Count(batch_size),
            options,
        )
        .await
    }

    pub async fn add_documents_from_directory_auto_batch(
        &self,
        directory: &Path,
        file_type: DocumentFileType,
        max_payload_size: usize,
        options: &FileOptions<'_>,
    ) -> Result<Vec<TaskInfo>> {
        self.write_from_directory(
            DocumentWrite::Add,
            directory,
            file_type,
            Split::Bytes(max_payload_size),
            options,
        )
        .await
    }

    pub async fn add_documents_from_raw_file(
        &self,
        path: &Path,
        options: &FileOptions<'_>,
    ) -> Result<TaskInfo> {
        self.write_raw_file(DocumentWrite::Add, path, options).await
    }

    // ── 🔁 update ────────────────────────────────────────────────────────

    pub async fn update_documents<T: Serialize>(
        &self,
        documents: &[T],
        primary_key: Option<&str>,
    ) -> Result<TaskInfo> {
        self.write_documents(DocumentWrite::Update, documents, primary_key)
            .await
    }

    pub async fn update_documents_in_batches<T: Serialize>(
        &self,
        documents: &[T],
        batch_size: usize,
        primary_key: Option<&str>,
    ) -> Result<Vec<TaskInfo>> {
        self.write_in_batches(DocumentWrite::Update, documents, batch_size, primary_key)
            .await
    }

    pub async fn update_documents_auto_batch<T: Serialize>(
        &self,
        documents: &[T],
        max_payload_size: usize,
        primary_key: Option<&str>,
    ) -> Result<Vec<TaskInfo>> {
        self.write_auto_batch(DocumentWrite::Update, documents, max_payload_size, primary_key)
            .await
    }

    pub async fn update_documents_from_file(
        &self,
        path: &Path,
        options: &FileOptions<'_>,
    ) -> Result<TaskInfo> {
        let documents = load_documents_from_file(path, options.csv_delimiter).await?;
        self.update_documents(&documents, options.primary_key).await
    }

    pub async fn update_documents_from_file_in_batches(
        &self,
        path: &Path,
        batch_size: usize,
        options: &FileOptions<'_>,
    ) -> Result<Vec<TaskInfo>> {
        self.write_from_file(DocumentWrite::Update, path, Split::Count(batch_size), options)
            .await
    }

    pub async fn update_documents_from_directory(
        &self,
        directory: &Path,
        file_type: DocumentFileType,
        options: &FileOptions<'_>,
    ) -> Result<Vec<TaskInfo>> {
        self.write_from_directory(
            DocumentWrite::Update,
            directory,
            file_type,
            Split::Whole,
            options,
        )
        .await
    }

    pub async fn update_documents_from_directory_in_batches(
        &self,
        directory: &Path,
        file_type: DocumentFileType,
        batch_size: usize,
        options: &FileOptions<'_>,
    ) -> Result<Vec<TaskInfo>> {
        self.write_from_directory(
            DocumentWrite::Update,
            directory,
            file_type,
            Split::Count(batch_size),
            options,
        )
        .await
    }

    pub async fn update_documents_from_directory_auto_batch(
        &self,
        directory: &Path,
        file_type: DocumentFileType,
        max_payload_size: usize,
        options: &FileOptions<'_>,
    ) -> Result<Vec<TaskInfo>> {
        self.write_from_directory(
            DocumentWrite::Update,
            directory,
            file_type,
            Split::Bytes(max_payload_size),
            options,
        )
        .await
    }

    pub async fn update_documents_from_raw_file(
        &self,
        path: &Path,
        options: &FileOptions<'_>,
    ) -> Result<TaskInfo> {
        self.write_raw_file(DocumentWrite::Update, path, options).await
    }

    // ── 🗑️ delete ────────────────────────────────────────────────────────

    async fn hooked_delete<F>(
        &self,
        registered: &[Arc<dyn Hook>],
        context: HookContext<'_>,
        request: F,
    ) -> Result<TaskInfo>
    where
        F: std::future::Future<Output = Result<TaskInfo>>,
    {
        hooks::run_event(registered, HookEvent::Pre, &context).await?;
        let task = hooks::run_concurrent(registered, &context, request).await?;
        hooks::run_task_post(registered, task).await
    }

    pub async fn delete_document(&self, document_id: &str) -> Result<TaskInfo> {
        let ids = [document_id.to_string()];
        let path = self.document_path(document_id);
        let request = self.http.send_empty(Method::DELETE, &path);
        self.hooked_delete(
            &self.hooks.delete_documents,
            HookContext::DocumentIds { ids: &ids },
            request,
        )
        .await
    }

    pub async fn delete_documents(&self, ids: &[String]) -> Result<TaskInfo> {
        let path = self.path("documents/delete-batch");
        let request = self.http.send_json(Method::POST, &path, ids, false);
        self.hooked_delete(
            &self.hooks.delete_documents,
            HookContext::DocumentIds { ids },
            request,
        )
        .await
    }

    /// 🧹 Delete everything matching a filter expression (string or nested arrays).
    pub async fn delete_documents_by_filter(&self, filter: impl Into<Value>) -> Result<TaskInfo> {
        let filter = filter.into();
        let body = json!({ "filter": filter });
        let path = self.path("documents/delete");
        let request = self.http.send_json(Method::POST, &path, &body, false);
        self.hooked_delete(
            &self.hooks.delete_documents,
            HookContext::Filter { filter: &filter },
            request,
        )
        .await
    }

    /// 🧹 One delete-by-filter task per filter, sent together, receipts in filter order.
    pub async fn delete_documents_in_batches_by_filter(&self, filters: &[Value]) -> Result<Vec<TaskInfo>> {
        let requests = filters
            .iter()
            .map(|filter| self.delete_documents_by_filter(filter.clone()))
            .collect::<Vec<_>>();
        try_join_all(requests).await
    }

    pub async fn delete_all_documents(&self) -> Result<TaskInfo> {
        let path = self.path("documents");
        let request = self.http.send_empty(Method::DELETE, &path);
        self.hooked_delete(&self.hooks.delete_all_documents, HookContext::DeleteAll, request)
            .await
    }

    // ── 🔍 search ────────────────────────────────────────────────────────

    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResults> {
        query.validate()?;
        let registered = &self.hooks.search;
        let context = HookContext::Search { query };

        hooks::run_event(registered, HookEvent::Pre, &context).await?;
        let path = self.path("search");
        let request = self.http.send_json(Method::POST, &path, query, false);
        let results = hooks::run_concurrent(registered, &context, request).await?;
        hooks::run_search_post(registered, results).await
    }

    /// 🔍 Like [`Index::search`], with hits deserialized into `T` after hooks ran.
    pub async fn search_as<T: DeserializeOwned>(&self, query: &SearchQuery) -> Result<SearchResults<T>> {
        let results = self.search(query).await?;
        Ok(serde_json::from_value(serde_json::to_value(results)?)?)
    }

    pub async fn facet_search(&self, query: &FacetSearchQuery) -> Result<FacetSearchResults> {
        query.search.validate()?;
        self.http
            .send_json(Method::POST, &self.path("facet-search"), query, false)
            .await
    }

    /// 🧲 Documents that sit near document `query.id` in the chosen embedder's space.
    pub async fn search_similar_documents(&self, query: &SimilarQuery) -> Result<SimilarSearchResults> {
        query.validate()?;
        self.http
            .send_json(Method::POST, &self.path("similar"), query, false)
            .await
    }

    // ── ⚙️ settings ──────────────────────────────────────────────────────

    pub async fn get_settings(&self) -> Result<Settings> {
        self.http.get(&self.path("settings")).await
    }

    pub async fn update_settings(&self, settings: &Settings) -> Result<TaskInfo> {
        self.http
            .send_json(Method::PATCH, &self.path("settings"), settings, self.compress)
            .await
    }

    pub async fn reset_settings(&self) -> Result<TaskInfo> {
        self.http.send_empty(Method::DELETE, &self.path("settings")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_config::ClientConfig;
    use crate::hooks::HookOutcome;
    use async_trait::async_trait;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn receipt(uid: u64) -> Value {
        json!({
            "taskUid": uid,
            "indexUid": "movies",
            "status": "enqueued",
            "type": "documentAdditionOrUpdate",
            "enqueuedAt": "2024-01-01T00:00:00Z"
        })
    }

    fn index_for(server: &MockServer) -> Index {
        let http = HttpRequests::new(&ClientConfig::new(server.uri())).expect("💀 client should build");
        Index::new(Arc::new(http), "movies")
    }

    #[tokio::test]
    async fn the_one_where_documents_go_in_with_their_primary_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/indexes/movies/documents"))
            .and(query_param("primaryKey", "id"))
            .and(body_json(json!([{"id": 1, "title": "Alien"}])))
            .respond_with(ResponseTemplate::new(202).set_body_json(receipt(1)))
            .expect(1)
            .mount(&server)
            .await;

        let task = index_for(&server)
            .add_documents(&[json!({"id": 1, "title": "Alien"})], Some("id"))
            .await
            .expect("💀 add should enqueue");
        assert_eq!(task.task_uid, 1);
    }

    #[tokio::test]
    async fn the_one_where_updates_use_put_in_fixed_batches() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/indexes/movies/documents"))
            .respond_with(ResponseTemplate::new(202).set_body_json(receipt(2)))
            .expect(3)
            .mount(&server)
            .await;

        let documents: Vec<Value> = (0..5).map(|id| json!({"id": id})).collect();
        let tasks = index_for(&server)
            .update_documents_in_batches(&documents, 2, None)
            .await
            .expect("💀 batched update should enqueue");
        assert_eq!(tasks.len(), 3);
    }

    #[tokio::test]
    async fn the_one_where_auto_batching_keeps_receipts_in_batch_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/indexes/movies/documents"))
            .and(body_json(json!([{"id": 1, "pad": "aaaaaaaaaa"}, {"id": 2, "pad": "aaaaaaaaaa"}])))
            .respond_with(ResponseTemplate::new(202).set_body_json(receipt(10)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/indexes/movies/documents"))
            .and(body_json(json!([{"id": 3, "pad": "aaaaaaaaaa"}])))
            .respond_with(ResponseTemplate::new(202).set_body_json(receipt(11)))
            .expect(1)
            .mount(&server)
            .await;

        // 🧪 each document is 27 bytes compact; two fit under 60, three do not
        let documents: Vec<Value> = (1..=3).map(|id| json!({"id": id, "pad": "aaaaaaaaaa"})).collect();
        let tasks = index_for(&server)
            .add_documents_auto_batch(&documents, 60, None)
            .await
            .expect("💀 auto batch should enqueue");
        let uids: Vec<u64> = tasks.iter().map(|task| task.task_uid).collect();
        assert_eq!(uids, vec![10, 11]);
    }

    #[tokio::test]
    async fn the_one_where_a_filter_sends_get_documents_down_the_post_route() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/indexes/movies/documents/fetch"))
            .and(body_json(json!({"offset": 0, "limit": 20, "filter": "genre = horror"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{"id": 1}], "offset": 0, "limit": 20, "total": 1
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/indexes/movies/documents"))
            .and(query_param("fields", "id,title"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [], "offset": 0, "limit": 20, "total": 0
            })))
            .expect(1)
            .mount(&server)
            .await;

        let index = index_for(&server);
        let filtered = index
            .get_documents(&DocumentsQuery::new().with_filter("genre = horror"))
            .await
            .expect("💀 filtered fetch should work");
        assert_eq!(filtered.total, 1);

        let plain = index
            .get_documents(&DocumentsQuery::new().with_fields(vec!["id".into(), "title".into()]))
            .await
            .expect("💀 plain fetch should work");
        assert_eq!(plain.total, 0);
    }

    #[tokio::test]
    async fn the_one_where_a_raw_csv_keeps_its_delimiter_and_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/indexes/movies/documents"))
            .and(query_param("csvDelimiter", ";"))
            .and(wiremock::matchers::header("content-type", "text/csv"))
            .respond_with(ResponseTemplate::new(202).set_body_json(receipt(5)))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().expect("💀 tempdir");
        let file = dir.path().join("movies.csv");
        std::fs::write(&file, "id;title\n1;Alien\n").expect("💀 write csv");

        let task = index_for(&server)
            .add_documents_from_raw_file(&file, &FileOptions::new().with_csv_delimiter(';'))
            .await
            .expect("💀 raw csv upload should enqueue");
        assert_eq!(task.task_uid, 5);
    }

    #[tokio::test]
    async fn the_one_where_a_json_file_refuses_a_csv_delimiter() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().expect("💀 tempdir");
        let file = dir.path().join("movies.json");
        std::fs::write(&file, "[]").expect("💀 write json");

        let error = index_for(&server)
            .add_documents_from_raw_file(&file, &FileOptions::new().with_csv_delimiter(';'))
            .await
            .expect_err("💀 delimiter on json should be rejected");
        assert!(matches!(error, MeilixError::Validation(_)));
    }

    #[tokio::test]
    async fn the_one_where_a_directory_uploads_one_task_per_file_unless_combined() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/indexes/movies/documents"))
            .respond_with(ResponseTemplate::new(202).set_body_json(receipt(3)))
            .expect(3)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().expect("💀 tempdir");
        std::fs::write(dir.path().join("a.json"), r#"[{"id": 1}]"#).expect("💀 write");
        std::fs::write(dir.path().join("b.json"), r#"[{"id": 2}]"#).expect("💀 write");

        let index = index_for(&server);
        let separate = index
            .add_documents_from_directory(
                dir.path(),
                DocumentFileType::Json,
                &FileOptions::new().combined(false),
            )
            .await
            .expect("💀 per-file upload should work");
        assert_eq!(separate.len(), 2);

        let combined = index
            .add_documents_from_directory(
                dir.path(),
                DocumentFileType::Json,
                &FileOptions::new().combined(true),
            )
            .await
            .expect("💀 combined upload should work");
        assert_eq!(combined.len(), 1);
    }

    #[test]
    fn the_one_where_directory_files_get_combined_unless_you_say_otherwise() {
        assert!(FileOptions::new().combine_documents);
        assert!(FileOptions::default().combine_documents);
        assert!(!FileOptions::new().combined(false).combine_documents);
    }

    #[tokio::test]
    async fn the_one_where_a_default_directory_upload_is_a_single_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/indexes/movies/documents"))
            .and(body_json(json!([{"id": 1}, {"id": 2}])))
            .respond_with(ResponseTemplate::new(202).set_body_json(receipt(4)))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().expect("💀 tempdir");
        std::fs::write(dir.path().join("a.json"), r#"[{"id": 1}]"#).expect("💀 write");
        std::fs::write(dir.path().join("b.json"), r#"[{"id": 2}]"#).expect("💀 write");

        let tasks = index_for(&server)
            .add_documents_from_directory(dir.path(), DocumentFileType::Json, &FileOptions::new())
            .await
            .expect("💀 default directory upload should work");
        assert_eq!(tasks.len(), 1);
    }

    #[tokio::test]
    async fn the_one_where_a_document_id_with_a_slash_and_a_space_stays_one_segment() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/indexes/movies/documents/star%20wars%2Fiv"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "star wars/iv"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/indexes/movies/documents/star%20wars%2Fiv"))
            .respond_with(ResponseTemplate::new(202).set_body_json(receipt(8)))
            .expect(1)
            .mount(&server)
            .await;

        let index = index_for(&server);
        let document = index
            .get_document("star wars/iv", None)
            .await
            .expect("💀 encoded id should be found");
        assert_eq!(document["id"], "star wars/iv");

        let task = index
            .delete_document("star wars/iv")
            .await
            .expect("💀 encoded id should be deleted");
        assert_eq!(task.task_uid, 8);
    }

    #[tokio::test]
    async fn the_one_where_each_filter_gets_its_own_delete_task() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/indexes/movies/documents/delete"))
            .and(body_json(json!({"filter": "genre = horror"})))
            .respond_with(ResponseTemplate::new(202).set_body_json(receipt(30)))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/indexes/movies/documents/delete"))
            .and(body_json(json!({"filter": ["year < 1980", "rating < 3"]})))
            .respond_with(ResponseTemplate::new(202).set_body_json(receipt(31)))
            .expect(1)
            .mount(&server)
            .await;

        let tasks = index_for(&server)
            .delete_documents_in_batches_by_filter(&[
                json!("genre = horror"),
                json!(["year < 1980", "rating < 3"]),
            ])
            .await
            .expect("💀 batched delete should enqueue");
        let uids: Vec<u64> = tasks.iter().map(|task| task.task_uid).collect();
        assert_eq!(uids, vec![30, 31]);
    }

    #[tokio::test]
    async fn the_one_where_similar_documents_come_from_the_similar_route() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/indexes/movies/similar"))
            .and(body_json(json!({
                "id": "143",
                "limit": 3,
                "embedder": "manual",
                "showRankingScore": false,
                "showRankingScoreDetails": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "hits": [{"id": "144"}, {"id": "150"}],
                "id": "143",
                "processingTimeMs": 4,
                "limit": 3,
                "offset": 0,
                "estimatedTotalHits": 2
            })))
            .expect(1)
            .mount(&server)
            .await;

        let results = index_for(&server)
            .search_similar_documents(&SimilarQuery::new("143").with_limit(3).with_embedder("manual"))
            .await
            .expect("💀 similar search should answer");
        assert_eq!(results.hits.len(), 2);
        assert_eq!(results.id, json!("143"));
        assert_eq!(results.estimated_total_hits, Some(2));
    }

    #[tokio::test]
    async fn the_one_where_delete_if_exists_shrugs_at_a_missing_index() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/indexes/movies"))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "message": "Index `movies` not found.",
                "code": "index_not_found",
                "type": "invalid_request",
                "link": "https://docs.meilisearch.com/errors#index_not_found"
            })))
            .mount(&server)
            .await;

        let existed = index_for(&server)
            .delete_if_exists()
            .await
            .expect("💀 missing index is not an error here");
        assert!(!existed);
    }

    #[tokio::test]
    async fn the_one_where_delete_by_filter_sends_the_filter_in_the_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/indexes/movies/documents/delete"))
            .and(body_json(json!({"filter": "year < 1990"})))
            .respond_with(ResponseTemplate::new(202).set_body_json(receipt(8)))
            .expect(1)
            .mount(&server)
            .await;

        let task = index_for(&server)
            .delete_documents_by_filter("year < 1990")
            .await
            .expect("💀 delete by filter should enqueue");
        assert_eq!(task.task_uid, 8);
    }

    /// 🧪 Adds a field to every document and rewrites the receipt's task uid.
    #[derive(Debug)]
    struct Meddler;

    #[async_trait]
    impl Hook for Meddler {
        fn events(&self) -> &[HookEvent] {
            &[HookEvent::Pre, HookEvent::Post]
        }

        async fn run(&self, _event: HookEvent, context: &HookContext<'_>) -> Result<HookOutcome> {
            match context {
                HookContext::Documents { documents, .. } => Ok(HookOutcome::ReplaceDocuments(
                    documents
                        .iter()
                        .map(|document| {
                            let mut document = document.clone();
                            document["meddled"] = json!(true);
                            document
                        })
                        .collect(),
                )),
                HookContext::Task { task } => {
                    let mut task = (*task).clone();
                    task.task_uid = 999;
                    Ok(HookOutcome::ReplaceTask(task))
                }
                _ => Ok(HookOutcome::Continue),
            }
        }
    }

    #[tokio::test]
    async fn the_one_where_hooks_meddle_on_the_way_in_and_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/indexes/movies/documents"))
            .and(body_json(json!([{"id": 1, "meddled": true}])))
            .respond_with(ResponseTemplate::new(202).set_body_json(receipt(1)))
            .expect(1)
            .mount(&server)
            .await;

        let index = index_for(&server)
            .with_hooks(IndexHooks::new().on_add_documents(Arc::new(Meddler)));
        let task = index
            .add_documents(&[json!({"id": 1})], None)
            .await
            .expect("💀 hooked add should enqueue");
        assert_eq!(task.task_uid, 999);
    }

    #[tokio::test]
    async fn the_one_where_search_hits_land_in_a_typed_struct() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Movie {
            id: u64,
            title: String,
        }

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/indexes/movies/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "hits": [{"id": 1, "title": "Alien"}],
                "offset": 0,
                "limit": 20,
                "estimatedTotalHits": 1,
                "processingTimeMs": 2,
                "query": "alien"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let results: SearchResults<Movie> = index_for(&server)
            .search_as(&SearchQuery::new("alien"))
            .await
            .expect("💀 search should work");
        assert_eq!(
            results.hits,
            vec![Movie {
                id: 1,
                title: "Alien".to_string()
            }]
        );
        assert_eq!(results.estimated_total_hits, Some(1));
    }
}
