//! 🪝 Hooks: user code that runs before, alongside, or after index operations.
//!
//! 🧠 A hook declares which [`HookEvent`]s it cares about and gets called with a
//! [`HookContext`] describing the operation. Hooks run in registration order.
//!
//! - `Pre` runs before the request. Document hooks may hand back replacement documents,
//!   and the next hook sees the replaced set.
//! - `Concurrent` runs while the request is in flight. Outcomes are ignored, errors are not.
//! - `Post` runs after the response. It may replace the returned task or search results.
//!
//! 🦆 The duck is a hook too, if you believe in it.

use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::try_join_all;
use serde_json::Value;
use tracing::trace;

use crate::errors::Result;
use crate::models::search::{SearchQuery, SearchResults};
use crate::models::task::TaskInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookEvent {
    Pre,
    Concurrent,
    Post,
}

/// 📋 What the operation is about, borrowed for the duration of the hook call.
#[derive(Debug, Clone, Copy)]
pub enum HookContext<'a> {
    Documents {
        documents: &'a [Value],
        primary_key: Option<&'a str>,
    },
    DocumentIds {
        ids: &'a [String],
    },
    Filter {
        filter: &'a Value,
    },
    DeleteAll,
    Search {
        query: &'a SearchQuery,
    },
    Task {
        task: &'a TaskInfo,
    },
    SearchResults {
        results: &'a SearchResults,
    },
}

/// 🔁 What a hook wants done with the operation's data.
#[derive(Debug, Clone, PartialEq)]
pub enum HookOutcome {
    Continue,
    ReplaceDocuments(Vec<Value>),
    ReplaceTask(TaskInfo),
    ReplaceSearchResults(SearchResults),
}

#[async_trait]
pub trait Hook: Send + Sync + Debug {
    /// 🎯 The events this hook wants to hear about.
    fn events(&self) -> &[HookEvent];

    async fn run(&self, event: HookEvent, context: &HookContext<'_>) -> Result<HookOutcome>;
}

/// 📦 Hooks registered per index operation. Deletion hooks cover single, batch, and
/// filter deletes.
#[derive(Debug, Clone, Default)]
pub struct IndexHooks {
    pub add_documents: Vec<Arc<dyn Hook>>,
    pub update_documents: Vec<Arc<dyn Hook>>,
    pub delete_documents: Vec<Arc<dyn Hook>>,
    pub delete_all_documents: Vec<Arc<dyn Hook>>,
    pub search: Vec<Arc<dyn Hook>>,
}

impl IndexHooks {
    pub fn new() -> Self {
        IndexHooks::default()
    }

    pub fn on_add_documents(mut self, hook: Arc<dyn Hook>) -> Self {
        self.add_documents.push(hook);
        self
    }

    pub fn on_update_documents(mut self, hook: Arc<dyn Hook>) -> Self {
        self.update_documents.push(hook);
        self
    }

    pub fn on_delete_documents(mut self, hook: Arc<dyn Hook>) -> Self {
        self.delete_documents.push(hook);
        self
    }

    pub fn on_delete_all_documents(mut self, hook: Arc<dyn Hook>) -> Self {
        self.delete_all_documents.push(hook);
        self
    }

    pub fn on_search(mut self, hook: Arc<dyn Hook>) -> Self {
        self.search.push(hook);
        self
    }
}

fn listening(hooks: &[Arc<dyn Hook>], event: HookEvent) -> impl Iterator<Item = &Arc<dyn Hook>> {
    hooks.iter().filter(move |hook| hook.events().contains(&event))
}

/// 📄 Run `Pre` hooks over documents, threading replacements from one hook to the next.
pub(crate) async fn run_document_pre(
    hooks: &[Arc<dyn Hook>],
    mut documents: Vec<Value>,
    primary_key: Option<&str>,
) -> Result<Vec<Value>> {
    for hook in listening(hooks, HookEvent::Pre) {
        let context = HookContext::Documents {
            documents: &documents,
            primary_key,
        };
        if let HookOutcome::ReplaceDocuments(replaced) = hook.run(HookEvent::Pre, &context).await? {
            trace!("🪝 {:?} swapped {} documents for {}", hook, documents.len(), replaced.len());
            documents = replaced;
        }
    }
    Ok(documents)
}

/// 🔔 Run hooks for one event and ignore their outcomes.
pub(crate) async fn run_event(
    hooks: &[Arc<dyn Hook>],
    event: HookEvent,
    context: &HookContext<'_>,
) -> Result<()> {
    for hook in listening(hooks, event) {
        hook.run(event, context).await?;
    }
    Ok(())
}

/// ⚡ Drive `Concurrent` hooks and the request together. The request's result wins,
/// but a failing hook fails the call.
pub(crate) async fn run_concurrent<R, F>(
    hooks: &[Arc<dyn Hook>],
    context: &HookContext<'_>,
    request: F,
) -> Result<R>
where
    F: Future<Output = Result<R>>,
{
    let concurrent = listening(hooks, HookEvent::Concurrent)
        .map(|hook| hook.run(HookEvent::Concurrent, context))
        .collect::<Vec<_>>();
    if concurrent.is_empty() {
        return request.await;
    }
    let (response, outcomes) = futures::join!(request, try_join_all(concurrent));
    outcomes?;
    response
}

/// 🧾 Run `Post` hooks over a task receipt.
pub(crate) async fn run_task_post(hooks: &[Arc<dyn Hook>], mut task: TaskInfo) -> Result<TaskInfo> {
    for hook in listening(hooks, HookEvent::Post) {
        let outcome = hook
            .run(HookEvent::Post, &HookContext::Task { task: &task })
            .await?;
        if let HookOutcome::ReplaceTask(replaced) = outcome {
            task = replaced;
        }
    }
    Ok(task)
}

/// 🔍 Run `Post` hooks over search results.
pub(crate) async fn run_search_post(
    hooks: &[Arc<dyn Hook>],
    mut results: SearchResults,
) -> Result<SearchResults> {
    for hook in listening(hooks, HookEvent::Post) {
        let outcome = hook
            .run(HookEvent::Post, &HookContext::SearchResults { results: &results })
            .await?;
        if let HookOutcome::ReplaceSearchResults(replaced) = outcome {
            results = replaced;
        }
    }
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::MeilixError;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// 🧪 Stamps every document with its name, so we can see the order hooks ran in.
    #[derive(Debug)]
    struct Stamper(&'static str);

    #[async_trait]
    impl Hook for Stamper {
        fn events(&self) -> &[HookEvent] {
            &[HookEvent::Pre]
        }

        async fn run(&self, _event: HookEvent, context: &HookContext<'_>) -> Result<HookOutcome> {
            let HookContext::Documents { documents, .. } = context else {
                return Ok(HookOutcome::Continue);
            };
            let stamped = documents
                .iter()
                .map(|document| {
                    let mut document = document.clone();
                    let trail = document["trail"].as_str().unwrap_or_default().to_string();
                    document["trail"] = json!(format!("{trail}{}", self.0));
                    document
                })
                .collect();
            Ok(HookOutcome::ReplaceDocuments(stamped))
        }
    }

    #[derive(Debug, Default)]
    struct Counter(AtomicUsize);

    #[async_trait]
    impl Hook for Counter {
        fn events(&self) -> &[HookEvent] {
            &[HookEvent::Concurrent]
        }

        async fn run(&self, _event: HookEvent, _context: &HookContext<'_>) -> Result<HookOutcome> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(HookOutcome::Continue)
        }
    }

    #[derive(Debug)]
    struct Grumpy;

    #[async_trait]
    impl Hook for Grumpy {
        fn events(&self) -> &[HookEvent] {
            &[HookEvent::Concurrent]
        }

        async fn run(&self, _event: HookEvent, _context: &HookContext<'_>) -> Result<HookOutcome> {
            Err(MeilixError::Validation("not today".to_string()))
        }
    }

    #[tokio::test]
    async fn the_one_where_pre_hooks_pass_the_baton_in_order() {
        let hooks: Vec<Arc<dyn Hook>> = vec![Arc::new(Stamper("a")), Arc::new(Stamper("b"))];
        let documents = run_document_pre(&hooks, vec![json!({"id": 1})], Some("id"))
            .await
            .expect("💀 hooks should run");
        assert_eq!(documents, vec![json!({"id": 1, "trail": "ab"})]);
    }

    #[tokio::test]
    async fn the_one_where_concurrent_hooks_ride_along_with_the_request() {
        let counter = Arc::new(Counter::default());
        let hooks: Vec<Arc<dyn Hook>> = vec![counter.clone() as Arc<dyn Hook>, Arc::new(Stamper("ignored"))];

        let answer = run_concurrent(&hooks, &HookContext::DeleteAll, async { Ok(42) })
            .await
            .expect("💀 request should win");
        assert_eq!(answer, 42);
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn the_one_where_a_grumpy_concurrent_hook_spoils_the_party() {
        let hooks: Vec<Arc<dyn Hook>> = vec![Arc::new(Grumpy)];
        let result = run_concurrent(&hooks, &HookContext::DeleteAll, async { Ok(42) }).await;
        assert!(matches!(result, Err(MeilixError::Validation(_))));
    }
}
