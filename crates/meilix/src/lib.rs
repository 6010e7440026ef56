//! 🔎 meilix: a Meilisearch client. Indexes, documents, search, settings, and a lot of waiting.
//!
//! 🧠 Every write in Meilisearch is a task. You send documents, you get a receipt, and
//! then you poll until the server is done thinking. This crate does the sending, the
//! polling, and the slicing of big document sets into payloads the server will accept.
//!
//! ```no_run
//! # async fn demo() -> meilix::Result<()> {
//! use meilix::{Client, WaitOptions};
//! use serde_json::json;
//!
//! let client = Client::new("http://localhost:7700", Some("masterKey"))?;
//! let index = client.index("movies");
//! let task = index.add_documents(&[json!({"id": 1, "title": "Alien"})], Some("id")).await?;
//! index.wait_for_task(task.task_uid, &WaitOptions::default()).await?;
//! # Ok(())
//! # }
//! ```
//!
//! 🧱 Not async? [`blocking`] has the same API without the `.await`s.

pub mod app_config;
mod batches;
pub mod batching;
pub mod blocking;
mod client;
pub mod errors;
pub mod files;
pub mod hooks;
mod http;
mod index;
pub mod models;
mod tasks;

pub use client::Client;
pub use errors::{ApiError, MeilixError, Result};
pub use index::{DocumentsQuery, FileOptions, Index};
pub use tasks::{DEFAULT_INTERVAL_MS, DEFAULT_TIMEOUT_MS, Page, TaskFilter, WaitOptions};

/// 🏷️ Sent along in the `User-Agent`, so the server knows who to blame.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
