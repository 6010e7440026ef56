//! 📦 Wire models. Everything Meilisearch sends back, given a type and a name.
//!
//! 🧠 Meilisearch speaks camelCase, Rust speaks snake_case, serde translates.
//! Like a UN interpreter, but for JSON, and it never asks for a coffee break.

pub mod batch;
pub mod client;
pub mod documents;
pub mod index;
pub mod search;
pub mod settings;
pub mod task;

pub use batch::{BatchPage, BatchResult, BatchStats, BatchStatusCounts};
pub use client::{ClientStats, Health, Version};
pub use documents::DocumentsInfo;
pub use index::{IndexInfo, IndexPage, IndexStats};
pub use search::{
    FacetHit, FacetSearchQuery, FacetSearchResults, FederatedSearchResults, Federation, Hybrid,
    MatchingStrategy, MultiSearchQuery, SearchQuery, SearchResults, SearchResultsWithUid,
    SimilarQuery, SimilarSearchResults,
};
pub use settings::{Faceting, MinWordSizeForTypos, Pagination, ProximityPrecision, Settings, TypoTolerance};
pub use task::{TaskInfo, TaskPage, TaskResult, TaskStatus, TaskType};
