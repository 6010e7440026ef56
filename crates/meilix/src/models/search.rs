//! 🔍 Search request and response shapes.
//!
//! 🧠 `SearchQuery` starts with the defaults Meilisearch clients have always shipped
//! (offset 0, limit 20, crop length 200, `<em>` tags, `...` crop marker, `last`
//! matching, retrieve everything) and grows via `with_*` builder calls.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{MeilixError, Result};

/// 🎯 How many query words must match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchingStrategy {
    All,
    #[default]
    Last,
    Frequency,
}

/// 🧬 Hybrid (keyword + semantic) search knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hybrid {
    pub semantic_ratio: f64,
    pub embedder: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub q: Option<String>,
    pub offset: u32,
    pub limit: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facets: Option<Vec<String>>,
    pub attributes_to_retrieve: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes_to_crop: Option<Vec<String>>,
    pub crop_length: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes_to_highlight: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Vec<String>>,
    pub show_matches_position: bool,
    pub highlight_pre_tag: String,
    pub highlight_post_tag: String,
    pub crop_marker: String,
    pub matching_strategy: MatchingStrategy,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hits_per_page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes_to_search_on: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distinct: Option<String>,
    pub show_ranking_score: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub show_ranking_score_details: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranking_score_threshold: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vector: Option<Vec<f32>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hybrid: Option<Hybrid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locales: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieve_vectors: Option<bool>,
}

impl Default for SearchQuery {
    fn default() -> Self {
        SearchQuery {
            q: None,
            offset: 0,
            limit: 20,
            filter: None,
            facets: None,
            attributes_to_retrieve: vec!["*".to_string()],
            attributes_to_crop: None,
            crop_length: 200,
            attributes_to_highlight: None,
            sort: None,
            show_matches_position: false,
            highlight_pre_tag: "<em>".to_string(),
            highlight_post_tag: "</em>".to_string(),
            crop_marker: "...".to_string(),
            matching_strategy: MatchingStrategy::Last,
            hits_per_page: None,
            page: None,
            attributes_to_search_on: None,
            distinct: None,
            show_ranking_score: false,
            show_ranking_score_details: false,
            ranking_score_threshold: None,
            vector: None,
            hybrid: None,
            locales: None,
            retrieve_vectors: None,
        }
    }
}

impl SearchQuery {
    pub fn new(q: impl Into<String>) -> Self {
        SearchQuery {
            q: Some(q.into()),
            ..SearchQuery::default()
        }
    }

    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// 🧹 Filter as a string (`"genre = horror"`) or nested arrays of strings.
    pub fn with_filter(mut self, filter: impl Into<Value>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_facets(mut self, facets: Vec<String>) -> Self {
        self.facets = Some(facets);
        self
    }

    pub fn with_attributes_to_retrieve(mut self, attributes: Vec<String>) -> Self {
        self.attributes_to_retrieve = attributes;
        self
    }

    pub fn with_attributes_to_crop(mut self, attributes: Vec<String>, crop_length: u32) -> Self {
        self.attributes_to_crop = Some(attributes);
        self.crop_length = crop_length;
        self
    }

    pub fn with_attributes_to_highlight(mut self, attributes: Vec<String>) -> Self {
        self.attributes_to_highlight = Some(attributes);
        self
    }

    pub fn with_sort(mut self, sort: Vec<String>) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn with_matching_strategy(mut self, strategy: MatchingStrategy) -> Self {
        self.matching_strategy = strategy;
        self
    }

    /// 📖 Switch to exhaustive page-based pagination.
    pub fn with_page(mut self, page: u32, hits_per_page: u32) -> Self {
        self.page = Some(page);
        self.hits_per_page = Some(hits_per_page);
        self
    }

    pub fn with_distinct(mut self, attribute: impl Into<String>) -> Self {
        self.distinct = Some(attribute.into());
        self
    }

    pub fn with_ranking_score(mut self, show_details: bool) -> Self {
        self.show_ranking_score = true;
        self.show_ranking_score_details = show_details;
        self
    }

    pub fn with_ranking_score_threshold(mut self, threshold: f64) -> Self {
        self.ranking_score_threshold = Some(threshold);
        self
    }

    pub fn with_hybrid(mut self, hybrid: Hybrid) -> Self {
        self.hybrid = Some(hybrid);
        self
    }

    pub fn with_vector(mut self, vector: Vec<f32>) -> Self {
        self.vector = Some(vector);
        self
    }

    pub fn with_locales(mut self, locales: Vec<String>) -> Self {
        self.locales = Some(locales);
        self
    }

    /// ✅ Reject arguments the server would reject anyway, before paying for a round trip.
    pub fn validate(&self) -> Result<()> {
        validate_threshold(self.ranking_score_threshold)
    }
}

fn validate_threshold(threshold: Option<f64>) -> Result<()> {
    if let Some(threshold) = threshold {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(MeilixError::Validation(
                "ranking_score_threshold must be between 0.0 and 1.0".to_string(),
            ));
        }
    }
    Ok(())
}

/// 📬 What came back from a search. `T` defaults to raw JSON hits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResults<T = Value> {
    pub hits: Vec<T>,
    pub offset: Option<u32>,
    pub limit: Option<u32>,
    pub estimated_total_hits: Option<u64>,
    pub processing_time_ms: u64,
    pub query: String,
    pub facet_distribution: Option<Value>,
    pub total_pages: Option<u32>,
    pub total_hits: Option<u64>,
    pub page: Option<u32>,
    pub hits_per_page: Option<u32>,
    pub semantic_hit_count: Option<u64>,
}

/// 🏷️ Facet search: a regular query plus the facet being searched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetSearchQuery {
    pub facet_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facet_query: Option<String>,
    #[serde(flatten)]
    pub search: SearchQuery,
}

impl FacetSearchQuery {
    pub fn new(facet_name: impl Into<String>) -> Self {
        FacetSearchQuery {
            facet_name: facet_name.into(),
            facet_query: None,
            search: SearchQuery::default(),
        }
    }

    pub fn with_facet_query(mut self, facet_query: impl Into<String>) -> Self {
        self.facet_query = Some(facet_query.into());
        self
    }

    pub fn with_search(mut self, search: SearchQuery) -> Self {
        self.search = search;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetHit {
    pub value: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FacetSearchResults {
    pub facet_hits: Vec<FacetHit>,
    pub facet_query: Option<String>,
    pub processing_time_ms: u64,
}

/// 🗂️ One entry of a multi-search: a regular query aimed at a named index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiSearchQuery {
    pub index_uid: String,
    #[serde(flatten)]
    pub search: SearchQuery,
}

impl MultiSearchQuery {
    pub fn new(index_uid: impl Into<String>, search: SearchQuery) -> Self {
        MultiSearchQuery {
            index_uid: index_uid.into(),
            search,
        }
    }
}

/// 🪢 Merge multi-search results into one ranked list. Pagination lives here, not per query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Federation {
    pub limit: u32,
    pub offset: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub facets_by_index: Option<BTreeMap<String, Vec<String>>>,
}

impl Default for Federation {
    fn default() -> Self {
        Federation {
            limit: 20,
            offset: 0,
            facets_by_index: None,
        }
    }
}

impl Federation {
    pub fn new() -> Self {
        Federation::default()
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = offset;
        self
    }

    pub fn with_facets_by_index(mut self, facets_by_index: BTreeMap<String, Vec<String>>) -> Self {
        self.facets_by_index = Some(facets_by_index);
        self
    }
}

/// 📬 One non-federated multi-search answer, tagged with the index it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultsWithUid<T = Value> {
    pub index_uid: String,
    #[serde(flatten)]
    pub results: SearchResults<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct MultiSearchResponse {
    pub(crate) results: Vec<SearchResultsWithUid>,
}

/// 🪢 The single merged answer of a federated multi-search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FederatedSearchResults<T = Value> {
    pub hits: Vec<T>,
    pub offset: Option<u32>,
    pub limit: Option<u32>,
    pub estimated_total_hits: Option<u64>,
    pub processing_time_ms: u64,
    pub facet_distribution: Option<Value>,
    pub total_pages: Option<u32>,
    pub total_hits: Option<u64>,
    pub page: Option<u32>,
    pub hits_per_page: Option<u32>,
    pub semantic_hit_count: Option<u64>,
    pub facets_by_index: Option<Value>,
}

/// 🧲 "More like this one": documents whose embeddings sit close to document `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarQuery {
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter: Option<Value>,
    pub embedder: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes_to_retrieve: Option<Vec<String>>,
    pub show_ranking_score: bool,
    pub show_ranking_score_details: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranking_score_threshold: Option<f64>,
}

impl SimilarQuery {
    /// Ids can be strings or integers, same as primary keys.
    pub fn new(id: impl Into<Value>) -> Self {
        SimilarQuery {
            id: id.into(),
            offset: None,
            limit: None,
            filter: None,
            embedder: "default".to_string(),
            attributes_to_retrieve: None,
            show_ranking_score: false,
            show_ranking_score_details: false,
            ranking_score_threshold: None,
        }
    }

    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_filter(mut self, filter: impl Into<Value>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn with_embedder(mut self, embedder: impl Into<String>) -> Self {
        self.embedder = embedder.into();
        self
    }

    pub fn with_attributes_to_retrieve(mut self, attributes: Vec<String>) -> Self {
        self.attributes_to_retrieve = Some(attributes);
        self
    }

    pub fn with_ranking_score(mut self, show_details: bool) -> Self {
        self.show_ranking_score = true;
        self.show_ranking_score_details = show_details;
        self
    }

    pub fn with_ranking_score_threshold(mut self, threshold: f64) -> Self {
        self.ranking_score_threshold = Some(threshold);
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_threshold(self.ranking_score_threshold)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarSearchResults<T = Value> {
    pub hits: Vec<T>,
    pub id: Value,
    pub processing_time_ms: u64,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub estimated_total_hits: Option<u64>,
}
