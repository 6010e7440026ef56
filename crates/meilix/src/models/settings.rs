//! ⚙️ Index settings. Every field optional, every unset field left off the wire,
//! so a PATCH only touches what you actually meant to touch.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinWordSizeForTypos {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub one_typo: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub two_typos: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypoTolerance {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_on_attributes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disable_on_words: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_word_size_for_typos: Option<MinWordSizeForTypos>,
}

impl Default for TypoTolerance {
    fn default() -> Self {
        TypoTolerance {
            enabled: true,
            disable_on_attributes: None,
            disable_on_words: None,
            min_word_size_for_typos: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Faceting {
    pub max_values_per_facet: u32,
    /// 🔤 Facet name to `"alpha"` or `"count"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_facet_values_by: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub max_total_hits: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProximityPrecision {
    #[serde(rename = "byWord")]
    ByWord,
    #[serde(rename = "byAttribute")]
    ByAttribute,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub synonyms: Option<BTreeMap<String, Vec<String>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_words: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ranking_rules: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filterable_attributes: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distinct_attribute: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub searchable_attributes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub displayed_attributes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sortable_attributes: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typo_tolerance: Option<TypoTolerance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub faceting: Option<Faceting>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proximity_precision: Option<ProximityPrecision>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub separator_tokens: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub non_separator_tokens: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_cutoff_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dictionary: Option<Vec<String>>,
    /// 🧬 Embedder configs by name. Kept as raw JSON, the shapes change faster than we do.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedders: Option<BTreeMap<String, Value>>,
}

impl Settings {
    pub fn new() -> Self {
        Settings::default()
    }

    pub fn with_filterable_attributes(mut self, attributes: Vec<String>) -> Self {
        self.filterable_attributes = Some(attributes.into_iter().map(Value::String).collect());
        self
    }

    pub fn with_sortable_attributes(mut self, attributes: Vec<String>) -> Self {
        self.sortable_attributes = Some(attributes);
        self
    }

    pub fn with_searchable_attributes(mut self, attributes: Vec<String>) -> Self {
        self.searchable_attributes = Some(attributes);
        self
    }

    pub fn with_ranking_rules(mut self, rules: Vec<String>) -> Self {
        self.ranking_rules = Some(rules);
        self
    }

    pub fn with_stop_words(mut self, words: Vec<String>) -> Self {
        self.stop_words = Some(words);
        self
    }

    pub fn with_distinct_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.distinct_attribute = Some(attribute.into());
        self
    }
}
