//! 💀 Errors: every way talking to a search engine can go sideways, with names.
//!
//! 🧠 The library surface returns [`MeilixError`] so callers can `match` on what broke.
//! Config loading and the CLI stay on `anyhow`, because nobody pattern-matches a typo
//! in a TOML file. They just fix it and sigh.

use serde::Deserialize;
use thiserror::Error;

use crate::models::task::TaskResult;

/// 📦 Shorthand used across the crate. Saves keystrokes. Keystrokes are finite.
pub type Result<T> = std::result::Result<T, MeilixError>;

/// 📡 What the server said when it said "no".
///
/// Every field except `status` is optional because the body might not be JSON at all
/// (proxies love returning HTML error pages, like a cat bringing you a dead bird).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ApiError {
    /// 🔢 HTTP status code of the non-2xx response.
    pub status: u16,
    pub message: Option<String>,
    pub code: Option<String>,
    pub error_type: Option<String>,
    pub link: Option<String>,
    /// 🧾 The raw body, kept for the postmortem.
    pub body: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    code: Option<String>,
    #[serde(rename = "type")]
    error_type: Option<String>,
    link: Option<String>,
}

impl ApiError {
    /// 🔍 Parse a non-2xx response body. JSON bodies yield message/code/type/link,
    /// anything else leaves them empty and keeps the text around.
    pub fn from_response(status: u16, body: String) -> Self {
        let parsed = serde_json::from_str::<ErrorBody>(&body).ok();
        match parsed {
            Some(error_body) => ApiError {
                status,
                message: error_body.message,
                code: error_body.code,
                error_type: error_body.error_type,
                link: error_body.link,
                body,
            },
            None => ApiError {
                status,
                body,
                ..ApiError::default()
            },
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match (&self.code, &self.message) {
            (Some(code), Some(message)) => {
                write!(f, "status {} [{}]: {}", self.status, code, message)
            }
            (None, Some(message)) => write!(f, "status {}: {}", self.status, message),
            _ => write!(f, "status {}: {}", self.status, self.body),
        }
    }
}

/// 💀 The one enum to hold all the bad news.
#[derive(Debug, Error)]
pub enum MeilixError {
    /// 📡 Connection refused, DNS said nope, the socket timed out, the body got cut off.
    #[error("error communicating with Meilisearch: {0}")]
    Communication(#[source] reqwest::Error),

    /// 🚫 The server answered, and the answer was a non-2xx status.
    #[error("Meilisearch API error: {0}")]
    Api(ApiError),

    /// ⏳ We polled, we waited, we aged.
    #[error(
        "timeout of {timeout_ms}ms has exceeded on process {task_uid} when waiting for pending update to resolve."
    )]
    Timeout { task_uid: u64, timeout_ms: u64 },

    /// 🔥 The task finished, and it finished badly.
    #[error("task {task_uid} failed{}", failure_suffix(.result))]
    TaskFailed {
        task_uid: u64,
        result: Box<TaskResult>,
    },

    /// 🔍 404 on a batch uid.
    #[error("Batch {batch_uid} not found")]
    BatchNotFound { batch_uid: u64 },

    /// 🐘 A single document that serializes bigger than the whole payload budget.
    #[error("document of {size} bytes exceeds the max payload size of {max} bytes")]
    PayloadTooLarge { size: usize, max: usize },

    /// 📄 Documents that came out of a file in a shape Meilisearch won't accept.
    #[error("invalid documents: {0}")]
    InvalidDocument(String),

    /// 🙅 Arguments that were never going to work.
    #[error("invalid argument: {0}")]
    Validation(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

fn failure_suffix(result: &TaskResult) -> String {
    result
        .error
        .as_ref()
        .and_then(|error| error.get("message"))
        .and_then(|message| message.as_str())
        .map(|message| format!(": {message}"))
        .unwrap_or_default()
}

impl MeilixError {
    /// 🔍 True when the server reported an `index_not_found` error code.
    pub fn is_index_not_found(&self) -> bool {
        matches!(
            self,
            MeilixError::Api(ApiError { code: Some(code), .. }) if code.contains("index_not_found")
        )
    }

    /// 🔢 HTTP status of an API error, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            MeilixError::Api(api_error) => Some(api_error.status),
            _ => None,
        }
    }
}

impl From<csv::Error> for MeilixError {
    fn from(error: csv::Error) -> Self {
        MeilixError::InvalidDocument(format!("csv: {error}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_the_server_explains_itself_in_json() {
        let body = r#"{"message":"Index `movies` not found.","code":"index_not_found","type":"invalid_request","link":"https://docs.meilisearch.com/errors#index_not_found"}"#;
        let api_error = ApiError::from_response(404, body.to_string());

        assert_eq!(api_error.status, 404);
        assert_eq!(api_error.code.as_deref(), Some("index_not_found"));
        assert_eq!(api_error.error_type.as_deref(), Some("invalid_request"));
        assert_eq!(api_error.message.as_deref(), Some("Index `movies` not found."));
        assert!(MeilixError::Api(api_error).is_index_not_found());
    }

    #[test]
    fn the_one_where_the_proxy_returns_html_and_we_keep_calm() {
        // 🧪 Gateways gonna gateway.
        let api_error = ApiError::from_response(502, "<html>bad gateway</html>".to_string());

        assert_eq!(api_error.status, 502);
        assert!(api_error.code.is_none());
        assert!(api_error.message.is_none());
        assert_eq!(api_error.to_string(), "status 502: <html>bad gateway</html>");
        assert!(!MeilixError::Api(api_error).is_index_not_found());
    }

    #[test]
    fn the_one_where_the_timeout_message_reads_like_a_eulogy() {
        let error = MeilixError::Timeout {
            task_uid: 42,
            timeout_ms: 5000,
        };
        assert_eq!(
            error.to_string(),
            "timeout of 5000ms has exceeded on process 42 when waiting for pending update to resolve."
        );
        assert_eq!(error.status(), None);
    }

    #[test]
    fn the_one_where_a_missing_batch_gets_a_polite_obituary() {
        let error = MeilixError::BatchNotFound { batch_uid: 7 };
        assert_eq!(error.to_string(), "Batch 7 not found");
    }
}
