//! 📦 Batches: read-only views of how the server grouped tasks.

use tracing::debug;

use crate::errors::{MeilixError, Result};
use crate::http::{HttpRequests, with_query};
use crate::models::batch::{BatchPage, BatchResult};
use crate::tasks::{Page, TaskFilter};

const DEFAULT_BATCH_LIMIT: u32 = 20;

/// 🔍 `GET /batches/{uid}`. A 404 becomes [`MeilixError::BatchNotFound`].
pub(crate) async fn get_batch(http: &HttpRequests, batch_uid: u64) -> Result<BatchResult> {
    match http.get(&format!("batches/{batch_uid}")).await {
        Err(MeilixError::Api(api_error)) if api_error.status == 404 => {
            debug!("🔍 batch {} is not a thing", batch_uid);
            Err(MeilixError::BatchNotFound { batch_uid })
        }
        other => other,
    }
}

/// 📚 `GET /batches`. `limit` and `reverse` always go on the wire, defaulting to 20 and false.
pub(crate) async fn get_batches(
    http: &HttpRequests,
    filter: &TaskFilter,
    page: &Page,
) -> Result<BatchPage> {
    let mut pairs = filter.to_query_pairs();
    pairs.push(("limit", page.limit.unwrap_or(DEFAULT_BATCH_LIMIT).to_string()));
    if let Some(from) = page.from {
        pairs.push(("from", from.to_string()));
    }
    pairs.push(("reverse", page.reverse.unwrap_or(false).to_string()));
    http.get(&with_query("batches", &pairs)).await
}
