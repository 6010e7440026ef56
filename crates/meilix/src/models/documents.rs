use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 📄 A page of documents from `GET /indexes/{uid}/documents` or `POST .../documents/fetch`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentsInfo {
    pub results: Vec<Value>,
    pub offset: u32,
    pub limit: u32,
    pub total: u64,
}
