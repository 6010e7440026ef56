//! 📂 Document files: JSON arrays, NDJSON, and CSV, off the disk and into `Vec<Value>`.
//!
//! 🧠 The extension picks the parser. `.json` must hold an array, `.ndjson` holds one
//! document per line, `.csv` becomes one object per row keyed by the header. Anything
//! else is turned away at the door.

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::errors::{MeilixError, Result};
use crate::http;

/// 📄 The three file formats Meilisearch accepts for documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentFileType {
    Json,
    Ndjson,
    Csv,
}

impl DocumentFileType {
    /// 🔍 Pick a format from a path's extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        match path.extension().and_then(|extension| extension.to_str()) {
            Some("json") => Ok(DocumentFileType::Json),
            Some("ndjson") => Ok(DocumentFileType::Ndjson),
            Some("csv") => Ok(DocumentFileType::Csv),
            _ => Err(MeilixError::Validation(
                "File must be a json, ndjson, or csv file".to_string(),
            )),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            DocumentFileType::Json => "json",
            DocumentFileType::Ndjson => "ndjson",
            DocumentFileType::Csv => "csv",
        }
    }

    pub(crate) fn content_type(self) -> &'static str {
        match self {
            DocumentFileType::Json => http::JSON,
            DocumentFileType::Ndjson => http::NDJSON,
            DocumentFileType::Csv => http::CSV,
        }
    }
}

impl std::str::FromStr for DocumentFileType {
    type Err = MeilixError;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim_start_matches('.') {
            "json" => Ok(DocumentFileType::Json),
            "ndjson" => Ok(DocumentFileType::Ndjson),
            "csv" => Ok(DocumentFileType::Csv),
            _ => Err(MeilixError::Validation(
                "File must be a json, ndjson, or csv file".to_string(),
            )),
        }
    }
}

/// 🔤 A CSV delimiter has to be one ASCII character. No emoji. We checked.
pub fn validate_csv_delimiter(delimiter: char) -> Result<u8> {
    if delimiter.is_ascii() {
        Ok(delimiter as u8)
    } else {
        Err(MeilixError::Validation(
            "csv_delimiter must be a single ascii character".to_string(),
        ))
    }
}

/// 📥 Read one document file.
pub async fn load_documents_from_file(path: &Path, csv_delimiter: Option<char>) -> Result<Vec<Value>> {
    let file_type = DocumentFileType::from_path(path)?;
    let delimiter = match (file_type, csv_delimiter) {
        (DocumentFileType::Csv, Some(delimiter)) => Some(validate_csv_delimiter(delimiter)?),
        _ => None,
    };

    let bytes = tokio::fs::read(path).await?;
    trace!("📂 read {} bytes from {}", bytes.len(), path.display());

    let documents = match file_type {
        DocumentFileType::Json => parse_json_array(&bytes)?,
        DocumentFileType::Ndjson => parse_ndjson(&bytes)?,
        DocumentFileType::Csv => parse_csv(&bytes, delimiter)?,
    };
    debug!("📄 loaded {} documents from {}", documents.len(), path.display());
    Ok(documents)
}

fn parse_json_array(bytes: &[u8]) -> Result<Vec<Value>> {
    match serde_json::from_slice::<Value>(bytes)? {
        Value::Array(documents) => Ok(documents),
        _ => Err(MeilixError::InvalidDocument(
            "Meilisearch requires documents to be in a list".to_string(),
        )),
    }
}

/// 🔍 One JSON value per line, found with memchr. Blank lines are skipped.
pub(crate) fn parse_ndjson(bytes: &[u8]) -> Result<Vec<Value>> {
    let mut documents = Vec::new();
    let mut line_start = 0;
    let line_ends = memchr::memchr_iter(b'\n', bytes).chain(std::iter::once(bytes.len()));
    for line_end in line_ends {
        let line = bytes[line_start..line_end].trim_ascii();
        line_start = line_end + 1;
        if line.is_empty() {
            continue;
        }
        documents.push(serde_json::from_slice(line)?);
    }
    Ok(documents)
}

fn parse_csv(bytes: &[u8], delimiter: Option<u8>) -> Result<Vec<Value>> {
    let mut builder = csv::ReaderBuilder::new();
    if let Some(delimiter) = delimiter {
        builder.delimiter(delimiter);
    }
    let mut reader = builder.from_reader(bytes);
    let headers = reader.headers()?.clone();

    let mut documents = Vec::new();
    for record in reader.records() {
        let record = record?;
        let document = headers
            .iter()
            .zip(record.iter())
            .map(|(header, field)| (header.to_string(), Value::String(field.to_string())))
            .collect::<Map<String, Value>>();
        documents.push(Value::Object(document));
    }
    Ok(documents)
}

/// 📁 Every file of one format in a directory, sorted by file name.
pub async fn document_files_in_directory(
    directory: &Path,
    file_type: DocumentFileType,
) -> Result<Vec<PathBuf>> {
    let mut entries = tokio::fs::read_dir(directory).await?;
    let mut files = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|extension| extension.to_str())
            .is_some_and(|extension| extension == file_type.extension());
        if matches && entry.file_type().await?.is_file() {
            files.push(path);
        }
    }
    files.sort();

    if files.is_empty() {
        return Err(MeilixError::Validation(format!(
            "No {} files found in {}",
            file_type.extension(),
            directory.display()
        )));
    }
    Ok(files)
}

/// 📚 Load every matching file in a directory, one `Vec` per file, in file-name order.
pub async fn load_documents_from_directory(
    directory: &Path,
    file_type: DocumentFileType,
    csv_delimiter: Option<char>,
) -> Result<Vec<Vec<Value>>> {
    let mut loaded = Vec::new();
    for path in document_files_in_directory(directory, file_type).await? {
        loaded.push(load_documents_from_file(&path, csv_delimiter).await?);
    }
    Ok(loaded)
}

/// 🧺 Flatten per-file document lists into one, keeping file order.
pub fn combine_documents(per_file: Vec<Vec<Value>>) -> Vec<Value> {
    per_file.into_iter().flatten().collect()
}
