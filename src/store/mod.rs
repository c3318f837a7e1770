//! JSON-file document storage.
//!
//! Holds the document collection, hands it out newest first, accepts
//! category updates, and owns the per-year DTS sequence. Writes go to a
//! temporary file in the same directory and are renamed into place.

use crate::models::{CategoryResult, Document};
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::{debug, info};

/// Digits in the sequence part of a DTS number.
const DTS_SEQUENCE_WIDTH: usize = 7;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// On-disk layout of the store file.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    documents: Vec<Document>,
}

/// Filters for listing documents.
#[derive(Debug, Clone, Default)]
pub struct DocumentFilter {
    /// Exact `aiCategory` value.
    pub category: Option<String>,
    pub status: Option<String>,
    pub limit: Option<usize>,
}

/// A document to be registered.
#[derive(Debug, Clone, Default)]
pub struct NewDocument {
    pub title: String,
    pub description: String,
    pub doc_type: String,
    pub registered_by: Option<String>,
}

/// A manual correction of a document's derived category.
#[derive(Debug, Clone)]
pub struct CategoryOverride {
    pub category: String,
    pub confidence: Option<f64>,
    pub by: String,
    pub reason: String,
}

/// Document collection backed by a JSON file.
pub struct DocumentStore {
    path: PathBuf,
    data: StoreFile,
}

impl DocumentStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let data = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                StoreFile::default()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            debug!("Store {} does not exist yet, starting empty", path.display());
            StoreFile::default()
        };

        info!(
            "Opened document store {} ({} documents)",
            path.display(),
            data.documents.len()
        );

        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.data.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.documents.is_empty()
    }

    /// All documents, newest registration first.
    pub fn documents(&self) -> Vec<Document> {
        let mut documents = self.data.documents.clone();
        documents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        documents
    }

    /// Documents matching `filter`, newest registration first.
    pub fn query(&self, filter: &DocumentFilter) -> Vec<Document> {
        let matching = self.documents().into_iter().filter(|d| {
            filter
                .category
                .as_deref()
                .map_or(true, |c| d.ai_category.as_deref() == Some(c))
                && filter.status.as_deref().map_or(true, |s| d.status == s)
        });

        match filter.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        }
    }

    pub fn find_by_dts(&self, dts_number: &str) -> Option<&Document> {
        self.data
            .documents
            .iter()
            .find(|d| d.dts_number == dts_number)
    }

    /// The next free DTS number for `year`.
    pub fn next_dts_number(&self, year: i32) -> String {
        let last = self
            .data
            .documents
            .iter()
            .filter_map(|d| dts_sequence(&d.dts_number, year))
            .max()
            .unwrap_or(0);
        format_dts_number(year, last + 1)
    }

    /// Register a new document with status `received`.
    pub fn register(
        &mut self,
        new: NewDocument,
        categorization: &CategoryResult,
        now: DateTime<Utc>,
    ) -> Result<Document> {
        if new.title.trim().is_empty() {
            return Err(StoreError::InvalidInput("title is required".to_string()));
        }

        let id = self.data.documents.iter().map(|d| d.id).max().unwrap_or(0) + 1;
        let document = Document {
            id,
            dts_number: self.next_dts_number(now.year()),
            title: new.title,
            description: new.description,
            doc_type: new.doc_type.trim().to_string(),
            status: "received".to_string(),
            ai_category: Some(categorization.category.clone()),
            ai_confidence: Some(categorization.confidence),
            ai_override_by: None,
            ai_override_at: None,
            ai_override_reason: None,
            registered_by: new.registered_by,
            created_at: now,
        };

        info!("Registered document {}", document.dts_number);
        self.data.documents.push(document.clone());
        Ok(document)
    }

    /// Write a derived category onto a document.
    pub fn update_category(&mut self, id: u64, category: &str, confidence: f64) -> Result<()> {
        let document = self
            .data
            .documents
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or_else(|| StoreError::NotFound(format!("document id {}", id)))?;

        document.ai_category = Some(category.to_string());
        document.ai_confidence = Some(confidence);
        Ok(())
    }

    /// Replace a document's derived category and record who did it.
    pub fn override_category(
        &mut self,
        dts_number: &str,
        correction: CategoryOverride,
        now: DateTime<Utc>,
    ) -> Result<()> {
        if correction.category.trim().is_empty() {
            return Err(StoreError::InvalidInput("category is required".to_string()));
        }

        let document = self.find_by_dts_mut(dts_number)?;
        document.ai_category = Some(correction.category.trim().to_string());
        document.ai_confidence = correction.confidence;
        document.ai_override_by = Some(correction.by);
        document.ai_override_at = Some(now);
        document.ai_override_reason = Some(correction.reason);
        Ok(())
    }

    /// Set the manually assigned category.
    pub fn set_manual_category(&mut self, dts_number: &str, doc_type: &str) -> Result<()> {
        let doc_type = doc_type.trim();
        if doc_type.is_empty() {
            return Err(StoreError::InvalidInput(
                "manual category is required".to_string(),
            ));
        }

        self.find_by_dts_mut(dts_number)?.doc_type = doc_type.to_string();
        Ok(())
    }

    /// Persist the collection atomically.
    pub fn save(&self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut file = NamedTempFile::new_in(&dir)?;
        serde_json::to_writer_pretty(&mut file, &self.data)?;
        file.write_all(b"\n")?;
        file.persist(&self.path).map_err(|e| StoreError::Io(e.error))?;

        debug!(
            "Saved {} documents to {}",
            self.data.documents.len(),
            self.path.display()
        );
        Ok(())
    }

    fn find_by_dts_mut(&mut self, dts_number: &str) -> Result<&mut Document> {
        self.data
            .documents
            .iter_mut()
            .find(|d| d.dts_number == dts_number)
            .ok_or_else(|| StoreError::NotFound(format!("DTS number {}", dts_number)))
    }
}

/// `YYYY` followed by the zero-padded sequence.
pub fn format_dts_number(year: i32, sequence: u64) -> String {
    format!("{}{:0width$}", year, sequence, width = DTS_SEQUENCE_WIDTH)
}

/// The sequence part of `dts_number` if it belongs to `year`.
pub fn dts_sequence(dts_number: &str, year: i32) -> Option<u64> {
    let rest = dts_number.strip_prefix(&year.to_string())?;
    if rest.is_empty() || !rest.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    rest.parse().ok()
}
