//! Request-level operations over the store and the derivation pipeline.
//!
//! Each analytics or insights call reads the collection, normalizes it
//! (backfilling missing categories), and derives its payload. Nothing is
//! shared between calls except the store itself.

use crate::analysis::{aggregate, normalize_documents, synthesize, Normalized};
use crate::categorizer::Categorizer;
use crate::config::BackfillMode;
use crate::models::{
    AnalyticsPayload, CategoryResult, Document, InsightsPayload, NormalizedDocument,
};
use crate::store::{CategoryOverride, DocumentFilter, DocumentStore, NewDocument};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use tracing::{debug, info};

/// Tunables for the derivation pipeline.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub backfill: BackfillMode,
    pub concurrency: usize,
    pub recent_window_days: i64,
    pub sample_size: usize,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            backfill: BackfillMode::Ephemeral,
            concurrency: 4,
            recent_window_days: 7,
            sample_size: 10,
        }
    }
}

/// Outcome of registering a document.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationReceipt {
    pub dts_number: String,
    pub ai_category: String,
    pub ai_confidence: f64,
    pub method: crate::models::CategorizationMethod,
}

/// A filtered document listing.
#[derive(Debug, Clone, Serialize)]
pub struct CategorizedDocuments {
    pub documents: Vec<Document>,
    pub count: usize,
}

/// Document operations bound to one store and one categorizer.
pub struct DocumentService {
    store: DocumentStore,
    categorizer: Categorizer,
    settings: ServiceSettings,
}

impl DocumentService {
    pub fn new(store: DocumentStore, categorizer: Categorizer, settings: ServiceSettings) -> Self {
        Self {
            store,
            categorizer,
            settings,
        }
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Categorize free text without touching the store.
    pub async fn categorize(&self, title: &str, description: &str) -> CategoryResult {
        self.categorizer.categorize(title, description).await
    }

    /// Full analytics over the collection, plus a sample of the newest documents.
    pub async fn analytics(&mut self, now: DateTime<Utc>) -> Result<AnalyticsPayload> {
        let stored = self.store.documents();
        let documents = self.load_normalized(stored).await?;
        let analytics = aggregate(&documents, now, self.settings.recent_window_days);

        let recent_documents = documents
            .into_iter()
            .take(self.settings.sample_size)
            .collect();

        Ok(AnalyticsPayload {
            analytics,
            recent_documents,
        })
    }

    /// Grouped insights over the collection.
    pub async fn insights(&mut self) -> Result<InsightsPayload> {
        let stored = self.store.documents();
        let documents = self.load_normalized(stored).await?;
        Ok(InsightsPayload {
            total_documents: documents.len(),
            insights: synthesize(&documents),
        })
    }

    /// Documents matching `filter`, with missing categories filled in.
    pub async fn categorized_documents(
        &mut self,
        filter: &DocumentFilter,
    ) -> Result<CategorizedDocuments> {
        let matching = self.store.query(filter);
        let documents: Vec<Document> = self
            .load_normalized(matching)
            .await?
            .into_iter()
            .map(|d| d.document)
            .collect();

        Ok(CategorizedDocuments {
            count: documents.len(),
            documents,
        })
    }

    /// Register a document: next DTS number, categorization, status `received`.
    pub async fn register(
        &mut self,
        new: NewDocument,
        now: DateTime<Utc>,
    ) -> Result<RegistrationReceipt> {
        let categorization = self
            .categorizer
            .categorize(&new.title, &new.description)
            .await;
        let document = self.store.register(new, &categorization, now)?;
        self.store.save().context("Failed to save document store")?;

        Ok(RegistrationReceipt {
            dts_number: document.dts_number,
            ai_category: categorization.category,
            ai_confidence: categorization.confidence,
            method: categorization.method,
        })
    }

    /// Re-run categorization for every stored document and persist the results.
    pub async fn recategorize_all(&mut self, show_progress: bool) -> Result<usize> {
        let documents = self.store.documents();
        let progress = if show_progress {
            let pb = ProgressBar::new(documents.len() as u64);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
                    .map(|style| style.progress_chars("#>-"))
                    .unwrap_or_else(|_| ProgressStyle::default_bar()),
            );
            pb
        } else {
            ProgressBar::hidden()
        };

        let mut updated = 0;
        for document in &documents {
            let result = self
                .categorizer
                .categorize(&document.title, &document.description)
                .await;
            self.store
                .update_category(document.id, &result.category, result.confidence)?;
            updated += 1;
            progress.inc(1);
        }
        progress.finish_and_clear();

        self.store.save().context("Failed to save document store")?;
        info!("Re-categorized {} documents", updated);
        Ok(updated)
    }

    /// Manually replace a document's derived category.
    pub fn override_category(
        &mut self,
        dts_number: &str,
        correction: CategoryOverride,
        now: DateTime<Utc>,
    ) -> Result<()> {
        self.store.override_category(dts_number, correction, now)?;
        self.store.save().context("Failed to save document store")?;
        Ok(())
    }

    /// Set a document's manually assigned category.
    pub fn set_manual_category(&mut self, dts_number: &str, doc_type: &str) -> Result<()> {
        self.store.set_manual_category(dts_number, doc_type)?;
        self.store.save().context("Failed to save document store")?;
        Ok(())
    }

    async fn load_normalized(
        &mut self,
        documents: Vec<Document>,
    ) -> Result<Vec<NormalizedDocument>> {
        let Normalized {
            documents,
            backfilled,
        } = normalize_documents(documents, &self.categorizer, self.settings.concurrency).await;

        if !backfilled.is_empty() && self.settings.backfill == BackfillMode::Persist {
            for backfill in &backfilled {
                self.store.update_category(
                    backfill.document_id,
                    &backfill.result.category,
                    backfill.result.confidence,
                )?;
            }
            self.store
                .save()
                .context("Failed to persist backfilled categories")?;
            info!("Persisted {} backfilled categories", backfilled.len());
        } else if !backfilled.is_empty() {
            debug!(
                "{} categories backfilled for this request only",
                backfilled.len()
            );
        }

        Ok(documents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categorizer::testing::FixedPrediction;
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;
    use tempfile::TempDir;

    const STORE_JSON: &str = r#"{
      "documents": [
        {"id": 1, "dtsNumber": "20250000001", "title": "Accreditation survey visit",
         "description": "AACCUP documents", "docType": "Academics", "status": "received",
         "aiCategory": "Academics: Accreditation", "aiConfidence": 0.91,
         "createdAt": "2025-03-01T08:00:00Z"},
        {"id": 2, "dtsNumber": "20250000002", "title": "Accreditation binder",
         "description": "program compliance", "docType": "Institute", "status": "forwarded",
         "createdAt": "2025-03-08T08:00:00Z"},
        {"id": 3, "dtsNumber": "20250000003", "title": "Purchase Request for laptops",
         "description": "urgent procurement needed", "docType": "Administration and Finance",
         "status": "ended", "aiCategory": "Administration and Finance", "aiConfidence": 0.4,
         "aiOverrideAt": "2025-03-09T10:00:00Z", "aiOverrideBy": "budget office",
         "createdAt": "2025-03-09T08:00:00Z"}
      ]
    }"#;

    fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 12, 0, 0).unwrap()
    }

    fn seeded_store(dir: &TempDir) -> DocumentStore {
        let path = dir.path().join("docs.json");
        std::fs::write(&path, STORE_JSON).unwrap();
        DocumentStore::open(path).unwrap()
    }

    fn service(dir: &TempDir, categorizer: Categorizer, backfill: BackfillMode) -> DocumentService {
        DocumentService::new(
            seeded_store(dir),
            categorizer,
            ServiceSettings {
                backfill,
                ..Default::default()
            },
        )
    }

    #[tokio::test]
    async fn test_analytics_payload() {
        let dir = TempDir::new().unwrap();
        let mut service = service(&dir, Categorizer::keyword_only(), BackfillMode::Ephemeral);

        let payload = service.analytics(at(2025, 3, 10)).await.unwrap();
        let analytics = &payload.analytics;

        assert_eq!(analytics.total_documents, 3);
        assert_eq!(analytics.status_distribution.forwarded, 1);
        assert_eq!(analytics.override_count, 1);
        assert_eq!(analytics.recent_document_count, 2);
        assert_eq!(analytics.monthly_trends.len(), 1);
        assert_eq!(analytics.monthly_trends[0].month, "Mar 2025");
        assert_eq!(analytics.low_confidence_count, 1);
        assert!(analytics.category_totals.total() <= analytics.total_documents);

        // newest first
        let ids: Vec<u64> = payload.recent_documents.iter().map(|d| d.document.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);

        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["recentDocuments"][0]["dtsNumber"], "20250000003");
        assert_eq!(json["recentDocuments"][2]["aiMainCategory"], "Academics");
    }

    #[tokio::test]
    async fn test_ephemeral_backfill_is_not_written() {
        let dir = TempDir::new().unwrap();
        let remote = Arc::new(FixedPrediction::new("Academics: Accreditation", 0.88));
        let categorizer =
            Categorizer::with_remote(remote.clone(), std::time::Duration::from_secs(1));
        let mut service = service(&dir, categorizer, BackfillMode::Ephemeral);

        service.insights().await.unwrap();
        service.insights().await.unwrap();

        // the same document is categorized again on every request
        assert_eq!(remote.call_count(), 2);
        let reopened = DocumentStore::open(dir.path().join("docs.json")).unwrap();
        assert!(reopened.find_by_dts("20250000002").unwrap().ai_category.is_none());
    }

    #[tokio::test]
    async fn test_persisted_backfill_is_written_once() {
        let dir = TempDir::new().unwrap();
        let remote = Arc::new(FixedPrediction::new("Academics: Accreditation", 0.88));
        let categorizer =
            Categorizer::with_remote(remote.clone(), std::time::Duration::from_secs(1));
        let mut service = service(&dir, categorizer, BackfillMode::Persist);

        service.insights().await.unwrap();
        service.insights().await.unwrap();

        assert_eq!(remote.call_count(), 1);
        let reopened = DocumentStore::open(dir.path().join("docs.json")).unwrap();
        let doc = reopened.find_by_dts("20250000002").unwrap();
        assert_eq!(doc.ai_category.as_deref(), Some("Academics: Accreditation"));
        assert_eq!(doc.ai_confidence, Some(0.88));
    }

    #[tokio::test]
    async fn test_insights_payload() {
        let dir = TempDir::new().unwrap();
        let mut service = service(&dir, Categorizer::keyword_only(), BackfillMode::Ephemeral);

        let payload = service.insights().await.unwrap();

        assert_eq!(payload.total_documents, 3);
        let strategic = payload
            .insights
            .iter()
            .find(|g| g.id == "creative")
            .unwrap();
        let accreditation = strategic
            .items
            .iter()
            .find(|i| i.title == "Accreditation Preparation")
            .unwrap();
        assert!(accreditation.detail.contains("2 documents"));
    }

    #[tokio::test]
    async fn test_register_assigns_next_number() {
        let dir = TempDir::new().unwrap();
        let mut service = service(&dir, Categorizer::keyword_only(), BackfillMode::Ephemeral);

        let receipt = service
            .register(
                NewDocument {
                    title: "Scholarship list".to_string(),
                    description: "financial aid release".to_string(),
                    doc_type: "Student Services".to_string(),
                    registered_by: None,
                },
                at(2025, 4, 1),
            )
            .await
            .unwrap();

        assert_eq!(receipt.dts_number, "20250000004");
        assert_eq!(receipt.ai_category, "Student Services");

        let reopened = DocumentStore::open(dir.path().join("docs.json")).unwrap();
        assert_eq!(reopened.len(), 4);
    }

    #[tokio::test]
    async fn test_categorized_documents_filter() {
        let dir = TempDir::new().unwrap();
        let mut service = service(&dir, Categorizer::keyword_only(), BackfillMode::Ephemeral);

        let listing = service
            .categorized_documents(&DocumentFilter {
                status: Some("forwarded".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(listing.count, 1);
        assert!(listing.documents[0].ai_category.is_some());
    }

    #[tokio::test]
    async fn test_recategorize_all_and_overrides() {
        let dir = TempDir::new().unwrap();
        let remote = Arc::new(FixedPrediction::new("Institute", 0.6));
        let categorizer =
            Categorizer::with_remote(remote.clone(), std::time::Duration::from_secs(1));
        let mut service = service(&dir, categorizer, BackfillMode::Ephemeral);

        assert_eq!(service.recategorize_all(false).await.unwrap(), 3);
        assert!(service
            .store()
            .documents()
            .iter()
            .all(|d| d.ai_category.as_deref() == Some("Institute")));

        service
            .override_category(
                "20250000001",
                CategoryOverride {
                    category: "Academics".to_string(),
                    confidence: Some(1.0),
                    by: "registrar".to_string(),
                    reason: String::new(),
                },
                at(2025, 3, 10),
            )
            .unwrap();
        service.set_manual_category("20250000002", "Academics").unwrap();

        let payload = service.analytics(at(2025, 3, 10) + Duration::days(30)).await.unwrap();
        assert_eq!(payload.analytics.override_count, 2);
        assert_eq!(payload.analytics.recent_document_count, 0);
        assert!(service.set_manual_category("20250000002", "").is_err());
    }
}
