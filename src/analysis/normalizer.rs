//! Document normalization.
//!
//! Documents without a derived category are categorized on the fly
//! (concurrently, order preserved), then every document gets its main
//! category and lowercase searchable text.

use crate::categorizer::Categorizer;
use crate::models::{CategoryResult, Document, NormalizedDocument};
use futures::stream::{self, StreamExt};
use tracing::{debug, info};

/// A category computed for a document that had none.
#[derive(Debug, Clone, PartialEq)]
pub struct Backfill {
    pub document_id: u64,
    pub result: CategoryResult,
}

/// Output of [`normalize_documents`].
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    /// Normalized documents, in input order.
    pub documents: Vec<NormalizedDocument>,
    /// Categories computed during this pass. Not persisted here.
    pub backfilled: Vec<Backfill>,
}

/// Normalize `documents`, backfilling missing categories with `categorizer`.
///
/// At most `concurrency` categorizations run at once.
pub async fn normalize_documents(
    documents: Vec<Document>,
    categorizer: &Categorizer,
    concurrency: usize,
) -> Normalized {
    let pending = documents.iter().filter(|d| d.needs_category()).count();
    if pending > 0 {
        info!("Backfilling categories for {} documents", pending);
    }

    let categorized: Vec<(Document, Option<CategoryResult>)> = stream::iter(documents)
        .map(|mut document| async move {
            if !document.needs_category() {
                return (document, None);
            }
            let result = categorizer
                .categorize(&document.title, &document.description)
                .await;
            debug!(
                "Backfilled {} as {} ({})",
                document.dts_number, result.category, result.method
            );
            document.ai_category = Some(result.category.clone());
            document.ai_confidence = Some(result.confidence);
            (document, Some(result))
        })
        .buffered(concurrency.max(1))
        .collect()
        .await;

    let mut normalized = Normalized::default();
    for (document, result) in categorized {
        if let Some(result) = result {
            normalized.backfilled.push(Backfill {
                document_id: document.id,
                result,
            });
        }
        normalized
            .documents
            .push(NormalizedDocument::from_document(document));
    }

    normalized
}
