//! Document categorization.
//!
//! The remote prediction service is tried first; any failure, including a
//! timeout, degrades silently to keyword scoring.

pub mod keywords;
pub mod predictor;

pub use keywords::keyword_categorize;
pub use predictor::{HttpPredictionClient, PredictionService, PredictorConfig};

use crate::models::{CategorizationMethod, CategoryResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Decides a category and confidence for a document.
#[derive(Clone)]
pub struct Categorizer {
    remote: Option<Arc<dyn PredictionService>>,
    timeout: Duration,
}

impl Categorizer {
    /// A categorizer that only uses keyword scoring.
    pub fn keyword_only() -> Self {
        Self {
            remote: None,
            timeout: Duration::from_secs(5),
        }
    }

    /// A categorizer that asks `remote` first, giving up after `timeout`.
    pub fn with_remote(remote: Arc<dyn PredictionService>, timeout: Duration) -> Self {
        Self {
            remote: Some(remote),
            timeout,
        }
    }

    pub fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    /// Categorize a document from its title and description.
    ///
    /// Never fails: remote errors are logged and answered by keyword scoring.
    pub async fn categorize(&self, title: &str, description: &str) -> CategoryResult {
        if title.trim().is_empty() && description.trim().is_empty() {
            debug!("Empty document text, using default category");
            return CategoryResult::default_institute(CategorizationMethod::KeywordFallback);
        }

        let Some(remote) = &self.remote else {
            return keyword_categorize(title, description, CategorizationMethod::KeywordFallback);
        };

        match tokio::time::timeout(self.timeout, remote.predict(title, description)).await {
            Ok(Ok(prediction)) => CategoryResult {
                category: prediction.category.trim().to_string(),
                confidence: prediction.confidence.clamp(0.0, 1.0),
                method: CategorizationMethod::RemotePrediction,
                model_version: prediction.model_version,
                scores: Default::default(),
                all_scores: Vec::new(),
            },
            Ok(Err(e)) => {
                warn!("Remote prediction failed, using keyword fallback: {}", e);
                keyword_categorize(title, description, CategorizationMethod::ErrorFallback)
            }
            Err(_) => {
                warn!(
                    "Remote prediction exceeded {}s, using keyword fallback",
                    self.timeout.as_secs()
                );
                keyword_categorize(title, description, CategorizationMethod::ErrorFallback)
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted prediction services shared by tests across the crate.

    use super::predictor::{Prediction, PredictionError, PredictionService};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Answers every request with the same prediction.
    pub struct FixedPrediction {
        pub category: String,
        pub confidence: f64,
        pub calls: AtomicUsize,
    }

    impl FixedPrediction {
        pub fn new(category: &str, confidence: f64) -> Self {
            Self {
                category: category.to_string(),
                confidence,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl PredictionService for FixedPrediction {
        async fn predict(&self, _: &str, _: &str) -> Result<Prediction, PredictionError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(Prediction {
                category: self.category.clone(),
                confidence: self.confidence,
                model_version: Some("test-model".to_string()),
            })
        }
    }

    /// Always fails.
    pub struct FailingPrediction;

    #[async_trait]
    impl PredictionService for FailingPrediction {
        async fn predict(&self, _: &str, _: &str) -> Result<Prediction, PredictionError> {
            Err(PredictionError::Connect("http://unreachable".to_string()))
        }
    }

    /// Echoes the title as the category after a delay derived from it.
    pub struct EchoAfterDelay;

    #[async_trait]
    impl PredictionService for EchoAfterDelay {
        async fn predict(&self, title: &str, _: &str) -> Result<Prediction, PredictionError> {
            let millis = title.len() as u64 * 10;
            tokio::time::sleep(Duration::from_millis(millis)).await;
            Ok(Prediction {
                category: title.to_string(),
                confidence: 0.5,
                model_version: None,
            })
        }
    }
}
