//! Remote prediction service client.
//!
//! The service accepts `{title, description}` and answers with
//! `{category, confidence, modelVersion}`. Every failure mode is reported
//! as a [`PredictionError`] so the categorizer can fall back.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Why a remote prediction could not be used.
#[derive(Error, Debug)]
pub enum PredictionError {
    #[error("prediction request timed out after {0}s")]
    Timeout(u64),

    #[error("cannot connect to prediction service at {0}")]
    Connect(String),

    #[error("prediction service error {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to send prediction request: {0}")]
    Request(String),

    #[error("failed to parse prediction response: {0}")]
    Decode(String),

    #[error("prediction service returned an unusable answer: {0}")]
    InvalidAnswer(String),

    #[error("failed to create HTTP client: {0}")]
    Client(String),
}

/// A successful remote prediction.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub category: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub model_version: Option<String>,
}

/// Anything that can predict a category for a document.
#[async_trait]
pub trait PredictionService: Send + Sync {
    async fn predict(&self, title: &str, description: &str)
        -> Result<Prediction, PredictionError>;
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    title: &'a str,
    description: &'a str,
}

/// Configuration for the HTTP prediction client.
#[derive(Debug, Clone)]
pub struct PredictorConfig {
    pub url: String,
    pub timeout_seconds: u64,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:5001/predict".to_string(),
            timeout_seconds: 5,
        }
    }
}

/// reqwest-backed [`PredictionService`].
pub struct HttpPredictionClient {
    config: PredictorConfig,
    http_client: reqwest::Client,
}

impl HttpPredictionClient {
    pub fn new(config: PredictorConfig) -> Result<Self, PredictionError> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| PredictionError::Client(e.to_string()))?;

        Ok(Self {
            config,
            http_client,
        })
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }
}

#[async_trait]
impl PredictionService for HttpPredictionClient {
    async fn predict(
        &self,
        title: &str,
        description: &str,
    ) -> Result<Prediction, PredictionError> {
        debug!("Requesting prediction from {}", self.config.url);

        let response = self
            .http_client
            .post(&self.config.url)
            .json(&PredictRequest { title, description })
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PredictionError::Timeout(self.config.timeout_seconds)
                } else if e.is_connect() {
                    PredictionError::Connect(self.config.url.clone())
                } else {
                    PredictionError::Request(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(PredictionError::Status { status, body });
        }

        let prediction: Prediction = response
            .json()
            .await
            .map_err(|e| PredictionError::Decode(e.to_string()))?;

        if prediction.category.trim().is_empty() {
            return Err(PredictionError::InvalidAnswer("empty category".to_string()));
        }
        if !prediction.confidence.is_finite() {
            return Err(PredictionError::InvalidAnswer(format!(
                "confidence {}",
                prediction.confidence
            )));
        }

        Ok(prediction)
    }
}
