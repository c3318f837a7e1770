//! Data models for document categorization and analytics.
//!
//! This module contains the shared vocabulary (the six institutional
//! categories), the stored document record, and every value the
//! categorizer, aggregator, and insight synthesizer hand back.

use chrono::{DateTime, Utc};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

/// One of the six fixed institutional categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    Academics,
    #[serde(rename = "Research and Extension")]
    ResearchAndExtension,
    #[serde(rename = "Student Services")]
    StudentServices,
    #[serde(rename = "Planning and Development")]
    PlanningAndDevelopment,
    #[serde(rename = "Administration and Finance")]
    AdministrationAndFinance,
    Institute,
}

impl Category {
    /// Every category, in display order.
    pub const ALL: [Category; 6] = [
        Category::Academics,
        Category::ResearchAndExtension,
        Category::StudentServices,
        Category::PlanningAndDevelopment,
        Category::AdministrationAndFinance,
        Category::Institute,
    ];

    /// The exact label stored in documents and shown to users.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Academics => "Academics",
            Category::ResearchAndExtension => "Research and Extension",
            Category::StudentServices => "Student Services",
            Category::PlanningAndDevelopment => "Planning and Development",
            Category::AdministrationAndFinance => "Administration and Finance",
            Category::Institute => "Institute",
        }
    }

    /// Parse an exact category label.
    pub fn from_label(label: &str) -> Option<Category> {
        Category::ALL.into_iter().find(|c| c.as_str() == label)
    }

    /// Position of this category in [`Category::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Main-category prefix of a possibly compound `"Main: Sub"` category.
///
/// Text before the first `:`, trimmed. A value without `:` is returned trimmed.
pub fn main_category(category: &str) -> &str {
    if category.is_empty() {
        return "";
    }
    match category.split(':').next() {
        Some(main) if !main.is_empty() => main.trim(),
        _ => category.trim(),
    }
}

/// Per-category counters, zero-filled for all six categories.
///
/// Serializes as a JSON object keyed by category label in display order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryCounts([usize; 6]);

impl CategoryCounts {
    pub fn get(&self, category: Category) -> usize {
        self.0[category.index()]
    }

    pub fn increment(&mut self, category: Category) {
        self.0[category.index()] += 1;
    }

    pub fn total(&self) -> usize {
        self.0.iter().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Category, usize)> + '_ {
        Category::ALL.into_iter().map(move |c| (c, self.get(c)))
    }
}

impl Serialize for CategoryCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(Category::ALL.len()))?;
        for (category, count) in self.iter() {
            map.serialize_entry(category.as_str(), &count)?;
        }
        map.end()
    }
}

/// Counters keyed by free-form label, kept in first-insertion order.
///
/// Serializes as a JSON object in that order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelCounts(Vec<(String, usize)>);

impl LabelCounts {
    pub fn increment(&mut self, label: &str) {
        match self.0.iter_mut().find(|(l, _)| l == label) {
            Some((_, count)) => *count += 1,
            None => self.0.push((label.to_string(), 1)),
        }
    }

    pub fn get(&self, label: &str) -> Option<usize> {
        self.0.iter().find(|(l, _)| l == label).map(|(_, count)| *count)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.0.iter().map(|(label, count)| (label.as_str(), *count))
    }
}

impl Serialize for LabelCounts {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (label, count) in self.iter() {
            map.serialize_entry(label, &count)?;
        }
        map.end()
    }
}

/// A tracked document as delivered by storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    /// Storage identifier.
    pub id: u64,
    /// Public tracking number, `YYYY` + 7-digit sequence.
    pub dts_number: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Manually assigned category (may be empty).
    #[serde(default)]
    pub doc_type: String,
    /// Workflow state, mutated by the routing workflow.
    #[serde(default)]
    pub status: String,
    /// Derived category, possibly `"Main: Sub"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_category: Option<String>,
    #[serde(default)]
    pub ai_confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_override_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_override_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_override_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub registered_by: Option<String>,
    /// Registration timestamp.
    pub created_at: DateTime<Utc>,
}

impl Document {
    /// Whether the document still lacks a derived category.
    pub fn needs_category(&self) -> bool {
        self.ai_category.as_deref().map_or(true, str::is_empty)
    }
}

/// A document enriched with request-scoped derived fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedDocument {
    #[serde(flatten)]
    pub document: Document,
    /// Main-category prefix of `ai_category`.
    pub ai_main_category: String,
    /// Lowercase `title + " " + description`.
    pub full_text: String,
}

impl NormalizedDocument {
    /// Build the derived fields from an already-categorized document.
    pub fn from_document(document: Document) -> Self {
        let ai_main_category =
            main_category(document.ai_category.as_deref().unwrap_or_default()).to_string();
        let full_text = format!("{} {}", document.title, document.description).to_lowercase();
        Self {
            document,
            ai_main_category,
            full_text,
        }
    }

    /// The fixed category this document's main category names, if any.
    pub fn main(&self) -> Option<Category> {
        Category::from_label(&self.ai_main_category)
    }
}

/// Which strategy produced a [`CategoryResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CategorizationMethod {
    /// Answer from the remote prediction service.
    RemotePrediction,
    /// Keyword scoring, no remote service configured.
    KeywordFallback,
    /// Keyword scoring after the remote service failed.
    ErrorFallback,
}

impl fmt::Display for CategorizationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CategorizationMethod::RemotePrediction => write!(f, "remote-prediction"),
            CategorizationMethod::KeywordFallback => write!(f, "keyword-fallback"),
            CategorizationMethod::ErrorFallback => write!(f, "error-fallback"),
        }
    }
}

/// A single entry of the ranked score list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub category: Category,
    pub score: f64,
}

/// Outcome of categorizing one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryResult {
    /// One of the six labels, or a compound `"Main: Sub"` from the remote model.
    pub category: String,
    /// Certainty in `[0, 1]`.
    pub confidence: f64,
    pub method: CategorizationMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    /// Raw per-category keyword scores.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub scores: BTreeMap<String, f64>,
    /// Keyword scores ranked highest first.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub all_scores: Vec<CategoryScore>,
}

impl CategoryResult {
    /// The zero-confidence default used for empty input.
    pub fn default_institute(method: CategorizationMethod) -> Self {
        Self {
            category: Category::Institute.as_str().to_string(),
            confidence: 0.0,
            method,
            model_version: None,
            scores: BTreeMap::new(),
            all_scores: Vec::new(),
        }
    }
}

/// How much attention an insight deserves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    High,
    Medium,
    Neutral,
}

impl Impact {
    /// Returns an emoji representation of the impact.
    pub fn emoji(&self) -> &'static str {
        match self {
            Impact::High => "🔴",
            Impact::Medium => "🟡",
            Impact::Neutral => "⚪",
        }
    }
}

/// A human-readable observation about the document corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub title: String,
    pub detail: String,
    pub category: String,
    pub impact: Impact,
}

/// A titled group of insights produced by one rule family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsightGroup {
    pub id: String,
    pub title: String,
    pub items: Vec<Insight>,
}

/// Document counts per workflow status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDistribution {
    pub received: usize,
    pub forwarded: usize,
    pub ended: usize,
}

/// Registrations in one calendar month.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyTrend {
    /// Display label, e.g. `Jan 2025`.
    pub month: String,
    pub total: usize,
    /// Main-category counts in order of first appearance.
    pub by_category: LabelCounts,
}

/// Agreement between manual and derived categories for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryAccuracy {
    pub category: Category,
    pub total: usize,
    pub matching: usize,
    /// Percentage, 0 when `total` is 0.
    pub accuracy: f64,
}

/// Disagreement between manual and derived categories for one category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryMismatch {
    pub category: Category,
    pub mismatched: usize,
    pub total: usize,
    /// Percentage, 0 when `total` is 0.
    pub mismatch_rate: f64,
}

/// Everything the aggregator derives from a normalized corpus.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub total_documents: usize,
    pub category_distribution: CategoryCounts,
    pub status_distribution: StatusDistribution,
    pub monthly_trends: Vec<MonthlyTrend>,
    pub average_confidence: f64,
    pub category_accuracy: Vec<CategoryAccuracy>,
    pub category_totals: CategoryCounts,
    pub high_confidence_count: usize,
    pub low_confidence_count: usize,
    /// Documents registered inside the recent window.
    #[serde(rename = "recentDocs")]
    pub recent_document_count: usize,
    pub override_count: usize,
    pub top_mismatched_categories: Vec<CategoryMismatch>,
}

/// The analytics response: aggregates plus a sample of the newest documents.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsPayload {
    #[serde(flatten)]
    pub analytics: Analytics,
    pub recent_documents: Vec<NormalizedDocument>,
}

/// The insights response.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightsPayload {
    pub total_documents: usize,
    pub insights: Vec<InsightGroup>,
}
