//! Corpus aggregation and statistics.
//!
//! Pure functions over normalized documents. Every ratio with a zero
//! denominator is reported as 0.

use crate::categorizer::keywords::round2;
use crate::models::{
    Analytics, Category, CategoryAccuracy, CategoryCounts, CategoryMismatch, MonthlyTrend,
    NormalizedDocument, StatusDistribution,
};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Confidence at or above which a categorization counts as high.
pub const HIGH_CONFIDENCE: f64 = 0.75;
/// Confidence below which a categorization counts as low.
pub const LOW_CONFIDENCE: f64 = 0.5;
/// Number of entries in the mismatch ranking.
pub const TOP_MISMATCHED: usize = 3;

/// Compute the full analytics summary.
///
/// `now` anchors the recent-activity window of `recent_window_days`.
pub fn aggregate(
    docs: &[NormalizedDocument],
    now: DateTime<Utc>,
    recent_window_days: i64,
) -> Analytics {
    let totals = category_totals(docs);

    Analytics {
        total_documents: docs.len(),
        category_distribution: totals,
        status_distribution: status_distribution(docs),
        monthly_trends: monthly_trends(docs),
        average_confidence: average_confidence(docs),
        category_accuracy: category_accuracy(docs),
        category_totals: totals,
        high_confidence_count: high_confidence_count(docs),
        low_confidence_count: low_confidence_count(docs),
        recent_document_count: recent_count(docs, now, recent_window_days),
        override_count: override_count(docs),
        top_mismatched_categories: top_mismatched_categories(docs, TOP_MISMATCHED),
    }
}

/// Count documents per fixed main category.
///
/// Documents whose main category is empty or outside the vocabulary are
/// not counted.
pub fn category_totals(docs: &[NormalizedDocument]) -> CategoryCounts {
    let mut counts = CategoryCounts::default();
    for category in docs.iter().filter_map(|d| d.main()) {
        counts.increment(category);
    }
    counts
}

/// Count documents per workflow status.
pub fn status_distribution(docs: &[NormalizedDocument]) -> StatusDistribution {
    let mut dist = StatusDistribution::default();
    for doc in docs {
        match doc.document.status.as_str() {
            "received" => dist.received += 1,
            "forwarded" => dist.forwarded += 1,
            "ended" => dist.ended += 1,
            _ => {}
        }
    }
    dist
}

/// One entry per registration month, in order of first appearance.
pub fn monthly_trends(docs: &[NormalizedDocument]) -> Vec<MonthlyTrend> {
    let mut trends: Vec<MonthlyTrend> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for doc in docs {
        let created = doc.document.created_at;
        let key = created.format("%Y-%m").to_string();

        let index = *positions.entry(key).or_insert_with(|| {
            trends.push(MonthlyTrend {
                month: created.format("%b %Y").to_string(),
                total: 0,
                by_category: Default::default(),
            });
            trends.len() - 1
        });

        let trend = &mut trends[index];
        trend.total += 1;
        if !doc.ai_main_category.is_empty() {
            trend.by_category.increment(&doc.ai_main_category);
        }
    }

    trends
}

/// Mean of all positive confidences, rounded to two decimals.
pub fn average_confidence(docs: &[NormalizedDocument]) -> f64 {
    let confidences: Vec<f64> = docs
        .iter()
        .filter_map(|d| d.document.ai_confidence)
        .filter(|c| *c > 0.0)
        .collect();

    if confidences.is_empty() {
        return 0.0;
    }

    round2(confidences.iter().sum::<f64>() / confidences.len() as f64)
}

/// Per-category agreement between `doc_type` and the derived main category.
pub fn category_accuracy(docs: &[NormalizedDocument]) -> Vec<CategoryAccuracy> {
    Category::ALL
        .into_iter()
        .map(|category| {
            let (total, matching) = tally(docs, category);
            CategoryAccuracy {
                category,
                total,
                matching,
                accuracy: percentage(matching, total),
            }
        })
        .collect()
}

/// The `n` categories with the most manual/derived disagreements.
///
/// Sorted by mismatch count, highest first; ties keep display order.
pub fn top_mismatched_categories(docs: &[NormalizedDocument], n: usize) -> Vec<CategoryMismatch> {
    let mut mismatches: Vec<CategoryMismatch> = Category::ALL
        .into_iter()
        .map(|category| {
            let (total, matching) = tally(docs, category);
            let mismatched = total - matching;
            CategoryMismatch {
                category,
                mismatched,
                total,
                mismatch_rate: percentage(mismatched, total),
            }
        })
        .collect();

    mismatches.sort_by_key(|m| std::cmp::Reverse(m.mismatched));
    mismatches.truncate(n);
    mismatches
}

pub fn high_confidence_count(docs: &[NormalizedDocument]) -> usize {
    docs.iter()
        .filter(|d| d.document.ai_confidence.unwrap_or(0.0) >= HIGH_CONFIDENCE)
        .count()
}

pub fn low_confidence_count(docs: &[NormalizedDocument]) -> usize {
    docs.iter()
        .filter(|d| matches!(d.document.ai_confidence, Some(c) if c < LOW_CONFIDENCE))
        .count()
}

/// Documents registered within `window_days` of `now`, boundary inclusive.
///
/// A window reaching past the earliest representable date counts everything.
pub fn recent_count(docs: &[NormalizedDocument], now: DateTime<Utc>, window_days: i64) -> usize {
    let Some(cutoff) = Duration::try_days(window_days).and_then(|w| now.checked_sub_signed(w))
    else {
        return docs.len();
    };
    docs.iter()
        .filter(|d| d.document.created_at >= cutoff)
        .count()
}

pub fn override_count(docs: &[NormalizedDocument]) -> usize {
    docs.iter()
        .filter(|d| d.document.ai_override_at.is_some())
        .count()
}

/// `(documents in category, documents whose doc_type agrees)`.
fn tally(docs: &[NormalizedDocument], category: Category) -> (usize, usize) {
    let label = category.as_str();
    let in_category = docs.iter().filter(|d| d.ai_main_category == label);
    let total = in_category.clone().count();
    let matching = in_category.filter(|d| d.document.doc_type == label).count();
    (total, matching)
}

fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
