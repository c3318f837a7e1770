//! Markdown and JSON report generation.
//!
//! Every command output is built from small section builders so the
//! markdown and JSON renditions carry the same content.

use crate::models::{
    Analytics, AnalyticsPayload, CategoryResult, Document, InsightGroup, InsightsPayload,
};
use crate::service::{CategorizedDocuments, RegistrationReceipt};
use anyhow::Result;
use serde::Serialize;

/// Generate the analytics report.
pub fn generate_analytics_markdown(payload: &AnalyticsPayload) -> String {
    let analytics = &payload.analytics;
    let mut output = String::new();

    output.push_str("# Document Analytics\n\n");
    output.push_str(&generate_overview_section(analytics));
    output.push_str(&generate_category_section(analytics));
    output.push_str(&generate_status_section(analytics));
    output.push_str(&generate_trends_section(analytics));
    output.push_str(&generate_accuracy_section(analytics));

    if !payload.recent_documents.is_empty() {
        output.push_str("## Newest Documents\n\n");
        let documents: Vec<&Document> =
            payload.recent_documents.iter().map(|d| &d.document).collect();
        output.push_str(&generate_document_table(&documents));
    }

    output.push_str(&generate_footer());
    output
}

/// Generate the overview section.
fn generate_overview_section(analytics: &Analytics) -> String {
    let mut section = String::new();

    section.push_str("## Overview\n\n");
    section.push_str(&format!(
        "- **Total Documents:** {}\n",
        analytics.total_documents
    ));
    section.push_str(&format!(
        "- **Average Confidence:** {:.1}%\n",
        analytics.average_confidence * 100.0
    ));
    section.push_str(&format!(
        "- **High Confidence:** {} | **Low Confidence:** {}\n",
        analytics.high_confidence_count, analytics.low_confidence_count
    ));
    section.push_str(&format!(
        "- **Registered Recently:** {}\n",
        analytics.recent_document_count
    ));
    section.push_str(&format!(
        "- **Manual Overrides:** {}\n\n",
        analytics.override_count
    ));

    section
}

/// Generate the category distribution section.
fn generate_category_section(analytics: &Analytics) -> String {
    let mut section = String::new();

    section.push_str("## Categories\n\n");
    section.push_str("| Category | Documents |\n");
    section.push_str("|:---|:---:|\n");

    let mut totals: Vec<_> = analytics.category_totals.iter().collect();
    totals.sort_by_key(|(_, count)| std::cmp::Reverse(*count));

    for (category, count) in totals {
        section.push_str(&format!("| {} | {} |\n", category, count));
    }
    section.push('\n');

    section
}

/// Generate the status breakdown section.
fn generate_status_section(analytics: &Analytics) -> String {
    let status = &analytics.status_distribution;
    let mut section = String::new();

    section.push_str("## Workflow Status\n\n");
    section.push_str("| 📥 Received | 📤 Forwarded | ✅ Ended |\n");
    section.push_str("|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} |\n\n",
        status.received, status.forwarded, status.ended
    ));

    section
}

/// Generate the monthly trends section.
fn generate_trends_section(analytics: &Analytics) -> String {
    if analytics.monthly_trends.is_empty() {
        return String::new();
    }

    let mut section = String::new();

    section.push_str("## Monthly Trends\n\n");
    section.push_str("| Month | Documents | Breakdown |\n");
    section.push_str("|:---|:---:|:---|\n");

    for trend in &analytics.monthly_trends {
        let breakdown: Vec<String> = trend
            .by_category
            .iter()
            .map(|(category, count)| format!("{} {}", category, count))
            .collect();
        section.push_str(&format!(
            "| {} | {} | {} |\n",
            trend.month,
            trend.total,
            breakdown.join(", ")
        ));
    }
    section.push('\n');

    section
}

/// Generate the manual-versus-derived agreement section.
fn generate_accuracy_section(analytics: &Analytics) -> String {
    let mut section = String::new();

    section.push_str("## Categorization Accuracy\n\n");

    let scored: Vec<_> = analytics
        .category_accuracy
        .iter()
        .filter(|a| a.total > 0)
        .collect();

    if scored.is_empty() {
        section.push_str("No manually categorized documents to compare against.\n\n");
        return section;
    }

    section.push_str("| Category | Matching | Total | Accuracy |\n");
    section.push_str("|:---|:---:|:---:|:---:|\n");
    for entry in scored {
        section.push_str(&format!(
            "| {} | {} | {} | {:.1}% |\n",
            entry.category, entry.matching, entry.total, entry.accuracy
        ));
    }
    section.push('\n');

    if !analytics.top_mismatched_categories.is_empty() {
        section.push_str("### Most Mismatched\n\n");
        for (i, mismatch) in analytics.top_mismatched_categories.iter().enumerate() {
            section.push_str(&format!(
                "{}. **{}**: {} of {} ({:.1}%)\n",
                i + 1,
                mismatch.category,
                mismatch.mismatched,
                mismatch.total,
                mismatch.mismatch_rate
            ));
        }
        section.push('\n');
    }

    section
}

/// Generate the insights report.
pub fn generate_insights_markdown(payload: &InsightsPayload) -> String {
    let mut output = String::new();

    output.push_str("# Document Insights\n\n");
    output.push_str(&format!(
        "*Based on {} documents*\n\n",
        payload.total_documents
    ));

    for group in &payload.insights {
        output.push_str(&generate_insight_group(group));
    }

    output.push_str(&generate_footer());
    output
}

/// Generate one insight group.
fn generate_insight_group(group: &InsightGroup) -> String {
    let mut section = String::new();

    section.push_str(&format!("## {}\n\n", group.title));

    if group.items.is_empty() {
        section.push_str("Nothing notable.\n\n");
        return section;
    }

    for item in &group.items {
        section.push_str(&format!(
            "### {} {}\n\n",
            item.impact.emoji(),
            item.title
        ));
        section.push_str(&format!("*{}*\n\n", item.category));
        section.push_str(&format!("{}\n\n", item.detail));
    }

    section
}

/// Generate the output of a one-off categorization.
pub fn generate_categorization_markdown(result: &CategoryResult) -> String {
    let mut output = String::new();

    output.push_str("# Categorization\n\n");
    output.push_str(&format!("- **Category:** {}\n", result.category));
    output.push_str(&format!(
        "- **Confidence:** {:.0}%\n",
        result.confidence * 100.0
    ));
    output.push_str(&format!("- **Method:** `{}`\n", result.method));
    if let Some(ref version) = result.model_version {
        output.push_str(&format!("- **Model:** `{}`\n", version));
    }
    output.push('\n');

    if !result.all_scores.is_empty() {
        output.push_str("| Category | Score |\n");
        output.push_str("|:---|:---:|\n");
        for entry in &result.all_scores {
            output.push_str(&format!("| {} | {:.2} |\n", entry.category, entry.score));
        }
        output.push('\n');
    }

    output
}

/// Generate a document listing.
pub fn generate_documents_markdown(listing: &CategorizedDocuments) -> String {
    let mut output = String::new();

    output.push_str(&format!("# Documents ({})\n\n", listing.count));
    if listing.documents.is_empty() {
        output.push_str("No documents match.\n");
        return output;
    }

    let documents: Vec<&Document> = listing.documents.iter().collect();
    output.push_str(&generate_document_table(&documents));
    output
}

/// Generate the confirmation for a registered document.
pub fn generate_receipt_markdown(receipt: &RegistrationReceipt) -> String {
    format!(
        "Registered **{}** as {} ({:.0}% confidence, `{}`)\n",
        receipt.dts_number,
        receipt.ai_category,
        receipt.ai_confidence * 100.0,
        receipt.method
    )
}

fn generate_document_table(documents: &[&Document]) -> String {
    let mut table = String::new();

    table.push_str("| DTS Number | Title | Status | Category | Confidence | Registered |\n");
    table.push_str("|:---|:---|:---:|:---|:---:|:---:|\n");

    for document in documents {
        let confidence = document
            .ai_confidence
            .map(|c| format!("{:.0}%", c * 100.0))
            .unwrap_or_else(|| "-".to_string());
        table.push_str(&format!(
            "| {} | {} | {} | {} | {} | {} |\n",
            document.dts_number,
            document.title.replace('|', "\\|"),
            document.status,
            document.ai_category.as_deref().unwrap_or("-"),
            confidence,
            document.created_at.format("%Y-%m-%d")
        ));
    }
    table.push('\n');

    table
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Generated by dtsinsight v{}*\n",
        env!("CARGO_PKG_VERSION")
    ));

    footer
}

/// Serialize any payload as pretty JSON.
pub fn generate_json<T: Serialize>(payload: &T) -> Result<String> {
    serde_json::to_string_pretty(payload).map_err(Into::into)
}
