//! Keyword scoring and keyword-based categorization.
//!
//! Used on its own when no prediction service is configured, and as the
//! fallback whenever the remote service fails.

use crate::models::{CategorizationMethod, Category, CategoryResult, CategoryScore};
use regex::Regex;
use std::collections::BTreeMap;
use tracing::debug;

/// Weight given to the title; the description gets the remainder.
const TITLE_WEIGHT: f64 = 0.6;
const DESCRIPTION_WEIGHT: f64 = 0.4;

/// Keyword sets per category, in [`Category::ALL`] order.
pub static CATEGORY_KEYWORDS: &[(Category, &[&str])] = &[
    (
        Category::Academics,
        &[
            "academic", "curriculum", "syllabus", "course", "subject", "lecture", "teaching",
            "faculty", "professor", "student", "enrollment", "registration", "grades",
            "examination", "exam", "assessment", "evaluation", "semester", "trimester",
            "academic calendar", "class schedule", "program", "degree", "bachelor", "master",
            "doctorate", "thesis", "dissertation", "research paper", "academic paper",
        ],
    ),
    (
        Category::ResearchAndExtension,
        &[
            "research", "study", "investigation", "survey", "experiment", "analysis",
            "extension", "outreach", "community", "project", "grant", "funding",
            "publication", "journal", "conference", "presentation", "workshop", "seminar",
            "training", "development", "innovation", "methodology", "data collection",
            "field work", "laboratory", "findings", "results",
        ],
    ),
    (
        Category::StudentServices,
        &[
            "student", "services", "welfare", "assistance", "scholarship", "financial aid",
            "counseling", "guidance", "admission", "enrollment", "registration", "dormitory",
            "housing", "cafeteria", "dining", "health", "medical", "insurance", "activities",
            "organization", "club", "sports", "event", "orientation", "freshman", "alumni",
            "career", "placement", "job",
        ],
    ),
    (
        Category::PlanningAndDevelopment,
        &[
            "planning", "development", "strategic", "plan", "budget", "allocation",
            "infrastructure", "facility", "building", "construction", "renovation",
            "expansion", "improvement", "upgrade", "maintenance", "project", "timeline",
            "milestone", "resource", "capacity", "growth", "expansion", "master plan",
            "long-term", "short-term", "objective", "goal",
        ],
    ),
    (
        Category::AdministrationAndFinance,
        &[
            "administration", "finance", "financial", "budget", "expense", "revenue",
            "accounting", "audit", "payroll", "salary", "wage", "payment", "invoice",
            "purchase", "procurement", "purchase order", "po", "vendor", "supplier",
            "contract", "agreement", "policy", "procedure", "regulation", "compliance",
            "human resources", "hr", "personnel", "employee", "staff", "management",
        ],
    ),
    (
        Category::Institute,
        &[
            "institute", "institution", "organization", "governance", "board", "committee",
            "director", "president", "executive", "leadership", "official", "memorandum",
            "circular", "announcement", "notice", "directive", "order", "decree",
            "institutional", "corporate", "organizational", "structure", "hierarchy",
        ],
    ),
];

/// Score `text` against a keyword set, in `[0, 1]`.
///
/// Each whole-word occurrence of a keyword adds 2; a keyword that only
/// appears inside a longer word adds 1. The sum is divided by the maximum
/// of 2 per keyword and clamped to 1.
pub fn similarity(text: &str, keywords: &[&str]) -> f64 {
    if text.is_empty() || keywords.is_empty() {
        return 0.0;
    }

    let lower_text = text.to_lowercase();
    let mut matches = 0usize;
    let mut total_weight = 0usize;

    for keyword in keywords {
        let lower_keyword = keyword.to_lowercase();
        if lower_keyword.is_empty() {
            continue;
        }

        let word_matches = whole_word_count(&lower_text, &lower_keyword);
        if word_matches > 0 {
            matches += word_matches * 2;
            total_weight += 2;
        } else if lower_text.contains(&lower_keyword) {
            matches += 1;
            total_weight += 1;
        }
    }

    if total_weight == 0 {
        return 0.0;
    }

    let max_possible = (keywords.len() * 2) as f64;
    (matches as f64 / max_possible).min(1.0)
}

/// Count non-overlapping whole-word occurrences of `keyword` in `text`.
fn whole_word_count(text: &str, keyword: &str) -> usize {
    match Regex::new(&format!(r"\b{}\b", regex::escape(keyword))) {
        Ok(re) => re.find_iter(text).count(),
        Err(e) => {
            debug!("Skipping unmatchable keyword {:?}: {}", keyword, e);
            0
        }
    }
}

/// Categorize by keyword overlap alone.
///
/// Blank input yields `Institute` with zero confidence. Otherwise the
/// highest-scoring category wins (earliest in display order on ties) and
/// confidence is the winning score relative to the mean score.
pub fn keyword_categorize(
    title: &str,
    description: &str,
    method: CategorizationMethod,
) -> CategoryResult {
    if title.trim().is_empty() && description.trim().is_empty() {
        return CategoryResult::default_institute(method);
    }

    let scored: Vec<(Category, f64)> = CATEGORY_KEYWORDS
        .iter()
        .map(|(category, keywords)| {
            let score = similarity(title, keywords) * TITLE_WEIGHT
                + similarity(description, keywords) * DESCRIPTION_WEIGHT;
            (*category, score)
        })
        .collect();

    let mut best = Category::Institute;
    let mut max_score = 0.0;
    for (category, score) in &scored {
        if *score > max_score {
            max_score = *score;
            best = *category;
        }
    }

    let total: f64 = scored.iter().map(|(_, s)| s).sum();
    let confidence = if total > 0.0 {
        let mean = total / scored.len() as f64;
        (max_score / mean).min(1.0)
    } else {
        0.0
    };

    let mut all_scores: Vec<CategoryScore> = scored
        .iter()
        .map(|(category, score)| CategoryScore {
            category: *category,
            score: round2(*score),
        })
        .collect();
    all_scores.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let scores: BTreeMap<String, f64> = scored
        .iter()
        .map(|(category, score)| (category.as_str().to_string(), *score))
        .collect();

    debug!(
        "Keyword categorization picked {} (max score {:.3})",
        best, max_score
    );

    CategoryResult {
        category: best.as_str().to_string(),
        confidence: round2(confidence),
        method,
        model_version: None,
        scores,
        all_scores,
    }
}

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords_for(category: Category) -> &'static [&'static str] {
        CATEGORY_KEYWORDS
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, k)| *k)
            .unwrap()
    }

    #[test]
    fn test_table_follows_display_order() {
        let order: Vec<Category> = CATEGORY_KEYWORDS.iter().map(|(c, _)| *c).collect();
        assert_eq!(order, Category::ALL.to_vec());
    }

    #[test]
    fn test_similarity_empty_inputs() {
        assert_eq!(similarity("", &["budget"]), 0.0);
        assert_eq!(similarity("budget request", &[]), 0.0);
    }

    #[test]
    fn test_similarity_whole_word_counts_double() {
        // one whole-word hit out of two keywords: 2 / 4
        assert_eq!(similarity("Budget approval", &["budget", "payroll"]), 0.5);
        // repeated whole-word hits accumulate: 4 / 4
        assert_eq!(similarity("budget budget", &["budget", "payroll"]), 1.0);
    }

    #[test]
    fn test_similarity_partial_match_counts_once() {
        // "plan" only appears inside "planning": 1 / 2
        assert_eq!(similarity("planning session", &["plan"]), 0.5);
    }

    #[test]
    fn test_similarity_is_clamped() {
        let score = similarity("exam exam exam exam", &["exam"]);
        assert_eq!(score, 1.0);
    }

    #[test]
    fn test_similarity_multiword_keyword() {
        let score = similarity("Please file the purchase order today", &["purchase order"]);
        assert_eq!(score, 1.0);
    }

    #[test]
    fn test_similarity_stays_in_unit_interval() {
        let texts = [
            "Faculty evaluation and semester grades",
            "random words with nothing relevant",
            "audit audit audit payroll salary wage",
        ];
        for text in texts {
            for (_, keywords) in CATEGORY_KEYWORDS {
                let score = similarity(text, keywords);
                assert!((0.0..=1.0).contains(&score), "{} scored {}", text, score);
            }
        }
    }

    #[test]
    fn test_purchase_request_scores_finance_above_academics() {
        let title = "Purchase Request for laptops";
        let description = "urgent procurement needed";

        let score_for = |category| {
            let keywords = keywords_for(category);
            similarity(title, keywords) * TITLE_WEIGHT
                + similarity(description, keywords) * DESCRIPTION_WEIGHT
        };

        assert!(
            score_for(Category::AdministrationAndFinance) > score_for(Category::Academics)
        );

        let result = keyword_categorize(title, description, CategorizationMethod::KeywordFallback);
        assert_eq!(result.category, "Administration and Finance");
        assert!(result.confidence > 0.0);
        assert_eq!(result.all_scores[0].category, Category::AdministrationAndFinance);
    }

    #[test]
    fn test_blank_input_defaults_to_institute() {
        let result = keyword_categorize("  ", "", CategorizationMethod::KeywordFallback);
        assert_eq!(result.category, "Institute");
        assert_eq!(result.confidence, 0.0);
        assert!(result.scores.is_empty());
    }

    #[test]
    fn test_no_keyword_hits_defaults_to_institute() {
        let result = keyword_categorize("zzz", "qqq", CategorizationMethod::KeywordFallback);
        assert_eq!(result.category, "Institute");
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.scores.len(), 6);
    }

    #[test]
    fn test_keyword_categorize_is_deterministic() {
        let first = keyword_categorize(
            "Scholarship application",
            "financial aid for freshman students",
            CategorizationMethod::KeywordFallback,
        );
        for _ in 0..5 {
            let again = keyword_categorize(
                "Scholarship application",
                "financial aid for freshman students",
                CategorizationMethod::KeywordFallback,
            );
            assert_eq!(again, first);
        }
        assert_eq!(first.category, "Student Services");
    }

    #[test]
    fn test_fallback_never_leaves_vocabulary() {
        let inputs = [
            ("Board resolution", "memorandum from the president"),
            ("Lab results", "field work findings"),
            ("Renovation", "building upgrade timeline"),
            ("", "thesis defense schedule"),
        ];
        for (title, description) in inputs {
            let result =
                keyword_categorize(title, description, CategorizationMethod::KeywordFallback);
            assert!(Category::from_label(&result.category).is_some());
            assert!((0.0..=1.0).contains(&result.confidence));
        }
    }
}
