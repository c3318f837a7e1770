//! Rule-based insight synthesis.
//!
//! Three independent rule families run over the normalized corpus:
//! keyword heuristics ("Strategic Signals"), category workload
//! ("Workload Highlights"), and routing status ("Workflow Alerts").

use crate::models::{main_category, Impact, Insight, InsightGroup, NormalizedDocument};
use std::collections::HashMap;

const MAX_STRATEGIC: usize = 8;
const MAX_WORKLOAD: usize = 6;
const MAX_WORKFLOW: usize = 4;
const MAX_RECURRING: usize = 4;
const DOMINANT_SHARE: f64 = 0.35;
const ACTIVE_SHARE: f64 = 0.2;
const PENDING_ALERT_ABOVE: usize = 5;

/// A keyword heuristic.
///
/// `detail` may contain `{count}` (matching documents) and `{s}` (plural
/// suffix for "document").
#[derive(Debug, Clone, Copy)]
pub struct HeuristicRule {
    pub id: &'static str,
    pub title: &'static str,
    pub keywords: &'static [&'static str],
    pub threshold: usize,
    pub category: &'static str,
    pub impact: Impact,
    pub detail: &'static str,
}

impl HeuristicRule {
    fn render(&self, count: usize) -> String {
        self.detail
            .replace("{count}", &count.to_string())
            .replace("{s}", plural(count))
    }

    fn matches(&self, doc: &NormalizedDocument) -> bool {
        self.keywords.iter().any(|k| doc.full_text.contains(k))
    }
}

pub static HEURISTIC_RULES: &[HeuristicRule] = &[
    HeuristicRule {
        id: "accreditation_push",
        title: "Accreditation Preparation",
        keywords: &[
            "aaccup",
            "accreditation",
            "copc",
            "program compliance",
            "technical review",
            "survey visit",
        ],
        threshold: 2,
        category: "Academics",
        impact: Impact::High,
        detail: "High activity detected regarding accreditation (AACCUP/COPC). {count} document{s} indicate the institute is in a compliance or audit phase.",
    },
    HeuristicRule {
        id: "financial_bottleneck",
        title: "Reimbursement Spike",
        keywords: &["reimbursement", "liquidation", "petty cash", "refund", "cash advance"],
        threshold: 3,
        category: "Finance",
        impact: Impact::Medium,
        detail: "There are {count} active reimbursement or liquidation requests. This may signal a backlog in financial processing.",
    },
    HeuristicRule {
        id: "infrastructure_dev",
        title: "Infrastructure Projects",
        keywords: &[
            "construction",
            "repair",
            "renovation",
            "infrastructure",
            "building",
            "labor",
            "project site",
        ],
        threshold: 2,
        category: "Development",
        impact: Impact::High,
        detail: "Physical development is active. {count} document{s} refer to construction, repairs, or infrastructure upgrades.",
    },
    HeuristicRule {
        id: "student_financial_aid",
        title: "Scholarship Distribution",
        keywords: &[
            "scholarship",
            "financial assistance",
            "stipend",
            "grant",
            "unclaimed atm",
            "uni-fast",
            "tes",
        ],
        threshold: 2,
        category: "Student Services",
        impact: Impact::High,
        detail: "Student financial services are busy. {count} document{s} involve scholarships or release of allowances.",
    },
    HeuristicRule {
        id: "health_alert",
        title: "Health & Wellness Watch",
        keywords: &[
            "flu",
            "fever",
            "sick",
            "medical certificate",
            "quarantine",
            "health",
            "confinement",
        ],
        threshold: 2,
        category: "HR",
        impact: Impact::Medium,
        detail: "Detected {count} health-related document{s} (e.g., sick leaves). Check if this aligns with seasonal wellness concerns.",
    },
    HeuristicRule {
        id: "weather_disruption",
        title: "Weather Impact",
        keywords: &[
            "typhoon",
            "suspension",
            "storm",
            "heavy rain",
            "disaster",
            "calamity",
            "flood",
        ],
        threshold: 1,
        category: "Operations",
        impact: Impact::High,
        detail: "Weather conditions are affecting operations, with {count} document{s} mentioning suspensions or typhoons.",
    },
    HeuristicRule {
        id: "procurement_rush",
        title: "Urgent Procurement",
        keywords: &["urgent", "rush", "immediate", "emergency purchase", "catering", "meals"],
        threshold: 3,
        category: "Procurement",
        impact: Impact::Medium,
        detail: "{count} procurement document{s} suggest rapid purchasing cycles or events preparation.",
    },
    HeuristicRule {
        id: "strategic_partnerships",
        title: "Partnership Expansion",
        keywords: &[
            "moa",
            "mou",
            "memorandum of agreement",
            "understanding",
            "linkage",
            "partnership",
            "signing",
        ],
        threshold: 1,
        category: "Legal & Linkages",
        impact: Impact::High,
        detail: "Strategic growth detected: {count} document{s} involve MOAs or MOUs, indicating new external partnerships.",
    },
    HeuristicRule {
        id: "faculty_mobility",
        title: "Faculty & Staff Mobility",
        keywords: &[
            "travel order",
            "itinerary",
            "official business",
            "seminar",
            "workshop",
            "convention",
        ],
        threshold: 3,
        category: "HR/Admin",
        impact: Impact::Neutral,
        detail: "High mobility detected. {count} document{s} relate to official business trips or conferences.",
    },
    HeuristicRule {
        id: "it_infrastructure",
        title: "IT System Strain",
        keywords: &[
            "internet",
            "wifi",
            "network",
            "connectivity",
            "slow",
            "down",
            "server",
            "repair computer",
        ],
        threshold: 2,
        category: "ICT Services",
        impact: Impact::Medium,
        detail: "Technical issues reported. {count} document{s} mention network or IT disruptions.",
    },
    HeuristicRule {
        id: "audit_compliance_risk",
        title: "COA/Audit Compliance",
        keywords: &[
            "coa",
            "commission on audit",
            "audit observation",
            "notice of suspension",
            "disallowance",
            "audit query",
        ],
        threshold: 1,
        category: "Finance/Legal",
        impact: Impact::High,
        detail: "Compliance alert: {count} document{s} explicitly mention COA or audit observations. Immediate attention recommended.",
    },
    HeuristicRule {
        id: "faculty_ranking",
        title: "Faculty Promotion Cycle",
        keywords: &[
            "nbc 461",
            "ranking",
            "promotion",
            "reclassification",
            "plantilla",
            "step increment",
        ],
        threshold: 1,
        category: "HR",
        impact: Impact::High,
        detail: "Faculty career movements detected. {count} document{s} relate to NBC 461 ranking or promotions.",
    },
];

/// Produce grouped insights for the corpus.
pub fn synthesize(docs: &[NormalizedDocument]) -> Vec<InsightGroup> {
    if docs.is_empty() {
        return vec![InsightGroup {
            id: "empty".to_string(),
            title: "Insights".to_string(),
            items: vec![Insight {
                title: "No insights available".to_string(),
                detail: "Add documents to see AI-generated observations about institutional activity."
                    .to_string(),
                category: "General".to_string(),
                impact: Impact::Neutral,
            }],
        }];
    }

    let groups = [
        ("creative", "Strategic Signals", heuristic_insights(docs), MAX_STRATEGIC),
        ("workload", "Workload Highlights", workload_insights(docs), MAX_WORKLOAD),
        ("workflow", "Workflow Alerts", workflow_insights(docs), MAX_WORKFLOW),
    ];

    groups
        .into_iter()
        .map(|(id, title, items, cap)| InsightGroup {
            id: id.to_string(),
            title: title.to_string(),
            items: dedupe_and_cap(items, cap),
        })
        .filter(|group| !group.items.is_empty())
        .collect()
}

/// Fire every heuristic rule whose matching-document count meets its threshold.
pub fn heuristic_insights(docs: &[NormalizedDocument]) -> Vec<Insight> {
    HEURISTIC_RULES
        .iter()
        .filter_map(|rule| {
            let count = docs.iter().filter(|d| rule.matches(d)).count();
            (count >= rule.threshold).then(|| Insight {
                title: rule.title.to_string(),
                detail: rule.render(count),
                category: rule.category.to_string(),
                impact: rule.impact,
            })
        })
        .collect()
}

/// Dominant and active main categories, then recurring categories.
pub fn workload_insights(docs: &[NormalizedDocument]) -> Vec<Insight> {
    let total = docs.len() as f64;
    let mut insights = Vec::new();

    for (category, count) in sorted_counts(docs, |d| d.ai_main_category.as_str()) {
        let share = count as f64 / total;
        let percent = (share * 100.0).round();
        if share >= DOMINANT_SHARE {
            insights.push(Insight {
                title: format!("{} dominates recent workload", category),
                detail: format!(
                    "{}% of tagged documents fall under {}, indicating a major operational focus.",
                    percent, category
                ),
                category: category.to_string(),
                impact: Impact::High,
            });
        } else if share >= ACTIVE_SHARE {
            insights.push(Insight {
                title: format!("{} remains active", category),
                detail: format!(
                    "{}% of records tie to {}, showing steady engagement.",
                    percent, category
                ),
                category: category.to_string(),
                impact: Impact::Medium,
            });
        }
    }

    let recurring = sorted_counts(docs, |d| d.document.ai_category.as_deref().unwrap_or(""))
        .into_iter()
        .filter(|(_, count)| *count >= 2)
        .take(MAX_RECURRING);

    for (subcategory, count) in recurring {
        insights.push(Insight {
            title: subcategory.to_string(),
            detail: format!(
                "{} document{} were categorized as {}, suggesting recurring activity in this area.",
                count,
                plural(count),
                subcategory
            ),
            category: main_category(subcategory).to_string(),
            impact: Impact::Medium,
        });
    }

    insights
}

/// Most common status, and a pending-volume alert.
pub fn workflow_insights(docs: &[NormalizedDocument]) -> Vec<Insight> {
    let mut insights = Vec::new();

    if let Some((status, count)) = sorted_counts(docs, |d| d.document.status.as_str()).first() {
        insights.push(Insight {
            title: format!("Most documents are {}", status),
            detail: format!(
                "{} document{} currently carry the status \u{201c}{}\u{201d}, which can guide routing priorities.",
                count,
                plural(*count),
                status
            ),
            category: "Workflow".to_string(),
            impact: Impact::Medium,
        });
    }

    let pending = docs
        .iter()
        .filter(|d| {
            let status = d.document.status.to_lowercase();
            !status.contains("completed") && !status.contains("released")
        })
        .count();

    if pending > PENDING_ALERT_ABOVE {
        insights.push(Insight {
            title: "High Pending Volume".to_string(),
            detail: format!(
                "{} document{} are still in routing (neither completed nor released).",
                pending,
                plural(pending)
            ),
            category: "Workflow".to_string(),
            impact: Impact::Medium,
        });
    }

    insights
}

/// Count non-empty keys, ordered by count descending then first occurrence.
fn sorted_counts<'a, F>(docs: &'a [NormalizedDocument], key: F) -> Vec<(&'a str, usize)>
where
    F: Fn(&'a NormalizedDocument) -> &'a str,
{
    let mut counts: Vec<(&str, usize)> = Vec::new();
    let mut positions: HashMap<&str, usize> = HashMap::new();

    for doc in docs {
        let k = key(doc);
        if k.is_empty() {
            continue;
        }
        match positions.get(k) {
            Some(&i) => counts[i].1 += 1,
            None => {
                positions.insert(k, counts.len());
                counts.push((k, 1));
            }
        }
    }

    counts.sort_by_key(|(_, count)| std::cmp::Reverse(*count));
    counts
}

/// Keep the first insight per title, then cap the list.
fn dedupe_and_cap(items: Vec<Insight>, cap: usize) -> Vec<Insight> {
    let mut seen = std::collections::HashSet::new();
    items
        .into_iter()
        .filter(|insight| seen.insert(insight.title.clone()))
        .take(cap)
        .collect()
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Document;
    use chrono::Utc;

    fn create_test_doc(title: &str, ai_category: &str, status: &str) -> NormalizedDocument {
        NormalizedDocument::from_document(Document {
            id: 1,
            dts_number: "20250000001".to_string(),
            title: title.to_string(),
            description: String::new(),
            doc_type: String::new(),
            status: status.to_string(),
            ai_category: Some(ai_category.to_string()),
            ai_confidence: Some(0.8),
            ai_override_by: None,
            ai_override_at: None,
            ai_override_reason: None,
            registered_by: None,
            created_at: Utc::now(),
        })
    }

    fn group<'a>(groups: &'a [InsightGroup], id: &str) -> Option<&'a InsightGroup> {
        groups.iter().find(|g| g.id == id)
    }

    #[test]
    fn test_empty_corpus_has_single_neutral_item() {
        let groups = synthesize(&[]);

        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].items.len(), 1);
        assert_eq!(groups[0].items[0].title, "No insights available");
        assert_eq!(groups[0].items[0].impact, Impact::Neutral);
    }

    #[test]
    fn test_accreditation_rule_fires_at_threshold() {
        let docs = vec![
            create_test_doc("Accreditation visit schedule", "Academics", "received"),
            create_test_doc("Memo on accreditation documents", "Academics", "received"),
            create_test_doc("Office supplies", "Administration and Finance", "received"),
        ];

        let insights = heuristic_insights(&docs);
        let accreditation = insights
            .iter()
            .find(|i| i.title == "Accreditation Preparation")
            .expect("accreditation insight");

        assert!(accreditation.detail.contains("2 documents"));
        assert_eq!(accreditation.impact, Impact::High);
        assert_eq!(accreditation.category, "Academics");
    }

    #[test]
    fn test_heuristic_below_threshold_does_not_fire() {
        let docs = vec![create_test_doc("Accreditation visit", "Academics", "received")];
        let insights = heuristic_insights(&docs);
        assert!(insights.iter().all(|i| i.title != "Accreditation Preparation"));
    }

    #[test]
    fn test_heuristics_are_non_exclusive_and_in_table_order() {
        let docs = vec![create_test_doc(
            "MOA signing postponed due to typhoon",
            "Institute",
            "received",
        )];

        let titles: Vec<String> = heuristic_insights(&docs)
            .into_iter()
            .map(|i| i.title)
            .collect();

        let weather = titles.iter().position(|t| t == "Weather Impact").unwrap();
        let partnership = titles.iter().position(|t| t == "Partnership Expansion").unwrap();
        assert!(weather < partnership);
    }

    #[test]
    fn test_singular_detail_text() {
        let docs = vec![create_test_doc("Flood in campus", "Institute", "received")];
        let weather = heuristic_insights(&docs)
            .into_iter()
            .find(|i| i.title == "Weather Impact")
            .unwrap();
        assert!(weather.detail.contains("with 1 document mentioning"));
    }

    #[test]
    fn test_workload_dominant_and_active() {
        let mut docs = Vec::new();
        for _ in 0..5 {
            docs.push(create_test_doc("a", "Academics: Exams", "received"));
        }
        for _ in 0..3 {
            docs.push(create_test_doc("b", "Institute", "received"));
        }
        for _ in 0..2 {
            docs.push(create_test_doc("c", "Student Services", "received"));
        }

        let insights = workload_insights(&docs);

        assert_eq!(insights[0].title, "Academics dominates recent workload");
        assert_eq!(insights[0].impact, Impact::High);
        assert!(insights[0].detail.starts_with("50%"));
        assert_eq!(insights[1].title, "Institute remains active");
        assert_eq!(insights[2].title, "Student Services remains active");

        let recurring: Vec<&Insight> = insights.iter().skip(3).collect();
        assert_eq!(recurring[0].title, "Academics: Exams");
        assert_eq!(recurring[0].category, "Academics");
        assert!(recurring[0].detail.starts_with("5 documents"));
        assert_eq!(recurring.len(), 3);
    }

    fn spread_workload() -> Vec<NormalizedDocument> {
        [
            "Academics: Exams",
            "Institute: Board",
            "Student Services: Scholarship",
            "Research and Extension: Grants",
            "Planning and Development: Repairs",
        ]
        .iter()
        .flat_map(|category| {
            (0..2).map(move |_| create_test_doc("memo", category, "received"))
        })
        .collect()
    }

    #[test]
    fn test_recurring_categories_are_capped() {
        let insights = workload_insights(&spread_workload());

        let active = insights
            .iter()
            .filter(|i| i.title.ends_with("remains active"))
            .count();
        let recurring: Vec<&str> = insights
            .iter()
            .filter(|i| i.title.contains(':'))
            .map(|i| i.title.as_str())
            .collect();

        assert_eq!(active, 5);
        assert_eq!(recurring.len(), MAX_RECURRING);
        assert_eq!(recurring[0], "Academics: Exams");
        assert!(!recurring.contains(&"Planning and Development: Repairs"));
    }

    #[test]
    fn test_workload_group_is_capped() {
        let groups = synthesize(&spread_workload());

        let workload = group(&groups, "workload").unwrap();
        assert_eq!(workload.items.len(), MAX_WORKLOAD);
        assert_eq!(workload.items[4].title, "Planning and Development remains active");
        assert_eq!(workload.items[5].title, "Academics: Exams");
    }

    #[test]
    fn test_workload_dedupe_keeps_first_occurrence() {
        let insights = workload_insights(&spread_workload());
        let repeated: Vec<Insight> = insights.iter().chain(insights.iter()).cloned().collect();

        let deduped = dedupe_and_cap(repeated, MAX_WORKLOAD);

        assert_eq!(deduped, insights[..MAX_WORKLOAD].to_vec());
    }

    #[test]
    fn test_workflow_alerts() {
        let mut docs = Vec::new();
        for _ in 0..4 {
            docs.push(create_test_doc("x", "Institute", "forwarded"));
        }
        for _ in 0..2 {
            docs.push(create_test_doc("x", "Institute", "received"));
        }
        docs.push(create_test_doc("x", "Institute", "Released"));

        let insights = workflow_insights(&docs);

        assert_eq!(insights[0].title, "Most documents are forwarded");
        assert!(insights[0].detail.starts_with("4 documents"));
        assert_eq!(insights[1].title, "High Pending Volume");
        assert!(insights[1].detail.starts_with("6 documents"));
    }

    #[test]
    fn test_pending_alert_needs_more_than_five() {
        let docs: Vec<_> = (0..5)
            .map(|_| create_test_doc("x", "Institute", "received"))
            .collect();
        let insights = workflow_insights(&docs);
        assert_eq!(insights.len(), 1);
    }

    #[test]
    fn test_groups_are_omitted_when_empty() {
        let docs = vec![create_test_doc("plain", "", "")];
        let groups = synthesize(&docs);

        // one pending document, no categories, no status, no heuristic hits
        assert!(groups.is_empty());
    }

    #[test]
    fn test_groups_and_caps() {
        let docs: Vec<_> = (0..10)
            .map(|_| {
                create_test_doc(
                    "typhoon moa coa promotion accreditation renovation scholarship flu urgent seminar slow refund",
                    "Institute",
                    "received",
                )
            })
            .collect();

        let groups = synthesize(&docs);

        let strategic = group(&groups, "creative").unwrap();
        assert_eq!(strategic.title, "Strategic Signals");
        assert_eq!(strategic.items.len(), 8);
        assert_eq!(group(&groups, "workload").unwrap().title, "Workload Highlights");
        assert_eq!(group(&groups, "workflow").unwrap().items.len(), 2);
    }

    #[test]
    fn test_dedupe_keeps_first() {
        let insight = |detail: &str| Insight {
            title: "Same".to_string(),
            detail: detail.to_string(),
            category: "X".to_string(),
            impact: Impact::Medium,
        };

        let deduped = dedupe_and_cap(vec![insight("first"), insight("second")], 4);

        assert_eq!(deduped.len(), 1);
        assert_eq!(deduped[0].detail, "first");
    }

    #[test]
    fn test_rule_ids_are_unique() {
        let mut ids: Vec<&str> = HEURISTIC_RULES.iter().map(|r| r.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), HEURISTIC_RULES.len());
    }
}
