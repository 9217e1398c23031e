// src/draft.rs
use serde::Serialize;
use std::collections::HashMap;

use crate::models::{Budget, Opportunity, Publication};
use crate::text::{fold, group_thousands};

const DEFAULT_COUNTRY: &str = "the target country";
const DEFAULT_AGENCY: &str = "the contracting authority";
const MAX_EXPERIENCE_LINES: usize = 3;
const MAX_REFERENCE_CARDS: usize = 4;

pub const BUDGET_NOT_DISCLOSED: &str = "Budget has not been disclosed; our indicative fee envelope will be confirmed following the request for proposals.";

/// Editable Expression of Interest for one opportunity. Every section is always present;
/// sections without data fall back to writing prompts.
pub fn render_draft(opp: &Opportunity) -> String {
    let title = opp.title.trim();
    let country = opp.country.as_deref().or(opp.country_code.as_deref()).unwrap_or(DEFAULT_COUNTRY);
    let agency = opp.agency.as_deref().unwrap_or(DEFAULT_AGENCY);

    let mut out = String::new();
    out.push_str(&format!("Subject: Expression of Interest – {}\n\n", title));
    out.push_str(&format!("Dear {} team,\n\n", agency));
    out.push_str(&format!(
        "[Firm name], an international advisory firm specialising in digital infrastructure, financial inclusion, and regulatory reform, is pleased to submit this Expression of Interest for the assignment “{}” in {}.\n\n",
        title, country
    ));

    out.push_str("1. Firm overview and capability\n");
    out.push_str("• Summarise the firm’s core mandate, years of operation, global reach, and sector expertise relevant to the assignment.\n");
    out.push_str("• Reference in-country registrations, partnerships, or framework agreements that show local presence and compliance.\n\n");

    out.push_str("2. Relevant experience\n");
    out.push_str(&experience_lines(opp));
    out.push_str("\n\n");

    out.push_str("3. Proposed key experts\n");
    out.push_str("• Lead technical advisor – expertise aligned with the scope (e.g. digital financial services, telecom regulation, data governance).\n");
    out.push_str("• Sector/legal specialists – two or three domain experts covering policy, legal drafting, and implementation.\n");
    out.push_str("• Local counterpart(s) – arrangements with national consultants or institutions for continuity and in-country delivery.\n\n");

    out.push_str("4. Approach to delivery\n");
    out.push_str("• Outline how the team combines regulatory insight, stakeholder engagement, and implementation support.\n");
    out.push_str("• Reference deliverable management, knowledge transfer, and capacity building components.\n\n");

    out.push_str("5. Administrative information\n");
    out.push_str(&budget_line(opp.budget.as_ref()));
    out.push('\n');
    out.push_str("• We confirm eligibility under the procurement rules and absence of any conflict of interest.\n");
    out.push_str("• The firm is prepared to mobilise immediately upon receipt of the request for proposals.\n");
    out.push_str("• Supporting documentation (firm profile, CVs, legal incorporation) can be provided upon request.\n\n");

    out.push_str("We appreciate the opportunity to be considered for this assignment and remain available for any clarifications.\n\n");
    out.push_str("Kind regards,\n[Name]\n[Title]\n[Firm name]\n[Email | Phone]");
    out
}

fn experience_lines(opp: &Opportunity) -> String {
    if opp.reference_projects.is_empty() {
        return "• Highlight two or three projects of similar scale and scope.\n\
                • Emphasise measurable outcomes, beneficiaries, and institutional partners."
            .to_string();
    }
    opp.reference_projects
        .iter()
        .take(MAX_EXPERIENCE_LINES)
        .map(|p| match p.summary.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(summary) => format!("• {} – {}", p.title, summary),
            None => format!("• {}", p.title),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// "The indicative budget is $min[ to $max] CUR[ (estimated)]." or the not-disclosed sentence.
/// A max-only budget reads "up to $max".
pub fn budget_line(budget: Option<&Budget>) -> String {
    let Some(b) = budget else {
        return BUDGET_NOT_DISCLOSED.to_string();
    };
    let amount = match (b.min, b.max) {
        (Some(min), Some(max)) if max != min => format!("${} to ${}", group_thousands(min), group_thousands(max)),
        (Some(min), _) => format!("${}", group_thousands(min)),
        (None, Some(max)) => format!("up to ${}", group_thousands(max)),
        (None, None) => return BUDGET_NOT_DISCLOSED.to_string(),
    };
    let estimated = if b.is_estimated { " (estimated)" } else { "" };
    format!("The indicative budget is {} {}{}.", amount, b.currency, estimated)
}

/// Short budget label for tables and side panels.
pub fn format_budget_range(budget: Option<&Budget>) -> String {
    let Some(b) = budget else {
        return "Not specified".to_string();
    };
    let prefix = if b.is_estimated { "Estimated " } else { "" };
    let money = |v: f64| format!("{} {}", group_thousands(v), b.currency);
    match (b.min, b.max) {
        (Some(min), Some(max)) if max != min => format!("{}{} – {}", prefix, money(min), money(max)),
        (Some(v), _) | (None, Some(v)) => format!("{}{}", prefix, money(v)),
        (None, None) => "Not specified".to_string(),
    }
}

/* -------------------------------------------------------------------------- */
/* Reference side panel                                                       */
/* -------------------------------------------------------------------------- */

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceCard {
    pub id: String,
    pub title: String,
    pub snippet: String,
    pub relevance: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftReferences {
    pub project_references: Vec<ReferenceCard>,
    pub publication_references: Vec<ReferenceCard>,
}

pub fn build_references(opp: &Opportunity, catalog: &[Publication]) -> DraftReferences {
    DraftReferences {
        project_references: project_references(opp),
        publication_references: publication_references(opp, catalog),
    }
}

pub fn project_references(opp: &Opportunity) -> Vec<ReferenceCard> {
    opp.reference_projects
        .iter()
        .take(MAX_REFERENCE_CARDS)
        .enumerate()
        .map(|(i, p)| ReferenceCard {
            id: format!("project-{}", i),
            title: p.title.clone(),
            snippet: p
                .summary
                .clone()
                .unwrap_or_else(|| "Previously delivered engagement flagged by the notice.".to_string()),
            relevance: "Cited in the RFP as precedent work completed by the firm.".to_string(),
            source: None,
            url: None,
        })
        .collect()
}

/// Semantic matches enriched from the publications catalog by case-insensitive title.
pub fn publication_references(opp: &Opportunity, catalog: &[Publication]) -> Vec<ReferenceCard> {
    let by_title: HashMap<String, &Publication> = catalog.iter().map(|p| (fold(&p.title), p)).collect();

    opp.semantic_matches
        .iter()
        .take(MAX_REFERENCE_CARDS)
        .enumerate()
        .map(|(i, m)| {
            let title = m.source_title.clone().unwrap_or_else(|| format!("Relevant insight {}", i + 1));
            let publication = by_title.get(&fold(&title)).copied();
            let relevance = if m.score > 0.0 {
                format!("Semantic match ({:.0}% relevance) to the current notice.", m.score * 100.0)
            } else {
                "Identified as relevant to this notice.".to_string()
            };
            ReferenceCard {
                id: format!("publication-{}", i),
                title,
                snippet: publication.and_then(|p| p.summary.clone()).unwrap_or_else(|| {
                    "Open the linked insight for a detailed excerpt aligned with this assignment.".to_string()
                }),
                relevance,
                source: publication.and_then(|p| p.kind.as_deref()).map(str::to_uppercase),
                url: m.source_url.clone().or_else(|| publication.map(|p| p.url.clone())),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ReferenceProject, SemanticMatch};

    fn budget(min: Option<f64>, max: Option<f64>) -> Budget {
        Budget { currency: "USD".into(), min, max, is_estimated: false, estimate_source: None }
    }

    fn bare() -> Opportunity {
        Opportunity {
            id: "n-1".into(),
            title: "Regulatory review of mobile money".into(),
            agency: None,
            country: None,
            country_code: None,
            region: None,
            procurement_type: None,
            deadline: None,
            total_score: 0,
            structured_score: 0,
            semantic_score: None,
            semantic_matches: vec![],
            fit_summary: None,
            fit_pros: vec![],
            fit_cons: vec![],
            reference_projects: vec![],
            documents: vec![],
            sector: None,
            technologies: vec![],
            budget: None,
        }
    }

    #[test]
    fn equal_bounds_render_a_single_amount() {
        let b = budget(Some(50_000.0), Some(50_000.0));
        assert_eq!(budget_line(Some(&b)), "The indicative budget is $50,000 USD.");
    }

    #[test]
    fn absent_bounds_render_the_disclosure_sentence() {
        assert_eq!(budget_line(Some(&budget(None, None))), BUDGET_NOT_DISCLOSED);
        assert_eq!(budget_line(None), BUDGET_NOT_DISCLOSED);
    }

    #[test]
    fn ranges_and_estimates() {
        let mut b = budget(Some(50_000.0), Some(120_000.0));
        b.currency = "EUR".into();
        b.is_estimated = true;
        assert_eq!(budget_line(Some(&b)), "The indicative budget is $50,000 to $120,000 EUR (estimated).");
        assert_eq!(budget_line(Some(&budget(Some(8_000.0), None))), "The indicative budget is $8,000 USD.");
        assert_eq!(budget_line(Some(&budget(None, Some(75_000.0)))), "The indicative budget is up to $75,000 USD.");
    }

    #[test]
    fn draft_without_data_still_has_every_section() {
        let text = render_draft(&bare());
        for heading in [
            "1. Firm overview and capability",
            "2. Relevant experience",
            "3. Proposed key experts",
            "4. Approach to delivery",
            "5. Administrative information",
        ] {
            assert!(text.contains(heading), "missing {heading}");
        }
        assert!(text.contains("in the target country."));
        assert!(text.contains("Dear the contracting authority team,"));
        assert!(text.contains("• Highlight two or three projects of similar scale and scope."));
        assert!(text.contains(BUDGET_NOT_DISCLOSED));
    }

    #[test]
    fn draft_lists_at_most_three_reference_projects() {
        let mut opp = bare();
        opp.country = Some("Rwanda".into());
        opp.agency = Some("UNDP".into());
        opp.budget = Some(budget(Some(50_000.0), Some(50_000.0)));
        for i in 1..=5 {
            opp.reference_projects.push(ReferenceProject {
                title: format!("Project {}", i),
                summary: if i == 1 { Some("Drafted the NPS act".into()) } else { None },
            });
        }
        let text = render_draft(&opp);
        assert!(text.contains("“Regulatory review of mobile money” in Rwanda."));
        assert!(text.contains("Dear UNDP team,"));
        assert!(text.contains("• Project 1 – Drafted the NPS act\n• Project 2\n• Project 3\n"));
        assert!(!text.contains("Project 4"));
        assert!(text.contains("The indicative budget is $50,000 USD.\n"));
    }

    #[test]
    fn budget_range_label() {
        assert_eq!(format_budget_range(None), "Not specified");
        let mut b = budget(Some(10_000.0), Some(25_000.0));
        assert_eq!(format_budget_range(Some(&b)), "10,000 USD – 25,000 USD");
        b.is_estimated = true;
        b.min = None;
        assert_eq!(format_budget_range(Some(&b)), "Estimated 25,000 USD");
    }

    #[test]
    fn publication_cards_use_catalog_fallbacks() {
        let mut opp = bare();
        opp.semantic_matches = vec![
            SemanticMatch { score: 0.82, source_title: Some("digital id primer".into()), source_url: None },
            SemanticMatch { score: 0.0, source_title: None, source_url: Some("https://example.org/x".into()) },
        ];
        let catalog = vec![Publication {
            title: "Digital ID Primer".into(),
            summary: Some("What regulators should ask first.".into()),
            url: "https://example.org/id-primer".into(),
            year: Some("2024".into()),
            kind: Some("brief".into()),
        }];
        let cards = publication_references(&opp, &catalog);
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].relevance, "Semantic match (82% relevance) to the current notice.");
        assert_eq!(cards[0].snippet, "What regulators should ask first.");
        assert_eq!(cards[0].source.as_deref(), Some("BRIEF"));
        assert_eq!(cards[0].url.as_deref(), Some("https://example.org/id-primer"));
        assert_eq!(cards[1].title, "Relevant insight 2");
        assert_eq!(cards[1].relevance, "Identified as relevant to this notice.");
        assert_eq!(cards[1].url.as_deref(), Some("https://example.org/x"));
    }

    #[test]
    fn project_cards_default_their_snippet() {
        let mut opp = bare();
        opp.reference_projects.push(ReferenceProject { title: "Tower sharing PPP".into(), summary: None });
        let cards = project_references(&opp);
        assert_eq!(cards[0].id, "project-0");
        assert_eq!(cards[0].snippet, "Previously delivered engagement flagged by the notice.");
    }
}
