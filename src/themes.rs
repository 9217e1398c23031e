//! Fixed thematic taxonomies and first-match keyword classification.
//!
//! Tables are ordered: when a record mentions keywords from several themes, the earlier theme
//! wins. Reordering a table changes how grouped views bucket records.

use itertools::Itertools;

use crate::models::{Opportunity, Project, Publication};
use crate::text::fold;

#[derive(Debug, PartialEq, Eq)]
pub struct ThemeDefinition {
    pub id: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    pub keywords: &'static [&'static str], // lowercase
    pub icon: &'static str,
    pub color: &'static str,
}

/// Anything with a title and free text that can be bucketed.
pub trait Themed {
    fn title(&self) -> &str;
    /// Free-text fields searched after the title, in order.
    fn body(&self) -> Vec<&str>;
}

impl<T: Themed + ?Sized> Themed for &T {
    fn title(&self) -> &str {
        (**self).title()
    }
    fn body(&self) -> Vec<&str> {
        (**self).body()
    }
}

impl Themed for Project {
    fn title(&self) -> &str {
        &self.title
    }
    fn body(&self) -> Vec<&str> {
        vec![&self.summary]
    }
}

impl Themed for Publication {
    fn title(&self) -> &str {
        &self.title
    }
    fn body(&self) -> Vec<&str> {
        self.summary.as_deref().into_iter().collect()
    }
}

impl Themed for Opportunity {
    fn title(&self) -> &str {
        &self.title
    }
    fn body(&self) -> Vec<&str> {
        self.sector.as_deref().into_iter().chain(self.fit_summary.as_deref()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemeKind {
    Opportunity,
    Project,
    Publication,
}

impl ThemeKind {
    pub fn table(self) -> &'static [ThemeDefinition] {
        match self {
            Self::Opportunity => OPPORTUNITY_THEMES,
            Self::Project => PROJECT_THEMES,
            Self::Publication => PUBLICATION_THEMES,
        }
    }
}

/// First theme with a keyword inside the title and body text; the table's first entry otherwise.
/// `None` only for an empty table.
pub fn classify<'t, T: Themed + ?Sized>(record: &T, table: &'t [ThemeDefinition]) -> Option<&'t ThemeDefinition> {
    let haystack = fold(&std::iter::once(record.title()).chain(record.body()).join(" "));
    table
        .iter()
        .find(|theme| theme.keywords.iter().any(|k| haystack.contains(k)))
        .or_else(|| table.first())
}

pub struct ThemeGroup<'t, 'r, T> {
    pub theme: &'t ThemeDefinition,
    pub members: Vec<&'r T>,
}

/// Bucket records by theme. Groups follow table order; empty themes are left out and member
/// order inside a group follows the input.
pub fn group_by_theme<'t, 'r, T: Themed>(records: &'r [T], table: &'t [ThemeDefinition]) -> Vec<ThemeGroup<'t, 'r, T>> {
    let mut groups: Vec<ThemeGroup<'t, 'r, T>> = table
        .iter()
        .map(|theme| ThemeGroup { theme, members: Vec::new() })
        .collect();
    for record in records {
        let Some(theme) = classify(record, table) else {
            continue;
        };
        if let Some(g) = groups.iter_mut().find(|g| std::ptr::eq(g.theme, theme)) {
            g.members.push(record);
        }
    }
    groups.retain(|g| !g.members.is_empty());
    groups
}

pub fn find_theme(table: &'static [ThemeDefinition], id: &str) -> Option<&'static ThemeDefinition> {
    table.iter().find(|t| t.id == id)
}

/* -------------------------------------------------------------------------- */
/* Tables                                                                     */
/* -------------------------------------------------------------------------- */

pub static OPPORTUNITY_THEMES: &[ThemeDefinition] = &[
    ThemeDefinition {
        id: "dfs",
        label: "Digital financial services",
        description: "Mobile money, payments interoperability, fintech licensing.",
        keywords: &["digital financial", "mobile money", "fintech", "payment", "remittance", "financial inclusion"],
        icon: "💳",
        color: "#0D9488",
    },
    ThemeDefinition {
        id: "digital-id",
        label: "Digital identity & data governance",
        description: "Foundational ID systems, registries, data-sharing frameworks.",
        keywords: &["digital id", "identity", "identification", "data governance", "registry", "biometric"],
        icon: "🪪",
        color: "#6366F1",
    },
    ThemeDefinition {
        id: "infra",
        label: "Broadband & infrastructure",
        description: "Backbone, towers, spectrum and universal access programmes.",
        keywords: &["broadband", "infrastructure", "fibre", "fiber", "spectrum", "tower", "connectivity", "satellite"],
        icon: "🛰️",
        color: "#2563EB",
    },
    ThemeDefinition {
        id: "privacy",
        label: "Data protection & AI policy",
        description: "Privacy law, cybersecurity and responsible AI frameworks.",
        keywords: &["data protection", "privacy", "artificial intelligence", "ai policy", "cyber"],
        icon: "🛡️",
        color: "#8B5CF6",
    },
    ThemeDefinition {
        id: "health",
        label: "Health supply chains",
        description: "Procurement, warehousing and distribution of health commodities.",
        keywords: &["supply chain", "health commodit", "pharmaceutical", "vaccine", "medical supplies"],
        icon: "🚚",
        color: "#059669",
    },
    ThemeDefinition {
        id: "markets",
        label: "Health markets & pricing",
        description: "Market shaping, pricing studies and competition in health markets.",
        keywords: &["pricing", "market shaping", "health market", "tariff", "competition"],
        icon: "📊",
        color: "#F59E0B",
    },
];

pub static PROJECT_THEMES: &[ThemeDefinition] = &[
    ThemeDefinition {
        id: "infrastructure",
        label: "Digital infrastructure",
        description: "PPPs for cables, towers, and broadband infrastructure sharing.",
        keywords: &["submarine", "cable", "broadband", "tower", "infrastructure", "sharing", "spectrum", "ppp", "connectivity"],
        icon: "🌐",
        color: "#0369A1",
    },
    ThemeDefinition {
        id: "data-trust",
        label: "Data & trust frameworks",
        description: "Drafting digital ID, privacy, and cybersecurity regimes.",
        keywords: &["data", "privacy", "protection", "digital id", "identification", "cyber", "trust"],
        icon: "🛡️",
        color: "#6D28D9",
    },
    ThemeDefinition {
        id: "inclusion",
        label: "Inclusive finance & commerce",
        description: "Fintech licensing, remittances, consumer protection, interoperability.",
        keywords: &["finance", "financial", "remitt", "bank", "fintech", "commerce", "payment", "mobile money"],
        icon: "💸",
        color: "#047857",
    },
    ThemeDefinition {
        id: "policy",
        label: "Policy & governance",
        description: "Regulatory reform, legislative drafting, and independent advisory.",
        keywords: &["policy", "govern", "draft", "law", "regulation", "government", "advising"],
        icon: "🏛️",
        color: "#4338CA",
    },
    ThemeDefinition {
        id: "innovation",
        label: "Innovation & partnerships",
        description: "IoT launches, strategic partnerships, and future-facing transactions.",
        keywords: &["iot", "connected", "innovation", "partnership", "transaction", "cloud", "cooperative"],
        icon: "🚀",
        color: "#B45309",
    },
];

pub static PUBLICATION_THEMES: &[ThemeDefinition] = &[
    ThemeDefinition {
        id: "data",
        label: "Data & AI governance",
        description: "Privacy, digital ID, responsible AI, and cross-border data flows.",
        keywords: &["data", "privacy", "id", "identity", "ai", "cyber", "biometric"],
        icon: "🛡️",
        color: "#7C3AED",
    },
    ThemeDefinition {
        id: "telecom",
        label: "Telecom & infrastructure",
        description: "PPP models, fiber networks, spectrum, universal connectivity.",
        keywords: &["telecom", "broadband", "infrastructure", "spectrum", "tower", "fiber", "satellite"],
        icon: "📡",
        color: "#2563EB",
    },
    ThemeDefinition {
        id: "dfs",
        label: "Digital financial services",
        description: "Mobile money, interoperability, consumer protection, fintech.",
        keywords: &["financial", "fintech", "mobile money", "dfs", "payments", "bank", "remittance", "finance"],
        icon: "💳",
        color: "#059669",
    },
    ThemeDefinition {
        id: "competition",
        label: "Competition & policy reform",
        description: "Market inquiries, dispute resolution, mergers, regulatory design.",
        keywords: &["competition", "arbitration", "merger", "policy", "dispute", "litigation", "market"],
        icon: "⚖️",
        color: "#4F46E5",
    },
    ThemeDefinition {
        id: "commerce",
        label: "Commerce & joint ventures",
        description: "Investment vehicles, commercial transactions, JV structures.",
        keywords: &["commerce", "joint", "venture", "transactions", "investment", "deal"],
        icon: "🤝",
        color: "#D97706",
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    fn project(title: &str, summary: &str) -> Project {
        Project { title: title.into(), summary: summary.into(), category: None }
    }

    #[test]
    fn earlier_theme_wins_when_several_match() {
        // "cable" (infrastructure) and "payment" (inclusion) both appear
        let p = project("Payment switch over a submarine cable", "");
        assert_eq!(classify(&p, PROJECT_THEMES).unwrap().id, "infrastructure");

        // reversed wording, same outcome: order of the table decides, not order in the text
        let p = project("Cable landing", "Mobile payment rails");
        assert_eq!(classify(&p, PROJECT_THEMES).unwrap().id, "infrastructure");
    }

    #[test]
    fn summary_text_counts_and_case_is_ignored() {
        let p = project("Advisory mandate", "Drafted the national REMITTANCE framework");
        assert_eq!(classify(&p, PROJECT_THEMES).unwrap().id, "inclusion");
    }

    #[test]
    fn unmatched_records_fall_back_to_first_theme() {
        let p = project("Zzz", "nothing relevant here");
        assert_eq!(classify(&p, PROJECT_THEMES).unwrap().id, PROJECT_THEMES[0].id);

        let publication = Publication {
            title: "Quarterly newsletter".into(),
            summary: None,
            url: "https://example.org/n".into(),
            year: None,
            kind: None,
        };
        assert_eq!(classify(&publication, PUBLICATION_THEMES).unwrap().id, "data");
    }

    #[test]
    fn publication_substring_keywords_behave_as_declared() {
        // "ai" is a substring keyword, so "Sustainable" lands in data governance before telecom
        let publication = Publication {
            title: "Sustainable broadband".into(),
            summary: None,
            url: "https://example.org/p".into(),
            year: None,
            kind: None,
        };
        assert_eq!(classify(&publication, PUBLICATION_THEMES).unwrap().id, "data");
    }

    #[test]
    fn opportunity_text_spans_sector_and_fit_summary() {
        let mut opp: Opportunity = serde_json::from_value(serde_json::json!({
            "id": "a",
            "title": "Technical assistance",
            "totalScore": 0,
            "structuredScore": 0,
            "semanticMatches": [],
            "fitPros": [],
            "fitCons": [],
            "referenceProjects": [],
            "documents": [],
            "technologies": [],
            "sector": "Public administration",
            "fitSummary": "Builds on our national ID registry work."
        }))
        .unwrap();
        // the sector alone matches nothing; the summary still counts
        assert_eq!(classify(&opp, OPPORTUNITY_THEMES).unwrap().id, "digital-id");

        opp.fit_summary = None;
        assert_eq!(classify(&opp, OPPORTUNITY_THEMES).unwrap().id, OPPORTUNITY_THEMES[0].id);
    }

    #[test]
    fn empty_table_classifies_to_nothing() {
        let p = project("Tower sharing", "");
        assert!(classify(&p, &[]).is_none());
        assert!(group_by_theme(&[p], &[]).is_empty());
    }

    #[test]
    fn grouping_follows_table_order_and_drops_empty_themes() {
        let projects = vec![
            project("IoT launch", "connected devices"),
            project("Tower sharing", ""),
            project("Cloud partnership", ""),
        ];
        let groups = group_by_theme(&projects, PROJECT_THEMES);
        let ids: Vec<_> = groups.iter().map(|g| g.theme.id).collect();
        assert_eq!(ids, vec!["infrastructure", "innovation"]);
        assert_eq!(groups[1].members.len(), 2);
        assert_eq!(groups[1].members[0].title, "IoT launch");
    }

    #[test]
    fn every_table_is_non_empty_with_unique_ids() {
        for kind in [ThemeKind::Opportunity, ThemeKind::Project, ThemeKind::Publication] {
            let table = kind.table();
            assert!(!table.is_empty());
            for (i, t) in table.iter().enumerate() {
                assert!(table[i + 1..].iter().all(|o| o.id != t.id));
                assert!(t.keywords.iter().all(|k| *k == k.to_lowercase()));
            }
        }
        assert_eq!(find_theme(OPPORTUNITY_THEMES, "infra").unwrap().label, "Broadband & infrastructure");
    }
}
