//! In-memory narrowing of a normalized opportunity list.
//!
//! `filter_opportunities` is a pure function of `(list, state)`: every UI binding (the CLI `list`
//! command today, a browser table tomorrow) recomputes it whenever the state changes.

use itertools::Itertools;
use std::fmt;
use std::str::FromStr;

use crate::models::Opportunity;
use crate::text::{contains_folded, fold};
use crate::themes::{classify, ThemeDefinition, OPPORTUNITY_THEMES};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcurementFilter {
    #[default]
    All,
    Rfp,
    Rfq,
    Itb,
    Eoi,
}

impl ProcurementFilter {
    pub const OPTIONS: [ProcurementFilter; 5] = [Self::All, Self::Rfp, Self::Rfq, Self::Itb, Self::Eoi];

    pub fn label(self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Rfp => "RFP",
            Self::Rfq => "RFQ",
            Self::Itb => "ITB",
            Self::Eoi => "EOI",
        }
    }

    fn accepts(self, procurement_type: Option<&str>) -> bool {
        match self {
            Self::All => true,
            selected => procurement_type == Some(selected.label()),
        }
    }
}

impl fmt::Display for ProcurementFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for ProcurementFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::OPTIONS
            .into_iter()
            .find(|opt| opt.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown procurement type '{}' (expected one of All, RFP, RFQ, ITB, EOI)", s))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CountryFilter {
    #[default]
    All,
    Named(String),
}

impl CountryFilter {
    fn accepts(&self, country: Option<&str>) -> bool {
        match self {
            Self::All => true,
            Self::Named(wanted) => fold(country.unwrap_or_default()) == fold(wanted),
        }
    }
}

impl FromStr for CountryFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || s.eq_ignore_ascii_case("all") {
            Ok(Self::All)
        } else {
            Ok(Self::Named(s.to_string()))
        }
    }
}

/// Ephemeral, per-session filter selection.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterState {
    pub min_score: i64,
    pub procurement_type: ProcurementFilter,
    pub country: CountryFilter,
    pub budget_min: f64,
    pub search: String,
}

impl FilterState {
    pub fn with_min_score(min_score: i64) -> Self {
        Self { min_score, ..Self::default() }
    }
}

/// Keep the opportunities that pass every active filter, in their original order.
pub fn filter_opportunities<'a>(list: &'a [Opportunity], state: &FilterState) -> Vec<&'a Opportunity> {
    let needle = fold(state.search.trim());
    list.iter().filter(|opp| passes(opp, state, &needle)).collect()
}

fn passes(opp: &Opportunity, state: &FilterState, needle: &str) -> bool {
    // a floor of 0 or below is inactive, so out-of-range scores still show by default
    if state.min_score > 0 && opp.total_score < state.min_score {
        return false;
    }
    if !state.procurement_type.accepts(opp.procurement_type.as_deref()) {
        return false;
    }
    if !state.country.accepts(opp.country.as_deref()) {
        return false;
    }
    if state.budget_min > 0.0 {
        let max = opp.budget.as_ref().and_then(|b| b.max);
        if !max.is_some_and(|m| m >= state.budget_min) {
            return false;
        }
    }
    if !needle.is_empty() && !contains_folded(&search_haystack(opp), needle) {
        return false;
    }
    true
}

/// Title, agency, country, fit summary, strengths and reference-project titles, space-joined.
fn search_haystack(opp: &Opportunity) -> String {
    [opp.title.as_str()]
        .into_iter()
        .chain(opp.agency.as_deref())
        .chain(opp.country.as_deref())
        .chain(opp.fit_summary.as_deref())
        .chain(opp.fit_pros.iter().map(String::as_str))
        .chain(opp.reference_projects.iter().map(|p| p.title.as_str()))
        .join(" ")
}

/// Narrow an already filtered list to the opportunities classified under `theme`.
pub fn retain_theme<'a>(list: Vec<&'a Opportunity>, theme: &ThemeDefinition) -> Vec<&'a Opportunity> {
    list.into_iter()
        .filter(|o| classify(*o, OPPORTUNITY_THEMES).is_some_and(|t| t.id == theme.id))
        .collect()
}

/// "All" followed by the distinct countries present, sorted.
pub fn country_options(list: &[Opportunity]) -> Vec<String> {
    let countries = list
        .iter()
        .filter_map(|o| o.country.as_deref())
        .unique()
        .sorted_by_key(|c| fold(c))
        .map(str::to_string);
    std::iter::once("All".to_string()).chain(countries).collect()
}
