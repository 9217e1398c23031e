use tracing::{debug, warn};

use crate::api_types::{RawAux, RawBudget, RawNotice};
use crate::models::*;

/// Map store records onto the client-facing shape, one output per input, never failing.
pub fn normalize_notices(raws: Vec<RawNotice>) -> Vec<Opportunity> {
    let count = raws.len();
    let out: Vec<Opportunity> = raws.into_iter().map(normalize_notice).collect();
    let with_budget = out.iter().filter(|o| o.budget.is_some()).count();
    debug!("Normalized notices - count={}, with_budget={}", count, with_budget);
    out
}

pub fn normalize_notice(raw: RawNotice) -> Opportunity {
    let id = raw.id.or(raw.notice_id).unwrap_or_default();
    let first_country = raw.countries.first();
    let country = first_country.and_then(|c| c.country.clone().or_else(|| c.country_code.clone()));
    let country_code = raw
        .country_code
        .or_else(|| first_country.and_then(|c| c.country_code.clone()));

    let total_score = raw.total_score.or(raw.fit_score).map(score_to_int).unwrap_or(0);
    let structured_score = raw.structured_score.map(score_to_int).unwrap_or(0);

    let aux = raw.raw_json.unwrap_or_default();
    let budget = merge_budget(&id, aux.budget.as_ref(), raw.budget_min, raw.budget_max, raw.currency.as_deref());
    let RawAux {
        semantic_score,
        semantic_matches,
        fit_summary,
        fit_pros,
        fit_cons,
        reference_projects,
        documents,
        budget: _,
    } = aux;

    Opportunity {
        id,
        title: raw.title.map(|t| t.trim().to_string()).unwrap_or_default(),
        agency: raw.agency,
        country,
        country_code,
        region: raw.region,
        procurement_type: raw.procurement_type,
        deadline: raw.deadline,
        total_score,
        structured_score,
        semantic_score,
        semantic_matches: semantic_matches
            .into_iter()
            .map(|m| SemanticMatch {
                score: m.score,
                source_title: m.source_title,
                source_url: m.source_url,
            })
            .collect(),
        fit_summary,
        fit_pros,
        fit_cons,
        reference_projects: reference_projects
            .into_iter()
            .map(|p| ReferenceProject { title: p.title, summary: p.summary })
            .collect(),
        documents: documents
            .into_iter()
            .map(|d| DocumentLink { title: d.title, url: d.url })
            .collect(),
        sector: raw.sector,
        technologies: raw.technologies,
        budget,
    }
}

fn score_to_int(score: f64) -> i64 {
    if score.is_finite() {
        score.round() as i64
    } else {
        0
    }
}

/// Nested budget wins outright; flattened fields only stand in when the nested one is missing
/// and carry at least one bound.
fn merge_budget(
    id: &str,
    nested: Option<&RawBudget>,
    flat_min: Option<f64>,
    flat_max: Option<f64>,
    flat_currency: Option<&str>,
) -> Option<Budget> {
    let flat_present = flat_min.is_some() || flat_max.is_some();

    if let Some(b) = nested {
        if budgets_conflict(b, flat_present, flat_min, flat_max, flat_currency) {
            warn!(
                "Budget conflict - notice={}, nested=({:?}..{:?} {:?}), flattened=({:?}..{:?} {:?}), keeping nested",
                id, b.min, b.max, b.currency, flat_min, flat_max, flat_currency
            );
        }
        return Some(Budget {
            currency: b.currency.clone().unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            min: b.min,
            max: b.max,
            is_estimated: b.is_estimated.unwrap_or(false),
            estimate_source: b.estimate_source.clone(),
        });
    }

    if !flat_present {
        return None;
    }

    Some(Budget {
        currency: flat_currency.unwrap_or(DEFAULT_CURRENCY).to_string(),
        min: flat_min,
        max: flat_max,
        is_estimated: false,
        estimate_source: None,
    })
}

fn budgets_conflict(
    nested: &RawBudget,
    flat_present: bool,
    flat_min: Option<f64>,
    flat_max: Option<f64>,
    flat_currency: Option<&str>,
) -> bool {
    let bounds_differ = flat_present && (nested.min != flat_min || nested.max != flat_max);
    let currency_differs = matches!(
        (nested.currency.as_deref(), flat_currency),
        (Some(a), Some(b)) if !a.eq_ignore_ascii_case(b)
    );
    bounds_differ || currency_differs
}
