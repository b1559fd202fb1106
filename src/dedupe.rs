//! Cross-source company deduplication.
//!
//! Records sharing a domain are merged outright. Records without a domain
//! are folded into the closest existing record by name similarity, with a
//! small bonus when the HQ city agrees.

use std::collections::{BTreeSet, HashMap};

use crate::models::{Company, HiringSignal};

/// Minimum similarity for a domain-less record to merge into another.
pub const NAME_SIMILARITY_THRESHOLD: f64 = 0.85;
const SAME_CITY_BONUS: f64 = 0.1;
const MULTI_SOURCE_BONUS: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DedupStats {
    pub original: usize,
    pub deduped: usize,
    pub removed: usize,
    /// Percentage of records removed, one decimal place.
    pub reduction_pct: f64,
}

impl DedupStats {
    pub fn new(original: usize, deduped: usize) -> Self {
        let removed = original.saturating_sub(deduped);
        let reduction_pct = if original == 0 {
            0.0
        } else {
            ((removed as f64 / original as f64) * 1000.0).round() / 10.0
        };
        Self {
            original,
            deduped,
            removed,
            reduction_pct,
        }
    }
}

pub fn dedupe_companies(companies: Vec<Company>) -> Vec<Company> {
    let mut order: Vec<String> = Vec::new();
    let mut by_domain: HashMap<String, Vec<Company>> = HashMap::new();
    let mut no_domain = Vec::new();

    for company in companies {
        if company.domain.is_empty() {
            no_domain.push(company);
            continue;
        }
        let group = by_domain.entry(company.domain.clone()).or_insert_with(|| {
            order.push(company.domain.clone());
            Vec::new()
        });
        group.push(company);
    }

    let mut deduped: Vec<Company> = order
        .iter()
        .filter_map(|domain| by_domain.remove(domain))
        .map(merge_companies)
        .collect();

    for company in no_domain {
        match find_similar_by_name(&company, &deduped) {
            Some(idx) => {
                let existing = std::mem::take(&mut deduped[idx]);
                deduped[idx] = merge_companies(vec![existing, company]);
            }
            None => deduped.push(company),
        }
    }

    deduped
}

/// Merge records describing the same company.
///
/// The highest-confidence record is the base (earliest wins ties); its
/// empty fields are filled from the others in confidence order.
pub fn merge_companies(mut group: Vec<Company>) -> Company {
    if group.len() == 1 {
        return group.remove(0);
    }

    // Stable sort keeps first-seen order among equal confidences.
    group.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let sources: BTreeSet<String> = group.iter().flat_map(|c| c.sources.clone()).collect();
    let keywords: BTreeSet<String> = group.iter().flat_map(|c| c.keywords.clone()).collect();

    let mut rest = group.split_off(1);
    let mut base = group.remove(0);

    for other in rest.iter_mut() {
        fill(&mut base.domain, &mut other.domain);
        fill(&mut base.hq_city, &mut other.hq_city);
        fill(&mut base.hq_state, &mut other.hq_state);
        fill(&mut base.size_band, &mut other.size_band);
        fill(&mut base.industry, &mut other.industry);
        fill(&mut base.recent_activity, &mut other.recent_activity);
        fill(&mut base.tech_stack_hint, &mut other.tech_stack_hint);
        if base.hiring_signal == HiringSignal::Unknown {
            base.hiring_signal = other.hiring_signal;
        }
    }

    base.confidence =
        (base.confidence + MULTI_SOURCE_BONUS * (sources.len().saturating_sub(1)) as f64).min(1.0);
    base.sources = sources.into_iter().collect();
    base.keywords = keywords.into_iter().collect();
    base
}

fn fill(target: &mut String, candidate: &mut String) {
    if target.is_empty() && !candidate.is_empty() {
        *target = std::mem::take(candidate);
    }
}

/// Similarity of two company names in [0, 1.1]; case-insensitive.
pub fn name_similarity(a: &Company, b: &Company) -> f64 {
    let mut score =
        strsim::normalized_levenshtein(&a.name.to_lowercase(), &b.name.to_lowercase());
    if !a.hq_city.is_empty() && a.hq_city.eq_ignore_ascii_case(&b.hq_city) {
        score += SAME_CITY_BONUS;
    }
    score
}

fn find_similar_by_name(company: &Company, existing: &[Company]) -> Option<usize> {
    if company.name.is_empty() {
        return None;
    }

    let mut best: Option<(usize, f64)> = None;
    for (idx, candidate) in existing.iter().enumerate() {
        let score = name_similarity(company, candidate);
        if score < NAME_SIMILARITY_THRESHOLD {
            continue;
        }
        if best.map_or(true, |(_, s)| score > s) {
            best = Some((idx, score));
        }
    }
    best.map(|(idx, _)| idx)
}
