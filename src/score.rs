//! Relevance scoring against the configured ICP.
//!
//! Each factor lands in [0, 1] and the score is the weighted sum, so with
//! weights summing to 1.0 the score also lands in [0, 1].

use std::collections::HashSet;

use serde::Serialize;

use crate::config::{Config, IcpConfig, RankingConfig};
use crate::models::{Company, HiringSignal};
use crate::normalize::SIZE_BANDS;

const ACTIVITY_SIGNALS: &[&str] = &[
    "series",
    "funding",
    "raised",
    "expansion",
    "launch",
    "new office",
];

/// Per-factor scores behind a company's relevance score.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ScoreBreakdown {
    pub excluded: bool,
    pub size: f64,
    pub industry: f64,
    pub keywords: f64,
    pub confidence: f64,
    pub signals: f64,
}

pub struct CompanyScorer {
    weights: RankingConfig,
    industries: HashSet<String>,
    size_bands: HashSet<String>,
    include_keywords: Vec<String>,
    exclude_keywords: Vec<String>,
    exclude_domains: HashSet<String>,
}

impl CompanyScorer {
    pub fn new(icp: &IcpConfig, weights: &RankingConfig) -> Self {
        let lower = |v: &[String]| -> Vec<String> {
            v.iter()
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect()
        };
        Self {
            weights: weights.clone(),
            industries: lower(&icp.industries).into_iter().collect(),
            size_bands: icp.size_bands.iter().map(|s| s.trim().to_string()).collect(),
            include_keywords: dedup(lower(&icp.include_keywords)),
            exclude_keywords: dedup(lower(&icp.exclude_keywords)),
            exclude_domains: lower(&icp.exclude_domains).into_iter().collect(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.icp, &config.ranking)
    }

    /// Score a company; the result is rounded to 3 decimals.
    pub fn score(&self, company: &Company) -> (f64, ScoreBreakdown) {
        if self.is_excluded(company) {
            return (
                0.0,
                ScoreBreakdown {
                    excluded: true,
                    ..Default::default()
                },
            );
        }

        let breakdown = ScoreBreakdown {
            excluded: false,
            size: self.score_size(company),
            industry: self.score_industry(company),
            keywords: self.score_keywords(company),
            confidence: company.confidence.clamp(0.0, 1.0),
            signals: score_signals(company),
        };

        let w = &self.weights;
        let total = breakdown.size * w.size_weight
            + breakdown.industry * w.industry_weight
            + breakdown.keywords * w.keyword_weight
            + breakdown.confidence * w.confidence_weight
            + breakdown.signals * w.signal_weight;

        ((total * 1000.0).round() / 1000.0, breakdown)
    }

    pub fn is_excluded(&self, company: &Company) -> bool {
        if !company.domain.is_empty() && self.exclude_domains.contains(&company.domain.to_lowercase())
        {
            return true;
        }
        let text = format!(
            "{} {} {}",
            company.keywords.join(" "),
            company.name,
            company.industry
        )
        .to_lowercase();
        self.exclude_keywords.iter().any(|kw| text.contains(kw))
    }

    fn score_size(&self, company: &Company) -> f64 {
        let size = company.size_band.as_str();
        if size.is_empty() {
            return 0.3;
        }
        if self.size_bands.contains(size) {
            return 1.0;
        }
        let Some(idx) = SIZE_BANDS.iter().position(|b| *b == size) else {
            return 0.0;
        };
        let distance = self
            .size_bands
            .iter()
            .filter_map(|t| SIZE_BANDS.iter().position(|b| b == t))
            .map(|t| t.abs_diff(idx))
            .min();
        match distance {
            Some(1) => 0.5,
            Some(2) => 0.2,
            _ => 0.0,
        }
    }

    fn score_industry(&self, company: &Company) -> f64 {
        if self.industries.is_empty() {
            return 0.5;
        }
        let industry = company.industry.to_lowercase();
        if industry.is_empty() {
            return 0.2;
        }
        if self.industries.contains(&industry) {
            return 1.0;
        }
        if self
            .industries
            .iter()
            .any(|t| t.contains(&industry) || industry.contains(t.as_str()))
        {
            return 0.7;
        }
        0.0
    }

    fn score_keywords(&self, company: &Company) -> f64 {
        if self.include_keywords.is_empty() {
            return 0.5;
        }
        let text = format!(
            "{} {} {}",
            company.keywords.join(" "),
            company.name,
            company.recent_activity
        )
        .to_lowercase();
        let matches = self
            .include_keywords
            .iter()
            .filter(|kw| text.contains(kw.as_str()))
            .count();
        let needed = (self.include_keywords.len() as f64 * 0.3).max(1.0);
        (matches as f64 / needed).min(1.0)
    }
}

fn score_signals(company: &Company) -> f64 {
    let mut score: f64 = match company.hiring_signal {
        HiringSignal::Yes => 0.5,
        HiringSignal::Unknown => 0.1,
        HiringSignal::No => 0.0,
    };
    let activity = company.recent_activity.to_lowercase();
    if ACTIVITY_SIGNALS.iter().any(|s| activity.contains(s)) {
        score += 0.5;
    }
    score.min(1.0)
}

fn dedup(mut v: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    v.retain(|s| seen.insert(s.clone()));
    v
}
