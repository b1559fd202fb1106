//! Raw record → canonical [`Company`] mapping.
//!
//! Connectors hand over whatever column names their source uses. This module
//! resolves those names through an alias table, then cleans each field
//! (domains stripped to a bare host, sizes bucketed into bands, industries
//! mapped to a short vocabulary, and so on).

use std::collections::{BTreeMap, HashSet};

use crate::models::{Company, HiringSignal, RawRecord};

/// Canonical field name → accepted source column names (already canonicalized).
const FIELD_ALIASES: &[(&str, &[&str])] = &[
    ("company_name", &["company_name", "name", "company", "organization"]),
    ("domain", &["domain", "website", "url", "homepage", "homepage_url"]),
    ("hq_city", &["hq_city", "city"]),
    ("hq_state", &["hq_state", "state", "region"]),
    ("location", &["location", "hq_location"]),
    (
        "size_band",
        &[
            "size_band",
            "size",
            "employees",
            "company_size",
            "employee_count",
            "num_employees",
        ],
    ),
    ("industry", &["industry", "sector", "market", "category"]),
    ("keywords", &["keywords", "tags", "categories"]),
    ("hiring_signal", &["hiring_signal", "hiring"]),
    ("recent_activity", &["recent_activity", "activity", "news"]),
    ("tech_stack_hint", &["tech_stack_hint", "tech_stack"]),
    ("confidence", &["confidence"]),
];

const DEFAULT_CONFIDENCE: f64 = 0.5;

/// Result of normalizing a batch.
#[derive(Debug, Default)]
pub struct NormalizeOutcome {
    pub companies: Vec<Company>,
    /// Records dropped because they carried neither a name nor a domain.
    pub skipped: usize,
}

/// Canonicalize a source column name: trim, lowercase, spaces/hyphens → `_`.
pub fn canonical_key(key: &str) -> String {
    key.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

/// Resolve a raw record's columns to canonical field names.
///
/// The first non-empty alias (in table order) wins.
pub fn resolve_fields(record: &RawRecord) -> BTreeMap<&'static str, String> {
    let by_key: BTreeMap<String, &str> = record
        .fields
        .iter()
        .map(|(k, v)| (canonical_key(k), v.trim()))
        .filter(|(_, v)| !v.is_empty())
        .collect();

    let mut resolved = BTreeMap::new();
    for (canonical, aliases) in FIELD_ALIASES {
        if let Some(value) = aliases.iter().find_map(|a| by_key.get(*a)) {
            resolved.insert(*canonical, value.to_string());
        }
    }
    resolved
}

pub fn normalize_records(records: &[RawRecord]) -> NormalizeOutcome {
    let mut outcome = NormalizeOutcome::default();
    for record in records {
        match normalize_record(record) {
            Some(company) => outcome.companies.push(company),
            None => {
                tracing::warn!(source = %record.source, "skipping record without name or domain");
                outcome.skipped += 1;
            }
        }
    }
    outcome
}

/// Normalize one record; `None` when it has neither name nor domain.
pub fn normalize_record(record: &RawRecord) -> Option<Company> {
    let f = resolve_fields(record);
    let get = |k: &str| f.get(k).map(String::as_str).unwrap_or("");

    let name = normalize_name(get("company_name"));
    let domain = normalize_domain(get("domain"));
    if name.is_empty() && domain.is_empty() {
        return None;
    }

    let (mut city, mut state) = (get("hq_city").to_string(), get("hq_state").to_string());
    if city.is_empty() || state.is_empty() {
        let (loc_city, loc_state) = split_location(get("location"));
        if city.is_empty() {
            city = loc_city;
        }
        if state.is_empty() {
            state = loc_state;
        }
    }

    let confidence = get("confidence")
        .parse::<f64>()
        .ok()
        .filter(|c| c.is_finite())
        .map(|c| c.clamp(0.0, 1.0))
        .unwrap_or(DEFAULT_CONFIDENCE);

    Some(Company {
        id: None,
        name: if name.is_empty() { domain.clone() } else { name },
        domain,
        hq_city: normalize_city(&city),
        hq_state: normalize_state(&state),
        size_band: normalize_size_band(get("size_band")),
        industry: normalize_industry(get("industry")),
        keywords: normalize_keywords(get("keywords")),
        sources: vec![record.source.clone()],
        confidence,
        hiring_signal: normalize_hiring(get("hiring_signal")),
        recent_activity: get("recent_activity").to_string(),
        tech_stack_hint: get("tech_stack_hint").to_string(),
        relevance_score: 0.0,
    })
}

pub fn normalize_name(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Reduce a URL or domain string to a bare lowercase host without `www.`.
pub fn normalize_domain(domain: &str) -> String {
    let mut d = domain.trim().to_lowercase();
    for scheme in ["https://", "http://"] {
        if let Some(rest) = d.strip_prefix(scheme) {
            d = rest.to_string();
        }
    }
    if let Some(end) = d.find(['/', '?', '#']) {
        d.truncate(end);
    }
    if let Some(at) = d.rfind('@') {
        d = d[at + 1..].to_string();
    }
    if let Some(colon) = d.find(':') {
        d.truncate(colon);
    }
    let d = d.strip_prefix("www.").unwrap_or(&d);
    d.trim_end_matches('.').to_string()
}

fn split_location(location: &str) -> (String, String) {
    let mut parts = location.split(',').map(str::trim);
    let city = parts.next().unwrap_or("").to_string();
    let state = parts.next().unwrap_or("").to_string();
    (city, state)
}

fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|word| {
            word.split('-')
                .map(|part| {
                    let mut chars = part.chars();
                    match chars.next() {
                        Some(first) => {
                            first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                        }
                        None => String::new(),
                    }
                })
                .collect::<Vec<_>>()
                .join("-")
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn normalize_city(city: &str) -> String {
    let city = title_case(city.trim());
    match city.as_str() {
        "Research Triangle Park" | "Research Triangle" => "RTP".to_string(),
        "Raleigh-Durham" => "Raleigh".to_string(),
        "Durham-Raleigh" => "Durham".to_string(),
        _ => city,
    }
}

const STATE_NAMES: &[(&str, &str)] = &[
    ("NORTH CAROLINA", "NC"),
    ("SOUTH CAROLINA", "SC"),
    ("VIRGINIA", "VA"),
    ("GEORGIA", "GA"),
    ("CALIFORNIA", "CA"),
    ("NEW YORK", "NY"),
    ("TEXAS", "TX"),
    ("FLORIDA", "FL"),
    ("TENNESSEE", "TN"),
    ("MASSACHUSETTS", "MA"),
    ("WASHINGTON", "WA"),
];

pub fn normalize_state(state: &str) -> String {
    let state = state.trim().to_uppercase();
    if state.is_empty() {
        return state;
    }
    if let Some((_, code)) = STATE_NAMES.iter().find(|(name, _)| *name == state) {
        return code.to_string();
    }
    state.chars().take(2).collect()
}

/// Ordered size bands, smallest first.
pub const SIZE_BANDS: &[&str] = &["1-10", "11-50", "51-200", "201-500", "501-1000", "1000+"];

const SIZE_KEYWORDS: &[(&str, &str)] = &[
    ("seed", "1-10"),
    ("early", "1-10"),
    ("small", "11-50"),
    ("startup", "11-50"),
    ("mid", "51-200"),
    ("medium", "51-200"),
    ("growth", "51-200"),
    ("large", "201-500"),
    ("enterprise", "1000+"),
];

pub fn normalize_size_band(size: &str) -> String {
    let size = size.trim().to_lowercase();
    if size.is_empty() {
        return size;
    }

    // Numbers may carry thousands separators ("1,200").
    let max_num = size
        .replace(',', "")
        .split(|c: char| !c.is_ascii_digit())
        .filter_map(|n| n.parse::<u64>().ok())
        .max();

    if let Some(n) = max_num {
        let band = match n {
            0..=10 => "1-10",
            11..=50 => "11-50",
            51..=200 => "51-200",
            201..=500 => "201-500",
            501..=1000 => "501-1000",
            _ => "1000+",
        };
        return band.to_string();
    }

    SIZE_KEYWORDS
        .iter()
        .find(|(kw, _)| size.contains(kw))
        .map(|(_, band)| band.to_string())
        .unwrap_or(size)
}

const INDUSTRY_ALIASES: &[(&str, &str)] = &[
    ("software development", "Software"),
    ("computer software", "Software"),
    ("software", "Software"),
    ("information technology", "Technology"),
    ("it services", "Technology"),
    ("artificial intelligence", "AI/ML"),
    ("machine learning", "AI/ML"),
    ("ai/ml", "AI/ML"),
    ("health care", "HealthTech"),
    ("healthcare", "HealthTech"),
    ("healthtech", "HealthTech"),
    ("financial services", "FinTech"),
    ("financial technology", "FinTech"),
    ("fintech", "FinTech"),
    ("cyber security", "Cybersecurity"),
    ("information security", "Cybersecurity"),
    ("data science", "Data Analytics"),
    ("business intelligence", "Data Analytics"),
];

pub fn normalize_industry(industry: &str) -> String {
    let industry = industry.trim();
    if industry.is_empty() {
        return String::new();
    }
    let lower = industry.to_lowercase();
    INDUSTRY_ALIASES
        .iter()
        .find(|(alias, _)| *alias == lower)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or_else(|| title_case(industry))
}

/// Split on `,`, `;`, `|`; lowercase; `-`/`_` → space; dedupe in order.
pub fn normalize_keywords(keywords: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    keywords
        .split([',', ';', '|'])
        .map(|kw| {
            kw.trim()
                .to_lowercase()
                .replace(['-', '_'], " ")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|kw| !kw.is_empty() && seen.insert(kw.clone()))
        .collect()
}

pub fn normalize_hiring(hiring: &str) -> HiringSignal {
    match hiring.trim().to_lowercase().as_str() {
        "yes" | "true" | "1" | "hiring" | "actively hiring" | "y" => HiringSignal::Yes,
        "no" | "false" | "0" | "not hiring" | "freeze" | "n" => HiringSignal::No,
        _ => HiringSignal::Unknown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_aliases_resolve_to_company_name() {
        for key in ["name", "company_name", "Company Name", "COMPANY-NAME", " company "] {
            let rec = RawRecord::new("t").with(key, "Acme Labs");
            let c = normalize_record(&rec).unwrap();
            assert_eq!(c.name, "Acme Labs", "alias {} not recognized", key);
        }
    }

    #[test]
    fn test_every_alias_maps_to_canonical_field() {
        for (canonical, aliases) in FIELD_ALIASES {
            for alias in *aliases {
                let rec = RawRecord::new("t").with(alias, "value");
                let resolved = resolve_fields(&rec);
                assert_eq!(
                    resolved.get(canonical).map(String::as_str),
                    Some("value"),
                    "{} should map to {}",
                    alias,
                    canonical
                );
            }
        }
    }

    #[test]
    fn test_first_non_empty_alias_wins() {
        let rec = RawRecord::new("t")
            .with("company_name", "  ")
            .with("name", "Fallback Co");
        assert_eq!(normalize_record(&rec).unwrap().name, "Fallback Co");
    }

    #[test]
    fn test_record_without_name_or_domain_is_skipped() {
        let records = vec![
            RawRecord::new("t").with("city", "Raleigh"),
            RawRecord::new("t").with("website", "https://www.acme.io/about"),
        ];
        let out = normalize_records(&records);
        assert_eq!(out.skipped, 1);
        assert_eq!(out.companies.len(), 1);
        assert_eq!(out.companies[0].domain, "acme.io");
        assert_eq!(out.companies[0].name, "acme.io");
    }

    #[test]
    fn test_domain_cleanup() {
        assert_eq!(normalize_domain("https://www.Example.com/path?q=1"), "example.com");
        assert_eq!(normalize_domain("http://example.com:8080"), "example.com");
        assert_eq!(normalize_domain("www.example.io/"), "example.io");
        assert_eq!(normalize_domain("  example.org  "), "example.org");
        assert_eq!(normalize_domain(""), "");
    }

    #[test]
    fn test_city_and_state() {
        assert_eq!(normalize_city("research triangle park"), "RTP");
        assert_eq!(normalize_city("raleigh-durham"), "Raleigh");
        assert_eq!(normalize_city("cary"), "Cary");
        assert_eq!(normalize_state("North Carolina"), "NC");
        assert_eq!(normalize_state("nc"), "NC");
        assert_eq!(normalize_state("Oregon"), "OR");
    }

    #[test]
    fn test_location_split_fills_city_and_state() {
        let rec = RawRecord::new("wellfound")
            .with("Company Name", "Beta")
            .with("Location", "Durham, North Carolina");
        let c = normalize_record(&rec).unwrap();
        assert_eq!(c.hq_city, "Durham");
        assert_eq!(c.hq_state, "NC");
    }

    #[test]
    fn test_size_bands() {
        assert_eq!(normalize_size_band("5"), "1-10");
        assert_eq!(normalize_size_band("11-50"), "11-50");
        assert_eq!(normalize_size_band("51-200 employees"), "51-200");
        assert_eq!(normalize_size_band("1,200"), "1000+");
        assert_eq!(normalize_size_band("Startup"), "11-50");
        assert_eq!(normalize_size_band("enterprise"), "1000+");
        assert_eq!(normalize_size_band("unknown"), "unknown");
        assert_eq!(normalize_size_band(""), "");
    }

    #[test]
    fn test_industry_mapping() {
        assert_eq!(normalize_industry("Computer Software"), "Software");
        assert_eq!(normalize_industry("machine learning"), "AI/ML");
        assert_eq!(normalize_industry("biotech research"), "Biotech Research");
    }

    #[test]
    fn test_keywords_deduped_and_cleaned() {
        assert_eq!(
            normalize_keywords("SaaS; machine-learning|saas, series_a"),
            vec!["saas", "machine learning", "series a"]
        );
    }

    #[test]
    fn test_hiring_and_confidence() {
        assert_eq!(normalize_hiring("Actively Hiring"), HiringSignal::Yes);
        assert_eq!(normalize_hiring("freeze"), HiringSignal::No);
        assert_eq!(normalize_hiring("maybe"), HiringSignal::Unknown);

        let rec = RawRecord::new("t").with("name", "X").with("confidence", "7");
        assert_eq!(normalize_record(&rec).unwrap().confidence, 1.0);
        let rec = RawRecord::new("t").with("name", "X").with("confidence", "abc");
        assert_eq!(normalize_record(&rec).unwrap().confidence, 0.5);
    }

    #[test]
    fn test_malformed_input_does_not_panic() {
        let rec = RawRecord::new("t")
            .with("name", "\u{feff} Üñï  Corp ")
            .with("size", "-----")
            .with("domain", "://@:")
            .with("location", ",,,");
        let c = normalize_record(&rec).unwrap();
        assert_eq!(c.name, "\u{feff} Üñï Corp".trim());
    }
}
