use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::compliance::{self, ComplianceConfig};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub location: LocationConfig,
    #[serde(default)]
    pub icp: IcpConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub outreach: OutreachConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub compliance: ComplianceConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

impl PathsConfig {
    pub fn raw_dir(&self) -> PathBuf {
        self.data_dir.join("raw")
    }

    pub fn out_dir(&self) -> PathBuf {
        self.data_dir.join("out")
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct LocationConfig {
    #[serde(default = "default_city")]
    pub city: String,
    #[serde(default = "default_state")]
    pub state: String,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            city: default_city(),
            state: default_state(),
        }
    }
}

fn default_city() -> String {
    "Raleigh".to_string()
}
fn default_state() -> String {
    "NC".to_string()
}

/// Ideal customer profile: what the ranker considers a good fit.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct IcpConfig {
    #[serde(default)]
    pub industries: Vec<String>,
    #[serde(default)]
    pub size_bands: Vec<String>,
    #[serde(default)]
    pub include_keywords: Vec<String>,
    #[serde(default)]
    pub exclude_keywords: Vec<String>,
    #[serde(default)]
    pub exclude_domains: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RankingConfig {
    #[serde(default = "default_size_weight")]
    pub size_weight: f64,
    #[serde(default = "default_industry_weight")]
    pub industry_weight: f64,
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f64,
    #[serde(default = "default_confidence_weight")]
    pub confidence_weight: f64,
    #[serde(default = "default_signal_weight")]
    pub signal_weight: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            size_weight: default_size_weight(),
            industry_weight: default_industry_weight(),
            keyword_weight: default_keyword_weight(),
            confidence_weight: default_confidence_weight(),
            signal_weight: default_signal_weight(),
        }
    }
}

fn default_size_weight() -> f64 {
    0.2
}
fn default_industry_weight() -> f64 {
    0.3
}
fn default_keyword_weight() -> f64 {
    0.2
}
fn default_confidence_weight() -> f64 {
    0.15
}
fn default_signal_weight() -> f64 {
    0.15
}

impl RankingConfig {
    pub fn weights(&self) -> [(&'static str, f64); 5] {
        [
            ("size_weight", self.size_weight),
            ("industry_weight", self.industry_weight),
            ("keyword_weight", self.keyword_weight),
            ("confidence_weight", self.confidence_weight),
            ("signal_weight", self.signal_weight),
        ]
    }

    pub fn total(&self) -> f64 {
        self.weights().iter().map(|(_, w)| w).sum()
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutreachConfig {
    #[serde(default = "default_followup_days")]
    pub followup_days: i64,
    #[serde(default = "default_sender_name")]
    pub sender_name: String,
}

impl Default for OutreachConfig {
    fn default() -> Self {
        Self {
            followup_days: default_followup_days(),
            sender_name: default_sender_name(),
        }
    }
}

fn default_followup_days() -> i64 {
    7
}
fn default_sender_name() -> String {
    "[Your Name]".to_string()
}

/// Named source instances, keyed by instance name.
///
/// ```toml
/// [sources.csv.nc_directories]
/// dir = "data/raw/nc_directories"
///
/// [sources.http.crunchbase]
/// url = "https://api.example.com/v4/companies"
/// records_path = "entities"
/// api_key_env = "CRUNCHBASE_API_KEY"
/// ```
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SourcesConfig {
    #[serde(default)]
    pub csv: BTreeMap<String, CsvSourceConfig>,
    #[serde(default)]
    pub http: BTreeMap<String, HttpSourceConfig>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CsvSourceConfig {
    pub dir: PathBuf,
    #[serde(default = "default_csv_globs")]
    pub include_globs: Vec<String>,
}

fn default_csv_globs() -> Vec<String> {
    vec!["**/*.csv".to_string()]
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpSourceConfig {
    pub url: String,
    #[serde(default)]
    pub records_path: String,
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_api_key_header")]
    pub api_key_header: String,
    #[serde(default)]
    pub since_param: Option<String>,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_api_key_header() -> String {
    "Authorization".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

/// Check cross-field rules that serde cannot express.
pub fn validate(config: &Config) -> Result<()> {
    for (name, weight) in config.ranking.weights() {
        if !weight.is_finite() || weight < 0.0 {
            bail!("ranking.{} must be a non-negative number", name);
        }
    }

    let total = config.ranking.total();
    if (total - 1.0).abs() > 1e-6 {
        bail!("ranking weights must sum to 1.0 (got {:.4})", total);
    }

    if config.outreach.followup_days < 1 {
        bail!("outreach.followup_days must be >= 1");
    }

    for (name, src) in &config.sources.http {
        let url = reqwest::Url::parse(&src.url)
            .with_context(|| format!("sources.http.{}: invalid url '{}'", name, src.url))?;
        match url.scheme() {
            "http" | "https" => {}
            other => bail!(
                "sources.http.{}: unsupported scheme '{}'. Must be http or https.",
                name,
                other
            ),
        }
        compliance::check_source_url(&url)
            .with_context(|| format!("sources.http.{} is not an approved source", name))?;
    }

    compliance::check(&config.compliance)?;

    Ok(())
}
