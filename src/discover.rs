//! Discovery pipeline orchestration.
//!
//! Coordinates the full flow: connectors → raw snapshot → normalize →
//! dedupe → upsert. Rerunning over the same input never creates duplicate
//! company rows; matching rows are merged instead.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;

use crate::config::Config;
use crate::db;
use crate::dedupe::{dedupe_companies, DedupStats};
use crate::models::RawRecord;
use crate::normalize::normalize_records;
use crate::repo::{self, Upsert};
use crate::traits::ConnectorRegistry;

#[derive(Debug, Clone, Default)]
pub struct DiscoverOptions {
    /// Only ask sources for records updated in the last N days.
    pub since_days: Option<i64>,
    /// Restrict to these source names; empty means all configured sources.
    pub sources: Vec<String>,
    /// Fetch, normalize and dedupe, but write nothing.
    pub dry_run: bool,
}

#[derive(Debug, Clone)]
pub enum SourceOutcome {
    Fetched(usize),
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct DiscoverReport {
    pub sources: Vec<(String, SourceOutcome)>,
    pub fetched: usize,
    pub skipped: usize,
    pub dedup: DedupStats,
    pub inserted: usize,
    pub updated: usize,
    pub snapshot: Option<PathBuf>,
}

pub async fn run_discover(config: &Config, options: &DiscoverOptions) -> Result<()> {
    let registry = ConnectorRegistry::from_config(config);
    let report = discover_with_registry(config, &registry, options).await?;
    print_report(&report, options.dry_run);
    Ok(())
}

/// Run discovery against an explicit registry (built-in and custom connectors).
pub async fn discover_with_registry(
    config: &Config,
    registry: &ConnectorRegistry,
    options: &DiscoverOptions,
) -> Result<DiscoverReport> {
    if registry.is_empty() {
        bail!("No sources configured. Add [sources.csv.<name>] or [sources.http.<name>] to the config.");
    }
    for name in &options.sources {
        if registry.find(name).is_none() {
            bail!(
                "Unknown source: '{}'. Available: {}",
                name,
                registry.names().join(", ")
            );
        }
    }

    let mut raw: Vec<RawRecord> = Vec::new();
    let mut outcomes = Vec::new();
    for connector in registry.connectors() {
        let name = connector.name();
        if !options.sources.is_empty() && !options.sources.iter().any(|s| s == name) {
            continue;
        }
        match connector.scan(options.since_days).await {
            Ok(records) => {
                tracing::info!(source = name, records = records.len(), "source scanned");
                outcomes.push((name.to_string(), SourceOutcome::Fetched(records.len())));
                raw.extend(records);
            }
            Err(e) => {
                tracing::warn!(source = name, error = %format!("{:#}", e), "source failed");
                outcomes.push((name.to_string(), SourceOutcome::Failed(format!("{:#}", e))));
            }
        }
    }

    if outcomes
        .iter()
        .all(|(_, o)| matches!(o, SourceOutcome::Failed(_)))
    {
        let reasons: Vec<String> = outcomes
            .iter()
            .map(|(name, o)| match o {
                SourceOutcome::Failed(msg) => format!("{}: {}", name, msg),
                SourceOutcome::Fetched(_) => String::new(),
            })
            .collect();
        bail!("All sources failed:\n  {}", reasons.join("\n  "));
    }

    let normalized = normalize_records(&raw);
    let before = normalized.companies.len();
    let companies = dedupe_companies(normalized.companies);
    let dedup = DedupStats::new(before, companies.len());

    let mut report = DiscoverReport {
        sources: outcomes,
        fetched: raw.len(),
        skipped: normalized.skipped,
        dedup,
        inserted: 0,
        updated: 0,
        snapshot: None,
    };

    if options.dry_run {
        return Ok(report);
    }

    if !raw.is_empty() {
        report.snapshot = Some(write_snapshot(config, &raw)?);
    }

    let pool = db::connect(config).await?;
    for company in &companies {
        match repo::upsert_company(&pool, company)
            .await
            .with_context(|| format!("Failed to store company '{}'", company.name))?
        {
            Upsert::Inserted(_) => report.inserted += 1,
            Upsert::Updated(_) => report.updated += 1,
        }
    }
    pool.close().await;

    Ok(report)
}

/// Save the raw records of a run under `<data_dir>/raw/`.
fn write_snapshot(config: &Config, raw: &[RawRecord]) -> Result<PathBuf> {
    let dir = config.paths.raw_dir();
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;
    let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("discovery_{}.json", stamp));
    let json = serde_json::to_string_pretty(raw)?;
    std::fs::write(&path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

fn print_report(report: &DiscoverReport, dry_run: bool) {
    if dry_run {
        println!("discover (dry-run)");
    } else {
        println!("discover");
    }
    for (name, outcome) in &report.sources {
        match outcome {
            SourceOutcome::Fetched(n) => println!("  source {}: {} records", name, n),
            SourceOutcome::Failed(msg) => println!("  source {}: FAILED ({})", name, msg),
        }
    }
    println!("  fetched: {} records", report.fetched);
    println!("  skipped (no name or domain): {}", report.skipped);
    println!(
        "  deduplicated: {} -> {} ({} removed, {:.1}%)",
        report.dedup.original, report.dedup.deduped, report.dedup.removed, report.dedup.reduction_pct
    );
    if dry_run {
        println!("  companies that would be written: {}", report.dedup.deduped);
        return;
    }
    println!("  inserted: {}", report.inserted);
    println!("  updated: {}", report.updated);
    if let Some(path) = &report.snapshot {
        println!("  raw snapshot: {}", path.display());
    }
    println!("ok");
}
