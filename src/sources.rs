use anyhow::Result;

use crate::config::Config;

/// One configured source and whether it is ready to scan.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceStatus {
    pub name: String,
    pub kind: &'static str,
    pub target: String,
    pub status: String,
    pub healthy: bool,
}

pub fn source_statuses(config: &Config) -> Vec<SourceStatus> {
    let mut out = Vec::new();

    for (name, src) in &config.sources.csv {
        let (status, healthy) = if src.dir.is_dir() {
            ("OK".to_string(), true)
        } else {
            ("MISSING (dir does not exist)".to_string(), false)
        };
        out.push(SourceStatus {
            name: name.clone(),
            kind: "csv",
            target: src.dir.display().to_string(),
            status,
            healthy,
        });
    }

    for (name, src) in &config.sources.http {
        let (status, healthy) = match &src.api_key_env {
            None => ("OK (no key)".to_string(), true),
            Some(var) => match std::env::var(var) {
                Ok(v) if !v.trim().is_empty() => ("OK".to_string(), true),
                _ => (format!("SKIPPED ({} not set)", var), false),
            },
        };
        out.push(SourceStatus {
            name: name.clone(),
            kind: "http",
            target: src.url.clone(),
            status,
            healthy,
        });
    }

    out
}

pub fn list_sources(config: &Config) -> Result<()> {
    let statuses = source_statuses(config);
    if statuses.is_empty() {
        println!("No sources configured. Add [sources.csv.<name>] or [sources.http.<name>] to the config.");
        return Ok(());
    }

    println!(
        "{:<20} {:<6} {:<32} {:<8} TARGET",
        "SOURCE", "TYPE", "STATUS", "HEALTHY"
    );
    for s in &statuses {
        println!(
            "{:<20} {:<6} {:<32} {:<8} {}",
            s.name, s.kind, s.status, s.healthy, s.target
        );
    }
    Ok(())
}
