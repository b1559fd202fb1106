//! Local CSV drop connector.
//!
//! Walks a directory, picks files matching the include globs and yields one
//! [`RawRecord`] per row, keyed by the file's own header names.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::CsvSourceConfig;
use crate::models::RawRecord;
use crate::traits::Connector;

pub struct CsvConnector {
    name: String,
    description: String,
    config: CsvSourceConfig,
}

impl CsvConnector {
    pub fn new(name: String, config: CsvSourceConfig) -> Self {
        let description = format!("CSV files under {}", config.dir.display());
        Self {
            name,
            description,
            config,
        }
    }
}

#[async_trait]
impl Connector for CsvConnector {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn connector_type(&self) -> &str {
        "csv"
    }

    // CSV drops carry no timestamps, so `since_days` is ignored.
    async fn scan(&self, _since_days: Option<i64>) -> Result<Vec<RawRecord>> {
        scan_csv_dir(&self.name, &self.config)
    }
}

pub fn scan_csv_dir(source: &str, config: &CsvSourceConfig) -> Result<Vec<RawRecord>> {
    let root = &config.dir;
    if !root.is_dir() {
        bail!(
            "CSV source '{}': directory does not exist: {}",
            source,
            root.display()
        );
    }

    let include_set = build_globset(&config.include_globs)?;

    let mut files: Vec<PathBuf> = Vec::new();
    for entry in WalkDir::new(root) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        if include_set.is_match(relative) {
            files.push(path.to_path_buf());
        }
    }
    // Sort for deterministic ordering
    files.sort();

    let mut records = Vec::new();
    for path in &files {
        let rows = match read_csv_file(source, path) {
            Ok(rows) => rows,
            Err(e) => {
                tracing::warn!(source, file = %path.display(), error = %format!("{:#}", e), "skipping unreadable csv file");
                continue;
            }
        };
        tracing::debug!(source, file = %path.display(), rows = rows.len(), "parsed csv");
        records.extend(rows);
    }
    Ok(records)
}

fn read_csv_file(source: &str, path: &Path) -> Result<Vec<RawRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let headers = reader
        .headers()
        .with_context(|| format!("Failed to read header row of {}", path.display()))?
        .clone();

    let mut records = Vec::new();
    for (idx, row) in reader.records().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!(file = %path.display(), row = idx + 2, error = %e, "skipping unreadable row");
                continue;
            }
        };

        let mut record = RawRecord::new(source);
        for (header, value) in headers.iter().zip(row.iter()) {
            // Strip a UTF-8 BOM that spreadsheet exports put before the first header.
            let header = header.trim_start_matches('\u{feff}');
            if header.is_empty() || value.is_empty() {
                continue;
            }
            record.fields.insert(header.to_string(), value.to_string());
        }
        if !record.fields.is_empty() {
            records.push(record);
        }
    }
    Ok(records)
}

fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn config(dir: &Path) -> CsvSourceConfig {
        CsvSourceConfig {
            dir: dir.to_path_buf(),
            include_globs: vec!["**/*.csv".to_string()],
        }
    }

    #[tokio::test]
    async fn test_reads_rows_with_original_headers() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("b.csv"),
            "Company Name,Website,City\nBeta Inc, beta.io ,Durham\n",
        )
        .unwrap();
        std::fs::create_dir(tmp.path().join("nested")).unwrap();
        std::fs::write(
            tmp.path().join("nested/a.csv"),
            "name,domain\nAlpha,alpha.com\n",
        )
        .unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();

        let connector = CsvConnector::new("drops".into(), config(tmp.path()));
        let records = connector.scan(Some(30)).await.unwrap();

        assert_eq!(records.len(), 2);
        // b.csv sorts before nested/a.csv
        assert_eq!(records[0].fields["Company Name"], "Beta Inc");
        assert_eq!(records[0].fields["Website"], "beta.io");
        assert_eq!(records[1].fields["name"], "Alpha");
        assert!(records.iter().all(|r| r.source == "drops"));
    }

    #[test]
    fn test_ragged_rows_and_bom_are_tolerated() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("ragged.csv"),
            "\u{feff}name,domain,size\nShort Co\nLong Co,long.com,12,extra\n,,\n",
        )
        .unwrap();

        let records = scan_csv_dir("r", &config(tmp.path())).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].fields.get("name").unwrap(), "Short Co");
        assert_eq!(records[1].fields.get("size").unwrap(), "12");
    }

    #[test]
    fn test_bad_header_skips_only_that_file() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("a.csv"),
            "name,domain\nAlpha,alpha.com\nBeta,beta.io\n",
        )
        .unwrap();
        let mut bad = b"name,dom".to_vec();
        bad.extend_from_slice(&[0xff, 0xfe]);
        bad.extend_from_slice(b"ain\nGamma,gamma.dev\n");
        std::fs::write(tmp.path().join("b.csv"), bad).unwrap();

        let records = scan_csv_dir("mixed", &config(tmp.path())).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].fields["name"], "Beta");
    }

    #[test]
    fn test_missing_dir_is_error() {
        let err = scan_csv_dir("gone", &config(Path::new("/nonexistent/outreach"))).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
