//! CSV exports for spreadsheets and Notion.
//!
//! Row order is fixed (ranked companies, contacts by id, touchpoints by
//! date) and floats use fixed precision, so two exports of the same
//! database differ only in their timestamp columns.

use anyhow::{bail, Context, Result};
use sqlx::SqlitePool;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::Config;
use crate::db;
use crate::error::OutreachError;
use crate::repo;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportType {
    Companies,
    Contacts,
    Sequences,
    Summary,
}

impl ExportType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportType::Companies => "companies",
            ExportType::Contacts => "contacts",
            ExportType::Sequences => "sequences",
            ExportType::Summary => "summary",
        }
    }

    fn supports(&self, format: ExportFormat) -> bool {
        match self {
            ExportType::Companies => true,
            ExportType::Contacts => format != ExportFormat::Sheets,
            ExportType::Sequences | ExportType::Summary => format == ExportFormat::Csv,
        }
    }
}

impl FromStr for ExportType {
    type Err = OutreachError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "companies" => Ok(ExportType::Companies),
            "contacts" => Ok(ExportType::Contacts),
            "sequences" => Ok(ExportType::Sequences),
            "summary" => Ok(ExportType::Summary),
            _ => Err(OutreachError::InvalidValue {
                kind: "export type",
                value: s.to_string(),
                expected: "companies, contacts, sequences, summary",
            }),
        }
    }
}

impl fmt::Display for ExportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Notion,
    Sheets,
}

impl FromStr for ExportFormat {
    type Err = OutreachError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "notion" => Ok(ExportFormat::Notion),
            "sheets" => Ok(ExportFormat::Sheets),
            _ => Err(OutreachError::InvalidValue {
                kind: "export format",
                value: s.to_string(),
                expected: "csv, notion, sheets",
            }),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Notion => "notion",
            ExportFormat::Sheets => "sheets",
        })
    }
}

fn format_ts(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ts.to_string())
}

fn opt<T: ToString>(v: &Option<T>) -> String {
    v.as_ref().map(ToString::to_string).unwrap_or_default()
}

fn ensure_supported(export_type: ExportType, format: ExportFormat) -> Result<()> {
    if !export_type.supports(format) {
        bail!(
            "export type '{}' does not support format '{}'",
            export_type,
            format
        );
    }
    Ok(())
}

/// Write one export to `out`. Returns the number of data rows.
pub async fn write_export<W: Write>(
    pool: &SqlitePool,
    config: &Config,
    export_type: ExportType,
    format: ExportFormat,
    out: W,
) -> Result<usize> {
    ensure_supported(export_type, format)?;

    let mut w = csv::Writer::from_writer(out);
    let rows = match export_type {
        ExportType::Companies => write_companies(pool, format, &mut w).await?,
        ExportType::Contacts => write_contacts(pool, format, &mut w).await?,
        ExportType::Sequences => write_sequences(pool, &mut w).await?,
        ExportType::Summary => write_summary(pool, config, &mut w).await?,
    };
    w.flush()?;
    Ok(rows)
}

async fn write_companies<W: Write>(
    pool: &SqlitePool,
    format: ExportFormat,
    w: &mut csv::Writer<W>,
) -> Result<usize> {
    let companies = repo::list_companies(pool, true, None).await?;

    match format {
        ExportFormat::Notion => {
            w.write_record([
                "Name", "Domain", "Location", "Size", "Industry", "Score", "Hiring", "Activity",
                "Sources",
            ])?;
            for c in &companies {
                w.write_record([
                    c.name.clone(),
                    c.domain.clone(),
                    c.location(),
                    c.size_band.clone(),
                    c.industry.clone(),
                    format!("{:.2}", c.relevance_score),
                    c.hiring_signal.to_string(),
                    c.recent_activity.clone(),
                    c.sources_joined(),
                ])?;
            }
        }
        ExportFormat::Sheets => {
            w.write_record([
                "Company Name",
                "Website",
                "City",
                "State",
                "Size Band",
                "Industry",
                "Relevance Score",
                "Hiring Signal",
                "Recent Activity",
                "Keywords",
                "Sources",
                "Confidence",
            ])?;
            for c in &companies {
                w.write_record([
                    c.name.clone(),
                    c.domain.clone(),
                    c.hq_city.clone(),
                    c.hq_state.clone(),
                    c.size_band.clone(),
                    c.industry.clone(),
                    format!("{:.3}", c.relevance_score),
                    c.hiring_signal.to_string(),
                    c.recent_activity.clone(),
                    c.keywords_joined(),
                    c.sources_joined(),
                    format!("{:.2}", c.confidence),
                ])?;
            }
        }
        ExportFormat::Csv => {
            w.write_record([
                "company_id",
                "company_name",
                "domain",
                "hq_city",
                "hq_state",
                "size_band",
                "industry",
                "relevance_score",
                "hiring_signal",
                "recent_activity",
                "keywords",
                "sources",
                "confidence",
            ])?;
            for c in &companies {
                w.write_record([
                    opt(&c.id),
                    c.name.clone(),
                    c.domain.clone(),
                    c.hq_city.clone(),
                    c.hq_state.clone(),
                    c.size_band.clone(),
                    c.industry.clone(),
                    format!("{:.3}", c.relevance_score),
                    c.hiring_signal.to_string(),
                    c.recent_activity.clone(),
                    c.keywords_joined(),
                    c.sources_joined(),
                    format!("{:.2}", c.confidence),
                ])?;
            }
        }
    }
    Ok(companies.len())
}

async fn write_contacts<W: Write>(
    pool: &SqlitePool,
    format: ExportFormat,
    w: &mut csv::Writer<W>,
) -> Result<usize> {
    let mut contacts = repo::list_contacts(pool, None, None).await?;
    contacts.sort_by_key(|c| c.id);

    if format == ExportFormat::Notion {
        w.write_record(["Name", "Title", "Company", "Status", "Last Action", "Notes"])?;
    } else {
        w.write_record([
            "contact_id",
            "first_name",
            "last_name",
            "title",
            "company_name",
            "company_domain",
            "profile_url",
            "email",
            "status",
            "priority",
            "touchpoint_count",
            "last_touchpoint",
            "notes",
            "created_at",
        ])?;
    }

    for contact in &contacts {
        let company = repo::get_company(pool, contact.company_id).await?;
        let touchpoints = repo::touchpoints_for_contact(pool, contact.id).await?;
        let last = touchpoints
            .last()
            .map(|t| t.event_type.to_string())
            .unwrap_or_default();

        if format == ExportFormat::Notion {
            w.write_record([
                contact.full_name(),
                contact.title.clone(),
                company.name,
                contact.status.to_string(),
                last,
                opt(&contact.notes),
            ])?;
        } else {
            w.write_record([
                contact.id.to_string(),
                contact.first_name.clone(),
                contact.last_name.clone(),
                contact.title.clone(),
                company.name,
                company.domain,
                opt(&contact.profile_url),
                opt(&contact.email),
                contact.status.to_string(),
                contact.priority.to_string(),
                touchpoints.len().to_string(),
                last,
                opt(&contact.notes),
                format_ts(contact.created_at),
            ])?;
        }
    }
    Ok(contacts.len())
}

async fn write_sequences<W: Write>(pool: &SqlitePool, w: &mut csv::Writer<W>) -> Result<usize> {
    let mut contacts = repo::list_contacts(pool, None, None).await?;
    contacts.sort_by_key(|c| c.id);

    w.write_record([
        "contact_id",
        "contact_name",
        "company_name",
        "sequence_id",
        "step_number",
        "event_type",
        "event_date",
        "outcome",
        "notes",
    ])?;

    let mut rows = 0;
    for contact in &contacts {
        let company = repo::get_company(pool, contact.company_id).await?;
        for tp in repo::touchpoints_for_contact(pool, contact.id).await? {
            w.write_record([
                contact.id.to_string(),
                contact.full_name(),
                company.name.clone(),
                opt(&tp.sequence_id),
                opt(&tp.step_number),
                tp.event_type.to_string(),
                format_ts(tp.event_date),
                opt(&tp.outcome),
                opt(&tp.notes),
            ])?;
            rows += 1;
        }
    }
    Ok(rows)
}

async fn write_summary<W: Write>(
    pool: &SqlitePool,
    config: &Config,
    w: &mut csv::Writer<W>,
) -> Result<usize> {
    let stats = repo::stats(pool, config.outreach.followup_days).await?;
    let reply_rate = if stats.sent > 0 {
        stats.replied as f64 / stats.sent as f64 * 100.0
    } else {
        0.0
    };

    let rows = [
        ("Total Companies", stats.companies.to_string()),
        ("Total Contacts", stats.contacts.to_string()),
        ("Messages Sent", stats.sent.to_string()),
        ("Replies Received", stats.replied.to_string()),
        ("Reply Rate", format!("{:.1}%", reply_rate)),
        ("Pending Follow-ups", stats.pending_followups.to_string()),
        ("Do-Not-Contact Entries", stats.do_not_contact.to_string()),
        ("Drafts", stats.drafts.to_string()),
        (
            "Export Date",
            chrono::Utc::now().format("%Y-%m-%d %H:%M").to_string(),
        ),
    ];

    w.write_record(["metric", "value"])?;
    for (metric, value) in &rows {
        w.write_record([*metric, value.as_str()])?;
    }
    Ok(rows.len())
}

fn default_path(config: &Config, export_type: ExportType) -> PathBuf {
    let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    config
        .paths
        .out_dir()
        .join("exports")
        .join(format!("{}_export_{}.csv", export_type, stamp))
}

pub async fn run_export(
    config: &Config,
    export_type: &str,
    format: &str,
    output: Option<&Path>,
) -> Result<()> {
    let export_type: ExportType = export_type.parse()?;
    let format: ExportFormat = format.parse()?;
    ensure_supported(export_type, format)?;

    let path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_path(config, export_type));
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
    }

    // The target file is only touched once the export has succeeded.
    let pool = db::connect(config).await?;
    let mut buf = Vec::new();
    let rows = write_export(&pool, config, export_type, format, &mut buf).await;
    pool.close().await;
    let rows = rows?;
    std::fs::write(&path, &buf).with_context(|| format!("Failed to write {}", path.display()))?;

    println!(
        "exported {} {} rows ({}) to {}",
        rows,
        export_type,
        format,
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;
    use crate::models::{Company, EventType, NewContact, NewTouchpoint};

    fn config() -> Config {
        toml::from_str("[db]\npath = \"unused.sqlite\"\n").unwrap()
    }

    async fn populated() -> SqlitePool {
        let pool = memory_pool().await.unwrap();
        let id = repo::upsert_company(
            &pool,
            &Company {
                name: "Acme, Inc.".into(),
                domain: "acme.io".into(),
                hq_city: "Raleigh".into(),
                hq_state: "NC".into(),
                sources: vec!["csv".into()],
                confidence: 0.6,
                ..Default::default()
            },
        )
        .await
        .unwrap()
        .id();
        repo::update_company_score(&pool, id, 0.4567).await.unwrap();
        let contact_id = repo::add_contact(
            &pool,
            &NewContact {
                company_id: id,
                first_name: "Ana".into(),
                last_name: "Ruiz".into(),
                title: "CEO".into(),
                notes: Some("met at \"meetup\"".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        let mut tp = NewTouchpoint::new(contact_id, EventType::Sent);
        tp.event_date = Some(1_700_000_000);
        tp.step_number = Some(1);
        repo::log_touchpoint(&pool, &tp).await.unwrap();
        pool
    }

    async fn export(pool: &SqlitePool, t: ExportType, f: ExportFormat) -> String {
        let mut buf = Vec::new();
        write_export(pool, &config(), t, f, &mut buf).await.unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[tokio::test]
    async fn test_company_formats() {
        let pool = populated().await;
        let csv = export(&pool, ExportType::Companies, ExportFormat::Csv).await;
        assert!(csv.starts_with("company_id,company_name,domain,"));
        assert!(csv.contains("\"Acme, Inc.\",acme.io,Raleigh,NC,,,0.457,unknown,,,csv,0.60"));

        let notion = export(&pool, ExportType::Companies, ExportFormat::Notion).await;
        assert!(notion.contains("\"Raleigh, NC\""));
        assert!(notion.contains(",0.46,"));

        let sheets = export(&pool, ExportType::Companies, ExportFormat::Sheets).await;
        assert!(sheets.starts_with("Company Name,Website,City,State"));
    }

    #[tokio::test]
    async fn test_contacts_and_sequences() {
        let pool = populated().await;
        let contacts = export(&pool, ExportType::Contacts, ExportFormat::Csv).await;
        let row = contacts.lines().nth(1).unwrap();
        assert!(row.contains("contacted,1,1,sent,\"met at \"\"meetup\"\"\""), "{}", row);

        let notion = export(&pool, ExportType::Contacts, ExportFormat::Notion).await;
        assert!(notion.contains("Ana Ruiz,CEO,\"Acme, Inc.\",contacted,sent"));

        let seq = export(&pool, ExportType::Sequences, ExportFormat::Csv).await;
        assert_eq!(seq.lines().count(), 2);
        assert!(seq.contains(",1,1,sent,2023-11-14 22:13:20,"));
    }

    #[tokio::test]
    async fn test_exports_are_stable() {
        let pool = populated().await;
        for t in [ExportType::Companies, ExportType::Contacts, ExportType::Sequences] {
            let a = export(&pool, t, ExportFormat::Csv).await;
            let b = export(&pool, t, ExportFormat::Csv).await;
            assert_eq!(a, b, "{} export changed between runs", t);
        }
    }

    #[tokio::test]
    async fn test_summary_and_unsupported_combinations() {
        let pool = populated().await;
        let summary = export(&pool, ExportType::Summary, ExportFormat::Csv).await;
        assert!(summary.contains("Messages Sent,1"));
        assert!(summary.contains("Reply Rate,0.0%"));

        let mut sink = Vec::new();
        let err = write_export(&pool, &config(), ExportType::Summary, ExportFormat::Notion, &mut sink)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("does not support"));
        assert!("xml".parse::<ExportFormat>().is_err());
    }

    #[tokio::test]
    async fn test_rejected_export_leaves_files_alone() {
        let tmp = tempfile::TempDir::new().unwrap();
        let content = format!(
            "[db]\npath = \"{root}/outreach.sqlite\"\n\n[paths]\ndata_dir = \"{root}/data\"\n",
            root = tmp.path().display()
        );
        let config: Config = toml::from_str(&content).unwrap();
        crate::migrate::run_migrations(&config).await.unwrap();

        let existing = tmp.path().join("keep.csv");
        std::fs::write(&existing, "metric,value\nkept,1\n").unwrap();
        let err = run_export(&config, "sequences", "notion", Some(&existing))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("does not support"));
        assert_eq!(
            std::fs::read_to_string(&existing).unwrap(),
            "metric,value\nkept,1\n"
        );

        assert!(run_export(&config, "summary", "sheets", None).await.is_err());
        assert!(!config.paths.out_dir().join("exports").exists());

        run_export(&config, "summary", "csv", None).await.unwrap();
        let written = std::fs::read_dir(config.paths.out_dir().join("exports"))
            .unwrap()
            .count();
        assert_eq!(written, 1);
    }
}
