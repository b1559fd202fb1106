//! Command handlers for the manual CRM side: `init`, `contact`, `log` and
//! `sequence`.
//!
//! Each handler opens the pool, calls into [`crate::repo`] and prints a short
//! human-readable summary on stdout.

use anyhow::{Context, Result};

use crate::config::Config;
use crate::db;
use crate::error::OutreachError;
use crate::migrate;
use crate::models::{ContactStatus, EventType, NewContact, NewTouchpoint};
use crate::repo;

/// Parse a `YYYY-MM-DD` date into unix seconds at midnight UTC.
pub fn parse_date(s: &str) -> Result<i64, OutreachError> {
    chrono::NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc().timestamp())
        .ok_or_else(|| OutreachError::InvalidValue {
            kind: "date",
            value: s.to_string(),
            expected: "YYYY-MM-DD",
        })
}

fn format_date(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| ts.to_string())
}

pub async fn run_init(config: &Config) -> Result<()> {
    migrate::run_migrations(config).await?;
    for dir in [config.paths.raw_dir(), config.paths.out_dir()] {
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    println!("Database initialized successfully.");
    println!("  db:   {}", config.db.path.display());
    println!("  data: {}", config.paths.data_dir.display());
    Ok(())
}

pub async fn run_contact_add(config: &Config, contact: &NewContact) -> Result<()> {
    let pool = db::connect(config).await?;
    let id = repo::add_contact(&pool, contact)
        .await
        .with_context(|| format!("Failed to add contact to company {}", contact.company_id))?;
    let stored = repo::get_contact(&pool, id).await?;
    pool.close().await;

    println!(
        "added contact {} ({}, priority {})",
        id,
        stored.full_name(),
        stored.priority
    );
    Ok(())
}

pub async fn run_contact_list(
    config: &Config,
    company_id: Option<i64>,
    status: Option<&str>,
) -> Result<()> {
    let status = status.map(str::parse::<ContactStatus>).transpose()?;
    let pool = db::connect(config).await?;
    let contacts = repo::list_contacts(&pool, company_id, status).await?;

    if contacts.is_empty() {
        println!("No contacts found.");
        pool.close().await;
        return Ok(());
    }

    println!(
        "{:>6}  {:<24} {:<28} {:<24} {:>4}  STATUS",
        "ID", "NAME", "TITLE", "COMPANY", "PRI"
    );
    for c in &contacts {
        let company = repo::get_company(&pool, c.company_id).await?;
        println!(
            "{:>6}  {:<24} {:<28} {:<24} {:>4}  {}",
            c.id,
            c.full_name(),
            c.title,
            company.name,
            c.priority,
            c.status
        );
    }
    pool.close().await;
    Ok(())
}

/// Add a contact or a whole domain to the do-not-contact list.
pub async fn run_dnc(
    config: &Config,
    contact_id: Option<i64>,
    domain: Option<&str>,
    reason: &str,
) -> Result<()> {
    let pool = db::connect(config).await?;
    match (contact_id, domain) {
        (Some(id), None) => {
            repo::add_contact_dnc(&pool, id, reason).await?;
            println!("contact {} marked do-not-contact", id);
        }
        (None, Some(domain)) => {
            let stored = repo::add_domain_dnc(&pool, domain, reason).await?;
            println!("domain {} marked do-not-contact", stored);
        }
        _ => anyhow::bail!("Pass exactly one of --contact-id or --domain"),
    }
    pool.close().await;
    Ok(())
}

pub async fn run_set_status(config: &Config, contact_id: i64, status: &str) -> Result<()> {
    let status: ContactStatus = status.parse()?;
    let pool = db::connect(config).await?;
    repo::set_contact_status(&pool, contact_id, status).await?;
    pool.close().await;
    println!("contact {} status: {}", contact_id, status);
    Ok(())
}

/// Arguments of `outreach log`, as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct LogArgs {
    pub event: String,
    pub contact_id: i64,
    pub sequence_id: Option<i64>,
    pub step: Option<i64>,
    pub outcome: Option<String>,
    pub notes: Option<String>,
    pub date: Option<String>,
}

impl LogArgs {
    pub fn to_touchpoint(&self) -> Result<NewTouchpoint, OutreachError> {
        let event: EventType = self.event.parse()?;
        let mut tp = NewTouchpoint::new(self.contact_id, event);
        tp.sequence_id = self.sequence_id;
        tp.step_number = self.step;
        tp.outcome = self.outcome.clone();
        tp.notes = self.notes.clone();
        tp.event_date = self.date.as_deref().map(parse_date).transpose()?;
        Ok(tp)
    }
}

pub async fn run_log(config: &Config, args: &LogArgs) -> Result<()> {
    let touchpoint = args.to_touchpoint()?;
    let pool = db::connect(config).await?;
    let id = repo::log_touchpoint(&pool, &touchpoint)
        .await
        .with_context(|| format!("Failed to log {} for contact {}", touchpoint.event_type, args.contact_id))?;
    let contact = repo::get_contact(&pool, args.contact_id).await?;
    pool.close().await;

    println!(
        "logged {} for {} (touchpoint {}), status: {}",
        touchpoint.event_type,
        contact.full_name(),
        id,
        contact.status
    );
    Ok(())
}

pub async fn run_sequence_list(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let sequences = repo::list_sequences(&pool).await?;
    pool.close().await;

    for seq in &sequences {
        println!("{}  {}", seq.id, seq.name);
        if let Some(desc) = &seq.description {
            println!("    {}", desc);
        }
        for step in &seq.steps {
            println!(
                "    step {}: {:<10} +{} days  {}",
                step.step_number,
                step.step_type.as_str(),
                step.days_after_previous,
                step.template_name.as_deref().unwrap_or("-")
            );
        }
    }
    Ok(())
}

pub async fn run_sequence_progress(
    config: &Config,
    contact_id: i64,
    sequence_id: i64,
) -> Result<()> {
    let pool = db::connect(config).await?;
    let progress = repo::sequence_progress(&pool, contact_id, sequence_id).await?;
    pool.close().await;

    println!(
        "contact {} in sequence {} ({})",
        contact_id, progress.sequence.id, progress.sequence.name
    );
    for step in &progress.sequence.steps {
        let done = progress
            .completed
            .iter()
            .find(|(n, _)| *n == step.step_number);
        match done {
            Some((_, date)) => println!(
                "  [x] step {} {} on {}",
                step.step_number,
                step.step_type.as_str(),
                format_date(*date)
            ),
            None => println!("  [ ] step {} {}", step.step_number, step.step_type.as_str()),
        }
    }
    match (&progress.next_step, progress.next_due) {
        (Some(step), Some(due)) => println!(
            "next: step {} due {}",
            step.step_number,
            format_date(due)
        ),
        (Some(step), None) => println!("next: step {} (due now)", step.step_number),
        (None, _) => println!("sequence complete"),
    }
    Ok(())
}
