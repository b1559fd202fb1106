//! SQLite data access.
//!
//! Free functions over a [`SqlitePool`]. Outreach rules that depend on
//! stored state (do-not-contact suppression, sequence validation, status
//! transitions) are enforced here so every entry point gets them.

use anyhow::{bail, Context, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::collections::BTreeSet;

use crate::error::OutreachError;
use crate::migrate::DEFAULT_SEQUENCE_ID;
use crate::models::{
    split_list, Company, Contact, ContactStatus, EventType, HiringSignal, NewContact,
    NewTouchpoint, Sequence, SequenceStep, Stats, StoredDraft, Touchpoint,
};
use crate::normalize::normalize_domain;

/// Priority for contacts whose title matches no seeded pattern.
pub const DEFAULT_CONTACT_PRIORITY: i64 = 10;

const SECONDS_PER_DAY: i64 = 86_400;

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

fn non_empty(s: &str) -> Option<&str> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

// ── Companies ──────────────────────────────────────────────────────────

/// Outcome of [`upsert_company`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted(i64),
    Updated(i64),
}

impl Upsert {
    pub fn id(&self) -> i64 {
        match self {
            Upsert::Inserted(id) | Upsert::Updated(id) => *id,
        }
    }
}

fn company_from_row(row: &SqliteRow) -> Company {
    Company {
        id: Some(row.get("company_id")),
        name: row.get("company_name"),
        domain: row.get::<Option<String>, _>("domain").unwrap_or_default(),
        hq_city: row.get("hq_city"),
        hq_state: row.get("hq_state"),
        size_band: row.get("size_band"),
        industry: row.get("industry"),
        keywords: split_list(row.get("keywords")),
        sources: split_list(row.get("sources")),
        confidence: row.get("confidence"),
        hiring_signal: HiringSignal::from_stored(row.get("hiring_signal")),
        recent_activity: row.get("recent_activity"),
        tech_stack_hint: row.get("tech_stack_hint"),
        relevance_score: row.get("relevance_score"),
    }
}

async fn find_matching_company(pool: &SqlitePool, company: &Company) -> Result<Option<Company>> {
    let row = if company.domain.is_empty() {
        sqlx::query(
            "SELECT * FROM companies WHERE domain IS NULL AND lower(company_name) = lower(?) ORDER BY company_id LIMIT 1",
        )
        .bind(&company.name)
        .fetch_optional(pool)
        .await?
    } else {
        sqlx::query("SELECT * FROM companies WHERE domain = ?")
            .bind(&company.domain)
            .fetch_optional(pool)
            .await?
    };
    Ok(row.as_ref().map(company_from_row))
}

/// Fold a rediscovered record into the stored one.
///
/// Sources and keywords are unioned, confidence only rises, and stored
/// values win over incoming ones except where the stored field is empty.
fn merge_rediscovered(mut stored: Company, incoming: &Company) -> Company {
    let fill = |target: &mut String, value: &str| {
        if target.is_empty() && !value.is_empty() {
            *target = value.to_string();
        }
    };
    fill(&mut stored.hq_city, &incoming.hq_city);
    fill(&mut stored.hq_state, &incoming.hq_state);
    fill(&mut stored.size_band, &incoming.size_band);
    fill(&mut stored.industry, &incoming.industry);
    fill(&mut stored.recent_activity, &incoming.recent_activity);
    fill(&mut stored.tech_stack_hint, &incoming.tech_stack_hint);
    if stored.hiring_signal == HiringSignal::Unknown {
        stored.hiring_signal = incoming.hiring_signal;
    }

    let sources: BTreeSet<String> = stored
        .sources
        .iter()
        .chain(&incoming.sources)
        .cloned()
        .collect();
    let keywords: BTreeSet<String> = stored
        .keywords
        .iter()
        .chain(&incoming.keywords)
        .cloned()
        .collect();
    stored.sources = sources.into_iter().collect();
    stored.keywords = keywords.into_iter().collect();
    stored.confidence = stored.confidence.max(incoming.confidence);
    stored
}

/// Insert a company, or merge it into the row with the same domain (or,
/// for domain-less companies, the same name ignoring case).
///
/// The relevance score is never touched here; only `rank` writes it.
pub async fn upsert_company(pool: &SqlitePool, company: &Company) -> Result<Upsert> {
    let ts = now();

    if let Some(stored) = find_matching_company(pool, company).await? {
        let id = stored.id.context("stored company row without id")?;
        let merged = merge_rediscovered(stored, company);
        sqlx::query(
            r#"
            UPDATE companies SET
                hq_city = ?, hq_state = ?, size_band = ?, industry = ?,
                keywords = ?, sources = ?, confidence = ?, hiring_signal = ?,
                recent_activity = ?, tech_stack_hint = ?, updated_at = ?
            WHERE company_id = ?
            "#,
        )
        .bind(&merged.hq_city)
        .bind(&merged.hq_state)
        .bind(&merged.size_band)
        .bind(&merged.industry)
        .bind(merged.keywords_joined())
        .bind(merged.sources_joined())
        .bind(merged.confidence)
        .bind(merged.hiring_signal.as_str())
        .bind(&merged.recent_activity)
        .bind(&merged.tech_stack_hint)
        .bind(ts)
        .bind(id)
        .execute(pool)
        .await?;
        tracing::debug!(company_id = id, name = %merged.name, "merged rediscovered company");
        return Ok(Upsert::Updated(id));
    }

    let id = sqlx::query(
        r#"
        INSERT INTO companies (
            company_name, domain, hq_city, hq_state, size_band, industry,
            keywords, sources, confidence, hiring_signal, recent_activity,
            tech_stack_hint, relevance_score, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 0.0, ?, ?)
        "#,
    )
    .bind(&company.name)
    .bind(non_empty(&company.domain))
    .bind(&company.hq_city)
    .bind(&company.hq_state)
    .bind(&company.size_band)
    .bind(&company.industry)
    .bind(company.keywords_joined())
    .bind(company.sources_joined())
    .bind(company.confidence)
    .bind(company.hiring_signal.as_str())
    .bind(&company.recent_activity)
    .bind(&company.tech_stack_hint)
    .bind(ts)
    .bind(ts)
    .execute(pool)
    .await?
    .last_insert_rowid();

    tracing::debug!(company_id = id, name = %company.name, "inserted company");
    Ok(Upsert::Inserted(id))
}

pub async fn get_company(pool: &SqlitePool, company_id: i64) -> Result<Company> {
    let row = sqlx::query("SELECT * FROM companies WHERE company_id = ?")
        .bind(company_id)
        .fetch_optional(pool)
        .await?
        .ok_or(OutreachError::CompanyNotFound(company_id))?;
    Ok(company_from_row(&row))
}

/// All companies, by id or (when `ranked`) by score descending with ties
/// broken by id.
pub async fn list_companies(
    pool: &SqlitePool,
    ranked: bool,
    limit: Option<i64>,
) -> Result<Vec<Company>> {
    let order = if ranked {
        "relevance_score DESC, company_id ASC"
    } else {
        "company_id ASC"
    };
    let sql = format!("SELECT * FROM companies ORDER BY {} LIMIT ?", order);
    let rows = sqlx::query(&sql)
        .bind(limit.unwrap_or(-1))
        .fetch_all(pool)
        .await?;
    Ok(rows.iter().map(company_from_row).collect())
}

pub async fn update_company_score(pool: &SqlitePool, company_id: i64, score: f64) -> Result<()> {
    sqlx::query("UPDATE companies SET relevance_score = ?, updated_at = ? WHERE company_id = ?")
        .bind(score)
        .bind(now())
        .bind(company_id)
        .execute(pool)
        .await?;
    Ok(())
}

// ── Contacts ───────────────────────────────────────────────────────────

fn contact_from_row(row: &SqliteRow) -> Result<Contact> {
    let status: String = row.get("status");
    Ok(Contact {
        id: row.get("contact_id"),
        company_id: row.get("company_id"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
        title: row.get("title"),
        profile_url: row.get("profile_url"),
        email: row.get("email"),
        notes: row.get("notes"),
        priority: row.get("priority"),
        status: status.parse()?,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    })
}

fn title_tokens(s: &str) -> Vec<String> {
    s.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// True when the pattern's words appear contiguously in the title
/// ("CTO" matches "CTO & Co-Founder" but not "Director").
fn title_matches(title: &[String], pattern: &[String]) -> bool {
    !pattern.is_empty()
        && title.len() >= pattern.len()
        && title.windows(pattern.len()).any(|w| w == pattern)
}

/// Best (lowest) seeded rank whose pattern matches `title`.
pub async fn title_priority(pool: &SqlitePool, title: &str) -> Result<i64> {
    let title = title_tokens(title);
    let rows = sqlx::query("SELECT title_pattern, priority_rank FROM title_priorities")
        .fetch_all(pool)
        .await?;
    Ok(rows
        .iter()
        .filter(|row| title_matches(&title, &title_tokens(row.get("title_pattern"))))
        .map(|row| row.get::<i64, _>("priority_rank"))
        .min()
        .unwrap_or(DEFAULT_CONTACT_PRIORITY))
}

pub async fn add_contact(pool: &SqlitePool, contact: &NewContact) -> Result<i64> {
    if contact.first_name.trim().is_empty() && contact.last_name.trim().is_empty() {
        bail!("contact needs a first or last name");
    }
    get_company(pool, contact.company_id).await?;

    let priority = match contact.priority {
        Some(p) => p,
        None => title_priority(pool, &contact.title).await?,
    };
    let ts = now();

    let id = sqlx::query(
        r#"
        INSERT INTO contacts (
            company_id, first_name, last_name, title, profile_url, email,
            notes, priority, status, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, 'new', ?, ?)
        "#,
    )
    .bind(contact.company_id)
    .bind(contact.first_name.trim())
    .bind(contact.last_name.trim())
    .bind(contact.title.trim())
    .bind(&contact.profile_url)
    .bind(&contact.email)
    .bind(&contact.notes)
    .bind(priority)
    .bind(ts)
    .bind(ts)
    .execute(pool)
    .await?
    .last_insert_rowid();

    tracing::info!(contact_id = id, company_id = contact.company_id, "added contact");
    Ok(id)
}

pub async fn get_contact(pool: &SqlitePool, contact_id: i64) -> Result<Contact> {
    let row = sqlx::query("SELECT * FROM contacts WHERE contact_id = ?")
        .bind(contact_id)
        .fetch_optional(pool)
        .await?
        .ok_or(OutreachError::ContactNotFound(contact_id))?;
    contact_from_row(&row)
}

/// Contacts ordered by priority then id, optionally filtered.
pub async fn list_contacts(
    pool: &SqlitePool,
    company_id: Option<i64>,
    status: Option<ContactStatus>,
) -> Result<Vec<Contact>> {
    let status = status.map(|s| s.as_str());
    let rows = sqlx::query(
        r#"
        SELECT * FROM contacts
        WHERE (?1 IS NULL OR company_id = ?1)
          AND (?2 IS NULL OR status = ?2)
        ORDER BY priority ASC, contact_id ASC
        "#,
    )
    .bind(company_id)
    .bind(status)
    .fetch_all(pool)
    .await?;
    rows.iter().map(contact_from_row).collect()
}

/// Change a contact's status. `do_not_contact` is terminal.
pub async fn set_contact_status(
    pool: &SqlitePool,
    contact_id: i64,
    status: ContactStatus,
) -> Result<()> {
    let contact = get_contact(pool, contact_id).await?;
    if contact.status == ContactStatus::DoNotContact {
        if status == ContactStatus::DoNotContact {
            return Ok(());
        }
        return Err(OutreachError::StatusLocked {
            contact_id,
            requested: status.to_string(),
        }
        .into());
    }
    if status == ContactStatus::DoNotContact {
        return add_contact_dnc(pool, contact_id, "status set to do_not_contact").await;
    }

    sqlx::query("UPDATE contacts SET status = ?, updated_at = ? WHERE contact_id = ?")
        .bind(status.as_str())
        .bind(now())
        .bind(contact_id)
        .execute(pool)
        .await?;
    Ok(())
}

// ── Do-not-contact ─────────────────────────────────────────────────────

/// Put a contact on the do-not-contact list and lock its status.
pub async fn add_contact_dnc(pool: &SqlitePool, contact_id: i64, reason: &str) -> Result<()> {
    get_contact(pool, contact_id).await?;
    let ts = now();

    let mut tx = pool.begin().await?;
    let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM do_not_contact WHERE contact_id = ?")
        .bind(contact_id)
        .fetch_one(&mut *tx)
        .await?;
    if existing == 0 {
        sqlx::query("INSERT INTO do_not_contact (contact_id, reason, added_at) VALUES (?, ?, ?)")
            .bind(contact_id)
            .bind(reason)
            .bind(ts)
            .execute(&mut *tx)
            .await?;
    }
    sqlx::query("UPDATE contacts SET status = 'do_not_contact', updated_at = ? WHERE contact_id = ?")
        .bind(ts)
        .bind(contact_id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;

    tracing::info!(contact_id, "contact added to do-not-contact list");
    Ok(())
}

/// Suppress a whole domain. Returns the normalized domain stored.
pub async fn add_domain_dnc(pool: &SqlitePool, domain: &str, reason: &str) -> Result<String> {
    let domain = normalize_domain(domain);
    if domain.is_empty() {
        bail!("domain must not be empty");
    }
    if !is_domain_suppressed(pool, &domain).await? {
        sqlx::query("INSERT INTO do_not_contact (domain, reason, added_at) VALUES (?, ?, ?)")
            .bind(&domain)
            .bind(reason)
            .bind(now())
            .execute(pool)
            .await?;
        tracing::info!(%domain, "domain added to do-not-contact list");
    }
    Ok(domain)
}

pub async fn is_domain_suppressed(pool: &SqlitePool, domain: &str) -> Result<bool> {
    if domain.is_empty() {
        return Ok(false);
    }
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM do_not_contact WHERE domain = ?")
        .bind(domain)
        .fetch_one(pool)
        .await?;
    Ok(count > 0)
}

/// Fail with a do-not-contact error when outreach to `contact` is suppressed,
/// either for the contact itself or for its company's domain.
pub async fn ensure_contactable(pool: &SqlitePool, contact: &Contact) -> Result<()> {
    let listed: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM do_not_contact WHERE contact_id = ?")
        .bind(contact.id)
        .fetch_one(pool)
        .await?;
    if listed > 0 || contact.status == ContactStatus::DoNotContact {
        return Err(OutreachError::DoNotContact {
            contact_id: contact.id,
        }
        .into());
    }

    let company = get_company(pool, contact.company_id).await?;
    if is_domain_suppressed(pool, &company.domain).await? {
        return Err(OutreachError::DomainSuppressed {
            domain: company.domain,
        }
        .into());
    }
    Ok(())
}

// ── Drafts ─────────────────────────────────────────────────────────────

/// Store a generated draft. Drafts always start unreviewed.
pub async fn save_draft(
    pool: &SqlitePool,
    company_id: i64,
    contact_id: Option<i64>,
    angle: &str,
    invite_note: &str,
    inmail_message: &str,
) -> Result<i64> {
    let id = sqlx::query(
        r#"
        INSERT INTO message_drafts (company_id, contact_id, angle, invite_note, inmail_message, reviewed, created_at)
        VALUES (?, ?, ?, ?, ?, 0, ?)
        "#,
    )
    .bind(company_id)
    .bind(contact_id)
    .bind(angle)
    .bind(invite_note)
    .bind(inmail_message)
    .bind(now())
    .execute(pool)
    .await?
    .last_insert_rowid();
    Ok(id)
}

pub async fn list_drafts(pool: &SqlitePool, company_id: Option<i64>) -> Result<Vec<StoredDraft>> {
    let rows = sqlx::query(
        "SELECT * FROM message_drafts WHERE (?1 IS NULL OR company_id = ?1) ORDER BY draft_id",
    )
    .bind(company_id)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .iter()
        .map(|row| StoredDraft {
            id: row.get("draft_id"),
            company_id: row.get("company_id"),
            contact_id: row.get("contact_id"),
            angle: row.get("angle"),
            invite_note: row.get("invite_note"),
            inmail_message: row.get("inmail_message"),
            reviewed: row.get::<i64, _>("reviewed") != 0,
            created_at: row.get("created_at"),
        })
        .collect())
}

// ── Touchpoints ────────────────────────────────────────────────────────

/// Status a contact moves to after an event, if any.
///
/// Statuses only move forward; `converted` and `do_not_contact` never change.
pub fn next_status(current: ContactStatus, event: EventType) -> Option<ContactStatus> {
    match (current, event) {
        (ContactStatus::New, EventType::Sent | EventType::FollowUp) => Some(ContactStatus::Contacted),
        (ContactStatus::New | ContactStatus::Contacted, EventType::Replied) => {
            Some(ContactStatus::Replied)
        }
        _ => None,
    }
}

fn touchpoint_from_row(row: &SqliteRow) -> Result<Touchpoint> {
    let event_type: String = row.get("event_type");
    Ok(Touchpoint {
        id: row.get("touchpoint_id"),
        contact_id: row.get("contact_id"),
        sequence_id: row.get("sequence_id"),
        step_number: row.get("step_number"),
        event_type: event_type.parse()?,
        event_date: row.get("event_date"),
        outcome: row.get("outcome"),
        notes: row.get("notes"),
    })
}

/// Record an outreach event and advance the contact's status.
///
/// Rejected when the contact (or its company's domain) is on the
/// do-not-contact list. A step number without a sequence refers to the
/// default sequence.
pub async fn log_touchpoint(pool: &SqlitePool, touchpoint: &NewTouchpoint) -> Result<i64> {
    let contact = get_contact(pool, touchpoint.contact_id).await?;
    ensure_contactable(pool, &contact).await?;

    let sequence_id = match (touchpoint.sequence_id, touchpoint.step_number) {
        (None, Some(_)) => Some(DEFAULT_SEQUENCE_ID),
        (id, _) => id,
    };
    if let Some(sequence_id) = sequence_id {
        let sequence = get_sequence(pool, sequence_id).await?;
        if let Some(step) = touchpoint.step_number {
            if !sequence.steps.iter().any(|s| s.step_number == step) {
                return Err(OutreachError::UnknownSequenceStep { sequence_id, step }.into());
            }
        }
    }

    let event_date = touchpoint.event_date.unwrap_or_else(now);
    let mut tx = pool.begin().await?;
    let id = sqlx::query(
        r#"
        INSERT INTO touchpoints (contact_id, sequence_id, step_number, event_type, event_date, outcome, notes)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(contact.id)
    .bind(sequence_id)
    .bind(touchpoint.step_number)
    .bind(touchpoint.event_type.as_str())
    .bind(event_date)
    .bind(&touchpoint.outcome)
    .bind(&touchpoint.notes)
    .execute(&mut *tx)
    .await?
    .last_insert_rowid();

    if let Some(status) = next_status(contact.status, touchpoint.event_type) {
        sqlx::query("UPDATE contacts SET status = ?, updated_at = ? WHERE contact_id = ?")
            .bind(status.as_str())
            .bind(now())
            .bind(contact.id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;

    tracing::info!(
        touchpoint_id = id,
        contact_id = contact.id,
        event = %touchpoint.event_type,
        "logged touchpoint"
    );
    Ok(id)
}

pub async fn touchpoints_for_contact(pool: &SqlitePool, contact_id: i64) -> Result<Vec<Touchpoint>> {
    let rows = sqlx::query(
        "SELECT * FROM touchpoints WHERE contact_id = ? ORDER BY event_date, touchpoint_id",
    )
    .bind(contact_id)
    .fetch_all(pool)
    .await?;
    rows.iter().map(touchpoint_from_row).collect()
}

// ── Sequences ──────────────────────────────────────────────────────────

async fn sequence_steps(pool: &SqlitePool, sequence_id: i64) -> Result<Vec<SequenceStep>> {
    let rows = sqlx::query(
        "SELECT * FROM sequence_steps WHERE sequence_id = ? ORDER BY step_number",
    )
    .bind(sequence_id)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            let step_type: String = row.get("step_type");
            Ok(SequenceStep {
                step_number: row.get("step_number"),
                step_type: step_type.parse()?,
                days_after_previous: row.get("days_after_previous"),
                template_name: row.get("template_name"),
            })
        })
        .collect()
}

pub async fn get_sequence(pool: &SqlitePool, sequence_id: i64) -> Result<Sequence> {
    let row = sqlx::query("SELECT * FROM sequences WHERE sequence_id = ?")
        .bind(sequence_id)
        .fetch_optional(pool)
        .await?
        .ok_or(OutreachError::SequenceNotFound(sequence_id))?;

    Ok(Sequence {
        id: row.get("sequence_id"),
        name: row.get("sequence_name"),
        description: row.get("description"),
        steps: sequence_steps(pool, sequence_id).await?,
    })
}

pub async fn list_sequences(pool: &SqlitePool) -> Result<Vec<Sequence>> {
    let ids: Vec<i64> = sqlx::query_scalar("SELECT sequence_id FROM sequences ORDER BY sequence_id")
        .fetch_all(pool)
        .await?;
    let mut sequences = Vec::with_capacity(ids.len());
    for id in ids {
        sequences.push(get_sequence(pool, id).await?);
    }
    Ok(sequences)
}

/// Where a contact stands in a sequence.
#[derive(Debug, Clone)]
pub struct SequenceProgress {
    pub sequence: Sequence,
    /// Completed step numbers with the date each was last logged.
    pub completed: Vec<(i64, i64)>,
    pub next_step: Option<SequenceStep>,
    /// When the next step is due; `None` when nothing has been logged yet
    /// (due now) or the sequence is finished.
    pub next_due: Option<i64>,
}

pub async fn sequence_progress(
    pool: &SqlitePool,
    contact_id: i64,
    sequence_id: i64,
) -> Result<SequenceProgress> {
    get_contact(pool, contact_id).await?;
    let sequence = get_sequence(pool, sequence_id).await?;

    let rows = sqlx::query(
        r#"
        SELECT step_number, MAX(event_date) AS last_date
        FROM touchpoints
        WHERE contact_id = ? AND sequence_id = ? AND step_number IS NOT NULL
        GROUP BY step_number
        ORDER BY step_number
        "#,
    )
    .bind(contact_id)
    .bind(sequence_id)
    .fetch_all(pool)
    .await?;
    let completed: Vec<(i64, i64)> = rows
        .iter()
        .map(|row| (row.get("step_number"), row.get("last_date")))
        .collect();

    let next_step = sequence
        .steps
        .iter()
        .find(|s| !completed.iter().any(|(n, _)| *n == s.step_number))
        .cloned();
    let last_logged = completed.iter().map(|(_, date)| *date).max();
    let next_due = match (&next_step, last_logged) {
        (Some(step), Some(last)) => Some(last + step.days_after_previous * SECONDS_PER_DAY),
        _ => None,
    };

    Ok(SequenceProgress {
        sequence,
        completed,
        next_step,
        next_due,
    })
}

// ── Follow-ups and stats ───────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PendingFollowUp {
    pub contact: Contact,
    pub company_name: String,
    pub last_sent: i64,
}

/// Contacted contacts whose latest `sent` is at least `followup_days` old
/// as of `as_of`, with no `replied` or `follow_up` logged since.
pub async fn pending_followups(
    pool: &SqlitePool,
    followup_days: i64,
    as_of: i64,
) -> Result<Vec<PendingFollowUp>> {
    let cutoff = as_of - followup_days * SECONDS_PER_DAY;
    let rows = sqlx::query(
        r#"
        SELECT c.*, co.company_name AS company_name, s.last_sent AS last_sent
        FROM contacts c
        JOIN companies co ON co.company_id = c.company_id
        JOIN (
            SELECT contact_id, MAX(event_date) AS last_sent
            FROM touchpoints
            WHERE event_type = 'sent'
            GROUP BY contact_id
        ) s ON s.contact_id = c.contact_id
        WHERE c.status = 'contacted'
          AND s.last_sent <= ?
          AND NOT EXISTS (
              SELECT 1 FROM touchpoints t2
              WHERE t2.contact_id = c.contact_id
                AND t2.event_type IN ('replied', 'follow_up')
                AND t2.event_date >= s.last_sent
          )
        ORDER BY s.last_sent, c.contact_id
        "#,
    )
    .bind(cutoff)
    .fetch_all(pool)
    .await?;

    rows.iter()
        .map(|row| {
            Ok(PendingFollowUp {
                contact: contact_from_row(row)?,
                company_name: row.get("company_name"),
                last_sent: row.get("last_sent"),
            })
        })
        .collect()
}

pub async fn stats(pool: &SqlitePool, followup_days: i64) -> Result<Stats> {
    async fn count(pool: &SqlitePool, sql: &str) -> Result<i64> {
        Ok(sqlx::query_scalar::<_, i64>(sql).fetch_one(pool).await?)
    }

    Ok(Stats {
        companies: count(pool, "SELECT COUNT(*) FROM companies").await?,
        contacts: count(pool, "SELECT COUNT(*) FROM contacts").await?,
        sent: count(pool, "SELECT COUNT(*) FROM touchpoints WHERE event_type = 'sent'").await?,
        replied: count(pool, "SELECT COUNT(*) FROM touchpoints WHERE event_type = 'replied'")
            .await?,
        pending_followups: pending_followups(pool, followup_days, now()).await?.len() as i64,
        do_not_contact: count(pool, "SELECT COUNT(*) FROM do_not_contact").await?,
        drafts: count(pool, "SELECT COUNT(*) FROM message_drafts").await?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;

    fn company(name: &str, domain: &str, source: &str) -> Company {
        Company {
            name: name.into(),
            domain: domain.into(),
            sources: vec![source.into()],
            confidence: 0.5,
            ..Default::default()
        }
    }

    async fn seeded() -> (SqlitePool, i64, i64) {
        let pool = memory_pool().await.unwrap();
        let company_id = upsert_company(&pool, &company("Acme", "acme.io", "csv"))
            .await
            .unwrap()
            .id();
        let contact_id = add_contact(
            &pool,
            &NewContact {
                company_id,
                first_name: "Dana".into(),
                last_name: "Smith".into(),
                title: "CTO".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        (pool, company_id, contact_id)
    }

    fn outreach_err(err: &anyhow::Error) -> &OutreachError {
        err.downcast_ref::<OutreachError>()
            .unwrap_or_else(|| panic!("expected OutreachError, got {:#}", err))
    }

    #[tokio::test]
    async fn test_migrations_are_idempotent() {
        let pool = memory_pool().await.unwrap();
        crate::migrate::migrate_pool(&pool).await.unwrap();
        let sequences = list_sequences(&pool).await.unwrap();
        assert_eq!(sequences.len(), 1);
        assert_eq!(sequences[0].steps.len(), 3);
        assert_eq!(sequences[0].steps[2].days_after_previous, 14);
    }

    #[tokio::test]
    async fn test_upsert_merges_by_domain_and_name() {
        let pool = memory_pool().await.unwrap();
        let first = upsert_company(&pool, &company("Acme", "acme.io", "csv")).await.unwrap();
        assert!(matches!(first, Upsert::Inserted(_)));

        let mut again = company("Acme Inc", "acme.io", "api");
        again.hq_city = "Raleigh".into();
        again.confidence = 0.9;
        let second = upsert_company(&pool, &again).await.unwrap();
        assert_eq!(second, Upsert::Updated(first.id()));

        let stored = get_company(&pool, first.id()).await.unwrap();
        assert_eq!(stored.name, "Acme");
        assert_eq!(stored.hq_city, "Raleigh");
        assert_eq!(stored.sources, vec!["api", "csv"]);
        assert_eq!(stored.confidence, 0.9);

        let a = upsert_company(&pool, &company("No Site Co", "", "csv")).await.unwrap();
        let b = upsert_company(&pool, &company("no site co", "", "csv")).await.unwrap();
        assert_eq!(a.id(), b.id());
        assert_eq!(list_companies(&pool, false, None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_upsert_preserves_score_and_ranked_order() {
        let pool = memory_pool().await.unwrap();
        let a = upsert_company(&pool, &company("A", "a.io", "csv")).await.unwrap().id();
        let b = upsert_company(&pool, &company("B", "b.io", "csv")).await.unwrap().id();
        update_company_score(&pool, b, 0.8).await.unwrap();
        update_company_score(&pool, a, 0.4).await.unwrap();
        upsert_company(&pool, &company("B", "b.io", "api")).await.unwrap();

        let ranked = list_companies(&pool, true, Some(1)).await.unwrap();
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].id, Some(b));
        assert_eq!(ranked[0].relevance_score, 0.8);
    }

    #[tokio::test]
    async fn test_contact_requires_company_and_gets_title_priority() {
        let (pool, company_id, contact_id) = seeded().await;
        let contact = get_contact(&pool, contact_id).await.unwrap();
        assert_eq!(contact.priority, 2);
        assert_eq!(contact.status, ContactStatus::New);

        let director = add_contact(
            &pool,
            &NewContact {
                company_id,
                first_name: "Lee".into(),
                title: "Director of Sales".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(
            get_contact(&pool, director).await.unwrap().priority,
            DEFAULT_CONTACT_PRIORITY
        );

        let err = add_contact(
            &pool,
            &NewContact {
                company_id: 999,
                first_name: "X".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(outreach_err(&err), OutreachError::CompanyNotFound(999)));
    }

    #[tokio::test]
    async fn test_status_transitions_from_events() {
        let (pool, _, contact_id) = seeded().await;
        log_touchpoint(&pool, &NewTouchpoint::new(contact_id, EventType::Seen))
            .await
            .unwrap();
        assert_eq!(get_contact(&pool, contact_id).await.unwrap().status, ContactStatus::New);

        log_touchpoint(&pool, &NewTouchpoint::new(contact_id, EventType::Sent))
            .await
            .unwrap();
        assert_eq!(
            get_contact(&pool, contact_id).await.unwrap().status,
            ContactStatus::Contacted
        );

        log_touchpoint(&pool, &NewTouchpoint::new(contact_id, EventType::Replied))
            .await
            .unwrap();
        assert_eq!(
            get_contact(&pool, contact_id).await.unwrap().status,
            ContactStatus::Replied
        );

        set_contact_status(&pool, contact_id, ContactStatus::Converted)
            .await
            .unwrap();
        log_touchpoint(&pool, &NewTouchpoint::new(contact_id, EventType::Sent))
            .await
            .unwrap();
        assert_eq!(
            get_contact(&pool, contact_id).await.unwrap().status,
            ContactStatus::Converted
        );
        assert_eq!(touchpoints_for_contact(&pool, contact_id).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_dnc_contact_rejects_touchpoints_and_locks_status() {
        let (pool, _, contact_id) = seeded().await;
        add_contact_dnc(&pool, contact_id, "asked not to be contacted")
            .await
            .unwrap();

        let err = log_touchpoint(&pool, &NewTouchpoint::new(contact_id, EventType::Sent))
            .await
            .unwrap_err();
        assert!(matches!(
            outreach_err(&err),
            OutreachError::DoNotContact { contact_id: id } if *id == contact_id
        ));
        assert!(touchpoints_for_contact(&pool, contact_id).await.unwrap().is_empty());

        let err = set_contact_status(&pool, contact_id, ContactStatus::New)
            .await
            .unwrap_err();
        assert!(matches!(outreach_err(&err), OutreachError::StatusLocked { .. }));
    }

    #[tokio::test]
    async fn test_domain_dnc_rejects_touchpoints() {
        let (pool, _, contact_id) = seeded().await;
        let stored = add_domain_dnc(&pool, "https://www.ACME.io/", "competitor")
            .await
            .unwrap();
        assert_eq!(stored, "acme.io");
        add_domain_dnc(&pool, "acme.io", "again").await.unwrap();
        assert_eq!(stats(&pool, 7).await.unwrap().do_not_contact, 1);

        let err = log_touchpoint(&pool, &NewTouchpoint::new(contact_id, EventType::Sent))
            .await
            .unwrap_err();
        assert!(matches!(outreach_err(&err), OutreachError::DomainSuppressed { .. }));
    }

    #[tokio::test]
    async fn test_sequence_step_validation_and_progress() {
        let (pool, _, contact_id) = seeded().await;

        let mut tp = NewTouchpoint::new(contact_id, EventType::Sent);
        tp.step_number = Some(9);
        let err = log_touchpoint(&pool, &tp).await.unwrap_err();
        assert!(matches!(
            outreach_err(&err),
            OutreachError::UnknownSequenceStep { step: 9, .. }
        ));

        let mut tp = NewTouchpoint::new(contact_id, EventType::Sent);
        tp.sequence_id = Some(42);
        let err = log_touchpoint(&pool, &tp).await.unwrap_err();
        assert!(matches!(outreach_err(&err), OutreachError::SequenceNotFound(42)));

        let mut tp = NewTouchpoint::new(contact_id, EventType::Sent);
        tp.step_number = Some(1);
        tp.event_date = Some(1_700_000_000);
        log_touchpoint(&pool, &tp).await.unwrap();

        let progress = sequence_progress(&pool, contact_id, DEFAULT_SEQUENCE_ID)
            .await
            .unwrap();
        assert_eq!(progress.completed, vec![(1, 1_700_000_000)]);
        assert_eq!(progress.next_step.as_ref().map(|s| s.step_number), Some(2));
        assert_eq!(progress.next_due, Some(1_700_000_000 + 7 * SECONDS_PER_DAY));
    }

    #[tokio::test]
    async fn test_pending_followups() {
        let (pool, _, contact_id) = seeded().await;
        let sent_at = 1_700_000_000;
        let mut tp = NewTouchpoint::new(contact_id, EventType::Sent);
        tp.event_date = Some(sent_at);
        log_touchpoint(&pool, &tp).await.unwrap();

        let day = SECONDS_PER_DAY;
        assert!(pending_followups(&pool, 7, sent_at + 6 * day).await.unwrap().is_empty());
        let pending = pending_followups(&pool, 7, sent_at + 7 * day).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].company_name, "Acme");
        assert_eq!(pending[0].last_sent, sent_at);

        let mut tp = NewTouchpoint::new(contact_id, EventType::FollowUp);
        tp.event_date = Some(sent_at + 8 * day);
        log_touchpoint(&pool, &tp).await.unwrap();
        assert!(pending_followups(&pool, 7, sent_at + 9 * day).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_drafts_saved_unreviewed() {
        let (pool, company_id, contact_id) = seeded().await;
        save_draft(&pool, company_id, Some(contact_id), "peer", "hi", "hello")
            .await
            .unwrap();
        let drafts = list_drafts(&pool, Some(company_id)).await.unwrap();
        assert_eq!(drafts.len(), 1);
        assert!(!drafts[0].reviewed);
        assert!(list_drafts(&pool, Some(company_id + 1)).await.unwrap().is_empty());
    }

    #[test]
    fn test_title_matching_is_word_based() {
        let t = title_tokens("Director of Engineering");
        assert!(!title_matches(&t, &title_tokens("CTO")));
        assert!(title_matches(&t, &title_tokens("Director of Engineering")));
        assert!(title_matches(&title_tokens("CTO & Co-Founder"), &title_tokens("Co-Founder")));
    }
}
