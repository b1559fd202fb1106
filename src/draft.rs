//! Draft generation.
//!
//! Renders an invite note and an InMail for a company (and optionally one
//! of its contacts), enforces the length limits, and stores the result for
//! human review. Nothing here sends anything.

use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::compliance::{DRAFT_LABEL, MAX_INMAIL_CHARS, MAX_INVITE_CHARS, MIN_INMAIL_CHARS};
use crate::config::Config;
use crate::db;
use crate::error::OutreachError;
use crate::models::{Company, Contact};
use crate::repo;
use crate::templates::{self, lookup, render};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Angle {
    #[default]
    Peer,
    Curiosity,
    Usecase,
    Local,
}

impl Angle {
    pub fn as_str(&self) -> &'static str {
        match self {
            Angle::Peer => "peer",
            Angle::Curiosity => "curiosity",
            Angle::Usecase => "usecase",
            Angle::Local => "local",
        }
    }
}

impl FromStr for Angle {
    type Err = OutreachError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace(['-', '_'], "").as_str() {
            "peer" => Ok(Angle::Peer),
            "curiosity" => Ok(Angle::Curiosity),
            "usecase" => Ok(Angle::Usecase),
            "local" => Ok(Angle::Local),
            _ => Err(OutreachError::InvalidValue {
                kind: "angle",
                value: s.to_string(),
                expected: "peer, curiosity, usecase, local",
            }),
        }
    }
}

impl fmt::Display for Angle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A generated draft pair, labelled for review.
#[derive(Debug, Clone, Serialize)]
pub struct Draft {
    pub draft_id: i64,
    pub company_id: i64,
    pub contact_id: Option<i64>,
    pub company_name: String,
    pub contact_name: Option<String>,
    pub angle: Angle,
    pub invite_note: String,
    pub inmail_message: String,
    pub label: &'static str,
}

/// Operator-side values that appear in drafts.
#[derive(Debug, Clone)]
pub struct Sender {
    pub name: String,
    pub home_city: String,
    pub home_state: String,
}

impl Sender {
    pub fn from_config(config: &Config) -> Self {
        Self {
            name: config.outreach.sender_name.clone(),
            home_city: config.location.city.clone(),
            home_state: config.location.state.clone(),
        }
    }
}

fn template_vars(
    company: &Company,
    contact: Option<&Contact>,
    sender: &Sender,
) -> HashMap<&'static str, String> {
    let or = |value: &str, fallback: &str| {
        if value.trim().is_empty() {
            fallback.to_string()
        } else {
            value.trim().to_string()
        }
    };

    let mut vars = HashMap::new();
    vars.insert(
        "first_name",
        contact.map_or_else(|| "there".to_string(), |c| or(&c.first_name, "there")),
    );
    vars.insert("company_name", or(&company.name, "your company"));
    vars.insert("industry", or(&company.industry, "technology"));
    vars.insert("city", or(&company.hq_city, &sender.home_city));
    vars.insert("state", or(&company.hq_state, &sender.home_state));
    vars.insert("home_city", sender.home_city.clone());
    vars.insert("sender_name", sender.name.clone());
    vars.insert("personalization", templates::personalization(company));
    vars.insert("hook", templates::curiosity_hook(&company.industry).to_string());
    vars.insert(
        "use_case_area",
        templates::use_case_area(&company.industry).to_string(),
    );
    vars.insert(
        "ps_line",
        templates::ps_line(company.id.unwrap_or_default()).to_string(),
    );
    vars
}

fn char_len(s: &str) -> usize {
    s.chars().count()
}

fn byte_offset(s: &str, chars: usize) -> usize {
    s.char_indices().nth(chars).map_or(s.len(), |(i, _)| i)
}

/// Shorten `message` to at most `max_chars` characters, preferring to cut
/// after a sentence, then at a word boundary (adding `...`).
pub fn truncate_message(message: &str, max_chars: usize) -> String {
    if char_len(message) <= max_chars {
        return message.to_string();
    }

    let head = &message[..byte_offset(message, max_chars.saturating_sub(3))];

    let sentence_end = ['.', '!', '?']
        .iter()
        .filter_map(|p| {
            head.rmatch_indices(*p)
                .find(|(i, _)| head[i + 1..].starts_with(char::is_whitespace))
                .map(|(i, _)| i)
        })
        .max();
    if let Some(end) = sentence_end {
        if char_len(&head[..end]) as f64 > max_chars as f64 * 0.7 {
            return head[..=end].to_string();
        }
    }

    if let Some(space) = head.rfind(' ') {
        if char_len(&head[..space]) as f64 > max_chars as f64 * 0.8 {
            return format!("{}...", head[..space].trim_end());
        }
    }

    format!("{}...", head)
}

pub fn generate_invite_note(
    company: &Company,
    contact: Option<&Contact>,
    sender: &Sender,
    angle: Angle,
) -> String {
    let vars = template_vars(company, contact, sender);
    let template = lookup(templates::INVITE_TEMPLATES, angle.as_str()).unwrap_or_default();
    truncate_message(&render(template, &vars), MAX_INVITE_CHARS)
}

/// Render an InMail whose length lands in the allowed range.
///
/// Short renders get context paragraphs inserted before the sign-off; long
/// renders have the body cut at a sentence so the sign-off survives.
pub fn generate_inmail(
    company: &Company,
    contact: Option<&Contact>,
    sender: &Sender,
    angle: Angle,
) -> String {
    let vars = template_vars(company, contact, sender);
    let mut body = render(
        lookup(templates::INMAIL_BODIES, angle.as_str()).unwrap_or_default(),
        &vars,
    );
    let closing = render(
        lookup(templates::INMAIL_CLOSINGS, angle.as_str()).unwrap_or_default(),
        &vars,
    );
    let assemble = |body: &str| format!("{}\n\n{}", body.trim_end(), closing);

    let mut padding = templates::PADDING_PARAGRAPHS.iter().cycle();
    while char_len(&assemble(&body)) < MIN_INMAIL_CHARS {
        let Some(paragraph) = padding.next() else { break };
        body.push_str("\n\n");
        body.push_str(&render(paragraph, &vars));
    }

    let closing_len = char_len(&closing) + 2;
    if char_len(&assemble(&body)) > MAX_INMAIL_CHARS && closing_len < MIN_INMAIL_CHARS / 2 {
        body = truncate_message(&body, MAX_INMAIL_CHARS - closing_len);
    }

    let mut message = assemble(&body);
    if char_len(&message) > MAX_INMAIL_CHARS {
        message = truncate_message(&message, MAX_INMAIL_CHARS);
    }
    message
}

/// Generate, check, and store drafts for a company.
///
/// Suppressed when the contact is do-not-contact or the company's domain is
/// on the do-not-contact list.
pub async fn generate_draft(
    pool: &SqlitePool,
    sender: &Sender,
    company_id: i64,
    contact_id: Option<i64>,
    angle: Angle,
) -> Result<Draft> {
    let company = repo::get_company(pool, company_id).await?;

    let contact = match contact_id {
        Some(id) => {
            let contact = repo::get_contact(pool, id).await?;
            if contact.company_id != company_id {
                return Err(OutreachError::ContactCompanyMismatch {
                    contact_id: id,
                    expected: company_id,
                    actual: contact.company_id,
                }
                .into());
            }
            repo::ensure_contactable(pool, &contact).await?;
            Some(contact)
        }
        None => {
            if repo::is_domain_suppressed(pool, &company.domain).await? {
                return Err(OutreachError::DomainSuppressed {
                    domain: company.domain.clone(),
                }
                .into());
            }
            None
        }
    };

    let invite_note = generate_invite_note(&company, contact.as_ref(), sender, angle);
    let inmail_message = generate_inmail(&company, contact.as_ref(), sender, angle);

    let draft_id = repo::save_draft(
        pool,
        company_id,
        contact_id,
        angle.as_str(),
        &invite_note,
        &inmail_message,
    )
    .await?;
    tracing::info!(draft_id, company_id, angle = %angle, "saved draft for review");

    Ok(Draft {
        draft_id,
        company_id,
        contact_id,
        company_name: company.name,
        contact_name: contact.map(|c| c.full_name()),
        angle,
        invite_note,
        inmail_message,
        label: DRAFT_LABEL,
    })
}

pub async fn run_draft(
    config: &Config,
    company_id: i64,
    contact_id: Option<i64>,
    angle: &str,
) -> Result<()> {
    let angle: Angle = angle.parse()?;
    let pool = db::connect(config).await?;
    let draft = generate_draft(
        &pool,
        &Sender::from_config(config),
        company_id,
        contact_id,
        angle,
    )
    .await
    .with_context(|| format!("Failed to draft messages for company {}", company_id))?;

    println!("{}", draft.label);
    println!();
    match &draft.contact_name {
        Some(name) => println!("Company: {}  Contact: {}", draft.company_name, name),
        None => println!("Company: {}", draft.company_name),
    }
    println!("Angle:   {}", draft.angle);
    println!();
    println!(
        "── Invite note ({} chars) ──",
        char_len(&draft.invite_note)
    );
    println!("{}", draft.invite_note);
    println!();
    println!(
        "── InMail ({} chars) ──",
        char_len(&draft.inmail_message)
    );
    println!("{}", draft.inmail_message);
    println!();
    println!("saved as draft {} (unreviewed)", draft.draft_id);

    pool.close().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;
    use crate::models::{HiringSignal, NewContact};

    const ANGLES: [Angle; 4] = [Angle::Peer, Angle::Curiosity, Angle::Usecase, Angle::Local];

    fn sender() -> Sender {
        Sender {
            name: "Sam".into(),
            home_city: "Raleigh".into(),
            home_state: "NC".into(),
        }
    }

    fn company() -> Company {
        Company {
            id: Some(3),
            name: "Acme Analytics".into(),
            domain: "acme.io".into(),
            hq_city: "Durham".into(),
            hq_state: "NC".into(),
            industry: "Data Analytics".into(),
            hiring_signal: HiringSignal::Yes,
            ..Default::default()
        }
    }

    #[test]
    fn test_angle_parsing() {
        assert_eq!("use-case".parse::<Angle>().unwrap(), Angle::Usecase);
        assert_eq!("LOCAL".parse::<Angle>().unwrap(), Angle::Local);
        assert!("pushy".parse::<Angle>().is_err());
    }

    #[test]
    fn test_lengths_hold_for_every_angle() {
        let long = Company {
            name: "The Extraordinarily Long Named Research Triangle Consolidated Holdings Group"
                .repeat(3),
            industry: "Enterprise Infrastructure Software And Services".repeat(2),
            recent_activity: "Announced expansion".into(),
            ..company()
        };
        let bare = Company {
            id: None,
            name: "X".into(),
            ..Default::default()
        };

        for c in [company(), long, bare] {
            for angle in ANGLES {
                let invite = generate_invite_note(&c, None, &sender(), angle);
                let inmail = generate_inmail(&c, None, &sender(), angle);
                assert!(char_len(&invite) <= MAX_INVITE_CHARS, "{}: {}", angle, invite);
                let n = char_len(&inmail);
                assert!(
                    (MIN_INMAIL_CHARS..=MAX_INMAIL_CHARS).contains(&n),
                    "{} inmail was {} chars:\n{}",
                    angle,
                    n,
                    inmail
                );
                assert!(!inmail.contains("{"), "unrendered token in {}", angle);
            }
        }
    }

    #[test]
    fn test_truncate_prefers_sentence_boundary() {
        let text = format!("{}. Second sentence goes here and keeps going", "a".repeat(80));
        let out = truncate_message(&text, 100);
        assert!(out.ends_with('.'), "{}", out);
        assert!(char_len(&out) <= 100);

        let words = "word ".repeat(40);
        let out = truncate_message(&words, 50);
        assert!(out.ends_with("..."));
        assert!(char_len(&out) <= 50);

        assert_eq!(truncate_message("short", 50), "short");
        let multibyte = "é".repeat(400);
        assert_eq!(char_len(&truncate_message(&multibyte, 300)), 300);
    }

    #[test]
    fn test_ps_line_is_stable_per_company() {
        let a = generate_inmail(&company(), None, &sender(), Angle::Peer);
        let b = generate_inmail(&company(), None, &sender(), Angle::Peer);
        assert_eq!(a, b);
        assert!(a.contains(templates::ps_line(3)));
    }

    #[tokio::test]
    async fn test_generate_draft_saves_and_respects_dnc() {
        let pool = memory_pool().await.unwrap();
        let company_id = repo::upsert_company(&pool, &company()).await.unwrap().id();
        let contact_id = repo::add_contact(
            &pool,
            &NewContact {
                company_id,
                first_name: "Jordan".into(),
                last_name: "Lee".into(),
                title: "Founder".into(),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let draft = generate_draft(&pool, &sender(), company_id, Some(contact_id), Angle::Peer)
            .await
            .unwrap();
        assert_eq!(draft.label, DRAFT_LABEL);
        assert!(draft.invite_note.starts_with("Hi Jordan"));
        assert_eq!(draft.contact_name.as_deref(), Some("Jordan Lee"));
        assert_eq!(repo::list_drafts(&pool, None).await.unwrap().len(), 1);

        let err = generate_draft(&pool, &sender(), company_id + 1, Some(contact_id), Angle::Peer)
            .await
            .unwrap_err();
        assert!(err.downcast_ref::<OutreachError>().is_some(), "{:#}", err);

        repo::add_contact_dnc(&pool, contact_id, "opted out").await.unwrap();
        let err = generate_draft(&pool, &sender(), company_id, Some(contact_id), Angle::Peer)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<OutreachError>(),
            Some(OutreachError::DoNotContact { .. })
        ));

        repo::add_domain_dnc(&pool, "acme.io", "whole company").await.unwrap();
        let err = generate_draft(&pool, &sender(), company_id, None, Angle::Local)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<OutreachError>(),
            Some(OutreachError::DomainSuppressed { .. })
        ));
        assert_eq!(repo::list_drafts(&pool, None).await.unwrap().len(), 1);
    }
}
