//! Core data models used throughout the outreach finder.
//!
//! Raw connector output, the canonical company record that flows through
//! normalization, deduplication and ranking, and the tracker rows
//! (contacts, touchpoints, sequences) stored in SQLite.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::OutreachError;

/// Raw record produced by a connector before normalization.
///
/// Field keys are the source's own column names; no cleanup is applied.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RawRecord {
    pub source: String,
    pub fields: BTreeMap<String, String>,
}

impl RawRecord {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.fields.insert(key.to_string(), value.to_string());
        self
    }
}

/// Tri-state hiring signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HiringSignal {
    Yes,
    No,
    #[default]
    Unknown,
}

impl HiringSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            HiringSignal::Yes => "yes",
            HiringSignal::No => "no",
            HiringSignal::Unknown => "unknown",
        }
    }

    /// Lenient parse used for stored values; anything unrecognized is unknown.
    pub fn from_stored(s: &str) -> Self {
        match s {
            "yes" => HiringSignal::Yes,
            "no" => HiringSignal::No,
            _ => HiringSignal::Unknown,
        }
    }
}

impl fmt::Display for HiringSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Canonical company record.
///
/// `id` is `None` until the record has been persisted. Empty strings mean
/// "unknown" for the free-text fields.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Company {
    pub id: Option<i64>,
    pub name: String,
    pub domain: String,
    pub hq_city: String,
    pub hq_state: String,
    pub size_band: String,
    pub industry: String,
    pub keywords: Vec<String>,
    pub sources: Vec<String>,
    pub confidence: f64,
    pub hiring_signal: HiringSignal,
    pub recent_activity: String,
    pub tech_stack_hint: String,
    pub relevance_score: f64,
}

impl Company {
    pub fn keywords_joined(&self) -> String {
        self.keywords.join(",")
    }

    pub fn sources_joined(&self) -> String {
        self.sources.join(",")
    }

    pub fn location(&self) -> String {
        match (self.hq_city.is_empty(), self.hq_state.is_empty()) {
            (false, false) => format!("{}, {}", self.hq_city, self.hq_state),
            (false, true) => self.hq_city.clone(),
            (true, false) => self.hq_state.clone(),
            (true, true) => String::new(),
        }
    }
}

/// Split a stored comma-separated list, dropping empties.
pub fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(String::from)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactStatus {
    New,
    Contacted,
    Replied,
    Converted,
    DoNotContact,
}

impl ContactStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactStatus::New => "new",
            ContactStatus::Contacted => "contacted",
            ContactStatus::Replied => "replied",
            ContactStatus::Converted => "converted",
            ContactStatus::DoNotContact => "do_not_contact",
        }
    }
}

impl FromStr for ContactStatus {
    type Err = OutreachError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "new" => Ok(ContactStatus::New),
            "contacted" => Ok(ContactStatus::Contacted),
            "replied" => Ok(ContactStatus::Replied),
            "converted" => Ok(ContactStatus::Converted),
            "do_not_contact" | "dnc" => Ok(ContactStatus::DoNotContact),
            _ => Err(OutreachError::InvalidValue {
                kind: "contact status",
                value: s.to_string(),
                expected: "new, contacted, replied, converted, do_not_contact",
            }),
        }
    }
}

impl fmt::Display for ContactStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A person at a company, added manually by the operator.
#[derive(Debug, Clone, Serialize)]
pub struct Contact {
    pub id: i64,
    pub company_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub title: String,
    pub profile_url: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
    pub priority: i64,
    pub status: ContactStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Contact {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Input for [`crate::repo::add_contact`].
#[derive(Debug, Clone, Default)]
pub struct NewContact {
    pub company_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub title: String,
    pub profile_url: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
    pub priority: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Sent,
    Seen,
    Replied,
    FollowUp,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Sent => "sent",
            EventType::Seen => "seen",
            EventType::Replied => "replied",
            EventType::FollowUp => "follow_up",
        }
    }
}

impl FromStr for EventType {
    type Err = OutreachError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "sent" => Ok(EventType::Sent),
            "seen" => Ok(EventType::Seen),
            "replied" => Ok(EventType::Replied),
            "follow_up" | "followup" => Ok(EventType::FollowUp),
            _ => Err(OutreachError::InvalidValue {
                kind: "event type",
                value: s.to_string(),
                expected: "sent, seen, replied, followup",
            }),
        }
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One logged outreach interaction. Append-only.
#[derive(Debug, Clone, Serialize)]
pub struct Touchpoint {
    pub id: i64,
    pub contact_id: i64,
    pub sequence_id: Option<i64>,
    pub step_number: Option<i64>,
    pub event_type: EventType,
    pub event_date: i64,
    pub outcome: Option<String>,
    pub notes: Option<String>,
}

/// Input for [`crate::repo::log_touchpoint`].
#[derive(Debug, Clone)]
pub struct NewTouchpoint {
    pub contact_id: i64,
    pub event_type: EventType,
    pub sequence_id: Option<i64>,
    pub step_number: Option<i64>,
    pub outcome: Option<String>,
    pub notes: Option<String>,
    /// Unix seconds; `None` means now.
    pub event_date: Option<i64>,
}

impl NewTouchpoint {
    pub fn new(contact_id: i64, event_type: EventType) -> Self {
        Self {
            contact_id,
            event_type,
            sequence_id: None,
            step_number: None,
            outcome: None,
            notes: None,
            event_date: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    Invite,
    FollowUp,
    Breakup,
}

impl StepType {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepType::Invite => "invite",
            StepType::FollowUp => "follow_up",
            StepType::Breakup => "breakup",
        }
    }
}

impl FromStr for StepType {
    type Err = OutreachError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "invite" => Ok(StepType::Invite),
            "follow_up" | "followup" => Ok(StepType::FollowUp),
            "breakup" => Ok(StepType::Breakup),
            _ => Err(OutreachError::InvalidValue {
                kind: "step type",
                value: s.to_string(),
                expected: "invite, follow_up, breakup",
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SequenceStep {
    pub step_number: i64,
    pub step_type: StepType,
    pub days_after_previous: i64,
    pub template_name: Option<String>,
}

/// A multi-step outreach campaign template.
#[derive(Debug, Clone, Serialize)]
pub struct Sequence {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub steps: Vec<SequenceStep>,
}

/// A generated draft as stored for review.
#[derive(Debug, Clone, Serialize)]
pub struct StoredDraft {
    pub id: i64,
    pub company_id: i64,
    pub contact_id: Option<i64>,
    pub angle: String,
    pub invite_note: String,
    pub inmail_message: String,
    pub reviewed: bool,
    pub created_at: i64,
}

/// Headline counters shown by `outreach status`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Stats {
    pub companies: i64,
    pub contacts: i64,
    pub sent: i64,
    pub replied: i64,
    pub pending_followups: i64,
    pub do_not_contact: i64,
    pub drafts: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_accepts_followup_spellings() {
        for s in ["followup", "follow_up", "follow-up", "FOLLOWUP"] {
            assert_eq!(s.parse::<EventType>().unwrap(), EventType::FollowUp);
        }
        assert!("called".parse::<EventType>().is_err());
    }

    #[test]
    fn test_contact_status_round_trips_dnc() {
        assert_eq!(
            "dnc".parse::<ContactStatus>().unwrap(),
            ContactStatus::DoNotContact
        );
        assert_eq!(ContactStatus::DoNotContact.as_str(), "do_not_contact");
        let err = "lost".parse::<ContactStatus>().unwrap_err();
        assert!(err.to_string().contains("contact status"));
    }

    #[test]
    fn test_split_list_drops_empty() {
        assert_eq!(split_list("a, b,,c "), vec!["a", "b", "c"]);
        assert!(split_list("").is_empty());
    }

    #[test]
    fn test_location_formatting() {
        let mut c = Company {
            hq_city: "Raleigh".into(),
            hq_state: "NC".into(),
            ..Default::default()
        };
        assert_eq!(c.location(), "Raleigh, NC");
        c.hq_state.clear();
        assert_eq!(c.location(), "Raleigh");
    }
}
