//! Domain errors that callers may want to match on.
//!
//! Command handlers work in `anyhow::Result`; these variants surface the
//! outreach rules (do-not-contact, missing rows, compliance) as typed errors
//! so tests and library users can tell them apart.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutreachError {
    #[error("company not found: {0}")]
    CompanyNotFound(i64),

    #[error("contact not found: {0}")]
    ContactNotFound(i64),

    #[error("contact {contact_id} is on the do-not-contact list")]
    DoNotContact { contact_id: i64 },

    #[error("domain {domain} is on the do-not-contact list")]
    DomainSuppressed { domain: String },

    #[error("contact {contact_id} belongs to company {actual}, not {expected}")]
    ContactCompanyMismatch {
        contact_id: i64,
        expected: i64,
        actual: i64,
    },

    #[error("sequence {sequence_id} has no step {step}")]
    UnknownSequenceStep { sequence_id: i64, step: i64 },

    #[error("sequence not found: {0}")]
    SequenceNotFound(i64),

    #[error("unknown {kind}: '{value}'. Expected one of: {expected}")]
    InvalidValue {
        kind: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("contact {contact_id} is do-not-contact; status cannot change to {requested}")]
    StatusLocked { contact_id: i64, requested: String },

    #[error("action '{action}' is blocked by compliance policy; this tool is assistive-only")]
    BlockedAction { action: String },

    #[error("compliance check failed: {0}")]
    Compliance(String),
}
