//! Compliance guardrails.
//!
//! The tool is assistive only: it never sends, connects, or scrapes on the
//! operator's behalf. The policy lives in code. A `[compliance]` config
//! section may restate it, but any value that would relax it makes config
//! loading fail.

use serde::Deserialize;

use crate::error::OutreachError;

/// Hard upper bound for connection invite notes.
pub const MAX_INVITE_CHARS: usize = 300;
/// InMail drafts must land within this character range.
pub const MIN_INMAIL_CHARS: usize = 700;
pub const MAX_INMAIL_CHARS: usize = 1200;

/// Label attached to every generated draft.
pub const DRAFT_LABEL: &str = "DRAFT – HUMAN REVIEW REQUIRED";

const BLOCKED_ACTIONS: &[&str] = &[
    "send_message",
    "send_connection",
    "scrape_profile",
    "browser_automation",
    "use_linkedin_cookie",
    "use_linkedin_session",
];

const BLOCKED_HOSTS: &[&str] = &["linkedin.com", "lnkd.in"];

/// Optional restatement of the policy in the config file.
#[derive(Debug, Deserialize, Clone)]
pub struct ComplianceConfig {
    #[serde(default)]
    pub auto_send: bool,
    #[serde(default)]
    pub auto_connect: bool,
    #[serde(default)]
    pub profile_scraping: bool,
    #[serde(default = "default_true")]
    pub human_review_required: bool,
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            auto_send: false,
            auto_connect: false,
            profile_scraping: false,
            human_review_required: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Fail unless the configured policy matches the built-in one.
pub fn check(cfg: &ComplianceConfig) -> Result<(), OutreachError> {
    let mut violations = Vec::new();
    if cfg.auto_send {
        violations.push("auto_send must be false");
    }
    if cfg.auto_connect {
        violations.push("auto_connect must be false");
    }
    if cfg.profile_scraping {
        violations.push("profile_scraping must be false");
    }
    if !cfg.human_review_required {
        violations.push("human_review_required must be true");
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(OutreachError::Compliance(violations.join("; ")))
    }
}

/// Reject actions the tool must never perform.
pub fn validate_action(action: &str) -> Result<(), OutreachError> {
    if BLOCKED_ACTIONS.contains(&action) {
        return Err(OutreachError::BlockedAction {
            action: action.to_string(),
        });
    }
    Ok(())
}

/// Reject data sources that point at the outreach platform itself.
pub fn check_source_url(url: &reqwest::Url) -> Result<(), OutreachError> {
    let host = url.host_str().unwrap_or_default().to_lowercase();
    let blocked = BLOCKED_HOSTS
        .iter()
        .any(|b| host == *b || host.ends_with(&format!(".{}", b)));
    if blocked {
        validate_action("scrape_profile")?;
    }
    Ok(())
}
