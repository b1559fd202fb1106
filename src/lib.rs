//! # Outreach Finder
//!
//! A local-first outreach finder and tracker for one operator.
//!
//! Outreach Finder discovers companies from approved sources (local CSV
//! directories and JSON APIs), normalizes and deduplicates them, ranks them
//! against an ideal customer profile, drafts connection notes and InMails
//! for human review, and tracks contacts and touchpoints in SQLite.
//!
//! It never sends, connects or scrapes on the operator's behalf; see
//! [`compliance`].
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐   ┌──────────────────────┐   ┌──────────┐
//! │ Connectors  │──▶│ Normalize → Dedupe   │──▶│  SQLite   │
//! │  CSV/HTTP   │   │                      │   │ companies │
//! └─────────────┘   └──────────────────────┘   └────┬─────┘
//!                                                   │
//!             ┌───────────────┬─────────────┬───────┤
//!             ▼               ▼             ▼       ▼
//!        ┌────────┐     ┌─────────┐   ┌─────────┐ ┌────────┐
//!        │  Rank  │     │  Draft  │   │ Tracker │ │ Export │
//!        └────────┘     └─────────┘   └─────────┘ └────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! outreach init                         # create database and data dirs
//! outreach discover                     # pull, normalize, dedupe, store
//! outreach rank --top 50                # score and shortlist
//! outreach contact add --company-id 3 --first-name Ana --title CEO
//! outreach draft --company-id 3 --contact-id 1 --angle peer
//! outreach log sent --contact-id 1 --step 1
//! outreach status
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`error`] | Typed domain errors |
//! | [`models`] | Core data types |
//! | [`traits`] | Connector trait and registry |
//! | [`connector_csv`] | CSV directory source |
//! | [`connector_http`] | JSON API source |
//! | [`normalize`] | Field aliasing and value cleanup |
//! | [`dedupe`] | Duplicate detection and merging |
//! | [`score`] | ICP scoring |
//! | [`discover`] | Discovery pipeline |
//! | [`rank`] | Ranking and shortlist CSV |
//! | [`templates`] | Message templates |
//! | [`draft`] | Invite and InMail drafting |
//! | [`repo`] | SQLite repository |
//! | [`tracker`] | Contact, touchpoint and sequence commands |
//! | [`export`] | CSV exports |
//! | [`sources`] | Configured source listing and health |
//! | [`status`] | Counts and follow-ups due |
//! | [`compliance`] | Assistive-only guardrails |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod compliance;
pub mod config;
pub mod connector_csv;
pub mod connector_http;
pub mod db;
pub mod dedupe;
pub mod discover;
pub mod draft;
pub mod error;
pub mod export;
pub mod migrate;
pub mod models;
pub mod normalize;
pub mod rank;
pub mod repo;
pub mod score;
pub mod sources;
pub mod status;
pub mod templates;
pub mod tracker;
pub mod traits;
