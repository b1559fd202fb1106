//! # Outreach Finder CLI (`outreach`)
//!
//! ## Usage
//!
//! ```bash
//! outreach --config ./config/outreach.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `outreach init` | Create the SQLite database, seed data and data dirs |
//! | `outreach sources` | List configured sources and their status |
//! | `outreach discover` | Pull, normalize, dedupe and store companies |
//! | `outreach rank` | Score companies and write the ranked shortlist |
//! | `outreach draft` | Draft an invite note and InMail for review |
//! | `outreach log <event>` | Record a touchpoint |
//! | `outreach export` | Export companies, contacts, sequences or a summary |
//! | `outreach status` | Show counts and follow-ups due |
//! | `outreach contact ...` | Add, list, suppress contacts or change status |
//! | `outreach sequence ...` | List sequences or show a contact's progress |

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use outreach_finder::discover::{self, DiscoverOptions};
use outreach_finder::models::NewContact;
use outreach_finder::tracker::{self, LogArgs};
use outreach_finder::{config, draft, export, migrate, rank, sources, status};

/// Outreach Finder: discover, rank, draft and track sales outreach.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/outreach.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "outreach",
    about = "Outreach Finder: a local-first lead discovery and outreach tracker",
    version,
    long_about = "Outreach Finder pulls companies from approved CSV and JSON sources, \
    deduplicates and ranks them against your ideal customer profile, drafts messages \
    for human review, and tracks contacts and touchpoints in SQLite. It never sends \
    anything on your behalf."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/outreach.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema and data directories.
    ///
    /// Idempotent: running it again keeps existing data.
    Init,

    /// List configured sources and whether they are ready.
    Sources,

    /// Pull companies from sources, normalize, dedupe and store them.
    Discover {
        /// Only ask sources for records updated in the last N days.
        #[arg(long)]
        since: Option<i64>,

        /// Only scan this source (repeatable).
        #[arg(long = "source")]
        sources: Vec<String>,

        /// Show counts without writing anything.
        #[arg(long)]
        dry_run: bool,
    },

    /// Score every company and write the ranked shortlist CSV.
    Rank {
        /// Number of companies in the shortlist.
        #[arg(long, default_value_t = 50)]
        top: usize,
    },

    /// Draft an invite note and InMail for human review.
    Draft {
        #[arg(long)]
        company_id: i64,

        #[arg(long)]
        contact_id: Option<i64>,

        /// Message angle: peer, curiosity, usecase, local.
        #[arg(long, default_value = "peer")]
        angle: String,
    },

    /// Record an outreach touchpoint.
    Log {
        /// Event: sent, seen, replied, followup.
        event: String,

        #[arg(long)]
        contact_id: i64,

        #[arg(long)]
        sequence_id: Option<i64>,

        /// Sequence step number.
        #[arg(long)]
        step: Option<i64>,

        #[arg(long)]
        outcome: Option<String>,

        #[arg(long)]
        notes: Option<String>,

        /// Event date (YYYY-MM-DD); defaults to now.
        #[arg(long)]
        date: Option<String>,
    },

    /// Export data to CSV.
    Export {
        /// companies, contacts, sequences, summary.
        #[arg(long = "type", default_value = "companies")]
        export_type: String,

        /// csv, notion, sheets.
        #[arg(long, default_value = "csv")]
        format: String,

        /// Output file; defaults to <data_dir>/out/exports/<type>_export_<timestamp>.csv.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Show pipeline counts and follow-ups due.
    Status,

    /// Manage contacts.
    Contact {
        #[command(subcommand)]
        action: ContactAction,
    },

    /// Inspect outreach sequences.
    Sequence {
        #[command(subcommand)]
        action: SequenceAction,
    },
}

#[derive(Subcommand)]
enum ContactAction {
    /// Add a contact to a company.
    Add {
        #[arg(long)]
        company_id: i64,

        #[arg(long, default_value = "")]
        first_name: String,

        #[arg(long, default_value = "")]
        last_name: String,

        #[arg(long, default_value = "")]
        title: String,

        #[arg(long)]
        profile_url: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        notes: Option<String>,

        /// Override the priority derived from the title (1 = highest).
        #[arg(long)]
        priority: Option<i64>,
    },

    /// List contacts, best priority first.
    List {
        #[arg(long)]
        company_id: Option<i64>,

        /// new, contacted, replied, converted, do_not_contact.
        #[arg(long)]
        status: Option<String>,
    },

    /// Put a contact or a domain on the do-not-contact list.
    Dnc {
        #[arg(long, conflicts_with = "domain")]
        contact_id: Option<i64>,

        #[arg(long)]
        domain: Option<String>,

        #[arg(long, default_value = "requested")]
        reason: String,
    },

    /// Change a contact's status.
    SetStatus {
        #[arg(long)]
        contact_id: i64,

        status: String,
    },
}

#[derive(Subcommand)]
enum SequenceAction {
    /// List sequences and their steps.
    List,

    /// Show a contact's progress through a sequence.
    Progress {
        #[arg(long)]
        contact_id: i64,

        #[arg(long, default_value_t = migrate::DEFAULT_SEQUENCE_ID)]
        sequence_id: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            tracker::run_init(&cfg).await?;
        }
        Commands::Sources => {
            sources::list_sources(&cfg)?;
        }
        Commands::Discover {
            since,
            sources,
            dry_run,
        } => {
            let options = DiscoverOptions {
                since_days: since,
                sources,
                dry_run,
            };
            discover::run_discover(&cfg, &options).await?;
        }
        Commands::Rank { top } => {
            rank::run_rank(&cfg, top).await?;
        }
        Commands::Draft {
            company_id,
            contact_id,
            angle,
        } => {
            draft::run_draft(&cfg, company_id, contact_id, &angle).await?;
        }
        Commands::Log {
            event,
            contact_id,
            sequence_id,
            step,
            outcome,
            notes,
            date,
        } => {
            let args = LogArgs {
                event,
                contact_id,
                sequence_id,
                step,
                outcome,
                notes,
                date,
            };
            tracker::run_log(&cfg, &args).await?;
        }
        Commands::Export {
            export_type,
            format,
            output,
        } => {
            export::run_export(&cfg, &export_type, &format, output.as_deref()).await?;
        }
        Commands::Status => {
            status::run_status(&cfg).await?;
        }
        Commands::Contact { action } => match action {
            ContactAction::Add {
                company_id,
                first_name,
                last_name,
                title,
                profile_url,
                email,
                notes,
                priority,
            } => {
                let contact = NewContact {
                    company_id,
                    first_name,
                    last_name,
                    title,
                    profile_url,
                    email,
                    notes,
                    priority,
                };
                tracker::run_contact_add(&cfg, &contact).await?;
            }
            ContactAction::List { company_id, status } => {
                tracker::run_contact_list(&cfg, company_id, status.as_deref()).await?;
            }
            ContactAction::Dnc {
                contact_id,
                domain,
                reason,
            } => {
                tracker::run_dnc(&cfg, contact_id, domain.as_deref(), &reason).await?;
            }
            ContactAction::SetStatus { contact_id, status } => {
                tracker::run_set_status(&cfg, contact_id, &status).await?;
            }
        },
        Commands::Sequence { action } => match action {
            SequenceAction::List => {
                tracker::run_sequence_list(&cfg).await?;
            }
            SequenceAction::Progress {
                contact_id,
                sequence_id,
            } => {
                tracker::run_sequence_progress(&cfg, contact_id, sequence_id).await?;
            }
        },
    }

    Ok(())
}
