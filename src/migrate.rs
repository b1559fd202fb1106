use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

const TABLES: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS companies (
        company_id INTEGER PRIMARY KEY AUTOINCREMENT,
        company_name TEXT NOT NULL,
        domain TEXT UNIQUE,
        hq_city TEXT NOT NULL DEFAULT '',
        hq_state TEXT NOT NULL DEFAULT '',
        size_band TEXT NOT NULL DEFAULT '',
        industry TEXT NOT NULL DEFAULT '',
        keywords TEXT NOT NULL DEFAULT '',
        sources TEXT NOT NULL DEFAULT '',
        confidence REAL NOT NULL DEFAULT 0.5,
        hiring_signal TEXT NOT NULL DEFAULT 'unknown',
        recent_activity TEXT NOT NULL DEFAULT '',
        tech_stack_hint TEXT NOT NULL DEFAULT '',
        relevance_score REAL NOT NULL DEFAULT 0.0,
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS contacts (
        contact_id INTEGER PRIMARY KEY AUTOINCREMENT,
        company_id INTEGER NOT NULL,
        first_name TEXT NOT NULL,
        last_name TEXT NOT NULL,
        title TEXT NOT NULL DEFAULT '',
        profile_url TEXT,
        email TEXT,
        notes TEXT,
        priority INTEGER NOT NULL DEFAULT 10,
        status TEXT NOT NULL DEFAULT 'new',
        created_at INTEGER NOT NULL,
        updated_at INTEGER NOT NULL,
        FOREIGN KEY (company_id) REFERENCES companies(company_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS title_priorities (
        priority_id INTEGER PRIMARY KEY AUTOINCREMENT,
        title_pattern TEXT NOT NULL UNIQUE,
        priority_rank INTEGER NOT NULL,
        notes TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS sequences (
        sequence_id INTEGER PRIMARY KEY AUTOINCREMENT,
        sequence_name TEXT NOT NULL,
        description TEXT,
        created_at INTEGER NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS sequence_steps (
        step_id INTEGER PRIMARY KEY AUTOINCREMENT,
        sequence_id INTEGER NOT NULL,
        step_number INTEGER NOT NULL,
        step_type TEXT NOT NULL,
        days_after_previous INTEGER NOT NULL DEFAULT 0,
        template_name TEXT,
        UNIQUE(sequence_id, step_number),
        FOREIGN KEY (sequence_id) REFERENCES sequences(sequence_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS touchpoints (
        touchpoint_id INTEGER PRIMARY KEY AUTOINCREMENT,
        contact_id INTEGER NOT NULL,
        sequence_id INTEGER,
        step_number INTEGER,
        event_type TEXT NOT NULL,
        event_date INTEGER NOT NULL,
        outcome TEXT,
        notes TEXT,
        FOREIGN KEY (contact_id) REFERENCES contacts(contact_id),
        FOREIGN KEY (sequence_id) REFERENCES sequences(sequence_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS do_not_contact (
        dnc_id INTEGER PRIMARY KEY AUTOINCREMENT,
        contact_id INTEGER,
        domain TEXT,
        reason TEXT NOT NULL DEFAULT '',
        added_at INTEGER NOT NULL,
        FOREIGN KEY (contact_id) REFERENCES contacts(contact_id)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS message_drafts (
        draft_id INTEGER PRIMARY KEY AUTOINCREMENT,
        company_id INTEGER NOT NULL,
        contact_id INTEGER,
        angle TEXT NOT NULL,
        invite_note TEXT NOT NULL,
        inmail_message TEXT NOT NULL,
        reviewed INTEGER NOT NULL DEFAULT 0,
        created_at INTEGER NOT NULL,
        FOREIGN KEY (company_id) REFERENCES companies(company_id),
        FOREIGN KEY (contact_id) REFERENCES contacts(contact_id)
    )
    "#,
];

const INDEXES: &[&str] = &[
    "CREATE INDEX IF NOT EXISTS idx_companies_hq_city ON companies(hq_city)",
    "CREATE INDEX IF NOT EXISTS idx_companies_score ON companies(relevance_score DESC)",
    "CREATE INDEX IF NOT EXISTS idx_contacts_company ON contacts(company_id)",
    "CREATE INDEX IF NOT EXISTS idx_contacts_status ON contacts(status)",
    "CREATE INDEX IF NOT EXISTS idx_touchpoints_contact ON touchpoints(contact_id)",
    "CREATE INDEX IF NOT EXISTS idx_touchpoints_event_type ON touchpoints(event_type)",
    "CREATE INDEX IF NOT EXISTS idx_dnc_contact ON do_not_contact(contact_id)",
    "CREATE INDEX IF NOT EXISTS idx_dnc_domain ON do_not_contact(domain)",
];

const TITLE_PRIORITIES: &[(&str, i64, &str)] = &[
    ("CEO", 1, "Chief Executive Officer"),
    ("CTO", 2, "Chief Technology Officer"),
    ("Founder", 3, "Founder"),
    ("Co-Founder", 3, "Co-Founder"),
    ("VP of Engineering", 4, "VP Engineering"),
    ("VP Engineering", 4, "VP Engineering"),
    ("Head of Engineering", 5, "Engineering Head"),
    ("Director of Engineering", 6, "Engineering Director"),
    ("Engineering Manager", 7, "Eng Manager"),
];

/// Id of the seeded three-step sequence.
pub const DEFAULT_SEQUENCE_ID: i64 = 1;

const DEFAULT_SEQUENCE_STEPS: &[(i64, &str, i64, &str)] = &[
    (1, "invite", 0, "initial_invite"),
    (2, "follow_up", 7, "first_followup"),
    (3, "breakup", 14, "breakup_message"),
];

pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate_pool(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Create tables, indexes, and seed rows. Safe to run repeatedly.
pub async fn migrate_pool(pool: &SqlitePool) -> Result<()> {
    for ddl in TABLES.iter().chain(INDEXES) {
        sqlx::query(*ddl).execute(pool).await?;
    }

    for &(pattern, rank, notes) in TITLE_PRIORITIES {
        sqlx::query(
            "INSERT OR IGNORE INTO title_priorities (title_pattern, priority_rank, notes) VALUES (?, ?, ?)",
        )
        .bind(pattern)
        .bind(rank)
        .bind(notes)
        .execute(pool)
        .await?;
    }

    let now = chrono::Utc::now().timestamp();
    sqlx::query(
        "INSERT OR IGNORE INTO sequences (sequence_id, sequence_name, description, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(DEFAULT_SEQUENCE_ID)
    .bind("Standard Cold Outreach")
    .bind("Default 3-step sequence: invite, follow-up, breakup")
    .bind(now)
    .execute(pool)
    .await?;

    for &(step, step_type, days, template) in DEFAULT_SEQUENCE_STEPS {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO sequence_steps (sequence_id, step_number, step_type, days_after_previous, template_name)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(DEFAULT_SEQUENCE_ID)
        .bind(step)
        .bind(step_type)
        .bind(days)
        .bind(template)
        .execute(pool)
        .await?;
    }

    tracing::debug!("schema migrations applied");
    Ok(())
}
