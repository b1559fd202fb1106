//! Pipeline health overview for `outreach status`.
//!
//! Headline counts, reply rate and the follow-up queue, so the operator
//! can see at a glance what needs attention today.

use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::repo;

pub async fn run_status(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    let stats = repo::stats(&pool, config.outreach.followup_days).await?;
    let now = chrono::Utc::now().timestamp();
    let pending = repo::pending_followups(&pool, config.outreach.followup_days, now).await?;
    let sequences = repo::list_sequences(&pool).await?;
    pool.close().await;

    let db_size = std::fs::metadata(&config.db.path)
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Outreach Finder Status");
    println!("======================");
    println!();
    println!("  Database:        {}", config.db.path.display());
    println!("  Size:            {}", format_bytes(db_size));
    println!();
    println!("  Companies:       {}", stats.companies);
    println!("  Contacts:        {}", stats.contacts);
    println!("  Drafts:          {}", stats.drafts);
    println!("  Messages sent:   {}", stats.sent);
    println!(
        "  Replies:         {} ({})",
        stats.replied,
        reply_rate(stats.replied, stats.sent)
    );
    println!("  Do-not-contact:  {}", stats.do_not_contact);
    println!("  Sequences:       {}", sequences.len());

    println!();
    if pending.is_empty() {
        println!("  No follow-ups due.");
    } else {
        println!(
            "  Follow-ups due ({} days without reply):",
            config.outreach.followup_days
        );
        println!(
            "  {:>6}  {:<24} {:<24} {}",
            "ID", "CONTACT", "COMPANY", "LAST SENT"
        );
        for p in &pending {
            println!(
                "  {:>6}  {:<24} {:<24} {}",
                p.contact.id,
                p.contact.full_name(),
                p.company_name,
                format_date(p.last_sent)
            );
        }
    }
    println!();

    Ok(())
}

fn reply_rate(replied: i64, sent: i64) -> String {
    if sent == 0 {
        return "n/a".to_string();
    }
    format!("{:.1}%", replied as f64 / sent as f64 * 100.0)
}

/// Format a byte count as a human-readable string.
fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

fn format_date(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reply_rate() {
        assert_eq!(reply_rate(0, 0), "n/a");
        assert_eq!(reply_rate(1, 3), "33.3%");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }
}
