//! `outreach rank`: score every company, persist the scores and write the
//! ranked shortlist.

use anyhow::{Context, Result};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::db;
use crate::models::Company;
use crate::repo;
use crate::score::{CompanyScorer, ScoreBreakdown};

pub const RANKED_FILE: &str = "companies_ranked.csv";

#[derive(Debug, Clone)]
pub struct RankedCompany {
    pub rank: usize,
    pub company: Company,
    pub breakdown: ScoreBreakdown,
}

/// Score and persist every company; returns all of them best first.
pub async fn rank_companies(pool: &SqlitePool, scorer: &CompanyScorer) -> Result<Vec<RankedCompany>> {
    let companies = repo::list_companies(pool, false, None).await?;

    let mut scored = Vec::with_capacity(companies.len());
    for mut company in companies {
        let (score, breakdown) = scorer.score(&company);
        if let Some(id) = company.id {
            repo::update_company_score(pool, id, score).await?;
        }
        company.relevance_score = score;
        scored.push((company, breakdown));
    }

    scored.sort_by(|(a, _), (b, _)| {
        b.relevance_score
            .total_cmp(&a.relevance_score)
            .then(a.id.cmp(&b.id))
    });

    Ok(scored
        .into_iter()
        .enumerate()
        .map(|(i, (company, breakdown))| RankedCompany {
            rank: i + 1,
            company,
            breakdown,
        })
        .collect())
}

pub fn write_ranked_csv(path: &Path, ranked: &[RankedCompany]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    writer.write_record([
        "rank",
        "company_id",
        "company_name",
        "domain",
        "relevance_score",
        "hq_city",
        "hq_state",
        "size_band",
        "industry",
        "keywords",
        "hiring_signal",
        "recent_activity",
        "sources",
        "confidence",
    ])?;
    for r in ranked {
        let c = &r.company;
        writer.write_record([
            r.rank.to_string(),
            c.id.map(|id| id.to_string()).unwrap_or_default(),
            c.name.clone(),
            c.domain.clone(),
            format!("{:.3}", c.relevance_score),
            c.hq_city.clone(),
            c.hq_state.clone(),
            c.size_band.clone(),
            c.industry.clone(),
            c.keywords_joined(),
            c.hiring_signal.to_string(),
            c.recent_activity.clone(),
            c.sources_joined(),
            format!("{:.2}", c.confidence),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

pub async fn run_rank(config: &Config, top: usize) -> Result<()> {
    let pool = db::connect(config).await?;
    let ranked = rank_companies(&pool, &CompanyScorer::from_config(config)).await?;
    pool.close().await;

    if ranked.is_empty() {
        println!("No companies found. Run `outreach discover` first.");
        return Ok(());
    }

    let path: PathBuf = config.paths.out_dir().join(RANKED_FILE);
    let shortlist = &ranked[..top.min(ranked.len())];
    write_ranked_csv(&path, shortlist)?;

    println!("rank");
    println!("  scored: {} companies", ranked.len());
    println!(
        "  excluded: {}",
        ranked.iter().filter(|r| r.breakdown.excluded).count()
    );
    println!("  wrote top {} to {}", shortlist.len(), path.display());
    println!();
    println!("  {:>4}  {:>6}  {:<32} {}", "RANK", "SCORE", "COMPANY", "LOCATION");
    for r in ranked.iter().take(5) {
        println!(
            "  {:>4}  {:>6.3}  {:<32} {}",
            r.rank,
            r.company.relevance_score,
            r.company.name,
            r.company.location()
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{IcpConfig, RankingConfig};
    use crate::db::memory_pool;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_rank_persists_scores_and_orders_ties_by_id() {
        let pool = memory_pool().await.unwrap();
        for (name, domain, industry) in [
            ("Tie One", "one.io", ""),
            ("Best", "best.io", "Software"),
            ("Tie Two", "two.io", ""),
        ] {
            let c = Company {
                name: name.into(),
                domain: domain.into(),
                industry: industry.into(),
                sources: vec!["t".into()],
                confidence: 0.5,
                ..Default::default()
            };
            repo::upsert_company(&pool, &c).await.unwrap();
        }

        let icp = IcpConfig {
            industries: vec!["Software".into()],
            ..Default::default()
        };
        let scorer = CompanyScorer::new(&icp, &RankingConfig::default());
        let ranked = rank_companies(&pool, &scorer).await.unwrap();

        let names: Vec<_> = ranked.iter().map(|r| r.company.name.as_str()).collect();
        assert_eq!(names, vec!["Best", "Tie One", "Tie Two"]);
        assert_eq!(ranked[0].rank, 1);

        let stored = repo::list_companies(&pool, true, None).await.unwrap();
        assert_eq!(stored[0].name, "Best");
        assert_eq!(stored[0].relevance_score, ranked[0].company.relevance_score);
        assert!(stored.iter().all(|c| (0.0..=1.0).contains(&c.relevance_score)));

        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("out").join(RANKED_FILE);
        write_ranked_csv(&path, &ranked[..2]).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(text.lines().nth(1).unwrap().starts_with("1,2,Best,best.io,"));
    }
}
