use anyhow::{Context, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rust_i18n::t;
use std::process::ExitCode;

use dalbit::config::Config;
use dalbit::ledger::{open_sqlite_ledger, SharedTopicLedger};
use dalbit::topic::{TopicAllocator, TopicSpace};
use dalbit::utils::truncate_text;

fn open_ledger(config: &Config) -> Result<SharedTopicLedger> {
    open_sqlite_ledger(&config.database.sqlite_path).with_context(|| {
        format!(
            "Failed to open ledger at {}",
            config.database.sqlite_path.display()
        )
    })
}

pub fn stats(config: &Config) -> Result<ExitCode> {
    let ledger = open_ledger(config)?;
    let stats = ledger.stats()?;

    // Pool status never draws, so the seed is irrelevant
    let allocator = TopicAllocator::new(TopicSpace::default(), ChaCha8Rng::seed_from_u64(0));
    let pool = allocator.pool_status(ledger.as_ref())?;

    println!("{}", t!("cli.stats.total", total = stats.total));
    for (status, count) in &stats.by_status {
        println!("  {status:<10} {count}");
    }
    println!("{}", t!("cli.stats.success_rate", rate = format!("{:.2}", stats.success_rate)));
    println!(
        "{} ({:.2}%)",
        t!(
            "cli.stats.pool",
            used = pool.used,
            total = pool.total,
            remaining = pool.remaining
        ),
        pool.utilization_percent
    );

    Ok(ExitCode::SUCCESS)
}

pub fn history(config: &Config, limit: usize) -> Result<ExitCode> {
    let ledger = open_ledger(config)?;
    let entries = ledger.recent(limit)?;

    if entries.is_empty() {
        println!("{}", t!("cli.history.empty"));
        return Ok(ExitCode::SUCCESS);
    }

    for entry in entries {
        let record = &entry.record;
        println!(
            "{}  {:<9}  {}  {}",
            entry.created_at.format("%Y-%m-%d %H:%M"),
            record.status,
            record.key,
            truncate_text(&record.title, 40)
        );
        if let Some(url) = &record.post_url {
            println!("    {url}");
        }
        if let Some(error) = &record.error {
            println!("    ! {}", truncate_text(error, 100));
        }
    }

    Ok(ExitCode::SUCCESS)
}
