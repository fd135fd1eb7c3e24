use anyhow::{Context, Result};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rust_i18n::t;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use dalbit::cms::{PostStatus, WordPressClient};
use dalbit::config::Config;
use dalbit::error::{DalbitErrorTrait, Error};
use dalbit::ledger::{open_sqlite_ledger, EntryStatus};
use dalbit::oracle::{AnthropicOracle, OpenAiImageOracle};
use dalbit::pipeline::{Coordinator, PipelineOptions};
use dalbit::topic::{TopicAllocator, TopicSpace};

use super::{init_metrics_for, write_metrics};

pub struct RunArgs {
    pub status: Option<PostStatus>,
    pub no_sanitize: bool,
    pub seed: Option<u64>,
    pub metrics_out: Option<PathBuf>,
}

pub async fn run(config: &Config, args: RunArgs) -> Result<ExitCode> {
    config.validate()?;
    init_metrics_for(args.metrics_out.as_deref());

    let ledger = open_sqlite_ledger(&config.database.sqlite_path).with_context(|| {
        format!(
            "Failed to open ledger at {}",
            config.database.sqlite_path.display()
        )
    })?;

    let rng = match args.seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    };
    let allocator = TopicAllocator::new(TopicSpace::default(), rng);

    let oracle = Arc::new(AnthropicOracle::new(config.anthropic_config())?);
    let cms = Arc::new(WordPressClient::new(config.wordpress_config())?);

    let options = PipelineOptions {
        preferred_status: args.status.unwrap_or(config.publish.status),
        auto_sanitize: config.publish.auto_sanitize && !args.no_sanitize,
        windows: config.publish_windows()?,
        defer_outside_windows: config.publish.use_windows,
        retry: config.retry_policy(),
    };

    let mut coordinator = Coordinator::new(allocator, ledger, oracle, cms)
        .with_validator(config.validator())
        .with_options(options);

    if let Some(image_config) = config.image_config() {
        match OpenAiImageOracle::new(image_config) {
            Ok(image) => coordinator = coordinator.with_image_oracle(Arc::new(image)),
            Err(e) => tracing::warn!(error = %e, "Image generation disabled"),
        }
    }

    let result = coordinator.run().await;

    if let Some(path) = &args.metrics_out {
        write_metrics(path)?;
    }

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            let err = Error::from(e);
            tracing::error!(category = ?err.category(), error = %err, "Run aborted");
            eprintln!("{}", err.localized_desc());
            return Ok(ExitCode::FAILURE);
        }
    };

    let title = outcome.title.as_str();
    let line = match outcome.status {
        EntryStatus::Published => t!("cli.run.published", title = title),
        EntryStatus::Scheduled => t!("cli.run.scheduled", title = title),
        EntryStatus::Draft => t!("cli.run.drafted", title = title),
        EntryStatus::Failed => t!("cli.run.failed", title = title),
    };
    println!("{line}");
    println!("  {}", outcome.topic_key);

    if let Some(post) = &outcome.post {
        println!("  {}", post.url);
    }
    if outcome.fallback_used {
        println!("  {}", t!("cli.run.fallback"));
    }
    if !outcome.validation_issues.is_empty() {
        println!(
            "  {}",
            t!("cli.run.issues", count = outcome.validation_issues.len())
        );
        for issue in &outcome.validation_issues {
            println!("    - {issue}");
        }
    }
    if let Some(error) = &outcome.error {
        eprintln!("  {error}");
    }

    Ok(if outcome.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
