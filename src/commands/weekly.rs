use anyhow::{Context, Result};
use chrono::Utc;
use rust_i18n::t;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use dalbit::cms::WordPressClient;
use dalbit::config::Config;
use dalbit::error::{DalbitErrorTrait, Error};
use dalbit::ledger::open_sqlite_ledger;
use dalbit::oracle::AnthropicOracle;
use dalbit::pipeline::{WeeklyCoordinator, WeeklyOptions};

use super::{init_metrics_for, write_metrics};

pub async fn weekly(
    config: &Config,
    force: bool,
    metrics_out: Option<PathBuf>,
) -> Result<ExitCode> {
    config.validate()?;
    init_metrics_for(metrics_out.as_deref());

    let ledger = open_sqlite_ledger(&config.database.sqlite_path).with_context(|| {
        format!(
            "Failed to open ledger at {}",
            config.database.sqlite_path.display()
        )
    })?;
    let oracle = Arc::new(AnthropicOracle::new(config.anthropic_config())?);
    let cms = Arc::new(WordPressClient::new(config.wordpress_config())?);

    let options = WeeklyOptions {
        preferred_status: config.publish.status,
        auto_sanitize: config.publish.auto_sanitize,
        retry: config.retry_policy(),
        ..WeeklyOptions::default()
    };

    let coordinator = WeeklyCoordinator::new(ledger, oracle, cms)
        .with_validator(config.validator())
        .with_options(options);

    // The publish day follows the site's local calendar
    let offset = config.publish_windows()?.offset();
    let today = Utc::now().with_timezone(&offset).date_naive();

    let result = coordinator.run(today, force).await;

    if let Some(path) = &metrics_out {
        write_metrics(path)?;
    }

    match result {
        Ok(Some(summary)) => {
            println!(
                "{}",
                t!(
                    "cli.weekly.summary",
                    week = summary.week.label(),
                    published = summary.published,
                    skipped = summary.skipped,
                    failed = summary.failed
                )
            );
            for error in &summary.errors {
                eprintln!("  - {error}");
            }
            Ok(if summary.failed == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Ok(None) => {
            println!("{}", t!("cli.weekly.not_monday"));
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            let err = Error::from(e);
            tracing::error!(category = ?err.category(), error = %err, "Weekly run aborted");
            eprintln!("{}", err.localized_desc());
            Ok(ExitCode::FAILURE)
        }
    }
}
