use anyhow::{Context, Result};
use rust_i18n::t;
use std::path::Path;
use std::process::ExitCode;

use dalbit::config::Config;
use dalbit::oracle::parse::parse_response;
use dalbit::validator::ValidationResult;

fn print_result(result: &ValidationResult) {
    if result.is_valid {
        println!("{}", t!("cli.validate.valid"));
    } else {
        println!("{}", t!("cli.validate.invalid"));
        for issue in &result.issues {
            println!("  - {issue}");
        }
    }
}

pub fn validate(config: &Config, file: &Path, sanitize: bool) -> Result<ExitCode> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let draft = parse_response(&text)
        .with_context(|| format!("Failed to parse {}", file.display()))?;

    let validator = config.validator();
    let mut result = validator.validate(&draft.title, &draft.body);
    print_result(&result);

    if sanitize && !result.is_valid {
        let body = validator.sanitize(&draft.body);
        result = validator.validate(&draft.title, &body);
        println!();
        println!("# {}\n\n{body}\n", draft.title);
        print_result(&result);
    }

    Ok(if result.is_valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
