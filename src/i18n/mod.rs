//! Internationalization (i18n) support for dalbit
//!
//! Error categories and CLI summary lines are translated. Supported
//! languages: English (en) and Korean (ko).
//!
//! # Environment Variables
//!
//! - `DALBIT_LANG`: preferred language (en, ko). Defaults to English.
//!
//! # Usage
//!
//! ```rust,ignore
//! use dalbit::i18n::{set_locale, t};
//!
//! set_locale("ko");
//! let msg = t!("cli.run.published");
//! ```

use std::sync::RwLock;

// rust_i18n::i18n! is declared in lib.rs (crate root)

static CURRENT_LOCALE: RwLock<String> = RwLock::new(String::new());

/// Set the current locale for translations
pub fn set_locale(locale: &str) {
    let normalized = normalize_locale(locale);
    rust_i18n::set_locale(normalized);
    if let Ok(mut current) = CURRENT_LOCALE.write() {
        *current = normalized.to_string();
    }
}

/// The active locale, `en` until one is set
pub fn current_locale() -> String {
    CURRENT_LOCALE
        .read()
        .ok()
        .filter(|l| !l.is_empty())
        .map(|l| l.clone())
        .unwrap_or_else(|| "en".to_string())
}

/// Initialize i18n from `DALBIT_LANG`, falling back to English
pub fn init_from_env() {
    let locale = std::env::var("DALBIT_LANG").unwrap_or_else(|_| "en".to_string());
    set_locale(&locale);
}

/// Map ko-KR, ko_KR, korean to `ko`; everything else is `en`
fn normalize_locale(locale: &str) -> &'static str {
    let lower = locale.trim().to_lowercase();

    if lower.starts_with("ko") || lower == "korean" {
        "ko"
    } else {
        "en"
    }
}

/// Translate a key with optional parameters
///
/// Re-export of `rust_i18n::t!`.
///
/// ```rust,ignore
/// let msg = t!("errors.topic.exhausted", attempts = 100);
/// ```
#[doc(inline)]
pub use rust_i18n::t;
