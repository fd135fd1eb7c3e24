//! Content policy validation and sanitization
//!
//! Generated posts must avoid certainty/prediction vocabulary, carry a
//! disclaimer, have at least three `##` sections and be long enough to be
//! worth indexing. Rules are evaluated in that order and every violated rule
//! contributes one issue string.
//!
//! Sanitization only rewrites the forbidden vocabulary. It never adds a
//! disclaimer, headings or length, so the caller has to revalidate.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Forbidden vocabulary paired with its softer replacement
pub const FORBIDDEN_REPLACEMENTS: &[(&str, &str)] = &[
    ("definitely", "likely"),
    ("guaranteed", "possible"),
    ("100%", "highly"),
    ("must happen", "may happen"),
    ("will happen", "might happen"),
    ("certain", "probable"),
    ("확실히", "아마도"),
    ("반드시", "가능하면"),
    ("틀림없이", "그럴 수 있습니다"),
    ("보장", "가능성"),
    ("무조건", "경우에 따라"),
];

/// Default disclaimer phrase
pub const DEFAULT_DISCLAIMER: &str = "참고 자료일 뿐";

/// Keywords the strict disclaimer rule requires together
pub const STRICT_DISCLAIMER_KEYWORDS: &[&str] = &["참고 자료", "선택과 책임", "본인에게"];

/// Minimum number of level-2 headings
pub const MIN_H2_HEADINGS: usize = 3;

/// Minimum body length in characters
pub const MIN_BODY_CHARS: usize = 1000;

// One capture group per table row, so the replacement is found by group index
static FORBIDDEN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = FORBIDDEN_REPLACEMENTS
        .iter()
        .map(|(word, _)| format!("({})", regex::escape(word)))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!("(?i){alternation}")).unwrap()
});

/// How the disclaimer requirement is checked
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum DisclaimerRule {
    /// The body contains this exact phrase
    Phrase(String),

    /// The body contains every keyword
    AllKeywords(Vec<String>),
}

impl DisclaimerRule {
    /// `참고 자료일 뿐` must appear in the body
    pub fn standard() -> Self {
        Self::Phrase(DEFAULT_DISCLAIMER.to_string())
    }

    /// All of [`STRICT_DISCLAIMER_KEYWORDS`] must appear in the body
    pub fn strict() -> Self {
        Self::AllKeywords(
            STRICT_DISCLAIMER_KEYWORDS
                .iter()
                .map(|k| k.to_string())
                .collect(),
        )
    }

    pub fn is_satisfied(&self, body: &str) -> bool {
        match self {
            Self::Phrase(phrase) => body.contains(phrase.as_str()),
            Self::AllKeywords(keywords) => keywords.iter().all(|k| body.contains(k.as_str())),
        }
    }
}

impl Default for DisclaimerRule {
    fn default() -> Self {
        Self::standard()
    }
}

/// Outcome of one validation pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    /// Violations in rule evaluation order
    pub issues: Vec<String>,
}

/// Checks generated content against the publication policy
#[derive(Debug, Clone, Default)]
pub struct ContentValidator {
    disclaimer: DisclaimerRule,
}

impl ContentValidator {
    pub fn new(disclaimer: DisclaimerRule) -> Self {
        Self { disclaimer }
    }

    pub fn disclaimer(&self) -> &DisclaimerRule {
        &self.disclaimer
    }

    /// Evaluate every rule against the title and body
    pub fn validate(&self, title: &str, body: &str) -> ValidationResult {
        let mut issues = Vec::new();

        let found = find_forbidden_words(&format!("{title} {body}"));
        if !found.is_empty() {
            issues.push(format!("Found forbidden words: {}", found.join(", ")));
        }

        if !self.disclaimer.is_satisfied(body) {
            issues.push("Missing required disclaimer".to_string());
        }

        let headings = count_h2_headings(body);
        if headings < MIN_H2_HEADINGS {
            issues.push(format!(
                "Missing proper H2 heading structure (found {headings}, minimum {MIN_H2_HEADINGS})"
            ));
        }

        let length = body.chars().count();
        if length < MIN_BODY_CHARS {
            issues.push(format!(
                "Content too short: {length} characters (minimum {MIN_BODY_CHARS})"
            ));
        }

        if !issues.is_empty() {
            tracing::debug!(issues = ?issues, "Content validation failed");
        }

        ValidationResult {
            is_valid: issues.is_empty(),
            issues,
        }
    }

    /// Replace forbidden vocabulary in a single left-to-right pass
    pub fn sanitize(&self, body: &str) -> String {
        sanitize_text(body)
    }
}

/// Forbidden words present in `text`, case-insensitively, in table order
pub fn find_forbidden_words(text: &str) -> Vec<&'static str> {
    let lowered = text.to_lowercase();
    FORBIDDEN_REPLACEMENTS
        .iter()
        .map(|(word, _)| *word)
        .filter(|word| lowered.contains(word))
        .collect()
}

/// Number of `##` headings, counted the same way the post renderer sees them
pub fn count_h2_headings(body: &str) -> usize {
    crate::cms::html::count_atx_h2(body)
}

/// Apply the replacement table to `text`
pub fn sanitize_text(text: &str) -> String {
    FORBIDDEN_REGEX
        .replace_all(text, |caps: &Captures| {
            (1..caps.len())
                .find(|&i| caps.get(i).is_some())
                .map(|i| FORBIDDEN_REPLACEMENTS[i - 1].1.to_string())
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}
