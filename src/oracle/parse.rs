//! Model response parsing
//!
//! Expected shape:
//!
//! ```text
//! META_DESCRIPTION: ...
//! OG_TITLE: ...
//! OG_DESCRIPTION: ...
//! IMAGE_ALT: ...
//! INTERNAL_LINKS: first, second
//! ---
//! # Title
//! body...
//! ```
//!
//! The separator is optional. Without a heading, the first non-empty line
//! becomes the title.

use super::{ContentDraft, SeoMetadata};
use crate::utils::error::OracleError;
use crate::utils::normalize_whitespace;

const SEPARATOR: &str = "---";

/// Split a raw response into a [`ContentDraft`]
pub fn parse_response(text: &str) -> Result<ContentDraft, OracleError> {
    if text.trim().is_empty() {
        return Err(OracleError::Malformed("empty response".to_string()));
    }

    let lines: Vec<&str> = text.lines().collect();
    let (meta_lines, content_lines) = match lines.iter().position(|l| l.trim() == SEPARATOR) {
        Some(idx) => (&lines[..idx], &lines[idx + 1..]),
        None => (&lines[..0], &lines[..]),
    };

    // Without a separator, metadata lines may still lead the response
    let metadata = if meta_lines.is_empty() {
        parse_metadata(content_lines)
    } else {
        parse_metadata(meta_lines)
    };
    let content_lines: Vec<&str> = content_lines
        .iter()
        .copied()
        .filter(|l| !meta_lines.is_empty() || metadata_key(l).is_none())
        .collect();

    let (title, body) = split_title(&content_lines);
    if title.is_empty() {
        return Err(OracleError::Malformed("response has no title".to_string()));
    }

    Ok(ContentDraft {
        title,
        body,
        metadata,
    })
}

fn metadata_key(line: &str) -> Option<(&'static str, &str)> {
    const KEYS: &[&str] = &[
        "META_DESCRIPTION:",
        "OG_TITLE:",
        "OG_DESCRIPTION:",
        "IMAGE_ALT:",
        "INTERNAL_LINKS:",
    ];

    let line = line.trim_start();
    KEYS.iter()
        .find_map(|key| line.strip_prefix(key).map(|rest| (*key, rest.trim())))
}

fn parse_metadata(lines: &[&str]) -> SeoMetadata {
    let mut metadata = SeoMetadata::default();
    let mut in_links = false;

    for line in lines {
        match metadata_key(line) {
            Some((key, value)) => {
                in_links = key == "INTERNAL_LINKS:";
                let value = normalize_whitespace(value);
                match key {
                    "META_DESCRIPTION:" => metadata.description = value,
                    "OG_TITLE:" => metadata.og_title = value,
                    "OG_DESCRIPTION:" => metadata.og_description = value,
                    "IMAGE_ALT:" => metadata.image_alt = value,
                    _ => metadata
                        .internal_links
                        .extend(value.split(',').filter_map(clean_link)),
                }
            }
            None if in_links => match line.trim().strip_prefix('-') {
                Some(item) => metadata.internal_links.extend(clean_link(item)),
                None => in_links = false,
            },
            None => {}
        }
    }

    metadata
}

fn clean_link(raw: &str) -> Option<String> {
    // "- Example 1: \"anchor\"" and "[anchor]" both reduce to the anchor text
    let raw = raw.rsplit(':').next().unwrap_or(raw);
    let link = raw
        .trim()
        .trim_matches(|c| matches!(c, '"' | '\'' | '[' | ']'))
        .trim();
    (!link.is_empty()).then(|| link.to_string())
}

fn split_title(lines: &[&str]) -> (String, String) {
    if let Some(idx) = lines.iter().position(|l| l.trim_start().starts_with('#')) {
        let title = lines[idx].trim().trim_start_matches('#').trim().to_string();
        let body = lines[idx + 1..].join("\n").trim().to_string();
        if !body.is_empty() {
            return (title, body);
        }
        return (title, lines.join("\n").trim().to_string());
    }

    let title = lines
        .iter()
        .map(|l| l.trim())
        .find(|l| !l.is_empty())
        .unwrap_or_default()
        .to_string();
    (title, lines.join("\n").trim().to_string())
}
