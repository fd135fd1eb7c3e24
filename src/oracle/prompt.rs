//! Prompt rendering with Handlebars templates

use handlebars::Handlebars;
use serde::Serialize;

use crate::schedule::WeekPeriod;
use crate::topic::{CardKind, Topic};
use crate::utils::error::OracleError;
use crate::validator::{DEFAULT_DISCLAIMER, FORBIDDEN_REPLACEMENTS};

const CONTENT_TEMPLATE: &str = include_str!("../../templates/content.hbs");
const WEEKLY_TEMPLATE: &str = include_str!("../../templates/weekly.hbs");
const IMAGE_TEMPLATE: &str = include_str!("../../templates/image.hbs");

#[derive(Debug, Serialize)]
struct TopicPromptData<'a> {
    mbti: &'a str,
    situation: &'a str,
    situation_keyword: &'a str,
    card_name: &'a str,
    card_korean: &'a str,
    card_label: &'static str,
    card_label_en: &'static str,
    disclaimer: &'static str,
    forbidden: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
struct WeeklyPromptData<'a> {
    mbti: &'a str,
    week_start: String,
    week_end: String,
    disclaimer: &'static str,
    forbidden: Vec<&'static str>,
}

fn forbidden_words() -> Vec<&'static str> {
    FORBIDDEN_REPLACEMENTS.iter().map(|(word, _)| *word).collect()
}

fn card_label_en(kind: CardKind) -> &'static str {
    match kind {
        CardKind::Tarot => "tarot card",
        CardKind::Numerology => "numerology number",
        CardKind::Oracle => "oracle card",
    }
}

/// Renders generation prompts
pub struct PromptRenderer {
    handlebars: Handlebars<'static>,
}

impl PromptRenderer {
    /// Create a renderer with the built-in templates
    pub fn new() -> Result<Self, OracleError> {
        let mut handlebars = Handlebars::new();
        // Prompts are plain text
        handlebars.register_escape_fn(handlebars::no_escape);

        for (name, template) in [
            ("content", CONTENT_TEMPLATE),
            ("weekly", WEEKLY_TEMPLATE),
            ("image", IMAGE_TEMPLATE),
        ] {
            handlebars
                .register_template_string(name, template)
                .map_err(|e| OracleError::Template(e.to_string()))?;
        }

        Ok(Self { handlebars })
    }

    fn topic_data(topic: &Topic) -> TopicPromptData<'_> {
        TopicPromptData {
            mbti: &topic.primary,
            situation: &topic.situation,
            situation_keyword: topic.situation_keyword(),
            card_name: &topic.card.name,
            card_korean: &topic.card.korean,
            card_label: topic.card_kind.korean_label(),
            card_label_en: card_label_en(topic.card_kind),
            disclaimer: DEFAULT_DISCLAIMER,
            forbidden: forbidden_words(),
        }
    }

    fn render<T: Serialize>(&self, name: &str, data: &T) -> Result<String, OracleError> {
        self.handlebars
            .render(name, data)
            .map_err(|e| OracleError::Template(e.to_string()))
    }

    /// Prompt for a one-shot post
    pub fn content_prompt(&self, topic: &Topic) -> Result<String, OracleError> {
        self.render("content", &Self::topic_data(topic))
    }

    /// Prompt for a featured image
    pub fn image_prompt(&self, topic: &Topic) -> Result<String, OracleError> {
        self.render("image", &Self::topic_data(topic))
    }

    /// Prompt for a weekly post
    pub fn weekly_prompt(&self, subject: &str, week: &WeekPeriod) -> Result<String, OracleError> {
        let data = WeeklyPromptData {
            mbti: subject,
            week_start: week.start.format("%Y-%m-%d").to_string(),
            week_end: week.end.format("%Y-%m-%d").to_string(),
            disclaimer: DEFAULT_DISCLAIMER,
            forbidden: forbidden_words(),
        };
        self.render("weekly", &data)
    }
}
