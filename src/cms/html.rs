//! Markdown to HTML for post bodies
//!
//! Generated bodies are CommonMark. Raw HTML from the model is never passed
//! through; it is emitted as escaped text.

use pulldown_cmark::{html, Event, HeadingLevel, Options, Parser, Tag};

fn options() -> Options {
    Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH
}

/// CommonMark event stream for a post body
pub fn parse_markdown(markdown: &str) -> Parser<'_, '_> {
    Parser::new_ext(markdown, options())
}

/// Render the post body as HTML
pub fn markdown_to_html(markdown: &str) -> String {
    let events = parse_markdown(markdown).map(|event| match event {
        Event::Html(raw) => Event::Text(raw),
        other => other,
    });

    let mut out = String::with_capacity(markdown.len() + markdown.len() / 2);
    html::push_html(&mut out, events);
    out
}

/// Number of non-empty `##` headings that render as `<h2>`
///
/// Setext underlines also produce `<h2>` but are not counted.
pub fn count_atx_h2(markdown: &str) -> usize {
    let mut count = 0;
    // Some(has_text) while inside an ATX level-2 heading
    let mut open: Option<bool> = None;

    for (event, range) in parse_markdown(markdown).into_offset_iter() {
        match event {
            Event::Start(Tag::Heading(HeadingLevel::H2, ..)) => {
                let atx = markdown[range].trim_start().starts_with("##");
                open = atx.then_some(false);
            }
            Event::End(Tag::Heading(HeadingLevel::H2, ..)) => {
                if open.take() == Some(true) {
                    count += 1;
                }
            }
            Event::Text(text) | Event::Code(text) if open.is_some() => {
                if !text.trim().is_empty() {
                    open = Some(true);
                }
            }
            _ => {}
        }
    }

    count
}
