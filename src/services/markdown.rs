//! Markdown rendering
//!
//! Converts post content to HTML with pulldown-cmark and derives plain-text
//! excerpts for listing pages and meta descriptions.

use pulldown_cmark::{html, Event, Options, Parser};

/// Maximum excerpt length in characters
const EXCERPT_MAX_CHARS: usize = 200;

/// Markdown renderer with tables, strikethrough, task lists, and smart
/// punctuation enabled
#[derive(Debug, Clone)]
pub struct MarkdownRenderer {
    options: Options,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_SMART_PUNCTUATION);
        Self { options }
    }

    /// Render markdown to HTML
    pub fn render(&self, markdown: &str) -> String {
        let parser = Parser::new_ext(markdown, self.options);
        let mut output = String::with_capacity(markdown.len() * 2);
        html::push_html(&mut output, parser);
        output
    }

    /// Derive a plain-text excerpt from markdown, truncated at a word
    /// boundary with an ellipsis
    pub fn excerpt(&self, markdown: &str) -> String {
        let parser = Parser::new_ext(markdown, self.options);
        let mut text = String::new();

        for event in parser {
            match event {
                Event::Text(t) | Event::Code(t) => {
                    if !text.is_empty() && !text.ends_with(' ') {
                        text.push(' ');
                    }
                    text.push_str(&t);
                }
                Event::SoftBreak | Event::HardBreak => text.push(' '),
                _ => {}
            }
            if text.chars().count() > EXCERPT_MAX_CHARS * 2 {
                break;
            }
        }

        let text = text.trim();
        if text.chars().count() <= EXCERPT_MAX_CHARS {
            return text.to_string();
        }

        let truncated: String = text.chars().take(EXCERPT_MAX_CHARS).collect();
        let cut = truncated.rfind(' ').unwrap_or(truncated.len());
        format!("{}…", &truncated[..cut])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_basic_markdown() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("# Lisbon\n\nA **beautiful** city.");
        assert!(html.contains("<h1>"));
        assert!(html.contains("<strong>beautiful</strong>"));
    }

    #[test]
    fn test_render_tables() {
        let renderer = MarkdownRenderer::new();
        let html = renderer.render("| a | b |\n|---|---|\n| 1 | 2 |");
        assert!(html.contains("<table>"));
    }

    #[test]
    fn test_excerpt_strips_formatting() {
        let renderer = MarkdownRenderer::new();
        let excerpt = renderer.excerpt("# Heading\n\nSome *emphasized* text.");
        assert!(!excerpt.contains('*'));
        assert!(!excerpt.contains('#'));
        assert!(excerpt.contains("emphasized"));
    }

    #[test]
    fn test_excerpt_truncates_at_word_boundary() {
        let renderer = MarkdownRenderer::new();
        let long = "word ".repeat(100);
        let excerpt = renderer.excerpt(&long);
        assert!(excerpt.chars().count() <= EXCERPT_MAX_CHARS + 1);
        assert!(excerpt.ends_with('…'));
    }

    #[test]
    fn test_excerpt_short_content_unchanged() {
        let renderer = MarkdownRenderer::new();
        assert_eq!(renderer.excerpt("Short note."), "Short note.");
    }
}
