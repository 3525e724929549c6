// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use super::sanitizer::HtmlSanitizer;
use gray_matter::{Matter, engine::YAML};
use once_cell::sync::Lazy;
use pulldown_cmark::{Options, Parser, html};
use regex::Regex;

static EXTERNAL_LINK_REGEX: Lazy<Result<Regex, regex::Error>> =
    Lazy::new(|| Regex::new(r#"<a href="(https?://[^"]+)"([^>]*)>"#));

/// Sanitized HTML fragment plus the front-matter title, if the source had one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMarkdown {
    pub html: String,
    pub title: Option<String>,
}

/// Markdown to sanitized HTML. Deterministic and infallible: undecodable
/// bytes are replaced, malformed markup renders best-effort.
pub struct MarkdownRenderer {
    options: Options,
    sanitizer: HtmlSanitizer,
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_TASKLISTS);
        Self {
            options,
            sanitizer: HtmlSanitizer::new(),
        }
    }

    pub fn render(&self, source: &[u8]) -> RenderedMarkdown {
        let text = String::from_utf8_lossy(source);
        let (body, title) = split_front_matter(&text);

        let parser = Parser::new_ext(&body, self.options);
        let mut html_output = String::new();
        html::push_html(&mut html_output, parser);

        let sanitized_html = self.sanitizer.clean(&html_output);
        RenderedMarkdown {
            html: mark_external_links(sanitized_html),
            title,
        }
    }
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Body without front matter, and the `title` key when present.
fn split_front_matter(text: &str) -> (String, Option<String>) {
    if !text.starts_with("---") {
        return (text.to_string(), None);
    }
    let matter = Matter::<YAML>::new();
    let parsed = matter.parse(text);

    let mut title = None;
    if let Some(data) = parsed.data
        && let gray_matter::Pod::Hash(map) = data
        && let Some(value) = map.get("title")
        && let Ok(raw) = value.as_string()
    {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            title = Some(trimmed.to_string());
        }
    }
    (parsed.content, title)
}

/// Add target="_blank" to external links, preserving other attributes
fn mark_external_links(html: String) -> String {
    let external_regex = match EXTERNAL_LINK_REGEX.as_ref() {
        Ok(regex) => regex,
        Err(err) => {
            log::error!("External link regex failed to compile: {}", err);
            return html;
        }
    };

    external_regex
        .replace_all(&html, |caps: &regex::Captures| {
            let href = &caps[1];
            let other_attrs = &caps[2];
            if other_attrs.contains("target=") {
                caps[0].to_string()
            } else {
                format!(r#"<a href="{}"{} target="_blank">"#, href, other_attrs)
            }
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_common_markdown() {
        let renderer = MarkdownRenderer::new();
        let rendered = renderer.render(
            b"# Test Heading\n\nThis is **bold** and ~~gone~~.\n\n| a | b |\n|---|---|\n| 1 | 2 |\n",
        );
        assert!(rendered.html.contains("<h1>Test Heading</h1>"));
        assert!(rendered.html.contains("<strong>bold</strong>"));
        assert!(rendered.html.contains("<del>gone</del>"));
        assert!(rendered.html.contains("<table>"));
        assert_eq!(rendered.title, None);
    }

    #[test]
    fn strips_raw_scripts() {
        let renderer = MarkdownRenderer::new();
        let rendered = renderer.render(b"hello\n\n<script>alert('x')</script>\n");
        assert!(rendered.html.contains("hello"));
        assert!(!rendered.html.contains("<script"));
        assert!(!rendered.html.contains("alert"));
    }

    #[test]
    fn external_links_open_in_new_tab() {
        let renderer = MarkdownRenderer::new();
        let rendered = renderer.render(b"[site](https://example.com) and [local](docs/intro.md)");
        assert!(rendered.html.contains(r#"href="https://example.com""#));
        assert!(rendered.html.contains(r#"target="_blank""#));
        assert!(rendered.html.contains("noopener noreferrer"));
        assert_eq!(rendered.html.matches("target=").count(), 1);
    }

    #[test]
    fn front_matter_is_stripped_and_title_kept() {
        let renderer = MarkdownRenderer::new();
        let rendered = renderer.render(b"---\ntitle: About Me\n---\n\nHello there\n");
        assert_eq!(rendered.title.as_deref(), Some("About Me"));
        assert!(rendered.html.contains("Hello there"));
        assert!(!rendered.html.contains("title:"));
    }

    #[test]
    fn malformed_input_degrades_gracefully() {
        let renderer = MarkdownRenderer::new();
        let rendered = renderer.render(b"**unclosed [link](\n\xff\xfe text");
        assert!(rendered.html.contains("text"));
        assert!(rendered.html.contains('\u{FFFD}'));
    }

    #[test]
    fn rendering_is_deterministic() {
        let renderer = MarkdownRenderer::new();
        let source = b"- [x] done\n- [ ] todo\n\nFootnote[^1].\n\n[^1]: note\n";
        assert_eq!(renderer.render(source), renderer.render(source));
    }
}
