// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use std::collections::HashMap;
use uuid::Uuid;

mod context;
mod engine;

pub use context::{IndexLink, IndexPageContext};
pub use engine::{EXPORT_INDEX_TEMPLATE, MiniJinjaEngine, TemplateEngine};

pub fn html_escape(input: &str) -> String {
    let mut escaped = String::new();
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

/// Helper macro to create template variables map more easily
#[macro_export]
macro_rules! template_vars {
    ($($key:expr => $value:expr),* $(,)?) => {
        {
            let mut map = std::collections::HashMap::new();
            $(
                map.insert($key, $value.to_string());
            )*
            map
        }
    };
}

/// Simple template rendering utility that replaces placeholders with values
pub fn render_template(template_content: &str, vars: &HashMap<&str, String>) -> String {
    let mut result = template_content.to_string();
    let mut replacements = Vec::new();

    for (key, value) in vars {
        let placeholder = format!("{{{}}}", key);
        let token = Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(16)
            .collect::<String>();
        let token_placeholder = format!("{{{}}}", token);
        result = result.replace(&placeholder, &token_placeholder);
        replacements.push((token_placeholder, value));
    }

    // Replace randomized placeholders last to avoid collisions with rendered content.
    for (token_placeholder, value) in replacements {
        result = result.replace(&token_placeholder, value);
    }

    result
}

/// Load string-based templates.
pub fn load_template(template_name: &str) -> Result<String, std::io::Error> {
    match template_name {
        "export/page_shell" => Ok(include_str!("templates/html/page_shell.html").to_string()),

        _ => Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Template '{}' not found", template_name),
        )),
    }
}

/// Values substituted into the exported page shell.
#[derive(Debug, Clone)]
pub struct PageShell<'a> {
    pub title: &'a str,
    pub site_title: &'a str,
    /// Already sanitized HTML; inserted verbatim.
    pub body: &'a str,
    pub modified: &'a str,
    /// Relative prefix from the page back to the bundle root, e.g. `../`.
    pub root: &'a str,
}

/// Wrap a rendered markdown fragment into a standalone HTML page.
pub fn render_page_shell(page: &PageShell<'_>) -> Result<String, std::io::Error> {
    let shell = load_template("export/page_shell")?;
    let vars = template_vars! {
        "title" => html_escape(page.title),
        "site_title" => html_escape(page.site_title),
        "modified" => html_escape(page.modified),
        "root" => html_escape(page.root),
        "body" => page.body,
    };
    Ok(render_template(&shell, &vars))
}
