// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use minijinja::{Value, context};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexLink {
    pub href: String,
    pub title: String,
    pub size: u64,
}

/// Context for the index page synthesized when an export has no index of its own.
#[derive(Debug, Clone)]
pub struct IndexPageContext {
    site_title: String,
    pages: Vec<IndexLink>,
    files: Vec<IndexLink>,
    generated_at: String,
}

impl IndexPageContext {
    pub fn new(site_title: &str, generated_at: &str) -> Self {
        Self {
            site_title: site_title.to_string(),
            pages: Vec::new(),
            files: Vec::new(),
            generated_at: generated_at.to_string(),
        }
    }

    pub fn add_page(&mut self, link: IndexLink) {
        self.pages.push(link);
    }

    pub fn add_file(&mut self, link: IndexLink) {
        self.files.push(link);
    }

    pub fn to_value(&self) -> Value {
        context! {
            site_title => &self.site_title,
            pages => &self.pages,
            files => &self.files,
            generated_at => &self.generated_at
        }
    }
}
