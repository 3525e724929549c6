// This file is part of the product NoPressure.
// SPDX-FileCopyrightText: 2025-2026 Zivatar Limited
// SPDX-License-Identifier: AGPL-3.0-or-later
// The code and documentation in this repository is licensed under the GNU Affero General Public License v3.0 or later (AGPL-3.0-or-later). See LICENSE.

use crate::store::StoreError;
use std::error::Error;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentErrorKind {
    /// Missing path, zero or mismatched size, or a malformed request.
    InvalidInput,
    NotFound,
    NotMarkdown,
    /// A bundle entry path could not be turned into a safe relative path.
    TraversalRejected,
    BackendFailure,
    /// A backend call was cancelled; surfaced as-is.
    Cancelled,
}

#[derive(Debug)]
pub struct ContentError {
    kind: ContentErrorKind,
    message: String,
    source: Option<Box<dyn Error + Send + Sync + 'static>>,
}

pub type ContentResult<T> = Result<T, ContentError>;

impl ContentError {
    pub fn new(kind: ContentErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ContentErrorKind::InvalidInput, message)
    }

    pub fn not_found(path: &str) -> Self {
        Self::new(ContentErrorKind::NotFound, format!("no content at '{}'", path))
    }

    pub fn not_markdown(path: &str) -> Self {
        Self::new(
            ContentErrorKind::NotMarkdown,
            format!("'{}' is not markdown", path),
        )
    }

    pub fn traversal_rejected(raw: &str) -> Self {
        Self::new(
            ContentErrorKind::TraversalRejected,
            format!("entry path '{}' cannot be made safe", raw),
        )
    }

    pub fn backend(
        message: impl Into<String>,
        source: impl Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind: ContentErrorKind::BackendFailure,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn kind(&self) -> ContentErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ContentErrorKind::NotFound
    }

    /// Prefix the message with where the failure happened, keeping kind and source.
    pub fn context(mut self, context: impl fmt::Display) -> Self {
        self.message = format!("{}: {}", context, self.message);
        self
    }
}

impl fmt::Display for ContentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            Some(source) => write!(f, "{:?}: {}: {}", self.kind, self.message, source),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

impl Error for ContentError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn Error + 'static))
    }
}

impl From<StoreError> for ContentError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(key) => ContentError::new(
                ContentErrorKind::NotFound,
                format!("no stored entry for '{}'", key),
            ),
            StoreError::Cancelled(reason) => {
                ContentError::new(ContentErrorKind::Cancelled, reason)
            }
            other => ContentError::backend("storage backend failed", other),
        }
    }
}

impl From<std::io::Error> for ContentError {
    fn from(err: std::io::Error) -> Self {
        ContentError::backend("I/O failed", err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_kinds() {
        let not_found: ContentError = StoreError::NotFound("a.md".to_string()).into();
        assert_eq!(not_found.kind(), ContentErrorKind::NotFound);

        let cancelled: ContentError = StoreError::Cancelled("deadline".to_string()).into();
        assert_eq!(cancelled.kind(), ContentErrorKind::Cancelled);
        assert_eq!(cancelled.message(), "deadline");

        let io: ContentError =
            StoreError::Io(std::io::Error::other("disk full")).into();
        assert_eq!(io.kind(), ContentErrorKind::BackendFailure);
        assert!(io.source().is_some());
        assert!(io.to_string().contains("disk full"));
    }

    #[test]
    fn context_keeps_kind() {
        let err = ContentError::not_markdown("logo.png").context("entry 3");
        assert_eq!(err.kind(), ContentErrorKind::NotMarkdown);
        assert!(err.message().starts_with("entry 3: "));
    }
}
