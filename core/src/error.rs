// SPDX-FileCopyrightText: 2025-2026 davsync contributors
//
// SPDX-License-Identifier: Apache-2.0

use davsync_dav::DavError;

/// Errors of discovery, refresh and persistence.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Protocol, HTTP or DNS failure, or cancellation.
    #[error(transparent)]
    Dav(#[from] DavError),

    /// Database failure.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Schema migration failure.
    #[error("Failed to run migrations: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// The preselection exclusion pattern does not compile.
    #[error("Invalid exclusion pattern: {0}")]
    Regex(#[from] regex::Error),

    /// A stored service type is not one this build knows.
    #[error("Unknown service type: {0}")]
    UnknownService(String),

    /// A stored value is not a valid URL.
    #[error("Invalid stored URL {url}: {reason}")]
    InvalidStoredUrl {
        /// The stored text.
        url: String,
        /// Parser message.
        reason: String,
    },

    /// A referenced row does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// Invalid configuration or environment.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    fn dav(&self) -> Option<&DavError> {
        match self {
            Self::Dav(e) => Some(e),
            _ => None,
        }
    }

    /// Whether the running job was cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.dav().is_some_and(DavError::is_cancelled)
    }

    /// Whether the server answered 401.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.dav().is_some_and(DavError::is_unauthorized)
    }

    /// Whether the server says the resource is gone (403, 404 or 410).
    #[must_use]
    pub fn is_gone(&self) -> bool {
        self.dav().is_some_and(DavError::is_gone)
    }

    /// Whether the server answered with any 4xx status, 401 included.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.dav().is_some_and(DavError::is_client_error)
    }

    /// Whether the server answered with an HTTP error status.
    #[must_use]
    pub fn is_http_status(&self) -> bool {
        self.dav().and_then(DavError::status).is_some()
    }
}
