// SPDX-FileCopyrightText: 2025-2026 davsync contributors
//
// SPDX-License-Identifier: Apache-2.0

/// `WebDAV` client errors.
///
/// HTTP statuses are kept distinct so callers can tell 401 from the
/// "resource gone" family (403/404/410) and from other failures.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum DavError {
    /// Transport-level failure (connection, TLS, timeout).
    #[error("HTTP error: {0}")]
    Http(String),

    /// The server answered 401.
    #[error("Authentication required for {url}")]
    Unauthorized {
        /// Requested URL.
        url: String,
    },

    /// The server answered with a non-success status other than 401.
    #[error("HTTP {code} for {url}")]
    Status {
        /// HTTP status code.
        code: u16,
        /// Requested URL.
        url: String,
    },

    /// XML parsing/writing error.
    #[error("XML error: {0}")]
    Xml(String),

    /// DNS lookup error.
    #[error("DNS error: {0}")]
    Dns(String),

    /// A URL could not be parsed or resolved.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The running job was cancelled.
    #[error("Operation cancelled")]
    Cancelled,
}

impl DavError {
    /// Returns the HTTP status code carried by this error, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized { .. } => Some(401),
            Self::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// Whether this is a 4xx response, 401 included.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status().is_some_and(|code| code / 100 == 4)
    }

    /// Whether the server says the resource is gone (403, 404 or 410).
    #[must_use]
    pub fn is_gone(&self) -> bool {
        matches!(self.status(), Some(403 | 404 | 410))
    }

    /// Whether the server answered 401.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Whether the job was cancelled.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<reqwest::Error> for DavError {
    fn from(e: reqwest::Error) -> Self {
        Self::Http(e.to_string())
    }
}

impl From<quick_xml::Error> for DavError {
    fn from(e: quick_xml::Error) -> Self {
        Self::Xml(e.to_string())
    }
}

impl From<quick_xml::encoding::EncodingError> for DavError {
    fn from(e: quick_xml::encoding::EncodingError) -> Self {
        Self::Xml(e.to_string())
    }
}

impl From<std::io::Error> for DavError {
    fn from(e: std::io::Error) -> Self {
        Self::Xml(format!("IO error: {e}"))
    }
}

impl From<reqwest::header::InvalidHeaderValue> for DavError {
    fn from(e: reqwest::header::InvalidHeaderValue) -> Self {
        Self::Config(e.to_string())
    }
}
