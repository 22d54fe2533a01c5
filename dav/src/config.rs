// SPDX-FileCopyrightText: 2025-2026 davsync contributors
//
// SPDX-License-Identifier: Apache-2.0

/// Credentials sent with every request.
#[derive(Debug, Clone, Default, serde::Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuthMethod {
    /// Anonymous access.
    #[default]
    None,
    /// HTTP Basic.
    Basic {
        /// Login name.
        username: String,
        /// Password, sent on every request.
        password: String,
    },
    /// `Authorization: Bearer`, e.g. an OAuth access token.
    Bearer {
        /// Access token.
        token: String,
    },
}

/// HTTP settings shared by every request of one account.
///
/// There is no base URL: requests go wherever discovery leads, possibly
/// across hosts.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct DavConfig {
    /// Credentials.
    pub auth: AuthMethod,
    /// Timeout of one request, in seconds.
    pub timeout_secs: u64,
    /// `User-Agent` header.
    pub user_agent: String,
    /// Redirects followed per request before giving up.
    pub max_redirects: usize,
}

impl Default for DavConfig {
    fn default() -> Self {
        Self {
            auth: AuthMethod::None,
            timeout_secs: 30,
            user_agent: concat!("davsync/", env!("CARGO_PKG_VERSION")).to_string(),
            max_redirects: 5,
        }
    }
}
