// SPDX-FileCopyrightText: 2025-2026 davsync contributors
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::ops::Deref;
use std::str::FromStr;

use reqwest::Url;

use crate::error::DavError;

/// Resource href as it appears in a multi-status response.
///
/// A `Href` may be relative (`/principals/alice/`) or absolute; resolve it
/// against the request URL with [`resolve_href`] before using it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Href(String);

impl Href {
    /// Creates a new `Href` from a string.
    #[must_use]
    pub const fn new(href: String) -> Self {
        Self(href)
    }

    /// Returns the inner string value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for Href {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for Href {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Href {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<String> for Href {
    fn from(href: String) -> Self {
        Self(href)
    }
}

impl From<&str> for Href {
    fn from(href: &str) -> Self {
        Self(href.to_string())
    }
}

/// The two DAV services an account can offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceType {
    /// `CalDAV` (RFC 4791).
    CalDav,
    /// `CardDAV` (RFC 6352).
    CardDav,
}

impl ServiceType {
    /// All service types, in the order discovery runs them.
    pub const ALL: [Self; 2] = [Self::CardDav, Self::CalDav];

    /// Stable lowercase name, also used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CalDav => "caldav",
            Self::CardDav => "carddav",
        }
    }

    /// Name used under `/.well-known/` (RFC 6764 §5).
    #[must_use]
    pub const fn well_known_name(self) -> &'static str {
        self.as_str()
    }

    /// Token in the `DAV:` response header announcing this service.
    #[must_use]
    pub const fn capability(self) -> &'static str {
        match self {
            Self::CalDav => "calendar-access",
            Self::CardDav => "addressbook",
        }
    }

    /// DNS SRV label for the TLS variant of the service, e.g. `_caldavs._tcp`.
    #[must_use]
    pub const fn srv_label(self) -> &'static str {
        match self {
            Self::CalDav => "_caldavs._tcp",
            Self::CardDav => "_carddavs._tcp",
        }
    }
}

impl fmt::Display for ServiceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "caldav" => Ok(Self::CalDav),
            "carddav" => Ok(Self::CardDav),
            _ => Err(format!("unknown service type: {s}")),
        }
    }
}

/// Returns `url` with a path ending in `/`.
///
/// Idempotent: applying it twice yields the same URL as applying it once.
#[must_use]
pub fn with_trailing_slash(url: &Url) -> Url {
    if url.path().ends_with('/') {
        return url.clone();
    }
    let mut url = url.clone();
    let path = format!("{}/", url.path());
    url.set_path(&path);
    url
}

/// Resolves an href against the URL it was received from.
///
/// # Errors
///
/// Returns [`DavError::InvalidUrl`] if the href cannot be joined.
pub fn resolve_href(base: &Url, href: &str) -> Result<Url, DavError> {
    base.join(href.trim())
        .map_err(|e| DavError::InvalidUrl(format!("{href} (relative to {base}): {e}")))
}

/// Key under which two spellings of the same resource compare equal.
///
/// Scheme and host are lower case, the port is explicit, path segments are
/// percent-decoded and the path ends in `/`. Query and fragment are dropped.
#[must_use]
pub fn url_key(url: &Url) -> String {
    let mut path = url
        .path()
        .split('/')
        .map(|segment| {
            String::from_utf8_lossy(&urlencoding::decode_binary(segment.as_bytes())).into_owned()
        })
        .collect::<Vec<_>>()
        .join("/");
    if !path.ends_with('/') {
        path.push('/');
    }

    format!(
        "{}://{}:{}{}",
        url.scheme().to_ascii_lowercase(),
        url.host_str().unwrap_or_default().to_ascii_lowercase(),
        url.port_or_known_default().unwrap_or_default(),
        path
    )
}

/// Whether `a` and `b` name the same resource, see [`url_key`].
#[must_use]
pub fn same_url(a: &Url, b: &Url) -> bool {
    url_key(a) == url_key(b)
}

/// Returns the parent collection of `url`, with a trailing slash.
///
/// The root path is its own parent.
#[must_use]
pub fn parent_url(url: &Url) -> Url {
    let segments: Vec<&str> = url
        .path()
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect();

    let mut parent = url.clone();
    let path = match segments.split_last() {
        Some((_, rest)) if !rest.is_empty() => format!("/{}/", rest.join("/")),
        _ => "/".to_string(),
    };
    parent.set_path(&path);
    parent.set_query(None);
    parent.set_fragment(None);
    parent
}
