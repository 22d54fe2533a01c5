// SPDX-FileCopyrightText: 2025-2026 davsync contributors
//
// SPDX-License-Identifier: Apache-2.0

//! Transport abstraction used by discovery and refresh.

use async_trait::async_trait;
use reqwest::Url;

use crate::error::DavError;
use crate::request::Prop;
use crate::response::{Properties, ResponseItem};
use crate::types::{parent_url, resolve_href, url_key};

/// PROPFIND depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Depth {
    /// Only the requested resource.
    Zero,
    /// The requested resource and its direct members.
    One,
}

impl Depth {
    /// Value of the `Depth` request header.
    #[must_use]
    pub const fn header_value(self) -> &'static str {
        match self {
            Self::Zero => "0",
            Self::One => "1",
        }
    }
}

/// How a response href relates to the requested URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HrefRelation {
    /// The response describes the requested resource itself.
    SelfRef,
    /// The response describes a direct member of the requested collection.
    Member,
    /// Anything else.
    Other,
}

impl HrefRelation {
    /// Classifies `href` relative to `requested`, comparing by [`url_key`].
    #[must_use]
    pub fn classify(requested: &Url, href: &Url) -> Self {
        let requested = url_key(requested);
        if url_key(href) == requested {
            Self::SelfRef
        } else if url_key(&parent_url(href)) == requested {
            Self::Member
        } else {
            Self::Other
        }
    }
}

/// One resource of a multi-status response, with its href resolved.
#[derive(Debug, Clone)]
pub struct DavResponse {
    /// Absolute URL of the resource.
    pub url: Url,
    /// Relation of `url` to the URL that answered the request.
    pub relation: HrefRelation,
    /// Response-level status code, if sent.
    pub status: Option<u16>,
    /// Properties from successful propstats.
    pub props: Properties,
}

impl DavResponse {
    /// Builds a response from a parsed multistatus item.
    ///
    /// # Errors
    ///
    /// Returns [`DavError::InvalidUrl`] if the href cannot be resolved.
    pub fn from_item(base: &Url, item: &ResponseItem) -> Result<Self, DavError> {
        let url = resolve_href(base, &item.href)?;
        Ok(Self {
            relation: HrefRelation::classify(base, &url),
            url,
            status: item.status_code(),
            props: item.properties(),
        })
    }

    /// Whether the response-level status, if any, is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_none_or(|code| (200..300).contains(&code))
    }
}

/// Capability tokens from the `DAV:` response header of an OPTIONS request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    tokens: Vec<String>,
}

impl Capabilities {
    /// Parses one or more `DAV:` header values, e.g. `1, 2, calendar-access`.
    pub fn from_header_values<'a, I>(values: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let tokens = values
            .into_iter()
            .flat_map(|value| value.split(','))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_ascii_lowercase)
            .collect();
        Self { tokens }
    }

    /// Whether the server announced `token`; compared case-insensitively.
    #[must_use]
    pub fn contains(&self, token: &str) -> bool {
        self.tokens.iter().any(|t| t.eq_ignore_ascii_case(token))
    }

    /// All announced tokens, lower case.
    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

/// The `WebDAV` operations discovery and refresh need.
///
/// [`crate::DavClient`] implements this over HTTP; tests substitute a fake.
#[async_trait]
pub trait DavTransport: Send + Sync {
    /// Sends PROPFIND for `props` and returns every resource in the response.
    async fn propfind(
        &self,
        url: &Url,
        depth: Depth,
        props: &[Prop],
    ) -> Result<Vec<DavResponse>, DavError>;

    /// Sends OPTIONS and returns the announced capabilities.
    async fn options(&self, url: &Url) -> Result<Capabilities, DavError>;
}
