// SPDX-FileCopyrightText: 2025-2026 davsync contributors
//
// SPDX-License-Identifier: Apache-2.0

//! `WebDAV` client over HTTP.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, Url};

use crate::config::DavConfig;
use crate::error::DavError;
use crate::http::HttpClient;
use crate::request::{Prop, PropFindRequest};
use crate::response::MultiStatusResponse;
use crate::transport::{Capabilities, DavResponse, DavTransport, Depth};

/// `WebDAV` client used for `CalDAV`/`CardDAV` discovery.
///
/// # Example
///
/// ```ignore
/// use davsync_dav::{AuthMethod, DavClient, DavConfig, DavTransport, Depth, Prop};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = DavClient::new(DavConfig {
///     auth: AuthMethod::Basic {
///         username: "alice".to_string(),
///         password: "secret".to_string(),
///     },
///     ..Default::default()
/// })?;
///
/// let url = "https://dav.example.com/".parse()?;
/// let responses = client
///     .propfind(&url, Depth::Zero, &[Prop::CurrentUserPrincipal])
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct DavClient {
    http: Arc<HttpClient>,
}

impl DavClient {
    /// Creates a new `WebDAV` client.
    ///
    /// # Errors
    ///
    /// Returns an error if HTTP client initialization fails.
    pub fn new(config: DavConfig) -> Result<Self, DavError> {
        let http = HttpClient::new(config)?;
        Ok(Self {
            http: Arc::new(http),
        })
    }

    fn method(name: &[u8]) -> Result<Method, DavError> {
        Method::from_bytes(name).map_err(|e| DavError::Http(format!("Invalid method: {e}")))
    }
}

#[async_trait]
impl DavTransport for DavClient {
    async fn propfind(
        &self,
        url: &Url,
        depth: Depth,
        props: &[Prop],
    ) -> Result<Vec<DavResponse>, DavError> {
        let body = props.iter().copied().collect::<PropFindRequest>().build()?;

        tracing::trace!(%url, ?depth, "PROPFIND");
        let (base, resp) = self
            .http
            .send(Self::method(b"PROPFIND")?, url, |req| {
                req.header("Content-Type", "application/xml; charset=utf-8")
                    .header("Depth", depth.header_value())
                    .body(body.clone())
            })
            .await?;

        let xml = resp.text().await?;
        let multistatus = MultiStatusResponse::from_xml(&xml)?;

        let mut responses = Vec::with_capacity(multistatus.responses.len());
        for item in &multistatus.responses {
            match DavResponse::from_item(&base, item) {
                Ok(response) => responses.push(response),
                Err(err) => tracing::warn!(%base, href = %item.href, %err, "ignoring unusable href"),
            }
        }
        Ok(responses)
    }

    async fn options(&self, url: &Url) -> Result<Capabilities, DavError> {
        tracing::trace!(%url, "OPTIONS");
        let (_, resp) = self.http.send(Method::OPTIONS, url, |req| req).await?;

        let values = resp
            .headers()
            .get_all("DAV")
            .iter()
            .filter_map(|v| v.to_str().ok());
        Ok(Capabilities::from_header_values(values))
    }
}
