// SPDX-FileCopyrightText: 2025-2026 davsync contributors
//
// SPDX-License-Identifier: Apache-2.0

//! HTTP client wrapper with authentication and status classification.

use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};

use crate::config::{AuthMethod, DavConfig};
use crate::error::DavError;

/// HTTP client for `WebDAV` requests.
#[derive(Debug)]
pub struct HttpClient {
    client: Client,
    config: DavConfig,
}

impl HttpClient {
    /// Creates a new HTTP client.
    ///
    /// # Errors
    ///
    /// Returns an error if HTTP client creation fails.
    pub fn new(config: DavConfig) -> Result<Self, DavError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .redirect(Policy::none())
            .build()?;
        Ok(Self { client, config })
    }

    /// Builds a request with authentication headers.
    fn build_request(&self, method: Method, url: &str) -> RequestBuilder {
        let req = self.client.request(method, url);

        match &self.config.auth {
            AuthMethod::Basic { username, password } => req.basic_auth(username, Some(password)),
            AuthMethod::Bearer { token } => req.bearer_auth(token),
            AuthMethod::None => req,
        }
    }

    /// Sends a request, following redirects with the same method and body,
    /// and maps non-success statuses to errors.
    ///
    /// reqwest would turn a redirected PROPFIND into a GET, so redirects are
    /// followed here. Returns the URL that finally answered with the response.
    ///
    /// # Errors
    ///
    /// Returns [`DavError::Unauthorized`] on 401, [`DavError::Status`] on any
    /// other non-2xx status, and [`DavError::Http`] if the request fails.
    pub async fn send<F>(
        &self,
        method: Method,
        url: &Url,
        prepare: F,
    ) -> Result<(Url, Response), DavError>
    where
        F: Fn(RequestBuilder) -> RequestBuilder + Send + Sync,
    {
        let mut url = url.clone();
        for _ in 0..=self.config.max_redirects {
            let req = prepare(self.build_request(method.clone(), url.as_str()));
            let resp = req.send().await?;
            let status = resp.status();

            if status.is_redirection() {
                let location = resp.headers().get(LOCATION).and_then(|v| v.to_str().ok());
                if let Some(location) = location {
                    let target = url.join(location).map_err(|e| {
                        DavError::InvalidUrl(format!("redirect from {url} to {location}: {e}"))
                    })?;
                    tracing::debug!(from = %url, to = %target, %status, "following redirect");
                    url = target;
                    continue;
                }
            }

            return match status {
                status if status.is_success() => Ok((url, resp)),
                StatusCode::UNAUTHORIZED => Err(DavError::Unauthorized {
                    url: url.to_string(),
                }),
                status => {
                    tracing::debug!(%url, %status, "request failed");
                    Err(DavError::Status {
                        code: status.as_u16(),
                        url: url.to_string(),
                    })
                }
            };
        }

        Err(DavError::Http(format!("too many redirects for {url}")))
    }
}
