// SPDX-FileCopyrightText: 2025-2026 davsync contributors
//
// SPDX-License-Identifier: Apache-2.0

//! Shared fakes for integration tests.
//!
//! [`FakeTransport`] answers PROPFIND and OPTIONS from a table keyed by URL
//! and depth and records every request, so tests can assert how often a
//! resource was queried. [`FakeDns`] serves fixed SRV and TXT records.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use davsync_core::{Config, Db, DiscoverySession, PreselectPolicy, Settings};
use davsync_dav::{
    Cancellation, Capabilities, DavError, DavResponse, DavTransport, Depth, DnsResolver,
    HrefRelation, Prop, Properties, ResourceKind, SrvRecord, Url,
};

/// Parses a URL, panicking on invalid input.
pub fn url(s: &str) -> Url {
    Url::parse(s).expect("valid URL")
}

/// Properties with the given resource types.
pub fn typed(kinds: &[ResourceKind]) -> Properties {
    Properties {
        resource_type: Some(kinds.to_vec()),
        ..Properties::default()
    }
}

/// A calendar collection.
pub fn calendar(display_name: &str) -> Properties {
    Properties {
        display_name: Some(display_name.to_string()),
        ..typed(&[ResourceKind::Collection, ResourceKind::Calendar])
    }
}

/// A principal listing `home_sets` as calendar home-sets.
pub fn principal_with_calendar_homes(home_sets: &[&str]) -> Properties {
    Properties {
        calendar_home_set: home_sets.iter().map(|h| (*h).into()).collect(),
        ..typed(&[ResourceKind::Principal])
    }
}

#[derive(Debug, Clone)]
enum Reply {
    Multistatus(Vec<(String, Properties, Option<u16>)>),
    Status(u16),
}

/// In-memory [`DavTransport`].
#[derive(Debug, Default)]
pub struct FakeTransport {
    propfinds: Mutex<HashMap<(String, &'static str), Reply>>,
    options: Mutex<HashMap<String, Vec<String>>>,
    requests: Mutex<Vec<(String, &'static str)>>,
}

impl FakeTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Answers PROPFIND on `url` with one response per `(href, props)`.
    pub fn on_propfind(&self, url: &str, depth: Depth, responses: Vec<(&str, Properties)>) {
        let responses = responses
            .into_iter()
            .map(|(href, props)| (href.to_string(), props, None))
            .collect();
        self.set(url, depth, Reply::Multistatus(responses));
    }

    /// Answers PROPFIND on `url` with a single response carrying `status`.
    pub fn on_propfind_status_item(&self, url: &str, depth: Depth, status: u16) {
        let responses = vec![(url.to_string(), Properties::default(), Some(status))];
        self.set(url, depth, Reply::Multistatus(responses));
    }

    /// Fails PROPFIND on `url` with HTTP `code`.
    pub fn fail_propfind(&self, url: &str, depth: Depth, code: u16) {
        self.set(url, depth, Reply::Status(code));
    }

    /// Announces `tokens` in the `DAV:` header of `url`.
    pub fn on_options(&self, url: &str, tokens: &[&str]) {
        self.options.lock().unwrap().insert(
            url.to_string(),
            tokens.iter().map(ToString::to_string).collect(),
        );
    }

    /// Number of PROPFIND requests made to `url`, any depth.
    pub fn propfind_count(&self, url: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(u, method)| u == url && *method != "OPTIONS")
            .count()
    }

    /// Every request as `(url, depth or "OPTIONS")`, in order.
    pub fn requests(&self) -> Vec<(String, &'static str)> {
        self.requests.lock().unwrap().clone()
    }

    fn set(&self, url: &str, depth: Depth, reply: Reply) {
        self.propfinds
            .lock()
            .unwrap()
            .insert((url.to_string(), depth.header_value()), reply);
    }
}

fn status_error(code: u16, url: &Url) -> DavError {
    match code {
        401 => DavError::Unauthorized {
            url: url.to_string(),
        },
        code => DavError::Status {
            code,
            url: url.to_string(),
        },
    }
}

#[async_trait]
impl DavTransport for FakeTransport {
    async fn propfind(
        &self,
        url: &Url,
        depth: Depth,
        _props: &[Prop],
    ) -> Result<Vec<DavResponse>, DavError> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), depth.header_value()));

        let reply = self
            .propfinds
            .lock()
            .unwrap()
            .get(&(url.to_string(), depth.header_value()))
            .cloned();
        match reply {
            Some(Reply::Multistatus(items)) => Ok(items
                .into_iter()
                .map(|(href, props, status)| {
                    let href = url.join(&href).expect("valid href");
                    DavResponse {
                        relation: HrefRelation::classify(url, &href),
                        url: href,
                        status,
                        props,
                    }
                })
                .collect()),
            Some(Reply::Status(code)) => Err(status_error(code, url)),
            None => Err(status_error(404, url)),
        }
    }

    async fn options(&self, url: &Url) -> Result<Capabilities, DavError> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_string(), "OPTIONS"));

        match self.options.lock().unwrap().get(url.as_str()) {
            Some(tokens) => Ok(Capabilities::from_header_values(
                tokens.iter().map(String::as_str),
            )),
            None => Err(status_error(404, url)),
        }
    }
}

/// [`DnsResolver`] with fixed records.
#[derive(Debug, Default)]
pub struct FakeDns {
    srv: HashMap<String, Vec<SrvRecord>>,
    txt: HashMap<String, Vec<Vec<String>>>,
}

impl FakeDns {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_srv(mut self, name: &str, target: &str, port: u16) -> Self {
        self.srv.entry(name.to_string()).or_default().push(SrvRecord {
            priority: 0,
            weight: 0,
            port,
            target: target.to_string(),
        });
        self
    }

    pub fn with_txt(mut self, name: &str, value: &str) -> Self {
        self.txt
            .entry(name.to_string())
            .or_default()
            .push(vec![value.to_string()]);
        self
    }
}

#[async_trait]
impl DnsResolver for FakeDns {
    async fn srv(&self, name: &str) -> Result<Vec<SrvRecord>, DavError> {
        Ok(self.srv.get(name).cloned().unwrap_or_default())
    }

    async fn txt(&self, name: &str) -> Result<Vec<Vec<String>>, DavError> {
        Ok(self.txt.get(name).cloned().unwrap_or_default())
    }
}

/// A session over `transport` and `dns` with the given preselection policy.
pub fn session(
    transport: Arc<FakeTransport>,
    dns: FakeDns,
    policy: PreselectPolicy,
) -> DiscoverySession {
    DiscoverySession::new(
        transport,
        Arc::new(dns),
        Settings::new(policy, None).expect("valid settings"),
        Cancellation::new(),
    )
}

/// An in-memory database.
pub async fn setup_db() -> Db {
    Db::open(None).await.expect("Failed to create test database")
}

/// Configuration with an in-memory database and the given policy.
pub fn config(policy: PreselectPolicy) -> Config {
    Config {
        preselect: policy,
        ..Config::default()
    }
}
