// SPDX-FileCopyrightText: 2025-2026 davsync contributors
//
// SPDX-License-Identifier: Apache-2.0

//! DNS-based service location (RFC 6764 §6, RFC 2782).

use async_trait::async_trait;
use hickory_resolver::TokioAsyncResolver;
use hickory_resolver::config::{ResolverConfig, ResolverOpts};
use hickory_resolver::error::{ResolveError, ResolveErrorKind};
use rand::Rng;
use reqwest::Url;

use crate::cancel::Cancellation;
use crate::error::DavError;
use crate::types::ServiceType;

/// A DNS SRV record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrvRecord {
    /// Lower values are preferred.
    pub priority: u16,
    /// Relative weight among records of equal priority.
    pub weight: u16,
    /// Target port.
    pub port: u16,
    /// Target host, without the trailing dot.
    pub target: String,
}

/// DNS lookups needed for service location.
#[async_trait]
pub trait DnsResolver: Send + Sync {
    /// SRV records for `name`. A name without records yields an empty list.
    async fn srv(&self, name: &str) -> Result<Vec<SrvRecord>, DavError>;

    /// TXT records for `name`, each as its list of character-strings.
    async fn txt(&self, name: &str) -> Result<Vec<Vec<String>>, DavError>;
}

/// [`DnsResolver`] backed by the system resolver configuration.
#[derive(Debug, Clone)]
pub struct HickoryResolver {
    resolver: TokioAsyncResolver,
}

impl HickoryResolver {
    /// Builds a resolver from `/etc/resolv.conf` (or the platform equivalent),
    /// falling back to hickory's default upstreams.
    #[must_use]
    pub fn from_system_conf() -> Self {
        let resolver = TokioAsyncResolver::tokio_from_system_conf().unwrap_or_else(|err| {
            tracing::warn!(%err, "no usable system DNS configuration, using defaults");
            TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
        });
        Self { resolver }
    }
}

fn is_no_records(err: &ResolveError) -> bool {
    matches!(err.kind(), ResolveErrorKind::NoRecordsFound { .. })
}

#[async_trait]
impl DnsResolver for HickoryResolver {
    async fn srv(&self, name: &str) -> Result<Vec<SrvRecord>, DavError> {
        match self.resolver.srv_lookup(name).await {
            Ok(lookup) => Ok(lookup
                .iter()
                .map(|srv| SrvRecord {
                    priority: srv.priority(),
                    weight: srv.weight(),
                    port: srv.port(),
                    target: srv.target().to_utf8().trim_end_matches('.').to_string(),
                })
                .collect()),
            Err(err) if is_no_records(&err) => Ok(Vec::new()),
            Err(err) => Err(DavError::Dns(format!("SRV {name}: {err}"))),
        }
    }

    async fn txt(&self, name: &str) -> Result<Vec<Vec<String>>, DavError> {
        match self.resolver.txt_lookup(name).await {
            Ok(lookup) => Ok(lookup
                .iter()
                .map(|txt| {
                    txt.txt_data()
                        .iter()
                        .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
                        .collect()
                })
                .collect()),
            Err(err) if is_no_records(&err) => Ok(Vec::new()),
            Err(err) => Err(DavError::Dns(format!("TXT {name}: {err}"))),
        }
    }
}

/// Selects the SRV record to use per RFC 2782.
///
/// Only records with the lowest priority take part. Among them, record `i`
/// wins with probability `weight_i / sum(weights)`; if every weight is 0 the
/// choice is uniform. Returns `None` for an empty slice.
pub fn select_srv_record<'a, R>(records: &'a [SrvRecord], rng: &mut R) -> Option<&'a SrvRecord>
where
    R: Rng + ?Sized,
{
    let min_priority = records.iter().map(|r| r.priority).min()?;

    // zero-weight records first
    let mut candidates: Vec<&SrvRecord> = records
        .iter()
        .filter(|r| r.priority == min_priority)
        .collect();
    candidates.sort_by_key(|r| r.weight != 0);

    let total: u32 = candidates.iter().map(|r| u32::from(r.weight)).sum();
    if total == 0 {
        let index = rng.gen_range(0..candidates.len());
        return candidates.get(index).copied();
    }

    let threshold = rng.gen_range(1..=total);
    let mut running = 0u32;
    for &record in &candidates {
        running += u32::from(record.weight);
        if running >= threshold {
            return Some(record);
        }
    }
    candidates.last().copied()
}

/// Extracts `path=` values from TXT records (RFC 6764 §4).
#[must_use]
pub fn paths_from_txt_records(records: &[Vec<String>]) -> Vec<String> {
    records
        .iter()
        .filter_map(|strings| {
            let joined = strings.concat();
            let path = joined.trim().strip_prefix("path=")?.trim().to_string();
            (!path.is_empty()).then_some(path)
        })
        .collect()
}

/// Candidate initial-context paths: TXT paths first, then the well-known
/// path, then the root. Duplicates keep their first position.
#[must_use]
pub fn initial_context_paths(txt_paths: &[String], service: ServiceType) -> Vec<String> {
    let well_known = format!("/.well-known/{}", service.well_known_name());
    let mut paths: Vec<String> = Vec::new();
    for path in txt_paths
        .iter()
        .map(String::as_str)
        .chain([well_known.as_str(), "/"])
    {
        if !paths.iter().any(|p| p == path) {
            paths.push(path.to_string());
        }
    }
    paths
}

/// Where a service is located according to DNS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceLocation {
    /// Host to connect to.
    pub host: String,
    /// TLS port.
    pub port: u16,
    /// Candidate initial-context paths, in the order to try them.
    pub paths: Vec<String>,
}

impl ServiceLocation {
    /// Candidate `https` URLs, one per path.
    ///
    /// # Errors
    ///
    /// Returns [`DavError::InvalidUrl`] if the host is not a valid URL host.
    pub fn urls(&self) -> Result<Vec<Url>, DavError> {
        let base = Url::parse(&format!("https://{}:{}/", self.host, self.port))
            .map_err(|e| DavError::InvalidUrl(format!("{}:{}: {e}", self.host, self.port)))?;
        let mut urls = Vec::with_capacity(self.paths.len());
        for path in &self.paths {
            let mut url = base.clone();
            if path.starts_with('/') {
                url.set_path(path);
            } else {
                url.set_path(&format!("/{path}"));
            }
            urls.push(url);
        }
        Ok(urls)
    }
}

/// Looks up SRV and TXT records for `service` at `domain`.
///
/// DNS failures are logged and treated as "no records": the bare domain on
/// port 443 is used and only the fallback paths are returned.
///
/// # Errors
///
/// Returns [`DavError::Cancelled`] if the job was cancelled; nothing else.
pub async fn locate_service(
    resolver: &dyn DnsResolver,
    domain: &str,
    service: ServiceType,
    cancel: &Cancellation,
) -> Result<ServiceLocation, DavError> {
    let name = format!("{}.{domain}", service.srv_label());

    let records = match cancel.run(resolver.srv(&name)).await {
        Ok(records) => records,
        Err(DavError::Cancelled) => return Err(DavError::Cancelled),
        Err(err) => {
            tracing::debug!(%name, %err, "SRV lookup failed");
            Vec::new()
        }
    };
    // target "." means the service is decidedly not available there
    let records: Vec<SrvRecord> = records
        .into_iter()
        .filter(|r| !r.target.is_empty() && r.target != ".")
        .collect();

    let selected = {
        let mut rng = rand::thread_rng();
        select_srv_record(&records, &mut rng).cloned()
    };
    let (host, port) = match selected {
        Some(record) => {
            tracing::debug!(%name, target = %record.target, port = record.port, "using SRV record");
            (record.target, record.port)
        }
        None => (domain.to_string(), 443),
    };

    let txt = match cancel.run(resolver.txt(&name)).await {
        Ok(txt) => txt,
        Err(DavError::Cancelled) => return Err(DavError::Cancelled),
        Err(err) => {
            tracing::debug!(%name, %err, "TXT lookup failed");
            Vec::new()
        }
    };

    Ok(ServiceLocation {
        host,
        port,
        paths: initial_context_paths(&paths_from_txt_records(&txt), service),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn srv(priority: u16, weight: u16, target: &str) -> SrvRecord {
        SrvRecord {
            priority,
            weight,
            port: 443,
            target: target.to_string(),
        }
    }

    fn frequencies(records: &[SrvRecord], trials: usize) -> HashMap<String, usize> {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        let mut counts = HashMap::new();
        for _ in 0..trials {
            let chosen = select_srv_record(records, &mut rng).unwrap();
            *counts.entry(chosen.target.clone()).or_insert(0) += 1;
        }
        counts
    }

    #[test]
    fn select_prefers_lowest_priority() {
        let records = [srv(20, 100, "backup"), srv(10, 0, "primary")];
        let counts = frequencies(&records, 200);
        assert_eq!(counts.get("primary"), Some(&200));
    }

    #[test]
    fn select_follows_weights() {
        let records = [srv(10, 10, "a"), srv(10, 30, "b"), srv(10, 60, "c"), srv(20, 50, "d")];
        let trials = 60_000;
        let counts = frequencies(&records, trials);

        assert!(!counts.contains_key("d"));
        for (target, weight) in [("a", 0.1), ("b", 0.3), ("c", 0.6)] {
            #[allow(clippy::cast_precision_loss)]
            let observed = counts.get(target).copied().unwrap_or(0) as f64 / trials as f64;
            assert!(
                (observed - weight).abs() < 0.02,
                "{target}: observed {observed}, expected {weight}"
            );
        }
    }

    #[test]
    fn select_uniform_when_all_weights_zero() {
        let records = [srv(0, 0, "a"), srv(0, 0, "b"), srv(0, 0, "c"), srv(0, 0, "d")];
        let trials = 40_000;
        let counts = frequencies(&records, trials);
        for target in ["a", "b", "c", "d"] {
            #[allow(clippy::cast_precision_loss)]
            let observed = counts.get(target).copied().unwrap_or(0) as f64 / trials as f64;
            assert!((observed - 0.25).abs() < 0.02, "{target}: {observed}");
        }
    }

    #[test]
    fn zero_weight_loses_to_weighted_record() {
        let records = [srv(0, 0, "zero"), srv(0, 5, "weighted")];
        let counts = frequencies(&records, 1_000);
        assert_eq!(counts.get("weighted"), Some(&1_000));
    }

    #[test]
    fn select_from_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(select_srv_record(&[], &mut rng).is_none());
    }

    #[test]
    fn txt_paths_are_extracted() {
        let records = vec![
            vec!["path=/dav/".to_string()],
            vec!["path=/split".to_string(), "/value/".to_string()],
            vec!["v=1".to_string()],
            vec!["path=".to_string()],
        ];
        assert_eq!(
            paths_from_txt_records(&records),
            vec!["/dav/".to_string(), "/split/value/".to_string()]
        );
    }

    #[test]
    fn fallback_paths_come_last() {
        let paths = initial_context_paths(&["/dav/".to_string()], ServiceType::CalDav);
        assert_eq!(paths, vec!["/dav/", "/.well-known/caldav", "/"]);

        let paths = initial_context_paths(&["/".to_string()], ServiceType::CardDav);
        assert_eq!(paths, vec!["/", "/.well-known/carddav"]);
    }

    #[test]
    fn location_urls() {
        let location = ServiceLocation {
            host: "dav.example.com".to_string(),
            port: 8443,
            paths: vec!["/dav/".to_string(), "/".to_string()],
        };
        let urls = location.urls().unwrap();
        assert_eq!(urls[0].as_str(), "https://dav.example.com:8443/dav/");
        assert_eq!(urls[1].as_str(), "https://dav.example.com:8443/");
    }

    struct FailingDns;

    #[async_trait]
    impl DnsResolver for FailingDns {
        async fn srv(&self, _name: &str) -> Result<Vec<SrvRecord>, DavError> {
            Err(DavError::Dns("SERVFAIL".to_string()))
        }

        async fn txt(&self, _name: &str) -> Result<Vec<Vec<String>>, DavError> {
            Err(DavError::Dns("SERVFAIL".to_string()))
        }
    }

    #[tokio::test]
    async fn dns_errors_fall_back_to_domain() {
        let location = locate_service(
            &FailingDns,
            "example.com",
            ServiceType::CardDav,
            &Cancellation::new(),
        )
        .await
        .unwrap();
        assert_eq!(location.host, "example.com");
        assert_eq!(location.port, 443);
        assert_eq!(location.paths, vec!["/.well-known/carddav", "/"]);
    }

    #[tokio::test]
    async fn cancellation_is_not_swallowed() {
        let cancel = Cancellation::new();
        cancel.cancel();
        let err = locate_service(&FailingDns, "example.com", ServiceType::CalDav, &cancel)
            .await
            .unwrap_err();
        assert!(err.is_cancelled());
    }
}
