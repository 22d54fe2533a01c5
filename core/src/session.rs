// SPDX-FileCopyrightText: 2025-2026 davsync contributors
//
// SPDX-License-Identifier: Apache-2.0

//! Context of one discovery or refresh run.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use davsync_dav::{
    Cancellation, Capabilities, DavResponse, DavTransport, Depth, DnsResolver, Prop, Url,
};

use crate::{Error, Settings};

/// Notes collected during one run, in the order they were made.
#[derive(Debug, Default)]
pub struct SessionLog {
    lines: Mutex<Vec<String>>,
}

impl SessionLog {
    /// Appends a note. The note is also emitted as a tracing event.
    pub fn note(&self, line: impl Into<String>) {
        let line = line.into();
        tracing::info!(target: "davsync::session", "{line}");
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line);
    }

    /// Takes every note collected so far.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.lines.lock().unwrap_or_else(PoisonError::into_inner))
    }
}

/// Collaborators and state shared by the steps of one run.
///
/// Every network call made through the session is interrupted when the
/// session's [`Cancellation`] is cancelled.
pub struct DiscoverySession {
    transport: Arc<dyn DavTransport>,
    dns: Arc<dyn DnsResolver>,
    settings: Settings,
    cancel: Cancellation,
    log: SessionLog,
    encountered_401: AtomicBool,
}

impl fmt::Debug for DiscoverySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DiscoverySession")
            .field("settings", &self.settings)
            .field("cancel", &self.cancel)
            .field("encountered_401", &self.encountered_401)
            .finish_non_exhaustive()
    }
}

impl DiscoverySession {
    pub fn new(
        transport: Arc<dyn DavTransport>,
        dns: Arc<dyn DnsResolver>,
        settings: Settings,
        cancel: Cancellation,
    ) -> Self {
        Self {
            transport,
            dns,
            settings,
            cancel,
            log: SessionLog::default(),
            encountered_401: AtomicBool::new(false),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn cancellation(&self) -> &Cancellation {
        &self.cancel
    }

    pub fn dns(&self) -> &dyn DnsResolver {
        self.dns.as_ref()
    }

    pub fn log(&self) -> &SessionLog {
        &self.log
    }

    /// Fails with a cancellation error if the run was cancelled.
    pub fn check_cancelled(&self) -> Result<(), Error> {
        Ok(self.cancel.check()?)
    }

    /// Remembers that a server answered 401.
    pub fn flag_unauthorized(&self) {
        self.encountered_401.store(true, Ordering::Relaxed);
    }

    /// Whether any server answered 401 during this run.
    pub fn encountered_401(&self) -> bool {
        self.encountered_401.load(Ordering::Relaxed)
    }

    pub async fn propfind(
        &self,
        url: &Url,
        depth: Depth,
        props: &[Prop],
    ) -> Result<Vec<DavResponse>, Error> {
        tracing::debug!(%url, depth = depth.header_value(), "PROPFIND");
        Ok(self
            .cancel
            .run(self.transport.propfind(url, depth, props))
            .await?)
    }

    pub async fn options(&self, url: &Url) -> Result<Capabilities, Error> {
        tracing::debug!(%url, "OPTIONS");
        Ok(self.cancel.run(self.transport.options(url)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_keeps_order_and_drains() {
        let log = SessionLog::default();
        log.note("first");
        log.note(String::from("second"));
        assert_eq!(log.take(), vec!["first", "second"]);
        assert!(log.take().is_empty());
    }
}
