// SPDX-FileCopyrightText: 2025-2026 davsync contributors
//
// SPDX-License-Identifier: Apache-2.0

//! Cooperative cancellation for discovery and refresh jobs.

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::DavError;

/// Handle shared between a running job and whoever may cancel it.
///
/// Every network call made on behalf of a job goes through [`Cancellation::run`],
/// so cancelling surfaces as [`DavError::Cancelled`] at the next await point
/// instead of being mistaken for a timeout.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    token: CancellationToken,
}

impl Cancellation {
    /// Creates a handle that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation of the job.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Fails with [`DavError::Cancelled`] if cancellation was requested.
    ///
    /// # Errors
    ///
    /// Returns [`DavError::Cancelled`] after [`Cancellation::cancel`] was called.
    pub fn check(&self) -> Result<(), DavError> {
        if self.token.is_cancelled() {
            Err(DavError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Drives `fut` to completion unless the job is cancelled first.
    ///
    /// # Errors
    ///
    /// Returns [`DavError::Cancelled`] when cancelled, otherwise the error of `fut`.
    pub async fn run<T, E, F>(&self, fut: F) -> Result<T, E>
    where
        F: Future<Output = Result<T, E>>,
        E: From<DavError>,
    {
        self.check()?;
        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(DavError::Cancelled.into()),
            result = fut => result,
        }
    }
}
