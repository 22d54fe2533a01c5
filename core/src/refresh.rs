// SPDX-FileCopyrightText: 2025-2026 davsync contributors
//
// SPDX-License-Identifier: Apache-2.0

//! Bringing the stored collections of a service up to date.

mod collections;
mod homeless;
mod principals;

use davsync_dav::DavResponse;

use crate::db::Db;
use crate::discovery::discover_homesets;
use crate::model::owner_url;
use crate::{DiscoverySession, Error};

/// Counts of what one refresh changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshStats {
    /// Home-sets queried.
    pub home_sets: usize,
    /// Home-sets deleted because the server says they are gone.
    pub home_sets_removed: usize,
    /// Collections stored from home-set listings.
    pub collections: usize,
    /// Collections no home-set lists anymore.
    pub collections_orphaned: usize,
    /// Homeless collections deleted.
    pub homeless_removed: usize,
    /// Principals deleted because they own no collection.
    pub principals_removed: u64,
}

/// One refresh of one service.
///
/// Steps run in order: home-set discovery from the principal, collections of
/// every home-set, homeless collections, principals. A 401 anywhere fails the
/// job.
#[derive(Debug)]
pub struct RefreshJob<'a> {
    db: &'a Db,
    session: &'a DiscoverySession,
}

impl<'a> RefreshJob<'a> {
    pub fn new(db: &'a Db, session: &'a DiscoverySession) -> Self {
        Self { db, session }
    }

    /// Runs the job for the service with id `service_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] for an unknown service, otherwise the
    /// first fatal network or database error, or cancellation.
    #[tracing::instrument(skip(self))]
    pub async fn run(&self, service_id: i64) -> Result<RefreshStats, Error> {
        let service = self
            .db
            .services
            .get(service_id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("service {service_id}")))?;
        let mut stats = RefreshStats::default();

        if let Some(principal) = &service.principal {
            for home_set in discover_homesets(self.session, service.service_type, principal).await? {
                self.db
                    .homesets
                    .upsert_by_url(service.id, &home_set.url, home_set.personal, None)
                    .await?;
            }
        }

        self.session.check_cancelled()?;
        collections::refresh(self.db, self.session, &service, &mut stats).await?;

        self.session.check_cancelled()?;
        homeless::refresh(self.db, self.session, &service, &mut stats).await?;

        self.session.check_cancelled()?;
        principals::refresh(self.db, self.session, &service, &mut stats).await?;

        tracing::info!(?stats, "refresh finished");
        Ok(stats)
    }
}

/// Stores the owner of `response` as a principal and returns its id.
async fn resolve_owner(
    db: &Db,
    service_id: i64,
    response: &DavResponse,
) -> Result<Option<i64>, Error> {
    match owner_url(response) {
        Some(owner) => Ok(Some(db.principals.get_or_create(service_id, &owner).await?)),
        None => Ok(None),
    }
}
