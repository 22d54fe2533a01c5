// SPDX-FileCopyrightText: 2025-2026 davsync contributors
//
// SPDX-License-Identifier: Apache-2.0

//! Contract between the sync engine and local storage of contacts, events and tasks.

mod store;

use std::fmt;

use async_trait::async_trait;

pub use crate::local::store::{LocalStore, NewResource, StoredResource};
use crate::Error;

/// Flag of a resource that the last remote listing contained.
pub const FLAG_REMOTELY_PRESENT: i64 = 1;

/// What a local collection stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalKind {
    /// vCards.
    Contact,
    /// `VEVENT`s.
    Event,
    /// `VTODO`s.
    Task,
}

impl LocalKind {
    /// Stable name, also used in storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Contact => "contact",
            Self::Event => "event",
            Self::Task => "task",
        }
    }

    /// File name extension of uploaded resources.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Contact => "vcf",
            Self::Event | Self::Task => "ics",
        }
    }

    /// The `SEQUENCE` a dirty resource is uploaded with (RFC 5545 §3.8.7.4).
    ///
    /// A first local edit gets 0. Events scheduled with others are only
    /// incremented by their organizer; contacts have no sequence.
    #[must_use]
    pub fn next_sequence(
        self,
        current: Option<i64>,
        group_scheduled: bool,
        is_organizer: bool,
    ) -> Option<i64> {
        match (self, current) {
            (Self::Contact, current) => current,
            (Self::Event | Self::Task, None) => Some(0),
            (Self::Event, Some(seq)) if group_scheduled && !is_organizer => Some(seq),
            (Self::Event | Self::Task, Some(seq)) => Some(seq + 1),
        }
    }
}

impl fmt::Display for LocalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One locally stored resource.
#[async_trait]
pub trait LocalResource: Sized + Send + Sync {
    /// File name on the server, `None` until first uploaded.
    fn name(&self) -> Option<&str>;

    /// `ETag` of the last known server version.
    fn etag(&self) -> Option<&str>;

    /// `Schedule-Tag` of the last known server version.
    fn schedule_tag(&self) -> Option<&str>;

    /// Sync flags, see [`FLAG_REMOTELY_PRESENT`].
    fn flags(&self) -> i64;

    /// Changed locally since the last upload.
    fn is_dirty(&self) -> bool;

    /// Deleted locally, waiting for the server delete.
    fn is_deleted(&self) -> bool;

    /// Replaces the sync flags.
    async fn update_flags(&mut self, flags: i64) -> Result<(), Error>;

    /// Marks the resource as in sync with the server version it was uploaded as.
    async fn clear_dirty(
        &mut self,
        etag: Option<&str>,
        schedule_tag: Option<&str>,
    ) -> Result<(), Error>;

    /// Assigns a file name to a resource that has none, and returns the name.
    async fn prepare_for_upload(&mut self) -> Result<String, Error>;

    /// Removes the resource from local storage.
    async fn delete(self) -> Result<(), Error>;
}

/// One local collection, as seen by synchronization.
///
/// Resources removed on the server are found by mark and sweep: every clean
/// resource is unmarked, those in the remote listing are marked
/// [`FLAG_REMOTELY_PRESENT`], and the clean ones left unmarked are deleted.
/// Dirty resources are never swept.
#[async_trait]
pub trait LocalCollection: Send + Sync {
    /// Resource type of this collection.
    type Resource: LocalResource;

    /// Resources deleted locally.
    async fn find_deleted(&self) -> Result<Vec<Self::Resource>, Error>;

    /// Resources changed locally, with `SEQUENCE` already advanced.
    async fn find_dirty(&self) -> Result<Vec<Self::Resource>, Error>;

    async fn find_by_name(&self, name: &str) -> Result<Option<Self::Resource>, Error>;

    /// Sets `flags` on every clean resource. Returns the number of resources.
    async fn mark_not_dirty(&self, flags: i64) -> Result<u64, Error>;

    /// Deletes every clean resource whose flags equal `flags`.
    async fn remove_not_dirty_marked(&self, flags: i64) -> Result<u64, Error>;

    /// Forgets all `ETag`s, so the next sync compares contents.
    async fn forget_etags(&self) -> Result<(), Error>;

    /// Applies a remote listing. Returns the number of local resources deleted.
    async fn reconcile(&self, remote_names: &[String]) -> Result<u64, Error> {
        self.mark_not_dirty(0).await?;
        for name in remote_names {
            if let Some(mut resource) = self.find_by_name(name).await? {
                resource.update_flags(FLAG_REMOTELY_PRESENT).await?;
            }
        }
        let removed = self.remove_not_dirty_marked(0).await?;
        tracing::debug!(remote = remote_names.len(), removed, "local collection reconciled");
        Ok(removed)
    }
}
