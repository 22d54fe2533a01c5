// SPDX-FileCopyrightText: 2025-2026 davsync contributors
//
// SPDX-License-Identifier: Apache-2.0

//! Discovery of `CalDAV`/`CardDAV` services and reconciliation of their collections.

mod config;
mod db;
mod discovery;
mod engine;
mod error;
mod local;
mod model;
mod refresh;
mod session;
mod settings;

pub use crate::config::{APP_NAME, Config, DB_FILE_NAME, PreselectPolicy};
pub use crate::db::{Collections, Db, HomeSets, Principals, Services};
pub use crate::discovery::{
    Configuration, FoundHomeSet, ServiceInfo, current_user_principal, discover_homesets,
    find_initial_configuration,
};
pub use crate::engine::Davsync;
pub use crate::error::Error;
pub use crate::local::{
    FLAG_REMOTELY_PRESENT, LocalCollection, LocalKind, LocalResource, LocalStore, NewResource,
    StoredResource,
};
pub use crate::model::{Collection, CollectionType, HomeSet, Principal, Service, owner_url};
pub use crate::refresh::{RefreshJob, RefreshStats};
pub use crate::session::{DiscoverySession, SessionLog};
pub use crate::settings::Settings;
