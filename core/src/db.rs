// SPDX-FileCopyrightText: 2025-2026 davsync contributors
//
// SPDX-License-Identifier: Apache-2.0

mod collections;
mod homesets;
mod principals;
mod services;

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use davsync_dav::{ServiceType, Url};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

pub use crate::db::collections::Collections;
pub use crate::db::homesets::HomeSets;
pub use crate::db::principals::Principals;
pub use crate::db::services::Services;
use crate::discovery::ServiceInfo;
use crate::local::{LocalKind, LocalStore};
use crate::{Error, Settings};

/// Distinguishes in-memory databases opened by one process.
static IN_MEMORY_DB_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// The persisted service, home-set, collection and principal graph.
#[derive(Debug, Clone)]
pub struct Db {
    pool: SqlitePool,

    pub services: Services,
    pub homesets: HomeSets,
    pub collections: Collections,
    pub principals: Principals,
}

impl Db {
    /// Opens a sqlite database connection.
    /// If `filename` is `None`, it opens an in-memory database.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated.
    pub async fn open(filename: Option<&Path>) -> Result<Self, Error> {
        let pool = if let Some(filename) = filename {
            tracing::info!(path = %filename.display(), "connecting to SQLite database");
            let options = SqliteConnectOptions::new()
                .filename(filename)
                .create_if_missing(true);
            SqlitePoolOptions::new().connect_with(options).await?
        } else {
            tracing::info!("connecting to in-memory SQLite database");
            let db_id = IN_MEMORY_DB_COUNTER.fetch_add(1, Ordering::SeqCst);
            let options = SqliteConnectOptions::new()
                .filename(format!("file:davsync_mem_{db_id}?mode=memory&cache=shared"))
                .in_memory(true)
                .shared_cache(true);
            // the database lives only as long as a connection to it
            SqlitePoolOptions::new()
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await?
        };

        sqlx::migrate!("src/db/migrations") // relative path from the crate root
            .run(&pool)
            .await?;

        tracing::debug!("database ready");
        Ok(Self {
            services: Services::new(pool.clone()),
            homesets: HomeSets::new(pool.clone()),
            collections: Collections::new(pool.clone()),
            principals: Principals::new(pool.clone()),
            pool,
        })
    }

    /// Local resource store for one local collection.
    #[must_use]
    pub fn local_store(&self, collection: &str, kind: LocalKind) -> LocalStore {
        LocalStore::new(self.pool.clone(), collection, kind)
    }

    /// Persists one discovery result as the `service_type` service of `account`.
    ///
    /// Home-sets found during discovery are stored as personal. Collections
    /// are stored with `sync` set by the preselection policy.
    ///
    /// # Errors
    ///
    /// Returns an error if a database write fails.
    #[tracing::instrument(skip(self, info, settings))]
    pub async fn save_service_info(
        &self,
        account: &str,
        service_type: ServiceType,
        info: &ServiceInfo,
        settings: &Settings,
    ) -> Result<i64, Error> {
        let service_id = self
            .services
            .upsert(account, service_type, info.principal.as_ref())
            .await?;

        for url in &info.home_sets {
            self.homesets.upsert_by_url(service_id, url, true, None).await?;
        }

        if let Some(principal) = &info.principal {
            self.principals.get_or_create(service_id, principal).await?;
        }

        for collection in &info.collections {
            let mut collection = collection.clone();
            collection.service_id = service_id;
            collection.sync = settings.should_preselect(&collection.url, true);
            self.collections.upsert_by_url(&collection).await?;
        }

        tracing::info!(
            service_id,
            home_sets = info.home_sets.len(),
            collections = info.collections.len(),
            "service saved"
        );
        Ok(service_id)
    }

    /// Closes the connection pool.
    pub async fn close(self) {
        tracing::debug!("closing database connection");
        self.pool.close().await;
    }
}

pub(crate) fn parse_stored_url(url: &str) -> Result<Url, Error> {
    Url::parse(url).map_err(|e| Error::InvalidStoredUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })
}


#[cfg(test)]
mod tests {
    use super::tests_utils::*;
    use super::*;

    #[tokio::test]
    async fn in_memory_databases_are_separate() {
        let a = setup_test_db().await;
        let b = setup_test_db().await;
        test_service(&a, ServiceType::CalDav).await;

        assert_eq!(a.services.by_account("alice").await.unwrap().len(), 1);
        assert!(b.services.by_account("alice").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn save_service_info_persists_discovery() {
        let db = setup_test_db().await;
        let settings = Settings::new(crate::PreselectPolicy::Personal, None).unwrap();

        let principal = url("https://dav.example.com/principals/alice/");
        let info = ServiceInfo {
            principal: Some(principal.clone()),
            home_sets: vec![url("https://dav.example.com/calendars/alice/")],
            collections: vec![test_collection(0, "https://dav.example.com/calendars/alice/work/")],
            emails: vec!["alice@example.com".to_string()],
        };

        let service_id = db
            .save_service_info("alice", ServiceType::CalDav, &info, &settings)
            .await
            .unwrap();

        let service = db.services.get(service_id).await.unwrap().unwrap();
        assert_eq!(service.principal, Some(principal));

        let home_sets = db.homesets.by_service(service_id).await.unwrap();
        assert_eq!(home_sets.len(), 1);
        assert!(home_sets[0].personal);

        let collections = db.collections.by_service(service_id).await.unwrap();
        assert_eq!(collections.len(), 1);
        assert!(collections[0].sync);
        assert_eq!(collections[0].homeset_id, None);

        assert_eq!(db.principals.by_service(service_id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn file_database_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("davsync.db");

        let db = Db::open(Some(&path)).await.unwrap();
        let id = test_service(&db, ServiceType::CardDav).await;
        db.close().await;

        let db = Db::open(Some(&path)).await.unwrap();
        let service = db.services.get(id).await.unwrap().unwrap();
        assert_eq!(service.service_type, ServiceType::CardDav);
    }
}
