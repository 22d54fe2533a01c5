// SPDX-FileCopyrightText: 2025-2026 davsync contributors
//
// SPDX-License-Identifier: Apache-2.0

use std::fmt;
use std::sync::Arc;

use davsync_dav::{Cancellation, DavClient, DavTransport, DnsResolver, HickoryResolver, ServiceType, Url};
use tokio::fs;

use crate::db::Db;
use crate::discovery::{Configuration, find_initial_configuration};
use crate::model::{Collection, Service};
use crate::refresh::{RefreshJob, RefreshStats};
use crate::{Config, DiscoverySession, Error, Settings};

/// Discovery and refresh of `CalDAV`/`CardDAV` accounts.
#[derive(Clone)]
pub struct Davsync {
    config: Config,
    settings: Settings,
    db: Db,
    transport: Arc<dyn DavTransport>,
    dns: Arc<dyn DnsResolver>,
}

impl fmt::Debug for Davsync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Davsync")
            .field("config", &self.config)
            .field("db", &self.db)
            .finish_non_exhaustive()
    }
}

impl Davsync {
    /// Creates an instance with the given configuration, using the network and
    /// the system DNS configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the database
    /// cannot be opened.
    pub async fn new(mut config: Config) -> Result<Self, Error> {
        config.normalize()?;
        prepare(&config).await?;

        let db = Db::open(config.db_path().as_deref()).await?;
        let transport = Arc::new(DavClient::new(config.dav.clone())?);
        let dns = Arc::new(HickoryResolver::from_system_conf());
        Self::with_backends(config, db, transport, dns)
    }

    /// Creates an instance over the given database, transport and resolver.
    ///
    /// # Errors
    ///
    /// Returns an error if the preselection exclusion pattern is invalid.
    pub fn with_backends(
        config: Config,
        db: Db,
        transport: Arc<dyn DavTransport>,
        dns: Arc<dyn DnsResolver>,
    ) -> Result<Self, Error> {
        let settings = Settings::from_config(&config)?;
        Ok(Self {
            config,
            settings,
            db,
            transport,
            dns,
        })
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn db(&self) -> &Db {
        &self.db
    }

    /// Starts a new run that stops when `cancel` is cancelled.
    #[must_use]
    pub fn session(&self, cancel: Cancellation) -> DiscoverySession {
        DiscoverySession::new(
            self.transport.clone(),
            self.dns.clone(),
            self.settings.clone(),
            cancel,
        )
    }

    /// Discovers the services behind `input` without storing anything.
    ///
    /// # Errors
    ///
    /// Returns an error only if cancelled.
    pub async fn discover(&self, input: &Url, cancel: Cancellation) -> Result<Configuration, Error> {
        let session = self.session(cancel);
        find_initial_configuration(&session, input).await
    }

    /// Discovers the services behind `input` and stores every one found as
    /// a service of `account`.
    ///
    /// # Errors
    ///
    /// Returns an error if cancelled or a database write fails.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn add_account(
        &self,
        account: &str,
        input: &Url,
        cancel: Cancellation,
    ) -> Result<Configuration, Error> {
        let config = self.discover(input, cancel).await?;
        for service in ServiceType::ALL {
            if let Some(info) = config.service(service) {
                self.db
                    .save_service_info(account, service, info, &self.settings)
                    .await?;
            }
        }
        Ok(config)
    }

    /// Refreshes the services of `account`, or only the one of type `only`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the account has no matching service,
    /// otherwise the first failed refresh job.
    #[tracing::instrument(skip(self, cancel))]
    pub async fn refresh(
        &self,
        account: &str,
        only: Option<ServiceType>,
        cancel: Cancellation,
    ) -> Result<Vec<(ServiceType, RefreshStats)>, Error> {
        let services: Vec<Service> = self
            .db
            .services
            .by_account(account)
            .await?
            .into_iter()
            .filter(|s| only.is_none_or(|t| t == s.service_type))
            .collect();
        if services.is_empty() {
            return Err(Error::NotFound(format!("account {account}")));
        }

        let mut results = Vec::with_capacity(services.len());
        for service in services {
            let session = self.session(cancel.clone());
            let stats = RefreshJob::new(&self.db, &session).run(service.id).await?;
            results.push((service.service_type, stats));
        }
        Ok(results)
    }

    /// Names of every stored account.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn accounts(&self) -> Result<Vec<String>, Error> {
        self.db.services.accounts().await
    }

    /// Deletes `account` together with its home-sets, collections and
    /// principals.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no such account.
    #[tracing::instrument(skip(self))]
    pub async fn remove_account(&self, account: &str) -> Result<(), Error> {
        match self.db.services.delete_account(account).await? {
            0 => Err(Error::NotFound(format!("account {account}"))),
            n => {
                tracing::info!(services = n, "account removed");
                Ok(())
            }
        }
    }

    /// The services of `account` with their stored collections.
    ///
    /// # Errors
    ///
    /// Returns an error if a database query fails.
    pub async fn collections(&self, account: &str) -> Result<Vec<(Service, Vec<Collection>)>, Error> {
        let mut result = Vec::new();
        for service in self.db.services.by_account(account).await? {
            let collections = self.db.collections.by_service(service.id).await?;
            result.push((service, collections));
        }
        Ok(result)
    }

    /// Enables or disables synchronization of a collection.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if there is no such collection.
    pub async fn set_sync(&self, collection_id: i64, sync: bool) -> Result<(), Error> {
        self.db.collections.set_sync(collection_id, sync).await
    }

    /// Close the instance, releasing the database.
    pub async fn close(self) {
        self.db.close().await;
    }
}

async fn prepare(config: &Config) -> Result<(), Error> {
    if let Some(parent) = &config.state_dir {
        tracing::info!(path = %parent.display(), "ensuring state directory exists");
        fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::Config(format!("Failed to create state directory: {e}")))?;
    }
    Ok(())
}
