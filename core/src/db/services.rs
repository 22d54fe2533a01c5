// SPDX-FileCopyrightText: 2025-2026 davsync contributors
//
// SPDX-License-Identifier: Apache-2.0

use davsync_dav::{ServiceType, Url};
use sqlx::SqlitePool;

use crate::Error;
use crate::db::parse_stored_url;
use crate::model::Service;

#[derive(Debug, Clone)]
pub struct Services {
    pool: SqlitePool,
}

impl Services {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts the service of `account`, or updates its principal. Returns the row id.
    pub async fn upsert(
        &self,
        account: &str,
        service_type: ServiceType,
        principal: Option<&Url>,
    ) -> Result<i64, Error> {
        const SQL: &str = "\
INSERT INTO services (account, type, principal)
VALUES (?, ?, ?)
ON CONFLICT(account, type) DO UPDATE SET
    principal = excluded.principal
RETURNING id;
";

        let id = sqlx::query_scalar(SQL)
            .bind(account)
            .bind(service_type.as_str())
            .bind(principal.map(Url::as_str))
            .fetch_one(&self.pool)
            .await?;
        Ok(id)
    }

    pub async fn get(&self, id: i64) -> Result<Option<Service>, Error> {
        const SQL: &str = "SELECT id, account, type, principal FROM services WHERE id = ?;";

        let record: Option<ServiceRecord> = sqlx::query_as(SQL)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        record.map(Service::try_from).transpose()
    }

    pub async fn by_account(&self, account: &str) -> Result<Vec<Service>, Error> {
        const SQL: &str = "\
SELECT id, account, type, principal
FROM services
WHERE account = ?
ORDER BY type;
";

        let records: Vec<ServiceRecord> = sqlx::query_as(SQL)
            .bind(account)
            .fetch_all(&self.pool)
            .await?;
        records.into_iter().map(Service::try_from).collect()
    }

    pub async fn accounts(&self) -> Result<Vec<String>, Error> {
        const SQL: &str = "SELECT DISTINCT account FROM services ORDER BY account;";

        Ok(sqlx::query_scalar(SQL).fetch_all(&self.pool).await?)
    }

    /// Deletes every service of `account`; home-sets, collections and
    /// principals go with them.
    pub async fn delete_account(&self, account: &str) -> Result<u64, Error> {
        const SQL: &str = "DELETE FROM services WHERE account = ?;";

        let result = sqlx::query(SQL).bind(account).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ServiceRecord {
    id: i64,
    account: String,
    #[sqlx(rename = "type")]
    service_type: String,
    principal: Option<String>,
}

impl TryFrom<ServiceRecord> for Service {
    type Error = Error;

    fn try_from(record: ServiceRecord) -> Result<Self, Self::Error> {
        let service_type = record
            .service_type
            .parse()
            .map_err(|_| Error::UnknownService(record.service_type.clone()))?;
        Ok(Self {
            id: record.id,
            account: record.account,
            service_type,
            principal: record.principal.as_deref().map(parse_stored_url).transpose()?,
        })
    }
}
