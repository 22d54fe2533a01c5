// SPDX-FileCopyrightText: 2025-2026 davsync contributors
//
// SPDX-License-Identifier: Apache-2.0

use davsync_dav::Url;
use sqlx::SqlitePool;

use crate::Error;
use crate::db::parse_stored_url;
use crate::model::Principal;

#[derive(Debug, Clone)]
pub struct Principals {
    pool: SqlitePool,
}

impl Principals {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Returns the id of the principal at `url`, inserting it if needed.
    pub async fn get_or_create(&self, service_id: i64, url: &Url) -> Result<i64, Error> {
        const SQL: &str = "\
INSERT INTO principals (service_id, url)
VALUES (?, ?)
ON CONFLICT(service_id, url) DO UPDATE SET
    url = excluded.url
RETURNING id;
";

        let id = sqlx::query_scalar(SQL)
            .bind(service_id)
            .bind(url.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(id)
    }

    pub async fn update_display_name(
        &self,
        id: i64,
        display_name: Option<&str>,
    ) -> Result<(), Error> {
        const SQL: &str = "UPDATE principals SET display_name = ? WHERE id = ?;";

        sqlx::query(SQL)
            .bind(display_name)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get(&self, id: i64) -> Result<Option<Principal>, Error> {
        const SQL: &str = "SELECT id, service_id, url, display_name FROM principals WHERE id = ?;";

        let record: Option<PrincipalRecord> = sqlx::query_as(SQL)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        record.map(Principal::try_from).transpose()
    }

    pub async fn by_service(&self, service_id: i64) -> Result<Vec<Principal>, Error> {
        const SQL: &str = "\
SELECT id, service_id, url, display_name
FROM principals
WHERE service_id = ?
ORDER BY id;
";

        let records: Vec<PrincipalRecord> = sqlx::query_as(SQL)
            .bind(service_id)
            .fetch_all(&self.pool)
            .await?;
        records.into_iter().map(Principal::try_from).collect()
    }

    /// Deletes the principals of a service that own no collection.
    pub async fn delete_without_collections(&self, service_id: i64) -> Result<u64, Error> {
        const SQL: &str = "\
DELETE FROM principals
WHERE service_id = ?
  AND NOT EXISTS (SELECT 1 FROM collections WHERE collections.owner_id = principals.id);
";

        let result = sqlx::query(SQL)
            .bind(service_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PrincipalRecord {
    id: i64,
    service_id: i64,
    url: String,
    display_name: Option<String>,
}

impl TryFrom<PrincipalRecord> for Principal {
    type Error = Error;

    fn try_from(record: PrincipalRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: record.id,
            service_id: record.service_id,
            url: parse_stored_url(&record.url)?,
            display_name: record.display_name,
        })
    }
}
