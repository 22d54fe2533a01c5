// SPDX-FileCopyrightText: 2025-2026 davsync contributors
//
// SPDX-License-Identifier: Apache-2.0

use davsync_dav::Url;
use sqlx::SqlitePool;

use crate::Error;
use crate::db::parse_stored_url;
use crate::model::HomeSet;

#[derive(Debug, Clone)]
pub struct HomeSets {
    pool: SqlitePool,
}

impl HomeSets {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts a home-set or updates the one with the same URL, keeping its
    /// `priv_bind`. A missing display name does not clear a stored one.
    pub async fn upsert_by_url(
        &self,
        service_id: i64,
        url: &Url,
        personal: bool,
        display_name: Option<&str>,
    ) -> Result<i64, Error> {
        const SQL: &str = "\
INSERT INTO homesets (service_id, url, personal, display_name)
VALUES (?, ?, ?, ?)
ON CONFLICT(service_id, url) DO UPDATE SET
    personal     = excluded.personal,
    display_name = COALESCE(excluded.display_name, homesets.display_name)
RETURNING id;
";

        let id = sqlx::query_scalar(SQL)
            .bind(service_id)
            .bind(url.as_str())
            .bind(personal)
            .bind(display_name)
            .fetch_one(&self.pool)
            .await?;
        Ok(id)
    }

    /// Stores what the home-set reports about itself.
    pub async fn update_self_props(
        &self,
        id: i64,
        display_name: Option<&str>,
        priv_bind: bool,
    ) -> Result<(), Error> {
        const SQL: &str = "UPDATE homesets SET display_name = ?, priv_bind = ? WHERE id = ?;";

        sqlx::query(SQL)
            .bind(display_name)
            .bind(priv_bind)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn get(&self, id: i64) -> Result<Option<HomeSet>, Error> {
        const SQL: &str = "\
SELECT id, service_id, url, personal, display_name, priv_bind
FROM homesets
WHERE id = ?;
";

        let record: Option<HomeSetRecord> = sqlx::query_as(SQL)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        record.map(HomeSet::try_from).transpose()
    }

    pub async fn by_service(&self, service_id: i64) -> Result<Vec<HomeSet>, Error> {
        const SQL: &str = "\
SELECT id, service_id, url, personal, display_name, priv_bind
FROM homesets
WHERE service_id = ?
ORDER BY id;
";

        let records: Vec<HomeSetRecord> = sqlx::query_as(SQL)
            .bind(service_id)
            .fetch_all(&self.pool)
            .await?;
        records.into_iter().map(HomeSet::try_from).collect()
    }

    /// Deletes a home-set together with the collections it lists.
    pub async fn delete(&self, id: i64) -> Result<(), Error> {
        const SQL: &str = "DELETE FROM homesets WHERE id = ?;";

        sqlx::query(SQL).bind(id).execute(&self.pool).await?;
        Ok(())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct HomeSetRecord {
    id: i64,
    service_id: i64,
    url: String,
    personal: bool,
    display_name: Option<String>,
    priv_bind: bool,
}

impl TryFrom<HomeSetRecord> for HomeSet {
    type Error = Error;

    fn try_from(record: HomeSetRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: record.id,
            service_id: record.service_id,
            url: parse_stored_url(&record.url)?,
            personal: record.personal,
            display_name: record.display_name,
            priv_bind: record.priv_bind,
        })
    }
}
