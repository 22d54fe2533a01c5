// SPDX-FileCopyrightText: 2025-2026 davsync contributors
//
// SPDX-License-Identifier: Apache-2.0

use davsync_dav::Url;
use sqlx::SqlitePool;

use crate::Error;
use crate::db::parse_stored_url;
use crate::model::{Collection, CollectionType};

const COLUMNS: &str = "\
id, service_id, homeset_id, owner_id, type, url, display_name, description, color, timezone,
priv_write_content, priv_unbind, force_read_only, supports_vevent, supports_vtodo,
supports_vjournal, source, sync";

const INSERT: &str = "\
INSERT INTO collections (
    service_id, homeset_id, owner_id, type, url, display_name, description, color, timezone,
    priv_write_content, priv_unbind, force_read_only, supports_vevent, supports_vtodo,
    supports_vjournal, source, sync
)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
ON CONFLICT(service_id, url) DO UPDATE SET
    homeset_id         = excluded.homeset_id,
    owner_id           = excluded.owner_id,
    type               = excluded.type,
    display_name       = excluded.display_name,
    description        = excluded.description,
    color              = excluded.color,
    timezone           = excluded.timezone,
    priv_write_content = excluded.priv_write_content,
    priv_unbind        = excluded.priv_unbind,
    supports_vevent    = excluded.supports_vevent,
    supports_vtodo     = excluded.supports_vtodo,
    supports_vjournal  = excluded.supports_vjournal,
    source             = excluded.source";

#[derive(Debug, Clone)]
pub struct Collections {
    pool: SqlitePool,
}

impl Collections {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Inserts the collection, or replaces the stored one with the same URL
    /// including its `sync` and `force_read_only` flags.
    pub async fn upsert_by_url(&self, collection: &Collection) -> Result<i64, Error> {
        let sql = format!(
            "{INSERT},
    force_read_only    = excluded.force_read_only,
    sync               = excluded.sync
RETURNING id;"
        );
        self.upsert(&sql, collection).await
    }

    /// Inserts the collection, or updates the stored one with the same URL.
    ///
    /// The stored `sync` and `force_read_only` flags are kept, so choices the
    /// user made survive a refresh. A new row takes them from `collection`.
    pub async fn upsert_by_url_remembering_flags(
        &self,
        collection: &Collection,
    ) -> Result<i64, Error> {
        let sql = format!("{INSERT}\nRETURNING id;");
        self.upsert(&sql, collection).await
    }

    async fn upsert(&self, sql: &str, c: &Collection) -> Result<i64, Error> {
        let id = sqlx::query_scalar(sql)
            .bind(c.service_id)
            .bind(c.homeset_id)
            .bind(c.owner_id)
            .bind(c.collection_type.as_str())
            .bind(c.url.as_str())
            .bind(c.display_name.as_deref())
            .bind(c.description.as_deref())
            .bind(c.color.map(i64::from))
            .bind(c.timezone.as_deref())
            .bind(c.priv_write_content)
            .bind(c.priv_unbind)
            .bind(c.force_read_only)
            .bind(c.supports_vevent)
            .bind(c.supports_vtodo)
            .bind(c.supports_vjournal)
            .bind(c.source.as_ref().map(Url::as_str))
            .bind(c.sync)
            .fetch_one(&self.pool)
            .await?;
        Ok(id)
    }

    /// Moves a collection to another home-set, or makes it homeless.
    pub async fn set_homeset(&self, id: i64, homeset_id: Option<i64>) -> Result<(), Error> {
        const SQL: &str = "UPDATE collections SET homeset_id = ? WHERE id = ?;";

        sqlx::query(SQL)
            .bind(homeset_id)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn set_sync(&self, id: i64, sync: bool) -> Result<(), Error> {
        const SQL: &str = "UPDATE collections SET sync = ? WHERE id = ?;";

        let result = sqlx::query(SQL).bind(sync).bind(id).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("collection {id}")));
        }
        Ok(())
    }

    pub async fn get(&self, id: i64) -> Result<Option<Collection>, Error> {
        let sql = format!("SELECT {COLUMNS} FROM collections WHERE id = ?;");
        let record: Option<CollectionRecord> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        record.map(Collection::try_from).transpose()
    }

    pub async fn get_by_url(&self, service_id: i64, url: &Url) -> Result<Option<Collection>, Error> {
        let sql = format!("SELECT {COLUMNS} FROM collections WHERE service_id = ? AND url = ?;");
        let record: Option<CollectionRecord> = sqlx::query_as(&sql)
            .bind(service_id)
            .bind(url.as_str())
            .fetch_optional(&self.pool)
            .await?;
        record.map(Collection::try_from).transpose()
    }

    pub async fn by_service(&self, service_id: i64) -> Result<Vec<Collection>, Error> {
        let sql = format!("SELECT {COLUMNS} FROM collections WHERE service_id = ? ORDER BY url;");
        let records: Vec<CollectionRecord> = sqlx::query_as(&sql)
            .bind(service_id)
            .fetch_all(&self.pool)
            .await?;
        records.into_iter().map(Collection::try_from).collect()
    }

    pub async fn by_homeset(&self, homeset_id: i64) -> Result<Vec<Collection>, Error> {
        let sql = format!("SELECT {COLUMNS} FROM collections WHERE homeset_id = ? ORDER BY url;");
        let records: Vec<CollectionRecord> = sqlx::query_as(&sql)
            .bind(homeset_id)
            .fetch_all(&self.pool)
            .await?;
        records.into_iter().map(Collection::try_from).collect()
    }

    /// Collections of a service that no home-set lists.
    pub async fn homeless(&self, service_id: i64) -> Result<Vec<Collection>, Error> {
        let sql = format!(
            "SELECT {COLUMNS} FROM collections \
             WHERE service_id = ? AND homeset_id IS NULL ORDER BY url;"
        );
        let records: Vec<CollectionRecord> = sqlx::query_as(&sql)
            .bind(service_id)
            .fetch_all(&self.pool)
            .await?;
        records.into_iter().map(Collection::try_from).collect()
    }

    pub async fn delete(&self, id: i64) -> Result<(), Error> {
        const SQL: &str = "DELETE FROM collections WHERE id = ?;";

        sqlx::query(SQL).bind(id).execute(&self.pool).await?;
        Ok(())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CollectionRecord {
    id: i64,
    service_id: i64,
    homeset_id: Option<i64>,
    owner_id: Option<i64>,
    #[sqlx(rename = "type")]
    collection_type: String,
    url: String,
    display_name: Option<String>,
    description: Option<String>,
    color: Option<i64>,
    timezone: Option<String>,
    priv_write_content: bool,
    priv_unbind: bool,
    force_read_only: bool,
    supports_vevent: Option<bool>,
    supports_vtodo: Option<bool>,
    supports_vjournal: Option<bool>,
    source: Option<String>,
    sync: bool,
}

impl TryFrom<CollectionRecord> for Collection {
    type Error = Error;

    fn try_from(record: CollectionRecord) -> Result<Self, Self::Error> {
        let collection_type: CollectionType =
            record.collection_type.parse().map_err(Error::Config)?;
        Ok(Self {
            id: record.id,
            service_id: record.service_id,
            homeset_id: record.homeset_id,
            owner_id: record.owner_id,
            collection_type,
            url: parse_stored_url(&record.url)?,
            display_name: record.display_name,
            description: record.description,
            color: record.color.and_then(|c| u32::try_from(c).ok()),
            timezone: record.timezone,
            priv_write_content: record.priv_write_content,
            priv_unbind: record.priv_unbind,
            force_read_only: record.force_read_only,
            supports_vevent: record.supports_vevent,
            supports_vtodo: record.supports_vtodo,
            supports_vjournal: record.supports_vjournal,
            source: record.source.as_deref().map(parse_stored_url).transpose()?,
            sync: record.sync,
        })
    }
}
