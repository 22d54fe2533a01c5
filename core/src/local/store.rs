// SPDX-FileCopyrightText: 2025-2026 davsync contributors
//
// SPDX-License-Identifier: Apache-2.0

//! SQLite-backed local collection.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::Error;
use crate::local::{LocalCollection, LocalKind, LocalResource};

const COLUMNS: &str = "\
id, name, etag, schedule_tag, flags, dirty, deleted, sequence, group_scheduled, is_organizer,
content, content_hash";

/// A local collection stored in the `local_resources` table.
#[derive(Debug, Clone)]
pub struct LocalStore {
    pool: SqlitePool,
    collection: String,
    kind: LocalKind,
    content_hash_check: bool,
}

/// A resource created locally, or downloaded from the server.
#[derive(Debug, Clone, Default)]
pub struct NewResource {
    pub name: Option<String>,
    pub etag: Option<String>,
    pub content: String,
    pub sequence: Option<i64>,
    pub group_scheduled: bool,
    pub is_organizer: bool,
    pub dirty: bool,
}

impl LocalStore {
    pub(crate) fn new(pool: SqlitePool, collection: &str, kind: LocalKind) -> Self {
        Self {
            pool,
            collection: collection.to_string(),
            kind,
            content_hash_check: false,
        }
    }

    /// Makes [`LocalCollection::find_dirty`] skip resources whose content
    /// did not change since the last upload.
    ///
    /// Some storage backends mark a resource dirty when only its metadata
    /// changed. With the check, such resources are cleared instead of
    /// uploaded again.
    #[must_use]
    pub fn with_content_hash_check(mut self, enabled: bool) -> Self {
        self.content_hash_check = enabled;
        self
    }

    #[must_use]
    pub fn kind(&self) -> LocalKind {
        self.kind
    }

    /// Adds a resource to the collection.
    ///
    /// # Errors
    ///
    /// Returns an error if a resource with the same name exists.
    pub async fn insert(&self, resource: NewResource) -> Result<StoredResource, Error> {
        const SQL: &str = "\
INSERT INTO local_resources (
    collection, kind, name, etag, dirty, sequence, group_scheduled, is_organizer, content
)
VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
RETURNING id;
";

        let id: i64 = sqlx::query_scalar(SQL)
            .bind(&self.collection)
            .bind(self.kind.as_str())
            .bind(resource.name.as_deref())
            .bind(resource.etag.as_deref())
            .bind(resource.dirty)
            .bind(resource.sequence)
            .bind(resource.group_scheduled)
            .bind(resource.is_organizer)
            .bind(&resource.content)
            .fetch_one(&self.pool)
            .await?;

        self.get(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("local resource {id}")))
    }

    /// Replaces the content of a resource and marks it dirty.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn edit(&self, id: i64, content: &str) -> Result<(), Error> {
        const SQL: &str = "UPDATE local_resources SET content = ?, dirty = 1 WHERE id = ?;";

        sqlx::query(SQL)
            .bind(content)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Marks a resource as deleted locally.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn mark_deleted(&self, id: i64) -> Result<(), Error> {
        const SQL: &str = "UPDATE local_resources SET deleted = 1 WHERE id = ?;";

        sqlx::query(SQL).bind(id).execute(&self.pool).await?;
        Ok(())
    }

    /// Every resource of the collection, ordered by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails.
    pub async fn all(&self) -> Result<Vec<StoredResource>, Error> {
        self.select("1 = 1", None).await
    }

    async fn get(&self, id: i64) -> Result<Option<StoredResource>, Error> {
        let sql = format!("SELECT {COLUMNS} FROM local_resources WHERE id = ?;");
        let record: Option<ResourceRecord> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record.map(|r| self.resource(r)))
    }

    async fn select(&self, filter: &str, name: Option<&str>) -> Result<Vec<StoredResource>, Error> {
        let sql = format!(
            "SELECT {COLUMNS} FROM local_resources \
             WHERE collection = ? AND kind = ? AND {filter} ORDER BY id;"
        );
        let mut query = sqlx::query_as::<_, ResourceRecord>(&sql)
            .bind(&self.collection)
            .bind(self.kind.as_str());
        if let Some(name) = name {
            query = query.bind(name);
        }
        let records: Vec<ResourceRecord> = query.fetch_all(&self.pool).await?;
        Ok(records.into_iter().map(|r| self.resource(r)).collect())
    }

    fn resource(&self, record: ResourceRecord) -> StoredResource {
        StoredResource {
            pool: self.pool.clone(),
            kind: self.kind,
            record,
        }
    }
}

#[async_trait]
impl LocalCollection for LocalStore {
    type Resource = StoredResource;

    async fn find_deleted(&self) -> Result<Vec<StoredResource>, Error> {
        self.select("deleted = 1", None).await
    }

    async fn find_dirty(&self) -> Result<Vec<StoredResource>, Error> {
        let mut dirty = Vec::new();
        for mut resource in self.select("dirty = 1 AND deleted = 0", None).await? {
            if self.content_hash_check
                && resource.record.content_hash.as_deref()
                    == Some(content_hash(&resource.record.content).as_str())
            {
                tracing::debug!(id = resource.record.id, "content unchanged, clearing dirty flag");
                sqlx::query("UPDATE local_resources SET dirty = 0 WHERE id = ?;")
                    .bind(resource.record.id)
                    .execute(&self.pool)
                    .await?;
                continue;
            }

            let record = &resource.record;
            let next = self.kind.next_sequence(
                record.sequence,
                record.group_scheduled,
                record.is_organizer,
            );
            if next != record.sequence {
                sqlx::query("UPDATE local_resources SET sequence = ? WHERE id = ?;")
                    .bind(next)
                    .bind(record.id)
                    .execute(&self.pool)
                    .await?;
                resource.record.sequence = next;
            }
            dirty.push(resource);
        }
        Ok(dirty)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<StoredResource>, Error> {
        Ok(self.select("name = ?", Some(name)).await?.into_iter().next())
    }

    async fn mark_not_dirty(&self, flags: i64) -> Result<u64, Error> {
        const SQL: &str = "\
UPDATE local_resources SET flags = ?
WHERE collection = ? AND kind = ? AND dirty = 0 AND deleted = 0;
";

        let result = sqlx::query(SQL)
            .bind(flags)
            .bind(&self.collection)
            .bind(self.kind.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn remove_not_dirty_marked(&self, flags: i64) -> Result<u64, Error> {
        const SQL: &str = "\
DELETE FROM local_resources
WHERE collection = ? AND kind = ? AND dirty = 0 AND deleted = 0 AND flags = ?;
";

        let result = sqlx::query(SQL)
            .bind(&self.collection)
            .bind(self.kind.as_str())
            .bind(flags)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn forget_etags(&self) -> Result<(), Error> {
        const SQL: &str =
            "UPDATE local_resources SET etag = NULL WHERE collection = ? AND kind = ?;";

        sqlx::query(SQL)
            .bind(&self.collection)
            .bind(self.kind.as_str())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// A row of a [`LocalStore`].
#[derive(Debug, Clone)]
pub struct StoredResource {
    pool: SqlitePool,
    kind: LocalKind,
    record: ResourceRecord,
}

impl StoredResource {
    #[must_use]
    pub fn id(&self) -> i64 {
        self.record.id
    }

    /// `SEQUENCE` of an event or task.
    #[must_use]
    pub fn sequence(&self) -> Option<i64> {
        self.record.sequence
    }

    #[must_use]
    pub fn content(&self) -> &str {
        &self.record.content
    }
}

#[async_trait]
impl LocalResource for StoredResource {
    fn name(&self) -> Option<&str> {
        self.record.name.as_deref()
    }

    fn etag(&self) -> Option<&str> {
        self.record.etag.as_deref()
    }

    fn schedule_tag(&self) -> Option<&str> {
        self.record.schedule_tag.as_deref()
    }

    fn flags(&self) -> i64 {
        self.record.flags
    }

    fn is_dirty(&self) -> bool {
        self.record.dirty
    }

    fn is_deleted(&self) -> bool {
        self.record.deleted
    }

    async fn update_flags(&mut self, flags: i64) -> Result<(), Error> {
        sqlx::query("UPDATE local_resources SET flags = ? WHERE id = ?;")
            .bind(flags)
            .bind(self.record.id)
            .execute(&self.pool)
            .await?;
        self.record.flags = flags;
        Ok(())
    }

    async fn clear_dirty(
        &mut self,
        etag: Option<&str>,
        schedule_tag: Option<&str>,
    ) -> Result<(), Error> {
        const SQL: &str = "\
UPDATE local_resources SET dirty = 0, etag = ?, schedule_tag = ?, content_hash = ?
WHERE id = ?;
";

        let hash = content_hash(&self.record.content);
        sqlx::query(SQL)
            .bind(etag)
            .bind(schedule_tag)
            .bind(&hash)
            .bind(self.record.id)
            .execute(&self.pool)
            .await?;

        self.record.dirty = false;
        self.record.etag = etag.map(ToString::to_string);
        self.record.schedule_tag = schedule_tag.map(ToString::to_string);
        self.record.content_hash = Some(hash);
        Ok(())
    }

    async fn prepare_for_upload(&mut self) -> Result<String, Error> {
        if let Some(name) = &self.record.name {
            return Ok(name.clone());
        }

        let name = format!("{}.{}", Uuid::new_v4(), self.kind.extension());
        sqlx::query("UPDATE local_resources SET name = ? WHERE id = ?;")
            .bind(&name)
            .bind(self.record.id)
            .execute(&self.pool)
            .await?;
        self.record.name = Some(name.clone());
        Ok(name)
    }

    async fn delete(self) -> Result<(), Error> {
        sqlx::query("DELETE FROM local_resources WHERE id = ?;")
            .bind(self.record.id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct ResourceRecord {
    id: i64,
    name: Option<String>,
    etag: Option<String>,
    schedule_tag: Option<String>,
    flags: i64,
    dirty: bool,
    deleted: bool,
    sequence: Option<i64>,
    group_scheduled: bool,
    is_organizer: bool,
    content: String,
    content_hash: Option<String>,
}

/// Hex SHA-256 of the resource content.
fn content_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::tests_utils::setup_test_db;
    use crate::local::FLAG_REMOTELY_PRESENT;

    fn named(name: &str) -> NewResource {
        NewResource {
            name: Some(name.to_string()),
            etag: Some(format!("\"{name}\"")),
            content: format!("BEGIN:VCARD\nFN:{name}\nEND:VCARD\n"),
            ..NewResource::default()
        }
    }

    #[tokio::test]
    async fn reconcile_removes_what_the_server_dropped() {
        let db = setup_test_db().await;
        let store = db.local_store("contacts", LocalKind::Contact);
        for name in ["a.vcf", "b.vcf", "c.vcf"] {
            store.insert(named(name)).await.unwrap();
        }

        let remote = vec!["a.vcf".to_string(), "c.vcf".to_string()];
        assert_eq!(store.reconcile(&remote).await.unwrap(), 1);

        let left = store.all().await.unwrap();
        let names: Vec<_> = left.iter().filter_map(LocalResource::name).collect();
        assert_eq!(names, ["a.vcf", "c.vcf"]);
        assert!(left.iter().all(|r| r.flags() == FLAG_REMOTELY_PRESENT));
    }

    #[tokio::test]
    async fn reconcile_keeps_dirty_resources() {
        let db = setup_test_db().await;
        let store = db.local_store("contacts", LocalKind::Contact);
        store.insert(named("a.vcf")).await.unwrap();
        let local = store
            .insert(NewResource {
                dirty: true,
                ..NewResource::default()
            })
            .await
            .unwrap();

        assert_eq!(store.reconcile(&[]).await.unwrap(), 1);
        let left = store.all().await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].id(), local.id());
    }

    #[tokio::test]
    async fn stores_are_scoped_to_collection_and_kind() {
        let db = setup_test_db().await;
        let events = db.local_store("personal", LocalKind::Event);
        let tasks = db.local_store("personal", LocalKind::Task);
        events.insert(named("e.ics")).await.unwrap();
        tasks.insert(named("t.ics")).await.unwrap();

        assert_eq!(events.reconcile(&[]).await.unwrap(), 1);
        assert_eq!(tasks.all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn find_dirty_advances_sequence() {
        let db = setup_test_db().await;
        let store = db.local_store("personal", LocalKind::Event);
        let new = store
            .insert(NewResource {
                dirty: true,
                ..NewResource::default()
            })
            .await
            .unwrap();
        let organized = store
            .insert(NewResource {
                name: Some("meeting.ics".to_string()),
                dirty: true,
                sequence: Some(5),
                group_scheduled: true,
                is_organizer: true,
                ..NewResource::default()
            })
            .await
            .unwrap();

        let dirty = store.find_dirty().await.unwrap();
        let sequence_of = |id: i64| dirty.iter().find(|r| r.id() == id).unwrap().sequence();
        assert_eq!(sequence_of(new.id()), Some(0));
        assert_eq!(sequence_of(organized.id()), Some(6));

        // persisted as well
        let stored = store.find_by_name("meeting.ics").await.unwrap().unwrap();
        assert_eq!(stored.sequence(), Some(6));
    }

    #[tokio::test]
    async fn find_dirty_skips_deleted() {
        let db = setup_test_db().await;
        let store = db.local_store("personal", LocalKind::Task);
        let task = store
            .insert(NewResource {
                dirty: true,
                ..NewResource::default()
            })
            .await
            .unwrap();
        store.mark_deleted(task.id()).await.unwrap();

        assert!(store.find_dirty().await.unwrap().is_empty());
        assert_eq!(store.find_deleted().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn content_hash_check_clears_metadata_only_changes() {
        let db = setup_test_db().await;
        let store = db
            .local_store("contacts", LocalKind::Contact)
            .with_content_hash_check(true);
        let mut contact = store.insert(named("a.vcf")).await.unwrap();
        contact.clear_dirty(Some("\"1\""), None).await.unwrap();

        // dirty again without a content change
        store.edit(contact.id(), contact.content()).await.unwrap();
        assert!(store.find_dirty().await.unwrap().is_empty());
        assert!(!store.all().await.unwrap()[0].is_dirty());

        store
            .edit(contact.id(), "BEGIN:VCARD\nFN:Changed\nEND:VCARD\n")
            .await
            .unwrap();
        assert_eq!(store.find_dirty().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn prepare_for_upload_names_new_resources() {
        let db = setup_test_db().await;
        let store = db.local_store("personal", LocalKind::Event);
        let mut event = store.insert(NewResource::default()).await.unwrap();

        let name = event.prepare_for_upload().await.unwrap();
        assert!(name.ends_with(".ics"));
        assert_eq!(event.prepare_for_upload().await.unwrap(), name);
        assert!(store.find_by_name(&name).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn forget_etags_and_delete() {
        let db = setup_test_db().await;
        let store = db.local_store("contacts", LocalKind::Contact);
        store.insert(named("a.vcf")).await.unwrap();

        store.forget_etags().await.unwrap();
        let contact = store.find_by_name("a.vcf").await.unwrap().unwrap();
        assert_eq!(contact.etag(), None);

        contact.delete().await.unwrap();
        assert!(store.all().await.unwrap().is_empty());
    }
}
