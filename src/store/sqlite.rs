// src/store/sqlite.rs
//! SQLite-backed [`RecordStore`].

use super::{schema, RecordStore};
use crate::error::{AppError, Result};
use crate::model::{EntityKind, PhotoRecord, ProfileDetails, Record, UserRecord};
use crate::types::{Nsid, PhotoId};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Transaction};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

const BUSY_TIMEOUT_MS: u64 = 5_000;
const CACHE_SIZE_KB: i64 = -16_000;

/// A single SQLite connection shared by all workers.
///
/// Writes are serialized by the mutex and executed on tokio's blocking pool.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Opens (or creates) the database at `path` and migrates it to the latest schema.
    pub fn open(path: &Path) -> Result<Self> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE;
        let conn = Connection::open_with_flags(path, flags)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        conn.busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS))?;
        log::debug!("Opened database {}", path.display());
        Self::initialize(conn)
    }

    /// A private in-memory database, mostly for tests.
    pub fn open_in_memory() -> Result<Self> {
        Self::initialize(Connection::open_in_memory()?)
    }

    fn initialize(mut conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.pragma_update(None, "cache_size", CACHE_SIZE_KB)?;
        let version = schema::update_to_latest(&mut conn)?;
        debug_assert_eq!(version, schema::latest_version());
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Upserts synchronously; see [`RecordStore::upsert`].
    pub fn upsert_blocking(&self, record: &Record) -> Result<()> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        match record {
            Record::Photo(photo) => upsert_photo(&tx, photo)?,
            Record::User(user) => upsert_user(&tx, user)?,
        }
        tx.commit()?;
        Ok(())
    }

    pub fn incomplete_profiles_blocking(&self) -> Result<Vec<Nsid>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT id, farm FROM users WHERE first_name IS NULL ORDER BY id, farm",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(Nsid::from_parts(row.get(0)?, row.get(1)?))
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(AppError::from)
    }

    /// Distinct licenses referenced by stored photos.
    pub fn licenses(&self) -> Result<Vec<i64>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached("SELECT id FROM licenses ORDER BY id")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        rows.collect::<rusqlite::Result<Vec<i64>>>()
            .map_err(AppError::from)
    }

    /// Number of stored entities of the given kind.
    pub fn count(&self, kind: EntityKind) -> Result<u64> {
        let sql = match kind {
            EntityKind::Photo => "SELECT COUNT(*) FROM photos",
            EntityKind::User => "SELECT COUNT(*) FROM users",
        };
        let count: i64 = self.conn.lock().query_row(sql, [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    pub fn load_user(&self, nsid: Nsid) -> Result<Option<UserRecord>> {
        let conn = self.conn.lock();
        let user = conn
            .query_row(
                "SELECT name, join_date, first_name, last_name, city, country, hometown,
                        occupation, description, website, facebook, twitter, tumblr,
                        instagram, pinterest
                 FROM users WHERE id = ?1 AND farm = ?2",
                params![nsid.id(), nsid.farm()],
                |row| {
                    let first_name: Option<String> = row.get(2)?;
                    let details = match first_name {
                        None => None,
                        Some(first_name) => {
                            let text = |i: usize| -> rusqlite::Result<String> {
                                Ok(row.get::<_, Option<String>>(i)?.unwrap_or_default())
                            };
                            Some(ProfileDetails {
                                first_name,
                                last_name: text(3)?,
                                city: text(4)?,
                                country: text(5)?,
                                hometown: text(6)?,
                                occupation: text(7)?,
                                description: text(8)?,
                                website: text(9)?,
                                facebook: text(10)?,
                                twitter: text(11)?,
                                tumblr: text(12)?,
                                instagram: text(13)?,
                                pinterest: text(14)?,
                            })
                        }
                    };
                    Ok(UserRecord {
                        nsid,
                        name: row.get(0)?,
                        join_date: row.get(1)?,
                        details,
                    })
                },
            )
            .optional()?;
        Ok(user)
    }

    /// Loads a photo with its tags; the owner is returned by id only.
    pub fn load_photo(&self, id: PhotoId) -> Result<Option<PhotoRecord>> {
        let conn = self.conn.lock();
        let photo = conn
            .query_row(
                "SELECT server, secret, title, description, date_taken, date_posted,
                        longitude, latitude, geo_accuracy, license, user_id, user_farm
                 FROM photos WHERE id = ?1",
                params![id.get()],
                |row| {
                    let longitude: Option<f64> = row.get(6)?;
                    let latitude: Option<f64> = row.get(7)?;
                    let user_id: Option<i64> = row.get(10)?;
                    let user_farm: Option<i16> = row.get(11)?;
                    let owner = user_id.zip(user_farm);
                    Ok(PhotoRecord {
                        server: row.get(0)?,
                        secret: row.get(1)?,
                        title: row.get(2)?,
                        description: row.get(3)?,
                        date_taken: row.get(4)?,
                        date_posted: row.get(5)?,
                        location: longitude.zip(latitude).map(|(longitude, latitude)| {
                            crate::model::GeoPoint {
                                longitude,
                                latitude,
                            }
                        }),
                        geo_accuracy: row.get(8)?,
                        license: row.get(9)?,
                        owner: owner
                            .map(|(user_id, farm)| UserRecord::new(Nsid::from_parts(user_id, farm))),
                        ..PhotoRecord::new(id)
                    })
                },
            )
            .optional()?;

        let Some(mut photo) = photo else {
            return Ok(None);
        };
        let mut stmt = conn.prepare_cached(
            "SELECT tag FROM tag_photo_associations WHERE photo_id = ?1 ORDER BY tag",
        )?;
        photo.tags = stmt
            .query_map(params![id.get()], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(Some(photo))
    }
}

fn upsert_user(tx: &Transaction<'_>, user: &UserRecord) -> rusqlite::Result<()> {
    let details = user.details.as_ref();
    let detail = |pick: fn(&ProfileDetails) -> &String| details.map(|d| pick(d).as_str());

    tx.prepare_cached(
        "INSERT INTO users (
           id, farm, name, join_date, first_name, last_name, city, country, hometown,
           occupation, description, website, facebook, twitter, tumblr, instagram, pinterest
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
         ON CONFLICT (id, farm) DO UPDATE SET
           name = COALESCE(excluded.name, users.name),
           join_date = COALESCE(excluded.join_date, users.join_date),
           first_name = COALESCE(excluded.first_name, users.first_name),
           last_name = COALESCE(excluded.last_name, users.last_name),
           city = COALESCE(excluded.city, users.city),
           country = COALESCE(excluded.country, users.country),
           hometown = COALESCE(excluded.hometown, users.hometown),
           occupation = COALESCE(excluded.occupation, users.occupation),
           description = COALESCE(excluded.description, users.description),
           website = COALESCE(excluded.website, users.website),
           facebook = COALESCE(excluded.facebook, users.facebook),
           twitter = COALESCE(excluded.twitter, users.twitter),
           tumblr = COALESCE(excluded.tumblr, users.tumblr),
           instagram = COALESCE(excluded.instagram, users.instagram),
           pinterest = COALESCE(excluded.pinterest, users.pinterest)",
    )?
    .execute(params![
        user.nsid.id(),
        user.nsid.farm(),
        user.name,
        user.join_date,
        detail(|d| &d.first_name),
        detail(|d| &d.last_name),
        detail(|d| &d.city),
        detail(|d| &d.country),
        detail(|d| &d.hometown),
        detail(|d| &d.occupation),
        detail(|d| &d.description),
        detail(|d| &d.website),
        detail(|d| &d.facebook),
        detail(|d| &d.twitter),
        detail(|d| &d.tumblr),
        detail(|d| &d.instagram),
        detail(|d| &d.pinterest),
    ])?;
    Ok(())
}

fn upsert_photo(tx: &Transaction<'_>, photo: &PhotoRecord) -> rusqlite::Result<()> {
    // The owner row must exist before the foreign key points at it
    if let Some(owner) = &photo.owner {
        upsert_user(tx, owner)?;
    }
    let owner = photo.owner.as_ref().map(|owner| owner.nsid);
    if let Some(license) = photo.license {
        tx.prepare_cached("INSERT OR IGNORE INTO licenses (id) VALUES (?1)")?
            .execute(params![license])?;
    }

    tx.prepare_cached(
        "INSERT INTO photos (
           id, server, secret, title, description, date_taken, date_posted,
           longitude, latitude, geo_accuracy, license, user_id, user_farm
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
         ON CONFLICT (id) DO UPDATE SET
           server = COALESCE(excluded.server, photos.server),
           secret = COALESCE(excluded.secret, photos.secret),
           title = COALESCE(excluded.title, photos.title),
           description = COALESCE(excluded.description, photos.description),
           date_taken = COALESCE(excluded.date_taken, photos.date_taken),
           date_posted = COALESCE(excluded.date_posted, photos.date_posted),
           longitude = COALESCE(excluded.longitude, photos.longitude),
           latitude = COALESCE(excluded.latitude, photos.latitude),
           geo_accuracy = COALESCE(excluded.geo_accuracy, photos.geo_accuracy),
           license = COALESCE(excluded.license, photos.license),
           user_id = COALESCE(excluded.user_id, photos.user_id),
           user_farm = COALESCE(excluded.user_farm, photos.user_farm)",
    )?
    .execute(params![
        photo.id.get(),
        photo.server,
        photo.secret,
        photo.title,
        photo.description,
        photo.date_taken,
        photo.date_posted,
        photo.location.map(|l| l.longitude),
        photo.location.map(|l| l.latitude),
        photo.geo_accuracy,
        photo.license,
        owner.map(|nsid| nsid.id()),
        owner.map(|nsid| nsid.farm()),
    ])?;

    let mut insert_tag = tx.prepare_cached("INSERT OR IGNORE INTO tags (tag) VALUES (?1)")?;
    let mut associate = tx.prepare_cached(
        "INSERT OR IGNORE INTO tag_photo_associations (tag, photo_id) VALUES (?1, ?2)",
    )?;
    for tag in &photo.tags {
        insert_tag.execute(params![tag])?;
        associate.execute(params![tag, photo.id.get()])?;
    }
    Ok(())
}

#[async_trait::async_trait]
impl RecordStore for SqliteStore {
    async fn upsert(&self, record: &Record) -> Result<()> {
        let store = self.clone();
        let record = record.clone();
        tokio::task::spawn_blocking(move || store.upsert_blocking(&record))
            .await
            .map_err(|e| AppError::InternalError {
                message: "database task panicked".to_string(),
                source: Some(Box::new(e)),
            })?
    }

    async fn find_incomplete_profiles(&self) -> Result<Vec<Nsid>> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.incomplete_profiles_blocking())
            .await
            .map_err(|e| AppError::InternalError {
                message: "database task panicked".to_string(),
                source: Some(Box::new(e)),
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GeoPoint;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn owner() -> UserRecord {
        UserRecord {
            name: Some("helsinki walker".to_string()),
            ..UserRecord::new(Nsid::from_parts(12345678, 5))
        }
    }

    fn photo() -> PhotoRecord {
        PhotoRecord {
            title: Some("Kauppatori".to_string()),
            secret: Some("a1b2c3".to_string()),
            date_posted: Some(Utc.with_ymd_and_hms(2020, 5, 1, 10, 0, 0).unwrap()),
            location: Some(GeoPoint {
                longitude: 24.9525,
                latitude: 60.1675,
            }),
            tags: vec!["helsinki".to_string(), "market".to_string()],
            owner: Some(owner()),
            ..PhotoRecord::new(PhotoId::new(42))
        }
    }

    #[test]
    fn test_schema_is_migrated_to_latest() {
        let store = SqliteStore::open_in_memory().unwrap();
        let version = schema::installed_version(&store.conn.lock()).unwrap();
        assert_eq!(version, schema::latest_version());
    }

    #[test]
    fn test_reopening_file_keeps_data() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.sqlite");
        SqliteStore::open(&path)
            .unwrap()
            .upsert_blocking(&photo().into())
            .unwrap();

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.count(EntityKind::Photo).unwrap(), 1);
    }

    #[test]
    fn test_photo_upsert_stores_owner_and_tags() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert_blocking(&photo().into()).unwrap();

        assert_eq!(store.count(EntityKind::Photo).unwrap(), 1);
        assert_eq!(store.count(EntityKind::User).unwrap(), 1);

        let stored = store.load_photo(PhotoId::new(42)).unwrap().unwrap();
        assert_eq!(stored.title.as_deref(), Some("Kauppatori"));
        assert_eq!(stored.date_posted, photo().date_posted);
        assert_eq!(stored.location, photo().location);
        assert_eq!(stored.tags, vec!["helsinki", "market"]);
        assert_eq!(stored.owner.map(|o| o.nsid), Some(owner().nsid));
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert_blocking(&photo().into()).unwrap();
        store.upsert_blocking(&photo().into()).unwrap();

        assert_eq!(store.count(EntityKind::Photo).unwrap(), 1);
        assert_eq!(store.count(EntityKind::User).unwrap(), 1);
        assert_eq!(
            store.load_photo(PhotoId::new(42)).unwrap().unwrap().tags.len(),
            2
        );
    }

    #[test]
    fn test_unknown_fields_never_overwrite_known_values() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.upsert_blocking(&photo().into()).unwrap();

        let partial = PhotoRecord {
            description: Some("seen again".to_string()),
            ..PhotoRecord::new(PhotoId::new(42))
        };
        store.upsert_blocking(&partial.into()).unwrap();

        let stored = store.load_photo(PhotoId::new(42)).unwrap().unwrap();
        assert_eq!(stored.title.as_deref(), Some("Kauppatori"));
        assert_eq!(stored.description.as_deref(), Some("seen again"));
        assert_eq!(stored.secret.as_deref(), Some("a1b2c3"));
        assert_eq!(stored.owner.map(|o| o.nsid), Some(owner().nsid));
    }

    #[test]
    fn test_incomplete_profiles_are_those_never_enriched() {
        let store = SqliteStore::open_in_memory().unwrap();
        let first = Nsid::from_parts(1, 1);
        let second = Nsid::from_parts(2, 1);
        store.upsert_blocking(&UserRecord::new(first).into()).unwrap();
        store.upsert_blocking(&UserRecord::new(second).into()).unwrap();
        assert_eq!(
            store.incomplete_profiles_blocking().unwrap(),
            vec![first, second]
        );

        let enriched = UserRecord {
            details: Some(ProfileDetails {
                first_name: "Aino".to_string(),
                city: "Helsinki".to_string(),
                ..ProfileDetails::default()
            }),
            ..UserRecord::new(first)
        };
        store.upsert_blocking(&enriched.into()).unwrap();
        store
            .upsert_blocking(&UserRecord::enrichment_attempted(second).into())
            .unwrap();

        assert!(store.incomplete_profiles_blocking().unwrap().is_empty());
        let loaded = store.load_user(first).unwrap().unwrap();
        assert_eq!(loaded.details.unwrap().city, "Helsinki");
    }

    #[test]
    fn test_search_owner_does_not_erase_profile() {
        let store = SqliteStore::open_in_memory().unwrap();
        let enriched = UserRecord {
            details: Some(ProfileDetails {
                first_name: "Aino".to_string(),
                ..ProfileDetails::default()
            }),
            ..owner()
        };
        store.upsert_blocking(&enriched.into()).unwrap();
        store.upsert_blocking(&photo().into()).unwrap();

        let loaded = store.load_user(owner().nsid).unwrap().unwrap();
        assert_eq!(loaded.name.as_deref(), Some("helsinki walker"));
        assert_eq!(loaded.details.unwrap().first_name, "Aino");
    }

    #[test]
    fn test_licenses_are_shared_lookups() {
        let store = SqliteStore::open_in_memory().unwrap();
        for (id, license) in [(1, Some(4)), (2, Some(4)), (3, Some(0)), (4, None)] {
            let record = PhotoRecord {
                license,
                ..PhotoRecord::new(PhotoId::new(id))
            };
            store.upsert_blocking(&record.into()).unwrap();
        }

        assert_eq!(store.licenses().unwrap(), vec![0, 4]);
        assert_eq!(
            store.load_photo(PhotoId::new(2)).unwrap().unwrap().license,
            Some(4)
        );
        assert_eq!(store.load_photo(PhotoId::new(4)).unwrap().unwrap().license, None);
    }

    #[test]
    fn test_unknown_license_is_rejected_by_foreign_key() {
        let store = SqliteStore::open_in_memory().unwrap();
        let result = store.conn.lock().execute(
            "INSERT INTO photos (id, license) VALUES (1, 99)",
            [],
        );
        assert!(result.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_upserts_converge() {
        let store = SqliteStore::open_in_memory().unwrap();

        let mut tasks = tokio::task::JoinSet::new();
        for task in 0..8i64 {
            let store = store.clone();
            tasks.spawn(async move {
                for id in 0..5 {
                    // Even tasks know the title and owner name, odd ones the description
                    let owner = if task % 2 == 0 {
                        owner()
                    } else {
                        UserRecord::new(owner().nsid)
                    };
                    let record = PhotoRecord {
                        title: (task % 2 == 0).then(|| format!("photo {}", id)),
                        description: (task % 2 == 1).then(|| "seen from the pier".to_string()),
                        tags: vec![format!("t{}", task % 3)],
                        owner: Some(owner),
                        ..PhotoRecord::new(PhotoId::new(100 + (id + task) % 5))
                    };
                    RecordStore::upsert(&store, &record.into()).await.unwrap();
                }
            });
        }
        while let Some(joined) = tasks.join_next().await {
            joined.unwrap();
        }

        assert_eq!(store.count(EntityKind::Photo).unwrap(), 5);
        assert_eq!(store.count(EntityKind::User).unwrap(), 1);
        let user = store.load_user(owner().nsid).unwrap().unwrap();
        assert_eq!(user.name.as_deref(), Some("helsinki walker"));
        for id in 100..105 {
            let stored = store.load_photo(PhotoId::new(id)).unwrap().unwrap();
            assert!(stored.title.is_some(), "photo {} lost its title", id);
            assert_eq!(stored.description.as_deref(), Some("seen from the pier"));
            assert_eq!(stored.tags, vec!["t0", "t1", "t2"]);
            assert_eq!(stored.owner.map(|o| o.nsid), Some(owner().nsid));
        }
    }

    #[tokio::test]
    async fn test_async_interface_delegates() {
        let store = SqliteStore::open_in_memory().unwrap();
        RecordStore::upsert(&store, &owner().into()).await.unwrap();
        assert_eq!(
            store.find_incomplete_profiles().await.unwrap(),
            vec![owner().nsid]
        );
    }
}
