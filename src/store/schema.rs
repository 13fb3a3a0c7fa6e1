// src/store/schema.rs
//! Forward-only schema migrations tracked in `PRAGMA user_version`.

use rusqlite::Connection;

/// Each entry upgrades the schema from version `index` to `index + 1`.
const MIGRATIONS: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS users (
       id INTEGER NOT NULL,
       farm INTEGER NOT NULL,
       name TEXT,
       join_date TEXT,
       first_name TEXT,
       last_name TEXT,
       city TEXT,
       country TEXT,
       hometown TEXT,
       occupation TEXT,
       description TEXT,
       website TEXT,
       facebook TEXT,
       twitter TEXT,
       tumblr TEXT,
       instagram TEXT,
       pinterest TEXT,
       PRIMARY KEY (id, farm)
     );
     CREATE TABLE IF NOT EXISTS licenses (
       id INTEGER PRIMARY KEY
     );
     CREATE TABLE IF NOT EXISTS photos (
       id INTEGER PRIMARY KEY,
       server TEXT,
       secret TEXT,
       title TEXT,
       description TEXT,
       date_taken TEXT,
       date_posted TEXT,
       longitude REAL,
       latitude REAL,
       geo_accuracy INTEGER,
       license INTEGER REFERENCES licenses (id),
       user_id INTEGER,
       user_farm INTEGER,
       FOREIGN KEY (user_id, user_farm) REFERENCES users (id, farm)
     );
     CREATE INDEX IF NOT EXISTS photos_by_date_posted ON photos (date_posted);",
    "CREATE TABLE IF NOT EXISTS tags (
       tag TEXT PRIMARY KEY
     );
     CREATE TABLE IF NOT EXISTS tag_photo_associations (
       tag TEXT NOT NULL REFERENCES tags (tag),
       photo_id INTEGER NOT NULL REFERENCES photos (id),
       PRIMARY KEY (tag, photo_id)
     );
     CREATE INDEX IF NOT EXISTS users_without_profile
       ON users (id, farm) WHERE first_name IS NULL;",
];

pub(super) fn latest_version() -> u32 {
    MIGRATIONS.len() as u32
}

pub(super) fn installed_version(conn: &Connection) -> rusqlite::Result<u32> {
    conn.pragma_query_value(None, "user_version", |row| row.get(0))
}

/// Applies every migration newer than the installed version, one transaction each.
pub(super) fn update_to_latest(conn: &mut Connection) -> rusqlite::Result<u32> {
    let mut version = installed_version(conn)?;
    while (version as usize) < MIGRATIONS.len() {
        log::info!(
            "Updating database schema (db version {}->{})",
            version,
            version + 1
        );
        let tx = conn.transaction()?;
        tx.execute_batch(MIGRATIONS[version as usize])?;
        tx.pragma_update(None, "user_version", version + 1)?;
        tx.commit()?;
        version = installed_version(conn)?;
    }
    Ok(version)
}
