// src/model/mod.rs
//! Partial records for the two entity kinds the harvester stores.
//!
//! Every field the flickr API might omit is an `Option`; `None` always means
//! "unknown", never "known to be empty", so that upserting a partial record
//! never erases data already stored.

mod fields;
mod photo;
mod user;

pub use photo::{GeoPoint, PhotoRecord};
pub use user::{ProfileDetails, UserRecord};

use serde::{Deserialize, Serialize};

/// The kinds of entities the store holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Photo,
    User,
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EntityKind::Photo => write!(f, "photo"),
            EntityKind::User => write!(f, "user"),
        }
    }
}

/// A normalized record ready to be upserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Record {
    Photo(PhotoRecord),
    User(UserRecord),
}

impl From<PhotoRecord> for Record {
    fn from(photo: PhotoRecord) -> Self {
        Record::Photo(photo)
    }
}

impl From<UserRecord> for Record {
    fn from(user: UserRecord) -> Self {
        Record::User(user)
    }
}
