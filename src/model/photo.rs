// src/model/photo.rs
use super::fields;
use super::UserRecord;
use crate::error::AppError;
use crate::types::PhotoId;
use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A WGS84 position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub longitude: f64,
    pub latitude: f64,
}

/// A (possibly partial) flickr photo as returned by `flickr.photos.search`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub id: PhotoId,
    pub server: Option<String>,
    /// Hex-encoded secret used to build image URLs
    pub secret: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub date_taken: Option<DateTime<Utc>>,
    pub date_posted: Option<DateTime<Utc>>,
    pub location: Option<GeoPoint>,
    pub geo_accuracy: Option<i32>,
    pub license: Option<i32>,
    pub tags: Vec<String>,
    pub owner: Option<UserRecord>,
}

impl PhotoRecord {
    pub fn new(id: PhotoId) -> Self {
        Self {
            id,
            server: None,
            secret: None,
            title: None,
            description: None,
            date_taken: None,
            date_posted: None,
            location: None,
            geo_accuracy: None,
            license: None,
            tags: Vec::new(),
            owner: None,
        }
    }

    /// Normalizes one entry of a `flickr.photos.search` response.
    ///
    /// Only `id` is required. Fields that are missing or malformed are left
    /// unknown:
    /// - `secret` is kept only if it is valid hex
    /// - `datetaken` values such as `0000-01-01 00:00:00` become `None`
    /// - a position on the equator or the prime meridian is treated as missing
    /// - the owner is omitted if `owner` is not a valid NSID
    pub fn from_search_result(data: &Value) -> Result<Self, AppError> {
        let raw_id = fields::text(data, "id")
            .ok_or_else(|| AppError::MalformedResponse("photo without id".to_string()))?;
        let id = PhotoId::parse(&raw_id)?;

        let secret = fields::text(data, "secret")
            .filter(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_hexdigit()));

        let location = match (
            fields::float(data, "longitude"),
            fields::float(data, "latitude"),
        ) {
            (Some(longitude), Some(latitude))
                if longitude != 0.0
                    && latitude != 0.0
                    && longitude.is_finite()
                    && latitude.is_finite() =>
            {
                Some(GeoPoint {
                    longitude,
                    latitude,
                })
            }
            _ => None,
        };

        let tags = fields::text(data, "tags")
            .map(|tags| tags.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default();

        let owner = UserRecord::from_search_result(data);
        if owner.is_none() {
            log::debug!("Photo {} has no usable owner", id);
        }

        Ok(Self {
            id,
            server: fields::text(data, "server"),
            secret,
            title: fields::text(data, "title"),
            description: fields::text(data, "description"),
            date_taken: fields::text(data, "datetaken").and_then(|s| parse_date_taken(&s)),
            date_posted: fields::unix_timestamp(data, "dateupload"),
            location,
            geo_accuracy: fields::integer(data, "accuracy").and_then(|a| i32::try_from(a).ok()),
            license: fields::integer(data, "license").and_then(|l| i32::try_from(l).ok()),
            tags,
            owner,
        })
    }

    /// URL of the medium-sized image, if server and secret are known.
    pub fn photo_url(&self) -> Option<String> {
        match (&self.server, &self.secret) {
            (Some(server), Some(secret)) => Some(format!(
                "https://live.staticflickr.com/{}/{}_{}_z.jpg",
                server, self.id, secret
            )),
            _ => None,
        }
    }

    /// URL of the photo page, if the owner is known.
    pub fn page_url(&self) -> Option<String> {
        self.owner
            .as_ref()
            .map(|owner| format!("https://www.flickr.com/photos/{}/{}/", owner.nsid, self.id))
    }
}

/// `datetaken` is local time without zone information; it is stored as UTC.
fn parse_date_taken(value: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(value.trim(), "%Y-%m-%d %H:%M:%S").ok()?;
    // Year 0 does not exist in the calendar flickr users think in
    if naive.year() < 1 {
        return None;
    }
    Some(naive.and_utc())
}
