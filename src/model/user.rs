// src/model/user.rs
use super::fields;
use crate::error::AppError;
use crate::types::Nsid;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Profile fields only `flickr.profile.getProfile` returns.
///
/// Fields the API did not return are empty strings. A user whose
/// `details` are `None` has never been enriched; `Some` with all fields
/// empty means flickr had nothing to tell.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ProfileDetails {
    pub first_name: String,
    pub last_name: String,
    pub city: String,
    pub country: String,
    pub hometown: String,
    pub occupation: String,
    pub description: String,
    pub website: String,
    pub facebook: String,
    pub twitter: String,
    pub tumblr: String,
    pub instagram: String,
    pub pinterest: String,
}

impl ProfileDetails {
    fn from_profile(data: &Value) -> Self {
        let field = |key: &str| fields::text(data, key).unwrap_or_default();
        Self {
            first_name: field("first_name"),
            last_name: field("last_name"),
            city: field("city"),
            country: field("country"),
            hometown: field("hometown"),
            occupation: field("occupation"),
            description: fields::text(data, "profile_description")
                .or_else(|| fields::text(data, "description"))
                .unwrap_or_default(),
            website: field("website"),
            facebook: field("facebook"),
            twitter: field("twitter"),
            tumblr: field("tumblr"),
            instagram: field("instagram"),
            pinterest: field("pinterest"),
        }
    }

    /// The real name as "first last", if either part is known.
    pub fn real_name(&self) -> Option<String> {
        let full = format!("{} {}", self.first_name, self.last_name);
        let full = full.trim();
        (!full.is_empty()).then(|| full.to_string())
    }
}

/// A (possibly partial) flickr user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserRecord {
    pub nsid: Nsid,
    /// Screen name
    pub name: Option<String>,
    pub join_date: Option<DateTime<Utc>>,
    pub details: Option<ProfileDetails>,
}

impl UserRecord {
    pub fn new(nsid: Nsid) -> Self {
        Self {
            nsid,
            name: None,
            join_date: None,
            details: None,
        }
    }

    /// The owner embedded in a `flickr.photos.search` result.
    pub fn from_search_result(data: &Value) -> Option<Self> {
        let nsid = Nsid::parse(&fields::text(data, "owner")?).ok()?;
        Some(Self {
            nsid,
            name: fields::text(data, "ownername"),
            join_date: None,
            details: None,
        })
    }

    /// Normalizes the `profile` object of a `flickr.profile.getProfile` response.
    pub fn from_profile(data: &Value) -> Result<Self, AppError> {
        let raw_nsid = fields::text(data, "id").or_else(|| fields::text(data, "nsid"));
        let raw_nsid = raw_nsid
            .ok_or_else(|| AppError::MalformedResponse("profile without id".to_string()))?;
        Ok(Self {
            nsid: Nsid::parse(&raw_nsid)?,
            name: None,
            join_date: fields::unix_timestamp(data, "join_date"),
            details: Some(ProfileDetails::from_profile(data)),
        })
    }

    /// Marks a user as enriched although flickr has no profile for them.
    pub fn enrichment_attempted(nsid: Nsid) -> Self {
        Self {
            details: Some(ProfileDetails::default()),
            ..Self::new(nsid)
        }
    }
}
