// src/types/ids.rs
use super::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// flickr user ids look like `12345678@N05`: a numeric id and a "farm" digit.
static NSID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d+)@N0(\d+)$").expect("NSID pattern is a valid regex")
});

/// A flickr user id (NSID), stored as its numeric id and farm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Nsid {
    id: i64,
    farm: i16,
}

impl Nsid {
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let input = input.trim();
        let captures = NSID_PATTERN
            .captures(input)
            .ok_or_else(|| ValidationError::InvalidNsid(input.to_string()))?;

        let id = captures[1]
            .parse()
            .map_err(|_| ValidationError::InvalidNsid(input.to_string()))?;
        let farm = captures[2]
            .parse()
            .map_err(|_| ValidationError::InvalidNsid(input.to_string()))?;
        Ok(Self { id, farm })
    }

    pub fn from_parts(id: i64, farm: i16) -> Self {
        Self { id, farm }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn farm(&self) -> i16 {
        self.farm
    }
}

impl fmt::Display for Nsid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@N0{}", self.id, self.farm)
    }
}

impl Serialize for Nsid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_string().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Nsid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = String::deserialize(deserializer)?;
        Nsid::parse(&value).map_err(serde::de::Error::custom)
    }
}

/// A flickr photo id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhotoId(i64);

impl PhotoId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// The API hands out photo ids as decimal strings.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        input
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|id| *id > 0)
            .map(Self)
            .ok_or_else(|| ValidationError::InvalidPhotoId(input.to_string()))
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl fmt::Display for PhotoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
