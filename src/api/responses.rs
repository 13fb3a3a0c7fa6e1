// src/api/responses.rs
//! Envelopes of the flickr REST API (`format=json&nojsoncallback=1`).
//!
//! Every response carries `"stat": "ok"` or `"stat": "fail"` with a numeric
//! `code` and a `message`. Numbers inside envelopes arrive as JSON numbers or
//! strings, depending on the method.

use crate::constants::ERROR_BODY_PREVIEW_LENGTH;
use crate::error::{AppError, FlickrErrorCode, Result};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct Status {
    stat: String,
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

/// One page of `flickr.photos.search` results.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchPage {
    #[serde(deserialize_with = "number_or_string")]
    pub page: u64,
    #[serde(deserialize_with = "number_or_string")]
    pub pages: u64,
    #[serde(deserialize_with = "number_or_string")]
    pub total: u64,
    #[serde(default)]
    pub photo: Vec<Value>,
}

#[derive(Deserialize)]
struct SearchEnvelope {
    photos: SearchPage,
}

#[derive(Deserialize)]
struct ProfileEnvelope {
    profile: Value,
}

fn number_or_string<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u64),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Parses a response body, turning `stat: fail` into [`AppError::FlickrService`].
pub(super) fn parse_envelope(body: &str) -> Result<Value> {
    let value: Value = serde_json::from_str(body).map_err(|e| {
        AppError::MalformedResponse(format!("{} in {}", e, preview(body)))
    })?;
    let status: Status = serde_json::from_value(value.clone())?;

    match status.stat.as_str() {
        "ok" => Ok(value),
        "fail" => Err(AppError::FlickrService {
            code: FlickrErrorCode::from_api_code(status.code.unwrap_or(-1)),
            message: status.message.unwrap_or_default(),
        }),
        other => Err(AppError::MalformedResponse(format!(
            "unexpected stat {:?}",
            other
        ))),
    }
}

pub(super) fn parse_search_page(envelope: Value) -> Result<SearchPage> {
    let envelope: SearchEnvelope = serde_json::from_value(envelope)?;
    Ok(envelope.photos)
}

pub(super) fn parse_profile(envelope: Value) -> Result<Value> {
    let envelope: ProfileEnvelope = serde_json::from_value(envelope)?;
    Ok(envelope.profile)
}

/// The start of a response body, for error messages.
pub(super) fn preview(body: &str) -> String {
    if body.chars().count() > ERROR_BODY_PREVIEW_LENGTH {
        let head: String = body.chars().take(ERROR_BODY_PREVIEW_LENGTH).collect();
        format!("{}...", head)
    } else {
        body.to_string()
    }
}
