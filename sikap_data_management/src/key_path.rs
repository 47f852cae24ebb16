use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::DataManagerError;

const FORBIDDEN: [char; 5] = ['.', '#', '$', '[', ']'];

/// A `/` separated address into the store, e.g. `michael/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct KeyPath(String);

impl KeyPath {
    pub fn parse(path: &str) -> Result<Self, DataManagerError> {
        let path = path.trim_matches('/');
        for segment in path.split('/') {
            validate_segment(segment)?;
        }
        Ok(Self(path.to_string()))
    }

    /// The root key of a user. The username must be a single segment.
    pub fn user(username: &str) -> Result<Self, DataManagerError> {
        validate_segment(username)?;
        Ok(Self(username.to_string()))
    }

    pub fn child(&self, segment: &str) -> Result<Self, DataManagerError> {
        validate_segment(segment)?;
        Ok(Self(format!("{}/{}", self.0, segment)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn validate_segment(segment: &str) -> Result<(), DataManagerError> {
    if segment.is_empty() {
        return Err(DataManagerError::InvalidKey("Empty path segment".into()));
    }
    if segment.contains('/') || segment.chars().any(|c| FORBIDDEN.contains(&c) || c.is_control()) {
        return Err(DataManagerError::InvalidKey(format!("Illegal characters in path segment: {segment:?}")));
    }
    Ok(())
}

/// Auto-generated record key. Sorts by creation time down to the millisecond.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(String);

impl RecordId {
    pub fn generate() -> Self {
        Self::generate_at(Utc::now())
    }

    pub fn generate_at(at: DateTime<Utc>) -> Self {
        let millis = at.timestamp_millis().max(0) as u64;
        let random: [u8; 8] = rand::random();
        Self(format!("{:012x}{}", millis, hex::encode(random)))
    }

    pub(crate) fn from_stored(id: String) -> Self {
        Self(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
