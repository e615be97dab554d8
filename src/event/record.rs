use std::collections::HashMap;
use std::time::SystemTime;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

/// Error when encoding or decoding an event payload.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("payload error: {message}")]
pub struct PayloadError {
    pub message: String,
}

/// An event that has been staged in a batch but not yet sequenced by the store.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingEvent {
    pub event_name: String,
    pub payload: Vec<u8>,
    pub metadata: HashMap<String, String>,
}

impl PendingEvent {
    /// Encode `payload` with bitcode.
    pub fn encode<T: Serialize>(
        event_name: impl Into<String>,
        payload: &T,
    ) -> Result<Self, PayloadError> {
        let payload = bitcode::serialize(payload).map_err(|e| PayloadError {
            message: e.to_string(),
        })?;
        Ok(PendingEvent {
            event_name: event_name.into(),
            payload,
            metadata: HashMap::new(),
        })
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// A sequenced entry of the event log.
///
/// `sequence` is assigned by the store at commit time, starts at 1 and has no gaps.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct EventRecord {
    pub sequence: u64,
    pub event_name: String,
    #[serde(with = "payload_serde")]
    pub payload: Vec<u8>,
    pub timestamp: SystemTime,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

mod payload_serde {
    use base64::{engine::general_purpose::STANDARD, Engine};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(payload: &Vec<u8>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        STANDARD.encode(payload).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s: String = String::deserialize(deserializer)?;
        STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}

impl EventRecord {
    pub fn sequenced(sequence: u64, pending: PendingEvent) -> Self {
        EventRecord {
            sequence,
            event_name: pending.event_name,
            payload: pending.payload,
            timestamp: SystemTime::now(),
            metadata: pending.metadata,
        }
    }

    /// Deserialize the payload into the specified type.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, PayloadError> {
        bitcode::deserialize(&self.payload).map_err(|e| PayloadError {
            message: e.to_string(),
        })
    }

    /// Get a metadata value by key.
    pub fn meta(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(|s| s.as_str())
    }
}
