use crate::utils::error::Result;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Direct invocation payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Payload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    #[serde(default)]
    pub data: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirehoseEvent {
    #[serde(default)]
    pub invocation_id: String,
    #[serde(default)]
    pub delivery_stream_arn: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_kinesis_stream_arn: Option<String>,
    #[serde(default)]
    pub region: String,
    pub records: Vec<FirehoseRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirehoseRecord {
    pub record_id: String,
    /// Unix epoch milliseconds
    #[serde(default)]
    pub approximate_arrival_timestamp: i64,
    /// Base64 payload, decoded per record so that a bad record fails alone.
    #[serde(default)]
    pub data: String,
}

impl FirehoseRecord {
    pub fn decode_data(&self) -> Result<Vec<u8>> {
        Ok(STANDARD.decode(self.data.as_bytes())?)
    }

    pub fn arrival_time(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.approximate_arrival_timestamp)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FirehoseResponse {
    pub records: Vec<FirehoseResponseRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordResult {
    Ok,
    Dropped,
    ProcessingFailed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    #[serde(default)]
    pub partition_keys: HashMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FirehoseResponseRecord {
    pub record_id: String,
    pub result: RecordResult,
    #[serde(with = "base64_bytes", default, skip_serializing_if = "Vec::is_empty")]
    pub data: Vec<u8>,
    #[serde(default)]
    pub metadata: ResponseMetadata,
}

impl FirehoseResponseRecord {
    pub fn new(record_id: impl Into<String>, outcome: RecordOutcome) -> Self {
        let result = outcome.result();
        let data = match outcome {
            RecordOutcome::Ok(data) => data,
            RecordOutcome::Dropped | RecordOutcome::ProcessingFailed => Vec::new(),
        };
        Self {
            record_id: record_id.into(),
            result,
            data,
            metadata: ResponseMetadata::default(),
        }
    }
}

/// Outcome of transforming a single Firehose record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    /// Newline-delimited JSON output values.
    Ok(Vec<u8>),
    /// The query yielded nothing.
    Dropped,
    ProcessingFailed,
}

impl RecordOutcome {
    pub fn result(&self) -> RecordResult {
        match self {
            RecordOutcome::Ok(_) => RecordResult::Ok,
            RecordOutcome::Dropped => RecordResult::Dropped,
            RecordOutcome::ProcessingFailed => RecordResult::ProcessingFailed,
        }
    }
}

/// Per-invocation context shared by every handler.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub request_id: String,
    pub deadline: Option<DateTime<Utc>>,
}

impl Invocation {
    pub fn new(request_id: impl Into<String>, deadline: Option<DateTime<Utc>>) -> Self {
        Self {
            request_id: request_id.into(),
            deadline,
        }
    }

    /// 本地執行沒有期限
    pub fn local() -> Self {
        Self::new("local", None)
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(data))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = Option::<String>::deserialize(deserializer)?.unwrap_or_default();
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}
