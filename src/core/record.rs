use crate::core::query::{check_deadline, CompiledQuery};
use crate::domain::model::{FirehoseRecord, RecordOutcome};
use crate::utils::error::{BootstrapError, Result};
use chrono::{DateTime, Utc};
use flate2::read::GzDecoder;
use serde_json::Value;
use std::io::Read;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];
const DUMP_MAX_CHARS: usize = 64;

/// 檢查前兩個位元組是否為 gzip magic number
pub fn is_gzip_compressed(data: &[u8]) -> bool {
    data.starts_with(&GZIP_MAGIC)
}

pub fn gzip_decode(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut output = Vec::new();
    decoder
        .read_to_end(&mut output)
        .map_err(BootstrapError::GzipError)?;
    Ok(output)
}

/// Serializes each value as compact JSON followed by a newline.
pub fn to_ndjson(values: &[Value]) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    for value in values {
        serde_json::to_writer(&mut output, value)?;
        output.push(b'\n');
    }
    Ok(output)
}

/// Transforms one Firehose record. Failures stay local to the record.
pub fn transform_record(
    query: &CompiledQuery,
    record: &FirehoseRecord,
    deadline: Option<DateTime<Utc>>,
) -> RecordOutcome {
    let record_id = record.record_id.as_str();

    if let Err(e) = check_deadline(deadline) {
        tracing::error!(record_id, detail = %e, "record skipped");
        return RecordOutcome::ProcessingFailed;
    }

    let payload = match record.decode_data() {
        Ok(payload) => payload,
        Err(e) => {
            tracing::error!(record_id, detail = %e, "record data base64 decode failed");
            return RecordOutcome::ProcessingFailed;
        }
    };

    let is_gzip = is_gzip_compressed(&payload);
    let raw_data = if is_gzip {
        match gzip_decode(&payload) {
            Ok(data) => data,
            Err(e) => {
                tracing::error!(record_id, detail = %e, "record data gzip decode failed");
                return RecordOutcome::ProcessingFailed;
            }
        }
    } else {
        payload
    };

    if tracing::enabled!(tracing::Level::DEBUG) {
        let dump: String = String::from_utf8_lossy(&raw_data)
            .chars()
            .take(DUMP_MAX_CHARS)
            .collect();
        tracing::debug!(record_id, data = %dump, is_gzip, "record data dump (max=64chars)");
    }

    let data: Value = match serde_json::from_slice(&raw_data) {
        Ok(data) => data,
        Err(e) => {
            tracing::error!(record_id, detail = %e, "record data unmarshal failed");
            return RecordOutcome::ProcessingFailed;
        }
    };

    let output = match query.evaluate(data, deadline) {
        Ok(output) => output,
        Err(e) => {
            tracing::error!(record_id, detail = %e, "query run failed");
            return RecordOutcome::ProcessingFailed;
        }
    };

    if output.is_empty() {
        return RecordOutcome::Dropped;
    }

    match to_ndjson(&output) {
        Ok(data) => RecordOutcome::Ok(data),
        Err(e) => {
            tracing::error!(record_id, detail = %e, "output marshal failed");
            RecordOutcome::ProcessingFailed
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use chrono::Duration;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn record(data: &[u8]) -> FirehoseRecord {
        FirehoseRecord {
            record_id: "record-1".to_string(),
            approximate_arrival_timestamp: 1495072949453,
            data: STANDARD.encode(data),
        }
    }

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_gzip_detection() {
        assert!(is_gzip_compressed(&gzip(b"{}")));
        assert!(!is_gzip_compressed(b"{}"));
        assert!(!is_gzip_compressed(&[0x1f]));
        assert!(!is_gzip_compressed(&[]));
    }

    #[test]
    fn test_gzip_decode() {
        let decoded = gzip_decode(&gzip(br#"{"a":1}"#)).unwrap();
        assert_eq!(decoded, br#"{"a":1}"#.to_vec());

        let result = gzip_decode(&[0x1f, 0x8b, 0x00, 0x01]);
        assert!(matches!(result, Err(BootstrapError::GzipError(_))));
    }

    #[test]
    fn test_ok_outcome_is_ndjson() {
        let query = CompiledQuery::new(".items[]").unwrap();
        let outcome = transform_record(&query, &record(br#"{"items":[{"a":1},2]}"#), None);
        assert_eq!(outcome, RecordOutcome::Ok(b"{\"a\":1}\n2\n".to_vec()));
    }

    #[test]
    fn test_gzip_record_is_decompressed() {
        let query = CompiledQuery::new(".count += 1").unwrap();
        let outcome = transform_record(&query, &record(&gzip(br#"{"count":1}"#)), None);
        assert_eq!(outcome, RecordOutcome::Ok(b"{\"count\":2}\n".to_vec()));
    }

    #[test]
    fn test_dropped_when_query_yields_nothing() {
        let query = CompiledQuery::new("empty").unwrap();
        let outcome = transform_record(&query, &record(br#"{"a":1}"#), None);
        assert_eq!(outcome, RecordOutcome::Dropped);
    }

    #[test]
    fn test_processing_failed() {
        let query = CompiledQuery::new(".a[]").unwrap();

        // 非法 JSON
        let outcome = transform_record(&query, &record(b"{not json"), None);
        assert_eq!(outcome, RecordOutcome::ProcessingFailed);

        // 壞掉的 gzip
        let outcome = transform_record(&query, &record(&[0x1f, 0x8b, 0xff, 0xff]), None);
        assert_eq!(outcome, RecordOutcome::ProcessingFailed);

        // 非法 base64
        let mut bad_base64 = record(br#"{"a":[1]}"#);
        bad_base64.data = "%%%".to_string();
        let outcome = transform_record(&query, &bad_base64, None);
        assert_eq!(outcome, RecordOutcome::ProcessingFailed);

        // 執行期錯誤
        let outcome = transform_record(&query, &record(br#"{"a":1}"#), None);
        assert_eq!(outcome, RecordOutcome::ProcessingFailed);

        let past = Utc::now() - Duration::seconds(1);
        let outcome = transform_record(&query, &record(br#"{"a":[1]}"#), Some(past));
        assert_eq!(outcome, RecordOutcome::ProcessingFailed);
    }
}
