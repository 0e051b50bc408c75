use crate::core::query::Query;
use crate::core::record::transform_record;
use crate::domain::model::{
    FirehoseEvent, FirehoseRecord, FirehoseResponse, FirehoseResponseRecord, Invocation,
    RecordOutcome,
};
use crate::domain::ports::InvocationHandler;
use crate::utils::error::{BootstrapError, Result};
use crate::VERSION;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::ops::Range;
use tokio::task::JoinHandle;

/// Kinesis Data Firehose transformation mode.
///
/// The query is validated once when the handler is built. Records are split
/// into at most `max_concurrency` contiguous chunks, each transformed on a
/// blocking worker, and the response keeps the input order.
#[derive(Debug, Clone)]
pub struct FirehoseHandler {
    query: Query,
    max_concurrency: usize,
}

impl FirehoseHandler {
    pub fn new(query: &str, max_concurrency: usize) -> Result<Self> {
        let query = Query::parse(query).map_err(|e| BootstrapError::ConfigError {
            message: format!("firehose handler init failed: {}", e),
        })?;
        Ok(Self {
            query,
            max_concurrency: max_concurrency.max(1),
        })
    }

    pub async fn transform(&self, event: FirehoseEvent, invocation: &Invocation) -> FirehoseResponse {
        tracing::info!(
            invocation_id = %event.invocation_id,
            delivery_stream_arn = %event.delivery_stream_arn,
            records_count = event.records.len(),
            query = self.query.source(),
            version = VERSION,
            "handle invocation"
        );

        let total = event.records.len();
        if total == 0 {
            return FirehoseResponse::default();
        }

        let record_ids: Vec<String> = event.records.iter().map(|r| r.record_id.clone()).collect();
        let chunk_size = total.div_ceil(self.max_concurrency);

        let mut workers: Vec<(Range<usize>, JoinHandle<Vec<FirehoseResponseRecord>>)> =
            Vec::with_capacity(self.max_concurrency);
        let mut records = event.records.into_iter();
        let mut start = 0;
        loop {
            let chunk: Vec<FirehoseRecord> = records.by_ref().take(chunk_size).collect();
            if chunk.is_empty() {
                break;
            }
            let range = start..start + chunk.len();
            start = range.end;

            let query = self.query.clone();
            let deadline = invocation.deadline;
            let span = tracing::Span::current();
            let handle = tokio::task::spawn_blocking(move || {
                span.in_scope(|| transform_chunk(&query, chunk, deadline))
            });
            workers.push((range, handle));
        }

        FirehoseResponse {
            records: join_workers(workers, &record_ids).await,
        }
    }
}

/// Waits for every worker and lays their results out in input order. A
/// worker that panicked fails each record of its range.
async fn join_workers(
    workers: Vec<(Range<usize>, JoinHandle<Vec<FirehoseResponseRecord>>)>,
    record_ids: &[String],
) -> Vec<FirehoseResponseRecord> {
    // 等待所有 worker 完成才回應
    let mut records = Vec::with_capacity(record_ids.len());
    for (range, handle) in workers {
        match handle.await {
            Ok(results) => records.extend(results),
            Err(e) => {
                tracing::error!(detail = %e, records = range.len(), "record worker failed");
                records.extend(record_ids[range].iter().map(|record_id| {
                    FirehoseResponseRecord::new(record_id.clone(), RecordOutcome::ProcessingFailed)
                }));
            }
        }
    }
    records
}

fn transform_chunk(
    query: &Query,
    chunk: Vec<FirehoseRecord>,
    deadline: Option<DateTime<Utc>>,
) -> Vec<FirehoseResponseRecord> {
    let compiled = match query.compile() {
        Ok(compiled) => compiled,
        Err(e) => {
            tracing::error!(detail = %e, "query compile failed on worker");
            return chunk
                .into_iter()
                .map(|record| FirehoseResponseRecord::new(record.record_id, RecordOutcome::ProcessingFailed))
                .collect();
        }
    };

    chunk
        .into_iter()
        .map(|record| {
            tracing::info!(
                record_id = %record.record_id,
                approximate_arrival_timestamp = ?record.arrival_time(),
                "handle record"
            );
            let outcome = transform_record(&compiled, &record, deadline);
            FirehoseResponseRecord::new(record.record_id, outcome)
        })
        .collect()
}

#[async_trait]
impl InvocationHandler for FirehoseHandler {
    async fn handle(&self, payload: Value, invocation: &Invocation) -> Result<Value> {
        let event: FirehoseEvent = serde_json::from_value(payload)?;
        let response = self.transform(event, invocation).await;
        Ok(serde_json::to_value(response)?)
    }
}
