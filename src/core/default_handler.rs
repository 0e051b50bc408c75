use crate::core::query::CompiledQuery;
use crate::domain::model::{Invocation, Payload};
use crate::domain::ports::InvocationHandler;
use crate::utils::error::Result;
use crate::VERSION;
use async_trait::async_trait;
use serde_json::Value;

/// Single-record mode: the payload carries its own query and data.
#[derive(Debug, Clone)]
pub struct DefaultHandler {
    default_query: String,
}

impl DefaultHandler {
    pub fn new(default_query: impl Into<String>) -> Self {
        Self {
            default_query: default_query.into(),
        }
    }

    pub fn run(&self, payload: Payload, invocation: &Invocation) -> Result<Option<Value>> {
        tracing::info!(
            request_id = %invocation.request_id,
            query = payload.query.as_deref().unwrap_or_default(),
            version = VERSION,
            "handle invocation"
        );

        // 沒有指定 query 時使用預設值
        let source = match payload.query.as_deref() {
            Some(query) if !query.is_empty() => query,
            _ => self.default_query.as_str(),
        };

        let query = CompiledQuery::new(source).inspect_err(|e| {
            tracing::error!(detail = %e, "query parse failed");
        })?;

        let mut output = query.evaluate(payload.data, invocation.deadline).inspect_err(|e| {
            tracing::error!(detail = %e, "query run failed");
        })?;

        Ok(match output.len() {
            0 => None,
            1 => output.pop(),
            _ => Some(Value::Array(output)),
        })
    }
}

#[async_trait]
impl InvocationHandler for DefaultHandler {
    async fn handle(&self, payload: Value, invocation: &Invocation) -> Result<Value> {
        let payload: Payload = serde_json::from_value(payload)?;
        Ok(self.run(payload, invocation)?.unwrap_or(Value::Null))
    }
}
