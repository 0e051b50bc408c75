use crate::domain::model::Invocation;
use crate::utils::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// A Lambda handler working on raw JSON payloads.
#[async_trait]
pub trait InvocationHandler: Send + Sync {
    async fn handle(&self, payload: Value, invocation: &Invocation) -> Result<Value>;
}
