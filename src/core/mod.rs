pub mod default_handler;
pub mod firehose_handler;
pub mod query;
pub mod record;

pub use crate::domain::model::{Invocation, Payload, RecordOutcome};
pub use crate::domain::ports::InvocationHandler;
pub use crate::utils::error::Result;
