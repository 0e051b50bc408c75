pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use config::{CliConfig, LogLevel, Mode};
pub use crate::core::{default_handler::DefaultHandler, firehose_handler::FirehoseHandler, query::Query};
pub use domain::model::{
    FirehoseEvent, FirehoseRecord, FirehoseResponse, FirehoseResponseRecord, Invocation, Payload,
    RecordOutcome, RecordResult,
};
pub use domain::ports::InvocationHandler;
pub use utils::error::{BootstrapError, Result};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
