use crate::utils::error::Result;
use crate::utils::validation::{validate_non_empty_string, validate_range, Validate};
use clap::{Parser, ValueEnum};
use std::fmt;

/// Firehose 批次同時執行的 worker 上限
pub const MAX_CONCURRENCY_LIMIT: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Direct invocation: `{"query": ..., "data": ...}`
    Default,
    /// Kinesis Data Firehose record transformation
    Firehose,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Default => write!(f, "default"),
            Mode::Firehose => write!(f, "firehose"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    /// debug 時附帶原始碼位置
    pub fn adds_source(&self) -> bool {
        matches!(self, LogLevel::Debug)
    }
}

fn default_max_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .min(MAX_CONCURRENCY_LIMIT)
}

#[derive(Debug, Clone, Parser)]
#[command(name = "bootstrap", version)]
#[command(about = "Apply jq queries to Lambda invocation payloads")]
pub struct CliConfig {
    #[arg(long, env = "LOG_LEVEL", value_enum, ignore_case = true, default_value = "info", help = "output log level")]
    pub log_level: LogLevel,

    #[arg(long, env = "MODE", value_enum, default_value = "default", help = "handler mode(default|firehose)")]
    pub mode: Mode,

    #[arg(long, env = "QUERY", default_value = ".", help = "default query")]
    pub query: String,

    #[arg(long, env = "MAX_CONCURRENCY", default_value_t = default_max_concurrency(), help = "upper bound of concurrent record workers in firehose mode")]
    pub max_concurrency: usize,
}

impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("query", &self.query)?;
        validate_range("max_concurrency", self.max_concurrency, 1, MAX_CONCURRENCY_LIMIT)?;

        tracing::debug!("✅ Configuration validation passed");
        Ok(())
    }
}
