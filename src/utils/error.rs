use thiserror::Error;

#[derive(Error, Debug)]
pub enum BootstrapError {
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("record data base64 decode failed: {0}")]
    Base64Error(#[from] base64::DecodeError),

    #[error("gzip decode failed: {0}")]
    GzipError(#[source] std::io::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid configuration value for '{field}': {value} ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("query parse failed: {message}")]
    QueryParseError { message: String },

    #[error("query iter err: {message}")]
    QueryRunError { message: String },

    #[error("invocation deadline exceeded")]
    DeadlineExceeded,
}

impl BootstrapError {
    /// 設定錯誤在啟動時是致命的
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            BootstrapError::ConfigError { .. } | BootstrapError::InvalidConfigValueError { .. }
        )
    }

    /// 與 clap 參數錯誤一致，設定錯誤使用 2，其他失敗使用 1
    pub fn exit_code(&self) -> i32 {
        if self.is_config_error() {
            2
        } else {
            1
        }
    }
}

pub type Result<T> = std::result::Result<T, BootstrapError>;
