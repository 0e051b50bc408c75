use crate::config::LogLevel;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn build_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = level.as_str();
        EnvFilter::new(format!("warn,jq_lambda={level},bootstrap={level}"))
    })
}

pub fn init_local_logger(level: LogLevel) {
    tracing_subscriber::registry()
        .with(build_filter(level))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_thread_ids(false)
                .with_file(level.adds_source())
                .with_line_number(level.adds_source())
                .compact(),
        )
        .init();
}

pub fn init_lambda_logger(level: LogLevel) {
    tracing_subscriber::registry()
        .with(build_filter(level))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_file(level.adds_source())
                .with_line_number(level.adds_source())
                .without_time()
                .json(), // CloudWatch 會自行加上時間戳
        )
        .init();
}
