use crate::config::{CliConfig, Mode};
use crate::core::{default_handler::DefaultHandler, firehose_handler::FirehoseHandler, query::Query};
use crate::domain::model::Invocation;
use crate::domain::ports::InvocationHandler;
use crate::utils::error::{BootstrapError, Result};
use anyhow::Context as _;
use chrono::DateTime;
use lambda_runtime::{service_fn, LambdaEvent};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tokio::io::AsyncReadExt;

/// Running under the Lambda runtime API (or a Lambda emulator).
pub fn is_lambda_environment() -> bool {
    let execution_env = std::env::var("AWS_EXECUTION_ENV").unwrap_or_default();
    let runtime_api = std::env::var("AWS_LAMBDA_RUNTIME_API").unwrap_or_default();
    execution_env.starts_with("AWS_Lambda") || !runtime_api.is_empty()
}

pub fn build_handler(config: &CliConfig) -> Result<Arc<dyn InvocationHandler>> {
    match config.mode {
        Mode::Default => {
            // 預設 query 在啟動時就先驗證
            Query::parse(&config.query).map_err(|e| BootstrapError::ConfigError {
                message: format!("default query is invalid: {}", e),
            })?;
            Ok(Arc::new(DefaultHandler::new(config.query.clone())))
        }
        Mode::Firehose => Ok(Arc::new(FirehoseHandler::new(
            &config.query,
            config.max_concurrency,
        )?)),
    }
}

pub fn invocation_from_context(context: &lambda_runtime::Context) -> Invocation {
    let deadline = i64::try_from(context.deadline)
        .ok()
        .and_then(DateTime::from_timestamp_millis);
    Invocation::new(context.request_id.clone(), deadline)
}

pub async fn run_lambda(handler: Arc<dyn InvocationHandler>) -> std::result::Result<(), lambda_runtime::Error> {
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let handler = Arc::clone(&handler);
        async move {
            let (payload, context) = event.into_parts();
            let invocation = invocation_from_context(&context);
            handler
                .handle(payload, &invocation)
                .await
                .map_err(lambda_runtime::Error::from)
        }
    }))
    .await
}

/// Invokes the handler once with a raw JSON payload and returns the
/// serialized response.
pub async fn invoke_local(handler: &dyn InvocationHandler, input: &[u8]) -> anyhow::Result<Vec<u8>> {
    let payload: Value = serde_json::from_slice(input).context("invalid invocation payload")?;
    let output = handler.handle(payload, &Invocation::local()).await?;
    Ok(serde_json::to_vec(&output)?)
}

/// Reads one payload from stdin and invokes the handler, unless a
/// termination signal arrives first.
pub async fn run_local(handler: Arc<dyn InvocationHandler>) -> anyhow::Result<Vec<u8>> {
    let mut input = Vec::new();
    tokio::io::stdin()
        .read_to_end(&mut input)
        .await
        .context("failed to read payload from stdin")?;

    invoke_until(handler.as_ref(), &input, shutdown_signal()).await
}

/// Runs [`invoke_local`] but gives up as soon as `shutdown` resolves.
pub async fn invoke_until<F>(
    handler: &dyn InvocationHandler,
    input: &[u8],
    shutdown: F,
) -> anyhow::Result<Vec<u8>>
where
    F: Future<Output = std::io::Result<&'static str>>,
{
    tokio::select! {
        output = invoke_local(handler, input) => output,
        signal = shutdown => {
            let signal = signal.context("failed to install signal handlers")?;
            anyhow::bail!("invocation interrupted by {}", signal)
        }
    }
}

#[cfg(unix)]
async fn shutdown_signal() -> std::io::Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())?;
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut hangup = signal(SignalKind::hangup())?;

    Ok(tokio::select! {
        _ = terminate.recv() => "SIGTERM",
        _ = interrupt.recv() => "SIGINT",
        _ = hangup.recv() => "SIGHUP",
    })
}

#[cfg(not(unix))]
async fn shutdown_signal() -> std::io::Result<&'static str> {
    tokio::signal::ctrl_c().await?;
    Ok("Ctrl-C")
}
