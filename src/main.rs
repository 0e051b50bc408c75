use clap::Parser;
use jq_lambda::app::runtime;
use jq_lambda::utils::{logger, validation::Validate};
use jq_lambda::{BootstrapError, CliConfig, VERSION};
use std::io::Write;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();
    let in_lambda = runtime::is_lambda_environment();

    // 初始化日誌
    if in_lambda {
        logger::init_lambda_logger(config.log_level);
    } else {
        logger::init_local_logger(config.log_level);
    }

    tracing::info!(version = VERSION, mode = %config.mode, "start up bootstrap");

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        std::process::exit(e.exit_code());
    }

    let handler = match runtime::build_handler(&config) {
        Ok(handler) => handler,
        Err(e) => {
            tracing::error!(mode = %config.mode, detail = %e, "handler init failed");
            std::process::exit(e.exit_code());
        }
    };

    if in_lambda {
        if let Err(e) = runtime::run_lambda(handler).await {
            tracing::error!(detail = %e, "lambda runtime stopped");
            std::process::exit(1);
        }
        return Ok(());
    }

    match runtime::run_local(handler).await {
        Ok(output) => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&output)?;
            stdout.write_all(b"\n")?;
            stdout.flush()?;
        }
        Err(e) => {
            tracing::error!("{:#}", e);
            let exit_code = e
                .downcast_ref::<BootstrapError>()
                .map(BootstrapError::exit_code)
                .unwrap_or(1);
            std::process::exit(exit_code);
        }
    }

    Ok(())
}
