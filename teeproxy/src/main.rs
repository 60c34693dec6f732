use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;

mod config;
mod logging;
mod statsd;

use config::Config;

/// Replays allowlisted requests to every configured endpoint and answers with
/// the best response.
#[derive(Parser)]
#[command(name = "teeproxy", version)]
struct Cli {
    /// YAML configuration file; built-in defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Target endpoints, multiple split by comma. Replaces the configured list.
    #[arg(long)]
    endpoint: Option<String>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match Config::from_file(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => Config::default(),
    };

    if let Some(list) = &cli.endpoint {
        config.override_endpoints(list);
    }

    if let Err(e) = config.validate() {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    let _sentry_guard = logging::init(config.common.logging.as_ref());

    if let Err(e) = statsd::init(config.common.metrics.as_ref()) {
        tracing::error!(error = %e, "Failed to initialize metrics");
        return ExitCode::FAILURE;
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!(error = %e, "Failed to start runtime");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        host = %config.proxy.listener.host,
        port = config.proxy.listener.port,
        "Starting teeproxy"
    );

    let result = rt.block_on(async {
        tokio::select! {
            result = fanout::run(config.proxy) => result,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received shutdown signal");
                Ok(())
            }
        }
    });

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "teeproxy exited with error");
            ExitCode::FAILURE
        }
    }
}
