//! Fan-out reverse proxy.
//!
//! Every request on an allowlisted path is replayed unmodified to all
//! configured endpoints at once. The caller gets back the successful response
//! with the longest body, or an empty 200 when no endpoint succeeded.

pub mod config;
pub mod dispatcher;
pub mod endpoint;
pub mod errors;
pub mod http;
pub mod metrics_defs;
pub mod routing;
pub mod selector;
pub mod service;
pub mod snapshot;

#[cfg(test)]
mod testutils;

use shared::admin_service::AdminService;
use shared::http::run_http_service;

use crate::config::Config;
use crate::dispatcher::Dispatcher;
use crate::errors::FanoutError;
use crate::routing::ProxyPaths;
use crate::service::FanoutService;

/// Builds the proxy from `config`. Fails if any endpoint cannot be resolved.
pub fn build_service(config: &Config) -> Result<FanoutService, FanoutError> {
    let endpoints = endpoint::resolve(&config.endpoints)?;
    for endpoint in &endpoints {
        tracing::info!(
            endpoint = %endpoint,
            scheme = %endpoint.scheme,
            host = %endpoint.host,
            base_path = %endpoint.base_path,
            "Resolved endpoint"
        );
    }

    let client = crate::http::build_client()?;
    let dispatcher = Dispatcher::new(client, endpoints, config.proxy_timeout());

    let paths = ProxyPaths::new(&config.proxy_paths);
    if paths.is_empty() {
        tracing::warn!("No proxy paths configured, every request gets an empty 200");
    }
    tracing::info!(
        endpoints = dispatcher.endpoints().len(),
        proxy_paths = paths.len(),
        timeout_ms = config.proxy_timeout_ms,
        "Fan-out proxy configured"
    );

    Ok(FanoutService::new(paths, dispatcher))
}

pub async fn run(config: Config) -> Result<(), FanoutError> {
    let service = build_service(&config)?;

    let proxy_task = run_http_service::<_, _, FanoutError>(
        &config.listener.host,
        config.listener.port,
        service,
    );

    match &config.admin_listener {
        Some(admin) => {
            let admin_task = run_http_service::<_, _, FanoutError>(
                &admin.host,
                admin.port,
                AdminService::<_, FanoutError>::new(|| true),
            );
            tokio::try_join!(proxy_task, admin_task)?;
        }
        None => proxy_task.await?,
    }

    Ok(())
}
