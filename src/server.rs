//! HTTP(S) listener for the rainfall API

use crate::cli::CommandLineArgs;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use axum::ServiceExt;
use axum_server::{tls_rustls::RustlsConfig, Handle};
use expanduser::expanduser;
use thiserror::Error;
use tokio::signal;

/// Reasons the listener could not be started or stopped running.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid listen address {0}")]
    Address(String),

    #[error("cannot resolve {kind} path {path}: {source}")]
    TlsPath {
        kind: &'static str,
        path: String,
        source: std::io::Error,
    },

    #[error("cannot load TLS certificate and key: {0}")]
    TlsConfig(std::io::Error),

    #[error("listener failed: {0}")]
    Listener(std::io::Error),
}

/// Parse the `--host` and `--port` arguments into a socket address.
fn socket_addr(host: &str, port: u16) -> Result<SocketAddr, ServerError> {
    let addr = format!("{}:{}", host, port);
    addr.parse().map_err(|_| ServerError::Address(addr))
}

/// Expand `~` and make a certificate or key path absolute. The file must exist.
fn resolve_path(kind: &'static str, path: &str) -> Result<PathBuf, ServerError> {
    let error = |source| ServerError::TlsPath {
        kind,
        path: path.to_string(),
        source,
    };
    expanduser(path).map_err(error)?.canonicalize().map_err(error)
}

async fn tls_config(args: &CommandLineArgs) -> Result<RustlsConfig, ServerError> {
    let cert_file = resolve_path("certificate", &args.cert_file)?;
    let key_file = resolve_path("key", &args.key_file)?;
    RustlsConfig::from_pem_file(cert_file, key_file)
        .await
        .map_err(ServerError::TlsConfig)
}

/// Run the service until a shutdown signal has been handled.
///
/// Listens over HTTPS when `--https` is given, otherwise plain HTTP.
pub async fn serve(
    args: &CommandLineArgs,
    service: crate::app::Service,
) -> Result<(), ServerError> {
    let addr = socket_addr(&args.host, args.port)?;
    let handle = Handle::new();
    tokio::spawn(shutdown_on_signal(
        handle.clone(),
        Duration::from_secs(args.graceful_shutdown_timeout),
    ));

    let make_service = service.into_make_service();
    let result = if args.https {
        let config = tls_config(args).await?;
        tracing::info!("listening on https://{}", addr);
        axum_server::bind_rustls(addr, config)
            .handle(handle)
            .serve(make_service)
            .await
    } else {
        tracing::info!("listening on http://{}", addr);
        axum_server::bind(addr)
            .handle(handle)
            .serve(make_service)
            .await
    };
    result.map_err(ServerError::Listener)
}

/// Wait for Ctrl-C or SIGTERM, then stop accepting connections.
///
/// Open requests get `grace` to finish. Archive fetches still in flight after that are abandoned.
async fn shutdown_on_signal(handle: Handle, grace: Duration) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("cannot listen for Ctrl-C: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!("cannot listen for SIGTERM: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutting down, waiting up to {:?} for open requests", grace);
    handle.graceful_shutdown(Some(grace));
}
