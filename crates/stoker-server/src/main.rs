#![doc = include_str!("../README.md")]

mod server;

use clap::Parser;
use server::config::{CliArgs, ServerConfig};
use server::service::handler::TaskService;
use server::telemetry::{TelemetryProviders, init_telemetry};
use stoker::CancellationToken;
use tokio::signal;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    let providers = init_telemetry()?;

    let root = CancellationToken::new();
    let service = TaskService::new(&config);
    service.start(&root);

    let listener = tokio::net::TcpListener::bind(config.http_addr).await?;
    tracing::info!(
        workers = config.worker_count,
        capacity = config.queue_capacity,
        "starting task service on {}",
        config.http_addr
    );

    axum::serve(listener, service.router())
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("http server stopped");

    // The pool drains only after request intake has stopped. Its stop()
    // blocks until every worker has exited, so a hard shutdown deadline is
    // enforced here rather than inside the pool.
    match tokio::time::timeout(config.grace_period, service.shutdown()).await {
        Ok(()) => tracing::info!("service shut down successfully"),
        Err(_) => tracing::warn!(
            "workers still draining after grace period of {:?}, exiting anyway",
            config.grace_period
        ),
    }

    flush_telemetry(providers);
    Ok(())
}

fn flush_telemetry(_providers: TelemetryProviders) {
    #[cfg(feature = "metrics")]
    {
        if let Err(err) = _providers.meter_provider.force_flush() {
            eprintln!("Error flushing metrics: {err:#?}");
        }
        if let Err(err) = _providers.meter_provider.shutdown() {
            eprintln!("Error shutting down meter: {err:#?}");
        }
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received Ctrl+C signal");
        },
        () = terminate => {
            tracing::info!("received SIGTERM signal");
        },
    }

    tracing::info!("shutdown signal received, terminating gracefully...");
}
