use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use thumbnail_gateway::append::Appender;
use thumbnail_gateway::config::Args;
use thumbnail_gateway::policy::PolicyTable;
use thumbnail_gateway::rate_limit::RateGovernor;
use thumbnail_gateway::state::AppState;
use thumbnail_gateway::store::MemoryStore;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // parse cli arguments
    let args = Args::parse();

    let policies = match &args.policy_file {
        Some(path) => PolicyTable::from_file(path)?,
        None => PolicyTable::default(),
    };
    for (route, policy) in policies.routes() {
        tracing::info!(
            route,
            limit = policy.limit_per_window,
            window_ms = policy.window_ms,
            "rate policy"
        );
    }

    let state = Arc::new(AppState {
        governor: Arc::new(RateGovernor::new(args.max_rate_keys)),
        policies,
        store: Arc::new(MemoryStore::new()),
        appender: Appender::new(args.append_attempts),
        max_comment_len: args.max_comment_len,
        trust_forwarded: args.trust_forwarded,
    });

    let app = thumbnail_gateway::router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("thumbnail gateway listening on {}", addr);
    tracing::info!(
        max_rate_keys = args.max_rate_keys,
        append_attempts = args.append_attempts,
        "concurrency settings"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
