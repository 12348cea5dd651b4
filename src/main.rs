use anyhow::Context;
use clap::Parser;
use event_board_gateway::backend::{BackendClient, health_checker};
use event_board_gateway::build_router;
use event_board_gateway::config::Args;
use event_board_gateway::limits::EventLimits;
use event_board_gateway::state::AppState;
use event_board_gateway::sweeper::sweeper;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // parse cli arguments
    let args = Args::parse();
    init_tracing(args.log_json);

    let backend = Arc::new(BackendClient::new(
        reqwest::Client::new(),
        &args.backend_url,
        args.api_key.clone(),
    ));

    // creating shared state
    let state = Arc::new(AppState {
        backend: backend.clone(),
        limits: EventLimits::new(args.create_config(), args.join_config()),
        enforce_create_limit: args.enforce_create_limit,
    });

    tokio::spawn(health_checker(
        backend,
        Duration::from_secs(args.health_interval.max(1)),
    ));
    tokio::spawn(sweeper(
        state.clone(),
        Duration::from_secs(args.sweep_interval.max(1)),
        Duration::from_secs(args.sweep_grace),
    ));

    let app = build_router(state);

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    info!(port = args.port, backend = %args.backend_url, "gateway running");
    info!(
        limit = args.join_limit,
        window_secs = args.join_window,
        "join limit"
    );
    info!(
        limit = args.create_limit,
        window_secs = args.create_window,
        enforced = args.enforce_create_limit,
        "creation limit"
    );

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
