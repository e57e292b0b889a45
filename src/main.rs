use anyhow::Result;
use onclick_pay::{
    client::OnClickClient,
    config::Config,
    handlers::{router, AppState},
    services::FlowStats,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    tracing::info!("Starting OnClick payment service v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Network: {}", config.network);

    let client = OnClickClient::connect(&config).await?;

    let stats = Arc::new(FlowStats::new());
    stats.clone().track(client.flow.transitions());

    let state = AppState {
        network: config.network,
        flow: client.flow.clone(),
        pages: client.pages.clone(),
        stats,
        probe: client.chain.clone(),
    };

    let app = router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http().make_span_with(DefaultMakeSpan::default()))
            .layer(CorsLayer::permissive()),
    );

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on http://{}", addr);
    tracing::info!("Flow stream: ws://{}/ws/flow", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to listen for ctrl+c");
    tracing::info!("Shutting down gracefully...");
}
