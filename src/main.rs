mod cache;
mod config;
mod datastore;
mod error;
mod guide;
mod handlers;
mod metrics;
mod models;
mod parser;
mod pipeline;
mod prompts;
mod rate_limit;
mod sections;
mod state;
mod upstream;

use anyhow::Context;
use clap::Parser; // for cli
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Args, LogFormat};
use crate::state::AppState;

fn setup_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => subscriber.with(fmt::layer().json()).init(),
        LogFormat::Text => subscriber.with(fmt::layer()).init(),
    }
}

// this is main async function with tokio
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // a missing .env file is fine
    dotenvy::dotenv().ok();
    let args = Args::parse();
    setup_tracing(&args.log_level, args.log_format);

    if args.api_key.is_none() {
        tracing::warn!("OPENROUTER_API_KEY is not set, generation requests will fail");
    }

    let state = Arc::new(AppState::from_args(&args));
    let app = handlers::router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(
        %addr,
        upstream = %args.api_url,
        analysis_model = %args.analysis_model,
        comment_model = %args.comment_model,
        cache_ttl_secs = args.cache_ttl,
        analyze_rate_limit = args.analyze_rate_limit,
        comment_rate_limit = args.comment_rate_limit,
        rate_window_secs = args.rate_window,
        datastore = args.datastore_url.is_some(),
        "Gateway running"
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server error")?;

    Ok(())
}
