//! Shelfmark web server
//!
//! Serves offline archives, thumbnails, readable content and a read-only JSON
//! bookmark API from the same data directory the CLI writes.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use axum::http::Method;
use clap::Parser;
use shelfmark_core::{AppConfig, BookmarkStore};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod handlers;
mod routes;

#[derive(Parser, Debug)]
#[command(name = "shelfmark-server", version, about = "Serve Shelfmark bookmarks and archives over HTTP")]
struct Args {
    /// Address to listen on, overriding the config file
    #[arg(long, value_name = "ADDR")]
    bind: Option<String>,

    /// Directory holding the database, archives and thumbnails
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let mut config = AppConfig::load().context("Failed to load configuration")?;
    if let Some(dir) = args.data_dir {
        config.data_dir = dir;
    }
    let bind = args.bind.unwrap_or_else(|| config.bind.clone());
    let addr: SocketAddr = bind.parse().with_context(|| format!("Invalid listen address {bind}"))?;

    let data = config.data();
    let store = BookmarkStore::open(&data.database())
        .with_context(|| format!("Failed to open database in {}", data.root().display()))?;

    let cors = CorsLayer::new().allow_methods([Method::GET]).allow_headers(Any).allow_origin(Any);
    let app = routes::create_router(handlers::AppState::new(store, data)).layer(
        ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(CompressionLayer::new()).layer(cors),
    );

    let listener = TcpListener::bind(&addr).await.context("Failed to bind HTTP server")?;
    info!("listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutting down");
        })
        .await
        .context("HTTP server error")?;

    Ok(())
}
