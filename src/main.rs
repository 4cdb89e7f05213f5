use axum::Router;
use config::CONFIG;
use controller::create_router;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod adapter;
mod config;
mod controller;
mod database;
mod service;
mod utils;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&CONFIG.log_level))
        .init();

    database::init();
    database::adapter::AdapterSetting::register_builtin(&adapter::REGISTRY)
        .expect("failed to register adapters");

    let addr = format!("{}:{}", &CONFIG.host, CONFIG.port);
    info!("server start at {}", &addr);
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    // Nesting at "/" is rejected by axum; mount the router directly then.
    let app = if CONFIG.base_path.is_empty() || CONFIG.base_path == "/" {
        create_router()
    } else {
        Router::new().nest(&CONFIG.base_path, create_router())
    };
    axum::serve(listener, app)
        .await
        .expect("failed to start server");
}
