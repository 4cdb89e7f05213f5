use axum::{
    http::{header::CACHE_CONTROL, HeaderValue, StatusCode},
    response::IntoResponse,
    Router,
};
use tower_http::{
    services::{ServeDir, ServeFile},
    set_header::SetResponseHeaderLayer,
};

mod adapter;
mod binding;
mod error;
mod provider;
mod request_log;
mod stat;
mod sync;
mod vendor;
mod vendor_key;

pub use error::BaseError;

use adapter::create_adapter_router;
use binding::create_binding_router;
use provider::create_provider_router;
use request_log::create_log_router;
use stat::create_stat_router;
use sync::create_sync_router;
use vendor::create_vendor_router;
use vendor_key::create_vendor_key_router;

async fn handle_404() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not Found")
}

pub fn create_router() -> Router {
    let serve_dir = ServeDir::new("public").fallback(ServeFile::new("public/index.html"));

    let ui_router = Router::new()
        .nest_service("/ui", serve_dir)
        .layer(SetResponseHeaderLayer::overriding(
            CACHE_CONTROL,
            HeaderValue::from_static("no-cache, no-store, must-revalidate"),
        ));

    let sync_router = Router::new()
        .merge(create_adapter_router())
        .merge(create_binding_router())
        .merge(create_sync_router());

    let api_router = Router::new().nest(
        "/api",
        Router::new()
            .merge(create_vendor_router())
            .merge(create_vendor_key_router())
            .merge(create_provider_router())
            .merge(create_log_router())
            .merge(create_stat_router())
            .nest("/sync", sync_router),
    );

    Router::new()
        .merge(ui_router)
        .merge(api_router)
        .fallback(handle_404)
}
