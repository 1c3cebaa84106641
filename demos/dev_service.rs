//! Minimal service wired up with the request correlator.
//!
//! Run in development mode to watch the console/file path:
//!
//! ```sh
//! APP_ENV=development cargo run --example dev_service
//! ```
//!
//! or point it at a collector:
//!
//! ```sh
//! CORRELOG_BUS_ADDR=127.0.0.1:5555 cargo run --example dev_service
//! ```

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use correlog::{configure_from_env, log_application, request_correlator};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();
    configure_from_env();

    log_application("info", "dev_service starting on 127.0.0.1:3000");

    let app = Router::new()
        .route("/widgets", get(|| async { "widgets" }))
        .route(
            "/broken",
            get(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        )
        .layer(request_correlator());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:3000")
        .await
        .expect("bind demo listener");
    axum::serve(listener, app).await.expect("serve demo app");
}
