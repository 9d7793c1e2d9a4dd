use axum::extract::State;
use axum::http::Method;
use axum::routing::get;
use axum::{Json, Router};
use log;
use tower_http::cors::{Any, CorsLayer};

use mindmeld::service::RoomService;
use mindmeld::ws::ws_handler;

async fn root() -> &'static str {
    "mindmeld game server"
}

// Liveness report: live room and connection counts
async fn status(State(service): State<RoomService>) -> Json<serde_json::Value> {
    let (rooms, players) = service.stats().await;
    Json(serde_json::json!({
        "status": "running",
        "version": mindmeld::VERSION,
        "rooms": rooms,
        "players": players,
    }))
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Initialize logger
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    env_logger::init();

    let service = RoomService::new();

    // Configure CORS
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .allow_origin(Any);

    // Create router with routes
    let app = Router::new()
        .route("/", get(root))
        .route("/status", get(status))
        .route("/ws", get(ws_handler))
        .with_state(service)
        .layer(cors);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3001);
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    log::info!("Starting mindmeld server on port {}", port);

    axum::serve(listener, app).await
}
