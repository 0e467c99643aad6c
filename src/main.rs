use axum::{
    body::Body,
    http::{header, Request},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};

use quiz_battle_backend::api::{self, AppState};
use quiz_battle_backend::config::Config;
use quiz_battle_backend::engine::server::BattleServer;
use quiz_battle_backend::metrics;

async fn health_check() -> Json<Value> {
    Json(json!({ "status": "ok", "service": "quiz-battle-backend" }))
}

async fn metrics_handler() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics::gather_metrics(),
    )
}

/// Count and time every request, labelled by normalized path.
async fn track_metrics(req: Request<Body>, next: Next) -> Response {
    let method = req.method().to_string();
    let endpoint = metrics::normalize_path(req.uri().path());
    let start = std::time::Instant::now();

    let response = next.run(req).await;

    metrics::API_REQUEST_DURATION_SECONDS
        .with_label_values(&[endpoint.as_str()])
        .observe(start.elapsed().as_secs_f64());
    metrics::API_REQUESTS_TOTAL
        .with_label_values(&[method.as_str(), endpoint.as_str(), response.status().as_str()])
        .inc();
    response
}

/// Periodically drop finished battles once their results have lingered long enough.
fn spawn_reaper(battle_server: Arc<BattleServer>, config: &Config) {
    let linger = config.finished_linger;
    let period = (linger / 4).max(std::time::Duration::from_secs(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            let reaped = battle_server.reap_finished(linger);
            if reaped > 0 {
                tracing::debug!(reaped, "Reaped finished battles");
            }
        }
    });
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let config = Config::load();
    metrics::register_metrics();

    let battle_server = Arc::new(BattleServer::new(
        config.tick_interval,
        config.max_active_battles,
    ));
    spawn_reaper(battle_server.clone(), &config);

    let mut app = Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .merge(api::router(AppState::new(battle_server, &config)));

    // Serve a pre-built frontend when configured; unknown paths fall back to index.html
    if let Some(static_dir) = &config.static_dir {
        let index = static_dir.join("index.html");
        app = app.fallback_service(ServeDir::new(static_dir).fallback(ServeFile::new(index)));
        tracing::info!("Serving static files from {}", static_dir.display());
    }

    let app = app
        .layer(middleware::from_fn(track_metrics))
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("Failed to bind to {addr}: {e}"));

    tracing::info!(
        port = config.port,
        questions_dir = %config.questions_dir.display(),
        "Quiz battle backend listening"
    );
    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
