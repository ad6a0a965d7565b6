use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::Config;
use crate::logbook::{FileExporter, FileStore, InstallerLog};
use crate::position::SharedPosition;
use crate::session::{Aligner, CommandNotifier, HapticNotifier, LogNotifier};
use crate::telemetry::{TelemetryClient, TelemetrySampler};

use super::api::align as align_handlers;
use super::api::logbook as log_handlers;
use super::api::sensors as sensor_handlers;
use super::api_doc::ApiDoc;
use super::auth::AppState;

pub async fn run_server(config: Config) -> std::io::Result<()> {
    let bind_addr = config.web.bind.clone();

    let client = TelemetryClient::new(config.telemetry.url.clone());
    let sampler = TelemetrySampler::new(client, config.telemetry.poll_interval);

    let store = FileStore::new(config.logbook.storage_file.clone());
    let logbook = InstallerLog::load(Box::new(store));
    log::info!("installer log loaded with {} entries", logbook.len());

    let notifier: Arc<dyn HapticNotifier> = match &config.feedback.lock_command {
        Some(command) => Arc::new(CommandNotifier::new(command.clone())),
        None => Arc::new(LogNotifier),
    };

    let position = SharedPosition::new(config.station.position());
    if let Some(name) = &config.station.name {
        log::info!("station profile: {}", name);
    }

    let mut aligner = Aligner::new(sampler, logbook, notifier, config.tolerances, position);
    aligner
        .start()
        .map_err(|e| std::io::Error::other(e.to_string()))?;

    let exporter = FileExporter::new(config.logbook.export_folder.clone());

    let state = AppState {
        config: Arc::new(config),
        aligner: Arc::new(Mutex::new(aligner)),
        exporter: Arc::new(exporter),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        // Alignment endpoints
        .route("/api/align/status", get(align_handlers::status))
        .route("/api/align/tolerance", put(align_handlers::set_tolerance))
        // Sensor ingest endpoints
        .route("/api/sensors/heading", post(sensor_handlers::push_heading))
        .route(
            "/api/sensors/position",
            post(sensor_handlers::push_position),
        )
        // Installer log endpoints
        .route("/api/log", get(log_handlers::list))
        .route("/api/log/reset", post(log_handlers::reset))
        .route("/api/log/export", post(log_handlers::export))
        // OpenAPI / Swagger
        .merge(SwaggerUi::new("/swagger-ui").url("/api-doc/openapi.json", ApiDoc::openapi()))
        // Middleware
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    log::info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await
}
