//! HTTP routes
//!
//! `POST /analyze` accepts a multipart CSV upload and streams pipeline
//! events back as Server-Sent Events; `GET /health` reports liveness.

use crate::app::config::{AnalysisConfig, ServerConfig};
use crate::data::loader::{self, LoadReport};
use crate::pipeline::events::AnalysisEvent;
use crate::pipeline::orchestrator::FAILURE_PREFIX;
use crate::pipeline::stream::spawn_analysis;
use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{
        sse::{Event, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use std::convert::Infallible;
use tokio::sync::mpsc;
use tokio_stream::{wrappers::ReceiverStream, StreamExt};
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info, warn};

/// Largest accepted upload (bytes)
pub const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

/// Service name reported by the health endpoint
pub const SERVICE_NAME: &str = "tower-jumps-analysis";

/// Shared handler state
#[derive(Debug, Clone)]
pub struct AppState {
    /// Defaults for fields the client leaves out
    pub analysis: AnalysisConfig,
    /// Event buffer per request
    pub channel_capacity: usize,
}

impl AppState {
    pub fn new(analysis: AnalysisConfig, channel_capacity: usize) -> Self {
        Self {
            analysis,
            channel_capacity,
        }
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    service: &'static str,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    detail: String,
}

/// Request rejection
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(detail) => {
                warn!(%detail, "Rejected analysis request");
                (StatusCode::BAD_REQUEST, Json(ErrorBody { detail })).into_response()
            }
        }
    }
}

/// Build the application router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/analyze", post(analyze))
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until Ctrl+C
pub async fn serve(server: ServerConfig, analysis: AnalysisConfig) -> crate::Result<()> {
    let address = server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;
    info!(%address, "Starting analysis server");

    let app = router(AppState::new(analysis, server.channel_capacity));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        return;
    }
    info!("Shutdown signal received");
}

async fn health_check() -> Json<HealthResponse> {
    debug!("Health check requested");
    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
    })
}

/// Parsed multipart form
struct AnalyzeForm {
    filename: String,
    content: Vec<u8>,
    config: AnalysisConfig,
}

async fn read_form(mut multipart: Multipart, defaults: &AnalysisConfig) -> Result<AnalyzeForm, ApiError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut config = defaults.clone();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Multipart error: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let filename = field.file_name().unwrap_or_default().to_string();
                if !filename.ends_with(".csv") {
                    return Err(ApiError::BadRequest("File must be a CSV".to_string()));
                }
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {}", e)))?;
                file = Some((filename, data.to_vec()));
            }
            "time_window_minutes" => {
                config.window_minutes = parse_field(&name, field.text().await)?;
            }
            "max_speed_mph" => {
                config = config.with_max_speed_mph(parse_field(&name, field.text().await)?);
            }
            "confidence_threshold" => {
                config.min_confidence_threshold = parse_field(&name, field.text().await)?;
            }
            other => debug!(field = other, "Ignoring unknown form field"),
        }
    }

    let (filename, content) = file.ok_or_else(|| ApiError::BadRequest("Missing 'file' field".to_string()))?;
    Ok(AnalyzeForm {
        filename,
        content,
        config,
    })
}

fn parse_field<T, E>(name: &str, text: Result<String, E>) -> Result<T, ApiError>
where
    T: std::str::FromStr,
    E: std::fmt::Display,
{
    let text = text.map_err(|e| ApiError::BadRequest(format!("Failed to read '{}': {}", name, e)))?;
    text.trim()
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("Invalid value for '{}': {}", name, text)))
}

async fn analyze(State(state): State<AppState>, multipart: Multipart) -> Result<Response, ApiError> {
    let form = read_form(multipart, &state.analysis).await?;

    info!(
        filename = %form.filename,
        file_size = form.content.len(),
        window_minutes = form.config.window_minutes,
        max_speed_kmh = form.config.max_speed_kmh,
        confidence_threshold = form.config.min_confidence_threshold,
        "Analysis request received"
    );

    let events = match load_upload(form.content).await {
        Ok(report) => {
            let (events, _result) = spawn_analysis(report.samples, form.config, state.channel_capacity).into_stream();
            events
        }
        Err(e) => {
            error!(error = %e, filename = %form.filename, "Failed to load uploaded CSV");
            single_event(AnalysisEvent::from_error(Utc::now(), FAILURE_PREFIX, &e))
        }
    };

    let frames = events.map(|event| Ok::<_, Infallible>(to_sse_event(&event)));
    Ok(Sse::new(frames).into_response())
}

/// Parse uploaded CSV bytes on the blocking pool
async fn load_upload(content: Vec<u8>) -> crate::Result<LoadReport> {
    match tokio::task::spawn_blocking(move || loader::from_reader(content.as_slice())).await {
        Ok(result) => result,
        Err(e) => Err(crate::Error::Analysis(format!("CSV loader task failed: {}", e))),
    }
}

/// A closed stream carrying just `event`
fn single_event(event: AnalysisEvent) -> ReceiverStream<AnalysisEvent> {
    let (tx, rx) = mpsc::channel(1);
    if tx.try_send(event).is_err() {
        warn!("Failed to queue load error event");
    }
    ReceiverStream::new(rx)
}

fn to_sse_event(event: &AnalysisEvent) -> Event {
    let json = event.to_json().unwrap_or_else(|e| {
        warn!(error = %e, "Failed to serialize event");
        "{}".to_string()
    });
    Event::default().event(event.kind().as_str()).data(json)
}
