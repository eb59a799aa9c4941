use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::{wrappers::ReceiverStream, StreamExt};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::config::Config;
use crate::oracle::OllamaClient;
use crate::search::{SearchError, SearchEvent, SearchMatch, SearchPipeline, SearchRequest};

/// Shared state behind every handler
pub struct AppState {
    pipeline: Arc<SearchPipeline>,
}

/// Request-level failure rendered as a JSON error body
struct ApiError(SearchError);

impl From<SearchError> for ApiError {
    fn from(err: SearchError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": self.0.to_string() })),
        )
            .into_response()
    }
}

/// Build the API router
pub fn app(pipeline: Arc<SearchPipeline>) -> Router {
    let state = Arc::new(AppState { pipeline });

    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/search", post(search_files))
        .route("/api/search/stream", post(search_files_stream))
        .route("/api/open", post(open_file))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run the HTTP server until shutdown
pub async fn serve(config: Config) -> anyhow::Result<()> {
    let oracle = Arc::new(OllamaClient::new(config.ollama.clone())?);
    let pipeline = Arc::new(SearchPipeline::new(config.search.clone(), oracle));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app(pipeline)).await?;

    Ok(())
}

/// GET /api/health
async fn health_check() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// POST /api/search - run the pipeline to completion, return all matches
async fn search_files(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<Vec<SearchMatch>>, ApiError> {
    let matches = state.pipeline.run_batch(&request).await?;
    Ok(Json(matches))
}

/// POST /api/search/stream - emit matches as NDJSON while the walk runs
///
/// A disconnecting client drops the body stream, which drops the channel
/// receiver and stops the pipeline before the remaining files are judged.
async fn search_files_stream(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SearchRequest>,
) -> Result<Response, ApiError> {
    // Reject bad folders before committing to a 200 streaming response
    request.validate()?;

    let (tx, rx) = mpsc::channel(32);
    let pipeline = state.pipeline.clone();

    tokio::spawn(async move {
        match pipeline.run(&request, tx).await {
            Ok(stats) => info!(
                "Streamed search done: {} matches, {} oracle errors",
                stats.matches, stats.oracle_errors
            ),
            Err(err) => warn!("Streamed search failed: {}", err),
        }
    });

    let lines = ReceiverStream::new(rx).filter_map(|event| match event {
        SearchEvent::Match(found) => {
            let mut line = serde_json::to_vec(&found).ok()?;
            line.push(b'\n');
            Some(Ok::<_, std::convert::Infallible>(Bytes::from(line)))
        }
        _ => None,
    });

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/x-ndjson")
        .body(Body::from_stream(lines))
        .expect("static response parts are valid");

    Ok(response)
}

#[derive(Debug, Deserialize)]
struct OpenRequest {
    file_path: String,
}

/// POST /api/open - ask the host OS to open a file with its default handler
async fn open_file(Json(request): Json<OpenRequest>) -> Json<Value> {
    match open_with_default_handler(Path::new(&request.file_path)) {
        Ok(()) => Json(json!({ "status": "ok" })),
        Err(err) => {
            warn!("Failed to open {}: {}", request.file_path, err);
            Json(json!({ "status": "error", "detail": err.to_string() }))
        }
    }
}

/// Delegate to the platform's default open handler
pub fn open_with_default_handler(path: &Path) -> std::io::Result<()> {
    open_command(path).spawn().map(|_| ())
}

#[cfg(target_os = "macos")]
fn open_command(path: &Path) -> std::process::Command {
    let mut command = std::process::Command::new("open");
    command.arg(path);
    command
}

#[cfg(target_os = "windows")]
fn open_command(path: &Path) -> std::process::Command {
    let mut command = std::process::Command::new("cmd");
    command.args(["/C", "start", ""]).arg(path);
    command
}

#[cfg(not(any(target_os = "macos", target_os = "windows")))]
fn open_command(path: &Path) -> std::process::Command {
    let mut command = std::process::Command::new("xdg-open");
    command.arg(path);
    command
}
