//! HTTP surface over the query engine.
//!
//! Routes:
//! - `GET /` status
//! - `POST /ingest-document` multipart upload (field `file`)
//! - `POST /query-document` form field `question`

use axum::extract::{DefaultBodyLimit, Form, Multipart, State};
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::json;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::{ServerConfig, Settings};
use crate::error::{DoclensError, ErrorKind};
use crate::providers;
use crate::rag::{EngineOptions, QueryEngine};
use crate::storage::FsStorage;
use crate::{debug_event, log_event};

/// Shared handler state.
pub struct AppState {
    engine: Arc<QueryEngine>,
    upload_dir: PathBuf,
}

/// Error returned by handlers, rendered as `{"error": kind, "detail": message}`.
#[derive(Debug)]
pub enum ApiError {
    Pipeline(DoclensError),
    BadRequest(String),
}

impl From<DoclensError> for ApiError {
    fn from(err: DoclensError) -> Self {
        ApiError::Pipeline(err)
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        ApiError::BadRequest(err.body_text())
    }
}

/// HTTP status for a pipeline error.
pub fn status_for(err: &DoclensError) -> StatusCode {
    match err.kind() {
        ErrorKind::NotReady | ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Config => StatusCode::BAD_REQUEST,
        ErrorKind::Load => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::Busy => StatusCode::CONFLICT,
        ErrorKind::ProviderTimeout => StatusCode::GATEWAY_TIMEOUT,
        ErrorKind::Query if err.root_kind() == ErrorKind::ProviderTimeout => {
            StatusCode::GATEWAY_TIMEOUT
        }
        ErrorKind::Query | ErrorKind::Embedding | ErrorKind::Provider => StatusCode::BAD_GATEWAY,
        ErrorKind::CorruptIndex | ErrorKind::Storage => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind, detail) = match self {
            ApiError::Pipeline(err) => {
                let status = status_for(&err);
                if status.is_server_error() {
                    tracing::error!(target: "http", "{err}");
                } else {
                    debug_event!("http", "rejected", "{err}");
                }
                (status, err.kind().as_str(), err.to_string())
            }
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, "bad_request", detail),
        };
        (status, Json(json!({ "error": kind, "detail": detail }))).into_response()
    }
}

/// Build the router for an engine.
pub fn router(engine: Arc<QueryEngine>, upload_dir: PathBuf, config: &ServerConfig) -> Router {
    let state = Arc::new(AppState { engine, upload_dir });

    let router = Router::new()
        .route("/", get(status))
        .route("/ingest-document", post(ingest_document))
        .route("/query-document", post(query_document))
        .layer(DefaultBodyLimit::max(config.max_upload_mb * 1024 * 1024))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if config.cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

async fn status(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "doclens is running",
        "state": state.engine.state(),
    }))
}

async fn ingest_document(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field
            .file_name()
            .and_then(|name| Path::new(name).file_name())
            .and_then(|name| name.to_str())
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("upload has no usable file name".to_string()))?;
        let bytes = field.bytes().await?;

        let dir = state.upload_dir.clone();
        let name = file_name.clone();
        let path = tokio::task::spawn_blocking(move || store_upload(&dir, &name, &bytes))
            .await
            .map_err(|e| {
                DoclensError::storage(
                    state.upload_dir.display().to_string(),
                    std::io::Error::other(format!("upload task failed: {e}")),
                )
            })??;

        debug_event!("http", "upload", "{file_name} stored as {}", path.display());

        // A rejected ingest leaves no trace in the upload directory
        let report = match state.engine.ingest_default(&path).await {
            Ok(report) => report,
            Err(err) => {
                if let Err(e) = tokio::fs::remove_file(&path).await {
                    debug_event!("http", "cleanup", "{}: {e}", path.display());
                }
                return Err(err.into());
            }
        };
        return Ok(Json(json!({
            "message": format!("Document '{file_name}' ingested successfully."),
            "pages": report.pages,
            "chunks": report.chunks,
            "total_records": report.total_records,
        })));
    }

    Err(ApiError::BadRequest("missing multipart field 'file'".to_string()))
}

/// Save an upload under a fresh name so concurrent uploads of the same
/// file never touch each other's bytes. The extension is kept for format
/// detection.
fn store_upload(dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf, DoclensError> {
    let location = dir.display().to_string();
    std::fs::create_dir_all(dir).map_err(|e| DoclensError::storage(&location, e))?;

    let original = Path::new(file_name);
    let stem = original
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("upload");
    let suffix = original
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
        .unwrap_or_default();

    let mut file = tempfile::Builder::new()
        .prefix(&format!("{stem}-"))
        .suffix(&suffix)
        .tempfile_in(dir)
        .map_err(|e| DoclensError::storage(&location, e))?;
    file.write_all(bytes)
        .and_then(|()| file.as_file().sync_all())
        .map_err(|e| DoclensError::storage(&location, e))?;

    let (_, path) = file
        .keep()
        .map_err(|e| DoclensError::storage(&location, e.error))?;
    Ok(path)
}

#[derive(Debug, Deserialize)]
struct QueryForm {
    question: String,
}

async fn query_document(
    State(state): State<Arc<AppState>>,
    Form(form): Form<QueryForm>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let answer = state.engine.query(&form.question).await?;
    Ok(Json(json!({
        "answer": answer.text,
        "sources": answer.sources,
    })))
}

/// Run the HTTP server until Ctrl+C.
pub async fn serve(settings: Settings, bind: String) -> anyhow::Result<()> {
    settings.validate()?;
    let providers = providers::from_settings(&settings)?;
    let storage = Arc::new(FsStorage::new(settings.resolved_index_path()));
    let options = EngineOptions::from_settings(&settings);

    let engine = match QueryEngine::open(
        Arc::clone(&providers.embedder),
        Arc::clone(&providers.llm),
        storage.clone(),
        options.clone(),
    )
    .await
    {
        Ok(engine) => engine,
        Err(e) => {
            tracing::warn!(target: "http", "[http] failed to load index: {e}");
            QueryEngine::new(providers.embedder, providers.llm, storage, options)
        }
    };

    match engine.snapshot() {
        Some(index) => log_event!("http", "loaded", "{} record(s)", index.len()),
        None => log_event!("http", "starting", "no existing index"),
    }

    let app = router(
        Arc::new(engine),
        settings.resolved_upload_dir(),
        &settings.server,
    );

    let ct = CancellationToken::new();
    let signal_ct = ct.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                log_event!("http", "shutdown", "signal received");
                signal_ct.cancel();
            }
            Err(e) => tracing::error!(target: "http", "failed to listen for ctrl+c: {e}"),
        }
    });

    let listener = tokio::net::TcpListener::bind(&bind).await?;
    eprintln!("doclens listening on http://{bind}");
    eprintln!("Press Ctrl+C to stop the server");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { ct.cancelled().await })
        .await?;

    log_event!("http", "stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::QueryStage;
    use std::time::Duration;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&DoclensError::NotReady), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(&DoclensError::config("bad")),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&DoclensError::Busy {
                location: "x".to_string()
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_for(&DoclensError::load("a.pdf", "broken")),
            StatusCode::UNPROCESSABLE_ENTITY
        );

        let timeout = DoclensError::ProviderTimeout {
            provider: "ollama",
            timeout: Duration::from_secs(1),
        };
        assert_eq!(
            status_for(&timeout.at_stage(QueryStage::Complete)),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            status_for(&DoclensError::Embedding("x".to_string()).at_stage(QueryStage::Embed)),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_for(&DoclensError::corrupt("x", "checksum mismatch")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
