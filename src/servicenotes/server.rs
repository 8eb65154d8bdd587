//! # HTTP Surface
//!
//! A thin JSON layer over [`RecordStore`]. Handlers only translate: path and
//! body in, store call on the blocking pool, status code and JSON out.
//!
//! | Route                    | Store call        |
//! |--------------------------|-------------------|
//! | `GET /records`           | `list()`          |
//! | `GET /records/:index`    | `get(index)`      |
//! | `POST /records`          | `add(fields)`     |
//! | `PUT /records/:index`    | `update(..)`      |
//! | `DELETE /records/:index` | `delete(index)`   |
//! | `GET /summary`           | `summarize()`     |
//! | `GET /status`            | `status()`        |
//!
//! Validation errors are 400, stale indexes 404, anything else 500.

use crate::error::{NotesError, Result};
use crate::model::{Record, RecordFields, Summary};
use crate::store::{Receipt, RecordStore, StoreStatus};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

type ApiError = (StatusCode, String);

fn api_error(e: NotesError) -> ApiError {
    let status = match e {
        NotesError::Validation(_) => StatusCode::BAD_REQUEST,
        NotesError::IndexOutOfRange { .. } => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if !e.is_caller_error() {
        error!(error = %e, "request failed");
    }
    (status, e.to_string())
}

/// Store calls block on disk and network, so they run off the async workers.
async fn blocking<T, F>(store: Arc<RecordStore>, f: F) -> std::result::Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&RecordStore) -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&store))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, format!("worker failed: {e}")))?
        .map_err(api_error)
}

async fn list_records(
    State(store): State<Arc<RecordStore>>,
) -> std::result::Result<Json<Vec<Record>>, ApiError> {
    blocking(store, |s| Ok(s.list())).await.map(Json)
}

async fn get_record(
    State(store): State<Arc<RecordStore>>,
    Path(index): Path<usize>,
) -> std::result::Result<Json<Record>, ApiError> {
    blocking(store, move |s| s.get(index)).await.map(Json)
}

async fn add_record(
    State(store): State<Arc<RecordStore>>,
    Json(fields): Json<RecordFields>,
) -> std::result::Result<(StatusCode, Json<Receipt>), ApiError> {
    let receipt = blocking(store, move |s| s.add(fields)).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn update_record(
    State(store): State<Arc<RecordStore>>,
    Path(index): Path<usize>,
    Json(fields): Json<RecordFields>,
) -> std::result::Result<Json<Receipt>, ApiError> {
    blocking(store, move |s| s.update(index, fields))
        .await
        .map(Json)
}

async fn delete_record(
    State(store): State<Arc<RecordStore>>,
    Path(index): Path<usize>,
) -> std::result::Result<Json<Receipt>, ApiError> {
    blocking(store, move |s| s.delete(index)).await.map(Json)
}

async fn summary(
    State(store): State<Arc<RecordStore>>,
) -> std::result::Result<Json<Summary>, ApiError> {
    blocking(store, |s| Ok(s.summarize())).await.map(Json)
}

async fn status(
    State(store): State<Arc<RecordStore>>,
) -> std::result::Result<Json<StoreStatus>, ApiError> {
    blocking(store, |s| Ok(s.status())).await.map(Json)
}

pub fn router(store: Arc<RecordStore>) -> Router {
    Router::new()
        .route("/records", get(list_records).post(add_record))
        .route(
            "/records/:index",
            get(get_record).put(update_record).delete(delete_record),
        )
        .route("/summary", get(summary))
        .route("/status", get(status))
        .with_state(store)
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (
            signal(SignalKind::terminate()),
            signal(SignalKind::interrupt()),
        ) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = sigint.recv() => {}
                }
            }
            _ => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Serve until SIGINT or SIGTERM, then return so the caller's scoped
/// resources (the shutdown backup) are released.
pub fn serve(store: Arc<RecordStore>, addr: SocketAddr) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let listener = TcpListener::bind(addr).await?;
        info!("servicenotes listening on {}", addr);
        axum::serve(listener, router(store))
            .with_graceful_shutdown(wait_for_shutdown_signal())
            .await?;
        info!("server stopped");
        Ok::<(), NotesError>(())
    })
}
