//! HTTP and WebSocket surface
//!
//! Routes:
//! - `POST /upload`: multipart ingestion, field name `files`
//! - `GET /files`: ledger snapshot
//! - `GET /files/{cid}`: raw content retrieval
//! - `GET /socket`: WebSocket upgrade for arrival notifications
//!
//! CORS is wide open (public demo posture) and every request is traced.


use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::hub::Hub;
use crate::ledger::{FileRecord, Ledger};
use crate::store::ContentStore;

/// Per-request body cap for uploads.
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<Ledger>,
    pub store: Arc<dyn ContentStore>,
    pub hub: Hub,
}

/// Build the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/upload", post(upload))
        .route("/files", get(list_files))
        .route("/files/{cid}", get(download))
        .route("/socket", get(socket))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the process exits.
pub async fn run_server(state: AppState, addr: SocketAddr) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on http://{addr}");
    axum::serve(listener, app).await?;
    Ok(())
}

/// One fully parsed file part, held in memory between the parse phase and
/// the ingestion phase. Bounded by the request body cap.
struct FilePart {
    filename: String,
    content_type: String,
    bytes: bytes::Bytes,
}

/// Parse the whole multipart form up front. Any parse failure here is a
/// client error and happens before anything has been ingested, so a 400
/// never leaves partial state behind.
async fn collect_file_parts(mut multipart: Multipart) -> Result<Vec<FilePart>> {
    let mut parts = Vec::new();

    loop {
        let field = multipart
            .next_field()
            .await
            .map_err(|e| Error::BadRequest(format!("malformed multipart form: {e}")))?;
        let Some(field) = field else { break };

        if field.name() != Some("files") {
            continue;
        }

        let filename = field
            .file_name()
            .unwrap_or("unnamed")
            .to_string();
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| Error::BadRequest(format!("could not read file part: {e}")))?;

        parts.push(FilePart {
            filename,
            content_type,
            bytes,
        });
    }

    if parts.is_empty() {
        return Err(Error::BadRequest("no files uploaded".to_string()));
    }
    Ok(parts)
}

/// Ingest one or more files from a multipart request.
///
/// The form is fully parsed and validated first, then each file is ingested
/// strictly sequentially: store bytes, append the ledger, publish the
/// arrival event, move to the next. A storage or ledger failure aborts the
/// request with 500 but leaves earlier files of the same batch ingested;
/// there is no rollback, and the uploading client retries the whole batch.
async fn upload(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<Vec<FileRecord>>> {
    let parts = collect_file_parts(multipart).await?;

    let mut records = Vec::new();
    for part in parts {
        let cid = state.store.store(&part.bytes).await?;
        let record = FileRecord {
            filename: part.filename,
            cid,
            size: part.bytes.len() as u64,
            content_type: part.content_type,
        };

        // The bytes are already in the content store; if this append fails
        // the content is orphaned (stored but unlisted). Accepted gap.
        state.ledger.append(&record).await?;

        // Blocks when the delivery queue is full rather than dropping.
        state.hub.publish(record.clone()).await;

        info!(filename = %record.filename, cid = %record.cid, size = record.size, "file ingested");
        records.push(record);
    }

    Ok(Json(records))
}

/// Snapshot of every ingested file, in append order.
async fn list_files(State(state): State<AppState>) -> Result<Json<Vec<FileRecord>>> {
    Ok(Json(state.ledger.list_all().await?))
}

/// Stream stored content back by CID.
async fn download(State(state): State<AppState>, Path(cid): Path<String>) -> Result<Response> {
    let bytes = state.store.retrieve(&cid).await?;
    let headers = [
        (
            header::CONTENT_TYPE,
            "application/octet-stream".to_string(),
        ),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{cid}\""),
        ),
    ];
    Ok((headers, bytes).into_response())
}

/// Upgrade to a WebSocket and stream arrival events until the client leaves.
async fn socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| observe(socket, state.hub.clone()))
}

/// One observer connection: forward hub events to the socket, and watch the
/// read side only to learn about disconnects. Any read or write error tears
/// the connection down and unregisters it.
async fn observe(socket: WebSocket, hub: Hub) {
    let (events_tx, mut events_rx) = mpsc::unbounded_channel::<FileRecord>();
    let id = hub.register(events_tx);
    info!(observer = id, "websocket observer connected");

    let (mut sink, mut stream) = socket.split();
    loop {
        tokio::select! {
            event = events_rx.recv() => {
                let Some(record) = event else { break };
                let payload = match serde_json::to_string(&record) {
                    Ok(p) => p,
                    Err(e) => {
                        debug!(observer = id, error = %e, "unserializable event, skipping");
                        continue;
                    }
                };
                if sink.send(Message::Text(payload.into())).await.is_err() {
                    break;
                }
            }
            inbound = stream.next() => {
                match inbound {
                    // Inbound frames are ignored; observers only listen.
                    Some(Ok(_)) => {}
                    Some(Err(_)) | None => break,
                }
            }
        }
    }

    hub.unregister(id);
    info!(observer = id, "websocket observer disconnected");
}
