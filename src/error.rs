//! Error taxonomy for the ingestion pipeline
//!
//! Client input problems map to 400, everything else on the request path maps
//! to 500. Peer dial failures never reach a client; they are logged by the
//! bootstrap routine and discarded.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed multipart payload or a request carrying zero file parts.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The content store backend could not be reached or opened.
    #[error("content store unavailable: {0}")]
    StoreUnavailable(std::io::Error),

    /// The content store accepted the connection but failed to persist bytes.
    #[error("content store write failed: {0}")]
    StoreWriteFailed(std::io::Error),

    /// A CID that does not resolve to stored content.
    #[error("content {0} is not retrievable")]
    NotRetrievable(String),

    /// The ledger's backing file could not be written or read.
    #[error("ledger io: {0}")]
    LedgerIo(#[from] std::io::Error),

    /// A single bootstrap dial attempt failed. Logged, never surfaced.
    #[error("failed to dial peer {addr}: {reason}")]
    PeerDial { addr: String, reason: String },
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = match &self {
            Error::BadRequest(_) => StatusCode::BAD_REQUEST,
            Error::StoreUnavailable(_)
            | Error::StoreWriteFailed(_)
            | Error::NotRetrievable(_)
            | Error::LedgerIo(_)
            | Error::PeerDial { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            error!(error = %self, "request failed");
        }

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
