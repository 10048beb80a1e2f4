//! Filedrop: content-addressed file ingestion with live arrival notifications
//!
//! Clients POST files to `/upload`; each file's bytes go into a
//! content-addressable store, a record lands in an append-only ledger, and
//! every connected WebSocket observer is notified of the new arrival without
//! polling. A best-effort concurrent peer bootstrap runs once at startup,
//! independent of the request path.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod hub;
pub mod ledger;
pub mod rest_api;
pub mod store;

pub use error::{Error, Result};
