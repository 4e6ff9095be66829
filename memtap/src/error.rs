//! Error taxonomy for session operations.
//!
//! Every failure returns to the action that initiated it; none of these are
//! fatal to the session, and a failed refresh or open never discards
//! previously valid state.

use reqwest::StatusCode;
use thiserror::Error;

/// Transport-level failure detail shared by the operation errors.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Connection, DNS, or timeout failure before a response arrived.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The server answered outside the 2xx range.
    #[error("server returned {0}")]
    Status(StatusCode),
    /// The body did not match the expected schema.
    #[error("invalid response body: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Failure to establish a session with a server address.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("invalid server address: {0}")]
    InvalidAddress(String),
    #[error("identity probe failed: {0}")]
    Probe(#[source] HttpError),
}

/// Failure to fetch or validate the process catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("not connected to a server")]
    NotConnected,
    #[error("malformed process list: {0}")]
    Malformed(String),
    #[error("process list request failed: {0}")]
    Network(#[source] HttpError),
}

/// Failure to open the selected process.
#[derive(Debug, Error)]
pub enum OpenError {
    #[error("no process is selected")]
    NoSelection,
    #[error("server rejected the open request: {0}")]
    Rejected(StatusCode),
    #[error("open request failed: {0}")]
    Network(#[source] HttpError),
}
