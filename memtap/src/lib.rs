//! Client-side session logic for remote process-instrumentation servers.
//!
//! The server half of the contract is three JSON endpoints on a fixed port.
//! This crate owns everything on the client side of them: address
//! validation, the identity probe, the sorted process catalog and its
//! filtered views, and the select/open workflow, all hanging off a single
//! [`Session`].

pub mod catalog;
pub mod error;
pub mod http;
pub mod profiles;
pub mod session;
pub mod types;

pub use catalog::ProcessCatalog;
pub use error::{CatalogError, ConnectionError, HttpError, OpenError};
pub use session::{Session, SessionState};
pub use types::{ProcessDescriptor, ServerInfo, ServerMode};
