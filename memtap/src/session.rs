//! One client session: a server, its identity, the process catalog, and the
//! selected/opened process records.

use std::time::Duration;

use tracing::{debug, info};
use url::Url;

use crate::catalog::ProcessCatalog;
use crate::error::{CatalogError, ConnectionError, HttpError, OpenError};
use crate::http::{ServerAddress, ServerClient, DEFAULT_TIMEOUT};
use crate::types::{ProcessDescriptor, ServerInfo};

/// Where a session currently stands. Successful operations only move this
/// forward; failures leave the previous state in place.
#[derive(Debug, Clone, Copy)]
pub enum SessionState<'a> {
    Disconnected,
    Connected(&'a ServerInfo),
    CatalogLoaded(&'a ProcessCatalog),
    ProcessOpened(&'a ProcessDescriptor),
}

/// Client-side state for one instrumentation server.
///
/// Every fallible operation takes `&mut self` and commits its result only
/// after the full response has arrived and validated. Overlapping requests
/// on one session are therefore unrepresentable, and a dropped in-flight
/// future cancels its request without partial writes, so a slow response can
/// never overwrite a newer one.
pub struct Session {
    timeout: Duration,
    client: Option<ServerClient>,
    info: Option<ServerInfo>,
    catalog: Option<ProcessCatalog>,
    selected: Option<ProcessDescriptor>,
    opened: Option<ProcessDescriptor>,
}

impl Session {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    /// `timeout` bounds every request this session issues.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            client: None,
            info: None,
            catalog: None,
            selected: None,
            opened: None,
        }
    }

    /// Probe `host` and make it this session's server.
    ///
    /// Everything derived from a previous server is torn down first, whether
    /// or not the address changed; a failed connect leaves the session
    /// Disconnected rather than pointing at another server's state.
    pub async fn connect(&mut self, host: &str) -> Result<ServerInfo, ConnectionError> {
        let address = ServerAddress::parse(host)?;
        self.connect_url(address.base_url()).await
    }

    /// Connect against an explicit base URL, for tests and for deployments
    /// where something else fronts the fixed port.
    pub async fn connect_url(&mut self, base: Url) -> Result<ServerInfo, ConnectionError> {
        self.reset();
        let client = ServerClient::from_url(base, self.timeout).map_err(ConnectionError::Probe)?;
        let info = client.server_info().await.map_err(ConnectionError::Probe)?;
        info!(host = client.host(), mode = %info.mode, server_pid = info.pid, "connected");
        self.client = Some(client);
        Ok(self.info.insert(info).clone())
    }

    /// Replace the catalog with a fresh enumeration.
    ///
    /// The new catalog is fully fetched, decoded, and validated before
    /// anything is committed; on failure the previous catalog and selection
    /// survive untouched. Success clears the selection, which pointed into
    /// the replaced catalog. The opened record is unaffected either way.
    pub async fn refresh(&mut self) -> Result<&ProcessCatalog, CatalogError> {
        let client = self.client.as_ref().ok_or(CatalogError::NotConnected)?;
        let entries = client.processes().await.map_err(|e| match e {
            HttpError::Decode(err) => CatalogError::Malformed(err.to_string()),
            other => CatalogError::Network(other),
        })?;
        let catalog = ProcessCatalog::from_entries(entries)?;
        debug!(count = catalog.len(), "catalog replaced");
        self.selected = None;
        Ok(self.catalog.insert(catalog))
    }

    /// Record `descriptor` as the open target. Purely local: no network, no
    /// effect on the opened record.
    pub fn select_process(&mut self, descriptor: ProcessDescriptor) {
        self.selected = Some(descriptor);
    }

    /// Ask the server to attach to the selected process.
    ///
    /// The descriptor is snapshotted when the request is issued and becomes
    /// the opened record only on a 2xx response. Rejections and transport
    /// failures change nothing, so a retry needs no re-selection.
    pub async fn open_selected(&mut self) -> Result<ProcessDescriptor, OpenError> {
        // A selection cannot outlive its session, so a missing client is the
        // same condition as a missing selection.
        let (Some(target), Some(client)) = (&self.selected, &self.client) else {
            return Err(OpenError::NoSelection);
        };
        let target = target.clone();
        client.open_process(target.pid).await.map_err(|e| match e {
            HttpError::Status(status) => OpenError::Rejected(status),
            other => OpenError::Network(other),
        })?;
        info!(pid = target.pid, name = %target.name, "process opened");
        Ok(self.opened.insert(target).clone())
    }

    pub fn server_info(&self) -> Option<&ServerInfo> {
        self.info.as_ref()
    }

    pub fn catalog(&self) -> Option<&ProcessCatalog> {
        self.catalog.as_ref()
    }

    pub fn selected(&self) -> Option<&ProcessDescriptor> {
        self.selected.as_ref()
    }

    pub fn opened(&self) -> Option<&ProcessDescriptor> {
        self.opened.as_ref()
    }

    pub fn host(&self) -> Option<&str> {
        self.client.as_ref().map(|c| c.host())
    }

    pub fn state(&self) -> SessionState<'_> {
        if let Some(opened) = &self.opened {
            SessionState::ProcessOpened(opened)
        } else if let Some(catalog) = &self.catalog {
            SessionState::CatalogLoaded(catalog)
        } else if let Some(info) = &self.info {
            SessionState::Connected(info)
        } else {
            SessionState::Disconnected
        }
    }

    fn reset(&mut self) {
        self.client = None;
        self.info = None;
        self.catalog = None;
        self.selected = None;
        self.opened = None;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(pid: i32, name: &str) -> ProcessDescriptor {
        ProcessDescriptor {
            pid,
            name: name.into(),
        }
    }

    #[test]
    fn new_session_is_disconnected() {
        let session = Session::new();
        assert!(matches!(session.state(), SessionState::Disconnected));
        assert!(session.server_info().is_none());
        assert!(session.catalog().is_none());
        assert!(session.host().is_none());
    }

    #[test]
    fn selection_is_local_and_does_not_advance_state() {
        let mut session = Session::new();
        session.select_process(d(9, "sh"));
        assert_eq!(session.selected(), Some(&d(9, "sh")));
        assert!(session.opened().is_none());
        assert!(matches!(session.state(), SessionState::Disconnected));
    }

    #[tokio::test]
    async fn open_without_selection_fails_fast() {
        let mut session = Session::new();
        let err = session.open_selected().await.unwrap_err();
        assert!(matches!(err, OpenError::NoSelection));
        assert!(session.opened().is_none());
    }

    #[tokio::test]
    async fn refresh_requires_a_connection() {
        let mut session = Session::new();
        let err = session.refresh().await.unwrap_err();
        assert!(matches!(err, CatalogError::NotConnected));
    }
}
