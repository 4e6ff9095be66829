//! HTTP plumbing for the instrumentation server's fixed JSON contract.

use std::fmt;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::error::{ConnectionError, HttpError};
use crate::types::{OpenProcessRequest, ProcessDescriptor, ServerInfo};

/// Servers listen on this port; it is part of the protocol, not the address.
pub const SERVER_PORT: u16 = 3030;

/// Applied per request unless overridden on the session.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// A validated server address: a bare host, nothing else.
///
/// The port is fixed by the protocol, so input that smuggles its own port,
/// path, query, fragment, or userinfo is rejected rather than silently
/// redirecting the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAddress {
    host: String,
    base: Url,
}

impl ServerAddress {
    pub fn parse(input: &str) -> Result<Self, ConnectionError> {
        let host = input.trim();
        if host.is_empty() {
            return Err(ConnectionError::InvalidAddress("address is empty".into()));
        }
        let base = Url::parse(&format!("http://{host}:{SERVER_PORT}/"))
            .map_err(|e| ConnectionError::InvalidAddress(format!("{host:?}: {e}")))?;
        let bare = base.port() == Some(SERVER_PORT)
            && base.path() == "/"
            && base.query().is_none()
            && base.fragment().is_none()
            && base.username().is_empty()
            && base.password().is_none();
        if !bare {
            return Err(ConnectionError::InvalidAddress(format!(
                "{host:?} is not a bare host"
            )));
        }
        Ok(Self {
            host: host.to_string(),
            base,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn base_url(&self) -> Url {
        self.base.clone()
    }
}

impl fmt::Display for ServerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.host)
    }
}

/// One connected server endpoint and the reqwest client used to reach it.
pub struct ServerClient {
    http: reqwest::Client,
    base: Url,
}

impl ServerClient {
    /// Build a client against an explicit base URL, for stubs bound to
    /// ephemeral ports and for deployments that mount the contract under a
    /// path prefix. A base path without a trailing slash gets one appended,
    /// so the prefix survives when endpoint paths are attached.
    pub fn from_url(mut base: Url, timeout: Duration) -> Result<Self, HttpError> {
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http, base })
    }

    pub fn host(&self) -> &str {
        self.base.host_str().unwrap_or_default()
    }

    /// `GET /serverinfo`: identity and build metadata.
    pub async fn server_info(&self) -> Result<ServerInfo, HttpError> {
        self.get_json("serverinfo").await
    }

    /// `GET /enumprocess`: every process visible to the server.
    pub async fn processes(&self) -> Result<Vec<ProcessDescriptor>, HttpError> {
        self.get_json("enumprocess").await
    }

    /// `POST /openprocess`: ask the server to attach to `pid`. Any 2xx is
    /// success; the response body is ignored.
    pub async fn open_process(&self, pid: i32) -> Result<(), HttpError> {
        let url = self.endpoint("openprocess");
        debug!(%url, pid, "POST");
        let resp = self
            .http
            .post(url.as_str())
            .json(&OpenProcessRequest { pid })
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(HttpError::Status(status));
        }
        Ok(())
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, HttpError> {
        let url = self.endpoint(path);
        debug!(%url, "GET");
        let resp = self.http.get(url.as_str()).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(HttpError::Status(status));
        }
        // Fetch the text first so schema problems surface as Decode, not as
        // an opaque transport error.
        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(HttpError::Decode)
    }

    fn endpoint(&self, path: &str) -> String {
        // from_url guarantees the trailing slash
        format!("{}{}", self.base, path)
    }
}
