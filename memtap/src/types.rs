//! Types that mirror the instrumentation server's JSON schema.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Execution mode reported by the identity probe. The wire value is a
/// lowercase string; anything outside this set is a schema mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerMode {
    Normal,
    Embedded,
}

impl fmt::Display for ServerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMode::Normal => f.write_str("normal"),
            ServerMode::Embedded => f.write_str("embedded"),
        }
    }
}

/// Identity and build metadata from `GET /serverinfo`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerInfo {
    pub mode: ServerMode,
    pub target_os: String,
    pub arch: String,
    /// Pid of the server process itself, not of any enumerated process.
    pub pid: u32,
    pub git_hash: String,
}

/// One row of `GET /enumprocess`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessDescriptor {
    pub pid: i32,
    #[serde(rename = "processname")]
    pub name: String,
}

/// Body of `POST /openprocess`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenProcessRequest {
    pub pid: i32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_info_decodes_from_wire_shape() {
        let json = r#"{
            "mode": "normal",
            "target_os": "linux",
            "arch": "x86_64",
            "pid": 4301,
            "git_hash": "3f9d2c1"
        }"#;
        let info: ServerInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.mode, ServerMode::Normal);
        assert_eq!(info.target_os, "linux");
        assert_eq!(info.arch, "x86_64");
        assert_eq!(info.pid, 4301);
        assert_eq!(info.git_hash, "3f9d2c1");
    }

    #[test]
    fn embedded_mode_decodes() {
        let json = r#"{"mode":"embedded","target_os":"ios","arch":"aarch64","pid":1,"git_hash":"dev"}"#;
        let info: ServerInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.mode, ServerMode::Embedded);
    }

    #[test]
    fn unknown_mode_is_rejected() {
        let json = r#"{"mode":"turbo","target_os":"linux","arch":"x86_64","pid":1,"git_hash":"dev"}"#;
        assert!(serde_json::from_str::<ServerInfo>(json).is_err());
    }

    #[test]
    fn negative_server_pid_is_rejected() {
        let json = r#"{"mode":"normal","target_os":"linux","arch":"x86_64","pid":-5,"git_hash":"dev"}"#;
        assert!(serde_json::from_str::<ServerInfo>(json).is_err());
    }

    #[test]
    fn process_rows_use_the_processname_field() {
        let json = r#"[{"pid":31415,"processname":"python3"},{"pid":1,"processname":"init"}]"#;
        let rows: Vec<ProcessDescriptor> = serde_json::from_str(json).unwrap();
        assert_eq!(rows[0].pid, 31415);
        assert_eq!(rows[0].name, "python3");
        assert_eq!(rows[1].name, "init");
    }

    #[test]
    fn open_request_encodes_pid_only() {
        let body = serde_json::to_string(&OpenProcessRequest { pid: 42 }).unwrap();
        assert_eq!(body, r#"{"pid":42}"#);
    }
}
