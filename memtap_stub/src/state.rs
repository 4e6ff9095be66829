//! Shared stub state: the synthetic process table and failure knobs.

use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use memtap::types::{ProcessDescriptor, ServerInfo, ServerMode};

/// Everything the handlers share. Cloning is cheap and every clone observes
/// the same counters and knobs, which is what lets tests flip behavior on a
/// server that is already running.
#[derive(Clone)]
pub struct StubState {
    processes: Arc<Vec<ProcessDescriptor>>,
    opened: Arc<Mutex<Option<i32>>>,
    open_calls: Arc<AtomicUsize>,
    reject_open: Arc<AtomicBool>,
    fail_enum: Arc<AtomicBool>,
}

impl StubState {
    pub fn new() -> Self {
        Self::with_processes(default_processes())
    }

    pub fn with_processes(processes: Vec<ProcessDescriptor>) -> Self {
        Self {
            processes: Arc::new(processes),
            opened: Arc::new(Mutex::new(None)),
            open_calls: Arc::new(AtomicUsize::new(0)),
            reject_open: Arc::new(AtomicBool::new(false)),
            fail_enum: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn processes(&self) -> &[ProcessDescriptor] {
        &self.processes
    }

    pub fn server_info(&self) -> ServerInfo {
        ServerInfo {
            mode: ServerMode::Normal,
            target_os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
            pid: std::process::id(),
            git_hash: "stub".to_string(),
        }
    }

    /// Answer every open request with 403 while set.
    pub fn set_reject_open(&self, reject: bool) {
        self.reject_open.store(reject, Ordering::SeqCst);
    }

    /// Answer every enumeration with 500 while set.
    pub fn set_fail_enum(&self, fail: bool) {
        self.fail_enum.store(fail, Ordering::SeqCst);
    }

    /// Pid of the last successfully opened process.
    pub fn opened_pid(&self) -> Option<i32> {
        *self.opened.lock().unwrap()
    }

    /// How many open requests reached the stub, accepted or not.
    pub fn open_calls(&self) -> usize {
        self.open_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn rejecting_open(&self) -> bool {
        self.reject_open.load(Ordering::SeqCst)
    }

    pub(crate) fn failing_enum(&self) -> bool {
        self.fail_enum.load(Ordering::SeqCst)
    }

    pub(crate) fn record_open_call(&self) {
        self.open_calls.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_opened(&self, pid: i32) {
        *self.opened.lock().unwrap() = Some(pid);
    }
}

impl Default for StubState {
    fn default() -> Self {
        Self::new()
    }
}

/// Deliberately unsorted; clients are expected to order it themselves.
pub fn default_processes() -> Vec<ProcessDescriptor> {
    [
        (812, "nginx"),
        (1, "systemd"),
        (2044, "postgres"),
        (977, "sshd"),
        (31415, "python3"),
        (2718, "node"),
        (14142, "redis-server"),
        (173, "dbus-daemon"),
        (99, "kworker/0:1"),
        (4096, "java"),
    ]
    .into_iter()
    .map(|(pid, name)| ProcessDescriptor {
        pid,
        name: name.to_string(),
    })
    .collect()
}

/// Read a replacement table from a JSON file holding an array of
/// `{"pid": ..., "processname": ...}` rows.
pub fn load_table(path: &Path) -> io::Result<Vec<ProcessDescriptor>> {
    let text = std::fs::read_to_string(path)?;
    serde_json::from_str(&text).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}
