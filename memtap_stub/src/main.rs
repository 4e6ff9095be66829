//! Entry point for the stub server binary.

use std::net::SocketAddr;
use std::path::Path;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use memtap_stub::state::load_table;
use memtap_stub::{parse_port, router, StubState};

const DEFAULT_PORT: u16 = 3030;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("memtap_stub=info")),
        )
        .init();

    let port = parse_port(std::env::args(), DEFAULT_PORT);

    let state = match std::env::var_os("MEMTAP_STUB_PROCESSES") {
        Some(path) => {
            let table = load_table(Path::new(&path))?;
            info!(count = table.len(), path = %Path::new(&path).display(), "loaded process table");
            StubState::with_processes(table)
        }
        None => StubState::new(),
    };
    if std::env::var("MEMTAP_STUB_REJECT_OPEN").as_deref() == Ok("1") {
        state.set_reject_open(true);
    }

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, processes = state.processes().len(), "stub serving");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}
