//! A synthetic instrumentation server: the fixed JSON contract over a canned
//! process table. Backs `memtap --demo`, manual poking, and in-process tests.

pub mod routes;
pub mod state;

pub use routes::router;
pub use state::StubState;

use std::net::SocketAddr;

/// Parse `--port PORT`, `-p PORT`, or `--port=PORT`; anything else keeps the
/// default. Unknown arguments are ignored.
pub fn parse_port<I: IntoIterator<Item = String>>(args: I, default_port: u16) -> u16 {
    let mut it = args.into_iter();
    let _ = it.next(); // program name
    let mut long: Option<String> = None;
    let mut short: Option<String> = None;
    while let Some(a) = it.next() {
        match a.as_str() {
            "--port" => long = it.next(),
            "-p" => short = it.next(),
            _ if a.starts_with("--port=") => {
                if let Some((_, v)) = a.split_once('=') {
                    long = Some(v.to_string());
                }
            }
            _ => {}
        }
    }
    long.or(short)
        .and_then(|s| s.parse::<u16>().ok())
        .unwrap_or(default_port)
}

/// Bind an ephemeral local port and serve in the background. Returns the
/// bound address; the server task lives until its runtime shuts down.
pub async fn spawn_ephemeral(state: StubState) -> std::io::Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind(("127.0.0.1", 0)).await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router(state)).await {
            tracing::error!(error = %e, "stub server exited");
        }
    });
    Ok(addr)
}
