mod compare;
mod config;
mod db;
mod entities;
mod filter;
mod format;
mod forms;
mod ipc;
mod notify;
mod pager;
mod profile;
mod record;
mod session;
mod store;
mod table;
mod view;

use std::io::{self, BufRead, Write};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    // stdout carries the IPC protocol; logs go to stderr.
    let filter = EnvFilter::try_from_env("SCENARIODESK_LOG")
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    init_tracing();
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "scenariodeskd started");

    let mut state = ipc::AppState::new();
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    // One request at a time: a submit cannot start while another is in flight.
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(v) => v,
            Err(e) => {
                tracing::error!(error = %e, "stdin closed");
                break;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let resp = match serde_json::from_str::<ipc::Request>(&line) {
            Ok(req) => {
                tracing::debug!(id = %req.id, method = %req.method, "request");
                ipc::handle_request(&mut state, req)
            }
            Err(e) => {
                tracing::warn!(error = %e, "unparseable request");
                let id = serde_json::from_str::<serde_json::Value>(&line)
                    .ok()
                    .and_then(|v| v.get("id").and_then(|id| id.as_str()).map(str::to_string))
                    .unwrap_or_default();
                ipc::err(&id, ipc::ErrorCode::BadJson, e.to_string())
            }
        };

        let out = serde_json::to_string(&resp).unwrap_or_else(|_| "{\"ok\":false}".to_string());
        if let Err(e) = writeln!(stdout, "{}", out).and_then(|_| stdout.flush()) {
            tracing::error!(error = %e, "stdout closed");
            break;
        }
    }
}
