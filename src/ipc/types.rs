use std::path::PathBuf;

use crate::config::DeskConfig;
use crate::db::SqliteStore;
use crate::notify::Notifier;
use crate::session::Session;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub store: Option<SqliteStore>,
    pub config: DeskConfig,
    pub notices: Notifier,
    pub session: Option<Session>,
}

impl AppState {
    pub fn new() -> Self {
        let config = DeskConfig::default();
        Self {
            workspace: None,
            store: None,
            notices: Notifier::new(config.dismiss_after_ms),
            config,
            session: None,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
