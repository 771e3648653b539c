use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

use crate::config::AppConfig;
use crate::photos::PhotoService;
use crate::report::ReportComposer;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// Per-process state: one workspace, one store connection, and the
/// service instances built when the workspace is selected. No globals.
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub db: Option<Connection>,
    pub config: AppConfig,
    pub photos: Option<PhotoService>,
    pub reporter: Option<ReportComposer>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            workspace: None,
            db: None,
            config: AppConfig::default(),
            photos: None,
            reporter: None,
        }
    }
}
