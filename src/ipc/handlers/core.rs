use serde_json::json;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

use crate::config;
use crate::csv_import;
use crate::db;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::required_str;
use crate::ipc::types::{AppState, Request};
use crate::photos::PhotoService;
use crate::report::ReportComposer;

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string())
        }),
    )
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let path = match required_str(req, "path") {
        Ok(v) => PathBuf::from(v),
        Err(e) => return e,
    };

    let config = match config::load(&path) {
        Ok(c) => c,
        Err(e) => return err(&req.id, "config_invalid", e.to_string(), None),
    };

    let conn = match db::open_db(&path, &config) {
        Ok(c) => c,
        Err(e) => return err(&req.id, "db_open_failed", format!("{e:?}"), None),
    };

    let photos = match PhotoService::new(
        path.join(&config.photo_dir),
        Duration::from_secs(config.photo_timeout_secs),
    ) {
        Ok(p) => p,
        Err(e) => return err(&req.id, "server_error", e.to_string(), None),
    };

    // Initial bulk load from the CSV assets dir; bad files are skipped
    // with a warning instead of blocking the workspace.
    let bootstrapped = csv_import::bootstrap_from_dir(&conn, &path.join(&config.csv_dir));
    info!(workspace = %path.display(), tables = bootstrapped.len(), "workspace selected");

    let reporter = ReportComposer::new(path.join(&config.reports_dir), photos.clone());
    state.workspace = Some(path.clone());
    state.db = Some(conn);
    state.photos = Some(photos);
    state.reporter = Some(reporter);
    state.config = config;

    ok(
        &req.id,
        json!({
            "workspacePath": path.to_string_lossy(),
            "bootstrapped": bootstrapped,
        }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        _ => None,
    }
}
