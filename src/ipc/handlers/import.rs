use serde_json::json;
use std::path::Path;

use crate::csv_import;
use crate::ipc::error::{domain_err, ok};
use crate::ipc::helpers::{db_conn, required_str};
use crate::ipc::types::{AppState, Request};

fn handle_import_csv(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let path = match required_str(req, "path") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match csv_import::import_csv_file(conn, Path::new(&path)) {
        Ok(summary) => ok(
            &req.id,
            json!({
                "summary": summary,
                "status": "imported",
            }),
        ),
        Err(e) => domain_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "import.csv" => Some(handle_import_csv(state, req)),
        _ => None,
    }
}
