use serde_json::json;

use crate::ipc::error::{domain_err, err, ok};
use crate::ipc::helpers::{db_conn, optional_i64, required_str};
use crate::ipc::types::{AppState, Request};
use crate::query;

fn handle_table_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let table = match required_str(req, "table") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let limit = match optional_i64(req, "limit") {
        Ok(v) => v.unwrap_or(query::DEFAULT_TABLE_LIMIT),
        Err(e) => return e,
    };
    if limit <= 0 {
        return err(&req.id, "bad_params", "limit must be positive", None);
    }
    let id = match optional_i64(req, "id") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match query::get_table(conn, &table, limit, id) {
        Ok(rows) => ok(&req.id, json!({ "rows": rows })),
        Err(e) => domain_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "table.get" => Some(handle_table_get(state, req)),
        _ => None,
    }
}
