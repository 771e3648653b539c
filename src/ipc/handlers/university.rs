use serde_json::json;

use crate::ipc::error::{domain_err, ok};
use crate::ipc::helpers::{db_conn, optional_i64};
use crate::ipc::types::{AppState, Request};
use crate::query;

fn handle_university_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let university_id = match optional_i64(req, "universityId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match query::get_university_details(conn, university_id) {
        Ok(university) => ok(&req.id, json!({ "university": university })),
        Err(e) => domain_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "university.get" => Some(handle_university_get(state, req)),
        _ => None,
    }
}
