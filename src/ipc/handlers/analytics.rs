use serde_json::json;

use crate::ipc::error::{domain_err, ok};
use crate::ipc::helpers::db_conn;
use crate::ipc::types::{AppState, Request};
use crate::stats;

fn handle_performance_distribution(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match stats::performance_distribution(conn) {
        Ok(distribution) => ok(&req.id, json!({ "distribution": distribution })),
        Err(e) => domain_err(&req.id, &e),
    }
}

fn handle_institution_summary(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match stats::institution_summary(conn) {
        Ok(summary) => ok(&req.id, json!({ "summary": summary })),
        Err(e) => domain_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "analytics.performanceDistribution" => Some(handle_performance_distribution(state, req)),
        "analytics.institutionSummary" => Some(handle_institution_summary(state, req)),
        _ => None,
    }
}
