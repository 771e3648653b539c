use serde_json::json;

use crate::ipc::error::{domain_err, err, ok};
use crate::ipc::helpers::{db_conn, required_i64};
use crate::ipc::types::{AppState, Request};
use crate::report::ReportComposer;

fn reporter<'a>(state: &'a AppState, req: &Request) -> Result<&'a ReportComposer, serde_json::Value> {
    state
        .reporter
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

fn handle_student_profile(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let composer = match reporter(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_i64(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };

    match composer.student_profile(conn, student_id) {
        Ok(path) => ok(
            &req.id,
            json!({
                "pdfPath": path.to_string_lossy(),
                "fileName": format!("student_{}_profile.pdf", student_id),
            }),
        ),
        Err(e) => domain_err(&req.id, &e),
    }
}

fn handle_academic_performance(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let composer = match reporter(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    match composer.academic_performance(conn) {
        Ok(path) => ok(
            &req.id,
            json!({
                "pdfPath": path.to_string_lossy(),
                "fileName": "academic_performance_report.pdf",
            }),
        ),
        Err(e) => domain_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.studentProfile" => Some(handle_student_profile(state, req)),
        "reports.academicPerformance" => Some(handle_academic_performance(state, req)),
        _ => None,
    }
}
