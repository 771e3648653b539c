use serde_json::json;

use crate::ipc::error::{domain_err, ok};
use crate::ipc::helpers::{db_conn, required_i64};
use crate::ipc::types::{AppState, Request};
use crate::query;

fn handle_students_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_i64(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match query::get_student_by_id(conn, student_id) {
        Ok(student) => ok(&req.id, json!({ "student": student })),
        Err(e) => domain_err(&req.id, &e),
    }
}

fn handle_students_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match query::get_all_students(conn) {
        Ok(students) => ok(&req.id, json!({ "students": students })),
        Err(e) => domain_err(&req.id, &e),
    }
}

fn handle_students_university(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_i64(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match query::get_university_for_student(conn, student_id) {
        Ok(university) => ok(&req.id, json!({ "university": university })),
        Err(e) => domain_err(&req.id, &e),
    }
}

fn handle_students_subjects(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_i64(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match query::get_subjects_for_student(conn, student_id) {
        Ok(subjects) => ok(&req.id, json!({ "subjects": subjects })),
        Err(e) => domain_err(&req.id, &e),
    }
}

fn handle_students_grades(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let student_id = match required_i64(req, "studentId") {
        Ok(v) => v,
        Err(e) => return e,
    };
    match query::get_grades_for_student(conn, student_id) {
        Ok(grades) => ok(&req.id, json!({ "grades": grades })),
        Err(e) => domain_err(&req.id, &e),
    }
}

fn handle_grades_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let conn = match db_conn(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match query::get_all_grades(conn) {
        Ok(grades) => ok(&req.id, json!({ "grades": grades })),
        Err(e) => domain_err(&req.id, &e),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "students.get" => Some(handle_students_get(state, req)),
        "students.list" => Some(handle_students_list(state, req)),
        "students.university" => Some(handle_students_university(state, req)),
        "students.subjects" => Some(handle_students_subjects(state, req)),
        "students.grades" => Some(handle_students_grades(state, req)),
        "grades.list" => Some(handle_grades_list(state, req)),
        _ => None,
    }
}
