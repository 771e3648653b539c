use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rusqlite::{Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::error::{DomainError, DomainResult};
use crate::schema;

pub const DEFAULT_TABLE_LIMIT: i64 = 100;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRow {
    pub student_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub email: Option<String>,
    pub date_of_birth: Option<String>,
    pub academic_year: Option<String>,
    pub image_url: Option<String>,
    pub university_id: Option<i64>,
    pub subjects_taken: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UniversityRow {
    pub university_id: i64,
    pub university_name: String,
    pub logo_url: Option<String>,
    pub address: Option<String>,
    pub contact_email: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRow {
    pub subject_id: i64,
    pub subject_name: String,
    pub department: Option<String>,
}

/// One graded exam for one student, the shape both report charts and the
/// `students.grades` method consume.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeDetailRow {
    pub subject_name: String,
    pub exam_name: String,
    pub exam_date: String,
    pub student_marks: f64,
    pub max_marks: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FullGradeRow {
    pub grade_id: i64,
    pub student_id: i64,
    pub subject_name: String,
    pub department: Option<String>,
    pub exam_name: String,
    pub exam_date: String,
    pub marks_obtained: f64,
    pub maximum_marks: f64,
}

fn student_from_row(row: &Row<'_>) -> rusqlite::Result<StudentRow> {
    Ok(StudentRow {
        student_id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        date_of_birth: row.get(4)?,
        academic_year: row.get(5)?,
        image_url: row.get(6)?,
        university_id: row.get(7)?,
        subjects_taken: row.get(8)?,
    })
}

fn university_from_row(row: &Row<'_>) -> rusqlite::Result<UniversityRow> {
    Ok(UniversityRow {
        university_id: row.get(0)?,
        university_name: row.get(1)?,
        logo_url: row.get(2)?,
        address: row.get(3)?,
        contact_email: row.get(4)?,
    })
}

const STUDENT_COLUMNS: &str = "StudentID, FirstName, LastName, Email, DateOfBirth, \
     AcademicYear, ImageURL, UniversityID, SubjectsTaken";

const UNIVERSITY_COLUMNS: &str = "UniversityID, UniversityName, LogoURL, Address, ContactEmail";

pub fn get_student_by_id(conn: &Connection, student_id: i64) -> DomainResult<StudentRow> {
    conn.query_row(
        &format!("SELECT {} FROM Students WHERE StudentID = ?", STUDENT_COLUMNS),
        [student_id],
        student_from_row,
    )
    .optional()?
    .ok_or_else(|| DomainError::not_found(format!("student {}", student_id)))
}

pub fn get_all_students(conn: &Connection) -> DomainResult<Vec<StudentRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM Students ORDER BY StudentID",
        STUDENT_COLUMNS
    ))?;
    let rows = stmt
        .query_map([], student_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get_university_for_student(conn: &Connection, student_id: i64) -> DomainResult<UniversityRow> {
    conn.query_row(
        "SELECT u.UniversityID, u.UniversityName, u.LogoURL, u.Address, u.ContactEmail
         FROM Universities u
         JOIN Students s ON s.UniversityID = u.UniversityID
         WHERE s.StudentID = ?",
        [student_id],
        university_from_row,
    )
    .optional()?
    .ok_or_else(|| DomainError::not_found(format!("university for student {}", student_id)))
}

/// University row for report branding. With no id this returns the
/// primary (lowest-id) university, which is the whole institution in a
/// single-tenant deployment.
pub fn get_university_details(conn: &Connection, university_id: Option<i64>) -> DomainResult<UniversityRow> {
    let row = match university_id {
        Some(id) => conn
            .query_row(
                &format!("SELECT {} FROM Universities WHERE UniversityID = ?", UNIVERSITY_COLUMNS),
                [id],
                university_from_row,
            )
            .optional()?,
        None => conn
            .query_row(
                &format!(
                    "SELECT {} FROM Universities ORDER BY UniversityID LIMIT 1",
                    UNIVERSITY_COLUMNS
                ),
                [],
                university_from_row,
            )
            .optional()?,
    };
    row.ok_or_else(|| match university_id {
        Some(id) => DomainError::not_found(format!("university {}", id)),
        None => DomainError::not_found("university"),
    })
}

/// Canonical "subjects per student": distinct subjects appearing in the
/// student's graded exams. The delimited SubjectsTaken list on the
/// student row is stored but never parsed.
pub fn get_subjects_for_student(conn: &Connection, student_id: i64) -> DomainResult<Vec<SubjectRow>> {
    let mut stmt = conn.prepare(
        "SELECT DISTINCT sb.SubjectID, sb.SubjectName, sb.Department
         FROM Grades g
         JOIN Exams e ON e.ExamID = g.ExamID
         JOIN Subjects sb ON sb.SubjectID = e.SubjectID
         WHERE g.StudentID = ?
         ORDER BY sb.SubjectID",
    )?;
    let rows = stmt
        .query_map([student_id], |r| {
            Ok(SubjectRow {
                subject_id: r.get(0)?,
                subject_name: r.get(1)?,
                department: r.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get_grades_for_student(conn: &Connection, student_id: i64) -> DomainResult<Vec<GradeDetailRow>> {
    let mut stmt = conn.prepare(
        "SELECT sb.SubjectName, e.ExamName, COALESCE(e.ExamDate, ''), g.MarksObtained, e.MaximumMarks
         FROM Grades g
         JOIN Exams e ON e.ExamID = g.ExamID
         JOIN Subjects sb ON sb.SubjectID = e.SubjectID
         WHERE g.StudentID = ?
         ORDER BY e.ExamDate",
    )?;
    let rows = stmt
        .query_map([student_id], |r| {
            Ok(GradeDetailRow {
                subject_name: r.get(0)?,
                exam_name: r.get(1)?,
                exam_date: r.get(2)?,
                student_marks: r.get(3)?,
                max_marks: r.get(4)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn get_all_grades(conn: &Connection) -> DomainResult<Vec<FullGradeRow>> {
    let mut stmt = conn.prepare(
        "SELECT g.GradeID, g.StudentID, sb.SubjectName, sb.Department, e.ExamName,
                COALESCE(e.ExamDate, ''), g.MarksObtained, e.MaximumMarks
         FROM Grades g
         JOIN Exams e ON e.ExamID = g.ExamID
         JOIN Subjects sb ON sb.SubjectID = e.SubjectID
         ORDER BY e.ExamDate",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok(FullGradeRow {
                grade_id: r.get(0)?,
                student_id: r.get(1)?,
                subject_name: r.get(2)?,
                department: r.get(3)?,
                exam_name: r.get(4)?,
                exam_date: r.get(5)?,
                marks_obtained: r.get(6)?,
                maximum_marks: r.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn value_to_json(value: rusqlite::types::Value) -> serde_json::Value {
    use rusqlite::types::Value;
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Integer(i) => i.into(),
        Value::Real(f) => serde_json::json!(f),
        Value::Text(s) => s.into(),
        Value::Blob(b) => BASE64.encode(b).into(),
    }
}

/// Raw paginated dump for data inspection. The table name resolves
/// against the static registry and the id filter uses the registry's id
/// column; nothing request-supplied is interpolated into SQL.
pub fn get_table(
    conn: &Connection,
    table_name: &str,
    limit: i64,
    id: Option<i64>,
) -> DomainResult<Vec<serde_json::Value>> {
    let Some(table) = schema::table_by_name(table_name) else {
        return Err(DomainError::not_found(format!("table {}", table_name)));
    };

    let sql = match id {
        Some(_) => format!(
            "SELECT * FROM {} WHERE {} = ? LIMIT ?",
            table.name, table.id_column
        ),
        None => format!("SELECT * FROM {} LIMIT ?", table.name),
    };
    let mut stmt = conn.prepare(&sql)?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();

    let mut rows = match id {
        Some(id) => stmt.query(rusqlite::params![id, limit])?,
        None => stmt.query([limit])?,
    };

    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut object = serde_json::Map::with_capacity(columns.len());
        for (i, column) in columns.iter().enumerate() {
            let value: rusqlite::types::Value = row.get(i)?;
            object.insert(column.clone(), value_to_json(value));
        }
        out.push(serde_json::Value::Object(object));
    }
    Ok(out)
}
