use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, OptionalExtension};
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, warn};

use crate::db;
use crate::error::{DomainError, DomainResult};
use crate::schema::{self, TableDef, GRADES};

/// Header-named tabular dataset, as read from one CSV file.
#[derive(Debug, Clone)]
pub struct CsvData {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub table: &'static str,
    pub imported: usize,
    /// Grade rows whose natural keys resolved to no student/exam.
    pub dropped: usize,
}

pub fn read_csv(path: &Path) -> DomainResult<CsvData> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| DomainError::mismatch(format!("cannot read CSV {}: {}", path.display(), e)))?;

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| DomainError::mismatch(format!("bad CSV header: {}", e)))?
        .iter()
        .map(str::to_string)
        .collect();
    if columns.is_empty() {
        return Err(DomainError::mismatch("CSV has no header row"));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| DomainError::mismatch(format!("bad CSV row: {}", e)))?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(CsvData { columns, rows })
}

fn valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Derive a table from CSV structure: first column is the integer primary
/// key, remaining column affinity comes from the fixed name lookup.
/// Declares the registry's foreign keys for whichever FK columns appear.
/// Idempotent; an existing table is left untouched.
pub fn create_table_from_columns(
    conn: &Connection,
    table: &TableDef,
    columns: &[String],
) -> DomainResult<()> {
    if columns.is_empty() {
        return Err(DomainError::mismatch("cannot create a table without columns"));
    }
    for column in columns {
        if !valid_identifier(column) {
            return Err(DomainError::mismatch(format!(
                "invalid column name in CSV header: {:?}",
                column
            )));
        }
    }

    let mut parts: Vec<String> = Vec::with_capacity(columns.len() + table.foreign_keys.len());
    parts.push(format!("{} INTEGER PRIMARY KEY", columns[0]));
    for column in &columns[1..] {
        parts.push(format!("{} {}", column, schema::column_sql_type(column)));
    }
    for (column, ref_table, ref_column) in table.foreign_keys {
        if columns.iter().any(|c| c == column) {
            parts.push(format!(
                "FOREIGN KEY({}) REFERENCES {}({})",
                column, ref_table, ref_column
            ));
        }
    }

    let ddl = format!("CREATE TABLE IF NOT EXISTS {} ({})", table.name, parts.join(", "));
    conn.execute(&ddl, [])?;
    Ok(())
}

fn check_column_set(expected: &[String], incoming: &[String]) -> DomainResult<()> {
    let expected_set: HashSet<&str> = expected.iter().map(String::as_str).collect();
    let incoming_set: HashSet<&str> = incoming.iter().map(String::as_str).collect();
    if expected_set != incoming_set {
        return Err(DomainError::mismatch(
            "columns do not match the target table, review the input CSV",
        ));
    }
    Ok(())
}

/// Pandas-style value inference: integers and reals bind as numbers so
/// the store keeps numeric columns numeric, empty cells become NULL.
fn sql_value(raw: &str) -> Value {
    if raw.is_empty() {
        return Value::Null;
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Value::Integer(i);
    }
    if let Ok(f) = raw.parse::<f64>() {
        return Value::Real(f);
    }
    Value::Text(raw.to_string())
}

fn dedup_rows(rows: &[Vec<String>]) -> Vec<&Vec<String>> {
    let mut seen: HashSet<&[String]> = HashSet::new();
    rows.iter().filter(|r| seen.insert(r.as_slice())).collect()
}

/// Replace import: delete-all then insert, in one transaction, so a
/// failed import leaves the previous rows intact.
pub fn import_replace(conn: &Connection, table: &TableDef, data: &CsvData) -> DomainResult<usize> {
    create_table_from_columns(conn, table, &data.columns)?;
    let live_columns = db::table_columns(conn, table.name)?;
    check_column_set(&live_columns, &data.columns)?;

    let tx = conn.unchecked_transaction()?;
    tx.execute(&format!("DELETE FROM {}", table.name), [])?;

    let unique = dedup_rows(&data.rows);
    let placeholders = vec!["?"; data.columns.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table.name,
        data.columns.join(", "),
        placeholders
    );
    {
        let mut stmt = tx.prepare(&sql)?;
        for row in &unique {
            if row.len() != data.columns.len() {
                return Err(DomainError::mismatch("CSV row width differs from header"));
            }
            stmt.execute(params_from_iter(row.iter().map(|v| sql_value(v))))?;
        }
    }
    tx.commit()?;
    Ok(unique.len())
}

/// Append-resolved import for Grades: rows carry natural keys (student
/// name, subject/exam name) which are resolved to surrogate ids before
/// insert. Rows whose keys resolve to nothing are dropped and counted.
pub fn import_grades(conn: &Connection, data: &CsvData) -> DomainResult<ImportSummary> {
    let canonical: Vec<String> = GRADES.columns.iter().map(|c| c.to_string()).collect();
    create_table_from_columns(conn, &GRADES, &canonical)?;

    let expected: Vec<String> = schema::GRADES_CSV_COLUMNS
        .iter()
        .map(|c| c.to_string())
        .collect();
    check_column_set(&expected, &data.columns)?;

    let col = |name: &str| -> DomainResult<usize> {
        data.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| DomainError::mismatch(format!("missing column {}", name)))
    };
    let (first, last, subject, exam, marks) = (
        col("FirstName")?,
        col("LastName")?,
        col("SubjectName")?,
        col("ExamName")?,
        col("MarksObtained")?,
    );

    let tx = conn.unchecked_transaction()?;
    let mut imported = 0usize;
    let mut dropped = 0usize;
    {
        let mut student_stmt =
            tx.prepare("SELECT StudentID FROM Students WHERE FirstName = ? AND LastName = ?")?;
        let mut exam_stmt = tx.prepare(
            "SELECT e.ExamID
             FROM Exams e
             JOIN Subjects s ON s.SubjectID = e.SubjectID
             WHERE s.SubjectName = ? AND e.ExamName = ?",
        )?;
        let mut insert_stmt =
            tx.prepare("INSERT INTO Grades (StudentID, ExamID, MarksObtained) VALUES (?, ?, ?)")?;

        for row in &data.rows {
            if row.len() != data.columns.len() {
                return Err(DomainError::mismatch("CSV row width differs from header"));
            }
            let marks_value: f64 = row[marks].parse().map_err(|_| {
                DomainError::mismatch(format!("MarksObtained is not numeric: {:?}", row[marks]))
            })?;

            let student_id: Option<i64> = student_stmt
                .query_row([&row[first], &row[last]], |r| r.get(0))
                .optional()?;
            let exam_id: Option<i64> = exam_stmt
                .query_row([&row[subject], &row[exam]], |r| r.get(0))
                .optional()?;

            match (student_id, exam_id) {
                (Some(sid), Some(eid)) => {
                    insert_stmt.execute(rusqlite::params![sid, eid, marks_value])?;
                    imported += 1;
                }
                _ => dropped += 1,
            }
        }
    }
    tx.commit()?;

    if dropped > 0 {
        warn!(dropped, imported, "grade rows with unresolved natural keys were dropped");
    }
    Ok(ImportSummary {
        table: GRADES.name,
        imported,
        dropped,
    })
}

/// Route a dataset to its import path by the first header column.
pub fn import_data(conn: &Connection, data: &CsvData) -> DomainResult<ImportSummary> {
    let first_column = data.columns[0].as_str();
    let Some(table) = schema::table_for_id_column(first_column) else {
        return Err(DomainError::mismatch(format!(
            "first column {:?} does not map to a known table",
            first_column
        )));
    };

    if table.name == GRADES.name {
        let summary = import_grades(conn, data)?;
        info!(table = summary.table, imported = summary.imported, "grades import complete");
        return Ok(summary);
    }

    let imported = import_replace(conn, table, data)?;
    info!(table = table.name, imported, "replace import complete");
    Ok(ImportSummary {
        table: table.name,
        imported,
        dropped: 0,
    })
}

pub fn import_csv_file(conn: &Connection, path: &Path) -> DomainResult<ImportSummary> {
    let data = read_csv(path)?;
    import_data(conn, &data)
}

/// Startup bulk load: every `*.csv` in the assets dir, reference tables
/// before Grades so natural keys can resolve. Individual bad files are
/// skipped with a warning rather than failing workspace selection.
pub fn bootstrap_from_dir(conn: &Connection, dir: &Path) -> Vec<ImportSummary> {
    if !dir.is_dir() {
        return Vec::new();
    }

    let mut paths: Vec<_> = match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.eq_ignore_ascii_case("csv"))
                    .unwrap_or(false)
            })
            .collect(),
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "cannot read CSV assets dir");
            return Vec::new();
        }
    };
    paths.sort();

    let mut datasets = Vec::new();
    for path in paths {
        match read_csv(&path) {
            Ok(data) => datasets.push((path, data)),
            Err(e) => warn!(file = %path.display(), error = %e, "skipping unreadable CSV"),
        }
    }
    datasets.sort_by_key(|(_, data)| data.columns[0] == GRADES.id_column);

    // Startup load is a full reload: clear appended grades first so
    // re-selecting a workspace does not duplicate them.
    let has_grades = datasets
        .iter()
        .any(|(_, data)| data.columns[0] == GRADES.id_column);
    if has_grades {
        match db::table_exists(conn, GRADES.name) {
            Ok(true) => {
                if let Err(e) = conn.execute("DELETE FROM Grades", []) {
                    warn!(error = %e, "cannot clear Grades before bootstrap");
                }
            }
            Ok(false) => {}
            Err(e) => warn!(error = %e, "cannot inspect Grades before bootstrap"),
        }
    }

    let mut summaries = Vec::new();
    for (path, data) in &datasets {
        match import_data(conn, data) {
            Ok(summary) => summaries.push(summary),
            Err(e) => warn!(file = %path.display(), error = %e, "skipping CSV at bootstrap"),
        }
    }
    summaries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{EXAMS, STUDENTS, SUBJECTS};

    fn data(columns: &[&str], rows: &[&[&str]]) -> CsvData {
        CsvData {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|v| v.to_string()).collect())
                .collect(),
        }
    }

    fn conn() -> Connection {
        Connection::open_in_memory().expect("open")
    }

    fn row_count(conn: &Connection, table: &str) -> i64 {
        conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))
            .expect("count")
    }

    fn seed_reference(conn: &Connection) {
        import_replace(
            conn,
            &STUDENTS,
            &data(
                &["StudentID", "FirstName", "LastName", "UniversityID"],
                &[&["1", "Test", "Student", "1"]],
            ),
        )
        .expect("students");
        import_replace(
            conn,
            &SUBJECTS,
            &data(
                &["SubjectID", "SubjectName", "Department"],
                &[&["1", "Test Subject", "Science"]],
            ),
        )
        .expect("subjects");
        import_replace(
            conn,
            &EXAMS,
            &data(
                &["ExamID", "SubjectID", "ExamName", "ExamDate", "MaximumMarks"],
                &[&["1", "1", "Test Exam", "1999-01-01", "100"]],
            ),
        )
        .expect("exams");
    }

    #[test]
    fn replace_import_is_idempotent() {
        let conn = conn();
        let students = data(
            &["StudentID", "FirstName", "LastName", "UniversityID"],
            &[&["1", "Ada", "Lovelace", "1"], &["2", "Alan", "Turing", "1"]],
        );
        assert_eq!(import_replace(&conn, &STUDENTS, &students).expect("first"), 2);
        assert_eq!(import_replace(&conn, &STUDENTS, &students).expect("second"), 2);
        assert_eq!(row_count(&conn, "Students"), 2);
    }

    #[test]
    fn replace_import_drops_duplicate_rows() {
        let conn = conn();
        let students = data(
            &["StudentID", "FirstName", "LastName", "UniversityID"],
            &[&["1", "Ada", "Lovelace", "1"], &["1", "Ada", "Lovelace", "1"]],
        );
        assert_eq!(import_replace(&conn, &STUDENTS, &students).expect("import"), 1);
    }

    #[test]
    fn column_mismatch_rejected_without_partial_write() {
        let conn = conn();
        seed_reference(&conn);
        import_grades(
            &conn,
            &data(
                &["GradeID", "FirstName", "LastName", "SubjectName", "ExamName", "MarksObtained"],
                &[&["1", "Test", "Student", "Test Subject", "Test Exam", "80"]],
            ),
        )
        .expect("grades");

        let bad = data(
            &["GradeID", "FirstName", "SubjectName", "ExamName", "MarksObtained"],
            &[&["2", "Test", "Test Subject", "Test Exam", "90"]],
        );
        let err = import_grades(&conn, &bad).expect_err("mismatch");
        assert_eq!(err.code(), "validation_mismatch");
        assert_eq!(row_count(&conn, "Grades"), 1);
    }

    #[test]
    fn grade_import_resolves_natural_keys_and_drops_unmatched() {
        let conn = conn();
        seed_reference(&conn);
        let summary = import_grades(
            &conn,
            &data(
                &["GradeID", "FirstName", "LastName", "SubjectName", "ExamName", "MarksObtained"],
                &[
                    &["1", "Test", "Student", "Test Subject", "Test Exam", "80"],
                    &["2", "No", "Body", "Test Subject", "Test Exam", "55"],
                ],
            ),
        )
        .expect("grades");
        assert_eq!(summary.imported, 1);
        assert_eq!(summary.dropped, 1);

        let (sid, eid, marks): (i64, i64, f64) = conn
            .query_row("SELECT StudentID, ExamID, MarksObtained FROM Grades", [], |r| {
                Ok((r.get(0)?, r.get(1)?, r.get(2)?))
            })
            .expect("row");
        assert_eq!((sid, eid), (1, 1));
        assert!((marks - 80.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unknown_first_column_is_rejected() {
        let conn = conn();
        let err = import_data(
            &conn,
            &data(&["MysteryID", "Name"], &[&["1", "x"]]),
        )
        .expect_err("unknown table");
        assert_eq!(err.code(), "validation_mismatch");
    }

    #[test]
    fn csv_header_identifiers_are_sanitized() {
        let conn = conn();
        let err = import_replace(
            &conn,
            &STUDENTS,
            &data(&["StudentID", "Name; DROP TABLE x"], &[&["1", "x"]]),
        )
        .expect_err("identifier");
        assert_eq!(err.code(), "validation_mismatch");
    }
}
