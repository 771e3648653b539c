//! Shared in-memory fixtures for unit tests, seeded through the real
//! import paths so every test also exercises the import manager.

use rusqlite::Connection;

use crate::csv_import::{import_grades, import_replace, CsvData};
use crate::schema::{EXAMS, STUDENTS, SUBJECTS, UNIVERSITIES};

pub fn csv(columns: &[&str], rows: &[&[&str]]) -> CsvData {
    CsvData {
        columns: columns.iter().map(|c| c.to_string()).collect(),
        rows: rows
            .iter()
            .map(|r| r.iter().map(|v| v.to_string()).collect())
            .collect(),
    }
}

pub const STUDENT_CSV_COLUMNS: &[&str] = &[
    "StudentID",
    "FirstName",
    "LastName",
    "Email",
    "DateOfBirth",
    "AcademicYear",
    "ImageURL",
    "UniversityID",
    "SubjectsTaken",
];

pub const GRADE_CSV_COLUMNS: &[&str] = &[
    "GradeID",
    "FirstName",
    "LastName",
    "SubjectName",
    "ExamName",
    "MarksObtained",
];

fn seed_university(conn: &Connection) {
    import_replace(
        conn,
        &UNIVERSITIES,
        &csv(
            &["UniversityID", "UniversityName", "LogoURL", "Address", "ContactEmail"],
            &[&["1", "Test University", "", "ABC", "admin@test.example"]],
        ),
    )
    .expect("seed universities");
}

/// The single-grade scenario: one student, one subject, one exam, one
/// grade of 80/100 dated 1999-01-01.
pub fn seed_sample() -> Connection {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    seed_university(&conn);
    import_replace(
        &conn,
        &STUDENTS,
        &csv(
            STUDENT_CSV_COLUMNS,
            &[&["1", "Test", "Student", "test@example.com", "2000-01-01", "2024", "", "1", "1"]],
        ),
    )
    .expect("seed students");
    import_replace(
        &conn,
        &SUBJECTS,
        &csv(
            &["SubjectID", "SubjectName", "Department"],
            &[&["1", "Test Subject", "Science"]],
        ),
    )
    .expect("seed subjects");
    import_replace(
        &conn,
        &EXAMS,
        &csv(
            &["ExamID", "SubjectID", "ExamName", "ExamDate", "MaximumMarks"],
            &[&["1", "1", "Test Exam", "1999-01-01", "100"]],
        ),
    )
    .expect("seed exams");
    import_grades(
        &conn,
        &csv(
            GRADE_CSV_COLUMNS,
            &[&["1", "Test", "Student", "Test Subject", "Test Exam", "80"]],
        ),
    )
    .expect("seed grades");
    conn
}

/// Three students across two subjects and two exam months, with
/// per-student averages 90 / 72.5 / 30.
pub fn seed_cohort() -> Connection {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    seed_university(&conn);
    import_replace(
        &conn,
        &STUDENTS,
        &csv(
            STUDENT_CSV_COLUMNS,
            &[
                &["1", "Ada", "Lovelace", "ada@test.example", "2001-03-01", "2024", "", "1", "1,2"],
                &["2", "Alan", "Turing", "alan@test.example", "2001-06-23", "2024", "", "1", "1,2"],
                &["3", "Grace", "Hopper", "grace@test.example", "2001-12-09", "2024", "", "1", "1,2"],
            ],
        ),
    )
    .expect("seed students");
    import_replace(
        &conn,
        &SUBJECTS,
        &csv(
            &["SubjectID", "SubjectName", "Department"],
            &[&["1", "Math", "Mathematics"], &["2", "Physics", "Science"]],
        ),
    )
    .expect("seed subjects");
    import_replace(
        &conn,
        &EXAMS,
        &csv(
            &["ExamID", "SubjectID", "ExamName", "ExamDate", "MaximumMarks"],
            &[
                &["1", "1", "Algebra Midterm", "2024-01-10", "100"],
                &["2", "2", "Mechanics Midterm", "2024-02-12", "50"],
            ],
        ),
    )
    .expect("seed exams");
    import_grades(
        &conn,
        &csv(
            GRADE_CSV_COLUMNS,
            &[
                &["1", "Ada", "Lovelace", "Math", "Algebra Midterm", "90"],
                &["2", "Ada", "Lovelace", "Physics", "Mechanics Midterm", "45"],
                &["3", "Alan", "Turing", "Math", "Algebra Midterm", "80"],
                &["4", "Alan", "Turing", "Physics", "Mechanics Midterm", "32.5"],
                &["5", "Grace", "Hopper", "Math", "Algebra Midterm", "30"],
                &["6", "Grace", "Hopper", "Physics", "Mechanics Midterm", "15"],
            ],
        ),
    )
    .expect("seed grades");
    conn
}

/// One student, six exams at the band edges 39/40/60/75/90/100.
pub fn seed_band_edges() -> Connection {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    seed_university(&conn);
    import_replace(
        &conn,
        &STUDENTS,
        &csv(
            STUDENT_CSV_COLUMNS,
            &[&["1", "Edge", "Case", "edge@test.example", "2002-01-01", "2024", "", "1", "1"]],
        ),
    )
    .expect("seed students");
    import_replace(
        &conn,
        &SUBJECTS,
        &csv(
            &["SubjectID", "SubjectName", "Department"],
            &[&["1", "Boundaries", "Science"]],
        ),
    )
    .expect("seed subjects");

    let marks = ["39", "40", "60", "75", "90", "100"];
    let exam_rows: Vec<Vec<String>> = marks
        .iter()
        .enumerate()
        .map(|(i, _)| {
            vec![
                (i + 1).to_string(),
                "1".to_string(),
                format!("Exam {}", i + 1),
                format!("2024-03-{:02}", i + 1),
                "100".to_string(),
            ]
        })
        .collect();
    import_replace(
        &conn,
        &EXAMS,
        &CsvData {
            columns: ["ExamID", "SubjectID", "ExamName", "ExamDate", "MaximumMarks"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
            rows: exam_rows,
        },
    )
    .expect("seed exams");

    let grade_rows: Vec<Vec<String>> = marks
        .iter()
        .enumerate()
        .map(|(i, m)| {
            vec![
                (i + 1).to_string(),
                "Edge".to_string(),
                "Case".to_string(),
                "Boundaries".to_string(),
                format!("Exam {}", i + 1),
                m.to_string(),
            ]
        })
        .collect();
    import_grades(
        &conn,
        &CsvData {
            columns: GRADE_CSV_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: grade_rows,
        },
    )
    .expect("seed grades");
    conn
}

/// Three students with identical averages, for leaderboard tie-breaks.
pub fn seed_tied_students() -> Connection {
    let conn = Connection::open_in_memory().expect("open in-memory db");
    seed_university(&conn);
    import_replace(
        &conn,
        &STUDENTS,
        &csv(
            STUDENT_CSV_COLUMNS,
            &[
                &["3", "Cary", "Gamma", "c@test.example", "2001-01-03", "2024", "", "1", "1"],
                &["1", "Abel", "Alpha", "a@test.example", "2001-01-01", "2024", "", "1", "1"],
                &["2", "Beth", "Beta", "b@test.example", "2001-01-02", "2024", "", "1", "1"],
            ],
        ),
    )
    .expect("seed students");
    import_replace(
        &conn,
        &SUBJECTS,
        &csv(
            &["SubjectID", "SubjectName", "Department"],
            &[&["1", "Ties", "Science"]],
        ),
    )
    .expect("seed subjects");
    import_replace(
        &conn,
        &EXAMS,
        &csv(
            &["ExamID", "SubjectID", "ExamName", "ExamDate", "MaximumMarks"],
            &[&["1", "1", "Shared Exam", "2024-04-01", "100"]],
        ),
    )
    .expect("seed exams");
    import_grades(
        &conn,
        &csv(
            GRADE_CSV_COLUMNS,
            &[
                &["1", "Abel", "Alpha", "Ties", "Shared Exam", "85"],
                &["2", "Beth", "Beta", "Ties", "Shared Exam", "85"],
                &["3", "Cary", "Gamma", "Ties", "Shared Exam", "85"],
            ],
        ),
    )
    .expect("seed grades");
    conn
}
