use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_acadreportd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn acadreportd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({ "id": id, "method": method, "params": params });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");
    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

/// The config file can move the CSV assets dir; grades resolve even
/// though their file sorts before the reference tables it depends on.
#[test]
fn bootstrap_honors_config_and_import_order() {
    let workspace = tempfile::tempdir().expect("workspace dir");
    std::fs::write(
        workspace.path().join("acadreportd.toml"),
        "csv_dir = \"data\"\n",
    )
    .expect("write config");

    let data = workspace.path().join("data");
    std::fs::create_dir_all(&data).expect("create data dir");
    // "aaa_grades.csv" sorts first alphabetically on purpose.
    std::fs::write(
        data.join("aaa_grades.csv"),
        "GradeID,FirstName,LastName,SubjectName,ExamName,MarksObtained\n\
         1,Test,Student,Test Subject,Test Exam,80\n",
    )
    .expect("write grades");
    std::fs::write(
        data.join("universities.csv"),
        "UniversityID,UniversityName,LogoURL,Address,ContactEmail\n\
         1,Test University,,ABC,admin@test.example\n",
    )
    .expect("write universities");
    std::fs::write(
        data.join("students.csv"),
        "StudentID,FirstName,LastName,Email,DateOfBirth,AcademicYear,ImageURL,UniversityID,SubjectsTaken\n\
         1,Test,Student,test@example.com,2000-01-01,2024,,1,1\n",
    )
    .expect("write students");
    std::fs::write(
        data.join("subjects.csv"),
        "SubjectID,SubjectName,Department\n1,Test Subject,Science\n",
    )
    .expect("write subjects");
    std::fs::write(
        data.join("exams.csv"),
        "ExamID,SubjectID,ExamName,ExamDate,MaximumMarks\n1,1,Test Exam,1999-01-01,100\n",
    )
    .expect("write exams");

    let (mut child, mut stdin, mut reader) = spawn_sidecar();
    let selected = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.path().to_string_lossy() }),
    );
    let bootstrapped = selected
        .get("bootstrapped")
        .and_then(|v| v.as_array())
        .cloned()
        .expect("bootstrapped summaries");
    assert_eq!(bootstrapped.len(), 5);

    // Grades imported last regardless of file name ordering.
    assert_eq!(
        bootstrapped.last().and_then(|s| s.get("table")),
        Some(&json!("Grades"))
    );
    assert_eq!(
        bootstrapped.last().and_then(|s| s.get("imported")),
        Some(&json!(1))
    );
    assert_eq!(
        bootstrapped.last().and_then(|s| s.get("dropped")),
        Some(&json!(0))
    );

    let grades = request_ok(
        &mut stdin,
        &mut reader,
        "grades",
        "students.grades",
        json!({ "studentId": 1 }),
    );
    assert_eq!(
        grades.get("grades").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(1)
    );

    // Selecting the same workspace again is a full reload; the grade
    // set is cleared and re-resolved, not duplicated.
    let reselected = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "workspace.select",
        json!({ "path": workspace.path().to_string_lossy() }),
    );
    assert_eq!(
        reselected
            .get("bootstrapped")
            .and_then(|v| v.as_array())
            .map(|a| a.len()),
        Some(5)
    );
    let grades_again = request_ok(
        &mut stdin,
        &mut reader,
        "grades-2",
        "students.grades",
        json!({ "studentId": 1 }),
    );
    assert_eq!(
        grades_again
            .get("grades")
            .and_then(|v| v.as_array())
            .map(|a| a.len()),
        Some(1)
    );

    drop(stdin);
    let _ = child.wait();
}
