//! Static table registry. Every identifier that ever reaches a SQL string
//! is enumerated here; request-supplied table names are resolved against
//! this list and never interpolated directly.

/// Foreign key declaration: (column, referenced table, referenced column).
pub type ForeignKey = (&'static str, &'static str, &'static str);

#[derive(Debug, Clone, Copy)]
pub struct TableDef {
    pub name: &'static str,
    pub id_column: &'static str,
    /// Canonical column set, id column first.
    pub columns: &'static [&'static str],
    pub foreign_keys: &'static [ForeignKey],
}

pub const UNIVERSITIES: TableDef = TableDef {
    name: "Universities",
    id_column: "UniversityID",
    columns: &[
        "UniversityID",
        "UniversityName",
        "LogoURL",
        "Address",
        "ContactEmail",
    ],
    foreign_keys: &[],
};

pub const STUDENTS: TableDef = TableDef {
    name: "Students",
    id_column: "StudentID",
    columns: &[
        "StudentID",
        "FirstName",
        "LastName",
        "Email",
        "DateOfBirth",
        "AcademicYear",
        "ImageURL",
        "UniversityID",
        "SubjectsTaken",
    ],
    foreign_keys: &[("UniversityID", "Universities", "UniversityID")],
};

pub const SUBJECTS: TableDef = TableDef {
    name: "Subjects",
    id_column: "SubjectID",
    columns: &["SubjectID", "SubjectName", "Department"],
    foreign_keys: &[],
};

pub const EXAMS: TableDef = TableDef {
    name: "Exams",
    id_column: "ExamID",
    columns: &["ExamID", "SubjectID", "ExamName", "ExamDate", "MaximumMarks"],
    foreign_keys: &[("SubjectID", "Subjects", "SubjectID")],
};

pub const GRADES: TableDef = TableDef {
    name: "Grades",
    id_column: "GradeID",
    columns: &["GradeID", "StudentID", "ExamID", "MarksObtained"],
    foreign_keys: &[
        ("StudentID", "Students", "StudentID"),
        ("ExamID", "Exams", "ExamID"),
    ],
};

pub const TABLES: &[TableDef] = &[UNIVERSITIES, STUDENTS, SUBJECTS, EXAMS, GRADES];

/// Column set a grades CSV must carry: natural keys instead of surrogate
/// ids, resolved at import time.
pub const GRADES_CSV_COLUMNS: &[&str] = &[
    "GradeID",
    "FirstName",
    "LastName",
    "SubjectName",
    "ExamName",
    "MarksObtained",
];

const DATE_COLUMNS: &[&str] = &["ExamDate", "DateOfBirth", "Date"];

/// Fixed name → affinity lookup for CSV-derived tables. Ids and marks
/// need numeric affinity, otherwise SQLite would coerce their values to
/// text and typed reads on the query layer would fail; everything else
/// stays TEXT.
pub fn column_sql_type(column: &str) -> &'static str {
    if DATE_COLUMNS.contains(&column) {
        "DATE"
    } else if column.ends_with("ID") {
        "INTEGER"
    } else if column.contains("Marks") {
        "NUMERIC"
    } else {
        "TEXT"
    }
}

pub fn table_by_name(name: &str) -> Option<&'static TableDef> {
    TABLES.iter().find(|t| t.name == name)
}

/// Import routing: the first header column names the target table.
pub fn table_for_id_column(first_column: &str) -> Option<&'static TableDef> {
    TABLES.iter().find(|t| t.id_column == first_column)
}
