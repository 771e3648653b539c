use rusqlite::Connection;
use serde::Serialize;

use crate::error::DomainResult;

/// Per-(subject, department) aggregate over all grades. Percentages are
/// shares of that group's grades; the standard deviation is the
/// population form via `sqrt(avg(x^2) - avg(x)^2)`, clamped at zero so
/// floating-point jitter cannot produce NaN.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectDistribution {
    pub subject_name: String,
    pub department: Option<String>,
    pub average_marks: f64,
    pub min_marks: f64,
    pub max_marks: f64,
    pub total_exams: i64,
    pub pass_percentage: f64,
    pub grade_a_percentage: f64,
    pub grade_b_percentage: f64,
    pub marks_standard_deviation: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BandCount {
    pub band: &'static str,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyPoint {
    pub month: String,
    pub mean_percentage: f64,
    pub std_percentage: f64,
    pub exams: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelMean {
    pub label: String,
    pub mean_percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopStudent {
    pub student_id: i64,
    pub first_name: String,
    pub last_name: String,
    pub image_url: Option<String>,
    pub average_percentage: f64,
    pub exams_taken: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstitutionSummary {
    pub total_grades: i64,
    pub grade_bands: Vec<BandCount>,
    pub monthly: Vec<MonthlyPoint>,
    pub per_subject: Vec<LabelMean>,
    pub per_department: Vec<LabelMean>,
    pub pass_rate_percentage: f64,
    pub high_achiever_percentage: f64,
    pub top_students: Vec<TopStudent>,
}

/// Letter bands over achievement percentage, `[low, high)` except the
/// top band which is closed at 100 (and also absorbs out-of-range marks).
pub const GRADE_BANDS: &[(&str, f64, f64)] = &[
    ("F", 0.0, 40.0),
    ("D", 40.0, 60.0),
    ("C", 60.0, 75.0),
    ("B", 75.0, 90.0),
    ("A", 90.0, 100.0),
];

pub fn performance_distribution(conn: &Connection) -> DomainResult<Vec<SubjectDistribution>> {
    let mut stmt = conn.prepare(
        "SELECT
            s.SubjectName,
            s.Department,
            ROUND(AVG(g.MarksObtained), 2) AS AverageMarks,
            ROUND(MIN(g.MarksObtained), 2) AS MinMarks,
            ROUND(MAX(g.MarksObtained), 2) AS MaxMarks,
            COUNT(g.GradeID) AS TotalExams,
            ROUND(SUM(CASE WHEN g.MarksObtained >= e.MaximumMarks * 0.6 THEN 1 ELSE 0 END)
                  * 100.0 / COUNT(g.GradeID), 2) AS PassPercentage,
            ROUND(SUM(CASE WHEN g.MarksObtained >= e.MaximumMarks * 0.9 THEN 1 ELSE 0 END)
                  * 100.0 / COUNT(g.GradeID), 2) AS GradeAPercentage,
            ROUND(SUM(CASE WHEN g.MarksObtained >= e.MaximumMarks * 0.8
                            AND g.MarksObtained < e.MaximumMarks * 0.9 THEN 1 ELSE 0 END)
                  * 100.0 / COUNT(g.GradeID), 2) AS GradeBPercentage,
            ROUND(SQRT(MAX(AVG(g.MarksObtained * g.MarksObtained)
                           - AVG(g.MarksObtained) * AVG(g.MarksObtained), 0)), 2)
                AS MarksStandardDeviation
         FROM Grades g
         JOIN Exams e ON g.ExamID = e.ExamID
         JOIN Subjects s ON e.SubjectID = s.SubjectID
         GROUP BY s.SubjectName, s.Department
         ORDER BY AverageMarks DESC",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok(SubjectDistribution {
                subject_name: r.get(0)?,
                department: r.get(1)?,
                average_marks: r.get(2)?,
                min_marks: r.get(3)?,
                max_marks: r.get(4)?,
                total_exams: r.get(5)?,
                pass_percentage: r.get(6)?,
                grade_a_percentage: r.get(7)?,
                grade_b_percentage: r.get(8)?,
                marks_standard_deviation: r.get(9)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn grade_band_histogram(conn: &Connection) -> DomainResult<Vec<BandCount>> {
    let mut stmt = conn.prepare(
        "SELECT CASE
                    WHEN pct >= 90 THEN 'A'
                    WHEN pct >= 75 THEN 'B'
                    WHEN pct >= 60 THEN 'C'
                    WHEN pct >= 40 THEN 'D'
                    ELSE 'F'
                END AS Band,
                COUNT(*)
         FROM (SELECT g.MarksObtained * 100.0 / e.MaximumMarks AS pct
               FROM Grades g
               JOIN Exams e ON e.ExamID = g.ExamID)
         GROUP BY Band",
    )?;
    let counted: Vec<(String, i64)> = stmt
        .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(GRADE_BANDS
        .iter()
        .map(|(band, _, _)| BandCount {
            band,
            count: counted
                .iter()
                .find(|(b, _)| b == band)
                .map(|(_, c)| *c)
                .unwrap_or(0),
        })
        .collect())
}

fn monthly_trend(conn: &Connection) -> DomainResult<Vec<MonthlyPoint>> {
    let mut stmt = conn.prepare(
        "SELECT strftime('%Y-%m', e.ExamDate) AS Month,
                ROUND(AVG(g.MarksObtained * 100.0 / e.MaximumMarks), 2) AS MeanPct,
                ROUND(SQRT(MAX(AVG((g.MarksObtained * 100.0 / e.MaximumMarks)
                                   * (g.MarksObtained * 100.0 / e.MaximumMarks))
                               - AVG(g.MarksObtained * 100.0 / e.MaximumMarks)
                                 * AVG(g.MarksObtained * 100.0 / e.MaximumMarks), 0)), 2)
                    AS StdPct,
                COUNT(*)
         FROM Grades g
         JOIN Exams e ON e.ExamID = g.ExamID
         WHERE e.ExamDate IS NOT NULL
         GROUP BY Month
         ORDER BY Month",
    )?;
    let rows = stmt
        .query_map([], |r| {
            Ok(MonthlyPoint {
                month: r.get(0)?,
                mean_percentage: r.get(1)?,
                std_percentage: r.get(2)?,
                exams: r.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

fn mean_percentage_by(conn: &Connection, label_expr: &'static str) -> DomainResult<Vec<LabelMean>> {
    let sql = format!(
        "SELECT {label}, ROUND(AVG(g.MarksObtained * 100.0 / e.MaximumMarks), 2)
         FROM Grades g
         JOIN Exams e ON e.ExamID = g.ExamID
         JOIN Subjects s ON s.SubjectID = e.SubjectID
         GROUP BY {label}
         ORDER BY {label}",
        label = label_expr
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map([], |r| {
            Ok(LabelMean {
                label: r.get::<_, Option<String>>(0)?.unwrap_or_default(),
                mean_percentage: r.get(1)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Pass (avg >= 40%) and high-achiever (avg >= 75%) rates over DISTINCT
/// students, judged on each student's average achievement, not per exam.
fn student_rates(conn: &Connection) -> DomainResult<(f64, f64)> {
    let (pass, high): (Option<f64>, Option<f64>) = conn.query_row(
        "SELECT
            ROUND(SUM(CASE WHEN AvgPct >= 40 THEN 1 ELSE 0 END) * 100.0 / COUNT(*), 2),
            ROUND(SUM(CASE WHEN AvgPct >= 75 THEN 1 ELSE 0 END) * 100.0 / COUNT(*), 2)
         FROM (SELECT AVG(g.MarksObtained * 100.0 / e.MaximumMarks) AS AvgPct
               FROM Grades g
               JOIN Exams e ON e.ExamID = g.ExamID
               GROUP BY g.StudentID)",
        [],
        |r| Ok((r.get(0)?, r.get(1)?)),
    )?;
    Ok((pass.unwrap_or(0.0), high.unwrap_or(0.0)))
}

/// Top students by average achievement percentage; ties break by
/// ascending student id so the leaderboard is deterministic.
pub fn top_students(conn: &Connection, limit: i64) -> DomainResult<Vec<TopStudent>> {
    let mut stmt = conn.prepare(
        "SELECT st.StudentID, st.FirstName, st.LastName, st.ImageURL,
                ROUND(AVG(g.MarksObtained * 100.0 / e.MaximumMarks), 2) AS AvgPct,
                COUNT(*) AS ExamsTaken
         FROM Grades g
         JOIN Exams e ON e.ExamID = g.ExamID
         JOIN Students st ON st.StudentID = g.StudentID
         GROUP BY g.StudentID
         ORDER BY AVG(g.MarksObtained * 100.0 / e.MaximumMarks) DESC, st.StudentID ASC
         LIMIT ?",
    )?;
    let rows = stmt
        .query_map([limit], |r| {
            Ok(TopStudent {
                student_id: r.get(0)?,
                first_name: r.get(1)?,
                last_name: r.get(2)?,
                image_url: r.get(3)?,
                average_percentage: r.get(4)?,
                exams_taken: r.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn institution_summary(conn: &Connection) -> DomainResult<InstitutionSummary> {
    let total_grades: i64 = conn.query_row(
        "SELECT COUNT(*) FROM Grades g JOIN Exams e ON e.ExamID = g.ExamID",
        [],
        |r| r.get(0),
    )?;
    let (pass_rate_percentage, high_achiever_percentage) = student_rates(conn)?;

    Ok(InstitutionSummary {
        total_grades,
        grade_bands: grade_band_histogram(conn)?,
        monthly: monthly_trend(conn)?,
        per_subject: mean_percentage_by(conn, "s.SubjectName")?,
        per_department: mean_percentage_by(conn, "s.Department")?,
        pass_rate_percentage,
        high_achiever_percentage,
        top_students: top_students(conn, 3)?,
    })
}
