use chrono::Local;
use rusqlite::Connection;
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;
use uuid::Uuid;

use crate::charts;
use crate::error::{DomainError, DomainResult};
use crate::pdf;
use crate::photos::PhotoService;
use crate::query::{self, SubjectRow, UniversityRow};
use crate::stats::{self, InstitutionSummary, SubjectDistribution, TopStudent};

/// Template context for the per-student profile report. Everything the
/// renderer needs is bound here before any file is touched.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfileContext {
    pub report_date: String,
    pub academic_year: Option<String>,
    pub university: UniversityRow,
    pub student_id: i64,
    pub student_name: String,
    pub email: Option<String>,
    pub date_of_birth: Option<String>,
    pub subjects: Vec<SubjectRow>,
    #[serde(skip)]
    pub photo_jpeg: Vec<u8>,
    #[serde(skip)]
    pub chart_png: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub student: TopStudent,
    #[serde(skip)]
    pub photo_jpeg: Vec<u8>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicReportContext {
    pub report_date: String,
    pub university: UniversityRow,
    pub distribution: Vec<SubjectDistribution>,
    pub summary: InstitutionSummary,
    pub leaderboard: Vec<LeaderboardEntry>,
    #[serde(skip)]
    pub chart_png: Vec<u8>,
}

/// Binds query and aggregation results plus chart images into report
/// contexts and renders them to deterministic paths. Constructed once at
/// workspace selection and handed to request handlers.
pub struct ReportComposer {
    reports_dir: PathBuf,
    photos: PhotoService,
}

impl ReportComposer {
    pub fn new(reports_dir: PathBuf, photos: PhotoService) -> Self {
        Self { reports_dir, photos }
    }

    /// Student profile report. Fails before any file is written when the
    /// student (or its university) is unknown.
    pub fn student_profile(&self, conn: &Connection, student_id: i64) -> DomainResult<PathBuf> {
        let student = query::get_student_by_id(conn, student_id)?;
        let university = query::get_university_for_student(conn, student_id)?;
        let subjects = query::get_subjects_for_student(conn, student_id)?;
        let grades = query::get_grades_for_student(conn, student_id)?;

        let chart_png = charts::student_chart_png(&grades)?;
        let photo_jpeg = self.photos.fetch_jpeg(student.image_url.as_deref());

        let ctx = StudentProfileContext {
            report_date: Local::now().format("%Y-%m-%d").to_string(),
            academic_year: student.academic_year.clone(),
            university,
            student_id,
            student_name: format!("{} {}", student.first_name, student.last_name),
            email: student.email.clone(),
            date_of_birth: student.date_of_birth.clone(),
            subjects,
            photo_jpeg,
            chart_png,
        };

        let bytes = pdf::render_student_profile(&ctx)?;
        let path = self.write_atomic(&format!("student_{}_profile.pdf", student_id), &bytes)?;
        info!(student_id, path = %path.display(), "student profile report written");
        Ok(path)
    }

    /// Institution-wide academic performance report at its fixed path.
    pub fn academic_performance(&self, conn: &Connection) -> DomainResult<PathBuf> {
        let university = query::get_university_details(conn, None)?;
        let distribution = stats::performance_distribution(conn)?;
        let summary = stats::institution_summary(conn)?;
        let chart_png = charts::institution_chart_png(&summary)?;

        let leaderboard: Vec<LeaderboardEntry> = summary
            .top_students
            .iter()
            .enumerate()
            .map(|(i, student)| LeaderboardEntry {
                rank: i + 1,
                photo_jpeg: self.photos.fetch_jpeg(student.image_url.as_deref()),
                student: student.clone(),
            })
            .collect();

        let ctx = AcademicReportContext {
            report_date: Local::now().format("%Y-%m-%d").to_string(),
            university,
            distribution,
            summary,
            leaderboard,
            chart_png,
        };

        let bytes = pdf::render_academic_performance(&ctx)?;
        let path = self.write_atomic("academic_performance_report.pdf", &bytes)?;
        info!(path = %path.display(), "academic performance report written");
        Ok(path)
    }

    /// Write to a temp path and rename so a failed render never leaves a
    /// partial PDF at the deterministic path.
    fn write_atomic(&self, file_name: &str, bytes: &[u8]) -> DomainResult<PathBuf> {
        std::fs::create_dir_all(&self.reports_dir)
            .map_err(|e| DomainError::render(format!("cannot create reports dir: {}", e)))?;
        let final_path = self.reports_dir.join(file_name);
        let tmp_path = self
            .reports_dir
            .join(format!("{}.{}.tmp", file_name, Uuid::new_v4()));

        if let Err(e) = std::fs::write(&tmp_path, bytes) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(DomainError::render(format!("cannot write report: {}", e)));
        }
        if let Err(e) = std::fs::rename(&tmp_path, &final_path) {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(DomainError::render(format!("cannot finalize report: {}", e)));
        }
        Ok(final_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{seed_cohort, seed_sample};
    use std::time::Duration;

    fn composer(dir: &std::path::Path) -> ReportComposer {
        let photos = PhotoService::new(dir.join("photos"), Duration::from_secs(1)).expect("photos");
        ReportComposer::new(dir.join("reports"), photos)
    }

    #[test]
    fn student_profile_writes_pdf_at_deterministic_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let composer = composer(dir.path());
        let conn = seed_sample();

        let path = composer.student_profile(&conn, 1).expect("report");
        assert_eq!(path, dir.path().join("reports").join("student_1_profile.pdf"));
        let bytes = std::fs::read(&path).expect("read pdf");
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn unknown_student_fails_before_writing_anything() {
        let dir = tempfile::tempdir().expect("tempdir");
        let composer = composer(dir.path());
        let conn = seed_sample();

        let err = composer.student_profile(&conn, 404).expect_err("missing");
        assert_eq!(err.code(), "not_found");
        assert!(!dir.path().join("reports").exists());
    }

    #[test]
    fn academic_report_lands_at_fixed_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let composer = composer(dir.path());
        let conn = seed_cohort();

        let path = composer.academic_performance(&conn).expect("report");
        assert_eq!(
            path,
            dir.path().join("reports").join("academic_performance_report.pdf")
        );
        let bytes = std::fs::read(&path).expect("read pdf");
        assert!(bytes.starts_with(b"%PDF"));
        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("reports"))
            .expect("dir")
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().map(|x| x == "tmp").unwrap_or(false))
            .collect();
        assert!(leftovers.is_empty());
    }
}
