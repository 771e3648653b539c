//! PDF rendering backend: consumes a composed report context and returns
//! the document bytes. Layout is cursor-based with page breaks; built-in
//! Helvetica/Courier faces keep the output self-contained.

use printpdf::image_crate::codecs::jpeg::JpegDecoder;
use printpdf::image_crate::codecs::png::PngDecoder;
use printpdf::{
    BuiltinFont, Image, ImageTransform, IndirectFontRef, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference,
};
use std::io::Cursor;

use crate::error::{DomainError, DomainResult};
use crate::report::{AcademicReportContext, StudentProfileContext};

const PAGE_W: f64 = 210.0;
const PAGE_H: f64 = 297.0;
const MARGIN: f64 = 18.0;

fn render_err(e: impl std::fmt::Display) -> DomainError {
    DomainError::render(format!("PDF encoding failed: {}", e))
}

fn image_from_png(png: &[u8]) -> DomainResult<Image> {
    let decoder = PngDecoder::new(Cursor::new(png)).map_err(render_err)?;
    Image::try_from(decoder).map_err(render_err)
}

fn image_from_jpeg(jpeg: &[u8]) -> DomainResult<Image> {
    let decoder = JpegDecoder::new(Cursor::new(jpeg)).map_err(render_err)?;
    Image::try_from(decoder).map_err(render_err)
}

struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    y: f64,
    font: IndirectFontRef,
    bold: IndirectFontRef,
    mono: IndirectFontRef,
}

impl PageWriter {
    fn new(title: &str) -> DomainResult<Self> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_W as f32), Mm(PAGE_H as f32), "content");
        let font = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(render_err)?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(render_err)?;
        let mono = doc.add_builtin_font(BuiltinFont::Courier).map_err(render_err)?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            layer,
            y: PAGE_H - MARGIN,
            font,
            bold,
            mono,
        })
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(PAGE_W as f32), Mm(PAGE_H as f32), "content");
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_H - MARGIN;
    }

    fn ensure_room(&mut self, needed_mm: f64) {
        if self.y - needed_mm < MARGIN {
            self.new_page();
        }
    }

    fn heading(&mut self, text: &str, size: f64) {
        self.ensure_room(size * 0.6 + 2.0);
        self.y -= size * 0.45;
        self.layer
            .use_text(text, size as f32, Mm(MARGIN as f32), Mm(self.y as f32), &self.bold);
        self.y -= 3.0;
    }

    fn line(&mut self, text: &str, size: f64) {
        self.text_line(text, size, false)
    }

    fn mono_line(&mut self, text: &str, size: f64) {
        self.ensure_room(size * 0.5 + 1.0);
        self.y -= size * 0.42;
        self.layer
            .use_text(text, size as f32, Mm(MARGIN as f32), Mm(self.y as f32), &self.mono);
        self.y -= 1.2;
    }

    fn text_line(&mut self, text: &str, size: f64, bold: bool) {
        self.ensure_room(size * 0.5 + 1.0);
        self.y -= size * 0.42;
        let font = if bold { &self.bold } else { &self.font };
        self.layer
            .use_text(text, size as f32, Mm(MARGIN as f32), Mm(self.y as f32), font);
        self.y -= 1.5;
    }

    fn gap(&mut self, mm: f64) {
        self.y -= mm;
    }

    /// Place an image left-aligned at the cursor, scaled to `width_mm`.
    fn place_image(&mut self, image: Image, width_mm: f64) {
        let px_w = image.image.width.0 as f64;
        let px_h = image.image.height.0 as f64;
        if px_w <= 0.0 || px_h <= 0.0 {
            return;
        }
        let dpi = px_w * 25.4 / width_mm;
        let height_mm = px_h * 25.4 / dpi;
        self.ensure_room(height_mm + 2.0);
        let bottom = self.y - height_mm;
        image.add_to_layer(
            self.layer.clone(),
            ImageTransform {
                translate_x: Some(Mm(MARGIN as f32)),
                translate_y: Some(Mm(bottom as f32)),
                dpi: Some(dpi as f32),
                ..Default::default()
            },
        );
        self.y = bottom - 4.0;
    }

    fn finish(self) -> DomainResult<Vec<u8>> {
        self.doc.save_to_bytes().map_err(render_err)
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

pub fn render_student_profile(ctx: &StudentProfileContext) -> DomainResult<Vec<u8>> {
    let mut page = PageWriter::new("Student Profile Report")?;

    page.heading(&ctx.university.university_name, 20.0);
    page.line(&format!("Student Profile Report - {}", ctx.report_date), 12.0);
    page.gap(4.0);

    let photo = image_from_jpeg(&ctx.photo_jpeg)?;
    page.place_image(photo, 28.0);

    page.text_line(&ctx.student_name, 15.0, true);
    page.line(&format!("Student ID: {}", ctx.student_id), 11.0);
    if let Some(email) = &ctx.email {
        page.line(&format!("Email: {}", email), 11.0);
    }
    if let Some(dob) = &ctx.date_of_birth {
        page.line(&format!("Date of birth: {}", dob), 11.0);
    }
    if let Some(year) = &ctx.academic_year {
        page.line(&format!("Academic year: {}", year), 11.0);
    }
    page.gap(3.0);

    page.text_line("Subjects", 13.0, true);
    if ctx.subjects.is_empty() {
        page.line("No graded subjects on record.", 11.0);
    }
    for subject in &ctx.subjects {
        let department = subject.department.as_deref().unwrap_or("-");
        page.line(&format!("- {} ({})", subject.subject_name, department), 11.0);
    }
    page.gap(4.0);

    page.text_line("Achievements", 13.0, true);
    let chart = image_from_png(&ctx.chart_png)?;
    page.place_image(chart, PAGE_W - 2.0 * MARGIN);

    page.finish()
}

pub fn render_academic_performance(ctx: &AcademicReportContext) -> DomainResult<Vec<u8>> {
    let mut page = PageWriter::new("Academic Performance Report")?;

    page.heading(&ctx.university.university_name, 20.0);
    page.line(&format!("Academic Performance Report - {}", ctx.report_date), 12.0);
    page.gap(4.0);

    let s = &ctx.summary;
    page.line(&format!("Total graded exams: {}", s.total_grades), 11.0);
    page.line(
        &format!("Students passing (avg >= 40%): {:.2}%", s.pass_rate_percentage),
        11.0,
    );
    page.line(
        &format!("High achievers (avg >= 75%): {:.2}%", s.high_achiever_percentage),
        11.0,
    );
    page.gap(4.0);

    page.text_line("Top Students", 13.0, true);
    let top = ctx.leaderboard.len();
    if top > 0 {
        page.ensure_room(46.0);
        let row_top = page.y;
        for (i, entry) in ctx.leaderboard.iter().enumerate() {
            let x = MARGIN + (i as f64) * 60.0;
            let image = image_from_jpeg(&entry.photo_jpeg)?;
            let px_w = image.image.width.0 as f64;
            let px_h = image.image.height.0 as f64;
            if px_w > 0.0 && px_h > 0.0 {
                let dpi = px_w * 25.4 / 26.0;
                let height_mm = px_h * 25.4 / dpi;
                image.add_to_layer(
                    page.layer.clone(),
                    ImageTransform {
                        translate_x: Some(Mm(x as f32)),
                        translate_y: Some(Mm((row_top - height_mm) as f32)),
                        dpi: Some(dpi as f32),
                        ..Default::default()
                    },
                );
            }
            let name = format!(
                "{}. {} {}",
                entry.rank, entry.student.first_name, entry.student.last_name
            );
            page.layer
                .use_text(name, 11.0, Mm(x as f32), Mm((row_top - 31.0) as f32), &page.bold);
            page.layer.use_text(
                format!("avg {:.2}%", entry.student.average_percentage),
                10.0,
                Mm(x as f32),
                Mm((row_top - 36.0) as f32),
                &page.font,
            );
        }
        page.y = row_top - 42.0;
    } else {
        page.line("No graded students yet.", 11.0);
    }
    page.gap(4.0);

    page.text_line("Performance Overview", 13.0, true);
    let chart = image_from_png(&ctx.chart_png)?;
    page.place_image(chart, PAGE_W - 2.0 * MARGIN);

    page.gap(2.0);
    page.text_line("Distribution by Subject", 13.0, true);
    page.mono_line(
        &format!(
            "{:<18} {:<12} {:>7} {:>7} {:>7} {:>6} {:>7} {:>7}",
            "Subject", "Department", "Avg", "Min", "Max", "Exams", "Pass%", "StdDev"
        ),
        9.0,
    );
    for d in &ctx.distribution {
        page.mono_line(
            &format!(
                "{:<18} {:<12} {:>7.2} {:>7.2} {:>7.2} {:>6} {:>7.2} {:>7.2}",
                truncate(&d.subject_name, 18),
                truncate(d.department.as_deref().unwrap_or("-"), 12),
                d.average_marks,
                d.min_marks,
                d.max_marks,
                d.total_exams,
                d.pass_percentage,
                d.marks_standard_deviation
            ),
            9.0,
        );
    }

    page.finish()
}
