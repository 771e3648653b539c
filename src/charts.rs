use anyhow::Context as _;
use plotters::coord::Shift;
use plotters::element::Pie;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use crate::error::{DomainError, DomainResult};
use crate::query::GradeDetailRow;
use crate::stats::{BandCount, InstitutionSummary, LabelMean, MonthlyPoint};

const WIDTH: u32 = 1500;
const HEIGHT: u32 = 1000;

const PIE_COLORS: &[RGBColor] = &[
    RGBColor(31, 119, 180),
    RGBColor(255, 127, 14),
    RGBColor(44, 160, 44),
    RGBColor(214, 39, 40),
    RGBColor(148, 103, 189),
    RGBColor(140, 86, 75),
    RGBColor(227, 119, 194),
    RGBColor(127, 127, 127),
];

type Area<'a> = DrawingArea<BitMapBackend<'a>, Shift>;

/// Student report grid: grouped bars, achievement trend, radar polygon
/// and an overall-achievement pie. Regenerated on every call.
pub fn student_chart_png(rows: &[GradeDetailRow]) -> DomainResult<Vec<u8>> {
    render(|root| {
        let areas = root.split_evenly((2, 2));
        draw_marks_by_subject(&areas[0], rows)?;
        draw_trend(&areas[1], rows)?;
        draw_radar(&areas[2], rows)?;
        draw_achievement_pie(&areas[3], rows)?;
        Ok(())
    })
}

/// Institution report grid: band histogram, monthly trend with a one
/// sigma band, per-subject means and a per-department pie.
pub fn institution_chart_png(summary: &InstitutionSummary) -> DomainResult<Vec<u8>> {
    render(|root| {
        let areas = root.split_evenly((2, 2));
        draw_band_histogram(&areas[0], &summary.grade_bands)?;
        draw_monthly_trend(&areas[1], &summary.monthly)?;
        draw_label_means(&areas[2], "Average Achievement by Subject", &summary.per_subject)?;
        draw_department_pie(&areas[3], &summary.per_department)?;
        Ok(())
    })
}

fn render<F>(draw: F) -> DomainResult<Vec<u8>>
where
    F: FnOnce(&Area<'_>) -> anyhow::Result<()>,
{
    let mut buf = vec![0u8; (WIDTH * HEIGHT * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buf, (WIDTH, HEIGHT)).into_drawing_area();
        (|| -> anyhow::Result<()> {
            root.fill(&WHITE)?;
            draw(&root)?;
            root.present()?;
            Ok(())
        })()
        .map_err(|e| DomainError::render(format!("chart rendering failed: {e}")))?;
    }
    encode_png(WIDTH, HEIGHT, &buf).map_err(|e| DomainError::render(format!("PNG encode failed: {e}")))
}

fn encode_png(width: u32, height: u32, rgb: &[u8]) -> anyhow::Result<Vec<u8>> {
    let img = image::RgbImage::from_raw(width, height, rgb.to_vec())
        .context("pixel buffer size mismatch")?;
    let mut out = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut std::io::Cursor::new(&mut out), image::ImageOutputFormat::Png)?;
    Ok(out)
}

/// Per-subject mean obtained and maximum marks, first-seen order.
fn subject_means(rows: &[GradeDetailRow]) -> Vec<(String, f64, f64)> {
    let mut order: Vec<String> = Vec::new();
    let mut sums: std::collections::HashMap<&str, (f64, f64, usize)> =
        std::collections::HashMap::new();
    for row in rows {
        if !sums.contains_key(row.subject_name.as_str()) {
            order.push(row.subject_name.clone());
        }
        let entry = sums.entry(row.subject_name.as_str()).or_insert((0.0, 0.0, 0));
        entry.0 += row.student_marks;
        entry.1 += row.max_marks;
        entry.2 += 1;
    }
    order
        .iter()
        .map(|name| {
            let (marks, max, n) = sums[name.as_str()];
            (name.clone(), marks / n as f64, max / n as f64)
        })
        .collect()
}

fn achievement_percent(row: &GradeDetailRow) -> f64 {
    if row.max_marks > 0.0 {
        row.student_marks * 100.0 / row.max_marks
    } else {
        0.0
    }
}

fn index_label(names: &[String], x: &f64) -> String {
    let rounded = x.round();
    if (x - rounded).abs() > 0.01 || rounded < 0.0 {
        return String::new();
    }
    names.get(rounded as usize).cloned().unwrap_or_default()
}

fn draw_marks_by_subject(area: &Area<'_>, rows: &[GradeDetailRow]) -> anyhow::Result<()> {
    let subjects = subject_means(rows);
    let names: Vec<String> = subjects.iter().map(|s| s.0.clone()).collect();
    let n = subjects.len().max(1);
    let y_max = subjects
        .iter()
        .map(|s| s.1.max(s.2))
        .fold(1.0f64, f64::max)
        * 1.15;

    let mut chart = ChartBuilder::on(area)
        .caption("Grades by Subject", ("sans-serif", 24))
        .margin(12)
        .x_label_area_size(32)
        .y_label_area_size(48)
        .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), 0f64..y_max)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&|x| index_label(&names, x))
        .y_desc("Marks")
        .draw()?;

    chart
        .draw_series(subjects.iter().enumerate().map(|(i, s)| {
            Rectangle::new(
                [(i as f64 - 0.32, 0.0), (i as f64 - 0.02, s.1)],
                BLUE.mix(0.85).filled(),
            )
        }))?
        .label("Obtained")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], BLUE.mix(0.85).filled()));
    chart
        .draw_series(subjects.iter().enumerate().map(|(i, s)| {
            Rectangle::new(
                [(i as f64 + 0.02, 0.0), (i as f64 + 0.32, s.2)],
                RED.mix(0.55).filled(),
            )
        }))?
        .label("Maximum")
        .legend(|(x, y)| Rectangle::new([(x, y - 5), (x + 12, y + 5)], RED.mix(0.55).filled()));

    chart
        .configure_series_labels()
        .border_style(BLACK)
        .background_style(WHITE.mix(0.85))
        .draw()?;
    Ok(())
}

fn draw_trend(area: &Area<'_>, rows: &[GradeDetailRow]) -> anyhow::Result<()> {
    let points: Vec<(f64, f64)> = rows
        .iter()
        .enumerate()
        .map(|(i, r)| (i as f64, achievement_percent(r)))
        .collect();
    let dates: Vec<String> = rows.iter().map(|r| r.exam_date.clone()).collect();
    let n = points.len().max(1);

    let mut chart = ChartBuilder::on(area)
        .caption("Grade Performance Trend", ("sans-serif", 24))
        .margin(12)
        .x_label_area_size(32)
        .y_label_area_size(48)
        .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), 0f64..110f64)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n.min(8))
        .x_label_formatter(&|x| index_label(&dates, x))
        .y_desc("Achievement (%)")
        .draw()?;

    chart.draw_series(LineSeries::new(points.clone(), BLUE.stroke_width(2)))?;
    chart.draw_series(points.iter().map(|p| Circle::new(*p, 4, BLUE.filled())))?;
    Ok(())
}

fn draw_radar(area: &Area<'_>, rows: &[GradeDetailRow]) -> anyhow::Result<()> {
    let subjects = subject_means(rows);
    let mut chart = ChartBuilder::on(area)
        .caption("Subject Performance Distribution", ("sans-serif", 24))
        .margin(12)
        .build_cartesian_2d(-1.6f64..1.6f64, -1.3f64..1.3f64)?;

    if subjects.is_empty() {
        return Ok(());
    }
    let scale = subjects.iter().map(|s| s.1).fold(1.0f64, f64::max);
    let n = subjects.len();
    let angle = |i: usize| (i as f64) * std::f64::consts::TAU / (n as f64) - std::f64::consts::FRAC_PI_2;

    let label_style = TextStyle::from(("sans-serif", 16).into_font())
        .pos(Pos::new(HPos::Center, VPos::Center));
    for (i, s) in subjects.iter().enumerate() {
        let a = angle(i);
        chart.draw_series(std::iter::once(PathElement::new(
            vec![(0.0, 0.0), (a.cos(), a.sin())],
            BLACK.mix(0.25),
        )))?;
        chart.draw_series(std::iter::once(Text::new(
            s.0.clone(),
            (1.15 * a.cos(), 1.12 * a.sin()),
            label_style.clone(),
        )))?;
    }

    let mut outline: Vec<(f64, f64)> = subjects
        .iter()
        .enumerate()
        .map(|(i, s)| {
            let a = angle(i);
            let r = s.1 / scale;
            (r * a.cos(), r * a.sin())
        })
        .collect();
    chart.draw_series(std::iter::once(Polygon::new(outline.clone(), BLUE.mix(0.25))))?;
    outline.push(outline[0]);
    chart.draw_series(std::iter::once(PathElement::new(outline, BLUE.stroke_width(2))))?;
    Ok(())
}

fn draw_achievement_pie(area: &Area<'_>, rows: &[GradeDetailRow]) -> anyhow::Result<()> {
    let achievement = if rows.is_empty() {
        0.0
    } else {
        rows.iter().map(achievement_percent).sum::<f64>() / rows.len() as f64
    };
    let achievement = achievement.clamp(0.0, 100.0);

    let titled = area.titled("Overall Exam Achievement", ("sans-serif", 24))?;
    let (w, h) = titled.dim_in_pixel();
    let center = ((w / 2) as i32, (h / 2) as i32);
    let radius = f64::from(w.min(h)) * 0.32;

    let fill = if achievement < 60.0 {
        RGBColor(255, 153, 153)
    } else if achievement < 80.0 {
        RGBColor(102, 179, 255)
    } else {
        RGBColor(153, 255, 153)
    };
    let sizes = vec![achievement, 100.0 - achievement];
    let colors = vec![fill, RGBColor(240, 240, 240)];
    let labels = vec![format!("{:.1}%", achievement), String::new()];

    let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
    pie.start_angle(90.0);
    pie.label_style(("sans-serif", 20).into_font().color(&BLACK));
    titled.draw(&pie)?;
    Ok(())
}

fn draw_band_histogram(area: &Area<'_>, bands: &[BandCount]) -> anyhow::Result<()> {
    let names: Vec<String> = bands.iter().map(|b| b.band.to_string()).collect();
    let n = bands.len().max(1);
    let y_max = bands.iter().map(|b| b.count).max().unwrap_or(1).max(1) as f64 * 1.2;

    let mut chart = ChartBuilder::on(area)
        .caption("Grade Band Distribution", ("sans-serif", 24))
        .margin(12)
        .x_label_area_size(32)
        .y_label_area_size(48)
        .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), 0f64..y_max)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&|x| index_label(&names, x))
        .y_desc("Grades")
        .draw()?;

    chart.draw_series(bands.iter().enumerate().map(|(i, b)| {
        Rectangle::new(
            [(i as f64 - 0.3, 0.0), (i as f64 + 0.3, b.count as f64)],
            BLUE.mix(0.8).filled(),
        )
    }))?;

    let value_style = TextStyle::from(("sans-serif", 16).into_font())
        .pos(Pos::new(HPos::Center, VPos::Bottom));
    chart.draw_series(bands.iter().enumerate().map(|(i, b)| {
        Text::new(
            b.count.to_string(),
            (i as f64, b.count as f64 + y_max * 0.02),
            value_style.clone(),
        )
    }))?;
    Ok(())
}

fn draw_monthly_trend(area: &Area<'_>, monthly: &[MonthlyPoint]) -> anyhow::Result<()> {
    let months: Vec<String> = monthly.iter().map(|m| m.month.clone()).collect();
    let n = monthly.len().max(1);

    let mut chart = ChartBuilder::on(area)
        .caption("Monthly Performance Trend", ("sans-serif", 24))
        .margin(12)
        .x_label_area_size(32)
        .y_label_area_size(48)
        .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), 0f64..110f64)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n.min(12))
        .x_label_formatter(&|x| index_label(&months, x))
        .y_desc("Mean Achievement (%)")
        .draw()?;

    if monthly.len() >= 2 {
        let mut band: Vec<(f64, f64)> = monthly
            .iter()
            .enumerate()
            .map(|(i, m)| (i as f64, (m.mean_percentage + m.std_percentage).min(110.0)))
            .collect();
        band.extend(
            monthly
                .iter()
                .enumerate()
                .rev()
                .map(|(i, m)| (i as f64, (m.mean_percentage - m.std_percentage).max(0.0))),
        );
        chart.draw_series(std::iter::once(Polygon::new(band, BLUE.mix(0.15))))?;
    }

    let points: Vec<(f64, f64)> = monthly
        .iter()
        .enumerate()
        .map(|(i, m)| (i as f64, m.mean_percentage))
        .collect();
    chart.draw_series(LineSeries::new(points.clone(), BLUE.stroke_width(2)))?;
    chart.draw_series(points.iter().map(|p| Circle::new(*p, 4, BLUE.filled())))?;

    let value_style = TextStyle::from(("sans-serif", 15).into_font())
        .pos(Pos::new(HPos::Center, VPos::Bottom));
    chart.draw_series(monthly.iter().enumerate().map(|(i, m)| {
        Text::new(
            format!("{:.1}", m.mean_percentage),
            (i as f64, m.mean_percentage + 3.0),
            value_style.clone(),
        )
    }))?;
    Ok(())
}

fn draw_label_means(area: &Area<'_>, title: &str, means: &[LabelMean]) -> anyhow::Result<()> {
    let names: Vec<String> = means.iter().map(|m| m.label.clone()).collect();
    let n = means.len().max(1);

    let mut chart = ChartBuilder::on(area)
        .caption(title, ("sans-serif", 24))
        .margin(12)
        .x_label_area_size(32)
        .y_label_area_size(48)
        .build_cartesian_2d(-0.5f64..(n as f64 - 0.5), 0f64..110f64)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(n)
        .x_label_formatter(&|x| index_label(&names, x))
        .y_desc("Mean Achievement (%)")
        .draw()?;

    chart.draw_series(means.iter().enumerate().map(|(i, m)| {
        Rectangle::new(
            [(i as f64 - 0.3, 0.0), (i as f64 + 0.3, m.mean_percentage.clamp(0.0, 110.0))],
            GREEN.mix(0.7).filled(),
        )
    }))?;
    Ok(())
}

fn draw_department_pie(area: &Area<'_>, departments: &[LabelMean]) -> anyhow::Result<()> {
    let titled = area.titled("Achievement Share by Department", ("sans-serif", 24))?;
    if departments.is_empty() {
        return Ok(());
    }
    let (w, h) = titled.dim_in_pixel();
    let center = ((w / 2) as i32, (h / 2) as i32);
    let radius = f64::from(w.min(h)) * 0.32;

    let sizes: Vec<f64> = departments
        .iter()
        .map(|d| d.mean_percentage.max(0.0))
        .collect();
    if sizes.iter().sum::<f64>() <= 0.0 {
        return Ok(());
    }
    let colors: Vec<RGBColor> = (0..departments.len())
        .map(|i| PIE_COLORS[i % PIE_COLORS.len()])
        .collect();
    let labels: Vec<String> = departments.iter().map(|d| d.label.clone()).collect();

    let mut pie = Pie::new(&center, &radius, &sizes, &colors, &labels);
    pie.label_style(("sans-serif", 18).into_font().color(&BLACK));
    titled.draw(&pie)?;
    Ok(())
}
