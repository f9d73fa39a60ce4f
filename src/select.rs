use std::fmt::{self, Write as _};
use std::str::FromStr;

use tracing::{debug, info, warn};

use crate::chart::{self, ChartSpec};
use crate::error::ExportError;
use crate::models::{
    AttendanceBreakdown, AttendanceSummary, BufferCount, BufferKind, BufferSummary, EmployeeTable,
    MonthlySummary, OverallSummary, VideoMetric, VideoSummary, VideoTable, WeeklySummary,
};
use crate::normalize::normalize_videos;
use crate::reports::{self, Availability, TargetPolicy};
use crate::table::RawTable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportMode {
    Weekly,
    Monthly,
    Overall,
    Attendance,
    Buffer,
    Video,
}

impl ReportMode {
    pub const ALL: [ReportMode; 6] = [
        ReportMode::Weekly,
        ReportMode::Monthly,
        ReportMode::Overall,
        ReportMode::Attendance,
        ReportMode::Buffer,
        ReportMode::Video,
    ];

    pub fn key(self) -> &'static str {
        match self {
            ReportMode::Weekly => "weekly",
            ReportMode::Monthly => "monthly",
            ReportMode::Overall => "overall",
            ReportMode::Attendance => "attendance",
            ReportMode::Buffer => "buffer",
            ReportMode::Video => "video",
        }
    }

    /// Menu label shown to users.
    pub fn label(self) -> &'static str {
        match self {
            ReportMode::Weekly => "Weekly Performance",
            ReportMode::Monthly => "Monthly Performance",
            ReportMode::Overall => "Overall Statistics",
            ReportMode::Attendance => "Attendance",
            ReportMode::Buffer => "PPT, Illustration & AE Buffer",
            ReportMode::Video => "Video Duration",
        }
    }

    /// Fixed download name for reports that offer a CSV export.
    pub fn export_name(self) -> Option<&'static str> {
        match self {
            ReportMode::Weekly => Some("weekly_summary.csv"),
            ReportMode::Monthly => Some("monthly_summary.csv"),
            ReportMode::Overall => Some("overall_summary.csv"),
            _ => None,
        }
    }
}

impl fmt::Display for ReportMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ReportMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        ReportMode::ALL
            .into_iter()
            .find(|mode| {
                mode.key().eq_ignore_ascii_case(wanted) || mode.label().eq_ignore_ascii_case(wanted)
            })
            .ok_or_else(|| {
                let known: Vec<&str> = ReportMode::ALL.iter().map(|m| m.key()).collect();
                format!("unknown report mode '{wanted}' (expected one of: {})", known.join(", "))
            })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SummaryTable {
    Weekly(Vec<WeeklySummary>),
    Monthly(Vec<MonthlySummary>),
    Overall(Vec<OverallSummary>),
    Attendance(Vec<AttendanceSummary>),
    Buffer(Vec<BufferSummary>),
    Video(Vec<VideoSummary>),
}

fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.2}")
    }
}

/// Whole numbers without a fraction, everything else at full precision.
fn export_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        value.to_string()
    }
}

impl SummaryTable {
    pub fn len(&self) -> usize {
        match self {
            SummaryTable::Weekly(rows) => rows.len(),
            SummaryTable::Monthly(rows) => rows.len(),
            SummaryTable::Overall(rows) => rows.len(),
            SummaryTable::Attendance(rows) => rows.len(),
            SummaryTable::Buffer(rows) => rows.len(),
            SummaryTable::Video(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn headers(&self) -> &'static [&'static str] {
        match self {
            SummaryTable::Weekly(_) => &[
                "name",
                "week_number",
                "total_work_days",
                "total_leave_days",
                "ppt_count",
                "weekly_target",
                "target_met",
            ],
            SummaryTable::Monthly(_) => &[
                "name",
                "month",
                "month_number",
                "total_work_days",
                "total_leave_days",
                "ppt_count",
                "unique_weeks",
                "monthly_target",
                "target_met",
            ],
            SummaryTable::Overall(_) => &["name", "total_work_days", "total_leave_days", "total_ppt_count"],
            SummaryTable::Attendance(_) => &[
                "name",
                "month",
                "total_days",
                "present_days",
                "leave_days",
                "absent_days",
            ],
            SummaryTable::Buffer(_) => &[
                "name",
                "ppt's_buffer",
                "lab_ppt's_buffer",
                "illu_buffer",
                "ae_buffer",
            ],
            SummaryTable::Video(_) => &["name", "total_minutes", "target_minutes", "target_met"],
        }
    }

    /// Header line plus one delimited line per row.
    pub fn to_csv(&self) -> Result<String, ExportError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(self.headers())?;
        for row in self.cells(export_number) {
            writer.write_record(&row)?;
        }
        writer.flush()?;
        let bytes = writer.into_inner().map_err(|e| e.into_error())?;
        Ok(String::from_utf8(bytes)?)
    }

    fn cells(&self, n: fn(f64) -> String) -> Vec<Vec<String>> {
        match self {
            SummaryTable::Weekly(rows) => rows
                .iter()
                .map(|r| {
                    vec![
                        r.name.clone(),
                        r.week_number.to_string(),
                        n(r.total_work_days),
                        n(r.total_leave_days),
                        r.ppt_count.to_string(),
                        r.weekly_target.to_string(),
                        r.target_met.to_string(),
                    ]
                })
                .collect(),
            SummaryTable::Monthly(rows) => rows
                .iter()
                .map(|r| {
                    vec![
                        r.name.clone(),
                        r.month.clone(),
                        r.month_number.to_string(),
                        n(r.total_work_days),
                        n(r.total_leave_days),
                        r.ppt_count.to_string(),
                        r.unique_weeks.to_string(),
                        r.monthly_target.to_string(),
                        r.target_met.to_string(),
                    ]
                })
                .collect(),
            SummaryTable::Overall(rows) => rows
                .iter()
                .map(|r| {
                    vec![
                        r.name.clone(),
                        n(r.total_work_days),
                        n(r.total_leave_days),
                        r.total_ppt_count.to_string(),
                    ]
                })
                .collect(),
            SummaryTable::Attendance(rows) => rows
                .iter()
                .map(|r| {
                    vec![
                        r.name.clone(),
                        r.month.clone(),
                        r.total_days.to_string(),
                        n(r.present_days),
                        n(r.leave_days),
                        n(r.absent_days),
                    ]
                })
                .collect(),
            SummaryTable::Buffer(rows) => rows
                .iter()
                .map(|r| {
                    let mut cells = vec![r.name.clone()];
                    cells.extend(BufferKind::ALL.into_iter().map(|kind| n(r.count(kind))));
                    cells
                })
                .collect(),
            SummaryTable::Video(rows) => rows
                .iter()
                .map(|r| {
                    vec![
                        r.name.clone(),
                        n(r.total_minutes),
                        n(r.target_minutes),
                        r.target_met.to_string(),
                    ]
                })
                .collect(),
        }
    }

    /// Column-aligned plain text for terminals.
    pub fn render_text(&self) -> String {
        let headers = self.headers();
        let cells = self.cells(format_number);

        let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
        for row in &cells {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(cell.chars().count());
            }
        }

        let mut output = String::new();
        let line = |output: &mut String, row: Vec<&str>| {
            let padded: Vec<String> = row
                .iter()
                .zip(&widths)
                .map(|(cell, width)| format!("{cell:<width$}", width = *width))
                .collect();
            let _ = writeln!(output, "{}", padded.join("  ").trim_end());
        };

        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        line(&mut output, headers.to_vec());
        line(&mut output, rule.iter().map(String::as_str).collect());
        for row in &cells {
            line(&mut output, row.iter().map(String::as_str).collect());
        }
        output
    }
}

/// Per-person detail view for attendance and video.
#[derive(Debug, Clone, PartialEq)]
pub enum DrillDown {
    Attendance {
        breakdown: AttendanceBreakdown,
        chart: ChartSpec,
    },
    Video(VideoMetric),
}

impl DrillDown {
    pub fn describe(&self) -> String {
        match self {
            DrillDown::Attendance { breakdown, .. } => {
                let mut output = format!("Attendance for {} ({})", breakdown.name, breakdown.month);
                for (status, days) in breakdown.slices() {
                    let _ = write!(output, "\n- {status}: {}", format_number(days));
                }
                output
            }
            DrillDown::Video(metric) => format!(
                "Video Duration for {}: {:.1} mins ({:+.1} mins from target)",
                metric.name, metric.total_minutes, metric.delta_from_target
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub mode: ReportMode,
    pub table: SummaryTable,
    /// Chart for the whole table; `None` when the chart depends on a selected person.
    pub chart: Option<ChartSpec>,
    pub export_name: Option<&'static str>,
}

impl Report {
    fn new(mode: ReportMode, table: SummaryTable, chart: Option<ChartSpec>) -> Self {
        Self {
            mode,
            table,
            chart,
            export_name: mode.export_name(),
        }
    }

    /// Long-form rows the chart encodes when they differ from the table rows.
    pub fn chart_rows(&self) -> Option<Vec<BufferCount>> {
        match &self.table {
            SummaryTable::Buffer(rows) => Some(reports::melt_buffers(rows)),
            _ => None,
        }
    }

    /// Names offered by the drill-down selector.
    pub fn people(&self) -> Vec<String> {
        match &self.table {
            SummaryTable::Attendance(rows) => reports::names(rows.iter().map(|r| r.name.as_str())),
            SummaryTable::Video(rows) => reports::names(rows.iter().map(|r| r.name.as_str())),
            _ => Vec::new(),
        }
    }

    pub fn drill_down(&self, name: &str) -> Option<DrillDown> {
        match &self.table {
            SummaryTable::Attendance(rows) => {
                reports::attendance_breakdown(rows, name).map(|breakdown| DrillDown::Attendance {
                    chart: chart::attendance_chart(&breakdown),
                    breakdown,
                })
            }
            SummaryTable::Video(rows) => reports::video_metric(rows, name).map(DrillDown::Video),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReportView {
    Ready(Report),
    /// An optional feature's inputs are absent; other reports are unaffected.
    Unavailable(String),
    AwaitingInput(String),
}

pub fn select(
    mode: ReportMode,
    employees: &EmployeeTable,
    videos: Option<&VideoTable>,
    policy: &TargetPolicy,
) -> ReportView {
    debug!(%mode, records = employees.records.len(), "selecting report");
    let records = &employees.records;

    let report = match mode {
        ReportMode::Weekly => Report::new(
            mode,
            SummaryTable::Weekly(reports::weekly_summary(records, policy)),
            Some(chart::weekly_chart()),
        ),
        ReportMode::Monthly => Report::new(
            mode,
            SummaryTable::Monthly(reports::monthly_summary(records, policy)),
            Some(chart::monthly_chart()),
        ),
        ReportMode::Overall => Report::new(
            mode,
            SummaryTable::Overall(reports::overall_summary(records)),
            Some(chart::overall_chart()),
        ),
        ReportMode::Attendance => Report::new(
            mode,
            SummaryTable::Attendance(reports::attendance_summary(records)),
            None,
        ),
        ReportMode::Buffer => match reports::buffer_summary(employees) {
            Availability::Available(rows) => {
                let types = BufferKind::ALL.into_iter().map(BufferKind::label).collect();
                Report::new(mode, SummaryTable::Buffer(rows), Some(chart::buffer_chart(types)))
            }
            Availability::Unavailable(reason) => return ReportView::Unavailable(reason),
        },
        ReportMode::Video => {
            let Some(videos) = videos else {
                info!("video report awaiting upload");
                return ReportView::AwaitingInput(
                    "Upload a video duration file to view this section.".to_string(),
                );
            };
            Report::new(
                mode,
                SummaryTable::Video(reports::video_summary(&videos.records, policy)),
                Some(chart::video_chart()),
            )
        }
    };

    ReportView::Ready(report)
}

/// Like [`select`], but takes the video upload before normalization and only
/// normalizes it for the video report. A malformed video table makes that one
/// view unavailable and leaves every other report untouched.
pub fn select_with_video_upload(
    mode: ReportMode,
    employees: &EmployeeTable,
    video_upload: Option<&RawTable>,
    policy: &TargetPolicy,
) -> ReportView {
    if mode != ReportMode::Video {
        return select(mode, employees, None, policy);
    }

    match video_upload.map(normalize_videos).transpose() {
        Ok(videos) => select(mode, employees, videos.as_ref(), policy),
        Err(err) => {
            warn!(%err, "video upload rejected");
            ReportView::Unavailable(format!(
                "Video file must contain 'name' and 'video_duration' columns ({err})."
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ColorRule;
    use crate::models::{ActivityRecord, VideoRecord};
    use chrono::NaiveDate;

    fn employees() -> EmployeeTable {
        let date = |d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap();
        EmployeeTable {
            records: vec![
                ActivityRecord::new("Alice", "Ownership", date(15), None, 1.0, 0.0),
                ActivityRecord::new("Alice", "Borrowing", date(16), None, 1.0, 0.0),
                ActivityRecord::new("Bob", "Traits", date(17), None, 0.0, 1.0),
            ],
            buffer_columns: Vec::new(),
            dropped_rows: 0,
        }
    }

    fn ready(view: ReportView) -> Report {
        match view {
            ReportView::Ready(report) => report,
            other => panic!("expected a ready report, got {other:?}"),
        }
    }

    #[test]
    fn parses_keys_and_menu_labels() {
        assert_eq!("weekly".parse::<ReportMode>().unwrap(), ReportMode::Weekly);
        assert_eq!("Overall Statistics".parse::<ReportMode>().unwrap(), ReportMode::Overall);
        assert_eq!(
            "PPT, Illustration & AE Buffer".parse::<ReportMode>().unwrap(),
            ReportMode::Buffer
        );
        assert!("daily".parse::<ReportMode>().is_err());
    }

    #[test]
    fn exports_have_fixed_names() {
        let policy = TargetPolicy::default();
        let table = employees();
        let expected = [
            (ReportMode::Weekly, Some("weekly_summary.csv")),
            (ReportMode::Monthly, Some("monthly_summary.csv")),
            (ReportMode::Overall, Some("overall_summary.csv")),
            (ReportMode::Attendance, None),
        ];
        for (mode, name) in expected {
            assert_eq!(ready(select(mode, &table, None, &policy)).export_name, name);
        }
    }

    #[test]
    fn weekly_csv_has_header_and_rows() {
        let report = ready(select(ReportMode::Weekly, &employees(), None, &TargetPolicy::default()));
        let csv = report.table.to_csv().unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "name,week_number,total_work_days,total_leave_days,ppt_count,weekly_target,target_met"
        );
        assert_eq!(lines[1], "Alice,3,2,0,2,6,false");
        assert_eq!(lines.len(), 3);
    }

    #[test]
    fn csv_keeps_fractions_at_full_precision() {
        let table = SummaryTable::Video(vec![VideoSummary {
            name: "Carol".to_string(),
            total_minutes: 60.75,
            target_minutes: 90.0,
            target_met: false,
        }]);
        let csv = table.to_csv().unwrap();
        assert_eq!(csv.lines().nth(1), Some("Carol,60.75,90,false"));
    }

    #[test]
    fn buffer_csv_keeps_apostrophe_headers() {
        let table = SummaryTable::Buffer(vec![BufferSummary {
            name: "Hal".to_string(),
            ppt_buffer: 1.0,
            lab_ppt_buffer: 0.0,
            illu_buffer: 2.0,
            ae_buffer: 3.0,
        }]);
        let csv = table.to_csv().unwrap();
        assert!(csv.starts_with("name,ppt's_buffer,lab_ppt's_buffer,illu_buffer,ae_buffer\n"));
    }

    #[test]
    fn buffer_chart_fields_exist_in_chart_rows() {
        let mut table = employees();
        table.buffer_columns = BufferKind::ALL.to_vec();
        table.records = table
            .records
            .into_iter()
            .map(|record| {
                BufferKind::ALL
                    .into_iter()
                    .fold(record, |record, kind| record.with_buffer(kind, 1.0))
            })
            .collect();

        let report = ready(select(ReportMode::Buffer, &table, None, &TargetPolicy::default()));
        let chart = report.chart.clone().unwrap();
        let rows = report.chart_rows().unwrap();
        assert_eq!(rows.len(), 2 * BufferKind::ALL.len());
        assert_eq!(rows[0].name, "Alice");
        assert_eq!(rows[0].count, 2.0);

        let first = serde_json::to_value(&rows[0]).unwrap();
        let y_field = chart.y.split(':').next().unwrap();
        let x_field = chart.x.split(':').next().unwrap();
        assert!(first.get(y_field).is_some(), "missing {y_field}");
        assert!(first.get(x_field).is_some(), "missing {x_field}");
        let ColorRule::Categorical { field, categories } = chart.color else {
            panic!("buffer colours are categorical");
        };
        assert!(first.get(field.as_str()).is_some(), "missing {field}");
        for row in &rows {
            assert!(categories.contains(&row.buffer_type));
        }
    }

    #[test]
    fn only_buffer_reports_have_separate_chart_rows() {
        let report = ready(select(ReportMode::Weekly, &employees(), None, &TargetPolicy::default()));
        assert!(report.chart_rows().is_none());
    }

    #[test]
    fn bad_video_upload_only_affects_video_report() {
        let bad = RawTable::new(vec!["name".to_string()], vec![vec!["Carol".to_string()]]);
        let policy = TargetPolicy::default();

        for mode in [ReportMode::Weekly, ReportMode::Monthly, ReportMode::Overall, ReportMode::Attendance] {
            let view = select_with_video_upload(mode, &employees(), Some(&bad), &policy);
            assert!(matches!(view, ReportView::Ready(_)), "{mode} should not depend on videos");
        }

        let view = select_with_video_upload(ReportMode::Video, &employees(), Some(&bad), &policy);
        let ReportView::Unavailable(reason) = view else {
            panic!("malformed video upload should make the video view unavailable");
        };
        assert!(reason.contains("video_duration"));

        let view = select_with_video_upload(ReportMode::Video, &employees(), None, &policy);
        assert!(matches!(view, ReportView::AwaitingInput(_)));

        let good = RawTable::new(
            vec!["Name".to_string(), "Video Duration".to_string()],
            vec![vec!["Carol".to_string(), "1:30:00".to_string()]],
        );
        let report = ready(select_with_video_upload(ReportMode::Video, &employees(), Some(&good), &policy));
        assert_eq!(report.people(), vec!["Carol"]);
    }

    #[test]
    fn buffer_without_columns_is_unavailable() {
        let view = select(ReportMode::Buffer, &employees(), None, &TargetPolicy::default());
        assert!(matches!(view, ReportView::Unavailable(_)));
    }

    #[test]
    fn video_waits_for_upload() {
        let view = select(ReportMode::Video, &employees(), None, &TargetPolicy::default());
        assert!(matches!(view, ReportView::AwaitingInput(_)));

        let videos = VideoTable {
            records: vec![VideoRecord {
                name: "Carol".to_string(),
                video_duration: "1:30:00".to_string(),
                total_minutes: 90.0,
            }],
            dropped_rows: 0,
        };
        let report = ready(select(
            ReportMode::Video,
            &employees(),
            Some(&videos),
            &TargetPolicy::default(),
        ));
        assert_eq!(report.people(), vec!["Carol"]);
        let Some(DrillDown::Video(metric)) = report.drill_down("Carol") else {
            panic!("expected video drill-down");
        };
        assert_eq!(metric.delta_from_target, 0.0);
    }

    #[test]
    fn attendance_drill_down_carries_arc_chart() {
        let report = ready(select(ReportMode::Attendance, &employees(), None, &TargetPolicy::default()));
        assert!(report.chart.is_none());
        assert_eq!(report.people(), vec!["Alice", "Bob"]);

        let Some(DrillDown::Attendance { breakdown, chart }) = report.drill_down("Bob") else {
            panic!("expected attendance drill-down");
        };
        assert_eq!(breakdown.present, 0.0);
        assert_eq!(breakdown.absent, 1.0);
        assert_eq!(breakdown.leave, 1.0);
        assert_eq!(chart.title, "Attendance for Bob");
        assert!(report.drill_down("Nobody").is_none());
    }

    #[test]
    fn renders_aligned_text() {
        let report = ready(select(ReportMode::Overall, &employees(), None, &TargetPolicy::default()));
        let text = report.table.render_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("name   total_work_days"));
        assert!(lines[2].starts_with("Alice  2"));
    }
}
