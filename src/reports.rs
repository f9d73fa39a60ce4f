use tracing::{debug, warn};

use crate::aggregate::{group_by, Metric};
use crate::models::{
    ActivityRecord, AttendanceBreakdown, AttendanceSummary, BufferCount, BufferKind,
    BufferSummary, EmployeeTable, MonthlySummary, OverallSummary, VideoMetric, VideoRecord,
    VideoSummary, WeeklySummary,
};

/// Thresholds for the target-bearing reports.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetPolicy {
    /// Distinct topics expected per active week.
    pub weekly_topics: usize,
    pub video_minutes: f64,
}

impl Default for TargetPolicy {
    fn default() -> Self {
        Self {
            weekly_topics: 6,
            video_minutes: 90.0,
        }
    }
}

impl TargetPolicy {
    /// Monthly target scales with the number of distinct weeks worked.
    pub fn monthly_topics(&self, unique_weeks: usize) -> usize {
        unique_weeks.saturating_mul(self.weekly_topics)
    }
}

/// Outcome of a capability check for an optional report.
#[derive(Debug, Clone, PartialEq)]
pub enum Availability<T> {
    Available(T),
    Unavailable(String),
}

const WEEKLY_METRICS: [Metric; 3] = [
    Metric::sum("work_days", "total_work_days"),
    Metric::sum("leave_days", "total_leave_days"),
    Metric::count_distinct("topic", "ppt_count"),
];

const MONTHLY_METRICS: [Metric; 4] = [
    Metric::sum("work_days", "total_work_days"),
    Metric::sum("leave_days", "total_leave_days"),
    Metric::count_distinct("topic", "ppt_count"),
    Metric::count_distinct("week_number", "unique_weeks"),
];

const OVERALL_METRICS: [Metric; 3] = [
    Metric::sum("work_days", "total_work_days"),
    Metric::sum("leave_days", "total_leave_days"),
    Metric::count_distinct("topic", "total_ppt_count"),
];

const ATTENDANCE_METRICS: [Metric; 3] = [
    Metric::count("start_date", "total_days"),
    Metric::sum("work_days", "present_days"),
    Metric::sum("leave_days", "leave_days"),
];

const BUFFER_METRICS: [Metric; 4] = [
    Metric::sum("ppt's_buffer", "ppt's_buffer"),
    Metric::sum("lab_ppt's_buffer", "lab_ppt's_buffer"),
    Metric::sum("illu_buffer", "illu_buffer"),
    Metric::sum("ae_buffer", "ae_buffer"),
];

const VIDEO_METRICS: [Metric; 1] = [Metric::sum("total_minutes", "total_minutes")];

pub fn weekly_summary(records: &[ActivityRecord], policy: &TargetPolicy) -> Vec<WeeklySummary> {
    let rows: Vec<WeeklySummary> = group_by(
        records,
        |r| (r.name.clone(), r.week_number),
        &WEEKLY_METRICS,
    )
    .into_iter()
    .map(|group| {
        let ppt_count = group.count("ppt_count");
        WeeklySummary {
            total_work_days: group.value("total_work_days"),
            total_leave_days: group.value("total_leave_days"),
            ppt_count,
            weekly_target: policy.weekly_topics,
            target_met: ppt_count >= policy.weekly_topics,
            name: group.key.0,
            week_number: group.key.1,
        }
    })
    .collect();

    debug!(rows = rows.len(), "weekly summary");
    rows
}

pub fn monthly_summary(records: &[ActivityRecord], policy: &TargetPolicy) -> Vec<MonthlySummary> {
    let rows: Vec<MonthlySummary> = group_by(
        records,
        |r| (r.name.clone(), r.month_name, r.month_number),
        &MONTHLY_METRICS,
    )
    .into_iter()
    .map(|group| {
        let ppt_count = group.count("ppt_count");
        let unique_weeks = group.count("unique_weeks");
        let monthly_target = policy.monthly_topics(unique_weeks);
        MonthlySummary {
            total_work_days: group.value("total_work_days"),
            total_leave_days: group.value("total_leave_days"),
            ppt_count,
            unique_weeks,
            monthly_target,
            target_met: ppt_count >= monthly_target,
            name: group.key.0,
            month: group.key.1.to_string(),
            month_number: group.key.2,
        }
    })
    .collect();

    debug!(rows = rows.len(), "monthly summary");
    rows
}

pub fn overall_summary(records: &[ActivityRecord]) -> Vec<OverallSummary> {
    group_by(records, |r| r.name.clone(), &OVERALL_METRICS)
        .into_iter()
        .map(|group| OverallSummary {
            total_work_days: group.value("total_work_days"),
            total_leave_days: group.value("total_leave_days"),
            total_ppt_count: group.count("total_ppt_count"),
            name: group.key,
        })
        .collect()
}

/// `absent_days` is `total_days - present_days` and is left unclamped; it goes
/// negative when an input row reports more work days than it spans.
pub fn attendance_summary(records: &[ActivityRecord]) -> Vec<AttendanceSummary> {
    group_by(
        records,
        |r| (r.name.clone(), r.month_name),
        &ATTENDANCE_METRICS,
    )
    .into_iter()
    .map(|group| {
        let total_days = group.count("total_days");
        let present_days = group.value("present_days");
        AttendanceSummary {
            total_days,
            present_days,
            leave_days: group.value("leave_days"),
            absent_days: total_days as f64 - present_days,
            name: group.key.0,
            month: group.key.1.to_string(),
        }
    })
    .collect()
}

pub fn buffer_summary(table: &EmployeeTable) -> Availability<Vec<BufferSummary>> {
    if !table.has_all_buffers() {
        let missing: Vec<&str> = BufferKind::ALL
            .into_iter()
            .filter(|kind| !table.buffer_columns.contains(kind))
            .map(BufferKind::column)
            .collect();
        warn!(?missing, "buffer report unavailable");
        return Availability::Unavailable("Required buffer columns not found in the data.".to_string());
    }

    let rows = group_by(&table.records, |r| r.name.clone(), &BUFFER_METRICS)
        .into_iter()
        .map(|group| BufferSummary {
            ppt_buffer: group.value(BufferKind::Ppt.column()),
            lab_ppt_buffer: group.value(BufferKind::LabPpt.column()),
            illu_buffer: group.value(BufferKind::Illustration.column()),
            ae_buffer: group.value(BufferKind::AfterEffects.column()),
            name: group.key,
        })
        .collect();

    Availability::Available(rows)
}

/// One row per (name, buffer type), for stacked bar charts.
pub fn melt_buffers(rows: &[BufferSummary]) -> Vec<BufferCount> {
    rows.iter()
        .flat_map(|row| {
            BufferKind::ALL.into_iter().map(move |kind| BufferCount {
                name: row.name.clone(),
                buffer_type: kind.label(),
                count: row.count(kind),
            })
        })
        .collect()
}

pub fn video_summary(records: &[VideoRecord], policy: &TargetPolicy) -> Vec<VideoSummary> {
    group_by(records, |r| r.name.clone(), &VIDEO_METRICS)
        .into_iter()
        .map(|group| {
            let total_minutes = group.value("total_minutes");
            VideoSummary {
                total_minutes,
                target_minutes: policy.video_minutes,
                target_met: total_minutes >= policy.video_minutes,
                name: group.key,
            }
        })
        .collect()
}

/// Present/absent/leave split for the first attendance row of `name`.
pub fn attendance_breakdown(rows: &[AttendanceSummary], name: &str) -> Option<AttendanceBreakdown> {
    rows.iter().find(|row| row.name == name).map(|row| AttendanceBreakdown {
        name: row.name.clone(),
        month: row.month.clone(),
        present: row.present_days,
        absent: row.absent_days,
        leave: row.leave_days,
    })
}

pub fn video_metric(rows: &[VideoSummary], name: &str) -> Option<VideoMetric> {
    rows.iter().find(|row| row.name == name).map(|row| VideoMetric {
        name: row.name.clone(),
        total_minutes: row.total_minutes,
        delta_from_target: row.total_minutes - row.target_minutes,
    })
}

/// Distinct names in first-occurrence order.
pub fn names<'a, I>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = Vec::<String>::new();
    for name in names {
        if !seen.iter().any(|s| s == name) {
            seen.push(name.to_string());
        }
    }
    seen
}
