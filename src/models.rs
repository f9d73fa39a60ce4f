use chrono::{Datelike, NaiveDate};
use serde::Serialize;

use crate::aggregate::{Cell, Row};

pub const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BufferKind {
    Ppt,
    LabPpt,
    Illustration,
    AfterEffects,
}

impl BufferKind {
    pub const ALL: [BufferKind; 4] = [
        BufferKind::Ppt,
        BufferKind::LabPpt,
        BufferKind::Illustration,
        BufferKind::AfterEffects,
    ];

    /// Normalized column name as it appears in uploads.
    pub fn column(self) -> &'static str {
        match self {
            BufferKind::Ppt => "ppt's_buffer",
            BufferKind::LabPpt => "lab_ppt's_buffer",
            BufferKind::Illustration => "illu_buffer",
            BufferKind::AfterEffects => "ae_buffer",
        }
    }

    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            BufferKind::Ppt => &["ppt's_buffer", "ppt_buffer", "ppts_buffer"],
            BufferKind::LabPpt => &["lab_ppt's_buffer", "lab_ppt_buffer", "lab_ppts_buffer"],
            BufferKind::Illustration => &["illu_buffer"],
            BufferKind::AfterEffects => &["ae_buffer"],
        }
    }

    /// Chart label: underscores become spaces, words are title-cased.
    pub fn label(self) -> String {
        title_case(&self.column().replace('_', " "))
    }
}

fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.extend(ch.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActivityRecord {
    pub name: String,
    pub topic: String,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub work_days: f64,
    pub leave_days: f64,
    pub buffers: [Option<f64>; 4],
    pub week_number: u32,
    pub month_name: &'static str,
    pub month_number: u32,
}

impl ActivityRecord {
    /// Builds a record and derives its temporal keys from `start_date`.
    pub fn new(
        name: impl Into<String>,
        topic: impl Into<String>,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
        work_days: f64,
        leave_days: f64,
    ) -> Self {
        let month_number = start_date.month();
        Self {
            name: name.into(),
            topic: topic.into(),
            start_date,
            end_date,
            work_days,
            leave_days,
            buffers: [None; 4],
            week_number: start_date.iso_week().week(),
            month_name: MONTH_NAMES[month_number as usize - 1],
            month_number,
        }
    }

    pub fn with_buffer(mut self, kind: BufferKind, value: f64) -> Self {
        self.buffers[kind as usize] = Some(value);
        self
    }

    pub fn buffer(&self, kind: BufferKind) -> Option<f64> {
        self.buffers[kind as usize]
    }
}

impl Row for ActivityRecord {
    fn cell(&self, column: &str) -> Cell<'_> {
        match column {
            "name" => Cell::Text(&self.name),
            "topic" => Cell::Text(&self.topic),
            "start_date" => Cell::Date(self.start_date),
            "end_date" => self.end_date.map_or(Cell::Missing, Cell::Date),
            "work_days" => Cell::Number(self.work_days),
            "leave_days" => Cell::Number(self.leave_days),
            "week_number" => Cell::Number(self.week_number as f64),
            "month" | "month_name" => Cell::Text(self.month_name),
            "month_number" => Cell::Number(self.month_number as f64),
            other => BufferKind::ALL
                .into_iter()
                .find(|kind| kind.column() == other)
                .and_then(|kind| self.buffer(kind))
                .map_or(Cell::Missing, Cell::Number),
        }
    }
}

/// Normalized employee upload.
#[derive(Debug, Clone, Default)]
pub struct EmployeeTable {
    pub records: Vec<ActivityRecord>,
    pub buffer_columns: Vec<BufferKind>,
    pub dropped_rows: usize,
}

impl EmployeeTable {
    pub fn has_all_buffers(&self) -> bool {
        BufferKind::ALL
            .iter()
            .all(|kind| self.buffer_columns.contains(kind))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VideoRecord {
    pub name: String,
    pub video_duration: String,
    pub total_minutes: f64,
}

impl Row for VideoRecord {
    fn cell(&self, column: &str) -> Cell<'_> {
        match column {
            "name" => Cell::Text(&self.name),
            "video_duration" => Cell::Text(&self.video_duration),
            "total_minutes" => Cell::Number(self.total_minutes),
            _ => Cell::Missing,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct VideoTable {
    pub records: Vec<VideoRecord>,
    pub dropped_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeeklySummary {
    pub name: String,
    pub week_number: u32,
    pub total_work_days: f64,
    pub total_leave_days: f64,
    pub ppt_count: usize,
    pub weekly_target: usize,
    pub target_met: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySummary {
    pub name: String,
    pub month: String,
    pub month_number: u32,
    pub total_work_days: f64,
    pub total_leave_days: f64,
    pub ppt_count: usize,
    pub unique_weeks: usize,
    pub monthly_target: usize,
    pub target_met: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallSummary {
    pub name: String,
    pub total_work_days: f64,
    pub total_leave_days: f64,
    pub total_ppt_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceSummary {
    pub name: String,
    pub month: String,
    pub total_days: usize,
    pub present_days: f64,
    pub leave_days: f64,
    pub absent_days: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BufferSummary {
    pub name: String,
    #[serde(rename = "ppt's_buffer")]
    pub ppt_buffer: f64,
    #[serde(rename = "lab_ppt's_buffer")]
    pub lab_ppt_buffer: f64,
    pub illu_buffer: f64,
    pub ae_buffer: f64,
}

impl BufferSummary {
    pub fn count(&self, kind: BufferKind) -> f64 {
        match kind {
            BufferKind::Ppt => self.ppt_buffer,
            BufferKind::LabPpt => self.lab_ppt_buffer,
            BufferKind::Illustration => self.illu_buffer,
            BufferKind::AfterEffects => self.ae_buffer,
        }
    }
}

/// Long-form buffer row for stacked charts.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BufferCount {
    pub name: String,
    #[serde(rename = "Buffer Type")]
    pub buffer_type: String,
    #[serde(rename = "Count")]
    pub count: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoSummary {
    pub name: String,
    pub total_minutes: f64,
    pub target_minutes: f64,
    pub target_met: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceBreakdown {
    pub name: String,
    pub month: String,
    pub present: f64,
    pub absent: f64,
    pub leave: f64,
}

impl AttendanceBreakdown {
    pub fn slices(&self) -> [(&'static str, f64); 3] {
        [
            ("Present", self.present),
            ("Absent", self.absent),
            ("Leave", self.leave),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VideoMetric {
    pub name: String,
    pub total_minutes: f64,
    pub delta_from_target: f64,
}
