//! Declarative chart descriptions handed to whatever renders them.

use serde::Serialize;

use crate::models::{AttendanceBreakdown, MONTH_NAMES};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mark {
    Bar,
    Arc,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColorRule {
    /// Colour by a boolean field.
    Conditional {
        field: String,
        when_true: String,
        when_false: String,
    },
    Categorical {
        field: String,
        categories: Vec<String>,
    },
    None,
}

impl ColorRule {
    pub fn target_met() -> Self {
        ColorRule::Conditional {
            field: "target_met".to_string(),
            when_true: "green".to_string(),
            when_false: "red".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSpec {
    pub mark: Mark,
    pub x: String,
    pub y: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_sort: Option<Vec<String>>,
    pub color: ColorRule,
    pub tooltip: Vec<String>,
    pub title: String,
}

impl ChartSpec {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

fn fields(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

pub fn weekly_chart() -> ChartSpec {
    ChartSpec {
        mark: Mark::Bar,
        x: "week_number:O".to_string(),
        y: "ppt_count:Q".to_string(),
        x_sort: None,
        color: ColorRule::target_met(),
        tooltip: fields(&["name", "ppt_count", "weekly_target", "target_met"]),
        title: "Weekly Topic Coverage".to_string(),
    }
}

pub fn monthly_chart() -> ChartSpec {
    ChartSpec {
        mark: Mark::Bar,
        x: "month:O".to_string(),
        y: "ppt_count:Q".to_string(),
        x_sort: Some(fields(&MONTH_NAMES)),
        color: ColorRule::target_met(),
        tooltip: fields(&["name", "ppt_count", "monthly_target", "target_met"]),
        title: "Monthly Topic Coverage".to_string(),
    }
}

pub fn overall_chart() -> ChartSpec {
    ChartSpec {
        mark: Mark::Bar,
        x: "name:N".to_string(),
        y: "total_ppt_count:Q".to_string(),
        x_sort: None,
        color: ColorRule::None,
        tooltip: fields(&["name", "total_ppt_count"]),
        title: "Total Topics Covered".to_string(),
    }
}

/// Pie of one person's present/absent/leave days.
pub fn attendance_chart(breakdown: &AttendanceBreakdown) -> ChartSpec {
    ChartSpec {
        mark: Mark::Arc,
        x: "Status:N".to_string(),
        y: "Days:Q".to_string(),
        x_sort: None,
        color: ColorRule::Categorical {
            field: "Status".to_string(),
            categories: fields(&["Present", "Absent", "Leave"]),
        },
        tooltip: fields(&["Status", "Days"]),
        title: format!("Attendance for {}", breakdown.name),
    }
}

pub fn buffer_chart(buffer_types: Vec<String>) -> ChartSpec {
    ChartSpec {
        mark: Mark::Bar,
        x: "name:N".to_string(),
        y: "Count:Q".to_string(),
        x_sort: None,
        color: ColorRule::Categorical {
            field: "Buffer Type".to_string(),
            categories: buffer_types,
        },
        tooltip: fields(&["name", "Buffer Type", "Count"]),
        title: "Buffer Counts per Employee".to_string(),
    }
}

pub fn video_chart() -> ChartSpec {
    ChartSpec {
        mark: Mark::Bar,
        x: "name:N".to_string(),
        y: "total_minutes:Q".to_string(),
        x_sort: None,
        color: ColorRule::target_met(),
        tooltip: fields(&["name", "total_minutes", "target_minutes"]),
        title: "Total Video Duration (in minutes)".to_string(),
    }
}
