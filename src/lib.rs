//! Employee activity summaries: weekly/monthly topic coverage, overall totals,
//! attendance, buffer counts and SME video duration.
//!
//! Uploads flow through [`table`] (parsing and caching) and [`normalize`]
//! (schema checks, typed records), then [`select`] dispatches to one of the
//! report builders in [`reports`], each backed by the grouping engine in
//! [`aggregate`].

pub mod aggregate;
pub mod chart;
pub mod config;
pub mod duration;
pub mod error;
pub mod models;
pub mod normalize;
pub mod reports;
pub mod select;
pub mod table;

pub use duration::parse_duration;
pub use error::{ExportError, LoadError, SchemaError};
pub use normalize::{normalize_employees, normalize_videos};
pub use reports::TargetPolicy;
pub use select::{select, ReportMode, ReportView};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::select::SummaryTable;
    use crate::table::{Upload, UploadCache};

    const EMPLOYEES: &str = "\
Name,Topic,Start Date,End Date,Work Days,Leave Days
Alice,Ownership,2024-01-15,2024-01-15,1,0
Alice,Borrowing,2024-01-16,2024-01-16,1,0
Alice,Lifetimes,not-a-date,,1,0
Bob,Traits,2024-03-04,2024-03-04,1,0
Bob,Generics,2024-03-05,,0,1
";

    #[test]
    fn upload_to_monthly_report() {
        let mut cache = UploadCache::new();
        let raw = cache.load(&Upload::new("employees.csv", EMPLOYEES)).unwrap();
        let table = normalize_employees(raw).unwrap();
        assert_eq!(table.records.len(), 4);
        assert_eq!(table.dropped_rows, 1);

        let ReportView::Ready(report) =
            select(ReportMode::Monthly, &table, None, &TargetPolicy::default())
        else {
            panic!("monthly report should be ready");
        };
        assert_eq!(report.export_name, Some("monthly_summary.csv"));
        let SummaryTable::Monthly(rows) = &report.table else {
            panic!("expected monthly rows");
        };
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].name, "Bob");
        assert_eq!(rows[1].month, "March");
        assert_eq!(rows[1].ppt_count, 2);
        assert_eq!(rows[1].monthly_target, 6);
        assert!(!rows[1].target_met);
    }

    #[test]
    fn upload_without_leave_days_halts() {
        let upload = Upload::new(
            "employees.csv",
            "name,topic,start_date,end_date,work_days\nAlice,Rust,2024-01-01,,1\n",
        );
        let mut cache = UploadCache::new();
        let raw = cache.load(&upload).unwrap();
        let err = normalize_employees(raw).unwrap_err();
        assert_eq!(err.to_string(), "Missing columns: {'leave_days'}");
    }
}
