use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::{debug, warn};

use crate::duration::parse_duration;
use crate::error::SchemaError;
use crate::models::{ActivityRecord, BufferKind, EmployeeTable, VideoRecord, VideoTable};
use crate::table::RawTable;

pub const EMPLOYEE_COLUMNS: [&str; 6] = [
    "start_date",
    "end_date",
    "work_days",
    "leave_days",
    "topic",
    "name",
];

pub const VIDEO_COLUMNS: [&str; 2] = ["name", "video_duration"];

const DATE_FORMATS: [&str; 7] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%B %d, %Y",
    "%d %B %Y",
];

const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// `" Work Days "` -> `"work_days"`.
pub fn normalize_column_name(name: &str) -> String {
    name.trim().to_lowercase().replace(' ', "_")
}

/// Parses a calendar date, returning `None` for anything unrecognized.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.date_naive()))
}

fn parse_number(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Header lookup over a raw table with normalized column names.
struct Columns {
    index: HashMap<String, usize>,
}

impl Columns {
    fn new(raw: &RawTable) -> Self {
        let mut index = HashMap::new();
        for (idx, header) in raw.headers.iter().enumerate() {
            // first occurrence wins on duplicate headers
            index.entry(normalize_column_name(header)).or_insert(idx);
        }
        Self { index }
    }

    fn require(&self, required: &[&str]) -> Result<(), SchemaError> {
        let missing: BTreeSet<String> = required
            .iter()
            .filter(|col| !self.index.contains_key(**col))
            .map(|col| col.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::MissingColumns { missing })
        }
    }

    fn position(&self, column: &str) -> Option<usize> {
        self.index.get(column).copied()
    }

    fn buffer_position(&self, kind: BufferKind) -> Option<usize> {
        kind.aliases().iter().find_map(|alias| self.position(alias))
    }
}

fn cell<'a>(row: &'a [String], idx: usize) -> &'a str {
    row.get(idx).map(String::as_str).unwrap_or("")
}

/// Validates the employee upload and turns it into typed records.
///
/// Rows with a blank name or an unparsable `start_date` are dropped; blank
/// numbers count as zero.
pub fn normalize_employees(raw: &RawTable) -> Result<EmployeeTable, SchemaError> {
    let columns = Columns::new(raw);
    columns.require(&EMPLOYEE_COLUMNS)?;

    let pos = |name: &str| columns.position(name).unwrap_or_default();
    let (name_idx, topic_idx) = (pos("name"), pos("topic"));
    let (start_idx, end_idx) = (pos("start_date"), pos("end_date"));
    let (work_idx, leave_idx) = (pos("work_days"), pos("leave_days"));

    let buffer_positions: Vec<(BufferKind, usize)> = BufferKind::ALL
        .into_iter()
        .filter_map(|kind| columns.buffer_position(kind).map(|idx| (kind, idx)))
        .collect();

    let mut table = EmployeeTable {
        buffer_columns: buffer_positions.iter().map(|(kind, _)| *kind).collect(),
        ..EmployeeTable::default()
    };

    for row in &raw.rows {
        let name = cell(row, name_idx).trim();
        let Some(start_date) = parse_date(cell(row, start_idx)).filter(|_| !name.is_empty()) else {
            table.dropped_rows += 1;
            continue;
        };

        let mut record = ActivityRecord::new(
            name,
            cell(row, topic_idx).trim(),
            start_date,
            parse_date(cell(row, end_idx)),
            parse_number(cell(row, work_idx)).unwrap_or(0.0),
            parse_number(cell(row, leave_idx)).unwrap_or(0.0),
        );
        for (kind, idx) in &buffer_positions {
            record = record.with_buffer(*kind, parse_number(cell(row, *idx)).unwrap_or(0.0));
        }
        table.records.push(record);
    }

    if table.dropped_rows > 0 {
        warn!(
            dropped = table.dropped_rows,
            kept = table.records.len(),
            "dropped rows without a name or a parsable start_date"
        );
    }
    debug!(
        records = table.records.len(),
        buffers = table.buffer_columns.len(),
        "normalized employee table"
    );

    Ok(table)
}

pub fn normalize_videos(raw: &RawTable) -> Result<VideoTable, SchemaError> {
    let columns = Columns::new(raw);
    columns.require(&VIDEO_COLUMNS)?;

    let name_idx = columns.position("name").unwrap_or_default();
    let duration_idx = columns.position("video_duration").unwrap_or_default();

    let mut table = VideoTable::default();
    for row in &raw.rows {
        let name = cell(row, name_idx).trim();
        if name.is_empty() {
            table.dropped_rows += 1;
            continue;
        }
        let duration = cell(row, duration_idx).trim();
        table.records.push(VideoRecord {
            name: name.to_string(),
            video_duration: duration.to_string(),
            total_minutes: parse_duration((!duration.is_empty()).then_some(duration)),
        });
    }

    if table.dropped_rows > 0 {
        warn!(dropped = table.dropped_rows, "dropped video rows without a name");
    }
    debug!(records = table.records.len(), "normalized video table");
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(headers: &[&str], rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            headers.iter().map(|h| h.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    const HEADERS: [&str; 6] = [" Name", "Topic", "Start Date", "End Date", "Work Days", "Leave Days "];

    #[test]
    fn normalizes_column_names() {
        assert_eq!(normalize_column_name(" Work Days "), "work_days");
        assert_eq!(normalize_column_name("PPT's Buffer"), "ppt's_buffer");
        assert_eq!(normalize_column_name("name"), "name");
    }

    #[test]
    fn parses_common_date_forms() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        for text in [
            "2024-03-05",
            "2024/03/05",
            "03/05/2024",
            "05-03-2024",
            "05.03.2024",
            "March 5, 2024",
            "5 March 2024",
            "2024-03-05 09:30:00",
            "2024-03-05T09:30:00",
            "2024-03-05T09:30:00+02:00",
        ] {
            assert_eq!(parse_date(text), Some(expected), "{text}");
        }
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date(""), None);
        assert_eq!(parse_date("2024-02-30"), None);
    }

    #[test]
    fn missing_leave_days_is_a_schema_error() {
        let table = raw(
            &["name", "topic", "start_date", "end_date", "work_days"],
            &[&["Alice", "Rust", "2024-01-01", "", "1"]],
        );
        let err = normalize_employees(&table).unwrap_err();
        let expected: BTreeSet<String> = ["leave_days".to_string()].into_iter().collect();
        assert_eq!(err.missing(), &expected);
    }

    #[test]
    fn reports_every_missing_column() {
        let err = normalize_employees(&raw(&["name"], &[])).unwrap_err();
        assert_eq!(err.missing().len(), 5);
        assert!(!err.missing().contains("name"));
    }

    #[test]
    fn drops_rows_without_start_date() {
        let table = raw(
            &HEADERS,
            &[
                &["Alice", "Rust", "2024-01-15", "2024-01-16", "1", "0"],
                &["Alice", "Go", "someday", "2024-01-16", "1", "0"],
                &["Bob", "C", "", "", "1", "0"],
                &["Bob", "Zig", "2024-02-01", "later", "", "1"],
            ],
        );
        let normalized = normalize_employees(&table).unwrap();
        assert_eq!(normalized.records.len(), 2);
        assert_eq!(normalized.dropped_rows, 2);

        let bob = &normalized.records[1];
        assert_eq!(bob.name, "Bob");
        assert_eq!(bob.end_date, None);
        assert_eq!(bob.work_days, 0.0);
        assert_eq!(bob.leave_days, 1.0);

        for record in &normalized.records {
            assert!((1..=53).contains(&record.week_number));
            assert!((1..=12).contains(&record.month_number));
        }
    }

    #[test]
    fn drops_rows_without_name() {
        let table = raw(
            &HEADERS,
            &[
                &["Alice", "Rust", "2024-01-15", "", "1", "0"],
                &["", "Go", "2024-01-16", "", "1", "0"],
                &["   ", "C", "2024-01-17", "", "1", "0"],
            ],
        );
        let normalized = normalize_employees(&table).unwrap();
        assert_eq!(normalized.records.len(), 1);
        assert_eq!(normalized.dropped_rows, 2);
        assert!(normalized.records.iter().all(|r| !r.name.is_empty()));
    }

    #[test]
    fn detects_buffer_columns() {
        let mut headers = HEADERS.to_vec();
        headers.extend(["PPT's Buffer", "Lab PPT's Buffer", "Illu Buffer", "AE Buffer"]);
        let table = raw(
            &headers,
            &[&["Alice", "Rust", "2024-01-15", "", "1", "0", "2", "1", "", "4"]],
        );
        let normalized = normalize_employees(&table).unwrap();
        assert!(normalized.has_all_buffers());

        let record = &normalized.records[0];
        assert_eq!(record.buffer(BufferKind::Ppt), Some(2.0));
        assert_eq!(record.buffer(BufferKind::Illustration), Some(0.0));
        assert_eq!(record.buffer(BufferKind::AfterEffects), Some(4.0));
    }

    #[test]
    fn partial_buffers_are_not_all_buffers() {
        let mut headers = HEADERS.to_vec();
        headers.push("ppt_buffer");
        let table = raw(&headers, &[&["Alice", "Rust", "2024-01-15", "", "1", "0", "2"]]);
        let normalized = normalize_employees(&table).unwrap();
        assert_eq!(normalized.buffer_columns, vec![BufferKind::Ppt]);
        assert!(!normalized.has_all_buffers());
    }

    #[test]
    fn video_rows_get_minutes() {
        let table = raw(
            &["Name", "Video Duration"],
            &[
                &["Carol", "1:00:00"],
                &["Carol", "0:45"],
                &["Dan", "n/a"],
                &["Dan", ""],
                &["", "2:00:00"],
            ],
        );
        let videos = normalize_videos(&table).unwrap();
        assert_eq!(videos.records.len(), 4);
        assert_eq!(videos.dropped_rows, 1);
        assert_eq!(videos.records[0].total_minutes, 60.0);
        assert_eq!(videos.records[1].total_minutes, 0.75);
        assert_eq!(videos.records[2].total_minutes, 0.0);
        assert_eq!(videos.records[3].total_minutes, 0.0);
    }

    #[test]
    fn video_table_needs_duration_column() {
        let err = normalize_videos(&raw(&["name"], &[])).unwrap_err();
        assert!(err.missing().contains("video_duration"));
    }
}
