use std::collections::HashMap;
use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, ExcelDateTime, Reader};
use chrono::NaiveTime;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::LoadError;

/// Untyped parsed upload. Every row has exactly `headers.len()` cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        let width = headers.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, String::new());
                row
            })
            .collect();
        Self { headers, rows }
    }
}

/// One uploaded file: its original name and raw bytes.
#[derive(Debug, Clone)]
pub struct Upload {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, LoadError> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, bytes })
    }

    fn extension(&self) -> String {
        Path::new(&self.name)
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default()
    }

    fn format(&self) -> UploadFormat {
        match self.extension().as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => UploadFormat::Spreadsheet,
            "tsv" | "tab" => UploadFormat::Delimited(b'\t'),
            _ => {
                let header = self.bytes.split(|b| *b == b'\n').next().unwrap_or_default();
                let semicolons = header.contains(&b';');
                let commas = header.contains(&b',');
                UploadFormat::Delimited(if semicolons && !commas { b';' } else { b',' })
            }
        }
    }

    /// SHA-256 of the content, used as the cache identity. The extension is
    /// folded in because it picks the delimiter.
    pub fn content_hash(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.extension().as_bytes());
        hasher.update([0u8]);
        hasher.update(&self.bytes);
        hex::encode(hasher.finalize())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum UploadFormat {
    Delimited(u8),
    Spreadsheet,
}

/// Parses a delimited-text or spreadsheet upload into a [`RawTable`]. Both
/// forms yield string cells, so normalization treats them identically.
pub fn parse_upload(upload: &Upload) -> Result<RawTable, LoadError> {
    let (headers, rows) = match upload.format() {
        UploadFormat::Delimited(delimiter) => read_delimited(upload, delimiter)?,
        UploadFormat::Spreadsheet => read_workbook(upload)?,
    };

    if headers.is_empty() || headers.iter().all(|h| h.trim().is_empty()) {
        return Err(LoadError::Empty(upload.name.clone()));
    }

    debug!(upload = %upload.name, rows = rows.len(), "parsed upload");
    Ok(RawTable::new(headers, rows))
}

type Cells = (Vec<String>, Vec<Vec<String>>);

fn read_delimited(upload: &Upload, delimiter: u8) -> Result<Cells, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .trim(csv::Trim::None)
        .from_reader(upload.bytes.as_slice());

    let mut headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    if let Some(first) = headers.first_mut() {
        if let Some(stripped) = first.strip_prefix('\u{feff}') {
            *first = stripped.to_string();
        }
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok((headers, rows))
}

/// First worksheet; its first row holds the headers.
fn read_workbook(upload: &Upload) -> Result<Cells, LoadError> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(upload.bytes.as_slice()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| LoadError::Empty(upload.name.clone()))??;

    let mut lines = range.rows().map(|row| row.iter().map(cell_text).collect::<Vec<_>>());
    let headers = lines.next().unwrap_or_default();
    let rows = lines
        .filter(|row| row.iter().any(|cell| !cell.is_empty()))
        .collect();
    Ok((headers, rows))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty | Data::Error(_) => String::new(),
        Data::String(s) | Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{f:.0}"),
        Data::Float(f) => f.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => excel_datetime_text(dt),
    }
}

/// Dates render as ISO dates, time-only values as `H:MM:SS` so duration
/// columns keep parsing.
fn excel_datetime_text(dt: &ExcelDateTime) -> String {
    if dt.is_duration() || dt.as_f64() < 1.0 {
        let total_seconds = (dt.as_f64() * 86_400.0).round().max(0.0) as u64;
        return format!(
            "{}:{:02}:{:02}",
            total_seconds / 3600,
            (total_seconds / 60) % 60,
            total_seconds % 60
        );
    }
    match dt.as_datetime() {
        Some(value) if value.time() == NaiveTime::MIN => value.date().format("%Y-%m-%d").to_string(),
        Some(value) => value.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => dt.as_f64().to_string(),
    }
}

/// Memoizes [`parse_upload`] by content hash. Uploads are immutable, so
/// entries never go stale and are never evicted.
#[derive(Debug, Default)]
pub struct UploadCache {
    tables: HashMap<String, RawTable>,
}

impl UploadCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, upload: &Upload) -> Result<&RawTable, LoadError> {
        let key = upload.content_hash();
        if self.tables.contains_key(&key) {
            debug!(upload = %upload.name, hash = %key, "upload cache hit");
        } else {
            let table = parse_upload(upload)?;
            self.tables.insert(key.clone(), table);
        }
        Ok(&self.tables[&key])
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
