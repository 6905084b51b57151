//! CSV Loader
//!
//! Reads carrier location exports into [`LocationSample`]s. Only the
//! `UTCDateTime` column is required; every other column is optional and
//! looked up by header name. Empty cells, the literals `0` / `0.0` and the
//! common NA markers (`NaN`, `NA`, `null`, ...) are treated as missing
//! values; non-finite coordinates are dropped. Rows whose UTC timestamp or numeric fields
//! cannot be parsed are skipped and counted rather than failing the load.

use super::types::{LocationSample, UNKNOWN_CELL_TYPE};
use crate::{Error, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use csv::StringRecord;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// Carrier export timestamp layout
pub const CARRIER_DATETIME_FORMAT: &str = "%m/%d/%y %H:%M";

const FALLBACK_DATETIME_FORMATS: &[&str] = &[
    "%m/%d/%Y %H:%M",
    "%m/%d/%y %H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Cell values read as absent: the carrier's zero placeholders plus the
/// usual spreadsheet NA markers
const MISSING_VALUES: &[&str] = &[
    "", "0", "0.0", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND",
    "1.#QNAN", "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Outcome of loading a file
#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    /// Successfully parsed samples, in file order
    pub samples: Vec<LocationSample>,
    /// Data rows read (excluding the header)
    pub total_rows: usize,
    /// Rows dropped because a required or numeric field failed to parse
    pub skipped_rows: usize,
}

/// Load samples from a CSV file on disk
pub fn load_csv(path: impl AsRef<Path>) -> Result<LoadReport> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(Error::FileNotFound(path.to_path_buf()));
    }

    let file = std::fs::File::open(path)?;
    let report = from_reader(file)?;

    info!(
        file_path = %path.display(),
        raw_records = report.total_rows,
        valid_records = report.samples.len(),
        skipped_rows = report.skipped_rows,
        "Data loaded from CSV"
    );

    Ok(report)
}

/// Load samples from any CSV byte source
pub fn from_reader<R: Read>(reader: R) -> Result<LoadReport> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = reader.headers().map_err(|e| Error::Parse(e.to_string()))?.clone();
    let columns = Columns::from_headers(&headers)?;

    let mut report = LoadReport::default();
    for (line, row) in reader.records().enumerate() {
        let row = row.map_err(|e| Error::Parse(e.to_string()))?;
        report.total_rows += 1;

        match columns.parse_row(&row) {
            Some(sample) => report.samples.push(sample),
            None => {
                report.skipped_rows += 1;
                debug!(row = line + 1, "Skipping unparseable record");
            }
        }
    }

    if report.skipped_rows > 0 {
        warn!(
            skipped_rows = report.skipped_rows,
            total_rows = report.total_rows,
            "Invalid records skipped during load"
        );
    }

    Ok(report)
}

/// Header positions of the recognised columns
#[derive(Debug, Default)]
struct Columns {
    page: Option<usize>,
    item: Option<usize>,
    utc: usize,
    local: Option<usize>,
    latitude: Option<usize>,
    longitude: Option<usize>,
    timezone: Option<usize>,
    city: Option<usize>,
    county: Option<usize>,
    state: Option<usize>,
    country: Option<usize>,
    cell_type: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));

        let utc = find("UTCDateTime")
            .ok_or_else(|| Error::Parse("missing required column 'UTCDateTime'".to_string()))?;

        Ok(Self {
            page: find("Page"),
            item: find("Item"),
            utc,
            local: find("LocalDateTime"),
            latitude: find("Latitude"),
            longitude: find("Longitude"),
            timezone: find("TimeZone"),
            city: find("City"),
            county: find("County"),
            state: find("State"),
            country: find("Country"),
            cell_type: find("CellType"),
        })
    }

    /// Parse one row; `None` means the row is skipped
    fn parse_row(&self, row: &StringRecord) -> Option<LocationSample> {
        let utc_time = parse_timestamp(cell(row, Some(self.utc))?)?;
        let local_time = cell(row, self.local)
            .and_then(parse_naive_timestamp)
            .unwrap_or_else(|| utc_time.naive_utc());

        Some(LocationSample {
            page: parse_number(cell(row, self.page))?.unwrap_or(0),
            item: parse_number(cell(row, self.item))?.unwrap_or(0),
            utc_time,
            local_time,
            latitude: parse_coordinate(cell(row, self.latitude))?,
            longitude: parse_coordinate(cell(row, self.longitude))?,
            timezone: text(row, self.timezone),
            city: text(row, self.city),
            county: text(row, self.county),
            region: text(row, self.state),
            country: text(row, self.country),
            cell_type: text(row, self.cell_type).unwrap_or_else(|| UNKNOWN_CELL_TYPE.to_string()),
        })
    }
}

/// Cell contents, with missing-value markers mapped to `None`
fn cell(row: &StringRecord, index: Option<usize>) -> Option<&str> {
    let value = row.get(index?)?;
    if MISSING_VALUES.contains(&value) {
        None
    } else {
        Some(value)
    }
}

fn text(row: &StringRecord, index: Option<usize>) -> Option<String> {
    cell(row, index).map(str::to_string)
}

/// `Some(None)` for a missing cell, `None` for a cell that fails to parse
fn parse_number<T: std::str::FromStr>(value: Option<&str>) -> Option<Option<T>> {
    match value {
        None => Some(None),
        Some(v) => v.parse().ok().map(Some),
    }
}

/// Like [`parse_number`], with `inf` and friends read as missing
fn parse_coordinate(value: Option<&str>) -> Option<Option<f64>> {
    parse_number::<f64>(value).map(|v| v.filter(|c| c.is_finite()))
}

/// Parse a carrier timestamp as UTC
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    parse_naive_timestamp(value).map(|naive| naive.and_utc())
}

fn parse_naive_timestamp(value: &str) -> Option<NaiveDateTime> {
    std::iter::once(CARRIER_DATETIME_FORMAT)
        .chain(FALLBACK_DATETIME_FORMATS.iter().copied())
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
}
