//! Spreadsheet and CSV (de)serialization at the store boundary.
//!
//! Converts file bytes into a [`DataFrame`] and back. The format is chosen
//! from the file extension: workbooks are read with calamine and written
//! with rust_xlsxwriter, CSV goes through polars' own reader and writer.
//!
//! Date cells become millisecond `Datetime` columns and are written back as
//! dates, so a cleaned export keeps its dates through the archive.

use crate::error::{CpwError, Result};
use calamine::{Data, DataType as _, Reader, open_workbook_auto_from_rs};
use chrono::{DateTime, NaiveDateTime, NaiveTime};
use polars::prelude::*;
use rust_xlsxwriter::{Format, Workbook};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

/// How to locate the table inside a file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetOptions {
    /// Sheet name; the first sheet when `None`
    pub sheet: Option<String>,

    /// Zero-based row holding the headers; rows above it are ignored
    pub header_row: usize,

    /// Keep only the first line of multi-line header cells
    pub first_header_line: bool,
}

impl SheetOptions {
    pub fn sheet(name: impl Into<String>) -> Self {
        Self {
            sheet: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn with_header_row(mut self, header_row: usize) -> Self {
        self.header_row = header_row;
        self
    }

    pub fn with_first_header_line(mut self) -> Self {
        self.first_header_line = true;
        self
    }
}

/// File formats understood by the boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    Workbook,
    Csv,
}

impl TableFormat {
    /// Detect the format from a file name's extension
    pub fn from_name(name: &str) -> Option<Self> {
        let extension = Path::new(name)
            .extension()
            .and_then(|ext| ext.to_str())?
            .to_ascii_lowercase();

        match extension.as_str() {
            "xlsx" | "xlsm" | "xls" | "ods" => Some(TableFormat::Workbook),
            "csv" => Some(TableFormat::Csv),
            _ => None,
        }
    }
}

/// Decode file bytes into a table
pub fn decode(name: &str, bytes: Vec<u8>, options: &SheetOptions) -> Result<DataFrame> {
    let df = match TableFormat::from_name(name) {
        Some(TableFormat::Workbook) => decode_workbook(name, bytes, options)?,
        Some(TableFormat::Csv) => decode_csv(name, bytes, options)?,
        None => return Err(CpwError::format(name, "unsupported file extension")),
    };

    debug!(
        "Decoded '{}': {} rows x {} columns",
        name,
        df.height(),
        df.width()
    );
    Ok(df)
}

/// Encode a table into file bytes
pub fn encode(name: &str, df: &DataFrame) -> Result<Vec<u8>> {
    match TableFormat::from_name(name) {
        Some(TableFormat::Workbook) if name.to_ascii_lowercase().ends_with(".xlsx") => {
            encode_xlsx(name, df)
        }
        Some(TableFormat::Workbook) => Err(CpwError::format(
            name,
            "only .xlsx workbooks can be written",
        )),
        Some(TableFormat::Csv) => encode_csv(name, df),
        None => Err(CpwError::format(name, "unsupported file extension")),
    }
}

fn decode_workbook(name: &str, bytes: Vec<u8>, options: &SheetOptions) -> Result<DataFrame> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| CpwError::format(name, e.to_string()))?;

    let sheet_name = match &options.sheet {
        Some(sheet) => sheet.clone(),
        None => workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| CpwError::format(name, "workbook has no sheets"))?,
    };

    if !workbook.sheet_names().contains(&sheet_name) {
        return Err(CpwError::format(
            name,
            format!("sheet '{}' not found", sheet_name),
        ));
    }

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| CpwError::format(name, format!("sheet '{}': {}", sheet_name, e)))?;

    // Ranges start at the first used cell, header_row counts from the top of the sheet
    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    let mut rows = range.rows().skip(options.header_row.saturating_sub(first_row));
    let Some(header) = rows.next() else {
        // Sheet shorter than the header offset: nothing to read
        return Ok(DataFrame::empty());
    };

    let headers: Vec<String> = header
        .iter()
        .enumerate()
        .map(|(index, cell)| header_name(cell, index, options.first_header_line))
        .collect();

    let mut cells: Vec<Vec<Cell>> = vec![Vec::new(); headers.len()];
    for row in rows {
        if row.iter().all(|cell| matches!(cell, Data::Empty)) {
            continue;
        }
        for (index, column) in cells.iter_mut().enumerate() {
            column.push(row.get(index).map(Cell::from_data).unwrap_or(Cell::Empty));
        }
    }

    let columns = headers
        .iter()
        .zip(cells)
        .map(|(header, values)| build_column(header, values))
        .collect::<PolarsResult<Vec<_>>>()
        .map_err(|e| CpwError::format(name, e.to_string()))?;

    DataFrame::new(columns).map_err(|e| CpwError::format(name, e.to_string()))
}

fn header_name(cell: &Data, index: usize, first_line_only: bool) -> String {
    let text = match Cell::from_data(cell) {
        Cell::Empty => String::new(),
        other => other.render(),
    };
    normalize_header(&text, index, first_line_only)
}

/// Header text as the pipeline sees it; blank headers are named by position
fn normalize_header(text: &str, index: usize, first_line_only: bool) -> String {
    let text = if first_line_only {
        text.lines().next().unwrap_or_default()
    } else {
        text
    }
    .trim();

    if text.is_empty() {
        format!("Unnamed: {}", index)
    } else {
        text.to_string()
    }
}

/// A single worksheet value, reduced to what the pipeline distinguishes
#[derive(Debug, Clone, PartialEq)]
enum Cell {
    Empty,
    Int(i64),
    Float(f64),
    Text(String),
    DateTime(NaiveDateTime),
}

impl Cell {
    fn from_data(data: &Data) -> Self {
        match data {
            Data::DateTime(_) | Data::DateTimeIso(_) => match data.as_datetime() {
                Some(datetime) => Cell::DateTime(datetime),
                None => Cell::Text(data.to_string()),
            },
            Data::Empty => Cell::Empty,
            Data::Int(i) => Cell::Int(*i),
            Data::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => Cell::Int(*f as i64),
            Data::Float(f) => Cell::Float(*f),
            Data::String(s) if s.trim().is_empty() => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Bool(b) => Cell::Text(b.to_string()),
            other => Cell::Text(other.to_string()),
        }
    }

    fn render(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Int(i) => i.to_string(),
            Cell::Float(f) => f.to_string(),
            Cell::Text(s) => s.clone(),
            Cell::DateTime(dt) if dt.time() == NaiveTime::MIN => {
                dt.format("%Y-%m-%d").to_string()
            }
            Cell::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

/// Build a typed column: integers, floats, datetimes, or text when the kinds mix
fn build_column(name: &str, values: Vec<Cell>) -> PolarsResult<Column> {
    let name = PlSmallStr::from(name);
    let present = || values.iter().filter(|v| !matches!(v, Cell::Empty));

    let all_int = present().all(|v| matches!(v, Cell::Int(_)));
    let all_numeric = present().all(|v| matches!(v, Cell::Int(_) | Cell::Float(_)));
    let all_datetime = present().all(|v| matches!(v, Cell::DateTime(_)));
    let any_present = present().next().is_some();

    if any_present && all_int {
        let ints: Vec<Option<i64>> = values
            .iter()
            .map(|v| match v {
                Cell::Int(i) => Some(*i),
                _ => None,
            })
            .collect();
        Ok(Column::new(name, ints))
    } else if any_present && all_datetime {
        let millis: Vec<Option<i64>> = values
            .iter()
            .map(|v| match v {
                Cell::DateTime(dt) => Some(dt.and_utc().timestamp_millis()),
                _ => None,
            })
            .collect();
        Column::new(name, millis).cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
    } else if any_present && all_numeric {
        let floats: Vec<Option<f64>> = values
            .iter()
            .map(|v| match v {
                Cell::Int(i) => Some(*i as f64),
                Cell::Float(f) => Some(*f),
                _ => None,
            })
            .collect();
        Ok(Column::new(name, floats))
    } else {
        let texts: Vec<Option<String>> = values
            .iter()
            .map(|v| match v {
                Cell::Empty => None,
                other => Some(other.render()),
            })
            .collect();
        Ok(Column::new(name, texts))
    }
}

/// Wall-clock value of a polars datetime; time zones are not carried into workbooks
fn naive_datetime(value: i64, unit: TimeUnit) -> Option<NaiveDateTime> {
    let millis = match unit {
        TimeUnit::Nanoseconds => value.div_euclid(1_000_000),
        TimeUnit::Microseconds => value.div_euclid(1_000),
        TimeUnit::Milliseconds => value,
    };
    DateTime::from_timestamp_millis(millis).map(|dt| dt.naive_utc())
}

fn decode_csv(name: &str, bytes: Vec<u8>, options: &SheetOptions) -> Result<DataFrame> {
    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(DataFrame::empty());
    }

    let mut df = CsvReadOptions::default()
        .with_has_header(true)
        .with_skip_rows(options.header_row)
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()
        .map_err(|e| CpwError::format(name, e.to_string()))?;

    // polars names blank header cells `column_{n}`, counting from one
    let headers: Vec<String> = df
        .get_column_names()
        .iter()
        .enumerate()
        .map(|(index, header)| {
            let header = header.as_str();
            if header == format!("column_{}", index + 1) {
                normalize_header("", index, options.first_header_line)
            } else {
                normalize_header(header, index, options.first_header_line)
            }
        })
        .collect();

    df.set_column_names(headers.iter().map(String::as_str))
        .map_err(|e| CpwError::format(name, e.to_string()))?;
    Ok(df)
}

fn encode_csv(name: &str, df: &DataFrame) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut df = df.clone();
    CsvWriter::new(&mut buffer)
        .include_header(true)
        .finish(&mut df)
        .map_err(|e| CpwError::format(name, e.to_string()))?;
    Ok(buffer)
}

fn encode_xlsx(name: &str, df: &DataFrame) -> Result<Vec<u8>> {
    let to_format_error = |e: rust_xlsxwriter::XlsxError| CpwError::format(name, e.to_string());

    let date_format = Format::new().set_num_format("yyyy-mm-dd");
    let datetime_format = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col_index, column) in df.get_columns().iter().enumerate() {
        let col_index = u16::try_from(col_index)
            .map_err(|_| CpwError::format(name, "too many columns for a worksheet"))?;
        worksheet
            .write_string(0, col_index, column.name().as_str())
            .map_err(to_format_error)?;

        let series = column.as_materialized_series();
        for row_index in 0..series.len() {
            let row = u32::try_from(row_index + 1)
                .map_err(|_| CpwError::format(name, "too many rows for a worksheet"))?;
            match series.get(row_index)? {
                AnyValue::Null => {}
                AnyValue::Boolean(b) => {
                    worksheet
                        .write_boolean(row, col_index, b)
                        .map_err(to_format_error)?;
                }
                AnyValue::Datetime(value, unit, _) => {
                    let datetime = naive_datetime(value, unit).ok_or_else(|| {
                        CpwError::format(name, format!("datetime {} out of range", value))
                    })?;
                    let format = if datetime.time() == NaiveTime::MIN {
                        &date_format
                    } else {
                        &datetime_format
                    };
                    worksheet
                        .write_datetime_with_format(row, col_index, &datetime, format)
                        .map_err(to_format_error)?;
                }
                value @ (AnyValue::Int8(_)
                | AnyValue::Int16(_)
                | AnyValue::Int32(_)
                | AnyValue::Int64(_)
                | AnyValue::UInt8(_)
                | AnyValue::UInt16(_)
                | AnyValue::UInt32(_)
                | AnyValue::UInt64(_)
                | AnyValue::Float32(_)
                | AnyValue::Float64(_)) => {
                    let number = value.extract::<f64>().unwrap_or_default();
                    worksheet
                        .write_number(row, col_index, number)
                        .map_err(to_format_error)?;
                }
                other => {
                    worksheet
                        .write_string(row, col_index, other.str_value().to_string())
                        .map_err(to_format_error)?;
                }
            }
        }
    }

    workbook.save_to_buffer().map_err(to_format_error)
}
