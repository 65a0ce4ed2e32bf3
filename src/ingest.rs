use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::models::{CellValue, RawTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Workbook,
    Csv,
}

impl InputFormat {
    pub fn from_filename(filename: &str) -> Result<Self> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => Ok(InputFormat::Workbook),
            "csv" => Ok(InputFormat::Csv),
            _ => Err(PipelineError::UnsupportedFormat(filename.to_string())),
        }
    }
}

pub fn read_table(bytes: &[u8], filename: &str) -> Result<RawTable> {
    let table = match InputFormat::from_filename(filename)? {
        InputFormat::Workbook => read_workbook(bytes)?,
        InputFormat::Csv => read_csv(bytes)?,
    };
    debug!(
        columns = table.headers.len(),
        rows = table.rows.len(),
        "read input table"
    );
    Ok(table)
}

fn read_workbook(bytes: &[u8]) -> Result<RawTable> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|err| PipelineError::Read(err.to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(PipelineError::EmptySheet)?
        .map_err(|err| PipelineError::Read(err.to_string()))?;

    let mut rows = range.rows();
    let headers = rows
        .next()
        .ok_or(PipelineError::EmptySheet)?
        .iter()
        .map(|cell| match cell {
            Data::Empty => String::new(),
            other => other.to_string(),
        })
        .collect();

    let rows = rows
        .map(|row| row.iter().map(cell_from_data).collect::<Vec<_>>())
        .filter(|row| !row.iter().all(CellValue::is_empty))
        .collect();

    Ok(RawTable { headers, rows })
}

fn cell_from_data(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::Int(value) => CellValue::Number(*value as f64),
        Data::Float(value) => CellValue::Number(*value),
        Data::Bool(flag) => CellValue::Bool(*flag),
        Data::String(text) => CellValue::Text(text.clone()),
        Data::DateTime(value) => CellValue::Number(value.as_f64()),
        Data::DateTimeIso(text) | Data::DurationIso(text) => CellValue::Text(text.clone()),
        Data::Error(_) => CellValue::Empty,
    }
}

fn read_csv(bytes: &[u8]) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);

    let headers = reader
        .headers()
        .map_err(|err| PipelineError::Read(err.to_string()))?
        .iter()
        .enumerate()
        .map(|(index, header)| {
            if index == 0 {
                header.trim_start_matches('\u{feff}').to_string()
            } else {
                header.to_string()
            }
        })
        .collect::<Vec<_>>();
    if headers.is_empty() {
        return Err(PipelineError::EmptySheet);
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|err| PipelineError::Read(err.to_string()))?;
        let row: Vec<CellValue> = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::Text(field.to_string())
                }
            })
            .collect();
        if !row.iter().all(CellValue::is_empty) {
            rows.push(row);
        }
    }

    Ok(RawTable { headers, rows })
}
