use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{bail, Context, Result};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde_json::Value as JsonValue;

use super::columnar::{cell_from_array, column_kind, ColumnKind};
use super::model::{CellValue, Dataset, Record};
use crate::error::SampleError;

/// Text that Pandas reads as a missing value.
const NA_MARKERS: &[&str] = &["NA", "N/A", "NaN", "nan", "null", "NULL", "None"];

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a table and check it has at least one row.
///
/// * missing file → [`SampleError::NotFound`]
/// * zero rows → [`SampleError::EmptyData`]
/// * anything else that goes wrong → [`SampleError::Load`]
pub fn load_dataset(path: &Path) -> Result<Dataset, SampleError> {
    if !path.is_file() {
        return Err(SampleError::NotFound(path.to_path_buf()));
    }

    let dataset = load_file(path).map_err(|e| SampleError::Load {
        path: path.to_path_buf(),
        reason: format!("{e:#}"),
    })?;

    if dataset.is_empty() {
        return Err(SampleError::EmptyData(path.to_path_buf()));
    }

    log::info!(
        "Loaded {} rows x {} columns from {}",
        dataset.len(),
        dataset.column_names.len(),
        path.display()
    );
    Ok(dataset)
}

/// Parse a table from a file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row with column names
/// * `.json`    – `[{ "artist": "...", "star": 5, ... }, ...]`
/// * `.parquet` – any flat schema (as written by Pandas or Polars)
pub fn load_file(path: &Path) -> Result<Dataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => load_csv(path),
        "json" => load_json(path),
        "parquet" | "pq" => load_parquet(path),
        other => bail!("Unsupported file extension: .{other}"),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path) -> Result<Dataset> {
    let mut reader = csv::Reader::from_path(path).context("opening CSV")?;
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.to_string())
        .collect();
    check_unique_columns(&headers)?;

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        rows.push(result.with_context(|| format!("CSV row {row_no}"))?);
    }

    // One type per column, decided from every non-missing field.
    let kinds: Vec<ColumnKind> = (0..headers.len())
        .map(|c| csv_column_kind(rows.iter().filter_map(|r| r.get(c))))
        .collect();

    let records = rows
        .iter()
        .enumerate()
        .map(|(row_no, record)| Record {
            row_id: row_no,
            values: headers
                .iter()
                .zip(&kinds)
                .zip(record.iter())
                .map(|((col, &kind), field)| (col.clone(), parse_field(field, kind)))
                .collect(),
        })
        .collect();

    Ok(Dataset::new(headers, records))
}

fn check_unique_columns(headers: &[String]) -> Result<()> {
    let mut seen = BTreeSet::new();
    for h in headers {
        if !seen.insert(h.as_str()) {
            bail!("duplicate column name '{h}'");
        }
    }
    Ok(())
}

fn is_missing(field: &str) -> bool {
    field.is_empty() || NA_MARKERS.contains(&field)
}

/// Kind of a single field. Numbers count only when their text is the one
/// the writer produces, so `007` or `1e3` keep the column as text.
fn field_kind(field: &str) -> ColumnKind {
    if field.parse::<i64>().is_ok_and(|i| i.to_string() == field) {
        ColumnKind::Integer
    } else if field
        .parse::<f64>()
        .is_ok_and(|f| CellValue::Float(f).to_field() == field)
    {
        ColumnKind::Float
    } else if field == "true" || field == "false" {
        ColumnKind::Bool
    } else {
        ColumnKind::Text
    }
}

fn csv_column_kind<'a>(fields: impl Iterator<Item = &'a str>) -> ColumnKind {
    let mut kind: Option<ColumnKind> = None;
    for field in fields.filter(|f| !is_missing(f)) {
        let this = field_kind(field);
        kind = Some(kind.map_or(this, |k| k.widen(this)));
        if kind == Some(ColumnKind::Text) {
            break;
        }
    }
    kind.unwrap_or(ColumnKind::Text)
}

fn parse_field(field: &str, kind: ColumnKind) -> CellValue {
    if is_missing(field) {
        return CellValue::Null;
    }
    let text = || CellValue::String(field.to_string());
    match kind {
        ColumnKind::Integer => field.parse().map(CellValue::Integer).unwrap_or_else(|_| text()),
        ColumnKind::Float => field.parse().map(CellValue::Float).unwrap_or_else(|_| text()),
        ColumnKind::Bool => CellValue::Bool(field == "true"),
        ColumnKind::Text => text(),
    }
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON, the default `df.to_json(orient='records')`.
/// Columns are ordered by first appearance.
fn load_json(path: &Path) -> Result<Dataset> {
    let text = std::fs::read_to_string(path).context("reading JSON file")?;
    let root: JsonValue = serde_json::from_str(&text).context("parsing JSON")?;

    let rows = root.as_array().context("Expected top-level JSON array")?;

    let mut column_names: Vec<String> = Vec::new();
    let mut records = Vec::with_capacity(rows.len());

    for (i, row) in rows.iter().enumerate() {
        let obj = row
            .as_object()
            .with_context(|| format!("Row {i} is not a JSON object"))?;

        let mut values = BTreeMap::new();
        for (key, val) in obj {
            if !column_names.contains(key) {
                column_names.push(key.clone());
            }
            values.insert(key.clone(), json_to_cell(val));
        }

        records.push(Record { row_id: i, values });
    }

    let mut dataset = Dataset::new(column_names, records);
    widen_mixed_numbers(&mut dataset);
    Ok(dataset)
}

/// `5` and `5.0` in one column are the same number: store both as floats.
fn widen_mixed_numbers(dataset: &mut Dataset) {
    let float_columns: Vec<String> = dataset
        .column_names
        .iter()
        .filter(|c| column_kind(dataset, c) == ColumnKind::Float)
        .cloned()
        .collect();
    for rec in &mut dataset.records {
        for col in &float_columns {
            if let Some(cell) = rec.values.get_mut(col) {
                if let CellValue::Integer(i) = *cell {
                    *cell = CellValue::Float(i as f64);
                }
            }
        }
    }
}

fn json_to_cell(val: &JsonValue) -> CellValue {
    match val {
        JsonValue::String(s) => CellValue::String(s.clone()),
        JsonValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                CellValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                CellValue::Float(f)
            } else {
                CellValue::String(n.to_string())
            }
        }
        JsonValue::Bool(b) => CellValue::Bool(*b),
        JsonValue::Null => CellValue::Null,
        other => CellValue::String(other.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Works with files written by both **Pandas** (`df.to_parquet()`) and
/// **Polars** (`df.write_parquet()`). A Pandas index column is kept as a
/// regular column only when it was stored as one.
fn load_parquet(path: &Path) -> Result<Dataset> {
    let file = std::fs::File::open(path).context("opening parquet file")?;
    let builder =
        ParquetRecordBatchReaderBuilder::try_new(file).context("reading parquet metadata")?;
    let column_names: Vec<String> = builder
        .schema()
        .fields()
        .iter()
        .map(|f| f.name().clone())
        .collect();
    check_unique_columns(&column_names)?;
    let reader = builder.build().context("building parquet reader")?;

    let mut records = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;

        for row in 0..batch.num_rows() {
            let values: BTreeMap<String, CellValue> = column_names
                .iter()
                .zip(batch.columns())
                .map(|(name, col)| (name.clone(), cell_from_array(col, row)))
                .collect();

            records.push(Record {
                row_id: records.len(),
                values,
            });
        }
    }

    Ok(Dataset::new(column_names, records))
}
