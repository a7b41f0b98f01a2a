use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{
    Array, ArrayRef, AsArray, BooleanArray, Float64Array, Int64Array, StringArray,
};
use arrow::datatypes::{
    DataType, Field, Float32Type, Float64Type, Int16Type, Int32Type, Int64Type, Int8Type,
    Schema, UInt16Type, UInt32Type, UInt64Type, UInt8Type,
};
use arrow::record_batch::{RecordBatch, RecordBatchOptions};
use arrow::util::display::array_value_to_string;

use super::model::{CellValue, Dataset};

// ---------------------------------------------------------------------------
// Arrow → CellValue
// ---------------------------------------------------------------------------

/// Extract a single cell from an Arrow column at a given row.
pub fn cell_from_array(col: &ArrayRef, row: usize) -> CellValue {
    if col.is_null(row) {
        return CellValue::Null;
    }
    match col.data_type() {
        DataType::Utf8 => CellValue::String(col.as_string::<i32>().value(row).to_string()),
        DataType::LargeUtf8 => CellValue::String(col.as_string::<i64>().value(row).to_string()),
        DataType::Int8 => CellValue::Integer(col.as_primitive::<Int8Type>().value(row).into()),
        DataType::Int16 => CellValue::Integer(col.as_primitive::<Int16Type>().value(row).into()),
        DataType::Int32 => CellValue::Integer(col.as_primitive::<Int32Type>().value(row).into()),
        DataType::Int64 => CellValue::Integer(col.as_primitive::<Int64Type>().value(row)),
        DataType::UInt8 => CellValue::Integer(col.as_primitive::<UInt8Type>().value(row).into()),
        DataType::UInt16 => CellValue::Integer(col.as_primitive::<UInt16Type>().value(row).into()),
        DataType::UInt32 => CellValue::Integer(col.as_primitive::<UInt32Type>().value(row).into()),
        DataType::UInt64 => {
            let v = col.as_primitive::<UInt64Type>().value(row);
            i64::try_from(v)
                .map(CellValue::Integer)
                .unwrap_or(CellValue::Float(v as f64))
        }
        DataType::Float32 => float_cell(col.as_primitive::<Float32Type>().value(row) as f64),
        DataType::Float64 => float_cell(col.as_primitive::<Float64Type>().value(row)),
        DataType::Boolean => CellValue::Bool(col.as_boolean().value(row)),
        DataType::Date32 | DataType::Date64 | DataType::Timestamp(_, _) => {
            match array_value_to_string(col, row) {
                Ok(text) => CellValue::Date(text),
                Err(_) => CellValue::Null,
            }
        }
        _ => match array_value_to_string(col, row) {
            Ok(text) => CellValue::String(text),
            Err(_) => CellValue::Null,
        },
    }
}

/// NaN is how Pandas stores a missing float.
fn float_cell(v: f64) -> CellValue {
    if v.is_nan() {
        CellValue::Null
    } else {
        CellValue::Float(v)
    }
}

// ---------------------------------------------------------------------------
// Dataset → Arrow
// ---------------------------------------------------------------------------

/// Storage type of one column, shared by every row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Integer,
    Float,
    Bool,
    Text,
}

impl ColumnKind {
    /// Narrowest kind holding values of both `self` and `other`.
    pub fn widen(self, other: ColumnKind) -> ColumnKind {
        match (self, other) {
            (a, b) if a == b => a,
            (ColumnKind::Integer, ColumnKind::Float) | (ColumnKind::Float, ColumnKind::Integer) => {
                ColumnKind::Float
            }
            _ => ColumnKind::Text,
        }
    }
}

/// Infer the narrowest Arrow type that holds every non-null value of `column`.
pub fn column_kind(dataset: &Dataset, column: &str) -> ColumnKind {
    let mut kind: Option<ColumnKind> = None;
    for value in dataset.column(column) {
        let this = match value {
            CellValue::Null => continue,
            CellValue::Integer(_) => ColumnKind::Integer,
            CellValue::Float(_) => ColumnKind::Float,
            CellValue::Bool(_) => ColumnKind::Bool,
            CellValue::String(_) | CellValue::Date(_) => return ColumnKind::Text,
        };
        kind = Some(kind.map_or(this, |k| k.widen(this)));
        if kind == Some(ColumnKind::Text) {
            break;
        }
    }
    kind.unwrap_or(ColumnKind::Text)
}

/// Convert the dataset into a single Arrow record batch, one field per
/// column in file order. No index column is added.
pub fn to_record_batch(dataset: &Dataset) -> Result<RecordBatch> {
    let mut fields = Vec::with_capacity(dataset.column_names.len());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(dataset.column_names.len());

    for name in &dataset.column_names {
        let kind = column_kind(dataset, name);
        let (data_type, array): (DataType, ArrayRef) = match kind {
            ColumnKind::Integer => {
                let values: Vec<Option<i64>> = dataset
                    .column(name)
                    .map(|v| match v {
                        CellValue::Integer(i) => Some(*i),
                        _ => None,
                    })
                    .collect();
                (DataType::Int64, Arc::new(Int64Array::from(values)))
            }
            ColumnKind::Float => {
                let values: Vec<Option<f64>> = dataset.column(name).map(|v| v.as_f64()).collect();
                (DataType::Float64, Arc::new(Float64Array::from(values)))
            }
            ColumnKind::Bool => {
                let values: Vec<Option<bool>> = dataset
                    .column(name)
                    .map(|v| match v {
                        CellValue::Bool(b) => Some(*b),
                        _ => None,
                    })
                    .collect();
                (DataType::Boolean, Arc::new(BooleanArray::from(values)))
            }
            ColumnKind::Text => {
                let values: Vec<Option<String>> = dataset
                    .column(name)
                    .map(|v| if v.is_null() { None } else { Some(v.to_string()) })
                    .collect();
                (DataType::Utf8, Arc::new(StringArray::from(values)))
            }
        };
        fields.push(Field::new(name, data_type, true));
        arrays.push(array);
    }

    let options = RecordBatchOptions::new().with_row_count(Some(dataset.len()));
    RecordBatch::try_new_with_options(Arc::new(Schema::new(fields)), arrays, &options)
        .context("building record batch")
}
