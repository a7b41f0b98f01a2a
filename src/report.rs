//! Text rendering of the `stats` sections, drawn as Arrow pretty tables.

use std::fmt::Write as _;
use std::sync::Arc;

use arrow::array::{ArrayRef, Float64Array, Int64Array, StringArray};
use arrow::datatypes::{Field, Schema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;

use crate::config::StatsConfig;
use crate::data::columnar::to_record_batch;
use crate::data::loader::load_dataset;
use crate::data::model::{CellValue, Dataset};
use crate::data::stats::{self, CrossTab, NumericSummary, ThresholdSummary};
use crate::error::{Result, SampleError};

/// Load `config.input` and render every requested section.
pub fn run(config: &StatsConfig) -> Result<String> {
    let dataset = load_dataset(&config.input)?;
    render(&dataset, config)
}

pub fn render(dataset: &Dataset, config: &StatsConfig) -> Result<String> {
    let mut out = String::new();

    if config.head > 0 {
        let head = dataset.head(config.head);
        let batch = to_record_batch(&head).map_err(|e| SampleError::Render(format!("{e:#}")))?;
        section(&mut out, &format!("First {} rows", head.len()), &batch)?;
    }

    for query in &config.thresholds {
        let summary = stats::threshold_summary(dataset, query)?;
        render_threshold(&mut out, &summary)?;
    }

    if config.describe {
        let summaries = stats::describe(dataset, &config.describe_columns)?;
        if summaries.is_empty() {
            log::warn!("No numeric columns to describe");
        } else {
            section(&mut out, "Summary of numeric columns", &describe_batch(&summaries)?)?;
        }
    }

    for column in &config.frequencies {
        let freq = stats::frequency_table(dataset, column)?;
        section(
            &mut out,
            &format!("Frequency of '{column}'"),
            &frequency_batch(column, &freq)?,
        )?;
    }

    for spec in &config.crosstabs {
        let table = stats::crosstab(dataset, spec)?;
        section(
            &mut out,
            &format!("Cross-tabulation of '{}' by '{}'", spec.row_column, spec.col_column),
            &crosstab_batch(&table)?,
        )?;
    }

    Ok(out)
}

fn render_threshold(out: &mut String, summary: &ThresholdSummary) -> Result<()> {
    let q = &summary.query;
    let _ = writeln!(
        out,
        "Distinct '{}' with {} > {}: {} ({} rows)",
        q.key_column, q.value_column, q.threshold, summary.distinct_keys, summary.matching_rows
    );
    section(
        out,
        &format!("Frequency of '{}' with {} > {}", q.key_column, q.value_column, q.threshold),
        &frequency_batch(&q.key_column, &summary.frequencies)?,
    )
}

fn section(out: &mut String, title: &str, batch: &RecordBatch) -> Result<()> {
    let table = pretty_format_batches(std::slice::from_ref(batch))
        .map_err(|e| SampleError::Render(e.to_string()))?;
    let _ = writeln!(out, "{title}:\n{table}\n");
    Ok(())
}

// ---------------------------------------------------------------------------
// Batch builders
// ---------------------------------------------------------------------------

fn batch(columns: Vec<(String, ArrayRef)>) -> Result<RecordBatch> {
    let fields: Vec<Field> = columns
        .iter()
        .map(|(name, arr)| Field::new(name, arr.data_type().clone(), true))
        .collect();
    let arrays = columns.into_iter().map(|(_, arr)| arr).collect();
    RecordBatch::try_new(Arc::new(Schema::new(fields)), arrays)
        .map_err(|e| SampleError::Render(e.to_string()))
}

fn labels(values: impl Iterator<Item = String>) -> ArrayRef {
    Arc::new(StringArray::from(values.collect::<Vec<_>>()))
}

fn frequency_batch(column: &str, freq: &[(CellValue, usize)]) -> Result<RecordBatch> {
    batch(vec![
        (column.to_string(), labels(freq.iter().map(|(v, _)| v.to_string()))),
        (
            "count".to_string(),
            Arc::new(Int64Array::from_iter_values(freq.iter().map(|(_, n)| *n as i64))) as ArrayRef,
        ),
    ])
}

fn describe_batch(summaries: &[NumericSummary]) -> Result<RecordBatch> {
    const STATS: [&str; 8] = ["count", "mean", "std", "min", "25%", "50%", "75%", "max"];

    let mut columns = vec![(
        String::new(),
        labels(STATS.iter().map(|s| s.to_string())),
    )];
    for s in summaries {
        let values = vec![
            Some(s.count as f64),
            Some(s.mean),
            s.std,
            Some(s.min),
            Some(s.q25),
            Some(s.median),
            Some(s.q75),
            Some(s.max),
        ];
        columns.push((s.column.clone(), Arc::new(Float64Array::from(values)) as ArrayRef));
    }
    batch(columns)
}

fn crosstab_batch(table: &CrossTab) -> Result<RecordBatch> {
    let mut columns = vec![(
        table.spec.row_column.clone(),
        labels(table.row_values.iter().map(|v| v.to_string())),
    )];
    for (c, value) in table.col_values.iter().enumerate() {
        let counts = table.counts.iter().map(|row| row[c] as i64);
        columns.push((
            value.to_string(),
            Arc::new(Int64Array::from_iter_values(counts)) as ArrayRef,
        ));
    }
    batch(columns)
}
