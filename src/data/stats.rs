use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use super::model::{CellValue, Dataset};
use crate::error::{Result, SampleError};

// ---------------------------------------------------------------------------
// Query types
// ---------------------------------------------------------------------------

/// `VALUE>THRESHOLD:KEY`, e.g. `heart>800:artist` – which `artist`s appear
/// in rows whose `heart` exceeds 800.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdQuery {
    pub value_column: String,
    pub threshold: f64,
    pub key_column: String,
}

impl FromStr for ThresholdQuery {
    type Err = SampleError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = |reason: &str| SampleError::InvalidQuery {
            query: s.to_string(),
            reason: reason.to_string(),
        };
        let (condition, key) = s
            .split_once(':')
            .ok_or_else(|| invalid("expected VALUE>THRESHOLD:KEY"))?;
        let (value, threshold) = condition
            .split_once('>')
            .ok_or_else(|| invalid("expected VALUE>THRESHOLD before ':'"))?;
        let threshold: f64 = threshold
            .trim()
            .parse()
            .map_err(|_| invalid("threshold is not a number"))?;

        let (value, key) = (value.trim(), key.trim());
        if value.is_empty() || key.is_empty() {
            return Err(invalid("column names must not be empty"));
        }
        Ok(ThresholdQuery {
            value_column: value.to_string(),
            threshold,
            key_column: key.to_string(),
        })
    }
}

/// `ROW,COL` – the two columns of a cross-tabulation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrosstabSpec {
    pub row_column: String,
    pub col_column: String,
}

impl FromStr for CrosstabSpec {
    type Err = SampleError;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once(',') {
            Some((row, col)) if !row.trim().is_empty() && !col.trim().is_empty() => {
                Ok(CrosstabSpec {
                    row_column: row.trim().to_string(),
                    col_column: col.trim().to_string(),
                })
            }
            _ => Err(SampleError::InvalidQuery {
                query: s.to_string(),
                reason: "expected ROW,COL".to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Frequencies
// ---------------------------------------------------------------------------

/// Value counts of `column`, most frequent first (ties by value), nulls excluded.
pub fn frequency_table(dataset: &Dataset, column: &str) -> Result<Vec<(CellValue, usize)>> {
    require_column(dataset, column)?;
    let mut counts: Vec<(CellValue, usize)> = dataset
        .value_counts(column)
        .into_iter()
        .filter(|(v, _)| !v.is_null())
        .collect();
    counts.sort_by(|(va, na), (vb, nb)| nb.cmp(na).then_with(|| va.cmp(vb)));
    Ok(counts)
}

#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdSummary {
    pub query: ThresholdQuery,
    pub matching_rows: usize,
    pub distinct_keys: usize,
    pub frequencies: Vec<(CellValue, usize)>,
}

pub fn threshold_summary(dataset: &Dataset, query: &ThresholdQuery) -> Result<ThresholdSummary> {
    require_numeric(dataset, &query.value_column)?;
    require_column(dataset, &query.key_column)?;

    let matching = dataset.filter_rows(|r| {
        r.get(&query.value_column)
            .as_f64()
            .is_some_and(|v| v > query.threshold)
    });
    let frequencies = frequency_table(&matching, &query.key_column)?;

    Ok(ThresholdSummary {
        query: query.clone(),
        matching_rows: matching.len(),
        distinct_keys: frequencies.len(),
        frequencies,
    })
}

// ---------------------------------------------------------------------------
// Numeric summaries
// ---------------------------------------------------------------------------

/// The `describe()` statistics of one numeric column.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericSummary {
    pub column: String,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; `None` with fewer than two values.
    pub std: Option<f64>,
    pub min: f64,
    pub q25: f64,
    pub median: f64,
    pub q75: f64,
    pub max: f64,
}

/// A column is numeric when it has at least one value and every non-null
/// value is an integer or a float.
pub fn is_numeric(dataset: &Dataset, column: &str) -> bool {
    let mut any = false;
    for v in dataset.column(column) {
        match v {
            CellValue::Null => {}
            CellValue::Integer(_) | CellValue::Float(_) => any = true,
            _ => return false,
        }
    }
    any
}

pub fn numeric_columns(dataset: &Dataset) -> Vec<String> {
    dataset
        .column_names
        .iter()
        .filter(|c| is_numeric(dataset, c))
        .cloned()
        .collect()
}

/// Summaries for `columns`, or for every numeric column when `columns` is empty.
pub fn describe(dataset: &Dataset, columns: &[String]) -> Result<Vec<NumericSummary>> {
    let columns = if columns.is_empty() {
        numeric_columns(dataset)
    } else {
        columns.to_vec()
    };
    columns
        .iter()
        .map(|c| describe_column(dataset, c))
        .collect()
}

pub fn describe_column(dataset: &Dataset, column: &str) -> Result<NumericSummary> {
    require_numeric(dataset, column)?;

    let mut values: Vec<f64> = dataset.column(column).filter_map(CellValue::as_f64).collect();
    values.sort_by(f64::total_cmp);

    let count = values.len();
    let mean = values.iter().sum::<f64>() / count as f64;
    let std = (count > 1).then(|| {
        let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
        (ss / (count - 1) as f64).sqrt()
    });

    Ok(NumericSummary {
        column: column.to_string(),
        count,
        mean,
        std,
        min: values[0],
        q25: quantile(&values, 0.25),
        median: quantile(&values, 0.5),
        q75: quantile(&values, 0.75),
        max: values[count - 1],
    })
}

/// Linear interpolation between closest ranks; `sorted` must be non-empty.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

// ---------------------------------------------------------------------------
// Cross-tabulation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct CrossTab {
    pub spec: CrosstabSpec,
    pub row_values: Vec<CellValue>,
    pub col_values: Vec<CellValue>,
    /// `counts[r][c]` rows having `row_values[r]` and `col_values[c]`.
    pub counts: Vec<Vec<usize>>,
}

pub fn crosstab(dataset: &Dataset, spec: &CrosstabSpec) -> Result<CrossTab> {
    require_column(dataset, &spec.row_column)?;
    require_column(dataset, &spec.col_column)?;

    let mut cells: BTreeMap<(&CellValue, &CellValue), usize> = BTreeMap::new();
    let mut rows = BTreeSet::new();
    let mut cols = BTreeSet::new();
    for rec in &dataset.records {
        let (r, c) = (rec.get(&spec.row_column), rec.get(&spec.col_column));
        if r.is_null() || c.is_null() {
            continue;
        }
        rows.insert(r);
        cols.insert(c);
        *cells.entry((r, c)).or_insert(0) += 1;
    }

    let counts = rows
        .iter()
        .map(|r| {
            cols.iter()
                .map(|c| cells.get(&(*r, *c)).copied().unwrap_or(0))
                .collect()
        })
        .collect();

    Ok(CrossTab {
        spec: spec.clone(),
        row_values: rows.into_iter().cloned().collect(),
        col_values: cols.into_iter().cloned().collect(),
        counts,
    })
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn require_column(dataset: &Dataset, column: &str) -> Result<()> {
    if dataset.has_column(column) {
        Ok(())
    } else {
        Err(SampleError::ColumnNotFound(column.to_string()))
    }
}

fn require_numeric(dataset: &Dataset, column: &str) -> Result<()> {
    require_column(dataset, column)?;
    if is_numeric(dataset, column) {
        Ok(())
    } else {
        Err(SampleError::NotNumeric {
            column: column.to_string(),
        })
    }
}
