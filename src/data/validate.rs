//! Structural preconditions checked before and after the class filter.

use super::model::Dataset;
use crate::error::{Result, SampleError};

pub fn check_column_exists(dataset: &Dataset, column: &str) -> Result<()> {
    if dataset.has_column(column) {
        Ok(())
    } else {
        Err(SampleError::ColumnNotFound(column.to_string()))
    }
}

pub fn check_missing_values(dataset: &Dataset, column: &str) -> Result<()> {
    let mut missing = dataset
        .records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.get(column).is_null())
        .map(|(i, _)| i);

    match missing.next() {
        None => Ok(()),
        Some(first_row) => Err(SampleError::MissingValue {
            column: column.to_string(),
            count: 1 + missing.count(),
            first_row,
        }),
    }
}

/// The requested size must be positive and no larger than the table.
/// Returns it as a count.
pub fn validate_sample_size(dataset: &Dataset, requested: i64) -> Result<usize> {
    if requested <= 0 {
        return Err(SampleError::InvalidSampleSize {
            requested,
            reason: "sample size must be a positive integer".to_string(),
        });
    }
    let size = usize::try_from(requested).map_err(|_| SampleError::InvalidSampleSize {
        requested,
        reason: "sample size does not fit in memory".to_string(),
    })?;
    if size > dataset.len() {
        return Err(SampleError::InvalidSampleSize {
            requested,
            reason: format!("the data only has {} rows", dataset.len()),
        });
    }
    Ok(size)
}

/// The sample must be able to hold at least one row per class.
pub fn validate_class_count(dataset: &Dataset, column: &str, sample_size: usize) -> Result<()> {
    let classes = dataset.value_counts(column).len();
    if sample_size < classes {
        return Err(SampleError::InsufficientSampleSize {
            requested: sample_size,
            classes,
        });
    }
    Ok(())
}

/// Checks run on the freshly loaded table, in order.
pub fn validate_before_filter(dataset: &Dataset, column: &str, requested: i64) -> Result<usize> {
    check_column_exists(dataset, column)?;
    check_missing_values(dataset, column)?;
    validate_sample_size(dataset, requested)
}

/// Checks run once small classes are gone: the table may have shrunk
/// (possibly to nothing) and lost classes.
pub fn validate_after_filter(dataset: &Dataset, column: &str, sample_size: usize) -> Result<()> {
    if sample_size > dataset.len() {
        return Err(SampleError::InvalidSampleSize {
            requested: sample_size as i64,
            reason: format!(
                "only {} rows remain after removing small classes",
                dataset.len()
            ),
        });
    }
    validate_class_count(dataset, column, sample_size)
}
