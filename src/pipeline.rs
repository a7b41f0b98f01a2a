//! The sampling run: load → validate → drop small classes → validate →
//! sample → write. Each stage either hands its result to the next or stops
//! the run with a [`SampleError`]; nothing is written on failure.

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::config::SampleConfig;
use crate::data::filter::remove_small_classes;
use crate::data::loader::load_dataset;
use crate::data::model::{CellValue, Dataset};
use crate::data::sampler::StratifiedSampler;
use crate::data::validate::{validate_after_filter, validate_before_filter};
use crate::data::writer::save_dataset;
use crate::error::Result;

/// What a successful run did.
#[derive(Debug, Clone)]
pub struct SampleReport {
    pub output: PathBuf,
    pub rows_loaded: usize,
    pub rows_after_filter: usize,
    /// Classes dropped by the class filter, with their sizes.
    pub removed_classes: BTreeMap<CellValue, usize>,
    /// Rows sampled from each remaining class.
    pub allocation: BTreeMap<CellValue, usize>,
    pub rows_sampled: usize,
}

/// Run the whole pipeline and write the sample to `config.output`.
pub fn run(config: &SampleConfig) -> Result<SampleReport> {
    let dataset = load_dataset(&config.input)?;
    let (sample, report) = sample_dataset(&dataset, config)?;
    save_dataset(&sample, &config.output)?;
    Ok(report)
}

/// Everything between loading and writing, on an in-memory table.
pub fn sample_dataset(dataset: &Dataset, config: &SampleConfig) -> Result<(Dataset, SampleReport)> {
    let column = config.stratify_column.as_str();

    let sample_size = validate_before_filter(dataset, column, config.sample_size)?;

    let filtered = remove_small_classes(dataset, column, config.min_class_count);
    validate_after_filter(&filtered.dataset, column, sample_size)?;

    let sampler = StratifiedSampler::with_seed(config.seed);
    let split = sampler.split(&filtered.dataset, column, sample_size)?;
    log::info!(
        "Sampled {} of {} rows across {} classes of '{column}' (seed {})",
        split.sample.len(),
        filtered.dataset.len(),
        split.allocation.len(),
        sampler.seed()
    );

    let sample = filtered.dataset.select(&split.sample);
    let report = SampleReport {
        output: config.output.clone(),
        rows_loaded: dataset.len(),
        rows_after_filter: filtered.dataset.len(),
        removed_classes: filtered.removed,
        allocation: split.allocation,
        rows_sampled: sample.len(),
    };
    Ok((sample, report))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SampleError;

    fn stars(sizes: &[(i64, usize)]) -> Dataset {
        let rows = sizes
            .iter()
            .flat_map(|&(star, n)| {
                (0..n).map(move |i| {
                    vec![
                        CellValue::String(format!("artist-{star}-{i}")),
                        CellValue::Integer(star),
                    ]
                })
            })
            .collect();
        Dataset::from_rows(vec!["artist".into(), "star".into()], rows)
    }

    fn config(sample_size: i64) -> SampleConfig {
        SampleConfig {
            sample_size,
            ..SampleConfig::default()
        }
    }

    #[test]
    fn small_classes_are_dropped_before_sampling() {
        let ds = stars(&[(1, 2), (2, 10), (3, 30)]);
        let (sample, report) = sample_dataset(&ds, &config(8)).unwrap();

        assert_eq!(sample.len(), 8);
        assert_eq!(report.rows_loaded, 42);
        assert_eq!(report.rows_after_filter, 40);
        assert_eq!(report.removed_classes[&CellValue::Integer(1)], 2);
        assert_eq!(report.allocation[&CellValue::Integer(2)], 2);
        assert_eq!(report.allocation[&CellValue::Integer(3)], 6);
        assert!(sample.column("star").all(|v| v != &CellValue::Integer(1)));
    }

    #[test]
    fn size_checked_against_unfiltered_rows_first() {
        let ds = stars(&[(1, 2), (2, 10)]);
        let err = sample_dataset(&ds, &config(13)).unwrap_err();
        assert!(matches!(err, SampleError::InvalidSampleSize { requested: 13, .. }));
    }

    #[test]
    fn size_rechecked_after_filter() {
        // 12 rows pass the first check, only 10 survive the filter
        let ds = stars(&[(1, 2), (2, 10)]);
        let err = sample_dataset(&ds, &config(12)).unwrap_err();
        assert!(matches!(err, SampleError::InvalidSampleSize { requested: 12, .. }));
    }

    #[test]
    fn class_count_checked_after_filter() {
        let ds = stars(&[(1, 1), (2, 4), (3, 4), (4, 4)]);
        // four classes before the filter, three after
        assert!(sample_dataset(&ds, &config(3)).is_ok());
        let err = sample_dataset(&ds, &config(2)).unwrap_err();
        assert!(matches!(
            err,
            SampleError::InsufficientSampleSize { requested: 2, classes: 3 }
        ));
    }

    #[test]
    fn class_without_a_spare_row_fails_sampling() {
        let ds = stars(&[(1, 1), (2, 10)]);
        let config = SampleConfig {
            min_class_count: 1,
            ..config(5)
        };
        let err = sample_dataset(&ds, &config).unwrap_err();
        assert!(matches!(err, SampleError::Sampling(_)));
        assert_eq!(err.category(), crate::error::ErrorCategory::InvalidValue);
    }

    #[test]
    fn everything_filtered_out() {
        let ds = stars(&[(1, 3), (2, 3)]);
        let err = sample_dataset(&ds, &config(2)).unwrap_err();
        assert!(matches!(err, SampleError::InvalidSampleSize { .. }));
    }
}
