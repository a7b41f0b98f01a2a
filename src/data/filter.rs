use std::collections::{BTreeMap, BTreeSet};

use super::model::{CellValue, Dataset};

/// Classes with fewer rows than this are dropped before sampling.
pub const DEFAULT_MIN_CLASS_COUNT: usize = 4;

/// Per-column selection state: maps column_name → set of selected values.
/// A row passes when, for every column listed, its value is in the set.
pub type FilterState = BTreeMap<String, BTreeSet<CellValue>>;

/// Return indices of records that pass all filters.
///
/// A record passes a column filter when:
/// * The column is not present in `filters` → passes (no constraint)
/// * The filter set for that column is empty → nothing selected → fails
/// * The record's value for that column is in the selected set → passes
pub fn filtered_indices(dataset: &Dataset, filters: &FilterState) -> Vec<usize> {
    dataset
        .records
        .iter()
        .enumerate()
        .filter(|(_, rec)| {
            filters
                .iter()
                .all(|(col, selected)| selected.contains(rec.get(col)))
        })
        .map(|(i, _)| i)
        .collect()
}

/// Result of dropping undersized classes.
#[derive(Debug, Clone)]
pub struct ClassFilterOutcome {
    pub dataset: Dataset,
    /// Removed class values with their row counts.
    pub removed: BTreeMap<CellValue, usize>,
}

/// Drop every class of `column` that has fewer than `min_count` rows.
///
/// Small classes are removed entirely, never merged or resampled.
/// An empty result is not an error here.
pub fn remove_small_classes(dataset: &Dataset, column: &str, min_count: usize) -> ClassFilterOutcome {
    let counts = dataset.value_counts(column);
    let (kept, removed): (BTreeMap<_, _>, BTreeMap<_, _>) =
        counts.into_iter().partition(|(_, n)| *n >= min_count);

    if removed.is_empty() {
        log::debug!("No class of '{column}' has fewer than {min_count} rows");
        return ClassFilterOutcome {
            dataset: dataset.clone(),
            removed,
        };
    }

    for (value, n) in &removed {
        log::warn!("Dropping class {column}={value} ({n} rows, minimum is {min_count})");
    }

    let mut filters = FilterState::new();
    filters.insert(column.to_string(), kept.into_keys().collect());
    let positions = filtered_indices(dataset, &filters);

    log::info!(
        "Class filter kept {} of {} rows ({} classes removed)",
        positions.len(),
        dataset.len(),
        removed.len()
    );

    ClassFilterOutcome {
        dataset: dataset.select(&positions),
        removed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_class_sizes(sizes: &[(&str, usize)]) -> Dataset {
        let rows = sizes
            .iter()
            .flat_map(|(label, n)| {
                (0..*n).map(move |i| {
                    vec![
                        CellValue::String(label.to_string()),
                        CellValue::Integer(i as i64),
                    ]
                })
            })
            .collect();
        Dataset::from_rows(vec!["star".into(), "heart".into()], rows)
    }

    #[test]
    fn removes_classes_below_minimum() {
        let ds = with_class_sizes(&[("one", 1), ("three", 3), ("four", 4), ("ten", 10)]);
        let out = remove_small_classes(&ds, "star", 4);

        assert_eq!(out.dataset.len(), 14);
        let remaining: BTreeSet<&CellValue> = out.dataset.column("star").collect();
        assert_eq!(
            remaining,
            [CellValue::String("four".into()), CellValue::String("ten".into())]
                .iter()
                .collect()
        );
        assert_eq!(out.removed.len(), 2);
        assert_eq!(out.removed[&CellValue::String("one".into())], 1);
        assert_eq!(out.removed[&CellValue::String("three".into())], 3);
    }

    #[test]
    fn keeps_row_ids_and_order() {
        let ds = with_class_sizes(&[("a", 4), ("b", 2), ("c", 5)]);
        let out = remove_small_classes(&ds, "star", 4);
        let ids: Vec<usize> = out.dataset.records.iter().map(|r| r.row_id).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 6, 7, 8, 9, 10]);
    }

    #[test]
    fn everything_removed_is_not_an_error() {
        let ds = with_class_sizes(&[("a", 1), ("b", 2)]);
        let out = remove_small_classes(&ds, "star", DEFAULT_MIN_CLASS_COUNT);
        assert!(out.dataset.is_empty());
        assert_eq!(out.removed.len(), 2);
    }

    #[test]
    fn empty_selection_hides_everything() {
        let ds = with_class_sizes(&[("a", 3)]);
        let mut filters = FilterState::new();
        filters.insert("star".into(), BTreeSet::new());
        assert!(filtered_indices(&ds, &filters).is_empty());
    }
}
