use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use strata_sample::data::loader::load_dataset;
use strata_sample::data::model::{CellValue, Dataset};
use strata_sample::data::writer::save_dataset;
use strata_sample::pipeline;
use strata_sample::{ErrorCategory, SampleConfig, SampleError};

/// `artist,star,heart` with `classes` star values of `per_class` rows each,
/// rows interleaved so classes are not contiguous.
fn write_balanced(dir: &Path, classes: usize, per_class: usize) -> PathBuf {
    let mut text = String::from("artist,star,heart\n");
    for i in 0..classes * per_class {
        text.push_str(&format!("artist-{i},{},{}\n", i % classes + 1, (i * 37) % 1000));
    }
    let path = dir.join("artists.csv");
    std::fs::write(&path, text).unwrap();
    path
}

fn config(input: PathBuf, output: PathBuf, sample_size: i64) -> SampleConfig {
    SampleConfig {
        input,
        output,
        sample_size,
        ..SampleConfig::default()
    }
}

#[test]
fn balanced_classes_sample_evenly() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_balanced(dir.path(), 5, 200);
    let output = dir.path().join("200samples.csv");

    let report = pipeline::run(&config(input, output.clone(), 200)).unwrap();
    assert_eq!(report.rows_sampled, 200);
    assert!(report.removed_classes.is_empty());

    let sample = load_dataset(&output).unwrap();
    assert_eq!(sample.len(), 200);
    assert_eq!(sample.column_names, vec!["artist", "star", "heart"]);

    for (_, n) in sample.value_counts("star") {
        assert!((39..=41).contains(&n), "class has {n} rows");
    }

    let header = std::fs::read_to_string(&output).unwrap();
    assert!(header.starts_with("artist,star,heart\n"));
}

#[test]
fn sample_rows_come_from_input_without_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_balanced(dir.path(), 3, 40);
    let output = dir.path().join("out.csv");
    pipeline::run(&config(input.clone(), output.clone(), 25)).unwrap();

    let source: BTreeSet<String> = load_dataset(&input)
        .unwrap()
        .column("artist")
        .map(|v| v.to_string())
        .collect();
    let picked: Vec<String> = load_dataset(&output)
        .unwrap()
        .column("artist")
        .map(|v| v.to_string())
        .collect();

    assert_eq!(picked.len(), 25);
    let unique: BTreeSet<&String> = picked.iter().collect();
    assert_eq!(unique.len(), 25);
    assert!(picked.iter().all(|a| source.contains(a)));
}

#[test]
fn same_inputs_give_identical_files() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_balanced(dir.path(), 4, 30);

    for ext in ["csv", "json", "parquet"] {
        let first = dir.path().join(format!("first.{ext}"));
        let second = dir.path().join(format!("second.{ext}"));
        pipeline::run(&config(input.clone(), first.clone(), 40)).unwrap();
        pipeline::run(&config(input.clone(), second.clone(), 40)).unwrap();
        assert_eq!(
            std::fs::read(&first).unwrap(),
            std::fs::read(&second).unwrap(),
            "{ext} outputs differ"
        );
    }
}

#[test]
fn different_seed_changes_the_sample() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_balanced(dir.path(), 2, 100);
    let a = dir.path().join("a.csv");
    let b = dir.path().join("b.csv");

    pipeline::run(&config(input.clone(), a.clone(), 20)).unwrap();
    pipeline::run(&SampleConfig {
        seed: 1234,
        ..config(input, b.clone(), 20)
    })
    .unwrap();

    assert_ne!(std::fs::read(&a).unwrap(), std::fs::read(&b).unwrap());
}

#[test]
fn class_filter_drops_small_classes_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let mut rows = Vec::new();
    for (star, n) in [(1, 1), (2, 3), (3, 4), (4, 10)] {
        for i in 0..n {
            rows.push(vec![
                CellValue::String(format!("artist-{star}-{i}")),
                CellValue::Integer(star),
            ]);
        }
    }
    let input = dir.path().join("artists.parquet");
    save_dataset(
        &Dataset::from_rows(vec!["artist".into(), "star".into()], rows),
        &input,
    )
    .unwrap();
    let output = dir.path().join("out.parquet");

    let report = pipeline::run(&config(input, output.clone(), 7)).unwrap();
    let removed: BTreeMap<CellValue, usize> =
        [(CellValue::Integer(1), 1), (CellValue::Integer(2), 3)].into();
    assert_eq!(report.removed_classes, removed);
    assert_eq!(report.rows_after_filter, 14);

    let sample = load_dataset(&output).unwrap();
    let stars: BTreeSet<CellValue> = sample.column("star").cloned().collect();
    assert_eq!(
        stars,
        [CellValue::Integer(3), CellValue::Integer(4)].into()
    );
}

#[test]
fn loader_failures() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("out.csv");

    let err = pipeline::run(&config(dir.path().join("nghesi.csv"), output.clone(), 5)).unwrap_err();
    assert!(matches!(err, SampleError::NotFound(_)));
    assert_eq!(err.category(), ErrorCategory::NotFound);

    let empty = dir.path().join("empty.csv");
    std::fs::write(&empty, "artist,star\n").unwrap();
    let err = pipeline::run(&config(empty, output.clone(), 5)).unwrap_err();
    assert!(matches!(err, SampleError::EmptyData(_)));

    assert!(!output.exists());
}

#[test]
fn validation_failures_write_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_balanced(dir.path(), 5, 10);
    let output = dir.path().join("out.csv");

    let err = pipeline::run(&SampleConfig {
        stratify_column: "genre".into(),
        ..config(input.clone(), output.clone(), 10)
    })
    .unwrap_err();
    assert!(matches!(err, SampleError::ColumnNotFound(_)));

    for size in [0, -1, 51] {
        let err = pipeline::run(&config(input.clone(), output.clone(), size)).unwrap_err();
        assert!(
            matches!(err, SampleError::InvalidSampleSize { .. }),
            "size {size}: {err}"
        );
        assert_eq!(err.category(), ErrorCategory::InvalidValue);
    }

    let err = pipeline::run(&config(input, output.clone(), 4)).unwrap_err();
    assert!(matches!(
        err,
        SampleError::InsufficientSampleSize { requested: 4, classes: 5 }
    ));

    assert!(!output.exists());
}

#[test]
fn missing_stratum_value_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("artists.csv");
    std::fs::write(&input, "artist,star\nAn,5\nBinh,\nChi,4\n").unwrap();
    let output = dir.path().join("out.csv");

    let err = pipeline::run(&config(input, output, 2)).unwrap_err();
    assert!(matches!(
        err,
        SampleError::MissingValue { count: 1, first_row: 1, .. }
    ));
}

#[test]
fn failed_run_keeps_previous_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_balanced(dir.path(), 2, 10);
    let output = dir.path().join("out.csv");
    std::fs::write(&output, "previous\n").unwrap();

    assert!(pipeline::run(&config(input, output.clone(), 99)).is_err());
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "previous\n");
}
