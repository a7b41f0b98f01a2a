use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use parquet::arrow::ArrowWriter;
use serde_json::{Map, Number, Value as JsonValue};
use tempfile::Builder;

use super::columnar::to_record_batch;
use super::model::{CellValue, Dataset};
use crate::error::SampleError;

/// Write `dataset` to `path`, replacing any existing file.
///
/// The table is first written to a temporary file next to `path` and then
/// renamed over it, so a failure never leaves a truncated output behind.
/// Column order is kept and no row-index column is written.
pub fn save_dataset(dataset: &Dataset, path: &Path) -> Result<(), SampleError> {
    write_file(dataset, path).map_err(|e| SampleError::Save {
        path: path.to_path_buf(),
        reason: format!("{e:#}"),
    })?;
    log::info!("Wrote {} rows to {}", dataset.len(), path.display());
    Ok(())
}

fn write_file(dataset: &Dataset, path: &Path) -> Result<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = scratch_builder()
        .tempfile_in(dir)
        .with_context(|| format!("creating temporary file in {}", dir.display()))?;

    match ext.as_str() {
        "csv" => write_csv(dataset, tmp.as_file_mut())?,
        "json" => write_json(dataset, tmp.as_file_mut())?,
        "parquet" | "pq" => write_parquet(dataset, tmp.as_file_mut())?,
        other => bail!("Unsupported file extension: .{other}"),
    }

    // A replaced output keeps its mode.
    if let Ok(existing) = std::fs::metadata(path) {
        tmp.as_file()
            .set_permissions(existing.permissions())
            .context("copying permissions of the existing output")?;
    }
    tmp.as_file().sync_all().context("flushing output")?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .context("moving output into place")?;
    Ok(())
}

/// Scratch files get the mode a plain `File::create` would (0666 minus the
/// umask) instead of tempfile's private 0600.
fn scratch_builder() -> Builder<'static, 'static> {
    #[allow(unused_mut)]
    let mut builder = Builder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }
    builder
}

// ---------------------------------------------------------------------------
// Per-format writers
// ---------------------------------------------------------------------------

fn write_csv<W: Write>(dataset: &Dataset, out: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(BufWriter::new(out));
    writer
        .write_record(&dataset.column_names)
        .context("writing CSV header")?;
    for record in &dataset.records {
        let row: Vec<String> = dataset
            .column_names
            .iter()
            .map(|c| record.get(c).to_field())
            .collect();
        writer
            .write_record(&row)
            .with_context(|| format!("writing CSV row {}", record.row_id))?;
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

fn write_json<W: Write>(dataset: &Dataset, out: W) -> Result<()> {
    let rows: Vec<JsonValue> = dataset
        .records
        .iter()
        .map(|record| {
            let obj: Map<String, JsonValue> = dataset
                .column_names
                .iter()
                .map(|c| (c.clone(), cell_to_json(record.get(c))))
                .collect();
            JsonValue::Object(obj)
        })
        .collect();

    let mut out = BufWriter::new(out);
    serde_json::to_writer_pretty(&mut out, &rows).context("writing JSON")?;
    out.write_all(b"\n")?;
    out.flush().context("flushing JSON")?;
    Ok(())
}

fn cell_to_json(value: &CellValue) -> JsonValue {
    match value {
        CellValue::String(s) | CellValue::Date(s) => JsonValue::String(s.clone()),
        CellValue::Integer(i) => JsonValue::from(*i),
        CellValue::Float(f) => Number::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        CellValue::Bool(b) => JsonValue::Bool(*b),
        CellValue::Null => JsonValue::Null,
    }
}

fn write_parquet<W: Write + Send>(dataset: &Dataset, out: W) -> Result<()> {
    let batch = to_record_batch(dataset)?;
    let mut writer =
        ArrowWriter::try_new(out, batch.schema(), None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::load_dataset;

    fn artists() -> Dataset {
        Dataset::from_rows(
            vec!["artist".into(), "star".into(), "heart".into()],
            vec![
                vec![
                    CellValue::String("An, Jr.".into()),
                    CellValue::Integer(5),
                    CellValue::Float(812.5),
                ],
                vec![
                    CellValue::String("Binh".into()),
                    CellValue::Integer(3),
                    CellValue::Null,
                ],
            ],
        )
    }

    #[test]
    fn csv_has_header_and_no_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        save_dataset(&artists(), &path).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            text,
            "artist,star,heart\n\"An, Jr.\",5,812.5\nBinh,3,\n"
        );
    }

    #[test]
    fn overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        std::fs::write(&path, "stale contents that are longer than the new file\n".repeat(20))
            .unwrap();
        save_dataset(&artists(), &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("artist,star,heart\n"));
        assert!(!text.contains("stale"));
    }

    #[test]
    fn json_and_parquet_read_back() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["out.json", "out.parquet"] {
            let path = dir.path().join(name);
            save_dataset(&artists(), &path).unwrap();
            let back = load_dataset(&path).unwrap();
            assert_eq!(back.column_names, vec!["artist", "star", "heart"]);
            assert_eq!(back.len(), 2);
            assert_eq!(back.records[0].get("artist"), &CellValue::String("An, Jr.".into()));
            assert_eq!(back.records[0].get("heart"), &CellValue::Float(812.5));
            assert!(back.records[1].get("heart").is_null());
        }
    }

    #[cfg(unix)]
    #[test]
    fn output_mode_follows_umask_or_existing_file() {
        use std::os::unix::fs::PermissionsExt;

        let mode = |p: &Path| std::fs::metadata(p).unwrap().permissions().mode() & 0o777;
        let dir = tempfile::tempdir().unwrap();

        let plain = dir.path().join("plain.csv");
        std::fs::write(&plain, "x\n").unwrap();
        let fresh = dir.path().join("fresh.csv");
        save_dataset(&artists(), &fresh).unwrap();
        assert_eq!(mode(&fresh), mode(&plain));

        let shared = dir.path().join("shared.csv");
        std::fs::write(&shared, "previous\n").unwrap();
        std::fs::set_permissions(&shared, std::fs::Permissions::from_mode(0o640)).unwrap();
        save_dataset(&artists(), &shared).unwrap();
        assert_eq!(mode(&shared), 0o640);
    }

    #[test]
    fn missing_directory_is_save_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no_such_dir").join("out.csv");
        let err = save_dataset(&artists(), &path).unwrap_err();
        assert!(matches!(err, SampleError::Save { .. }));
        assert!(!path.exists());
    }

    #[test]
    fn unsupported_extension_leaves_nothing_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.xlsx");
        let err = save_dataset(&artists(), &path).unwrap_err();
        assert!(matches!(err, SampleError::Save { .. }));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
