//! Write a synthetic artist table for trying out `strata-sample`.
//!
//! Usage: `generate_sample [OUTPUT] [ROWS]` (defaults: `data/artists.csv`, 1000).
//! The extension of OUTPUT picks the format (.csv, .json, .parquet).

use std::path::PathBuf;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use strata_sample::data::model::{CellValue, Dataset};
use strata_sample::data::writer::save_dataset;

/// Star ratings with their relative weights. Rating 0 is rare enough that
/// the class filter usually drops it.
const STAR_WEIGHTS: [(i64, u32); 6] = [(0, 1), (1, 60), (2, 120), (3, 300), (4, 320), (5, 199)];
const WORDS: [&str; 3] = ["short", "medium", "long"];
const FIRST: [&str; 8] = ["Minh", "Lan", "Tuan", "Hoa", "Quang", "Thu", "Bao", "Linh"];
const LAST: [&str; 6] = ["Nguyen", "Tran", "Le", "Pham", "Vu", "Dang"];

fn pick_star(rng: &mut StdRng) -> i64 {
    let total: u32 = STAR_WEIGHTS.iter().map(|(_, w)| w).sum();
    let mut roll = rng.gen_range(0..total);
    for (star, weight) in STAR_WEIGHTS {
        if roll < weight {
            return star;
        }
        roll -= weight;
    }
    STAR_WEIGHTS[STAR_WEIGHTS.len() - 1].0
}

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let output = PathBuf::from(args.next().unwrap_or_else(|| "data/artists.csv".to_string()));
    let rows: usize = match args.next() {
        Some(n) => n.parse().with_context(|| format!("'{n}' is not a row count"))?,
        None => 1000,
    };

    if let Some(dir) = output.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }

    let mut rng = StdRng::seed_from_u64(42);
    let columns = vec![
        "artist".to_string(),
        "star".to_string(),
        "heart".to_string(),
        "words".to_string(),
    ];

    let table: Vec<Vec<CellValue>> = (0..rows)
        .map(|i| {
            let star = pick_star(&mut rng);
            // better rated artists collect more hearts
            let heart = (star * 150 + rng.gen_range(0..400)).max(0);
            let name = format!(
                "{} {} #{}",
                FIRST[rng.gen_range(0..FIRST.len())],
                LAST[rng.gen_range(0..LAST.len())],
                i % 97
            );
            vec![
                CellValue::String(name),
                CellValue::Integer(star),
                CellValue::Integer(heart),
                CellValue::String(WORDS[rng.gen_range(0..WORDS.len())].to_string()),
            ]
        })
        .collect();

    let dataset = Dataset::from_rows(columns, table);
    save_dataset(&dataset, &output)?;

    println!("Wrote {} artists to {}", dataset.len(), output.display());
    Ok(())
}
