/// Data layer: core types, loading, validation, filtering, sampling and writing.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse file → Dataset (fails if missing or empty)
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ validate  │  column present, no nulls, 0 < size <= rows
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  drop classes below the minimum count
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ validate  │  size <= remaining rows, size >= classes
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ sampler   │  seeded stratified split → sample positions
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  writer   │  sample → file (atomic replace)
///   └──────────┘
/// ```
///
/// `stats` computes the descriptive tables printed by the `stats` command.

pub mod columnar;
pub mod filter;
pub mod loader;
pub mod model;
pub mod sampler;
pub mod stats;
pub mod validate;
pub mod writer;
