/// Data layer: dataset type, parquet loading, clutch filtering and output.
///
/// Architecture:
/// ```text
///  play_by_play_{season}.parquet  (one per season)
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  decode → concat seasons (schema union)
///   └──────────┘
///        │
///        ▼
///   ┌────────────┐
///   │ PlayByPlay  │  schema + Vec<RecordBatch>
///   └────────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  clutch predicate → narrowed PlayByPlay
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  writer   │  .parquet / .csv
///   └──────────┘
/// ```

pub mod filter;
pub mod loader;
pub mod model;
pub mod writer;
