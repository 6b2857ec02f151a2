/// Data layer: flag vocabularies, row loading, selection and decoding.
///
/// Architecture:
/// ```text
///  .parquet / .json / .csv          RecordSelector
///        │                          (flags, order, limit)
///        ▼                                 │
///   ┌──────────┐    fetch(selector)        │
///   │  loader   │ ◄────────────────────────┘
///   └──────────┘
///        │  Vec<RawRow>
///        ▼
///   ┌──────────┐    ExtendedDecoder
///   │ builder   │ ◄── 10-byte slots → f64
///   └──────────┘
///        │
///        ▼
///   Vec<RowOutcome>  (Decoded | Fallback) → Measurement
/// ```

pub mod builder;
pub mod extended;
pub mod filter;
pub mod flags;
pub mod loader;
pub mod model;
