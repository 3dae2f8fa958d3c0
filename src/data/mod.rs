/// Data layer: histograms, event records, loading, and selection cuts.
///
/// Architecture:
/// ```text
///  calibration .parquet / .json / .csv      events .json
///        │                                      │
///        ▼                                      ▼
///   ┌──────────┐                          ┌──────────┐
///   │  loader   │  parse → HistogramStore │  loader   │  → Vec<EventRecord>
///   └──────────┘                          └──────────┘
///        │                                      │
///        ▼                                      ▼
///   ┌──────────────┐                      ┌──────────┐
///   │ CalibrationSet│ (pid module)         │  filter   │  event / candidate cuts
///   └──────────────┘                      └──────────┘
/// ```

pub mod filter;
pub mod histogram;
pub mod loader;
pub mod model;
