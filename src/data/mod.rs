/// Data layer: core types, recording loading and filename parameters.
///
/// Architecture:
/// ```text
///  V50_A45_M12_R01_spruce_hss_CH03.txt
///        │                      │
///        ▼                      ▼
///   ┌──────────┐          ┌──────────┐
///   │  params   │          │  loader   │  delimited table → Recording
///   └──────────┘          └──────────┘
///        │                      │
///        ▼                      ▼
///   ┌────────────────────────────────┐
///   │ model: Parameters, Recording,   │
///   │ Window, RuctResult, FileRecord  │
///   └────────────────────────────────┘
/// ```

pub mod loader;
pub mod model;
pub mod params;
