/// Signal layer: conditioning, engagement-window location and peak search.
///
/// Architecture:
/// ```text
///   raw channel
///        │
///        ▼
///   ┌─────────────┐
///   │ conditioner  │  offset removal → Butterworth low-pass
///   └─────────────┘
///        │
///        ▼
///   ┌─────────────┐
///   │   locator    │  max-energy sliding window → (start, stop)
///   └─────────────┘
///        │
///        ▼
///   ┌─────────────┐
///   │   prepare    │  axis sign + both of the above
///   └─────────────┘
///
///   distance channel ──► peaks  (local maxima, min spacing)
/// ```

pub mod conditioner;
pub mod locator;
pub mod peaks;
pub mod prepare;
pub mod stats;
