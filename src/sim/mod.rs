/// Tick clock and pacing.
pub mod clock;
pub mod engine;
/// Aggregate run statistics.
pub mod summary;
pub mod types;
