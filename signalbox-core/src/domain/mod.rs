//! Domain types: bars, series, frames, signal series.

pub mod bar;
pub mod frame;
pub mod series;
pub mod signal;

pub use bar::Bar;
pub use frame::{Frame, FrameError, REQUIRED_COLUMNS};
pub use series::Series;
pub use signal::SignalSeries;
