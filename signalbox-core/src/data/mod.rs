//! Market data: the CSV catalog, quality checks, and synthetic series
//! for tests and demos.

pub mod store;
pub mod synthetic;
pub mod validate;

pub use store::{DataError, MarketData};
pub use synthetic::random_walk;
pub use validate::{validate_frame, Issue, ValidationReport};
