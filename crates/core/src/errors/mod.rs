//! Error types and recovery hints for cache operations

mod builders;
mod conversions;
mod recovery;
mod types;

pub use recovery::RecoveryHint;
pub use types::{Error, Result};
