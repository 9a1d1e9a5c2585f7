//! Core error types for the `tiercache` workspace.
//!
//! Every crate in the workspace reports failures through the [`Error`] enum
//! defined here, so the persistent tier, the circuit breaker and the cache
//! orchestrator can classify a failure without string matching.
//!
//! ## Key Components
//!
//! - **`errors`**: The `Error` enum, the `Result` alias and the
//!   [`RecoveryHint`] attached to each failure mode.

pub mod errors;

pub use self::errors::{Error, RecoveryHint, Result};
