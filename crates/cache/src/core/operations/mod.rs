//! Cache operations module

mod batch;
mod get;
mod misc;
mod put;
mod remove;
pub(super) mod utils;

// Operations are implemented directly on the Cache type
