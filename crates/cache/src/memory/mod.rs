//! Memory pressure sampling and classification

mod pressure;
mod sampler;

pub use pressure::{MemoryPressureDetector, MemoryPressureLevel};
pub use sampler::{MemorySample, MemorySampler, SystemMemorySampler};
