pub mod decoder;
mod error;
pub mod index;
pub mod rng;
pub mod sampler;

pub use decoder::{DecodeError, DurationProbe, SymphoniaProbe};
pub use error::Error;
pub use index::{sync, SyncOptions, SyncReport};
pub use sampler::{generate, GeneratedSampleSet, SampleRequest};

/// Seed used when the caller does not pick one.
pub const DEFAULT_SEED: &str = "Ax389a684067za5e1c2172c686958565e8m";
