//! Referential record generation for unifill.
//!
//! A [`ReferentialGenerator`] reads the key populations of parent tables once,
//! draws foreign keys from them, rejects candidates whose unique key is already
//! taken and streams the accepted records into the batched loader.

pub mod errors;
pub mod model;
pub mod orchestrator;
pub mod population;
pub mod synth;
pub mod tracker;
pub mod university;

pub use errors::GenerationError;
pub use model::{
    DEFAULT_ATTEMPT_FACTOR, GenerateOptions, GenerationOutcome, GenerationRequest, Reference,
    Target,
};
pub use orchestrator::{ReferentialGenerator, table_seed};
pub use population::KeyPopulation;
pub use synth::{Draw, RecordSynthesizer};
pub use tracker::UniquenessTracker;
