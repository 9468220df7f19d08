use serde::Serialize;

use unifill_core::{KeySource, WriteOperation};
use unifill_load::{BatchBound, LoadReport};

/// Rejection sampling gives up after this many attempts per requested record.
pub const DEFAULT_ATTEMPT_FACTOR: u64 = 5;

/// A parent key population the generated records point into.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reference {
    pub source: KeySource,
    /// An optional reference draws NULLs when its population is empty.
    pub optional: bool,
}

impl Reference {
    pub fn required(source: KeySource) -> Self {
        Self {
            source,
            optional: false,
        }
    }

    pub fn optional(source: KeySource) -> Self {
        Self {
            source,
            optional: true,
        }
    }
}

/// How many records a run asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    /// A fixed number of records.
    Rows(u64),
    /// `per_key` records for every key of `references[reference]`, which is
    /// pinned to that key instead of sampled.
    PerKey { reference: usize, per_key: u64 },
}

/// Everything needed to generate and load one table.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub operation: WriteOperation,
    pub target: Target,
    pub references: Vec<Reference>,
    /// Column group that must never repeat, neither among new records nor
    /// against rows already stored.
    pub unique: Option<Vec<String>>,
    pub seed: u64,
}

impl GenerationRequest {
    pub fn new(operation: WriteOperation, target: Target) -> Self {
        Self {
            operation,
            target,
            references: Vec::new(),
            unique: None,
            seed: 0,
        }
    }

    pub fn reference(mut self, reference: Reference) -> Self {
        self.references.push(reference);
        self
    }

    pub fn unique<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unique = Some(columns.into_iter().map(Into::into).collect());
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Options shared by every run of a [`crate::ReferentialGenerator`].
#[derive(Debug, Clone, Copy)]
pub struct GenerateOptions {
    /// Attempt cap for uniqueness-constrained runs, as a multiple of the
    /// requested count.
    pub attempt_factor: u64,
    pub batch: BatchBound,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            attempt_factor: DEFAULT_ATTEMPT_FACTOR,
            batch: BatchBound::default(),
        }
    }
}

/// Result of one generation-and-load run.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationOutcome {
    pub table: String,
    pub requested: u64,
    /// Records accepted by the generator and handed to the loader.
    pub generated: u64,
    pub attempts: u64,
    /// Candidates dropped because their unique key was already taken.
    pub rejected: u64,
    pub load: LoadReport,
}

impl GenerationOutcome {
    /// Records the generator could not produce within the attempt cap.
    pub fn shortfall(&self) -> u64 {
        self.requested.saturating_sub(self.generated)
    }

    pub fn written(&self) -> u64 {
        self.load.written
    }

    pub fn skipped(&self) -> u64 {
        self.load.skipped
    }
}
