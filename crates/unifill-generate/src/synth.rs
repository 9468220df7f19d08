use rand_chacha::ChaCha8Rng;

use unifill_core::{Record, Value};

static NULL: Value = Value::Null;

/// Inputs handed to a [`RecordSynthesizer`] for one candidate record.
#[derive(Debug, Clone)]
pub struct Draw<'a> {
    /// Records accepted so far in this run.
    pub index: u64,
    /// Records accepted so far for the current parent key; equals `index`
    /// for plain row targets.
    pub slot: u64,
    /// Candidates produced so far in this run, accepted or not.
    pub attempt: u64,
    keys: Vec<&'a [Value]>,
}

impl<'a> Draw<'a> {
    pub fn new(index: u64, slot: u64, attempt: u64, keys: Vec<&'a [Value]>) -> Self {
        Self {
            index,
            slot,
            attempt,
            keys,
        }
    }

    /// Key tuple drawn for the reference at `reference`.
    pub fn keys(&self, reference: usize) -> &'a [Value] {
        self.keys.get(reference).copied().unwrap_or(&[])
    }

    /// First column of the drawn key, NULL when there is none.
    pub fn key(&self, reference: usize) -> &'a Value {
        self.keys(reference).first().unwrap_or(&NULL)
    }
}

/// Produces one record per call from the drawn keys and the run's RNG.
pub trait RecordSynthesizer {
    fn synthesize(&mut self, draw: &Draw<'_>, rng: &mut ChaCha8Rng) -> Record;
}

impl<F> RecordSynthesizer for F
where
    F: FnMut(&Draw<'_>, &mut ChaCha8Rng) -> Record,
{
    fn synthesize(&mut self, draw: &Draw<'_>, rng: &mut ChaCha8Rng) -> Record {
        self(draw, rng)
    }
}
