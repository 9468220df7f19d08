use rand::Rng;
use tracing::debug;

use unifill_core::{KeySource, Value};
use unifill_load::Session;

use crate::errors::GenerationError;
use crate::model::Reference;

/// Snapshot of the key tuples of one parent source, read once per run.
#[derive(Debug, Clone)]
pub struct KeyPopulation {
    source: KeySource,
    optional: bool,
    keys: Vec<Vec<Value>>,
    nulls: Vec<Value>,
}

impl KeyPopulation {
    pub fn new(reference: &Reference, keys: Vec<Vec<Value>>) -> Self {
        Self {
            nulls: vec![Value::Null; reference.source.columns.len()],
            source: reference.source.clone(),
            optional: reference.optional,
            keys,
        }
    }

    /// Read the population of `reference`.
    ///
    /// An empty required population is an error for `table`, raised before
    /// anything is written.
    pub async fn fetch<S>(
        session: &mut S,
        table: &str,
        reference: &Reference,
    ) -> Result<Self, GenerationError>
    where
        S: Session + ?Sized,
    {
        let keys = session.fetch_keys(&reference.source).await?;
        debug!(
            event = "population_fetched",
            table = %table,
            source = %reference.source.describe(),
            keys = keys.len(),
            optional = reference.optional
        );
        if keys.is_empty() && !reference.optional {
            return Err(GenerationError::EmptyPopulation {
                table: table.to_string(),
                keys: reference.source.describe(),
            });
        }
        Ok(Self::new(reference, keys))
    }

    pub fn source(&self) -> &KeySource {
        &self.source
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[Vec<Value>] {
        &self.keys
    }

    pub fn get(&self, index: usize) -> Option<&[Value]> {
        self.keys.get(index).map(Vec::as_slice)
    }

    pub fn contains(&self, key: &[Value]) -> bool {
        self.keys.iter().any(|candidate| candidate.as_slice() == key)
    }

    /// Uniformly pick one key tuple; an empty population yields NULLs.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> &[Value] {
        if self.keys.is_empty() {
            return &self.nulls;
        }
        &self.keys[rng.random_range(0..self.keys.len())]
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn samples_only_fetched_keys() {
        let reference = Reference::required(KeySource::column("professors", "professor_id"));
        let population = KeyPopulation::new(
            &reference,
            (1..=5).map(|id| vec![Value::Int(id)]).collect(),
        );
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..100 {
            let key = population.sample(&mut rng);
            assert!(population.contains(key));
        }
    }

    #[test]
    fn empty_optional_population_yields_nulls() {
        let source =
            KeySource::new("professor_course_assignments", ["course_id", "professor_id"]).unwrap();
        let population = KeyPopulation::new(&Reference::optional(source), Vec::new());
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        assert_eq!(population.sample(&mut rng), &[Value::Null, Value::Null]);
    }
}
