use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info, warn};

use unifill_load::{BatchedLoader, LoadSink, Session};

use crate::errors::GenerationError;
use crate::model::{GenerateOptions, GenerationOutcome, GenerationRequest, Target};
use crate::population::KeyPopulation;
use crate::synth::{Draw, RecordSynthesizer};
use crate::tracker::UniquenessTracker;

/// Generates records whose foreign keys come from stored parent keys and
/// streams them into a [`BatchedLoader`].
#[derive(Debug, Clone, Default)]
pub struct ReferentialGenerator {
    options: GenerateOptions,
}

#[derive(Debug, Default)]
struct Counters {
    generated: u64,
    attempts: u64,
    rejected: u64,
}

impl ReferentialGenerator {
    pub fn new(options: GenerateOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &GenerateOptions {
        &self.options
    }

    /// Run one request to completion.
    ///
    /// Every key population is read before the first write; an empty required
    /// one aborts the run with nothing written. With a unique column group the
    /// run stops after `attempt_factor` times the requested count of
    /// candidates and reports the shortfall.
    pub async fn run<S, G>(
        &self,
        session: &mut S,
        request: &GenerationRequest,
        synth: &mut G,
    ) -> Result<GenerationOutcome, GenerationError>
    where
        S: Session + ?Sized,
        G: RecordSynthesizer + ?Sized,
    {
        let op = &request.operation;
        let table = op.table();

        if let Target::PerKey { reference, .. } = request.target
            && reference >= request.references.len()
        {
            return Err(GenerationError::InvalidRequest(format!(
                "'{table}' fans out over reference #{reference} but declares only {}",
                request.references.len()
            )));
        }
        let mut tracker = match &request.unique {
            Some(columns) => Some(UniquenessTracker::new(op, columns)?),
            None => None,
        };

        let mut populations = Vec::with_capacity(request.references.len());
        for reference in &request.references {
            populations.push(KeyPopulation::fetch(session, table, reference).await?);
        }
        if let Some(tracker) = tracker.as_mut() {
            let seeded = tracker.seed(session).await?;
            debug!(
                event = "tracker_seeded",
                table = %table,
                columns = ?tracker.columns(),
                existing = seeded
            );
        }

        let requested = match request.target {
            Target::Rows(count) => count,
            Target::PerKey { reference, per_key } => {
                per_key.saturating_mul(populations[reference].len() as u64)
            }
        };
        info!(
            event = "generation_started",
            table = %table,
            requested,
            references = populations.len(),
            unique = tracker.is_some(),
            seed = request.seed
        );

        let mut rng = ChaCha8Rng::seed_from_u64(table_seed(request.seed, table));
        let loader = BatchedLoader::new(self.options.batch);
        let mut sink = loader.sink(session, op);
        let mut counters = Counters::default();

        match request.target {
            Target::Rows(count) => {
                let cap = self.attempt_cap(count, tracker.is_some());
                let mut fill = Fill {
                    populations: &populations,
                    tracker: tracker.as_mut(),
                    rng: &mut rng,
                    counters: &mut counters,
                };
                fill.run(&mut sink, synth, None, count, cap).await?;
            }
            Target::PerKey { reference, per_key } => {
                let cap = self.attempt_cap(per_key, tracker.is_some());
                let mut fill = Fill {
                    populations: &populations,
                    tracker: tracker.as_mut(),
                    rng: &mut rng,
                    counters: &mut counters,
                };
                for parent in 0..populations[reference].len() {
                    fill.run(&mut sink, synth, Some((reference, parent)), per_key, cap)
                        .await?;
                }
            }
        }

        let load = sink.finish().await?;
        let outcome = GenerationOutcome {
            table: table.to_string(),
            requested,
            generated: counters.generated,
            attempts: counters.attempts,
            rejected: counters.rejected,
            load,
        };

        if outcome.shortfall() > 0 {
            warn!(
                event = "generation_shortfall",
                table = %table,
                requested,
                generated = outcome.generated,
                shortfall = outcome.shortfall(),
                attempts = outcome.attempts,
                "unique key space exhausted before reaching the requested count"
            );
        }
        info!(
            event = "generation_finished",
            table = %table,
            requested,
            generated = outcome.generated,
            written = outcome.written(),
            skipped = outcome.skipped(),
            shortfall = outcome.shortfall(),
            rejected = outcome.rejected
        );
        Ok(outcome)
    }

    fn attempt_cap(&self, count: u64, unique: bool) -> u64 {
        if unique {
            count.saturating_mul(self.options.attempt_factor.max(1))
        } else {
            count
        }
    }
}

struct Fill<'a> {
    populations: &'a [KeyPopulation],
    tracker: Option<&'a mut UniquenessTracker>,
    rng: &'a mut ChaCha8Rng,
    counters: &'a mut Counters,
}

impl Fill<'_> {
    /// Accept up to `count` records within `cap` candidates. `pinned` fixes one
    /// reference to a given key instead of sampling it.
    async fn run<S, G>(
        &mut self,
        sink: &mut LoadSink<'_, S>,
        synth: &mut G,
        pinned: Option<(usize, usize)>,
        count: u64,
        cap: u64,
    ) -> Result<(), GenerationError>
    where
        S: Session + ?Sized,
        G: RecordSynthesizer + ?Sized,
    {
        let mut accepted = 0;
        let mut attempts = 0;
        while accepted < count && attempts < cap {
            attempts += 1;

            let rng = &mut *self.rng;
            let keys = self
                .populations
                .iter()
                .enumerate()
                .map(|(index, population)| match pinned {
                    Some((reference, parent)) if reference == index => {
                        population.get(parent).unwrap_or(&[])
                    }
                    _ => population.sample(rng),
                })
                .collect();
            let draw = Draw::new(
                self.counters.generated,
                accepted,
                self.counters.attempts,
                keys,
            );
            let record = synth.synthesize(&draw, self.rng);
            self.counters.attempts += 1;

            if let Some(tracker) = self.tracker.as_deref_mut()
                && !tracker.admit(&record)
            {
                self.counters.rejected += 1;
                continue;
            }

            sink.push(record).await?;
            accepted += 1;
            self.counters.generated += 1;
        }
        Ok(())
    }
}

/// Per-table RNG seed derived from the run seed and the table name.
pub fn table_seed(seed: u64, table: &str) -> u64 {
    let mut hash = seed ^ 0xcbf29ce484222325;
    for byte in table.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x100000001b3);
    }
    hash
}
