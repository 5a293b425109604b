use std::collections::BTreeMap;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::GenerateError;
use crate::model::profile::{ProbabilityRow, Profile};
use crate::model::unit::{join, Unit};

/// Precomputed cumulative distribution over a probability row.
///
/// Outcomes keep the row's stable iteration order; a draw is one uniform
/// sample plus a `partition_point` binary search, O(log k) over k outcomes.
#[derive(Debug, Clone)]
struct CumulativeRow<T> {
    outcomes: Vec<T>,
    cumulative: Vec<f64>,
}

impl<T: Clone> CumulativeRow<T> {
    /// Builds the running-sum table. The row must be non-empty, which the
    /// profile validation guarantees for every stored table.
    fn new<'a>(row: impl Iterator<Item = (&'a T, &'a f64)>) -> Self
    where
        T: 'a,
    {
        let mut outcomes = Vec::new();
        let mut cumulative = Vec::new();
        let mut total = 0.0;
        for (outcome, weight) in row {
            total += weight;
            outcomes.push(outcome.clone());
            cumulative.push(total);
        }
        Self {
            outcomes,
            cumulative,
        }
    }

    fn draw(&self, rng: &mut StdRng) -> &T {
        let total = *self.cumulative.last().unwrap_or(&0.0);
        let x = rng.random::<f64>() * total;
        let index = self.cumulative.partition_point(|&sum| sum <= x);
        // Rounding can push x past the last running sum; clamp to the final
        // outcome instead of indexing out of bounds.
        &self.outcomes[index.min(self.outcomes.len() - 1)]
    }
}

/// Sampling tables shared between a generator and its streams.
#[derive(Debug)]
struct SamplingTables {
    profile: Arc<Profile>,
    lengths: CumulativeRow<usize>,
    transitions: BTreeMap<Vec<Unit>, CumulativeRow<Unit>>,
    global_units: CumulativeRow<Unit>,
}

impl SamplingTables {
    /// Draws one complete value: target length first, then units from the
    /// transition table until the length is reached or `End` is drawn.
    fn draw_value(&self, rng: &mut StdRng) -> String {
        let target_length = *self.lengths.draw(rng);
        let mut context = vec![Unit::Start; self.profile.order()];
        let mut units: Vec<Unit> = Vec::with_capacity(target_length);

        while units.len() < target_length {
            let next = match self.transitions.get(&context) {
                Some(row) => row.draw(rng).clone(),
                None => {
                    // Only reachable with smoothing disabled. Documented
                    // fallback: draw from the global unit frequencies, which
                    // never contain End, so generation still terminates at
                    // the target length.
                    let label: String = context.iter().map(Unit::to_string).collect();
                    tracing::debug!(
                        context = %label,
                        "unseen context, falling back to global unit frequencies"
                    );
                    self.global_units.draw(rng).clone()
                }
            };
            if next == Unit::End {
                break;
            }
            context.remove(0);
            context.push(next.clone());
            units.push(next);
        }

        join(&units, self.profile.scheme())
    }
}

fn make_rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

/// Samples new values from a frozen [`Profile`].
///
/// Construction validates the profile and precomputes every cumulative
/// distribution once; after that, generation is pure in-memory sampling
/// with no locking and no I/O. A generator never reads the original sample
/// corpus; the profile is its entire world.
///
/// Seeded calls are exactly reproducible; unseeded calls take entropy from
/// the OS. Independent calls carry independent random state, so concurrent
/// generation from one shared generator needs no coordination.
#[derive(Debug)]
pub struct Generator {
    tables: Arc<SamplingTables>,
}

impl Generator {
    /// Builds the sampling tables for a profile.
    ///
    /// # Errors
    /// Fails when the profile does not validate, in particular when a table
    /// required for sampling is missing. A generator never substitutes a
    /// replacement model.
    pub fn new(profile: Arc<Profile>) -> Result<Self, GenerateError> {
        profile.validate()?;

        let lengths = CumulativeRow::new(profile.length_distribution().iter());
        let transitions = profile
            .transitions
            .iter()
            .map(|(context, row)| (context.clone(), CumulativeRow::new(row.iter())))
            .collect();
        let global_units = CumulativeRow::new(non_marker(profile.global_units()));

        Ok(Self {
            tables: Arc::new(SamplingTables {
                profile,
                lengths,
                transitions,
                global_units,
            }),
        })
    }

    /// The profile this generator samples from.
    pub fn profile(&self) -> &Profile {
        &self.tables.profile
    }

    /// Generates `count` values.
    ///
    /// With `Some(seed)` the returned sequence is a pure function of the
    /// profile and the seed; with `None` each call is independently random.
    pub fn generate(&self, count: usize, seed: Option<u64>) -> Vec<String> {
        let mut rng = make_rng(seed);
        (0..count).map(|_| self.tables.draw_value(&mut rng)).collect()
    }

    /// Returns an unbounded lazy stream of values.
    ///
    /// The stream owns only the shared sampling tables and its own random
    /// state: dropping it is the termination protocol, and re-creating it
    /// with the same seed replays the exact sequence.
    pub fn stream(&self, seed: Option<u64>) -> Samples {
        Samples {
            tables: Arc::clone(&self.tables),
            rng: make_rng(seed),
        }
    }
}

/// Filters boundary markers out of a probability row.
fn non_marker(row: &ProbabilityRow) -> impl Iterator<Item = (&Unit, &f64)> {
    row.iter().filter(|(unit, _)| !unit.is_marker())
}

/// Infinite iterator of generated values, created by [`Generator::stream`].
#[derive(Debug)]
pub struct Samples {
    tables: Arc<SamplingTables>,
    rng: StdRng,
}

impl Iterator for Samples {
    type Item = String;

    /// Never returns `None`; the caller stops by dropping the iterator.
    fn next(&mut self) -> Option<String> {
        Some(self.tables.draw_value(&mut self.rng))
    }
}
