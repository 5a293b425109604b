use std::collections::BTreeMap;
use std::sync::mpsc;
use std::thread;

use crate::error::BuildError;
use crate::model::profile::{ProbabilityRow, Profile};
use crate::model::unit::{segment, Unit, UnitScheme};

/// Configuration for a profile build.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOptions {
    /// How samples are segmented into units.
    pub scheme: UnitScheme,
    /// Markov context length in units. Must be at least 1.
    pub order: usize,
    /// Additive smoothing constant ε added to every count before
    /// normalization. 0.0 disables smoothing; unseen contexts then rely on
    /// the generator's global-frequency fallback.
    pub smoothing: f64,
    /// Free-form description of the sample source, stored in the profile
    /// metadata.
    pub source_label: Option<String>,
}

impl Default for BuildOptions {
    /// Character segmentation, order 1, no smoothing.
    fn default() -> Self {
        Self {
            scheme: UnitScheme::Chars,
            order: 1,
            smoothing: 0.0,
            source_label: None,
        }
    }
}

impl BuildOptions {
    fn validate(&self) -> Result<(), BuildError> {
        if self.order == 0 {
            return Err(BuildError::InvalidOrder);
        }
        if let UnitScheme::Grams(width) = self.scheme {
            if width < 2 {
                return Err(BuildError::InvalidGramWidth);
            }
        }
        if !self.smoothing.is_finite() || self.smoothing < 0.0 {
            return Err(BuildError::InvalidSmoothing(self.smoothing));
        }
        Ok(())
    }
}

/// Accumulates frequency counts from a sample corpus and freezes them into
/// a [`Profile`].
///
/// The builder is the only mutable stage of the pipeline: counts are
/// append-only integers while samples are fed, and normalization happens
/// exactly once in [`freeze`](Self::freeze). Builders with identical options
/// can be [`merge`](Self::merge)d, which is how the parallel build combines
/// per-chunk partials; count addition is commutative, so the merge order
/// never changes the result.
#[derive(Debug, Clone)]
pub struct ProfileBuilder {
    options: BuildOptions,
    sample_count: u64,
    skipped_samples: u64,
    global_units: BTreeMap<Unit, u64>,
    positions: BTreeMap<usize, BTreeMap<Unit, u64>>,
    transitions: BTreeMap<Vec<Unit>, BTreeMap<Unit, u64>>,
    lengths: BTreeMap<usize, u64>,
}

impl ProfileBuilder {
    /// Creates an empty builder.
    ///
    /// # Errors
    /// Fails when the options are invalid: zero order, gram width below 2,
    /// or a negative or non-finite smoothing constant.
    pub fn new(options: BuildOptions) -> Result<Self, BuildError> {
        options.validate()?;
        Ok(Self {
            options,
            sample_count: 0,
            skipped_samples: 0,
            global_units: BTreeMap::new(),
            positions: BTreeMap::new(),
            transitions: BTreeMap::new(),
            lengths: BTreeMap::new(),
        })
    }

    /// Number of samples accumulated so far.
    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    /// Number of samples skipped as unusable so far.
    pub fn skipped_samples(&self) -> u64 {
        self.skipped_samples
    }

    /// Feeds one sample into the frequency tables.
    ///
    /// Unusable samples (empty, or whitespace-only under word segmentation)
    /// are skipped and counted, never fatal: the skip tally ends up in the
    /// profile metadata.
    pub fn feed(&mut self, sample: &str) {
        let units = match segment(sample, self.options.scheme) {
            Ok(units) => units,
            Err(error) => {
                self.skipped_samples += 1;
                tracing::debug!(sample, %error, "skipping unusable sample");
                return;
            }
        };

        for (position, unit) in units.iter().enumerate() {
            *self
                .positions
                .entry(position)
                .or_default()
                .entry(unit.clone())
                .or_insert(0) += 1;
            *self.global_units.entry(unit.clone()).or_insert(0) += 1;
        }

        // Context is the `order` most recent units, Start-padded, slid one
        // unit at a time; the final transition targets End.
        let mut context = vec![Unit::Start; self.options.order];
        for unit in &units {
            self.record_transition(&context, unit.clone());
            context.remove(0);
            context.push(unit.clone());
        }
        self.record_transition(&context, Unit::End);

        *self.lengths.entry(units.len()).or_insert(0) += 1;
        self.sample_count += 1;
    }

    fn record_transition(&mut self, context: &[Unit], next: Unit) {
        *self
            .transitions
            .entry(context.to_vec())
            .or_default()
            .entry(next)
            .or_insert(0) += 1;
    }

    /// Merges another builder's counts into this one.
    ///
    /// # Errors
    /// Fails with [`BuildError::OptionsMismatch`] when the two builders were
    /// configured differently.
    pub fn merge(&mut self, other: Self) -> Result<(), BuildError> {
        if self.options != other.options {
            return Err(BuildError::OptionsMismatch);
        }

        self.sample_count += other.sample_count;
        self.skipped_samples += other.skipped_samples;
        for (unit, count) in other.global_units {
            *self.global_units.entry(unit).or_insert(0) += count;
        }
        for (position, row) in other.positions {
            let target = self.positions.entry(position).or_default();
            for (unit, count) in row {
                *target.entry(unit).or_insert(0) += count;
            }
        }
        for (context, row) in other.transitions {
            let target = self.transitions.entry(context).or_default();
            for (unit, count) in row {
                *target.entry(unit).or_insert(0) += count;
            }
        }
        for (length, count) in other.lengths {
            *self.lengths.entry(length).or_insert(0) += count;
        }
        Ok(())
    }

    /// Normalizes the accumulated counts into a frozen [`Profile`].
    ///
    /// With smoothing enabled, ε is first added over the discovered alphabet
    /// for every position row and over alphabet-plus-`End` for every
    /// transition row; the length distribution is smoothed only over
    /// observed lengths (smoothing never invents lengths the corpus did not
    /// contain). Each row is then divided by its own total.
    ///
    /// Deterministic: the tables iterate in key order, so the same corpus
    /// and options always produce a byte-identical profile.
    ///
    /// # Errors
    /// Fails with [`BuildError::EmptyCorpus`] when no usable sample was fed.
    pub fn freeze(self) -> Result<Profile, BuildError> {
        if self.sample_count == 0 {
            return Err(BuildError::EmptyCorpus);
        }

        let smoothing = self.options.smoothing;
        let alphabet: Vec<Unit> = self.global_units.keys().cloned().collect();
        let mut transition_domain = alphabet.clone();
        transition_domain.push(Unit::End);

        let global_units = normalize_row(&self.global_units, smoothing, &alphabet);
        let positions = self
            .positions
            .iter()
            .map(|(&position, row)| (position, normalize_row(row, smoothing, &alphabet)))
            .collect();
        let transitions = self
            .transitions
            .iter()
            .map(|(context, row)| {
                (
                    context.clone(),
                    normalize_row(row, smoothing, &transition_domain),
                )
            })
            .collect();

        let length_total: f64 = self.lengths.values().map(|&c| c as f64 + smoothing).sum();
        let lengths = self
            .lengths
            .iter()
            .map(|(&length, &count)| (length, (count as f64 + smoothing) / length_total))
            .collect();

        Ok(Profile {
            scheme: self.options.scheme,
            order: self.options.order,
            smoothing,
            sample_count: self.sample_count,
            skipped_samples: self.skipped_samples,
            creator_version: env!("CARGO_PKG_VERSION").to_owned(),
            source_label: self.options.source_label,
            global_units,
            positions,
            transitions,
            lengths,
        })
    }
}

/// Smooths a count row over the given domain and normalizes it to
/// probabilities. With ε = 0 only observed outcomes appear; otherwise the
/// whole domain does.
fn normalize_row(
    counts: &BTreeMap<Unit, u64>,
    smoothing: f64,
    domain: &[Unit],
) -> ProbabilityRow {
    let mut weights: BTreeMap<Unit, f64> = BTreeMap::new();
    if smoothing > 0.0 {
        for unit in domain {
            weights.insert(unit.clone(), smoothing);
        }
    }
    for (unit, &count) in counts {
        *weights.entry(unit.clone()).or_insert(0.0) += count as f64;
    }

    let total: f64 = weights.values().sum();
    weights
        .into_iter()
        .map(|(unit, weight)| (unit, weight / total))
        .collect()
}

/// Builds a profile from a corpus in one call.
///
/// The corpus can be any iterable of string-likes: a slice of literals, the
/// vector returned by [`crate::io::read_lines`], a database cursor adapter.
/// The corpus is read once and not retained.
///
/// # Errors
/// Fails when the options are invalid or when no sample was usable.
pub fn build<I, S>(corpus: I, options: BuildOptions) -> Result<Profile, BuildError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut builder = ProfileBuilder::new(options)?;
    for sample in corpus {
        builder.feed(sample.as_ref());
    }
    builder.freeze()
}

/// Builds a profile from a corpus using one worker thread per CPU.
///
/// The corpus is split into chunks, each chunk feeds its own partial
/// builder, and the partials are merged before a single freeze. Merging is
/// commutative over integer counts, so the result is byte-identical to the
/// sequential [`build`] regardless of thread scheduling.
///
/// # Errors
/// Same failure modes as [`build`].
pub fn build_parallel(samples: &[String], options: BuildOptions) -> Result<Profile, BuildError> {
    options.validate()?;
    if samples.is_empty() {
        return Err(BuildError::EmptyCorpus);
    }

    let workers = num_cpus::get().max(1);
    let chunk_size = samples.len().div_ceil(workers);

    let (tx, rx) = mpsc::channel();
    thread::scope(|scope| {
        for chunk in samples.chunks(chunk_size) {
            let tx = tx.clone();
            let options = options.clone();
            scope.spawn(move || {
                // Options were validated above, so `new` cannot fail here.
                let mut partial = ProfileBuilder::new(options).expect("options already validated");
                for sample in chunk {
                    partial.feed(sample);
                }
                let _ = tx.send(partial);
            });
        }
        drop(tx);
    });

    let mut combined = ProfileBuilder::new(options)?;
    for partial in rx.iter() {
        combined.merge(partial)?;
    }
    combined.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BuildError;

    const NAMES: [&str; 3] = ["ann", "amy", "ana"];

    fn sym(s: &str) -> Unit {
        Unit::Sym(s.into())
    }

    fn row_sum(row: &ProbabilityRow) -> f64 {
        row.values().sum()
    }

    #[test]
    fn empty_corpus_is_fatal() {
        let corpus: [&str; 0] = [];
        assert_eq!(
            build(corpus, BuildOptions::default()),
            Err(BuildError::EmptyCorpus)
        );
    }

    #[test]
    fn corpus_of_only_unusable_samples_is_fatal() {
        assert_eq!(
            build(["", "", ""], BuildOptions::default()),
            Err(BuildError::EmptyCorpus)
        );
    }

    #[test]
    fn invalid_options_are_rejected() {
        let zero_order = BuildOptions {
            order: 0,
            ..BuildOptions::default()
        };
        assert_eq!(ProfileBuilder::new(zero_order).err(), Some(BuildError::InvalidOrder));

        let narrow_grams = BuildOptions {
            scheme: UnitScheme::Grams(1),
            ..BuildOptions::default()
        };
        assert_eq!(
            ProfileBuilder::new(narrow_grams).err(),
            Some(BuildError::InvalidGramWidth)
        );

        let negative_smoothing = BuildOptions {
            smoothing: -0.5,
            ..BuildOptions::default()
        };
        assert_eq!(
            ProfileBuilder::new(negative_smoothing).err(),
            Some(BuildError::InvalidSmoothing(-0.5))
        );
    }

    #[test]
    fn unusable_samples_are_skipped_and_counted() {
        let profile = build(["ann", "", "amy"], BuildOptions::default()).unwrap();
        assert_eq!(profile.sample_count(), 2);
        assert_eq!(profile.skipped_samples(), 1);
    }

    #[test]
    fn bigram_example_transition_rows() {
        let profile = build(NAMES, BuildOptions::default()).unwrap();

        let start = profile.transition_row(&[Unit::Start]).unwrap();
        assert_eq!(start.len(), 1);
        assert!((start[&sym("a")] - 1.0).abs() < 1e-9);

        // a → {n: 2, m: 1, End: 1} over 4 observations
        let a = profile.transition_row(&[sym("a")]).unwrap();
        assert!((a[&sym("n")] - 0.5).abs() < 1e-9);
        assert!((a[&sym("m")] - 0.25).abs() < 1e-9);
        assert!((a[&Unit::End] - 0.25).abs() < 1e-9);

        // n → {n: 1, a: 1, End: 1}
        let n = profile.transition_row(&[sym("n")]).unwrap();
        assert!((n[&sym("n")] - 1.0 / 3.0).abs() < 1e-9);
        assert!((n[&sym("a")] - 1.0 / 3.0).abs() < 1e-9);
        assert!((n[&Unit::End] - 1.0 / 3.0).abs() < 1e-9);

        let m = profile.transition_row(&[sym("m")]).unwrap();
        assert!((m[&sym("y")] - 1.0).abs() < 1e-9);
        let y = profile.transition_row(&[sym("y")]).unwrap();
        assert!((y[&Unit::End] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn every_row_sums_to_one() {
        for smoothing in [0.0, 0.1, 1.0] {
            let options = BuildOptions {
                smoothing,
                ..BuildOptions::default()
            };
            let profile = build(NAMES, options).unwrap();

            for context in [[Unit::Start], [sym("a")], [sym("n")], [sym("m")], [sym("y")]] {
                let row = profile.transition_row(&context).unwrap();
                assert!((row_sum(row) - 1.0).abs() < 1e-9, "context {context:?}");
            }
            for position in 0..3 {
                let row = profile.position_row(position).unwrap();
                assert!((row_sum(row) - 1.0).abs() < 1e-9, "position {position}");
            }
            let length_sum: f64 = profile.length_distribution().values().sum();
            assert!((length_sum - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn smoothing_fills_every_transition_row_over_the_alphabet() {
        let options = BuildOptions {
            smoothing: 0.5,
            ..BuildOptions::default()
        };
        let profile = build(NAMES, options).unwrap();

        // Alphabet is {a, m, n, y}; every row must cover it plus End.
        let y = profile.transition_row(&[sym("y")]).unwrap();
        assert_eq!(y.len(), 5);
        assert!(y[&sym("a")] > 0.0);
        assert!(y[&Unit::End] > y[&sym("a")]);
    }

    #[test]
    fn smoothing_never_invents_lengths() {
        let options = BuildOptions {
            smoothing: 1.0,
            ..BuildOptions::default()
        };
        let profile = build(NAMES, options).unwrap();
        let lengths: Vec<usize> = profile.length_distribution().keys().copied().collect();
        assert_eq!(lengths, [3]);
    }

    #[test]
    fn position_rows_reflect_per_position_frequencies() {
        let profile = build(NAMES, BuildOptions::default()).unwrap();

        let first = profile.position_row(0).unwrap();
        assert!((first[&sym("a")] - 1.0).abs() < 1e-9);

        // Position 1 saw n, m, n.
        let second = profile.position_row(1).unwrap();
        assert!((second[&sym("n")] - 2.0 / 3.0).abs() < 1e-9);
        assert!((second[&sym("m")] - 1.0 / 3.0).abs() < 1e-9);

        assert!(profile.position_row(3).is_none());
    }

    #[test]
    fn higher_order_contexts_are_start_padded() {
        let options = BuildOptions {
            order: 2,
            ..BuildOptions::default()
        };
        let profile = build(NAMES, options).unwrap();

        let start = profile.transition_row(&[Unit::Start, Unit::Start]).unwrap();
        assert!((start[&sym("a")] - 1.0).abs() < 1e-9);

        let an = profile.transition_row(&[sym("a"), sym("n")]).unwrap();
        assert!((an[&sym("n")] - 0.5).abs() < 1e-9);
        assert!((an[&sym("a")] - 0.5).abs() < 1e-9);
    }

    #[test]
    fn word_scheme_counts_tokens() {
        let options = BuildOptions {
            scheme: UnitScheme::Words,
            ..BuildOptions::default()
        };
        let profile = build(["Smith, John", "Doe, John"], options).unwrap();

        assert_eq!(profile.length_distribution()[&2], 1.0);
        let second = profile.position_row(1).unwrap();
        assert!((second[&sym("John")] - 1.0).abs() < 1e-9);
    }

    #[test]
    fn builds_are_deterministic() {
        let options = BuildOptions {
            smoothing: 0.25,
            order: 2,
            ..BuildOptions::default()
        };
        let first = build(NAMES, options.clone()).unwrap();
        let second = build(NAMES, options).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn parallel_build_matches_sequential_build() {
        let corpus: Vec<String> = (0..500)
            .map(|i| format!("name{:03}", i % 37))
            .collect();
        let options = BuildOptions {
            order: 2,
            smoothing: 0.1,
            ..BuildOptions::default()
        };

        let sequential = build(&corpus, options.clone()).unwrap();
        let parallel = build_parallel(&corpus, options).unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn merge_rejects_mismatched_options() {
        let mut left = ProfileBuilder::new(BuildOptions::default()).unwrap();
        let right = ProfileBuilder::new(BuildOptions {
            order: 2,
            ..BuildOptions::default()
        })
        .unwrap();
        assert_eq!(left.merge(right), Err(BuildError::OptionsMismatch));
    }
}
