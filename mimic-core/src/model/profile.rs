use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::ProfileError;
use crate::model::unit::{Unit, UnitScheme};

/// Tolerance applied when checking that a probability row sums to 1.0.
///
/// Wider than the analyzer's own arithmetic error (well below 1e-9) so that
/// profiles produced by other writers of the format still validate.
pub(crate) const ROW_SUM_TOLERANCE: f64 = 1e-6;

/// A probability row: outcomes with their normalized weights.
///
/// Rows are `BTreeMap`s so iteration order is stable, which keeps both
/// serialization and seeded generation deterministic.
pub type ProbabilityRow = BTreeMap<Unit, f64>;

/// The frozen statistical model learned from a sample corpus.
///
/// A profile bundles everything the generator needs: the unit alphabet with
/// global frequencies, per-position unit probabilities, the order-N Markov
/// transition table, the sample length distribution, and build metadata.
/// It is created exactly once, by [`crate::ProfileBuilder::freeze`] or by
/// [`crate::decode`], and never mutated afterwards; share it freely across
/// threads behind an `Arc` with no locking.
///
/// # Invariants
/// - every probability row sums to 1.0 within [`ROW_SUM_TOLERANCE`]
/// - zero-probability outcomes are absent, never stored as 0.0
/// - every transition context holds exactly `order` units, `Start`-padded
/// - metadata carries no wall clock, so equal inputs give equal bytes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub(crate) scheme: UnitScheme,
    pub(crate) order: usize,
    pub(crate) smoothing: f64,
    pub(crate) sample_count: u64,
    pub(crate) skipped_samples: u64,
    pub(crate) creator_version: String,
    pub(crate) source_label: Option<String>,
    /// Unit alphabet with corpus-wide occurrence probabilities; the
    /// generator's fallback row for unseen contexts.
    pub(crate) global_units: ProbabilityRow,
    /// Position index to unit probabilities at that position.
    pub(crate) positions: BTreeMap<usize, ProbabilityRow>,
    /// Markov context (the `order` most recent units) to next-unit
    /// probabilities, including the `End` outcome.
    pub(crate) transitions: BTreeMap<Vec<Unit>, ProbabilityRow>,
    /// Sample length (in units) to probability.
    pub(crate) lengths: BTreeMap<usize, f64>,
}

impl Profile {
    /// The segmentation scheme samples were analyzed with. Generated units
    /// are joined back according to this scheme.
    pub fn scheme(&self) -> UnitScheme {
        self.scheme
    }

    /// Number of preceding units used as Markov context.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Additive smoothing constant applied before normalization (0.0 when
    /// smoothing was disabled).
    pub fn smoothing(&self) -> f64 {
        self.smoothing
    }

    /// Number of samples that contributed to the model.
    pub fn sample_count(&self) -> u64 {
        self.sample_count
    }

    /// Number of samples the analyzer skipped as unusable.
    pub fn skipped_samples(&self) -> u64 {
        self.skipped_samples
    }

    /// Version of the library that built this profile.
    pub fn creator_version(&self) -> &str {
        &self.creator_version
    }

    /// Free-form description of the sample source, if one was recorded.
    pub fn source_label(&self) -> Option<&str> {
        self.source_label.as_deref()
    }

    /// The discovered unit alphabet, in stable order.
    pub fn alphabet(&self) -> impl Iterator<Item = &Unit> {
        self.global_units.keys()
    }

    /// Corpus-wide unit probabilities over the alphabet.
    pub fn global_units(&self) -> &ProbabilityRow {
        &self.global_units
    }

    /// Unit probabilities at the given position, if any sample reached it.
    pub fn position_row(&self, position: usize) -> Option<&ProbabilityRow> {
        self.positions.get(&position)
    }

    /// Next-unit probabilities for a Markov context, if it was observed.
    pub fn transition_row(&self, context: &[Unit]) -> Option<&ProbabilityRow> {
        self.transitions.get(context)
    }

    /// Probability of each observed sample length.
    pub fn length_distribution(&self) -> &BTreeMap<usize, f64> {
        &self.lengths
    }

    /// Checks the structural integrity of the profile.
    ///
    /// Run by the codec on every decode and by the generator on
    /// construction; also available to callers holding a profile from an
    /// unfamiliar source.
    ///
    /// # Errors
    /// Fails when the stored order or scheme is invalid, when a table
    /// required for generation is empty, when a boundary marker is stored in
    /// a symbols-only table, when a transition context does not hold exactly
    /// `order` units, or when any probability row does not sum to 1.0 within
    /// [`ROW_SUM_TOLERANCE`].
    pub fn validate(&self) -> Result<(), ProfileError> {
        if self.order == 0 {
            return Err(ProfileError::ZeroOrder);
        }
        if let UnitScheme::Grams(width) = self.scheme {
            if width < 2 {
                return Err(ProfileError::InvalidScheme);
            }
        }
        if self.lengths.is_empty() {
            return Err(ProfileError::MissingTable("length distribution"));
        }
        if self.transitions.is_empty() {
            return Err(ProfileError::MissingTable("transition"));
        }
        if self.global_units.is_empty() {
            return Err(ProfileError::MissingTable("global unit"));
        }
        if self.positions.is_empty() {
            return Err(ProfileError::MissingTable("position"));
        }

        // Markers never occur inside a sample, so the analyzer cannot put
        // them in the symbol tables; input that does is malformed, and an
        // unfiltered marker would leave the generator's fallback row empty.
        if self.global_units.keys().any(Unit::is_marker) {
            return Err(ProfileError::MarkerInTable("global unit"));
        }
        for row in self.positions.values() {
            if row.keys().any(Unit::is_marker) {
                return Err(ProfileError::MarkerInTable("position"));
            }
        }

        check_row_sum("global units", self.global_units.values())?;
        check_row_sum("length distribution", self.lengths.values())?;
        for (position, row) in &self.positions {
            check_row_sum(&format!("position {position}"), row.values())?;
        }
        for (context, row) in &self.transitions {
            let label: String = context.iter().map(Unit::to_string).collect();
            if context.len() != self.order {
                return Err(ProfileError::ContextLength { context: label });
            }
            check_row_sum(&label, row.values())?;
        }

        Ok(())
    }
}

fn check_row_sum<'a>(
    label: &str,
    weights: impl Iterator<Item = &'a f64>,
) -> Result<(), ProfileError> {
    let sum: f64 = weights.sum();
    if (sum - 1.0).abs() > ROW_SUM_TOLERANCE {
        return Err(ProfileError::RowSum {
            row: label.to_owned(),
            sum,
        });
    }
    Ok(())
}
