use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SampleError;

/// An atomic symbol of analysis.
///
/// Profiles count and predict units, never raw strings. The start and end
/// markers are enum variants rather than reserved characters, so no symbol
/// occurring in sample text can ever collide with a boundary marker.
///
/// # Invariants
/// - `Start` appears only as context padding, never inside a sample
/// - `End` appears only as a transition target, never inside a sample
/// - `Sym` always holds at least one character
///
/// The derived ordering (`Start` < `Sym` < `End`, symbols by content) gives
/// every table a stable, deterministic iteration order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Unit {
    /// Context padding preceding the first symbol of a value.
    Start,
    /// A concrete symbol: one character, one gram, or one word token.
    Sym(String),
    /// Termination marker drawn to end a value early.
    End,
}

impl Unit {
    /// Returns the symbol text, or `None` for the boundary markers.
    pub fn text(&self) -> Option<&str> {
        match self {
            Unit::Sym(s) => Some(s),
            _ => None,
        }
    }

    /// True for the `Start` and `End` boundary markers.
    pub fn is_marker(&self) -> bool {
        matches!(self, Unit::Start | Unit::End)
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Unit::Start => f.write_str("^"),
            Unit::Sym(s) => f.write_str(s),
            Unit::End => f.write_str("$"),
        }
    }
}

/// How raw samples are segmented into [`Unit`]s.
///
/// The scheme is recorded in every profile so that generated units are
/// joined back exactly the way analysis split them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitScheme {
    /// One unit per character. Concatenating units reproduces the sample.
    Chars,
    /// Consecutive non-overlapping windows of the given width (in
    /// characters); the final window may be shorter. Concatenating units
    /// reproduces the sample. Widths below 2 are rejected by options
    /// validation.
    Grams(usize),
    /// One unit per whitespace-separated token. Lossy: joining emits a
    /// single space between tokens regardless of the original whitespace.
    Words,
}

impl Default for UnitScheme {
    fn default() -> Self {
        UnitScheme::Chars
    }
}

impl fmt::Display for UnitScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnitScheme::Chars => f.write_str("chars"),
            UnitScheme::Grams(width) => write!(f, "gram:{width}"),
            UnitScheme::Words => f.write_str("words"),
        }
    }
}

/// A scheme argument could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown unit scheme `{0}` (expected `chars`, `gram:N`, or `words`)")]
pub struct ParseSchemeError(String);

impl FromStr for UnitScheme {
    type Err = ParseSchemeError;

    /// Parses `chars`, `words`, or `gram:N` (N >= 2).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chars" => Ok(UnitScheme::Chars),
            "words" => Ok(UnitScheme::Words),
            other => {
                if let Some(width) = other.strip_prefix("gram:") {
                    match width.parse::<usize>() {
                        Ok(w) if w >= 2 => return Ok(UnitScheme::Grams(w)),
                        _ => return Err(ParseSchemeError(other.to_owned())),
                    }
                }
                Err(ParseSchemeError(other.to_owned()))
            }
        }
    }
}

/// Segments a raw sample into its ordered unit sequence.
///
/// Deterministic: the same sample and scheme always produce the same
/// sequence. Boundary markers are not included; the analyzer pads context
/// with [`Unit::Start`] and records [`Unit::End`] transitions itself.
///
/// # Errors
/// Fails with [`SampleError::Empty`] on the empty string and
/// [`SampleError::NoTokens`] when word segmentation finds only whitespace.
pub fn segment(sample: &str, scheme: UnitScheme) -> Result<Vec<Unit>, SampleError> {
    if sample.is_empty() {
        return Err(SampleError::Empty);
    }

    match scheme {
        UnitScheme::Chars => Ok(sample.chars().map(|c| Unit::Sym(c.to_string())).collect()),
        UnitScheme::Grams(width) => {
            // Widths below 2 are rejected by options validation; the clamp
            // keeps the slice API total.
            let width = width.max(1);
            let chars: Vec<char> = sample.chars().collect();
            Ok(chars
                .chunks(width)
                .map(|window| Unit::Sym(window.iter().collect()))
                .collect())
        }
        UnitScheme::Words => {
            let units: Vec<Unit> = sample
                .split_whitespace()
                .map(|token| Unit::Sym(token.to_owned()))
                .collect();
            if units.is_empty() {
                return Err(SampleError::NoTokens);
            }
            Ok(units)
        }
    }
}

/// Joins generated units back into an output string per the scheme rules.
///
/// The inverse of [`segment`] for `Chars` and `Grams`; for `Words` it is the
/// documented lossy mapping (single space between tokens). Boundary markers
/// in the slice are skipped.
pub fn join(units: &[Unit], scheme: UnitScheme) -> String {
    let symbols = units.iter().filter_map(Unit::text);
    match scheme {
        UnitScheme::Chars | UnitScheme::Grams(_) => symbols.collect(),
        UnitScheme::Words => symbols.collect::<Vec<_>>().join(" "),
    }
}
