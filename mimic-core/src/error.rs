//! Error taxonomy for the profile engine.
//!
//! Failures are grouped by pipeline stage. Per-sample problems
//! ([`SampleError`]) are recoverable and handled inside the analyzer with a
//! skip-and-continue policy; corpus, codec, generator, and registry failures
//! are fatal to their operation and surface as typed values, never as silent
//! defaults.

/// A single sample could not be segmented into units.
///
/// The analyzer recovers from these by skipping the sample, logging it, and
/// recording the skip in the profile metadata.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SampleError {
    /// The sample was the empty string.
    #[error("sample is empty")]
    Empty,

    /// Word segmentation found nothing but whitespace.
    #[error("sample contains no word tokens")]
    NoTokens,
}

/// The corpus or the build options made analysis impossible.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuildError {
    /// Every sample was skipped, or the corpus was empty to begin with.
    #[error("corpus contains no usable samples")]
    EmptyCorpus,

    /// Markov context length must be at least one unit.
    #[error("model order must be at least 1")]
    InvalidOrder,

    /// Gram segmentation below width 2 degenerates to characters.
    #[error("gram width must be at least 2")]
    InvalidGramWidth,

    /// Smoothing is an additive count and cannot be negative or non-finite.
    #[error("smoothing must be finite and non-negative, got {0}")]
    InvalidSmoothing(f64),

    /// Two builders with different options cannot be merged.
    #[error("builders were configured differently and cannot merge")]
    OptionsMismatch,
}

/// An integrity violation in a profile aggregate.
///
/// Raised when validating freshly decoded bytes and when a generator is
/// constructed over a profile that lacks the tables generation needs.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProfileError {
    /// A table required for generation is empty or absent.
    #[error("profile is missing its {0} table")]
    MissingTable(&'static str),

    /// A probability row does not sum to 1.0 within tolerance.
    #[error("probability row `{row}` sums to {sum}, outside tolerance")]
    RowSum { row: String, sum: f64 },

    /// A boundary marker is stored in a table that only holds symbols.
    #[error("boundary marker stored in the {0} table")]
    MarkerInTable(&'static str),

    /// A transition context does not hold exactly `order` units.
    #[error("transition context `{context}` does not match the stored order")]
    ContextLength { context: String },

    /// The stored model order is zero.
    #[error("stored model order is zero")]
    ZeroOrder,

    /// The stored segmentation scheme is invalid (gram width below 2).
    #[error("stored gram width is invalid")]
    InvalidScheme,
}

/// The profile byte format could not be read or written.
///
/// Decoding never repairs input: a profile that fails any of these checks is
/// rejected whole, and no partially populated profile is ever returned.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The input does not start with the profile magic bytes.
    #[error("not a profile: bad magic bytes")]
    BadMagic,

    /// The input claims a format version this decoder does not know.
    #[error("profile format v{found} is newer than supported v{supported}")]
    UnsupportedVersion { found: u16, supported: u16 },

    /// The input ends before the header is complete.
    #[error("profile data is truncated")]
    Truncated,

    /// The body bytes did not decode into a profile.
    #[error("malformed profile body: {0}")]
    Body(postcard::Error),

    /// The body decoded but the profile is internally inconsistent.
    #[error("profile failed validation: {0}")]
    InvalidProfile(#[from] ProfileError),

    /// The profile could not be serialized.
    #[error("profile body could not be encoded: {0}")]
    Encode(postcard::Error),

    /// Reading or writing the profile file failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A generator could not be constructed.
///
/// Generation itself is infallible once a generator exists; a generator
/// never substitutes a replacement model for a malformed profile.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GenerateError {
    /// The profile lacks tables required for sampling.
    #[error("profile failed validation: {0}")]
    InvalidProfile(#[from] ProfileError),
}

/// A named profile could not be served from the registry.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Neither the cache nor the data directory knows this name.
    #[error("no profile named `{0}` is cached or stored in the data directory")]
    UnknownProfile(String),

    /// Profile names must be plain file stems, free of path components.
    #[error("profile name `{0}` is not a plain file name")]
    InvalidName(String),

    /// The stored profile exists but failed to decode.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// Listing or reading the data directory failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A sample corpus could not be loaded from external storage.
#[derive(Debug, thiserror::Error)]
pub enum CorpusError {
    /// Reading the source failed.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The CSV source is malformed.
    #[error("csv parsing failed: {0}")]
    Csv(#[from] csv::Error),

    /// The requested CSV column does not exist in the header row.
    #[error("csv has no column named `{0}`")]
    UnknownColumn(String),
}
