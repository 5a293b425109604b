//! Profile-driven synthetic data engine.
//!
//! This crate learns a statistical model (a *profile*) from a sample corpus,
//! persists it as a compact versioned artifact, and later samples new values
//! from it that share the corpus's statistical shape without reproducing any
//! original record. It provides:
//! - Character, gram, and word level segmentation of samples
//! - A frequency analyzer producing frozen, immutable profiles
//! - A versioned binary profile codec (portable, reload without re-analysis)
//! - A seeded generator with bounded and streaming output
//! - A named profile registry for concurrent consumers
//!
//! # Examples
//!
//! Learning a profile and generating from it:
//!
//! ```
//! use mimic_core::{build, BuildOptions, Generator};
//! use std::sync::Arc;
//!
//! let corpus = ["ann", "amy", "ana"];
//! let profile = build(corpus, BuildOptions::default()).unwrap();
//! assert_eq!(profile.sample_count(), 3);
//!
//! let generator = Generator::new(Arc::new(profile)).unwrap();
//! let values = generator.generate(5, Some(42));
//! assert_eq!(values.len(), 5);
//! // The same seed always replays the same sequence.
//! assert_eq!(values, generator.generate(5, Some(42)));
//! ```

/// Core profile engine: segmentation, analysis, codec, generation, registry.
///
/// This module exposes the full modeling pipeline while keeping table
/// internals crate-private.
pub mod model;

/// Corpus loading helpers (line files, CSV columns, profile listings).
pub mod io;

/// Typed error taxonomy shared across the engine.
pub mod error;

pub use error::{
    BuildError, CodecError, CorpusError, GenerateError, ProfileError, RegistryError, SampleError,
};
pub use model::analyzer::{build, build_parallel, BuildOptions, ProfileBuilder};
pub use model::codec::{decode, encode, read_profile, write_profile};
pub use model::generator::{Generator, Samples};
pub use model::profile::Profile;
pub use model::registry::ProfileRegistry;
pub use model::unit::{Unit, UnitScheme};
