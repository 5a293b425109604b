//! Top-level module for the profile engine.
//!
//! The engine is a pipeline of small components:
//! - Sample segmentation into units (`unit`)
//! - Frequency analysis of a corpus into a frozen profile (`analyzer`)
//! - The immutable profile aggregate itself (`profile`)
//! - A versioned byte codec for profiles (`codec`)
//! - Weighted random generation from a loaded profile (`generator`)
//! - A named, concurrency-friendly profile cache (`registry`)

/// Frequency model builder: feeds samples, accumulates counts, freezes them
/// into a normalized [`profile::Profile`]. Supports sequential and
/// multi-threaded corpus analysis with identical results.
pub mod analyzer;

/// Versioned binary profile format (magic, format version, postcard body)
/// with strict decode-time validation.
pub mod codec;

/// Weighted random sampling of new values from a profile.
///
/// Exposes bounded generation and an unbounded lazy stream, both exactly
/// reproducible under a fixed seed.
pub mod generator;

/// The immutable statistical profile: unit alphabet, positional and
/// transition probability tables, length distribution, and build metadata.
pub mod profile;

/// Named profile cache with load-on-demand from a data directory and
/// atomic entry replacement.
pub mod registry;

/// Atomic units of analysis and the segmentation schemes that produce them.
pub mod unit;
