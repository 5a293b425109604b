//! Command-line front end for the profile engine.
//!
//! # Usage Examples
//!
//! ```bash
//! # Learn a profile from one column of a census CSV
//! mimic analyze \
//!   --input census_firstnames.csv --column firstname \
//!   --output female_first_name.mprof \
//!   --order 2 --smoothing 0.01 --label "census 2016, female first names"
//!
//! # Learn a profile from a plain line file
//! mimic analyze --input cities.txt --output city.mprof --scheme words
//!
//! # Generate reproducible values from a stored profile
//! mimic generate --profile female_first_name.mprof --count 100 --seed 42
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use mimic_core::{
    build_parallel, io, read_profile, write_profile, BuildOptions, Generator, UnitScheme,
};

#[derive(Parser)]
#[command(name = "mimic", version, about = "Synthetic test data from learned statistical profiles")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Learn a profile from a sample corpus and store it.
    Analyze {
        /// Corpus file: one sample per line, or a CSV when --column is given.
        #[arg(long)]
        input: PathBuf,

        /// CSV column holding the samples; omit for plain line files.
        #[arg(long)]
        column: Option<String>,

        /// Destination profile file.
        #[arg(long)]
        output: PathBuf,

        /// Segmentation scheme: `chars`, `gram:N`, or `words`.
        #[arg(long, default_value = "chars")]
        scheme: UnitScheme,

        /// Markov context length in units.
        #[arg(long, default_value_t = 1)]
        order: usize,

        /// Additive smoothing constant (0 disables smoothing).
        #[arg(long, default_value_t = 0.0)]
        smoothing: f64,

        /// Free-form source description stored in the profile metadata.
        #[arg(long)]
        label: Option<String>,
    },

    /// Generate values from a stored profile onto stdout.
    Generate {
        /// Profile file produced by `analyze`.
        #[arg(long)]
        profile: PathBuf,

        /// Number of values to emit.
        #[arg(long, default_value_t = 10)]
        count: usize,

        /// Seed for exactly reproducible output; omit for OS randomness.
        #[arg(long)]
        seed: Option<u64>,
    },
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {
        Command::Analyze {
            input,
            column,
            output,
            scheme,
            order,
            smoothing,
            label,
        } => {
            let corpus = match &column {
                Some(column) => io::read_csv_column(&input, column)
                    .with_context(|| format!("reading column `{column}` of {}", input.display()))?,
                None => io::read_lines(&input)
                    .with_context(|| format!("reading samples from {}", input.display()))?,
            };
            tracing::info!(samples = corpus.len(), input = %input.display(), "corpus loaded");

            let options = BuildOptions {
                scheme,
                order,
                smoothing,
                source_label: label,
            };
            let profile = build_parallel(&corpus, options).context("analyzing corpus")?;
            if profile.skipped_samples() > 0 {
                tracing::warn!(skipped = profile.skipped_samples(), "some samples were unusable");
            }

            write_profile(&profile, &output)
                .with_context(|| format!("writing profile to {}", output.display()))?;
            tracing::info!(
                profile = %output.display(),
                samples = profile.sample_count(),
                alphabet = profile.alphabet().count(),
                "profile written"
            );
        }

        Command::Generate {
            profile,
            count,
            seed,
        } => {
            let loaded = read_profile(&profile)
                .with_context(|| format!("loading profile from {}", profile.display()))?;
            let generator = Generator::new(Arc::new(loaded)).context("preparing generator")?;

            for value in generator.generate(count, seed) {
                println!("{value}");
            }
        }
    }

    Ok(())
}
