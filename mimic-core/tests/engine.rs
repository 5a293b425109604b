//! End-to-end pipeline tests: corpus file → analyzer → codec → generator.

use std::fs;
use std::sync::Arc;

use mimic_core::{
    build, build_parallel, decode, encode, io, read_profile, write_profile, BuildOptions,
    Generator, ProfileRegistry, UnitScheme,
};

fn census_corpus() -> Vec<String> {
    let names = [
        "ann", "amy", "ana", "anna", "annie", "amelia", "alice", "ada", "beth", "betty", "bea",
        "clara", "cora", "dora", "delia", "edith", "ella", "emma", "etta", "eva",
    ];
    // Repeat with skewed weights so the tables have uneven probabilities.
    let mut corpus = Vec::new();
    for (index, name) in names.iter().enumerate() {
        for _ in 0..=(index % 4) {
            corpus.push((*name).to_string());
        }
    }
    corpus
}

#[test]
fn corpus_file_to_generated_values() {
    let dir = tempfile::tempdir().unwrap();

    let csv_path = dir.path().join("census.csv");
    let mut csv = String::from("firstname,gender\n");
    for name in census_corpus() {
        csv.push_str(&name);
        csv.push_str(",female\n");
    }
    fs::write(&csv_path, csv).unwrap();

    let corpus = io::read_csv_column(&csv_path, "firstname").unwrap();
    let profile = build(
        &corpus,
        BuildOptions {
            order: 2,
            smoothing: 0.01,
            source_label: Some("census 2016 female first names".into()),
            ..BuildOptions::default()
        },
    )
    .unwrap();
    assert_eq!(profile.sample_count(), corpus.len() as u64);

    let profile_path = dir.path().join("female_first_name.mprof");
    write_profile(&profile, &profile_path).unwrap();
    let reloaded = read_profile(&profile_path).unwrap();
    assert_eq!(reloaded, profile);

    // Generation works from the reloaded profile alone; the corpus file is
    // gone by now.
    fs::remove_file(&csv_path).unwrap();
    let generator = Generator::new(Arc::new(reloaded)).unwrap();
    let values = generator.generate(100, Some(2016));
    assert_eq!(values.len(), 100);
    assert!(values.iter().all(|v| !v.is_empty()));
    assert_eq!(values, generator.generate(100, Some(2016)));
}

#[test]
fn seeded_output_survives_the_codec_round_trip() {
    let profile = build(census_corpus(), BuildOptions::default()).unwrap();
    let decoded = decode(&encode(&profile).unwrap()).unwrap();

    let before = Generator::new(Arc::new(profile)).unwrap();
    let after = Generator::new(Arc::new(decoded)).unwrap();
    assert_eq!(before.generate(200, Some(1)), after.generate(200, Some(1)));
}

#[test]
fn parallel_build_feeds_the_same_generator_output() {
    let corpus = census_corpus();
    let options = BuildOptions {
        order: 2,
        ..BuildOptions::default()
    };

    let sequential = build(&corpus, options.clone()).unwrap();
    let parallel = build_parallel(&corpus, options).unwrap();
    assert_eq!(encode(&sequential).unwrap(), encode(&parallel).unwrap());
}

#[test]
fn registry_serves_concurrent_generators() {
    let dir = tempfile::tempdir().unwrap();
    let profile = build(census_corpus(), BuildOptions::default()).unwrap();
    write_profile(&profile, dir.path().join("names.mprof")).unwrap();

    let registry = Arc::new(ProfileRegistry::new(dir.path()));
    let handles: Vec<_> = (0..8)
        .map(|seed| {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                let profile = registry.get("names").unwrap();
                let generator = Generator::new(profile).unwrap();
                generator.generate(100, Some(seed))
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap().len(), 100);
    }
    assert_eq!(registry.names(), ["names"]);
}

#[test]
fn gram_profiles_round_trip_and_generate() {
    let corpus = ["abcdef", "abcdff", "abcdef", "uvwxyz"];
    let profile = build(
        corpus,
        BuildOptions {
            scheme: UnitScheme::Grams(2),
            ..BuildOptions::default()
        },
    )
    .unwrap();

    let decoded = decode(&encode(&profile).unwrap()).unwrap();
    let generator = Generator::new(Arc::new(decoded)).unwrap();
    for value in generator.generate(100, Some(5)) {
        // Three bigrams per sample; every output is stitched from them.
        assert_eq!(value.len(), 6);
    }
}
