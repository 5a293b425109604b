use std::ffi::OsStr;
use std::fs::{self, File};
use std::io::Read;
use std::path::Path;

use crate::error::CorpusError;
use crate::model::codec::PROFILE_EXTENSION;

/// Reads a sample corpus from a text file, one sample per line.
///
/// Blank lines are dropped rather than passed on as unusable samples; both
/// `\n` and `\r\n` endings are handled.
///
/// # Errors
/// Fails when the file cannot be read.
pub fn read_lines<P: AsRef<Path>>(path: P) -> Result<Vec<String>, CorpusError> {
    let mut contents = String::new();
    File::open(path)?.read_to_string(&mut contents)?;
    Ok(contents
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_owned)
        .collect())
}

/// Reads a sample corpus from one column of a headered CSV file.
///
/// Empty cells are dropped, mirroring [`read_lines`]'s treatment of blank
/// lines.
///
/// # Errors
/// Fails when the file cannot be parsed as CSV or when the header row has
/// no column with the given name.
pub fn read_csv_column<P: AsRef<Path>>(path: P, column: &str) -> Result<Vec<String>, CorpusError> {
    let mut reader = csv::Reader::from_path(path)?;

    let index = reader
        .headers()?
        .iter()
        .position(|header| header == column)
        .ok_or_else(|| CorpusError::UnknownColumn(column.to_owned()))?;

    let mut samples = Vec::new();
    for record in reader.records() {
        let record = record?;
        if let Some(value) = record.get(index) {
            if !value.trim().is_empty() {
                samples.push(value.to_owned());
            }
        }
    }
    Ok(samples)
}

/// Lists the names of the profile files stored in a directory.
///
/// Names are file stems of `.mprof` entries, sorted; other files and
/// subdirectories are ignored.
///
/// # Errors
/// Fails when the directory cannot be read.
pub fn list_profiles<P: AsRef<Path>>(dir: P) -> std::io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension() == Some(OsStr::new(PROFILE_EXTENSION)) {
            if let Some(stem) = path.file_stem() {
                names.push(stem.to_string_lossy().into_owned());
            }
        }
    }
    names.sort();
    Ok(names)
}
