use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::error::RegistryError;
use crate::io::list_profiles;
use crate::model::codec::{read_profile, PROFILE_EXTENSION};
use crate::model::profile::Profile;

/// Named profile cache with load-on-demand from a data directory.
///
/// Each name maps to at most one resident `Arc<Profile>`, backed by
/// `<data_dir>/<name>.mprof` on disk. Because profiles are frozen, readers
/// only need the `Arc`: a `get` clones the pointer under a brief read lock
/// and all generation happens lock-free afterwards. Replacing an entry
/// takes the write lock only for the pointer swap, so concurrent generators
/// keep their old profile untouched and never observe a torn entry.
#[derive(Debug)]
pub struct ProfileRegistry {
    data_dir: PathBuf,
    cache: RwLock<HashMap<String, Arc<Profile>>>,
}

impl ProfileRegistry {
    /// Creates a registry over a data directory. No profiles are loaded
    /// until they are asked for.
    pub fn new<P: Into<PathBuf>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// The directory durable profiles are loaded from.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Returns the profile registered under `name`, loading it from the
    /// data directory on first use.
    ///
    /// # Errors
    /// Fails when the name is not a plain file stem, when neither the cache
    /// nor the data directory knows it, or when the stored file does not
    /// decode.
    pub fn get(&self, name: &str) -> Result<Arc<Profile>, RegistryError> {
        if let Some(profile) = self.cache.read().expect("registry lock poisoned").get(name) {
            return Ok(Arc::clone(profile));
        }

        let profile = self.load(name)?;
        let mut cache = self.cache.write().expect("registry lock poisoned");
        // A concurrent get may have loaded the same file meanwhile; both
        // decoded the same bytes, so either entry serves.
        let entry = cache.entry(name.to_owned()).or_insert(profile);
        Ok(Arc::clone(entry))
    }

    /// Reloads `name` from the data directory and replaces the cached entry.
    ///
    /// Decoding happens before the swap: a failed reload leaves the previous
    /// entry (if any) fully intact, and generators already holding the old
    /// `Arc` are never affected either way.
    ///
    /// # Errors
    /// Same failure modes as [`get`](Self::get).
    pub fn reload(&self, name: &str) -> Result<Arc<Profile>, RegistryError> {
        let profile = self.load(name)?;
        let mut cache = self.cache.write().expect("registry lock poisoned");
        cache.insert(name.to_owned(), Arc::clone(&profile));
        tracing::info!(name, "profile reloaded");
        Ok(profile)
    }

    /// Registers an in-memory profile under `name`, replacing any resident
    /// entry. The profile does not need a file in the data directory.
    pub fn insert(&self, name: impl Into<String>, profile: Profile) -> Arc<Profile> {
        let name = name.into();
        let profile = Arc::new(profile);
        let mut cache = self.cache.write().expect("registry lock poisoned");
        cache.insert(name.clone(), Arc::clone(&profile));
        tracing::info!(name, "profile registered");
        profile
    }

    /// Names of the currently resident profiles, sorted.
    pub fn names(&self) -> Vec<String> {
        let cache = self.cache.read().expect("registry lock poisoned");
        let mut names: Vec<String> = cache.keys().cloned().collect();
        names.sort();
        names
    }

    /// Names of the profiles stored in the data directory, resident or not.
    ///
    /// # Errors
    /// Fails when the directory cannot be listed.
    pub fn available(&self) -> Result<Vec<String>, RegistryError> {
        Ok(list_profiles(&self.data_dir)?)
    }

    fn load(&self, name: &str) -> Result<Arc<Profile>, RegistryError> {
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            return Err(RegistryError::InvalidName(name.to_owned()));
        }

        let path = self.data_dir.join(format!("{name}.{PROFILE_EXTENSION}"));
        if !path.is_file() {
            return Err(RegistryError::UnknownProfile(name.to_owned()));
        }

        let profile = read_profile(&path)?;
        tracing::info!(name, path = %path.display(), "profile loaded");
        Ok(Arc::new(profile))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::analyzer::{build, BuildOptions};
    use crate::model::codec::write_profile;

    fn profile_from(corpus: &[&str]) -> Profile {
        build(corpus.iter().copied(), BuildOptions::default()).unwrap()
    }

    fn store(dir: &Path, name: &str, profile: &Profile) {
        write_profile(profile, dir.join(format!("{name}.{PROFILE_EXTENSION}"))).unwrap();
    }

    #[test]
    fn profiles_load_on_demand_and_stay_cached() {
        let dir = tempfile::tempdir().unwrap();
        let profile = profile_from(&["ann", "amy"]);
        store(dir.path(), "first_name", &profile);

        let registry = ProfileRegistry::new(dir.path());
        assert!(registry.names().is_empty());

        let loaded = registry.get("first_name").unwrap();
        assert_eq!(*loaded, profile);
        assert_eq!(registry.names(), ["first_name"]);

        // Second get serves the same resident instance.
        let again = registry.get("first_name").unwrap();
        assert!(Arc::ptr_eq(&loaded, &again));
    }

    #[test]
    fn unknown_names_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ProfileRegistry::new(dir.path());

        assert!(matches!(
            registry.get("missing"),
            Err(RegistryError::UnknownProfile(name)) if name == "missing"
        ));
        assert!(matches!(
            registry.get("../escape"),
            Err(RegistryError::InvalidName(_))
        ));
    }

    #[test]
    fn reload_replaces_the_entry_but_not_held_references() {
        let dir = tempfile::tempdir().unwrap();
        let original = profile_from(&["ann", "amy"]);
        store(dir.path(), "names", &original);

        let registry = ProfileRegistry::new(dir.path());
        let held = registry.get("names").unwrap();

        let replacement = profile_from(&["bob", "ben", "bea"]);
        store(dir.path(), "names", &replacement);
        let reloaded = registry.reload("names").unwrap();

        assert_eq!(*reloaded, replacement);
        assert_eq!(*registry.get("names").unwrap(), replacement);
        // The Arc taken before the reload still points at the old profile.
        assert_eq!(*held, original);
    }

    #[test]
    fn failed_reloads_keep_the_old_entry() {
        let dir = tempfile::tempdir().unwrap();
        let original = profile_from(&["ann", "amy"]);
        store(dir.path(), "names", &original);

        let registry = ProfileRegistry::new(dir.path());
        registry.get("names").unwrap();

        std::fs::write(dir.path().join("names.mprof"), b"not a profile").unwrap();
        assert!(matches!(
            registry.reload("names"),
            Err(RegistryError::Codec(_))
        ));
        assert_eq!(*registry.get("names").unwrap(), original);
    }

    #[test]
    fn insert_registers_profiles_without_files() {
        let dir = tempfile::tempdir().unwrap();
        let registry = ProfileRegistry::new(dir.path());

        registry.insert("in_memory", profile_from(&["ann"]));
        assert_eq!(registry.names(), ["in_memory"]);
        assert!(registry.available().unwrap().is_empty());
        assert!(registry.get("in_memory").is_ok());
    }

    #[test]
    fn available_lists_stored_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let profile = profile_from(&["ann"]);
        store(dir.path(), "beta", &profile);
        store(dir.path(), "alpha", &profile);
        std::fs::write(dir.path().join("notes.txt"), b"ignored").unwrap();

        let registry = ProfileRegistry::new(dir.path());
        assert_eq!(registry.available().unwrap(), ["alpha", "beta"]);
    }
}
