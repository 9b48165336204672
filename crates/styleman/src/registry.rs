//! Extension-contributed stylesheet fragments and import paths.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! Installed extensions contribute extra preprocessor fragments that are
//! assembled ahead of theme source, plus directories to add to the
//! compiler's import search path. The registry is an explicit value the
//! manager is constructed with, not process-global state; administrative
//! reloads swap its contents wholesale.

use std::path::PathBuf;

use sha2::{Digest, Sha256};

/// One fragment contributed by an installed extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionFragment {
    /// Identifier of the contributing extension (for logs and ordering).
    pub source: String,
    /// The fragment's preprocessor source text.
    pub content: String,
}

impl ExtensionFragment {
    pub fn new(source: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            content: content.into(),
        }
    }
}

/// Process-wide set of extension fragments and import search paths.
#[derive(Debug, Clone, Default)]
pub struct ExtensionRegistry {
    fragments: Vec<ExtensionFragment>,
    import_paths: Vec<PathBuf>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_fragment(&mut self, fragment: ExtensionFragment) {
        self.fragments.push(fragment);
    }

    pub fn register_import_path(&mut self, path: impl Into<PathBuf>) {
        self.import_paths.push(path.into());
    }

    /// Fragments in registration order (the order they are assembled in).
    pub fn fragments(&self) -> &[ExtensionFragment] {
        &self.fragments
    }

    /// Directories the external compiler searches for imports.
    pub fn import_paths(&self) -> &[PathBuf] {
        &self.import_paths
    }

    /// Replace all contents after an administrative reload.
    pub fn replace(&mut self, fragments: Vec<ExtensionFragment>, import_paths: Vec<PathBuf>) {
        self.fragments = fragments;
        self.import_paths = import_paths;
    }

    /// Order-independent hash of the fragment set.
    ///
    /// Each fragment hashes individually; the per-fragment hashes are
    /// sorted before the outer hash, so registration order does not
    /// change the digest while any content change does.
    pub fn set_hash(&self) -> String {
        let mut fragment_hashes: Vec<String> = self
            .fragments
            .iter()
            .map(|f| {
                let mut hasher = Sha256::new();
                hasher.update(f.source.as_bytes());
                hasher.update([0]);
                hasher.update(f.content.as_bytes());
                format!("{:x}", hasher.finalize())
            })
            .collect();
        fragment_hashes.sort();

        let mut hasher = Sha256::new();
        for h in &fragment_hashes {
            hasher.update(h.as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }
}
