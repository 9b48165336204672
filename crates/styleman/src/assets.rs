//! Core asset file sets for the non-theme bundles.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! Each core target (desktop, mobile, admin, wizard) owns a set of source
//! files shipped with the application. The set participates in digests as
//! `(path, content hash)` pairs sorted by path, so the digest is stable
//! under registration order and changes whenever any file's content or
//! the set membership changes.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use crate::target::Target;

/// One registered core source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreFile {
    /// Virtual path, e.g. `desktop/topic-list.scss`.
    pub path: String,
    pub content: String,
}

/// Per-target registry of core source files.
#[derive(Debug, Clone, Default)]
pub struct CoreAssets {
    // BTreeMap keyed by path gives the sorted iteration the set hash needs.
    files: BTreeMap<Target, BTreeMap<String, String>>,
}

impl CoreAssets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source file for a core target. RTL variants share their
    /// base target's file set, so registration always uses the base.
    pub fn register(&mut self, target: Target, path: impl Into<String>, content: impl Into<String>) {
        self.files
            .entry(target.base())
            .or_default()
            .insert(path.into(), content.into());
    }

    /// The target's files sorted by path.
    pub fn files_for(&self, target: Target) -> Vec<CoreFile> {
        self.files
            .get(&target.base())
            .map(|m| {
                m.iter()
                    .map(|(path, content)| CoreFile {
                        path: path.clone(),
                        content: content.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Concatenated source for assembly, in path order.
    pub fn source_for(&self, target: Target) -> String {
        self.files
            .get(&target.base())
            .map(|m| {
                m.values()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join("\n\n")
            })
            .unwrap_or_default()
    }

    /// Stable hash of the target's file set: sorted `(path, sha256)` pairs.
    pub fn hash_for(&self, target: Target) -> String {
        let mut hasher = Sha256::new();
        if let Some(files) = self.files.get(&target.base()) {
            for (path, content) in files {
                hasher.update(path.as_bytes());
                hasher.update([0]);
                hasher.update(Sha256::digest(content.as_bytes()));
            }
        }
        format!("{:x}", hasher.finalize())
    }
}
