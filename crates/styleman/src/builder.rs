//! The compilation unit: one `(target, theme, scheme)` binding.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! A builder resolves its digest, serves the cache fast path, and on a
//! miss assembles source, invokes the external compiler, applies the RTL
//! mirror pass when the target calls for it, and persists the artifact.
//! Compile failures are fatal to the single request that triggered them
//! and never leave a partial cache row behind.

use crate::assemble;
use crate::assets::CoreAssets;
use crate::cache::{CacheStore, CompiledArtifact};
use crate::color_scheme::ColorScheme;
use crate::compiler::{CompileOptions, CssCompiler};
use crate::config::HostConfig;
use crate::digest;
use crate::error::StyleError;
use crate::registry::ExtensionRegistry;
use crate::rtl;
use crate::target::Target;
use crate::theme::{Theme, ThemeId};

/// A builder bound to one compilation unit within a pipeline environment.
///
/// Builders are cheap, borrow-only values; the manager constructs one per
/// resolved entry. They are safe to use from concurrent workers: the only
/// shared mutable state they touch is the cache store, whose writes are
/// idempotent.
pub struct Builder<'a> {
    target: Target,
    theme: Option<&'a Theme>,
    /// Enabled components folded into this unit (bundle-style bindings
    /// such as the color-definitions chain). Empty for per-entry bindings.
    components: Vec<&'a Theme>,
    scheme: Option<ColorScheme>,
    registry: &'a ExtensionRegistry,
    assets: &'a CoreAssets,
    config: &'a HostConfig,
    cache: &'a CacheStore,
    compiler: &'a dyn CssCompiler,
}

impl<'a> Builder<'a> {
    pub fn new(
        target: Target,
        theme: Option<&'a Theme>,
        components: Vec<&'a Theme>,
        scheme: Option<ColorScheme>,
        registry: &'a ExtensionRegistry,
        assets: &'a CoreAssets,
        config: &'a HostConfig,
        cache: &'a CacheStore,
        compiler: &'a dyn CssCompiler,
    ) -> Self {
        Self {
            target,
            theme,
            components,
            scheme,
            registry,
            assets,
            config,
            cache,
            compiler,
        }
    }

    pub fn target(&self) -> Target {
        self.target
    }

    fn theme_id(&self) -> Option<ThemeId> {
        self.theme.map(|t| t.id)
    }

    /// The content digest for this binding. Pure; no I/O.
    pub fn digest(&self) -> String {
        digest::compute(
            self.target,
            self.theme,
            &self.components,
            self.scheme.as_ref(),
            self.registry,
            self.assets,
            self.config,
        )
    }

    /// Produce the compiled artifact for this binding.
    ///
    /// Unless `force`, an existing artifact at `(target, digest)` is
    /// returned unchanged — the fast path that dominates steady-state
    /// load. On a miss the full pipeline runs: assemble, compile, mirror
    /// (RTL targets only, without re-invoking the compiler), persist.
    ///
    /// # Errors
    ///
    /// Propagates [`StyleError::CompilationFailed`] from the external
    /// engine; nothing is written to the cache in that case.
    pub fn compile(&self, force: bool) -> Result<CompiledArtifact, StyleError> {
        let digest = self.digest();

        if !force {
            if let Some(artifact) = self.cache.get(self.target, &digest)? {
                tracing::debug!(target = %self.target, digest, "stylesheet cache hit");
                return Ok(artifact);
            }
        }

        tracing::debug!(target = %self.target, digest, force, "compiling stylesheet");

        let source = assemble::assemble(
            self.target,
            self.theme,
            &self.components,
            self.scheme.as_ref(),
            self.registry,
            self.assets,
            self.config,
        );

        let options = CompileOptions {
            logical_name: format!(
                "{}.scss",
                CacheStore::basename(self.target, self.theme_id(), &digest)
            ),
            load_paths: self.registry.import_paths().to_vec(),
            minified: true,
        };

        let compiled = self.compiler.compile(&source, &options)?;

        let css = if self.target.is_rtl() {
            rtl::mirror(&compiled.css)
        } else {
            compiled.css
        };

        self.cache
            .put(self.target, &digest, self.theme_id(), css, compiled.source_map)
    }
}
