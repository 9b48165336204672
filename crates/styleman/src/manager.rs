//! Request-facing facade: resolve, order, compile, emit links.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! The manager owns the pipeline environment (theme store, extension
//! registry, core assets, host config, cache store, compiler) and
//! answers the two questions a request has: which stylesheets does this
//! target need, and in what order. Missing reference data degrades to
//! empty results; compile errors always surface to the caller that asked
//! for the artifact.

use std::collections::HashSet;

use serde::Serialize;

use crate::assets::CoreAssets;
use crate::builder::Builder;
use crate::cache::{CacheStore, CompiledArtifact};
use crate::color_scheme::{ColorScheme, SchemeId};
use crate::compiler::CssCompiler;
use crate::config::HostConfig;
use crate::error::StyleError;
use crate::registry::ExtensionRegistry;
use crate::target::Target;
use crate::theme::{Theme, ThemeId, ThemeStore};

/// One emitted stylesheet reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StylesheetDetails {
    /// Content-addressed URL; any input change produces a new href.
    pub href: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme_id: Option<ThemeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme_name: Option<String>,
}

/// The pipeline facade.
///
/// All methods take `&self`; concurrent requests resolve and compile
/// independently, relying on the cache store's idempotent writes instead
/// of any cross-request lock.
pub struct Manager {
    store: ThemeStore,
    registry: ExtensionRegistry,
    assets: CoreAssets,
    config: HostConfig,
    cache: CacheStore,
    compiler: Box<dyn CssCompiler>,
}

impl Manager {
    pub fn new(
        store: ThemeStore,
        registry: ExtensionRegistry,
        assets: CoreAssets,
        config: HostConfig,
        cache: CacheStore,
        compiler: Box<dyn CssCompiler>,
    ) -> Self {
        Self {
            store,
            registry,
            assets,
            config,
            cache,
            compiler,
        }
    }

    pub fn store(&self) -> &ThemeStore {
        &self.store
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// The underlying artifact store (serving compiled bytes for hrefs).
    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    fn builder<'a>(
        &'a self,
        target: Target,
        theme: Option<&'a Theme>,
        components: Vec<&'a Theme>,
        scheme: Option<ColorScheme>,
    ) -> Builder<'a> {
        Builder::new(
            target,
            theme,
            components,
            scheme,
            &self.registry,
            &self.assets,
            &self.config,
            &self.cache,
            self.compiler.as_ref(),
        )
    }

    fn href_for(&self, artifact: &CompiledArtifact) -> String {
        format!(
            "{}/stylesheets/{}.css",
            self.config.asset_base_url(),
            CacheStore::basename(artifact.target, artifact.theme_id, &artifact.digest)
        )
    }

    /// Resolve, compile (cache permitting), and describe the stylesheets
    /// a target needs, in cascade order.
    ///
    /// Core targets yield exactly one entry and need no theme. Theme
    /// targets resolve the default theme; with none configured the result
    /// is empty, never an error. Ordering is a hard contract: remote
    /// components first (by remote URL), local components alphabetically,
    /// the root theme last so it can override its components' cascade.
    /// Components whose relevant fields are all empty are skipped; the
    /// root is always emitted so there is at least one stable link.
    pub fn stylesheet_details(&self, target: Target) -> Result<Vec<StylesheetDetails>, StyleError> {
        if !target.is_theme_target() {
            let artifact = self.builder(target, None, Vec::new(), None).compile(false)?;
            return Ok(vec![StylesheetDetails {
                href: self.href_for(&artifact),
                theme_id: None,
                theme_name: None,
            }]);
        }

        if target == Target::ColorDefinitions {
            return self.color_scheme_stylesheet_details(None, false);
        }

        let root = match self.store.default_theme() {
            Some(root) => root,
            None => {
                tracing::debug!(target = %target, "no default theme, emitting no stylesheets");
                return Ok(Vec::new());
            }
        };
        self.details_for_theme(target, root)
    }

    /// Like [`stylesheet_details`], but resolving an explicitly requested
    /// theme instead of the site default. A dangling id yields an empty
    /// result. Requesting a component resolves just that component alone.
    ///
    /// [`stylesheet_details`]: Manager::stylesheet_details
    pub fn stylesheet_details_for(
        &self,
        target: Target,
        theme_id: ThemeId,
    ) -> Result<Vec<StylesheetDetails>, StyleError> {
        if !target.is_theme_target() || target == Target::ColorDefinitions {
            return self.stylesheet_details(target);
        }

        let theme = match self.store.theme(theme_id) {
            Some(theme) => theme,
            None => {
                tracing::debug!(target = %target, theme_id = %theme_id, "unknown theme, emitting no stylesheets");
                return Ok(Vec::new());
            }
        };
        self.details_for_theme(target, theme)
    }

    fn details_for_theme(
        &self,
        target: Target,
        root: &Theme,
    ) -> Result<Vec<StylesheetDetails>, StyleError> {
        let entries = if root.component {
            vec![root]
        } else {
            order_entries(root, self.store.enabled_components(root))
        };

        let mut details = Vec::new();
        for entry in entries {
            // The requested unit itself is always emitted, empty or not,
            // so callers get at least one stable link.
            if entry.id != root.id && !entry.has_content_for(target) {
                continue;
            }
            let artifact = self
                .builder(target, Some(entry), Vec::new(), None)
                .compile(false)?;
            details.push(StylesheetDetails {
                href: self.href_for(&artifact),
                theme_id: Some(entry.id),
                theme_name: Some(entry.name.clone()),
            });
        }
        Ok(details)
    }

    /// The color-definitions chain: the resolved scheme's variables plus
    /// the root theme's and its components' `color_definitions` fields,
    /// compiled as a single bundle.
    ///
    /// A missing `scheme_id` resolves to the active theme's assigned
    /// scheme, then to the base scheme (same descriptor as asking for the
    /// base explicitly). With `dark`, the active
    /// theme's separate dark scheme is resolved instead; a theme without
    /// one yields an empty result for the dark variant only.
    pub fn color_scheme_stylesheet_details(
        &self,
        scheme_id: Option<SchemeId>,
        dark: bool,
    ) -> Result<Vec<StylesheetDetails>, StyleError> {
        let root = self.store.default_theme();

        let scheme = if dark {
            match root.and_then(|t| self.store.resolve_dark_scheme(t)) {
                Some(scheme) => scheme,
                None => {
                    tracing::debug!("no dark scheme resolvable, emitting no dark stylesheet");
                    return Ok(Vec::new());
                }
            }
        } else {
            // An explicit request wins; otherwise the active theme's
            // assigned scheme, matching what the precompile sweep builds.
            self.store
                .resolve_scheme(scheme_id.or(root.and_then(|t| t.color_scheme_id)))
        };

        let components = root
            .map(|t| self.store.enabled_components(t))
            .unwrap_or_default();

        let artifact = self
            .builder(Target::ColorDefinitions, root, components, Some(scheme))
            .compile(false)?;

        Ok(vec![StylesheetDetails {
            href: self.href_for(&artifact),
            theme_id: root.map(|t| t.id),
            theme_name: root.map(|t| t.name.clone()),
        }])
    }

    /// Render `<link>` markup for a target, one tag per emitted artifact,
    /// names escaped for safe embedding.
    pub fn stylesheet_link_tag(&self, target: Target, media: &str) -> Result<String, StyleError> {
        self.stylesheet_link_tag_with_preload(target, media, &mut |_| {})
    }

    /// Like [`stylesheet_link_tag`], invoking `preload` with each href so
    /// callers can emit preload headers alongside the markup.
    ///
    /// [`stylesheet_link_tag`]: Manager::stylesheet_link_tag
    pub fn stylesheet_link_tag_with_preload(
        &self,
        target: Target,
        media: &str,
        preload: &mut dyn FnMut(&str),
    ) -> Result<String, StyleError> {
        let details = self.stylesheet_details(target)?;
        let mut tags = Vec::with_capacity(details.len());
        for detail in &details {
            preload(&detail.href);
            let mut tag = format!(
                "<link href=\"{}\" media=\"{}\" rel=\"stylesheet\" data-target=\"{}\"",
                detail.href,
                html_escape(media),
                target
            );
            if let Some(id) = detail.theme_id {
                tag.push_str(&format!(" data-theme-id=\"{id}\""));
            }
            if let Some(name) = &detail.theme_name {
                tag.push_str(&format!(" data-theme-name=\"{}\"", html_escape(name)));
            }
            tag.push_str("/>");
            tags.push(tag);
        }
        Ok(tags.join("\n"))
    }

    /// Batch precompilation across targets, themes, and schemes in use.
    ///
    /// Each unique `(target, theme)` combination compiles at most once
    /// even when reachable through several requesting themes or several
    /// color schemes — distinct schemes share the same non-color
    /// artifact, so recompiling per scheme would be pure waste. Returns
    /// the number of artifacts built.
    pub fn precompile(&self) -> Result<usize, StyleError> {
        let mut built = 0;

        for &target in Target::core() {
            self.builder(target, None, Vec::new(), None).compile(true)?;
            built += 1;
        }

        let mut seen: HashSet<(Target, ThemeId)> = HashSet::new();
        for root in self.store.root_themes() {
            let components = self.store.enabled_components(root);
            for &target in Target::theme_targets() {
                for entry in components.iter().copied().chain(std::iter::once(root)) {
                    if entry.component && !entry.has_content_for(target) {
                        continue;
                    }
                    if seen.insert((target, entry.id)) {
                        self.builder(target, Some(entry), Vec::new(), None)
                            .compile(true)?;
                        built += 1;
                    }
                }
            }
        }

        // Color definitions vary per (root theme, scheme) pair.
        let mut seen_color: HashSet<(ThemeId, SchemeId)> = HashSet::new();
        for root in self.store.root_themes() {
            let mut schemes = vec![self.store.resolve_scheme(root.color_scheme_id)];
            if let Some(dark) = self.store.resolve_dark_scheme(root) {
                schemes.push(dark);
            }
            for scheme in schemes {
                if seen_color.insert((root.id, scheme.id)) {
                    let components = self.store.enabled_components(root);
                    self.builder(Target::ColorDefinitions, Some(root), components, Some(scheme))
                        .compile(true)?;
                    built += 1;
                }
            }
        }

        tracing::debug!(built, "precompile sweep finished");
        Ok(built)
    }
}

/// Cascade order for a theme target's entries: remote components first
/// (lexicographic by remote URL — deterministic and independent of
/// attachment order), then local components alphabetically by name, then
/// the root theme last.
fn order_entries<'a>(root: &'a Theme, components: Vec<&'a Theme>) -> Vec<&'a Theme> {
    let (mut remote, mut local): (Vec<&Theme>, Vec<&Theme>) = components
        .into_iter()
        .partition(|c| c.remote_url.is_some());
    remote.sort_by(|a, b| a.remote_url.cmp(&b.remote_url));
    local.sort_by(|a, b| a.name.cmp(&b.name));
    remote
        .into_iter()
        .chain(local)
        .chain(std::iter::once(root))
        .collect()
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
