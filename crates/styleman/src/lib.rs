//! Multi-tenant stylesheet build and caching pipeline.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! Given a delivery target (a logical stylesheet bundle such as desktop,
//! admin, a theme bundle, or a color-palette bundle), the pipeline
//! assembles source fragments from core assets, installed extensions,
//! and the selected theme tree, compiles them through an external CSS
//! preprocessor, and persists the result keyed by a content-derived
//! digest. Identical inputs are never recompiled; changed inputs are
//! never served stale — the cache key encodes the content, so no
//! explicit invalidation exists anywhere.
//!
//! Main entry points:
//! - [`Manager`]: request-facing facade (resolution, ordering, links)
//! - [`Builder`]: one compilation unit
//! - [`digest::compute`]: the pure cache-key derivation
//! - [`CacheStore`]: the two-tier (files + index rows) artifact store

mod assemble;
mod assets;
mod builder;
mod cache;
mod color_scheme;
mod compiler;
mod config;
pub mod digest;
mod error;
mod manager;
mod registry;
mod rtl;
mod target;
mod theme;

pub use assets::{CoreAssets, CoreFile};
pub use builder::Builder;
pub use cache::{CacheRow, CacheStore, CompiledArtifact};
pub use color_scheme::{
    BASE_SCHEME_ID, ColorScheme, DARK_BASE_SCHEME_ID, SchemeColor, SchemeId,
};
pub use compiler::{CompileOptions, CompiledCss, CssCompiler, GrassCompiler};
pub use config::HostConfig;
pub use error::StyleError;
pub use manager::{Manager, StylesheetDetails};
pub use registry::{ExtensionFragment, ExtensionRegistry};
pub use rtl::mirror;
pub use target::{Target, ThemeField};
pub use theme::{SettingValue, Theme, ThemeId, ThemeStore, UploadId};
