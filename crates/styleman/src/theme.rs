//! The customization tree: themes, components, and their store.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! A theme is the root customization unit. It owns per-target source
//! fields, a settings map its own source can reference, named upload
//! bindings, an assigned color scheme, and an ordered list of child
//! components. A component is itself a theme with `component = true`;
//! components never own components, so the tree has a fixed depth of two.
//!
//! The `ThemeStore` is the read boundary the pipeline consumes: theme and
//! scheme lookups, enabled-component enumeration, and the fallback rules
//! for missing color schemes.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::color_scheme::{ColorScheme, SchemeId};
use crate::target::{Target, ThemeField};

/// Identifier for a theme or component.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ThemeId(pub u64);

impl fmt::Display for ThemeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of an uploaded binary asset a theme variable points at.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UploadId(pub u64);

impl fmt::Display for UploadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A typed theme setting value.
///
/// Settings are exposed to the theme's own source text as preprocessor
/// variables, so the *value* (not just the key) is a digest input, and
/// string values must be quoted when emitted as SCSS.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
}

impl SettingValue {
    /// Render the value as a SCSS expression.
    pub fn to_scss(&self) -> String {
        match self {
            SettingValue::Bool(b) => b.to_string(),
            SettingValue::Integer(i) => i.to_string(),
            SettingValue::Float(f) => f.to_string(),
            SettingValue::String(s) => format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\"")),
        }
    }

    /// Stable text form folded into digests.
    pub fn digest_form(&self) -> String {
        match self {
            SettingValue::Bool(b) => format!("b:{b}"),
            SettingValue::Integer(i) => format!("i:{i}"),
            SettingValue::Float(f) => format!("f:{f}"),
            SettingValue::String(s) => format!("s:{s}"),
        }
    }
}

/// A theme or component in the customization tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub id: ThemeId,
    pub name: String,

    /// Components are themes attached as children of a root theme.
    #[serde(default)]
    pub component: bool,

    /// Disabled components are excluded from resolution and digests.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Set when the theme was installed from a remote source. Remote
    /// components order ahead of local ones in emitted stylesheets.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remote_url: Option<String>,

    /// Ordered child component ids. Empty for components themselves.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub component_ids: Vec<ThemeId>,

    /// Assigned color scheme; `None` falls back to the base scheme.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color_scheme_id: Option<SchemeId>,

    /// Separate palette for the prefers-dark variant; absence means the
    /// theme opts out of a dark variant entirely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dark_scheme_id: Option<SchemeId>,

    /// Key/value settings referenceable from this theme's own source.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub settings: BTreeMap<String, SettingValue>,

    /// Per-field source text. Missing fields read as empty.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<ThemeField, String>,

    /// Named variables bound to uploaded binary assets. `None` models a
    /// dangling reference whose upload record no longer exists; digests
    /// must still be deterministic for those.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub uploads: BTreeMap<String, Option<UploadId>>,
}

fn default_true() -> bool {
    true
}

impl Theme {
    /// Create an empty root theme.
    pub fn new(id: ThemeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            component: false,
            enabled: true,
            remote_url: None,
            component_ids: Vec::new(),
            color_scheme_id: None,
            dark_scheme_id: None,
            settings: BTreeMap::new(),
            fields: BTreeMap::new(),
            uploads: BTreeMap::new(),
        }
    }

    /// Create an empty component.
    pub fn component(id: ThemeId, name: impl Into<String>) -> Self {
        Self {
            component: true,
            ..Self::new(id, name)
        }
    }

    /// Source text for one field; empty string when unset.
    pub fn field(&self, field: ThemeField) -> &str {
        self.fields.get(&field).map(String::as_str).unwrap_or("")
    }

    /// Set a field's source text (builder style, used heavily in tests).
    pub fn with_field(mut self, field: ThemeField, source: impl Into<String>) -> Self {
        self.fields.insert(field, source.into());
        self
    }

    /// Whether any of the target's relevant fields carry source text.
    /// Components contributing nothing to a target emit no artifact there.
    pub fn has_content_for(&self, target: Target) -> bool {
        target.fields().iter().any(|f| !self.field(*f).trim().is_empty())
    }

    /// The target-relevant source text, fields joined in target order.
    pub fn fragment_for(&self, target: Target) -> String {
        let parts: Vec<&str> = target
            .fields()
            .iter()
            .map(|f| self.field(*f))
            .filter(|s| !s.trim().is_empty())
            .collect();
        parts.join("\n\n")
    }
}

/// Read boundary over the customization tree and its color schemes.
///
/// The store is populated by out-of-scope administrative actions; the
/// pipeline only reads it. All lookup failures degrade per the pipeline's
/// fallback rules instead of erroring.
#[derive(Debug, Default)]
pub struct ThemeStore {
    themes: HashMap<ThemeId, Theme>,
    schemes: HashMap<SchemeId, ColorScheme>,
    default_theme: Option<ThemeId>,
}

impl ThemeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_theme(&mut self, theme: Theme) {
        self.themes.insert(theme.id, theme);
    }

    pub fn insert_scheme(&mut self, scheme: ColorScheme) {
        self.schemes.insert(scheme.id, scheme);
    }

    /// Mark the site-default theme used when requests carry no explicit id.
    pub fn set_default_theme(&mut self, id: ThemeId) {
        self.default_theme = Some(id);
    }

    pub fn theme(&self, id: ThemeId) -> Option<&Theme> {
        self.themes.get(&id)
    }

    /// The active default theme, if one is configured and still exists.
    pub fn default_theme(&self) -> Option<&Theme> {
        self.default_theme.and_then(|id| self.themes.get(&id))
    }

    /// All root (non-component) themes, in id order for determinism.
    pub fn root_themes(&self) -> Vec<&Theme> {
        let mut roots: Vec<&Theme> = self.themes.values().filter(|t| !t.component).collect();
        roots.sort_by_key(|t| t.id);
        roots
    }

    /// All color schemes referenced by any theme, in id order.
    pub fn schemes_in_use(&self) -> Vec<&ColorScheme> {
        let mut ids: Vec<SchemeId> = self
            .themes
            .values()
            .flat_map(|t| [t.color_scheme_id, t.dark_scheme_id])
            .flatten()
            .collect();
        ids.sort();
        ids.dedup();
        ids.iter().filter_map(|id| self.schemes.get(id)).collect()
    }

    /// The enabled components of a root theme, in attachment order.
    /// Dangling ids and disabled components are silently skipped.
    pub fn enabled_components(&self, root: &Theme) -> Vec<&Theme> {
        root.component_ids
            .iter()
            .filter_map(|id| self.themes.get(id))
            .filter(|t| t.component && t.enabled)
            .collect()
    }

    /// Resolve a scheme id to a scheme, falling back to the built-in base.
    ///
    /// A missing or dangling id is not an error: themes keep working when
    /// their scheme is deleted out from under them.
    pub fn resolve_scheme(&self, id: Option<SchemeId>) -> ColorScheme {
        match id {
            Some(id) => match self.schemes.get(&id) {
                Some(scheme) => scheme.clone(),
                None => {
                    tracing::warn!(scheme_id = %id, "color scheme not found, using base");
                    ColorScheme::base()
                }
            },
            None => ColorScheme::base(),
        }
    }

    /// Resolve a theme's prefers-dark scheme. Unlike [`resolve_scheme`],
    /// absence yields `None` rather than a fallback: a theme without a
    /// dark palette has no dark variant at all.
    ///
    /// [`resolve_scheme`]: ThemeStore::resolve_scheme
    pub fn resolve_dark_scheme(&self, theme: &Theme) -> Option<ColorScheme> {
        let id = theme.dark_scheme_id?;
        match self.schemes.get(&id) {
            Some(scheme) => Some(scheme.clone()),
            None => {
                tracing::warn!(scheme_id = %id, "dark scheme not found, using dark base");
                Some(ColorScheme::dark_base())
            }
        }
    }
}
