//! Color schemes: named, versioned palettes of CSS color variables.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! A scheme is an ordered list of (name, hex) color definitions plus a
//! revision counter that participates in digests, so editing a scheme in
//! place still produces new artifacts. Two schemes are built in: the
//! well-known "Light" base every missing-id lookup falls back to, and a
//! "Dark" base used as the prefers-dark fallback.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for a stored color scheme.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SchemeId(pub u64);

impl fmt::Display for SchemeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One color variable definition inside a scheme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemeColor {
    /// Variable name, e.g. `primary` or `header_background`.
    pub name: String,
    /// Hex value without the leading `#`, e.g. `222222`.
    pub hex: String,
}

impl SchemeColor {
    pub fn new(name: impl Into<String>, hex: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            hex: hex.into(),
        }
    }
}

/// A named, versioned set of color-variable definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorScheme {
    pub id: SchemeId,
    pub name: String,
    /// Ordered color definitions. Order is part of the digest.
    pub colors: Vec<SchemeColor>,
    /// Name of the built-in scheme this one was derived from, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_scheme_name: Option<String>,
    /// Bumped on every edit; folded into digests so in-place edits
    /// invalidate by producing a new key.
    pub version: u32,
}

/// Reserved id for the built-in light base scheme.
pub const BASE_SCHEME_ID: SchemeId = SchemeId(0);

/// Reserved id for the built-in dark base scheme.
pub const DARK_BASE_SCHEME_ID: SchemeId = SchemeId(1);

impl ColorScheme {
    /// The well-known light base scheme. Missing scheme ids always
    /// resolve here rather than failing.
    pub fn base() -> Self {
        Self {
            id: BASE_SCHEME_ID,
            name: "Light".to_string(),
            colors: vec![
                SchemeColor::new("primary", "222222"),
                SchemeColor::new("secondary", "ffffff"),
                SchemeColor::new("tertiary", "0088cc"),
                SchemeColor::new("quaternary", "e45735"),
                SchemeColor::new("header_background", "ffffff"),
                SchemeColor::new("header_primary", "333333"),
                SchemeColor::new("highlight", "ffff4d"),
                SchemeColor::new("danger", "e45735"),
                SchemeColor::new("success", "009900"),
                SchemeColor::new("love", "fa6c8d"),
            ],
            base_scheme_name: None,
            version: 1,
        }
    }

    /// The built-in dark base scheme.
    pub fn dark_base() -> Self {
        Self {
            id: DARK_BASE_SCHEME_ID,
            name: "Dark".to_string(),
            colors: vec![
                SchemeColor::new("primary", "dddddd"),
                SchemeColor::new("secondary", "222222"),
                SchemeColor::new("tertiary", "099dd7"),
                SchemeColor::new("quaternary", "c14924"),
                SchemeColor::new("header_background", "111111"),
                SchemeColor::new("header_primary", "dddddd"),
                SchemeColor::new("highlight", "a87137"),
                SchemeColor::new("danger", "e45735"),
                SchemeColor::new("success", "1ca551"),
                SchemeColor::new("love", "fa6c8d"),
            ],
            base_scheme_name: None,
            version: 1,
        }
    }

    /// Look up a color value by variable name.
    pub fn color(&self, name: &str) -> Option<&str> {
        self.colors
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.hex.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_scheme_has_core_colors() {
        let base = ColorScheme::base();
        assert_eq!(base.name, "Light");
        assert_eq!(base.color("primary"), Some("222222"));
        assert_eq!(base.color("secondary"), Some("ffffff"));
        assert_eq!(base.color("nonexistent"), None);
    }

    #[test]
    fn test_dark_base_differs_from_base() {
        let light = ColorScheme::base();
        let dark = ColorScheme::dark_base();
        assert_ne!(light.id, dark.id);
        assert_ne!(light.color("primary"), dark.color("primary"));
    }

    #[test]
    fn test_scheme_serde_roundtrip() {
        let scheme = ColorScheme {
            id: SchemeId(42),
            name: "Ocean".to_string(),
            colors: vec![SchemeColor::new("primary", "004488")],
            base_scheme_name: Some("Light".to_string()),
            version: 3,
        };

        let json = serde_json::to_string(&scheme).unwrap();
        let parsed: ColorScheme = serde_json::from_str(&json).unwrap();
        assert_eq!(scheme, parsed);
    }
}
