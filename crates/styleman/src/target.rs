//! Delivery targets: the logical stylesheet bundles the pipeline can build.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! A target names one deliverable bundle: the core application bundles
//! (desktop, mobile, admin, wizard, each with an RTL mirror), the
//! theme-owned bundles (desktop_theme, mobile_theme, embedded_theme), and
//! the color-definitions bundle that emits a color scheme as CSS custom
//! properties. The target decides which fields of a theme are relevant:
//! `desktop_theme` pulls a theme's "common" and "desktop" fields and never
//! its "mobile" field.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::StyleError;

/// A logical stylesheet bundle kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    Desktop,
    Mobile,
    Admin,
    Wizard,
    DesktopRtl,
    MobileRtl,
    AdminRtl,
    WizardRtl,
    DesktopTheme,
    MobileTheme,
    EmbeddedTheme,
    ColorDefinitions,
}

/// One per-theme source field. Each theme carries independent source text
/// for each field; a target selects which fields it reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeField {
    Common,
    Desktop,
    Mobile,
    Embedded,
    ColorDefinitions,
}

impl Target {
    /// All targets, in the order the batch precompiler walks them.
    pub fn all() -> &'static [Target] {
        &[
            Target::Desktop,
            Target::Mobile,
            Target::Admin,
            Target::Wizard,
            Target::DesktopRtl,
            Target::MobileRtl,
            Target::AdminRtl,
            Target::WizardRtl,
            Target::DesktopTheme,
            Target::MobileTheme,
            Target::EmbeddedTheme,
            Target::ColorDefinitions,
        ]
    }

    /// The core (non-theme) bundles, RTL variants included.
    pub fn core() -> &'static [Target] {
        &[
            Target::Desktop,
            Target::Mobile,
            Target::Admin,
            Target::Wizard,
            Target::DesktopRtl,
            Target::MobileRtl,
            Target::AdminRtl,
            Target::WizardRtl,
        ]
    }

    /// The theme-owned bundles that are resolved per theme/component.
    pub fn theme_targets() -> &'static [Target] {
        &[
            Target::DesktopTheme,
            Target::MobileTheme,
            Target::EmbeddedTheme,
        ]
    }

    /// Whether the compiled output of this target is mirrored for
    /// right-to-left scripts. RTL and LTR variants of the same logical
    /// bundle are distinct artifacts with distinct digests.
    pub fn is_rtl(&self) -> bool {
        matches!(
            self,
            Target::DesktopRtl | Target::MobileRtl | Target::AdminRtl | Target::WizardRtl
        )
    }

    /// The LTR base of an RTL variant; identity for every other target.
    /// Core asset file sets are registered against base targets only.
    pub fn base(&self) -> Target {
        match self {
            Target::DesktopRtl => Target::Desktop,
            Target::MobileRtl => Target::Mobile,
            Target::AdminRtl => Target::Admin,
            Target::WizardRtl => Target::Wizard,
            other => *other,
        }
    }

    /// Whether this target reads theme source fields at all.
    pub fn is_theme_target(&self) -> bool {
        !self.fields().is_empty()
    }

    /// The theme fields this target reads, in assembly order.
    pub fn fields(&self) -> &'static [ThemeField] {
        match self {
            Target::DesktopTheme => &[ThemeField::Common, ThemeField::Desktop],
            Target::MobileTheme => &[ThemeField::Common, ThemeField::Mobile],
            Target::EmbeddedTheme => &[ThemeField::Embedded],
            Target::ColorDefinitions => &[ThemeField::ColorDefinitions],
            _ => &[],
        }
    }

    /// Whether this target's digest and output depend on the resolved
    /// color scheme (and the font settings emitted alongside it).
    pub fn uses_color_scheme(&self) -> bool {
        matches!(self, Target::ColorDefinitions)
    }

    /// The snake_case name used in file names and hrefs.
    pub fn name(&self) -> &'static str {
        match self {
            Target::Desktop => "desktop",
            Target::Mobile => "mobile",
            Target::Admin => "admin",
            Target::Wizard => "wizard",
            Target::DesktopRtl => "desktop_rtl",
            Target::MobileRtl => "mobile_rtl",
            Target::AdminRtl => "admin_rtl",
            Target::WizardRtl => "wizard_rtl",
            Target::DesktopTheme => "desktop_theme",
            Target::MobileTheme => "mobile_theme",
            Target::EmbeddedTheme => "embedded_theme",
            Target::ColorDefinitions => "color_definitions",
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Target {
    type Err = StyleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Target::all()
            .iter()
            .find(|t| t.name() == s)
            .copied()
            .ok_or_else(|| StyleError::UnknownTarget(s.to_string()))
    }
}

impl ThemeField {
    pub fn name(&self) -> &'static str {
        match self {
            ThemeField::Common => "common",
            ThemeField::Desktop => "desktop",
            ThemeField::Mobile => "mobile",
            ThemeField::Embedded => "embedded",
            ThemeField::ColorDefinitions => "color_definitions",
        }
    }
}

impl fmt::Display for ThemeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
