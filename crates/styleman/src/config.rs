//! Host and asset-URL configuration.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! Compiled stylesheets embed absolute asset URLs, so the effective
//! hostname/CDN configuration is a digest input: changing the CDN base
//! produces new artifacts rather than serving stale URLs from cache.
//! Font selections live here too because the color-definitions bundle
//! emits them as custom properties.

use serde::{Deserialize, Serialize};

/// Site-level configuration that flows into every compilation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Canonical hostname (no scheme), e.g. `forum.example.com`.
    pub hostname: String,

    /// Optional CDN base URL, e.g. `https://cdn.example.com`.
    /// When set it takes precedence over the hostname for asset URLs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cdn_url: Option<String>,

    /// Subfolder prefix when the site is not hosted at the domain root.
    /// Empty string for root-hosted sites; otherwise `/forum` style.
    #[serde(default)]
    pub base_path: String,

    /// Base font family for body text.
    pub base_font: String,

    /// Font family for headings.
    pub heading_font: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            hostname: "localhost".to_string(),
            cdn_url: None,
            base_path: String::new(),
            base_font: "Arial".to_string(),
            heading_font: "Arial".to_string(),
        }
    }
}

impl HostConfig {
    /// The absolute base URL assets are resolved against.
    ///
    /// CDN wins when configured; otherwise `https://{hostname}{base_path}`.
    pub fn asset_base_url(&self) -> String {
        match &self.cdn_url {
            Some(cdn) => format!("{}{}", cdn.trim_end_matches('/'), self.base_path),
            None => format!("https://{}{}", self.hostname, self.base_path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_base_url_without_cdn() {
        let config = HostConfig {
            hostname: "forum.example.com".to_string(),
            ..Default::default()
        };
        assert_eq!(config.asset_base_url(), "https://forum.example.com");
    }

    #[test]
    fn test_asset_base_url_with_cdn_and_subfolder() {
        let config = HostConfig {
            hostname: "forum.example.com".to_string(),
            cdn_url: Some("https://cdn.example.com/".to_string()),
            base_path: "/community".to_string(),
            ..Default::default()
        };
        assert_eq!(config.asset_base_url(), "https://cdn.example.com/community");
    }
}
