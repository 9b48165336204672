//! Source assembly: everything that goes in front of the external compiler.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! Assembly order for one compilation unit:
//! 1. global prelude: asset-URL helper functions honoring CDN/subfolder
//! 2. extension-registered fragments, in registration order
//! 3. the color-scheme variable block, when the target is color-bearing
//! 4. the bound theme's block: its settings and upload variables, then
//!    its target-relevant fragment
//! 5. each bound component's block, likewise
//!
//! Component isolation holds by construction: a component's block emits
//! only that component's own variables and fragment, so no component ever
//! sees a sibling's source.

use crate::assets::CoreAssets;
use crate::color_scheme::ColorScheme;
use crate::config::HostConfig;
use crate::registry::ExtensionRegistry;
use crate::target::Target;
use crate::theme::Theme;

/// The global helper prelude every compilation starts with.
///
/// `asset-url` and `absolute-image-url` resolve paths against the
/// effective CDN/subfolder base so compiled output carries absolute URLs.
pub fn prelude(config: &HostConfig) -> String {
    format!(
        r##"$asset-base-url: "{base}";
@function asset-url($path) {{
  @return url("#{{$asset-base-url}}#{{$path}}");
}}
@function absolute-image-url($name) {{
  @return asset-url("/images#{{$name}}");
}}"##,
        base = config.asset_base_url()
    )
}

/// SCSS variable declarations for a color scheme.
pub fn scheme_variables(scheme: &ColorScheme) -> String {
    let mut out = String::new();
    for color in &scheme.colors {
        out.push_str(&format!("${}: #{};\n", color.name, color.hex));
    }
    out
}

/// The `:root` custom-property block the color-definitions bundle emits:
/// every scheme color plus the global font selections.
pub fn color_definitions_block(scheme: &ColorScheme, config: &HostConfig) -> String {
    let mut out = String::from(":root {\n");
    for color in &scheme.colors {
        out.push_str(&format!("  --{}: #{};\n", color.name.replace('_', "-"), color.hex));
    }
    out.push_str(&format!("  --font-family: \"{}\";\n", config.base_font));
    out.push_str(&format!(
        "  --heading-font-family: \"{}\";\n",
        config.heading_font
    ));
    out.push_str("}\n");
    out
}

/// One theme's isolated block: its own variables, then its fragment.
fn theme_block(theme: &Theme, target: Target, config: &HostConfig) -> String {
    let mut out = String::new();

    for (key, value) in &theme.settings {
        out.push_str(&format!("${}: {};\n", key, value.to_scss()));
    }

    for (name, upload) in &theme.uploads {
        match upload {
            Some(id) => out.push_str(&format!(
                "${}: url(\"{}/uploads/{}\");\n",
                name,
                config.asset_base_url(),
                id
            )),
            None => {
                // Dangling binding: skip the variable, keep compiling.
                tracing::warn!(theme_id = %theme.id, upload = %name, "upload reference missing, skipping variable");
            }
        }
    }

    let fragment = theme.fragment_for(target);
    if !fragment.is_empty() {
        out.push_str(&fragment);
        out.push('\n');
    }
    out
}

/// Assemble the full source text for one `(target, theme, scheme)` binding.
pub fn assemble(
    target: Target,
    theme: Option<&Theme>,
    components: &[&Theme],
    scheme: Option<&ColorScheme>,
    registry: &ExtensionRegistry,
    assets: &CoreAssets,
    config: &HostConfig,
) -> String {
    let mut parts: Vec<String> = vec![prelude(config)];

    for fragment in registry.fragments() {
        parts.push(fragment.content.clone());
    }

    if target.uses_color_scheme() {
        let resolved;
        let scheme = match scheme {
            Some(s) => s,
            None => {
                resolved = ColorScheme::base();
                &resolved
            }
        };
        parts.push(scheme_variables(scheme));
        parts.push(color_definitions_block(scheme, config));
    }

    if !target.is_theme_target() {
        let core = assets.source_for(target);
        if !core.is_empty() {
            parts.push(core);
        }
    }

    if let Some(theme) = theme {
        parts.push(theme_block(theme, target, config));
        for component in components {
            parts.push(theme_block(component, target, config));
        }
    }

    parts.retain(|p| !p.trim().is_empty());
    parts.join("\n\n")
}
