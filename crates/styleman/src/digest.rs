//! Deterministic cache-key derivation.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! The digest is the load-bearing invariant of the whole pipeline: it
//! folds every compilation input into one stable key, so identical inputs
//! are never recompiled and changed inputs can never be served stale.
//! There is no explicit invalidation anywhere — staleness is structurally
//! impossible because the storage key *is* the content.
//!
//! The function is pure: it never touches the cache store or the external
//! compiler, and never performs I/O.

use sha2::{Digest, Sha256};

use crate::assets::CoreAssets;
use crate::color_scheme::ColorScheme;
use crate::config::HostConfig;
use crate::registry::ExtensionRegistry;
use crate::target::Target;
use crate::theme::Theme;

/// Hex length of emitted digests. Truncated SHA-256 keeps hrefs short
/// while matching the collision margin of the original's full SHA-1.
const DIGEST_LEN: usize = 40;

/// Compute the content digest for one `(target, theme, scheme)` binding.
///
/// Inputs are folded in a fixed priority order:
/// 1. the target's core asset file set and the extension fragment set
/// 2. the bound theme's relevant fields, settings values, and upload
///    identifiers, then the same for each bound component
/// 3. the resolved color scheme (id, colors, revision) plus the global
///    font settings, for color-bearing targets
/// 4. the effective hostname/CDN configuration
/// 5. the target's RTL flag
///
/// Missing upload references fold a stable placeholder so a dangling
/// binding still digests deterministically.
pub fn compute(
    target: Target,
    theme: Option<&Theme>,
    components: &[&Theme],
    scheme: Option<&ColorScheme>,
    registry: &ExtensionRegistry,
    assets: &CoreAssets,
    config: &HostConfig,
) -> String {
    let mut hasher = Sha256::new();

    hasher.update(b"target:");
    hasher.update(target.base().name().as_bytes());

    hasher.update(b"|core:");
    hasher.update(assets.hash_for(target).as_bytes());

    hasher.update(b"|extensions:");
    hasher.update(registry.set_hash().as_bytes());

    if let Some(theme) = theme {
        fold_theme(&mut hasher, theme, target);
        for component in components {
            fold_theme(&mut hasher, component, target);
        }
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
        hasher.update(b"|scheme:");
        hasher.update(scheme.id.to_string().as_bytes());
        hasher.update(b":");
        hasher.update(scheme.version.to_le_bytes());
        for color in &scheme.colors {
            hasher.update(color.name.as_bytes());
            hasher.update(b"=");
            hasher.update(color.hex.as_bytes());
            hasher.update([0]);
        }
        // Fonts are emitted as part of color-definition output.
        hasher.update(b"|fonts:");
        hasher.update(config.base_font.as_bytes());
        hasher.update([0]);
        hasher.update(config.heading_font.as_bytes());
    }

    hasher.update(b"|host:");
    hasher.update(config.asset_base_url().as_bytes());

    hasher.update(b"|rtl:");
    hasher.update([u8::from(target.is_rtl())]);

    let hex = format!("{:x}", hasher.finalize());
    hex[..DIGEST_LEN].to_string()
}

/// Fold one theme's target-relevant state into the hash.
fn fold_theme(hasher: &mut Sha256, theme: &Theme, target: Target) {
    hasher.update(b"|theme:");
    hasher.update(theme.id.to_string().as_bytes());

    for field in target.fields() {
        hasher.update(field.name().as_bytes());
        hasher.update([0]);
        hasher.update(theme.field(*field).as_bytes());
        hasher.update([0]);
    }

    // Settings fold values, not just keys: a value edit referenced by the
    // theme's own source must produce a new artifact.
    for (key, value) in &theme.settings {
        hasher.update(b"setting:");
        hasher.update(key.as_bytes());
        hasher.update(b"=");
        hasher.update(value.digest_form().as_bytes());
        hasher.update([0]);
    }

    // Uploads fold identifiers, not bytes: replacing an uploaded asset
    // changes its id and therefore the digest, even when the theme's
    // source text is untouched.
    for (name, upload) in &theme.uploads {
        hasher.update(b"upload:");
        hasher.update(name.as_bytes());
        hasher.update(b"=");
        match upload {
            Some(id) => hasher.update(id.to_string().as_bytes()),
            None => hasher.update(b"missing"),
        }
        hasher.update([0]);
    }
}
