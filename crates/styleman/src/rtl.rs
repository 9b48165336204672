//! RTL mirroring of compiled CSS.
//!
//! Copyright (c) 2025 Posit, PBC
//!
//! RTL targets are produced by a deterministic post-processing pass over
//! the already-compiled CSS of the base bundle shape — the external
//! compiler is never re-invoked for mirroring. The pass swaps directional
//! `left`/`right` tokens (property names and keyword values alike), flips
//! `direction: ltr|rtl`, and reorders four-value `margin`/`padding`
//! shorthands.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Four-value margin/padding shorthand: top right bottom left.
static BOX_SHORTHAND: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?P<prop>\b(?:margin|padding))\s*:\s*(?P<values>[^;}!]+)").unwrap()
});

/// Whole-word directional tokens.
static LEFT_RIGHT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(left|right)\b").unwrap());

/// `direction` declarations.
static DIRECTION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bdirection\s*:\s*(ltr|rtl)\b").unwrap());

/// Mirror directional CSS for right-to-left scripts.
///
/// The pass is deterministic and involutive for the constructs it
/// handles: mirroring twice restores the input.
pub fn mirror(css: &str) -> String {
    // Shorthands first: their values carry no left/right keywords, and
    // doing them first keeps the token swap from seeing raw lengths.
    let css = BOX_SHORTHAND.replace_all(css, |caps: &Captures<'_>| {
        let prop = &caps["prop"];
        let values: Vec<&str> = caps["values"].split_whitespace().collect();
        if values.len() == 4 {
            // top right bottom left -> top left bottom right
            format!(
                "{}: {} {} {} {}",
                prop, values[0], values[3], values[2], values[1]
            )
        } else {
            caps[0].to_string()
        }
    });

    let css = LEFT_RIGHT.replace_all(&css, |caps: &Captures<'_>| {
        match &caps[1] {
            "left" => "right",
            _ => "left",
        }
        .to_string()
    });

    DIRECTION
        .replace_all(&css, |caps: &Captures<'_>| {
            match &caps[1] {
                "ltr" => "direction: rtl",
                _ => "direction: ltr",
            }
            .to_string()
        })
        .into_owned()
}
