//! End-to-end pipeline tests: resolution, ordering, caching, fallbacks.
//!
//! Copyright (c) 2025 Posit, PBC

use std::sync::{Arc, Mutex};

use styleman::{
    CacheStore, ColorScheme, CompileOptions, CompiledCss, CoreAssets, CssCompiler,
    ExtensionFragment, ExtensionRegistry, GrassCompiler, HostConfig, Manager, SchemeColor,
    SchemeId, StyleError, Target, Theme, ThemeField, ThemeId, ThemeStore,
};
use tempfile::TempDir;

/// Compiler wrapper that records every invocation's logical file name.
#[derive(Clone)]
struct RecordingCompiler {
    inner: Arc<GrassCompiler>,
    invocations: Arc<Mutex<Vec<String>>>,
}

impl RecordingCompiler {
    fn new() -> Self {
        Self {
            inner: Arc::new(GrassCompiler::new()),
            invocations: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn invocations(&self) -> Vec<String> {
        self.invocations.lock().unwrap().clone()
    }

    fn count(&self) -> usize {
        self.invocations.lock().unwrap().len()
    }
}

impl CssCompiler for RecordingCompiler {
    fn compile(&self, source: &str, options: &CompileOptions) -> Result<CompiledCss, StyleError> {
        self.invocations
            .lock()
            .unwrap()
            .push(options.logical_name.clone());
        self.inner.compile(source, options)
    }
}

struct Fixture {
    manager: Manager,
    compiler: RecordingCompiler,
    _dir: TempDir,
}

/// Root theme (id 1) with a remote component R (id 2) and local
/// components A (id 3) and Z (id 4), attached in scrambled order.
fn standard_store() -> ThemeStore {
    let mut store = ThemeStore::new();

    let mut root = Theme::new(ThemeId(1), "Root")
        .with_field(ThemeField::Desktop, "body { color: red; }")
        .with_field(ThemeField::ColorDefinitions, ".root-colors { opacity: 1; }");
    root.component_ids = vec![ThemeId(4), ThemeId(2), ThemeId(3)];
    store.insert_theme(root);

    let mut r = Theme::component(ThemeId(2), "R")
        .with_field(ThemeField::Desktop, ".remote { color: purple; }");
    r.remote_url = Some("https://example.com/r.git".to_string());
    store.insert_theme(r);

    store.insert_theme(
        Theme::component(ThemeId(3), "A").with_field(ThemeField::Desktop, ".comp-a { color: aqua; }"),
    );
    store.insert_theme(
        Theme::component(ThemeId(4), "Z").with_field(ThemeField::Desktop, ".comp-z { color: plum; }"),
    );

    store.set_default_theme(ThemeId(1));
    store
}

fn fixture_with(store: ThemeStore, dir: TempDir) -> Fixture {
    let compiler = RecordingCompiler::new();
    let manager = Manager::new(
        store,
        ExtensionRegistry::new(),
        CoreAssets::new(),
        HostConfig::default(),
        CacheStore::open(dir.path()).unwrap(),
        Box::new(compiler.clone()),
    );
    Fixture {
        manager,
        compiler,
        _dir: dir,
    }
}

fn fixture() -> Fixture {
    fixture_with(standard_store(), TempDir::new().unwrap())
}

/// Pull the digest out of an href like
/// `https://localhost/stylesheets/desktop_theme_3_<digest>.css`.
fn digest_of(href: &str) -> String {
    let stem = href.rsplit('/').next().unwrap().trim_end_matches(".css");
    stem.rsplit('_').next().unwrap().to_string()
}

#[test]
fn test_end_to_end_desktop_and_mobile() {
    let fx = fixture();

    let desktop = fx.manager.stylesheet_details(Target::DesktopTheme).unwrap();
    // Root plus three components, all of which fill the desktop field.
    assert_eq!(desktop.len(), 4);

    let root = desktop.last().unwrap();
    assert_eq!(root.theme_name.as_deref(), Some("Root"));
    let artifact = fx
        .manager
        .cache()
        .get(Target::DesktopTheme, &digest_of(&root.href))
        .unwrap()
        .unwrap();
    assert!(artifact.css.contains("color:red"));

    // Nothing fills mobile: components are skipped, the root alone is
    // still emitted so there is at least one stable link. Never an error.
    let mobile = fx.manager.stylesheet_details(Target::MobileTheme).unwrap();
    assert_eq!(mobile.len(), 1);
    assert_eq!(mobile[0].theme_id, Some(ThemeId(1)));
}

#[test]
fn test_link_order_is_remote_local_root() {
    let fx = fixture();
    let details = fx.manager.stylesheet_details(Target::DesktopTheme).unwrap();
    let names: Vec<&str> = details
        .iter()
        .map(|d| d.theme_name.as_deref().unwrap())
        .collect();
    assert_eq!(names, vec!["R", "A", "Z", "Root"]);
}

#[test]
fn test_idempotent_cache_hit() {
    let fx = fixture();

    let first = fx.manager.stylesheet_details(Target::DesktopTheme).unwrap();
    let compiles_after_first = fx.compiler.count();

    let second = fx.manager.stylesheet_details(Target::DesktopTheme).unwrap();
    assert_eq!(first, second);
    // The second resolution compiled nothing.
    assert_eq!(fx.compiler.count(), compiles_after_first);
}

#[test]
fn test_component_edit_changes_only_its_href() {
    let dir = TempDir::new().unwrap();
    let first = fixture_with(standard_store(), dir);
    let before = first.manager.stylesheet_details(Target::DesktopTheme).unwrap();
    let dir = first._dir;

    // Same site, Z's desktop source edited.
    let mut store = standard_store();
    store.insert_theme(
        Theme::component(ThemeId(4), "Z").with_field(ThemeField::Desktop, ".comp-z { color: teal; }"),
    );
    let second = fixture_with(store, dir);
    let after = second.manager.stylesheet_details(Target::DesktopTheme).unwrap();

    assert_ne!(before[2].href, after[2].href, "Z's href must change");
    assert_eq!(before[0].href, after[0].href, "R's href must not change");
    assert_eq!(before[1].href, after[1].href, "A's href must not change");
    assert_eq!(before[3].href, after[3].href, "root's href must not change");
}

#[test]
fn test_component_isolation() {
    let fx = fixture();
    let details = fx.manager.stylesheet_details(Target::DesktopTheme).unwrap();

    let a = fx
        .manager
        .cache()
        .get(Target::DesktopTheme, &digest_of(&details[1].href))
        .unwrap()
        .unwrap();
    assert!(a.css.contains(".comp-a"));
    assert!(!a.css.contains(".comp-z"), "A's bundle must not see Z's text");
    assert!(!a.css.contains(".remote"));
}

#[test]
fn test_color_scheme_fallback_matches_base() {
    let fx = fixture();

    let bogus = fx
        .manager
        .color_scheme_stylesheet_details(Some(SchemeId(9999)), false)
        .unwrap();
    let base = fx
        .manager
        .color_scheme_stylesheet_details(None, false)
        .unwrap();
    assert_eq!(bogus, base);

    let artifact = fx
        .manager
        .cache()
        .get(Target::ColorDefinitions, &digest_of(&base[0].href))
        .unwrap()
        .unwrap();
    assert!(artifact.css.contains("--primary:"));
    assert!(artifact.css.contains("#222222"));
    assert!(artifact.css.contains(".root-colors"));
}

#[test]
fn test_assigned_scheme_is_served_to_live_requests() {
    let mut store = standard_store();
    store.insert_scheme(ColorScheme {
        id: SchemeId(7),
        name: "Ocean".to_string(),
        colors: vec![SchemeColor::new("primary", "abcdef")],
        base_scheme_name: None,
        version: 1,
    });
    let mut root = store.theme(ThemeId(1)).unwrap().clone();
    root.color_scheme_id = Some(SchemeId(7));
    store.insert_theme(root);

    let fx = fixture_with(store, TempDir::new().unwrap());
    fx.manager.precompile().unwrap();
    let after_precompile = fx.compiler.count();

    let details = fx.manager.color_scheme_stylesheet_details(None, false).unwrap();
    // Live resolution binds the same scheme the sweep did: cache hit.
    assert_eq!(fx.compiler.count(), after_precompile);

    let artifact = fx
        .manager
        .cache()
        .get(Target::ColorDefinitions, &digest_of(&details[0].href))
        .unwrap()
        .unwrap();
    assert!(artifact.css.contains("#abcdef"));
    assert!(!artifact.css.contains("#222222"));

    // An explicit request still overrides the assignment.
    let explicit = fx
        .manager
        .color_scheme_stylesheet_details(Some(SchemeId(0)), false)
        .unwrap();
    assert_ne!(explicit[0].href, details[0].href);
}

#[test]
fn test_missing_dark_variant_is_empty_not_error() {
    let fx = fixture();
    let dark = fx.manager.color_scheme_stylesheet_details(None, true).unwrap();
    assert!(dark.is_empty());
}

#[test]
fn test_dark_variant_resolves_when_assigned() {
    let mut store = standard_store();
    let dark = ColorScheme {
        id: SchemeId(20),
        name: "Midnight".to_string(),
        colors: vec![SchemeColor::new("primary", "0a0a0a")],
        base_scheme_name: Some("Dark".to_string()),
        version: 1,
    };
    store.insert_scheme(dark);
    let mut root = store.theme(ThemeId(1)).unwrap().clone();
    root.dark_scheme_id = Some(SchemeId(20));
    store.insert_theme(root);

    let fx = fixture_with(store, TempDir::new().unwrap());
    let details = fx.manager.color_scheme_stylesheet_details(None, true).unwrap();
    assert_eq!(details.len(), 1);

    let artifact = fx
        .manager
        .cache()
        .get(Target::ColorDefinitions, &digest_of(&details[0].href))
        .unwrap()
        .unwrap();
    assert!(artifact.css.contains("--primary:"));
    assert!(artifact.css.contains("#0a0a0a"));
}

#[test]
fn test_explicit_theme_resolution() {
    let mut store = standard_store();
    let mut alt = Theme::new(ThemeId(5), "Alt")
        .with_field(ThemeField::Desktop, ".alt { color: navy; }");
    alt.component_ids = vec![ThemeId(3)];
    store.insert_theme(alt);

    let fx = fixture_with(store, TempDir::new().unwrap());

    // A non-default root resolves its own chain: component A, then Alt.
    let details = fx
        .manager
        .stylesheet_details_for(Target::DesktopTheme, ThemeId(5))
        .unwrap();
    let names: Vec<&str> = details
        .iter()
        .map(|d| d.theme_name.as_deref().unwrap())
        .collect();
    assert_eq!(names, vec!["A", "Alt"]);

    // The default theme's details are unaffected by the explicit call.
    let default = fx.manager.stylesheet_details(Target::DesktopTheme).unwrap();
    assert_eq!(default.last().unwrap().theme_name.as_deref(), Some("Root"));

    // A dangling id degrades to empty, never an error.
    assert!(fx
        .manager
        .stylesheet_details_for(Target::DesktopTheme, ThemeId(99))
        .unwrap()
        .is_empty());
}

#[test]
fn test_component_resolves_alone() {
    let fx = fixture();
    let details = fx
        .manager
        .stylesheet_details_for(Target::DesktopTheme, ThemeId(3))
        .unwrap();
    assert_eq!(details.len(), 1);
    assert_eq!(details[0].theme_name.as_deref(), Some("A"));

    let artifact = fx
        .manager
        .cache()
        .get(Target::DesktopTheme, &digest_of(&details[0].href))
        .unwrap()
        .unwrap();
    assert!(artifact.css.contains(".comp-a"));
    assert!(!artifact.css.contains("color:red"), "root source must not leak in");
}

#[test]
fn test_core_target_needs_no_theme() {
    let mut store = ThemeStore::new();
    store.set_default_theme(ThemeId(42)); // dangling on purpose

    let mut assets = CoreAssets::new();
    assets.register(Target::Desktop, "base.scss", "body { margin: 0; }");

    let compiler = RecordingCompiler::new();
    let dir = TempDir::new().unwrap();
    let manager = Manager::new(
        store,
        ExtensionRegistry::new(),
        assets,
        HostConfig::default(),
        CacheStore::open(dir.path()).unwrap(),
        Box::new(compiler.clone()),
    );

    // Theme targets degrade to empty; core targets stay usable.
    assert!(manager.stylesheet_details(Target::DesktopTheme).unwrap().is_empty());
    let core = manager.stylesheet_details(Target::Desktop).unwrap();
    assert_eq!(core.len(), 1);
    assert!(core[0].theme_id.is_none());
}

#[test]
fn test_precompile_deduplicates_shared_component() {
    // Two root themes share component C.
    let mut store = ThemeStore::new();

    let shared = Theme::component(ThemeId(10), "Shared")
        .with_field(ThemeField::Desktop, ".shared { color: gold; }");
    store.insert_theme(shared);

    for (id, name) in [(1u64, "Site A"), (2u64, "Site B")] {
        let mut root = Theme::new(ThemeId(id), name)
            .with_field(ThemeField::Desktop, "body { margin: 0; }");
        root.component_ids = vec![ThemeId(10)];
        store.insert_theme(root);
    }
    store.set_default_theme(ThemeId(1));

    let fx = fixture_with(store, TempDir::new().unwrap());
    fx.manager.precompile().unwrap();

    let shared_desktop_compiles = fx
        .compiler
        .invocations()
        .iter()
        .filter(|name| name.starts_with("desktop_theme_10_"))
        .count();
    assert_eq!(
        shared_desktop_compiles, 1,
        "shared component must compile once per target, not once per requesting theme"
    );
}

#[test]
fn test_precompile_then_requests_hit_cache() {
    let fx = fixture();
    fx.manager.precompile().unwrap();
    let after_precompile = fx.compiler.count();

    fx.manager.stylesheet_details(Target::DesktopTheme).unwrap();
    fx.manager.stylesheet_details(Target::Desktop).unwrap();
    fx.manager
        .color_scheme_stylesheet_details(None, false)
        .unwrap();

    assert_eq!(fx.compiler.count(), after_precompile);
}

#[test]
fn test_link_tag_markup_and_escaping() {
    let mut store = ThemeStore::new();
    let root = Theme::new(ThemeId(1), "Fancy <\"Theme\">")
        .with_field(ThemeField::Desktop, "body { color: red; }");
    store.insert_theme(root);
    store.set_default_theme(ThemeId(1));

    let fx = fixture_with(store, TempDir::new().unwrap());
    let mut preloaded = Vec::new();
    let markup = fx
        .manager
        .stylesheet_link_tag_with_preload(Target::DesktopTheme, "screen", &mut |href| {
            preloaded.push(href.to_string())
        })
        .unwrap();

    assert!(markup.contains("rel=\"stylesheet\""));
    assert!(markup.contains("media=\"screen\""));
    assert!(markup.contains("data-theme-name=\"Fancy &lt;&quot;Theme&quot;&gt;\""));
    assert!(!markup.contains("<\"Theme\">"));
    assert_eq!(preloaded.len(), 1);
    assert!(preloaded[0].ends_with(".css"));
}

#[test]
fn test_extension_fragment_participates_in_output_and_digest() {
    let mut registry = ExtensionRegistry::new();
    registry.register_fragment(ExtensionFragment::new("chat", ".chat-drawer { width: 400px; }"));

    let compiler = RecordingCompiler::new();
    let dir = TempDir::new().unwrap();
    let manager = Manager::new(
        standard_store(),
        registry,
        CoreAssets::new(),
        HostConfig::default(),
        CacheStore::open(dir.path()).unwrap(),
        Box::new(compiler.clone()),
    );

    let with_ext = manager.stylesheet_details(Target::DesktopTheme).unwrap();

    let fx = fixture(); // no extension registered
    let without_ext = fx.manager.stylesheet_details(Target::DesktopTheme).unwrap();
    assert_ne!(with_ext[0].href, without_ext[0].href);

    let artifact = manager
        .cache()
        .get(Target::DesktopTheme, &digest_of(&with_ext[0].href))
        .unwrap()
        .unwrap();
    assert!(artifact.css.contains(".chat-drawer"));
}

#[test]
fn test_compile_error_is_visible_to_caller() {
    let mut store = ThemeStore::new();
    let root = Theme::new(ThemeId(1), "Broken")
        .with_field(ThemeField::Desktop, ".broken { color: $nope; }");
    store.insert_theme(root);
    store.set_default_theme(ThemeId(1));

    let fx = fixture_with(store, TempDir::new().unwrap());
    let err = fx.manager.stylesheet_details(Target::DesktopTheme).unwrap_err();
    assert!(matches!(err, StyleError::CompilationFailed { .. }));
}
