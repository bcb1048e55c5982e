use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use catalog::{GalleryLayout, ListingKind};
use galleryconfig::{GalleryConfig, KeymapMode, ListingMode, RoutingMode, MAX_DEBOUNCE};
use navigator::RouteStyle;
use renderer::{Keymap, WindowConfig};

use crate::cli::{ListingArg, RoutingArg, RunArgs};
use crate::paths::AppPaths;

/// Everything a gallery session needs, after layering CLI flags over the
/// configuration file over built-in defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    pub source: String,
    pub layout: GalleryLayout,
    pub routing: RouteStyle,
    pub route: Option<String>,
    pub debounce: Duration,
    pub editor_buffer: PathBuf,
    pub window: WindowConfig,
}

/// Loads `explicit` (which must exist) or the default config file when
/// present.
pub fn load_config(explicit: Option<&Path>, paths: &AppPaths) -> Result<GalleryConfig> {
    match explicit {
        Some(path) => GalleryConfig::load(path)
            .with_context(|| format!("failed to load configuration {}", path.display())),
        None => {
            let path = paths.config_file();
            GalleryConfig::load_or_default(&path)
                .with_context(|| format!("failed to load configuration {}", path.display()))
        }
    }
}

pub fn layout_for(config: &GalleryConfig, listing: Option<ListingArg>) -> GalleryLayout {
    let listing = match listing {
        Some(ListingArg::Index) => ListingKind::DirectoryIndex,
        Some(ListingArg::Manifest) => ListingKind::Manifest,
        None => match config.listing {
            ListingMode::Index => ListingKind::DirectoryIndex,
            ListingMode::Manifest => ListingKind::Manifest,
        },
    };
    GalleryLayout {
        listing,
        fragment_dir: config.fragment_dir.clone(),
        manifest: config.manifest.clone(),
        vertex_shader: config.vertex_shader.clone(),
    }
}

impl Settings {
    pub fn resolve(args: &RunArgs, config: GalleryConfig, paths: &AppPaths) -> Result<Self> {
        let source = args
            .source
            .clone()
            .or_else(|| config.source.clone())
            .ok_or_else(|| {
                anyhow!(
                    "no gallery source given; pass SOURCE or set `source` in {}",
                    paths.config_file().display()
                )
            })?;

        let layout = layout_for(&config, args.listing);

        let routing = match args.routing {
            Some(RoutingArg::Path) => RouteStyle::Path,
            Some(RoutingArg::Hash) => RouteStyle::Hash,
            None => match config.routing {
                RoutingMode::Path => RouteStyle::Path,
                RoutingMode::Hash => RouteStyle::Hash,
            },
        };

        let route = args
            .route
            .clone()
            .or_else(|| remembered_location(&paths.location_file()));

        let debounce = match args.debounce_ms {
            Some(0) => return Err(anyhow!("--debounce-ms must be greater than zero")),
            Some(ms) if Duration::from_millis(ms) > MAX_DEBOUNCE => {
                return Err(anyhow!(
                    "--debounce-ms must be at most {}",
                    MAX_DEBOUNCE.as_millis()
                ))
            }
            Some(ms) => Duration::from_millis(ms),
            None => config.debounce,
        };

        let editor_buffer = args
            .editor_buffer
            .clone()
            .or_else(|| config.editor_buffer.clone())
            .unwrap_or_else(|| paths.editor_buffer());

        let keymap = if args.vim {
            Keymap::Vim
        } else {
            match config.keymap {
                KeymapMode::Default => Keymap::Default,
                KeymapMode::Vim => Keymap::Vim,
            }
        };
        let size = args
            .size
            .unwrap_or((config.window.width, config.window.height));

        Ok(Self {
            source,
            layout,
            routing,
            route,
            debounce,
            editor_buffer,
            window: WindowConfig {
                title: config.window.title,
                size,
                keymap,
            },
        })
    }
}

fn remembered_location(path: &Path) -> Option<String> {
    let raw = fs::read_to_string(path).ok()?;
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn paths(root: &TempDir) -> AppPaths {
        AppPaths::from_raw(root.path().join("config"), root.path().join("cache"))
    }

    #[test]
    fn cli_overrides_config_overrides_defaults() {
        let root = TempDir::new().unwrap();
        let config = GalleryConfig::from_toml_str(
            r#"
source = "http://localhost:8000/"
listing = "manifest"
routing = "hash"
debounce = "750ms"
keymap = "vim"

[window]
width = 640
height = 480
"#,
        )
        .unwrap();

        let args = RunArgs {
            source: Some("/srv/shaders".into()),
            routing: Some(RoutingArg::Path),
            size: Some((800, 600)),
            ..RunArgs::default()
        };
        let settings = Settings::resolve(&args, config, &paths(&root)).unwrap();

        assert_eq!(settings.source, "/srv/shaders");
        assert_eq!(settings.layout.listing, ListingKind::Manifest);
        assert_eq!(settings.routing, RouteStyle::Path);
        assert_eq!(settings.debounce, Duration::from_millis(750));
        assert_eq!(settings.window.size, (800, 600));
        assert_eq!(settings.window.keymap, Keymap::Vim);
        assert_eq!(
            settings.editor_buffer,
            root.path().join("cache").join("editor.glsl")
        );
    }

    #[test]
    fn missing_source_is_an_error() {
        let root = TempDir::new().unwrap();
        let err = Settings::resolve(&RunArgs::default(), GalleryConfig::default(), &paths(&root))
            .unwrap_err();
        assert!(err.to_string().contains("no gallery source"));
    }

    #[test]
    fn zero_debounce_flag_is_rejected() {
        let root = TempDir::new().unwrap();
        let args = RunArgs {
            source: Some("gallery".into()),
            debounce_ms: Some(0),
            ..RunArgs::default()
        };
        assert!(Settings::resolve(&args, GalleryConfig::default(), &paths(&root)).is_err());
    }

    #[test]
    fn oversized_debounce_flag_is_rejected() {
        let root = TempDir::new().unwrap();
        let args = RunArgs {
            source: Some("gallery".into()),
            debounce_ms: Some(u64::MAX),
            ..RunArgs::default()
        };
        let err = Settings::resolve(&args, GalleryConfig::default(), &paths(&root)).unwrap_err();
        assert!(err.to_string().contains("at most"), "{err}");
    }

    #[test]
    fn route_falls_back_to_remembered_location() {
        let root = TempDir::new().unwrap();
        let paths = paths(&root);
        fs::create_dir_all(paths.cache_dir()).unwrap();
        fs::write(paths.location_file(), "http://localhost:8000/waves\n").unwrap();

        let args = RunArgs {
            source: Some("gallery".into()),
            ..RunArgs::default()
        };
        let settings = Settings::resolve(&args, GalleryConfig::default(), &paths).unwrap();
        assert_eq!(settings.route.as_deref(), Some("http://localhost:8000/waves"));

        let args = RunArgs {
            source: Some("gallery".into()),
            route: Some("tunnel".into()),
            ..RunArgs::default()
        };
        let settings = Settings::resolve(&args, GalleryConfig::default(), &paths).unwrap();
        assert_eq!(settings.route.as_deref(), Some("tunnel"));
    }

    #[test]
    fn explicit_config_must_exist() {
        let root = TempDir::new().unwrap();
        let missing = root.path().join("nope.toml");
        assert!(load_config(Some(&missing), &paths(&root)).is_err());
        assert_eq!(
            load_config(None, &paths(&root)).unwrap(),
            GalleryConfig::default()
        );
    }
}
