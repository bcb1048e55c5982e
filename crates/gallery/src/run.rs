use std::fs;
use std::path::Path;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use catalog::{GallerySource, SourceCache};
use crossbeam_channel::{at, never, select};
use navigator::{parse_route, Location, Navigator};
use renderer::{compile_stages, WindowRuntime, WindowSignal, DEFAULT_VERTEX_SHADER};
use tracing_subscriber::EnvFilter;

use crate::cli::{CheckArgs, ListArgs, RunArgs};
use crate::clipboard::SystemClipboard;
use crate::editor::LiveEditor;
use crate::paths::AppPaths;
use crate::session::Session;
use crate::settings::{layout_for, load_config, Settings};

pub fn initialise_tracing() {
    let default_filter = "warn,shader_gallery=info,renderer=info,catalog=info,navigator=info,naga=error,wgpu=error,wgpu_core=error,wgpu_hal=error,winit=error";
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

pub fn run(args: RunArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    let config = load_config(args.config.as_deref(), &paths)?;
    let settings = Settings::resolve(&args, config, &paths)?;
    tracing::debug!(
        config = %paths.config_dir().display(),
        cache = %paths.cache_dir().display(),
        source = %settings.source,
        listing = ?settings.layout.listing,
        routing = ?settings.routing,
        debounce = ?settings.debounce,
        editor_buffer = %settings.editor_buffer.display(),
        "resolved shader-gallery settings"
    );

    let source = GallerySource::from_input(&settings.source)?;
    let location = Location::new(&location_base(&source), settings.routing);
    let sources = SourceCache::new(source.clone().into_provider(settings.layout.clone())?);

    // A listing failure ends the session before any window exists.
    let listing = sources
        .list()
        .with_context(|| format!("failed to list shaders at {source}"))?;
    let mut navigator = Navigator::new(listing)?;
    tracing::info!(shaders = navigator.len(), %source, "loaded shader listing");

    if let Some(route) = settings
        .route
        .as_deref()
        .and_then(|raw| parse_route(raw, settings.routing))
    {
        if navigator.select_route(&route) {
            tracing::info!(route = %route, shader = %navigator.current(), "opening routed shader");
        } else {
            tracing::debug!(route = %route, "route matched no shader; starting at the first");
        }
    }

    let mut editor = LiveEditor::new(settings.editor_buffer.clone(), settings.debounce);
    if let Err(err) = editor.watch() {
        tracing::warn!("live editing disabled: {err:#}");
    }

    let window = WindowRuntime::spawn(settings.window.clone())?;
    tracing::info!(
        buffer = %editor.path().display(),
        "edit the buffer to live-reload the current shader"
    );

    let mut session = Session::new(sources, navigator, location, editor, window)
        .remember_location_in(paths.location_file());
    session.start()?;

    let mut clipboard = SystemClipboard::default();
    let outcome = event_loop(&mut session, &mut clipboard);

    let window = session.into_sink();
    window.shutdown()?;
    outcome
}

fn event_loop<P: catalog::ShaderProvider>(
    session: &mut Session<P, WindowRuntime>,
    clipboard: &mut SystemClipboard,
) -> Result<()> {
    loop {
        let signals = session.sink().signals().clone();
        let changes = session.editor().changes().clone();
        let tick = session.editor().deadline().map_or_else(never, at);

        select! {
            recv(signals) -> signal => {
                let Ok(signal) = signal else {
                    tracing::debug!("window thread ended");
                    return Ok(());
                };
                match signal {
                    WindowSignal::Navigate(key) => session.navigate(key),
                    WindowSignal::Installed { origin } => session.on_installed(&origin),
                    WindowSignal::Rejected { origin, error } => session.on_rejected(&origin, &error),
                    WindowSignal::KeymapChanged(keymap) => {
                        tracing::debug!(keymap = keymap.label(), "key bindings changed");
                    }
                    WindowSignal::CopySource => {
                        if let Some(text) = session.copy_text() {
                            match clipboard.copy(&text) {
                                Ok(()) => tracing::info!(bytes = text.len(), "copied shader source"),
                                Err(err) => tracing::warn!("{err:#}"),
                            }
                        }
                    }
                    WindowSignal::Closed => {
                        tracing::info!("window closed");
                        return Ok(());
                    }
                }
            }
            recv(changes) -> change => {
                if change.is_ok() {
                    session.editor_mut().note_change(Instant::now());
                }
            }
            recv(tick) -> _ => {}
        }

        session.poll_editor(Instant::now());
    }
}

/// `list [SOURCE]`: prints the sorted listing, one identifier per line.
pub fn list(args: ListArgs) -> Result<()> {
    let paths = AppPaths::discover()?;
    let config = load_config(args.config.as_deref(), &paths)?;
    let input = args
        .source
        .clone()
        .or_else(|| config.source.clone())
        .ok_or_else(|| anyhow!("no gallery source given"))?;
    let source = GallerySource::from_input(&input)?;
    let sources = SourceCache::new(source.clone().into_provider(layout_for(&config, args.listing))?);
    let listing = sources
        .list()
        .with_context(|| format!("failed to list shaders at {source}"))?;
    for id in listing {
        println!("{id}");
    }
    Ok(())
}

/// `check FILE`: runs the CPU compile stage and prints the uniform handles.
pub fn check(args: CheckArgs) -> Result<()> {
    let fragment = read_source(&args.fragment)?;
    let vertex = match &args.vertex {
        Some(path) => read_source(path)?,
        None => DEFAULT_VERTEX_SHADER.to_string(),
    };

    let stages = compile_stages(&vertex, &fragment)
        .map_err(|err| anyhow!("{}: {err}", args.fragment.display()))?;
    println!("{}: ok", args.fragment.display());
    println!("  {}", stages.handles);
    println!("  a_position at location {}", stages.position_location);
    Ok(())
}

fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

/// Base the current shader name is reflected into. Local galleries get a
/// `file://localhost` location so both route styles read back the same way.
fn location_base(source: &GallerySource) -> String {
    match source {
        GallerySource::Remote(url) => url.to_string(),
        GallerySource::Local(dir) => {
            let absolute = fs::canonicalize(dir).unwrap_or_else(|_| dir.clone());
            format!("file://localhost{}/", absolute.display())
        }
    }
}
