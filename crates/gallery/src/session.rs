use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use catalog::{ShaderId, ShaderProvider, SourceCache};
use navigator::{Direction, Location, Navigator};
use renderer::{CompileError, NavigationKey, ProgramRequest, SwapOrigin, WindowRuntime};
use tracing::{debug, info, warn};

use crate::editor::LiveEditor;

/// Receiver of compile-and-install requests.
pub trait ProgramSink {
    fn submit(&self, request: ProgramRequest) -> Result<()>;
}

impl ProgramSink for WindowRuntime {
    fn submit(&self, request: ProgramRequest) -> Result<()> {
        self.install(request)
    }
}

/// Viewer controller state: which shader is selected, where sources come
/// from, and the editor buffer mirroring the displayed source.
pub struct Session<P, S> {
    sources: SourceCache<P>,
    navigator: Navigator,
    location: Location,
    location_file: Option<PathBuf>,
    editor: LiveEditor,
    /// Navigation requests awaiting their outcome, oldest first. The window
    /// answers every request in submission order.
    pending: VecDeque<PendingShader>,
    sink: S,
}

struct PendingShader {
    shader: String,
    fragment: String,
}

impl<P: ShaderProvider, S: ProgramSink> Session<P, S> {
    pub fn new(
        sources: SourceCache<P>,
        navigator: Navigator,
        location: Location,
        editor: LiveEditor,
        sink: S,
    ) -> Self {
        Self {
            sources,
            navigator,
            location,
            location_file: None,
            editor,
            pending: VecDeque::new(),
            sink,
        }
    }

    /// Writes every reflected location to `path`.
    pub fn remember_location_in(mut self, path: PathBuf) -> Self {
        self.location_file = Some(path);
        self
    }

    pub fn navigator(&self) -> &Navigator {
        &self.navigator
    }

    pub fn editor(&self) -> &LiveEditor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut LiveEditor {
        &mut self.editor
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Fetches the shared vertex shader and loads the selected shader.
    pub fn start(&mut self) -> Result<()> {
        let vertex = self
            .sources
            .vertex()
            .context("failed to fetch the vertex shader")?;
        debug!(bytes = vertex.len(), "vertex shader ready");
        self.load_current();
        Ok(())
    }

    /// Moves the selection and loads the new shader. The index advances even
    /// if the fetch or the compile fails.
    pub fn navigate(&mut self, key: NavigationKey) {
        let direction = match key {
            NavigationKey::Prev => Direction::Prev,
            NavigationKey::Next => Direction::Next,
        };
        let id = self.navigator.step(direction).clone();
        debug!(shader = %id, index = self.navigator.index(), "navigating");
        self.load_current();
    }

    /// Fetches the current shader and requests an install. The editor buffer
    /// is only overwritten once the shader is on screen. A fetch failure
    /// aborts without touching the active program.
    pub fn load_current(&mut self) {
        let id = self.navigator.current().clone();
        let fragment = match self.sources.fragment(&id) {
            Ok(source) => source,
            Err(err) => {
                warn!(shader = %id, "failed to fetch shader: {err}");
                return;
            }
        };
        let shader = id.file_name().to_string();
        let submitted = self.request(
            SwapOrigin::Navigation {
                shader: shader.clone(),
            },
            fragment.clone(),
        );
        if submitted {
            self.pending.push_back(PendingShader { shader, fragment });
        }
    }

    /// Submits the editor buffer once its debounce window has passed.
    pub fn poll_editor(&mut self, now: Instant) {
        match self.editor.take_submission(now) {
            Ok(Some(fragment)) => {
                debug!(bytes = fragment.len(), "editor buffer changed; recompiling");
                self.request(SwapOrigin::Editor, fragment);
            }
            Ok(None) => {}
            Err(err) => warn!("{err:#}"),
        }
    }

    pub fn on_installed(&mut self, origin: &SwapOrigin) {
        match origin {
            SwapOrigin::Navigation { shader } => {
                if let Some(fragment) = self.settle(shader) {
                    if let Err(err) = self.editor.mirror(&fragment) {
                        warn!(shader = %shader, "{err:#}");
                    }
                }
                let location = self.location.reflect(&ShaderId::new(shader.as_str()));
                info!(shader = %shader, location = %location, "now showing");
                if let Some(path) = &self.location_file {
                    if let Err(err) = write_location(path, &location) {
                        warn!("{err:#}");
                    }
                }
            }
            SwapOrigin::Editor => info!("applied editor changes"),
        }
    }

    pub fn on_rejected(&mut self, origin: &SwapOrigin, error: &CompileError) {
        match origin {
            SwapOrigin::Navigation { shader } => {
                self.settle(shader);
                warn!(shader = %shader, "shader failed to compile; keeping the previous program\n{error}");
            }
            SwapOrigin::Editor => {
                warn!("editor buffer failed to compile; keeping the previous program\n{error}");
            }
        }
    }

    /// Text copied by the copy shortcut: the buffer as it is on disk, or the
    /// last known text if it cannot be read.
    pub fn copy_text(&self) -> Option<String> {
        match self.editor.contents() {
            Ok(text) => Some(text),
            Err(err) => {
                warn!("{err:#}");
                self.editor.last_text().map(str::to_string)
            }
        }
    }

    /// Source of the oldest outstanding navigation request, which the window
    /// has just answered.
    fn settle(&mut self, shader: &str) -> Option<String> {
        let pending = self.pending.pop_front()?;
        if pending.shader != shader {
            warn!(
                expected = %pending.shader,
                answered = %shader,
                "navigation outcome out of order"
            );
            return None;
        }
        Some(pending.fragment)
    }

    /// True when the request reached the window.
    fn request(&mut self, origin: SwapOrigin, fragment: String) -> bool {
        let vertex = match self.sources.vertex() {
            Ok(vertex) => vertex,
            Err(err) => {
                warn!("failed to fetch the vertex shader: {err}");
                return false;
            }
        };
        match self.sink.submit(ProgramRequest {
            origin,
            vertex,
            fragment,
        }) {
            Ok(()) => true,
            Err(err) => {
                warn!("{err:#}");
                false
            }
        }
    }
}

fn write_location(path: &Path, location: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, format!("{location}\n"))
        .with_context(|| format!("failed to remember location in {}", path.display()))
}
