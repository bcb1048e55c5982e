use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Instant;

use anyhow::{anyhow, Result};
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{ElementState, Event, MouseButton, WindowEvent};
use winit::event_loop::{ControlFlow, EventLoopBuilder, EventLoopProxy};
use winit::keyboard::{Key, ModifiersState, NamedKey};
use winit::window::{Window, WindowBuilder};

use tracing::{debug, error, info, warn};

use crate::compile::{compile_stages, CompileError};
use crate::gpu::{render_frame, GpuContext, Program};
use crate::slot::{ProgramSlot, SwapOrigin};

/// Key bindings for navigation. `F2` flips between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Keymap {
    /// Arrow keys and Space.
    #[default]
    Default,
    /// Arrow keys and Space plus `h`/`l`.
    Vim,
}

impl Keymap {
    pub fn toggled(self) -> Self {
        match self {
            Self::Default => Self::Vim,
            Self::Vim => Self::Default,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Vim => "vim",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavigationKey {
    Prev,
    Next,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAction {
    Navigate(NavigationKey),
    ToggleKeymap,
    CopySource,
}

/// Maps a pressed key to a gallery action. `copy_modifier` is Ctrl (or the
/// platform command key) being held.
pub fn key_action(keymap: Keymap, key: &Key, copy_modifier: bool) -> Option<KeyAction> {
    match key {
        Key::Named(NamedKey::F2) => Some(KeyAction::ToggleKeymap),
        Key::Named(NamedKey::ArrowLeft) => Some(KeyAction::Navigate(NavigationKey::Prev)),
        Key::Named(NamedKey::ArrowRight) | Key::Named(NamedKey::Space) => {
            Some(KeyAction::Navigate(NavigationKey::Next))
        }
        Key::Character(value) => {
            let value = value.as_str();
            if copy_modifier {
                return value
                    .eq_ignore_ascii_case("c")
                    .then_some(KeyAction::CopySource);
            }
            match (keymap, value) {
                (_, " ") => Some(KeyAction::Navigate(NavigationKey::Next)),
                (Keymap::Vim, "h") => Some(KeyAction::Navigate(NavigationKey::Prev)),
                (Keymap::Vim, "l") => Some(KeyAction::Navigate(NavigationKey::Next)),
                _ => None,
            }
        }
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct WindowConfig {
    pub title: String,
    pub size: (u32, u32),
    pub keymap: Keymap,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            title: "Shader Gallery".to_string(),
            size: (1280, 720),
            keymap: Keymap::Default,
        }
    }
}

/// Sources to compile and, on success, install as the active program.
#[derive(Debug, Clone)]
pub struct ProgramRequest {
    pub origin: SwapOrigin,
    pub vertex: Arc<str>,
    pub fragment: String,
}

/// Events the window thread reports back to its owner.
#[derive(Debug, Clone)]
pub enum WindowSignal {
    Navigate(NavigationKey),
    CopySource,
    KeymapChanged(Keymap),
    Installed { origin: SwapOrigin },
    Rejected { origin: SwapOrigin, error: CompileError },
    Closed,
}

#[derive(Debug)]
enum WindowCommand {
    Install(ProgramRequest),
    Shutdown,
}

/// Owns the window, the GPU and the active program on a dedicated thread.
/// Fields drop in order: the program and surface go before the window.
struct WindowState {
    slot: ProgramSlot<Program>,
    gpu: GpuContext,
    window: Arc<Window>,
    mouse: MouseState,
    modifiers: ModifiersState,
    keymap: Keymap,
    title: String,
}

impl WindowState {
    fn new(window: Arc<Window>, config: &WindowConfig) -> Result<Self> {
        let gpu = GpuContext::new(window.as_ref(), window.inner_size())?;
        Ok(Self {
            slot: ProgramSlot::new(Instant::now()),
            gpu,
            window,
            mouse: MouseState::default(),
            modifiers: ModifiersState::empty(),
            keymap: config.keymap,
            title: config.title.clone(),
        })
    }

    /// Compiles, links and swaps in a program. The last request processed
    /// wins; a failure leaves the active program untouched.
    fn install(&mut self, request: ProgramRequest) -> Result<(), CompileError> {
        let ProgramRequest {
            origin,
            vertex,
            fragment,
        } = request;
        let outcome = compile_stages(&vertex, &fragment)
            .and_then(|stages| Program::link(&self.gpu, &stages));
        self.slot.apply(&origin, outcome, Instant::now())?;
        if let SwapOrigin::Navigation { shader } = &origin {
            self.window.set_title(&format!("{shader} | {}", self.title));
        }
        Ok(())
    }

    fn resize(&mut self, new_size: PhysicalSize<u32>) {
        self.gpu.resize(new_size);
    }

    fn render(&mut self) -> Result<(), wgpu::SurfaceError> {
        let mouse = self.mouse.as_uniform(self.gpu.size.height.max(1) as f32);
        render_frame(&self.gpu, &mut self.slot, mouse, Instant::now())
    }
}

pub struct WindowRuntime {
    proxy: EventLoopProxy<WindowCommand>,
    events: Receiver<WindowSignal>,
    join_handle: Option<JoinHandle<Result<()>>>,
}

impl WindowRuntime {
    pub fn spawn(config: WindowConfig) -> Result<Self> {
        let (ready_tx, ready_rx) = bounded(1);
        let (signal_tx, signal_rx) = unbounded();
        let handle = thread::Builder::new()
            .name("gallery-window".into())
            .spawn(move || run_window_thread(config, ready_tx, signal_tx))
            .map_err(|err| anyhow!("failed to spawn window thread: {err}"))?;

        let proxy = ready_rx
            .recv()
            .map_err(|err| anyhow!("window thread failed to initialise: {err}"))??;

        Ok(Self {
            proxy,
            events: signal_rx,
            join_handle: Some(handle),
        })
    }

    pub fn install(&self, request: ProgramRequest) -> Result<()> {
        self.proxy
            .send_event(WindowCommand::Install(request))
            .map_err(|_| anyhow!("window event loop has already exited"))
    }

    pub fn signals(&self) -> &Receiver<WindowSignal> {
        &self.events
    }

    pub fn shutdown(mut self) -> Result<()> {
        if let Some(handle) = self.join_handle.take() {
            let _ = self.proxy.send_event(WindowCommand::Shutdown);
            handle
                .join()
                .map_err(|err| anyhow!("window thread panicked: {err:?}"))??;
        }
        Ok(())
    }
}

impl Drop for WindowRuntime {
    fn drop(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            let _ = self.proxy.send_event(WindowCommand::Shutdown);
            let _ = handle.join();
        }
    }
}

fn run_window_thread(
    config: WindowConfig,
    ready_tx: Sender<Result<EventLoopProxy<WindowCommand>, anyhow::Error>>,
    signal_tx: Sender<WindowSignal>,
) -> Result<()> {
    let mut builder = EventLoopBuilder::<WindowCommand>::with_user_event();
    #[cfg(any(target_os = "linux", target_os = "android"))]
    {
        use winit::platform::wayland::EventLoopBuilderExtWayland;
        EventLoopBuilderExtWayland::with_any_thread(&mut builder, true);
    }

    #[cfg(any(
        target_os = "freebsd",
        target_os = "openbsd",
        target_os = "netbsd",
        target_os = "dragonfly"
    ))]
    {
        use winit::platform::x11::EventLoopBuilderExtX11;
        EventLoopBuilderExtX11::with_any_thread(&mut builder, true);
    }

    #[cfg(target_os = "windows")]
    {
        use winit::platform::windows::EventLoopBuilderExtWindows;
        EventLoopBuilderExtWindows::with_any_thread(&mut builder, true);
    }
    let event_loop = match builder.build() {
        Ok(event_loop) => event_loop,
        Err(err) => {
            let message = format!("failed to create event loop: {err}");
            let _ = ready_tx.send(Err(anyhow!(message.clone())));
            return Err(anyhow!(message));
        }
    };
    let proxy = event_loop.create_proxy();

    let window = WindowBuilder::new()
        .with_title(config.title.as_str())
        .with_inner_size(PhysicalSize::new(config.size.0, config.size.1))
        .build(&event_loop);
    let window = match window {
        Ok(window) => Arc::new(window),
        Err(err) => {
            let message = format!("failed to create gallery window: {err}");
            let _ = ready_tx.send(Err(anyhow!(message.clone())));
            return Err(anyhow!(message));
        }
    };

    let mut state = match WindowState::new(window, &config) {
        Ok(state) => state,
        Err(err) => {
            let wrapped = anyhow!("failed to initialise window renderer: {err}");
            let message = wrapped.to_string();
            let _ = ready_tx.send(Err(anyhow!(message)));
            return Err(wrapped);
        }
    };

    let _ = ready_tx.send(Ok(proxy));
    state.window.request_redraw();

    let run_result = event_loop.run(move |event, elwt| match event {
        Event::UserEvent(command) => match command {
            WindowCommand::Install(request) => {
                let origin = request.origin.clone();
                let signal = match state.install(request) {
                    Ok(()) => WindowSignal::Installed { origin },
                    Err(error) => WindowSignal::Rejected { origin, error },
                };
                let _ = signal_tx.send(signal);
            }
            WindowCommand::Shutdown => elwt.exit(),
        },
        Event::WindowEvent { window_id, event } if window_id == state.window.id() => match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                let _ = signal_tx.send(WindowSignal::Closed);
                elwt.exit();
            }
            WindowEvent::ModifiersChanged(modifiers) => {
                state.modifiers = modifiers.state();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                if event.state != ElementState::Pressed || event.repeat {
                    return;
                }
                let copy_modifier = state.modifiers.control_key() || state.modifiers.super_key();
                match key_action(state.keymap, &event.logical_key, copy_modifier) {
                    Some(KeyAction::Navigate(direction)) => {
                        let _ = signal_tx.send(WindowSignal::Navigate(direction));
                    }
                    Some(KeyAction::ToggleKeymap) => {
                        state.keymap = state.keymap.toggled();
                        info!(keymap = state.keymap.label(), "switched key bindings");
                        let _ = signal_tx.send(WindowSignal::KeymapChanged(state.keymap));
                    }
                    Some(KeyAction::CopySource) => {
                        let _ = signal_tx.send(WindowSignal::CopySource);
                    }
                    None => {}
                }
            }
            WindowEvent::CursorMoved { position, .. } => {
                state.mouse.handle_cursor_moved(position);
            }
            WindowEvent::MouseInput {
                state: button_state,
                button: MouseButton::Left,
                ..
            } => {
                state.mouse.handle_button(button_state);
            }
            WindowEvent::Resized(new_size) => {
                state.resize(new_size);
            }
            WindowEvent::RedrawRequested => match state.render() {
                Ok(()) => {}
                Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                    state.gpu.reconfigure();
                }
                Err(wgpu::SurfaceError::OutOfMemory) => {
                    error!("surface out of memory; closing gallery window");
                    let _ = signal_tx.send(WindowSignal::Closed);
                    elwt.exit();
                }
                Err(wgpu::SurfaceError::Timeout) => {
                    debug!("surface timeout; retrying next frame");
                }
                Err(other) => {
                    warn!("surface error: {other:?}; retrying next frame");
                }
            },
            _ => {}
        },
        Event::AboutToWait => {
            state.window.request_redraw();
            elwt.set_control_flow(ControlFlow::Wait);
        }
        _ => {}
    });

    run_result.map_err(|err| anyhow!("window event loop error: {err}"))
}

/// ShaderToy-style `iMouse`: xy follows the cursor, zw holds the position
/// where the left button went down. Both use a bottom-left origin.
#[derive(Default)]
struct MouseState {
    position: Option<PhysicalPosition<f64>>,
    pressed_anchor: Option<PhysicalPosition<f64>>,
    is_pressed: bool,
}

impl MouseState {
    fn handle_cursor_moved(&mut self, position: PhysicalPosition<f64>) {
        self.position = Some(position);
        if self.is_pressed {
            self.pressed_anchor.get_or_insert(position);
        }
    }

    fn handle_button(&mut self, state: ElementState) {
        match state {
            ElementState::Pressed => {
                self.is_pressed = true;
                if let Some(pos) = self.position {
                    self.pressed_anchor = Some(pos);
                }
            }
            ElementState::Released => {
                self.is_pressed = false;
                self.pressed_anchor = None;
            }
        }
    }

    fn as_uniform(&self, height: f32) -> [f32; 4] {
        let mut data = [0.0; 4];

        if let Some(pos) = self.position {
            data[0] = pos.x as f32;
            data[1] = height - pos.y as f32;
        }

        if let Some(anchor) = self.pressed_anchor {
            data[2] = anchor.x as f32;
            data[3] = height - anchor.y as f32;
        }

        data
    }
}
