//! Renderer crate for the shader gallery.
//!
//! One window, one active program. Sources arrive as GLSL ES style text, are
//! wrapped and validated on the CPU, linked on the GPU, and swapped in only
//! when every step succeeded:
//!
//! ```text
//!   gallery main loop
//!          │ ProgramRequest
//!          ▼
//!   WindowRuntime ──▶ compile_stages() ──▶ Program::link() ──▶ ProgramSlot::apply()
//!          │                                                          │
//!          └──◀ WindowSignal (keys, installed, rejected, closed)      └─▶ render_frame()
//! ```
//!
//! The window thread owns every GPU resource. The owner only sends install
//! requests and reacts to the signals coming back.

pub mod compile;
mod gpu;
pub mod runtime;
pub mod slot;
pub mod window;

pub use compile::{
    compile_stages, CompileError, CompiledStages, UniformHandles, DEFAULT_VERTEX_SHADER,
    POSITION_ATTRIBUTE,
};
pub use runtime::{FrameClock, TimeSample};
pub use slot::{ErrorIndicator, ProgramSlot, SwapOrigin};
pub use window::{
    key_action, KeyAction, Keymap, NavigationKey, ProgramRequest, WindowConfig, WindowRuntime,
    WindowSignal,
};
