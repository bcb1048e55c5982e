//! GPU side of the gallery renderer.
//!
//! - `context` owns the wgpu instance, device and surface plus the resources
//!   every program shares (uniform bind group layout, full-screen quad).
//! - `program` links validated stages into a render pipeline inside a
//!   validation error scope.
//! - `uniforms` writes resolution, time and mouse through reflected offsets.
//! - `frame` clears to the indicator colour and draws the active program.

mod context;
mod frame;
mod program;
mod uniforms;

pub(crate) use context::GpuContext;
pub(crate) use frame::render_frame;
pub(crate) use program::Program;
