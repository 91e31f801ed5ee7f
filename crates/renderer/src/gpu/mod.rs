//! GPU delegation for the plane scene.
//!
//! - `context` owns wgpu instance/device/surface wiring and reconfigures the
//!   swapchain on resize or loss.
//! - `texture` uploads the decoded image the material samples.
//! - `pipeline` compiles the wrapped GLSL pair into one render pipeline.
//! - `uniforms` mirrors the shader prelude's std140 block.
//! - `state` implements [`crate::app::DrawTarget`] on top of the above.

mod context;
mod pipeline;
mod state;
mod texture;
mod uniforms;

pub(crate) use state::GpuState;
