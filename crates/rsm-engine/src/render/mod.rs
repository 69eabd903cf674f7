//! Deferred pipeline: targets, uniform blocks, the four passes and the
//! per-frame sequencing that ties them together.

mod direct;
mod frame;
mod gbuffer;
mod indirect;
mod renderer;
mod rsm;
pub mod shading;
mod targets;
mod uniforms;
pub mod vpl;

use std::sync::Arc;

use crate::device::RenderDevice;
use crate::error::{EngineError, Result};
use crate::resources::Resources;
use crate::shader::{ProgramInterface, ShaderProgram};

pub use frame::{FramePhase, FrameSequencer};
pub use renderer::{DeferredRenderer, FrameReport, LightingParams};
pub use shading::{SurfaceSample, VplSample};
pub use targets::{attachment, AttachmentFormat, Extent, RenderTarget, TargetKind, TargetLayout};
pub use uniforms::{DrawUniform, GpuLight, LightingHeader, LightingUniforms, ViewUniform};

/// Looks up a program and checks it can drive `interface` into `target`.
pub(crate) fn resolve_program<'r, D: RenderDevice>(
    resources: &'r Resources<D>,
    name: &str,
    interface: ProgramInterface,
    target: TargetLayout,
    pass: &'static str,
) -> Result<&'r Arc<ShaderProgram<D>>> {
    let program = resources.shaders.get(name)?;

    if program.interface() != interface {
        return Err(EngineError::mismatch(
            pass,
            format!("a {interface} program"),
            format!("'{name}' ({})", program.interface()),
        ));
    }
    if program.raw().is_none() {
        return Err(EngineError::mismatch(
            pass,
            "a linked program",
            format!("'{name}' (unlinked)"),
        ));
    }
    if interface.target() != target {
        return Err(EngineError::mismatch(
            pass,
            format!("a target of {}", interface.target()),
            target.to_string(),
        ));
    }
    Ok(program)
}

/// Linked device program of an already resolved `ShaderProgram`.
pub(crate) fn linked<D: RenderDevice>(program: &ShaderProgram<D>) -> Result<&D::Program> {
    program.raw().ok_or_else(|| {
        EngineError::mismatch("render", "a linked program", format!("'{}'", program.name()))
    })
}
