use crate::device::{LightingPass, RenderDevice};
use crate::error::{EngineError, Result};
use crate::resources::Resources;
use crate::scene::Scene;
use crate::shader::{ProgramInterface, ShaderBudget, StandardProgram};

use super::direct::check_gbuffer;
use super::{
    linked, resolve_program, LightingParams, LightingUniforms, RenderTarget, TargetLayout,
};

const PASS: &str = "indirect illumination pass";

/// Gathers one bounce from `rsm` at every G-buffer texel and adds it to `output`.
#[allow(clippy::too_many_arguments)]
pub(crate) fn run<D: RenderDevice>(
    device: &mut D,
    resources: &Resources<D>,
    scene: &Scene,
    params: &LightingParams,
    budget: ShaderBudget,
    samples: &[[f32; 4]],
    gbuffer: &RenderTarget<D::Target>,
    rsm: &RenderTarget<D::Target>,
    output: &RenderTarget<D::Target>,
) -> Result<()> {
    let program = resolve_program(
        resources,
        StandardProgram::INDIRECT_ILLUMINATION,
        ProgramInterface::IndirectIllumination,
        output.layout(),
        PASS,
    )?;
    check_gbuffer(PASS, gbuffer, output)?;
    if rsm.layout() != TargetLayout::RSM {
        return Err(EngineError::mismatch(
            PASS,
            TargetLayout::RSM.to_string(),
            rsm.layout().to_string(),
        ));
    }

    let uniforms =
        LightingUniforms::indirect(params.header(scene.camera.position), samples, budget)?;

    device.lighting_pass(LightingPass {
        label: rsm.label(),
        program: linked(program)?,
        target: output.raw(),
        gbuffer: gbuffer.raw(),
        rsm: Some(rsm.raw()),
        uniforms: &uniforms,
    })
}
