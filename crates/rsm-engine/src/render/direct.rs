use crate::device::{LightingPass, RenderDevice};
use crate::error::{EngineError, Result};
use crate::resources::Resources;
use crate::scene::Scene;
use crate::shader::{ProgramInterface, ShaderBudget, StandardProgram};

use super::{
    linked, resolve_program, GpuLight, LightingParams, LightingUniforms, RenderTarget,
    TargetLayout,
};

const PASS: &str = "direct lighting pass";

/// Checks that a lighting pass reads a G-buffer of the output's size.
pub(crate) fn check_gbuffer<T>(
    pass: &'static str,
    gbuffer: &RenderTarget<T>,
    output: &RenderTarget<T>,
) -> Result<()> {
    if gbuffer.layout() != TargetLayout::GBUFFER {
        return Err(EngineError::mismatch(
            pass,
            TargetLayout::GBUFFER.to_string(),
            gbuffer.layout().to_string(),
        ));
    }
    if gbuffer.extent() != output.extent() {
        return Err(EngineError::mismatch(
            pass,
            format!("g-buffer of {}", output.extent()),
            gbuffer.extent().to_string(),
        ));
    }
    Ok(())
}

/// Shades every G-buffer texel with all scene lights, replacing `output`.
pub(crate) fn run<D: RenderDevice>(
    device: &mut D,
    resources: &Resources<D>,
    scene: &Scene,
    params: &LightingParams,
    budget: ShaderBudget,
    gbuffer: &RenderTarget<D::Target>,
    output: &RenderTarget<D::Target>,
) -> Result<()> {
    let program = resolve_program(
        resources,
        StandardProgram::DEFERRED_SHADING,
        ProgramInterface::DirectLighting,
        output.layout(),
        PASS,
    )?;
    check_gbuffer(PASS, gbuffer, output)?;

    let lights: Vec<GpuLight> = scene.lights.iter().map(|l| l.gpu()).collect();
    let uniforms = LightingUniforms::direct(params.header(scene.camera.position), &lights, budget)?;

    device.lighting_pass(LightingPass {
        label: PASS,
        program: linked(program)?,
        target: output.raw(),
        gbuffer: gbuffer.raw(),
        rsm: None,
        uniforms: &uniforms,
    })
}
