use crate::device::{GeometryDraw, GeometryPass, RenderDevice};
use crate::error::Result;
use crate::resources::Resources;
use crate::scene::{Light, Scene};
use crate::shader::{ProgramInterface, StandardProgram};

use super::gbuffer::resolve_instances;
use super::{linked, resolve_program, RenderTarget, ViewUniform};

const PASS: &str = "RSM pass";

/// Renders the scene from `light` into its reflective shadow map.
///
/// The target is cleared first, so a light that sees no geometry leaves an
/// all-zero map.
pub(crate) fn run<D: RenderDevice>(
    device: &mut D,
    resources: &Resources<D>,
    scene: &Scene,
    light: &Light,
    target: &RenderTarget<D::Target>,
) -> Result<()> {
    let program = resolve_program(
        resources,
        StandardProgram::RSM,
        ProgramInterface::ShadowMap,
        target.layout(),
        PASS,
    )?;

    let parts = resolve_instances(resources, &scene.instances)?;
    let draws: Vec<GeometryDraw<'_, D>> = parts.iter().map(|p| p.draw()).collect();

    device.geometry_pass(GeometryPass {
        label: target.label(),
        program: linked(program)?,
        target: target.raw(),
        clear: true,
        view: ViewUniform::light(light),
        draws: &draws,
    })
}
