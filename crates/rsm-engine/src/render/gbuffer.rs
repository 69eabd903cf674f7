use std::collections::BTreeMap;

use crate::device::{GeometryDraw, GeometryPass, RenderDevice};
use crate::error::Result;
use crate::resources::Resources;
use crate::scene::{Mesh, ModelInstance, Scene, Texture};
use crate::shader::{ProgramInterface, StandardProgram};

use super::{linked, resolve_program, DrawUniform, RenderTarget, ViewUniform};

const PASS: &str = "g-buffer pass";

/// One model part with every registry reference resolved.
pub(crate) struct ResolvedPart<'r, D: RenderDevice> {
    pub program: &'r str,
    pub mesh: &'r Mesh<D>,
    pub texture: Option<&'r Texture<D>>,
    pub uniform: DrawUniform,
}

impl<'r, D: RenderDevice> ResolvedPart<'r, D> {
    pub fn draw(&self) -> GeometryDraw<'r, D> {
        GeometryDraw {
            mesh: self.mesh.raw(),
            texture: self.texture.map(|t| t.raw()),
            uniform: self.uniform,
        }
    }
}

/// Resolves every instance's model, meshes and textures by name.
///
/// A missing name fails the whole frame.
pub(crate) fn resolve_instances<'r, D: RenderDevice>(
    resources: &'r Resources<D>,
    instances: &[ModelInstance],
) -> Result<Vec<ResolvedPart<'r, D>>> {
    let mut parts = Vec::new();
    for instance in instances {
        let model = resources.models.get(&instance.model)?;
        for part in model.parts() {
            let texture = match &part.material.diffuse_texture {
                Some(name) => Some(resources.textures.get(name)?.as_ref()),
                None => None,
            };
            parts.push(ResolvedPart {
                program: part.material.program.as_str(),
                mesh: part.mesh.as_ref(),
                texture,
                uniform: DrawUniform::new(instance.transform, &part.material, texture.is_some()),
            });
        }
    }
    Ok(parts)
}

/// Clears the G-buffer and rasterizes every instance into it.
///
/// Draws are grouped by geometry program; the first group clears. With no
/// instances the standard program still runs once so the buffer is cleared.
/// Returns the number of draws.
pub(crate) fn run<D: RenderDevice>(
    device: &mut D,
    resources: &Resources<D>,
    scene: &Scene,
    target: &RenderTarget<D::Target>,
) -> Result<usize> {
    let parts = resolve_instances(resources, &scene.instances)?;

    let mut groups: BTreeMap<&str, Vec<GeometryDraw<'_, D>>> = BTreeMap::new();
    for part in &parts {
        groups.entry(part.program).or_default().push(part.draw());
    }
    if groups.is_empty() {
        groups.insert(StandardProgram::GBUFFER, Vec::new());
    }

    let view = ViewUniform::camera(scene.camera.view_proj(), scene.camera.position);

    for (i, (name, draws)) in groups.iter().enumerate() {
        let program =
            resolve_program(resources, name, ProgramInterface::Geometry, target.layout(), PASS)?;
        device.geometry_pass(GeometryPass {
            label: name,
            program: linked(program)?,
            target: target.raw(),
            clear: i == 0,
            view,
            draws,
        })?;
    }

    Ok(parts.len())
}
