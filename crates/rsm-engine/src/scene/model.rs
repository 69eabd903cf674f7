use std::fmt;
use std::sync::Arc;

use glam::Vec3;

use crate::device::RenderDevice;
use crate::shader::StandardProgram;

use super::Mesh;

/// Blinn-Phong surface parameters.
///
/// The geometry program and the diffuse texture are referenced by registry
/// name and resolved every frame; a material never owns them.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub program: String,
    pub diffuse: Vec3,
    /// Scalar specular strength.
    pub specular: f32,
    pub shininess: f32,
    pub diffuse_texture: Option<String>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            program: StandardProgram::GBUFFER.to_owned(),
            diffuse: Vec3::splat(0.8),
            specular: 0.0,
            shininess: 16.0,
            diffuse_texture: None,
        }
    }
}

impl Material {
    pub fn diffuse(color: Vec3) -> Self {
        Self {
            diffuse: color,
            ..Default::default()
        }
    }

    pub fn with_specular(mut self, strength: f32, shininess: f32) -> Self {
        self.specular = strength;
        self.shininess = shininess;
        self
    }

    pub fn with_texture(mut self, name: impl Into<String>) -> Self {
        self.diffuse_texture = Some(name.into());
        self
    }
}

pub struct ModelPart<D: RenderDevice> {
    pub mesh: Arc<Mesh<D>>,
    pub material: Material,
}

/// A list of mesh + material parts drawn together.
pub struct Model<D: RenderDevice> {
    parts: Vec<ModelPart<D>>,
}

impl<D: RenderDevice> Model<D> {
    pub fn new() -> Self {
        Self { parts: Vec::new() }
    }

    pub fn single(mesh: Arc<Mesh<D>>, material: Material) -> Self {
        let mut model = Self::new();
        model.push(mesh, material);
        model
    }

    pub fn push(&mut self, mesh: Arc<Mesh<D>>, material: Material) {
        self.parts.push(ModelPart { mesh, material });
    }

    pub fn parts(&self) -> &[ModelPart<D>] {
        &self.parts
    }

    pub fn triangle_count(&self) -> usize {
        self.parts.iter().map(|p| p.mesh.triangle_count()).sum()
    }
}

impl<D: RenderDevice> Default for Model<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D: RenderDevice> fmt::Debug for Model<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("parts", &self.parts.len())
            .field("triangles", &self.triangle_count())
            .finish()
    }
}
