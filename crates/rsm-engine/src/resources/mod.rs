//! Named GPU resources shared by the render passes.
//!
//! `Resources` is an explicit value owned by the engine. Frames borrow it
//! immutably; loading and replacing resources needs `&mut`, so the registry
//! cannot change while a frame is recording.

mod registry;

use crate::device::RenderDevice;
use crate::scene::{Mesh, Model, Texture};
use crate::shader::ShaderProgram;

pub use registry::{Category, Registry};

pub struct Resources<D: RenderDevice> {
    pub meshes: Registry<Mesh<D>>,
    pub models: Registry<Model<D>>,
    pub shaders: Registry<ShaderProgram<D>>,
    pub textures: Registry<Texture<D>>,
}

impl<D: RenderDevice> Resources<D> {
    pub fn new() -> Self {
        Self {
            meshes: Registry::new(Category::Mesh),
            models: Registry::new(Category::Model),
            shaders: Registry::new(Category::Shader),
            textures: Registry::new(Category::Texture),
        }
    }

    /// Drops the registry's reference to every object in every category.
    ///
    /// Safe to call more than once.
    pub fn cleanup(&mut self) {
        if self.is_empty() {
            return;
        }
        log::info!("releasing resources: {}", self.summary());
        self.meshes.clear();
        self.models.clear();
        self.shaders.clear();
        self.textures.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
            && self.models.is_empty()
            && self.shaders.is_empty()
            && self.textures.is_empty()
    }

    /// One-line count per category, for logs.
    pub fn summary(&self) -> String {
        format!(
            "{} meshes, {} models, {} shaders, {} textures",
            self.meshes.len(),
            self.models.len(),
            self.shaders.len(),
            self.textures.len()
        )
    }
}

impl<D: RenderDevice> Default for Resources<D> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::SoftwareDevice;
    use crate::scene::primitives;
    use crate::shader::ProgramInterface;

    #[test]
    fn categories_are_independent_namespaces() {
        let mut device = SoftwareDevice::new();
        let mut res: Resources<SoftwareDevice> = Resources::new();

        res.meshes
            .add("box", Mesh::upload(&mut device, "box", primitives::cube()).unwrap());
        res.shaders
            .add("box", ShaderProgram::new("box", ProgramInterface::Geometry));

        assert!(res.meshes.contains("box"));
        assert!(res.shaders.contains("box"));
        assert!(res.models.get("box").is_err());
        assert!(res.textures.get("box").is_err());
    }

    #[test]
    fn cleanup_is_idempotent() {
        let mut device = SoftwareDevice::new();
        let mut res: Resources<SoftwareDevice> = Resources::new();
        res.meshes
            .add("quad", Mesh::upload(&mut device, "quad", primitives::quad()).unwrap());
        assert_eq!(res.summary(), "1 meshes, 0 models, 0 shaders, 0 textures");

        res.cleanup();
        assert!(res.is_empty());
        res.cleanup();
        assert!(res.is_empty());
    }
}
