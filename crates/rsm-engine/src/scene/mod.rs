//! Scene description consumed by the render passes.
//!
//! Instances reference models by registry name; the scene never owns GPU
//! resources.

mod camera;
pub mod demo;
mod light;
mod mesh;
mod model;
pub mod primitives;
mod texture;

use glam::Mat4;

pub use camera::Camera;
pub use light::{Light, LightOrbit, LightSet};
pub use mesh::{Mesh, MeshData, Vertex};
pub use model::{Material, Model, ModelPart};
pub use texture::{ImageData, Texture};

/// Placement of a registered model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelInstance {
    pub model: String,
    pub transform: Mat4,
}

impl ModelInstance {
    pub fn new(model: impl Into<String>, transform: Mat4) -> Self {
        Self {
            model: model.into(),
            transform,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Scene {
    pub camera: Camera,
    pub lights: LightSet,
    pub instances: Vec<ModelInstance>,
    pub orbits: Vec<LightOrbit>,
    elapsed: f32,
}

impl Scene {
    pub fn new(light_capacity: usize) -> Self {
        Self {
            camera: Camera::default(),
            lights: LightSet::new(light_capacity),
            instances: Vec::new(),
            orbits: Vec::new(),
            elapsed: 0.0,
        }
    }

    pub fn add_instance(&mut self, model: impl Into<String>, transform: Mat4) {
        self.instances.push(ModelInstance::new(model, transform));
    }

    /// Advances animated state by `dt` seconds.
    pub fn update(&mut self, dt: f32) {
        self.elapsed += dt;
        for orbit in &mut self.orbits {
            orbit.advance(dt, &mut self.lights);
        }
    }

    /// Total simulated time.
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    #[test]
    fn update_accumulates_time_and_moves_orbits() {
        let mut scene = Scene::new(1);
        scene
            .lights
            .push(Light::spot(Vec3::Y, Vec3::NEG_Y, 30.0, Vec3::ONE, 1.0))
            .unwrap();
        scene.orbits.push(LightOrbit {
            slot: 0,
            center: Vec3::ZERO,
            radius: 1.0,
            height: 2.0,
            speed: 1.0,
            angle: 0.0,
        });

        scene.update(0.25);
        scene.update(0.25);
        assert!((scene.elapsed() - 0.5).abs() < 1e-6);
        let light = scene.lights.get(0).unwrap();
        assert!((light.position.x - 0.5f32.cos()).abs() < 1e-5);
    }
}
