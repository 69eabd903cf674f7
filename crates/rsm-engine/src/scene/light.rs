use glam::{Mat4, Vec3};

use crate::error::{EngineError, Result};
use crate::render::GpuLight;

/// Spot or point light.
///
/// Point lights are spot lights whose cone covers every direction. The RSM of
/// any light is rendered with a single perspective frustum along `direction`.
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub position: Vec3,
    pub direction: Vec3,
    pub color: Vec3,
    pub intensity: f32,
    /// Cosine of the cone half-angle. Below -1 for point lights.
    pub cutoff_cos: f32,
    /// Vertical field of view of the RSM projection, radians.
    pub fov_y: f32,
    pub near: f32,
    pub far: f32,
    /// Whether the light gets an RSM and contributes one-bounce light.
    pub indirect: bool,
}

impl Light {
    const POINT_CUTOFF: f32 = -2.0;

    pub fn point(position: Vec3, color: Vec3, intensity: f32) -> Self {
        Self {
            position,
            direction: Vec3::NEG_Y,
            color,
            intensity,
            cutoff_cos: Self::POINT_CUTOFF,
            fov_y: 120f32.to_radians(),
            near: 0.05,
            far: 50.0,
            indirect: false,
        }
    }

    /// `half_angle_deg` is the cone half-angle in degrees.
    pub fn spot(
        position: Vec3,
        direction: Vec3,
        half_angle_deg: f32,
        color: Vec3,
        intensity: f32,
    ) -> Self {
        let half = half_angle_deg.to_radians();
        Self {
            position,
            direction: direction.normalize_or(Vec3::NEG_Y),
            color,
            intensity,
            cutoff_cos: half.cos(),
            fov_y: (half * 2.2).min(170f32.to_radians()),
            near: 0.05,
            far: 50.0,
            indirect: true,
        }
    }

    pub fn with_indirect(mut self, indirect: bool) -> Self {
        self.indirect = indirect;
        self
    }

    pub fn is_point(&self) -> bool {
        self.cutoff_cos < -1.0
    }

    pub fn aim_at(&mut self, target: Vec3) {
        self.direction = (target - self.position).normalize_or(self.direction);
    }

    pub fn view(&self) -> Mat4 {
        let up = if self.direction.dot(Vec3::Y).abs() > 0.99 {
            Vec3::Z
        } else {
            Vec3::Y
        };
        Mat4::look_to_rh(self.position, self.direction, up)
    }

    /// Square projection used for the light's RSM.
    pub fn view_proj(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, 1.0, self.near, self.far) * self.view()
    }

    pub fn gpu(&self) -> GpuLight {
        GpuLight {
            position: self.position.extend(1.0).to_array(),
            direction: self.direction.extend(self.cutoff_cos).to_array(),
            color: self.color.extend(self.intensity).to_array(),
        }
    }
}

/// Ordered lights, bounded by the compiled `NUM_LIGHTS`.
#[derive(Debug, Clone)]
pub struct LightSet {
    capacity: usize,
    lights: Vec<Light>,
}

impl LightSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            lights: Vec::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Appends `light` and returns its slot.
    pub fn push(&mut self, light: Light) -> Result<usize> {
        if self.lights.len() >= self.capacity {
            return Err(EngineError::Budget {
                what: "light count",
                capacity: self.capacity,
            });
        }
        self.lights.push(light);
        Ok(self.lights.len() - 1)
    }

    pub fn remove(&mut self, slot: usize) -> Option<Light> {
        (slot < self.lights.len()).then(|| self.lights.remove(slot))
    }

    pub fn get(&self, slot: usize) -> Option<&Light> {
        self.lights.get(slot)
    }

    pub fn get_mut(&mut self, slot: usize) -> Option<&mut Light> {
        self.lights.get_mut(slot)
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Light> {
        self.lights.iter()
    }

    pub fn clear(&mut self) {
        self.lights.clear();
    }
}

/// Moves a light on a horizontal circle, keeping it aimed at the center.
#[derive(Debug, Clone, PartialEq)]
pub struct LightOrbit {
    pub slot: usize,
    pub center: Vec3,
    pub radius: f32,
    pub height: f32,
    /// Radians per second.
    pub speed: f32,
    pub angle: f32,
}

impl LightOrbit {
    pub fn advance(&mut self, dt: f32, lights: &mut LightSet) {
        self.angle = (self.angle + self.speed * dt) % std::f32::consts::TAU;
        if let Some(light) = lights.get_mut(self.slot) {
            light.position = self.center
                + Vec3::new(
                    self.radius * self.angle.cos(),
                    self.height,
                    self.radius * self.angle.sin(),
                );
            light.aim_at(self.center);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;

    #[test]
    fn set_rejects_lights_beyond_budget() {
        let mut set = LightSet::new(1);
        assert_eq!(set.push(Light::point(Vec3::ZERO, Vec3::ONE, 1.0)).unwrap(), 0);
        let err = set
            .push(Light::point(Vec3::ONE, Vec3::ONE, 1.0))
            .unwrap_err();
        assert!(matches!(err, EngineError::Budget { capacity: 1, .. }));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn spot_looks_along_its_direction() {
        let light = Light::spot(Vec3::new(0.0, 2.0, 0.0), Vec3::NEG_Y, 30.0, Vec3::ONE, 1.0);
        let clip = light.view_proj() * Vec4::new(0.0, 0.0, 0.0, 1.0);
        let ndc = clip / clip.w;
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn point_light_packs_open_cone() {
        let gpu = Light::point(Vec3::ONE, Vec3::X, 2.0).gpu();
        assert_eq!(gpu.direction[3], -2.0);
        assert_eq!(gpu.color, [1.0, 0.0, 0.0, 2.0]);
    }

    #[test]
    fn orbit_keeps_radius_and_aim() {
        let mut set = LightSet::new(2);
        set.push(Light::spot(Vec3::ZERO, Vec3::NEG_Y, 40.0, Vec3::ONE, 1.0))
            .unwrap();
        let mut orbit = LightOrbit {
            slot: 0,
            center: Vec3::ZERO,
            radius: 2.0,
            height: 1.0,
            speed: 1.0,
            angle: 0.0,
        };
        orbit.advance(0.5, &mut set);

        let light = set.get(0).unwrap();
        let flat = Vec3::new(light.position.x, 0.0, light.position.z);
        assert!((flat.length() - 2.0).abs() < 1e-5);
        assert!((light.position.y - 1.0).abs() < 1e-6);
        let to_center = (Vec3::ZERO - light.position).normalize();
        assert!(light.direction.dot(to_center) > 0.9999);
    }
}
