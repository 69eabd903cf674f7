//! Uniform blocks shared with the WGSL programs.
//!
//! Layouts mirror the structs declared in `shaders/*.wgsl`; every field is a
//! 16-byte column so std140-style uniform rules hold without padding fields.

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::error::{EngineError, Result};
use crate::shader::ShaderBudget;

/// `Frame` block of the geometry programs.
///
/// For the RSM program `view_proj` and `eye` come from the light.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct ViewUniform {
    pub view_proj: [[f32; 4]; 4],
    pub eye: [f32; 4],
    pub light_position: [f32; 4],
    /// xyz direction, w cosine of the cone cutoff.
    pub light_direction: [f32; 4],
    /// rgb color scaled by intensity.
    pub light_color: [f32; 4],
}

impl ViewUniform {
    pub fn camera(view_proj: Mat4, eye: Vec3) -> Self {
        Self {
            view_proj: view_proj.to_cols_array_2d(),
            eye: eye.extend(1.0).to_array(),
            ..Zeroable::zeroed()
        }
    }

    pub fn light(light: &crate::scene::Light) -> Self {
        Self {
            view_proj: light.view_proj().to_cols_array_2d(),
            eye: light.position.extend(1.0).to_array(),
            light_position: light.position.extend(1.0).to_array(),
            light_direction: light.direction.extend(light.cutoff_cos).to_array(),
            light_color: (light.color * light.intensity).extend(1.0).to_array(),
        }
    }

    pub fn view_proj(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.view_proj)
    }
}

/// `Item` block: per-draw transform and material.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct DrawUniform {
    pub model: [[f32; 4]; 4],
    pub normal_matrix: [[f32; 4]; 4],
    /// rgb diffuse, w unused.
    pub diffuse: [f32; 4],
    /// x specular strength, y shininess, z 1.0 when a diffuse texture is bound.
    pub material: [f32; 4],
}

impl DrawUniform {
    pub fn new(model: Mat4, material: &crate::scene::Material, textured: bool) -> Self {
        Self {
            model: model.to_cols_array_2d(),
            normal_matrix: model.inverse().transpose().to_cols_array_2d(),
            diffuse: material.diffuse.extend(1.0).to_array(),
            material: [
                material.specular,
                material.shininess,
                if textured { 1.0 } else { 0.0 },
                0.0,
            ],
        }
    }

    pub fn model(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.model)
    }

    pub fn normal_matrix(&self) -> Mat4 {
        Mat4::from_cols_array_2d(&self.normal_matrix)
    }

    pub fn textured(&self) -> bool {
        self.material[2] > 0.5
    }
}

/// One slot of the direct-lighting light array.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct GpuLight {
    pub position: [f32; 4],
    /// xyz direction, w cosine of the cone cutoff.
    pub direction: [f32; 4],
    /// rgb color, w intensity. Zero intensity marks an unused slot.
    pub color: [f32; 4],
}

/// Common head of both lighting blocks.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, PartialEq, Pod, Zeroable)]
pub struct LightingHeader {
    pub eye: [f32; 4],
    /// x attenuation k, y minimum VPL distance, z VPL intensity.
    pub params: [f32; 4],
    /// x light count, y VPL count.
    pub counts: [u32; 4],
}

/// Uniform payload of a fullscreen lighting pass.
#[derive(Debug, Clone, PartialEq)]
pub enum LightingUniforms {
    /// `lights` always has exactly `NUM_LIGHTS` slots.
    Direct {
        header: LightingHeader,
        lights: Vec<GpuLight>,
    },
    /// `samples` always has exactly `NUM_VPL` entries: (u, v, weight, 0).
    Indirect {
        header: LightingHeader,
        samples: Vec<[f32; 4]>,
    },
}

impl LightingUniforms {
    /// Packs `lights` into a block of `budget.num_lights` slots.
    pub fn direct(
        header: LightingHeader,
        lights: &[GpuLight],
        budget: ShaderBudget,
    ) -> Result<Self> {
        let capacity = budget.num_lights as usize;
        if lights.len() > capacity {
            return Err(EngineError::Budget {
                what: "light count",
                capacity,
            });
        }
        let mut slots = lights.to_vec();
        slots.resize(capacity, GpuLight::default());
        let header = LightingHeader {
            counts: [lights.len() as u32, header.counts[1], 0, 0],
            ..header
        };
        Ok(Self::Direct {
            header,
            lights: slots,
        })
    }

    pub fn indirect(
        header: LightingHeader,
        samples: &[[f32; 4]],
        budget: ShaderBudget,
    ) -> Result<Self> {
        let capacity = budget.num_vpl as usize;
        if samples.len() > capacity {
            return Err(EngineError::Budget {
                what: "VPL count",
                capacity,
            });
        }
        let mut padded = samples.to_vec();
        padded.resize(capacity, [0.0; 4]);
        let header = LightingHeader {
            counts: [header.counts[0], samples.len() as u32, 0, 0],
            ..header
        };
        Ok(Self::Indirect {
            header,
            samples: padded,
        })
    }

    pub fn header(&self) -> &LightingHeader {
        match self {
            LightingUniforms::Direct { header, .. } | LightingUniforms::Indirect { header, .. } => {
                header
            }
        }
    }

    /// Byte image of the WGSL block.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = bytemuck::bytes_of(self.header()).to_vec();
        match self {
            LightingUniforms::Direct { lights, .. } => {
                bytes.extend_from_slice(bytemuck::cast_slice(lights));
            }
            LightingUniforms::Indirect { samples, .. } => {
                bytes.extend_from_slice(bytemuck::cast_slice(samples));
            }
        }
        bytes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_sizes_match_wgsl() {
        assert_eq!(std::mem::size_of::<ViewUniform>(), 128);
        assert_eq!(std::mem::size_of::<DrawUniform>(), 160);
        assert_eq!(std::mem::size_of::<GpuLight>(), 48);
        assert_eq!(std::mem::size_of::<LightingHeader>(), 48);
    }

    #[test]
    fn direct_block_is_padded_to_budget() {
        let budget = ShaderBudget {
            num_lights: 4,
            num_vpl: 8,
        };
        let light = GpuLight {
            color: [1.0, 1.0, 1.0, 2.0],
            ..Default::default()
        };
        let block =
            LightingUniforms::direct(LightingHeader::default(), &[light], budget).unwrap();
        assert_eq!(block.header().counts[0], 1);
        assert_eq!(block.to_bytes().len(), 48 + 4 * 48);
        match block {
            LightingUniforms::Direct { lights, .. } => {
                assert_eq!(lights.len(), 4);
                assert_eq!(lights[3].color[3], 0.0);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn indirect_block_rejects_excess_samples() {
        let budget = ShaderBudget {
            num_lights: 1,
            num_vpl: 2,
        };
        let err =
            LightingUniforms::indirect(LightingHeader::default(), &[[0.0; 4]; 3], budget)
                .unwrap_err();
        assert!(matches!(err, EngineError::Budget { capacity: 2, .. }));
    }

    #[test]
    fn normal_matrix_undoes_non_uniform_scale() {
        let model = Mat4::from_scale(Vec3::new(2.0, 1.0, 1.0));
        let draw = DrawUniform::new(model, &crate::scene::Material::default(), false);
        let n = draw.normal_matrix().transform_vector3(Vec3::X);
        assert!((n.x - 0.5).abs() < 1e-6);
        assert!(!draw.textured());
    }
}
