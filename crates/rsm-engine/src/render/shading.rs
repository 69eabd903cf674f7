//! CPU evaluation of the lighting programs.
//!
//! Mirrors `deferred_shading.fs.wgsl` and `indirect_illumination.fs.wgsl`
//! term for term. The software device shades with these; tests use them to
//! state expected values.

use glam::{Vec3, Vec4Swizzles};

use super::uniforms::{GpuLight, LightingHeader};

/// Width of the soft edge of a spot cone, in cosine units.
pub const SPOT_SOFTNESS: f32 = 0.05;

const EPSILON_SQ: f32 = 1e-8;

/// One decoded G-buffer texel.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SurfaceSample {
    pub position: Vec3,
    pub normal: Vec3,
    pub albedo: Vec3,
    pub specular: f32,
    pub shininess: f32,
}

impl SurfaceSample {
    /// Returns `None` for sentinel texels (zero normal).
    pub fn decode(position: [f32; 4], normal: [f32; 4], albedo: [f32; 4]) -> Option<Self> {
        let n = Vec3::new(normal[0], normal[1], normal[2]);
        if n.length_squared() < EPSILON_SQ {
            return None;
        }
        Some(Self {
            position: Vec3::new(position[0], position[1], position[2]),
            normal: n.normalize(),
            albedo: Vec3::new(albedo[0], albedo[1], albedo[2]),
            specular: normal[3],
            shininess: albedo[3],
        })
    }
}

/// One decoded RSM texel.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct VplSample {
    pub position: Vec3,
    pub normal: Vec3,
    pub flux: Vec3,
}

impl VplSample {
    pub fn decode(position: [f32; 4], normal: [f32; 4], flux: [f32; 4]) -> Option<Self> {
        let n = Vec3::new(normal[0], normal[1], normal[2]);
        if n.length_squared() < EPSILON_SQ {
            return None;
        }
        Some(Self {
            position: Vec3::new(position[0], position[1], position[2]),
            normal: n,
            flux: Vec3::new(flux[0], flux[1], flux[2]),
        })
    }
}

/// Cone falloff; 1 inside, 0 outside, linear over `SPOT_SOFTNESS`.
pub fn spot_factor(direction: Vec3, cutoff_cos: f32, to_surface: Vec3) -> f32 {
    ((direction.dot(to_surface) - cutoff_cos) / SPOT_SOFTNESS).clamp(0.0, 1.0)
}

/// Blinn-Phong sum over the first `header.counts[0]` lights.
pub fn direct_lighting(surface: &SurfaceSample, header: &LightingHeader, lights: &[GpuLight]) -> Vec3 {
    let eye = Vec3::from_slice(&header.eye[..3]);
    let k = header.params[0];
    let view = (eye - surface.position).normalize_or_zero();
    let count = (header.counts[0] as usize).min(lights.len());

    let mut color = Vec3::ZERO;
    for light in &lights[..count] {
        let position = glam::Vec4::from(light.position).xyz();
        let direction = glam::Vec4::from(light.direction).xyz();
        let light_color = glam::Vec4::from(light.color).xyz() * light.color[3];

        let to_light = position - surface.position;
        let distance_sq = to_light.length_squared();
        let l = to_light / distance_sq.max(EPSILON_SQ).sqrt();

        let spot = spot_factor(direction, light.direction[3], -l);
        let attenuation = 1.0 / (1.0 + k * distance_sq);
        let diffuse = surface.normal.dot(l).max(0.0);
        let specular = if diffuse > 0.0 {
            let h = (l + view).normalize_or_zero();
            surface.normal.dot(h).max(0.0).powf(surface.shininess.max(1.0)) * surface.specular
        } else {
            0.0
        };

        color += (surface.albedo * diffuse + Vec3::splat(specular)) * light_color * spot * attenuation;
    }
    color
}

/// Flux a single VPL sends to a receiver, before albedo and weights.
///
/// `flux · max(0, n_p·(x − x_p)) · max(0, n·(x_p − x)) / max(|x − x_p|², d_min²)²`
pub fn vpl_contribution(receiver: &SurfaceSample, vpl: &VplSample, min_distance: f32) -> Vec3 {
    let d = receiver.position - vpl.position;
    let distance_sq = d.length_squared().max(min_distance * min_distance);
    let emit = vpl.normal.dot(d).max(0.0);
    let receive = receiver.normal.dot(-d).max(0.0);
    vpl.flux * (emit * receive / (distance_sq * distance_sq))
}

/// Maps a unit-square sample to an RSM texel, clamped to the edge.
pub fn sample_texel(uv: [f32; 2], width: u32, height: u32) -> (u32, u32) {
    let x = ((uv[0] * width as f32) as u32).min(width.saturating_sub(1));
    let y = ((uv[1] * height as f32) as u32).min(height.saturating_sub(1));
    (x, y)
}

/// One-bounce light at `receiver` gathered from the VPLs `fetch` returns.
///
/// `fetch(x, y)` yields `None` for sentinel texels, which contribute nothing.
pub fn indirect_lighting(
    receiver: &SurfaceSample,
    header: &LightingHeader,
    samples: &[[f32; 4]],
    rsm_size: (u32, u32),
    mut fetch: impl FnMut(u32, u32) -> Option<VplSample>,
) -> Vec3 {
    let min_distance = header.params[1];
    let intensity = header.params[2];
    let count = (header.counts[1] as usize).min(samples.len());

    let mut sum = Vec3::ZERO;
    for s in &samples[..count] {
        let (x, y) = sample_texel([s[0], s[1]], rsm_size.0, rsm_size.1);
        if let Some(vpl) = fetch(x, y) {
            sum += vpl_contribution(receiver, &vpl, min_distance) * s[2];
        }
    }
    sum * receiver.albedo * intensity
}

#[cfg(test)]
mod tests {
    use super::*;

    fn floor_at(position: Vec3) -> SurfaceSample {
        SurfaceSample {
            position,
            normal: Vec3::Y,
            albedo: Vec3::ONE,
            specular: 0.0,
            shininess: 1.0,
        }
    }

    fn header(k: f32, light_count: u32) -> LightingHeader {
        LightingHeader {
            eye: [0.0, 5.0, 0.0, 1.0],
            params: [k, 0.1, 1.0, 0.0],
            counts: [light_count, 0, 0, 0],
        }
    }

    fn overhead_light(height: f32, cutoff: f32) -> GpuLight {
        GpuLight {
            position: [0.0, height, 0.0, 1.0],
            direction: [0.0, -1.0, 0.0, cutoff],
            color: [1.0, 1.0, 1.0, 1.0],
        }
    }

    // ── decoding ────────────────────────────────────────────────────────────

    #[test]
    fn zero_normal_is_sentinel() {
        assert!(SurfaceSample::decode([1.0; 4], [0.0; 4], [1.0; 4]).is_none());
        assert!(VplSample::decode([1.0; 4], [0.0; 4], [1.0; 4]).is_none());
    }

    #[test]
    fn decode_unpacks_material_channels() {
        let s = SurfaceSample::decode([1.0, 2.0, 3.0, 1.0], [0.0, 2.0, 0.0, 0.5], [0.2, 0.3, 0.4, 32.0])
            .unwrap();
        assert_eq!(s.normal, Vec3::Y);
        assert_eq!(s.specular, 0.5);
        assert_eq!(s.shininess, 32.0);
    }

    // ── direct ──────────────────────────────────────────────────────────────

    #[test]
    fn head_on_light_with_no_attenuation() {
        let c = direct_lighting(&floor_at(Vec3::ZERO), &header(0.0, 1), &[overhead_light(2.0, -2.0)]);
        assert!((c - Vec3::ONE).abs().max_element() < 1e-6);
    }

    #[test]
    fn attenuation_is_inverse_quadratic() {
        let c = direct_lighting(&floor_at(Vec3::ZERO), &header(1.0, 1), &[overhead_light(2.0, -2.0)]);
        assert!((c.x - 1.0 / 5.0).abs() < 1e-6);
    }

    #[test]
    fn outside_cone_is_dark() {
        let surface = floor_at(Vec3::new(10.0, 0.0, 0.0));
        let cutoff = 30f32.to_radians().cos();
        let c = direct_lighting(&surface, &header(0.0, 1), &[overhead_light(1.0, cutoff)]);
        assert_eq!(c, Vec3::ZERO);
    }

    #[test]
    fn unused_slots_are_ignored() {
        let lights = [overhead_light(2.0, -2.0), overhead_light(2.0, -2.0)];
        let one = direct_lighting(&floor_at(Vec3::ZERO), &header(0.0, 1), &lights);
        let two = direct_lighting(&floor_at(Vec3::ZERO), &header(0.0, 2), &lights);
        assert!((two - one * 2.0).abs().max_element() < 1e-6);
    }

    // ── indirect ────────────────────────────────────────────────────────────

    #[test]
    fn facing_vpl_contributes() {
        let receiver = floor_at(Vec3::ZERO);
        let vpl = VplSample {
            position: Vec3::new(0.0, 1.0, 0.0),
            normal: Vec3::NEG_Y,
            flux: Vec3::ONE,
        };
        // |d| = 1, both cosines 1.
        let c = vpl_contribution(&receiver, &vpl, 0.1);
        assert!((c - Vec3::ONE).abs().max_element() < 1e-6);
    }

    #[test]
    fn coincident_vpl_is_clamped_not_infinite() {
        let receiver = floor_at(Vec3::ZERO);
        let vpl = VplSample {
            position: Vec3::new(0.0, 1e-6, 0.0),
            normal: Vec3::NEG_Y,
            flux: Vec3::ONE,
        };
        let c = vpl_contribution(&receiver, &vpl, 0.1);
        assert!(c.is_finite());
    }

    #[test]
    fn back_facing_vpl_contributes_nothing() {
        let receiver = floor_at(Vec3::ZERO);
        let vpl = VplSample {
            position: Vec3::new(0.0, 1.0, 0.0),
            normal: Vec3::Y,
            flux: Vec3::ONE,
        };
        assert_eq!(vpl_contribution(&receiver, &vpl, 0.1), Vec3::ZERO);
    }

    #[test]
    fn empty_rsm_gives_exact_zero() {
        let receiver = floor_at(Vec3::ZERO);
        let mut h = header(0.0, 0);
        h.counts[1] = 4;
        let samples = [[0.1, 0.1, 0.25, 0.0]; 4];
        let c = indirect_lighting(&receiver, &h, &samples, (8, 8), |_, _| None);
        assert_eq!(c, Vec3::ZERO);
    }

    #[test]
    fn sample_texel_clamps_to_edge() {
        assert_eq!(sample_texel([0.999_999, 1.0], 4, 4), (3, 3));
        assert_eq!(sample_texel([0.0, 0.5], 4, 4), (0, 2));
    }
}
