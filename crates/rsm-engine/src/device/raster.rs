//! Scanline-free triangle rasterizer for the software device.
//!
//! Edge functions over pixel centers, perspective-correct attributes, depth in
//! the 0..1 range glam's `perspective_rh` produces, y pointing down.

use glam::{Vec2, Vec3, Vec4};

use crate::render::Extent;

const MIN_W: f32 = 1e-6;

/// Post-transform vertex with the attributes fragments interpolate.
#[derive(Debug, Copy, Clone)]
pub(crate) struct ClipVertex {
    pub clip: Vec4,
    pub world: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

#[derive(Debug, Copy, Clone)]
pub(crate) struct Fragment {
    pub world: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
}

fn edge(a: Vec2, b: Vec2, p: Vec2) -> f32 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Rasterizes one triangle with depth test `Less`, calling `shade` for every
/// fragment that passes with its texel index.
///
/// Triangles with a vertex behind the eye plane are dropped; there is no
/// near-plane clipping. Both windings are drawn.
pub(crate) fn rasterize_triangle(
    extent: Extent,
    tri: &[ClipVertex; 3],
    depth: &mut [f32],
    mut shade: impl FnMut(usize, Fragment),
) {
    if tri.iter().any(|v| v.clip.w <= MIN_W) || extent.is_empty() {
        return;
    }

    let (w, h) = (extent.width as f32, extent.height as f32);
    let screen = tri.map(|v| {
        let ndc = v.clip.truncate() / v.clip.w;
        (
            Vec2::new((ndc.x * 0.5 + 0.5) * w, (0.5 - ndc.y * 0.5) * h),
            ndc.z,
        )
    });
    let (p0, p1, p2) = (screen[0].0, screen[1].0, screen[2].0);

    let area = edge(p0, p1, p2);
    if area.abs() < 1e-12 {
        return;
    }

    let min = p0.min(p1).min(p2).floor().max(Vec2::ZERO);
    let max = p0.max(p1).max(p2).ceil().min(Vec2::new(w - 1.0, h - 1.0));
    if min.x > max.x || min.y > max.y {
        return;
    }

    let inv_w = tri.map(|v| 1.0 / v.clip.w);

    for y in min.y as u32..=max.y as u32 {
        for x in min.x as u32..=max.x as u32 {
            let p = Vec2::new(x as f32 + 0.5, y as f32 + 0.5);
            let b0 = edge(p1, p2, p) / area;
            let b1 = edge(p2, p0, p) / area;
            let b2 = edge(p0, p1, p) / area;
            if b0 < 0.0 || b1 < 0.0 || b2 < 0.0 {
                continue;
            }

            let z = b0 * screen[0].1 + b1 * screen[1].1 + b2 * screen[2].1;
            if !(0.0..=1.0).contains(&z) {
                continue;
            }
            let index = y as usize * extent.width as usize + x as usize;
            if z >= depth[index] {
                continue;
            }
            depth[index] = z;

            let (c0, c1, c2) = (b0 * inv_w[0], b1 * inv_w[1], b2 * inv_w[2]);
            let norm = 1.0 / (c0 + c1 + c2);
            let (c0, c1, c2) = (c0 * norm, c1 * norm, c2 * norm);

            shade(
                index,
                Fragment {
                    world: tri[0].world * c0 + tri[1].world * c1 + tri[2].world * c2,
                    normal: tri[0].normal * c0 + tri[1].normal * c1 + tri[2].normal * c2,
                    uv: tri[0].uv * c0 + tri[1].uv * c1 + tri[2].uv * c2,
                },
            );
        }
    }
}
