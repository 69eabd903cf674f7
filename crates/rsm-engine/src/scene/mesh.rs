use std::fmt;

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::device::RenderDevice;
use crate::error::{EngineError, Result};

/// Interleaved vertex as uploaded to the device.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

impl Vertex {
    pub const fn new(position: [f32; 3], normal: [f32; 3], uv: [f32; 2]) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// CPU-side indexed triangle list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self { vertices, indices }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn validate(&self, label: &str) -> Result<()> {
        if self.vertices.is_empty() || self.indices.is_empty() {
            return Err(EngineError::asset(label, "mesh has no triangles"));
        }
        if self.indices.len() % 3 != 0 {
            return Err(EngineError::asset(
                label,
                format!("index count {} is not a multiple of 3", self.indices.len()),
            ));
        }
        let n = self.vertices.len() as u32;
        if let Some(bad) = self.indices.iter().find(|&&i| i >= n) {
            return Err(EngineError::asset(
                label,
                format!("index {bad} out of range for {n} vertices"),
            ));
        }
        Ok(())
    }

    /// Replaces every normal with the area-weighted average of adjacent faces.
    pub fn compute_normals(&mut self) {
        let mut acc = vec![Vec3::ZERO; self.vertices.len()];
        for tri in self.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
            let pa = Vec3::from(self.vertices[a].position);
            let pb = Vec3::from(self.vertices[b].position);
            let pc = Vec3::from(self.vertices[c].position);
            let n = (pb - pa).cross(pc - pa);
            acc[a] += n;
            acc[b] += n;
            acc[c] += n;
        }
        for (v, n) in self.vertices.iter_mut().zip(acc) {
            v.normal = n.normalize_or_zero().to_array();
        }
    }
}

/// Mesh uploaded to a device.
pub struct Mesh<D: RenderDevice> {
    label: String,
    triangle_count: usize,
    data: MeshData,
    raw: D::Mesh,
}

impl<D: RenderDevice> Mesh<D> {
    /// Validates `data` and uploads it.
    pub fn upload(device: &mut D, label: impl Into<String>, data: MeshData) -> Result<Self> {
        let label = label.into();
        data.validate(&label)?;
        let raw = device.create_mesh(&label, &data);
        Ok(Self {
            triangle_count: data.triangle_count(),
            label,
            data,
            raw,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn triangle_count(&self) -> usize {
        self.triangle_count
    }

    /// CPU copy the mesh was uploaded from.
    pub fn data(&self) -> &MeshData {
        &self.data
    }

    pub fn raw(&self) -> &D::Mesh {
        &self.raw
    }
}

impl<D: RenderDevice> fmt::Debug for Mesh<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mesh")
            .field("label", &self.label)
            .field("triangles", &self.triangle_count)
            .finish_non_exhaustive()
    }
}
