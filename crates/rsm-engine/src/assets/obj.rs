//! Wavefront OBJ/MTL models read through an `AssetSource`.
//!
//! Each OBJ object becomes one registered mesh named `"{model}/{object}"`;
//! the model itself is registered under its own name with one part per mesh.
//! Material textures are referenced by the name written in the MTL file and
//! are expected to be registered separately (see `textures::load_textures`).

use std::io::Cursor;
use std::sync::Arc;

use glam::Vec3;

use crate::device::RenderDevice;
use crate::error::{EngineError, Result};
use crate::resources::Resources;
use crate::scene::{Material, Mesh, MeshData, Model, Vertex};

use super::{join, parent, AssetSource};

/// One OBJ object, decoded but not uploaded.
#[derive(Debug, Clone)]
pub struct ObjPart {
    pub name: String,
    pub mesh: MeshData,
    pub material: Material,
}

fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        triangulate: true,
        single_index: true,
        ..Default::default()
    }
}

/// Maps MTL parameters onto the Blinn-Phong material.
fn material_from_mtl(mtl: &tobj::Material) -> Material {
    let mut material = Material::default();
    if let Some(kd) = mtl.diffuse {
        material.diffuse = Vec3::from(kd);
    }
    if let Some(ks) = mtl.specular {
        material.specular = (ks[0] + ks[1] + ks[2]) / 3.0;
    }
    if let Some(ns) = mtl.shininess {
        material.shininess = ns.max(1.0);
    }
    material.diffuse_texture = mtl
        .diffuse_texture
        .as_deref()
        .filter(|name| !name.is_empty())
        .map(|name| name.replace('\\', "/"));
    material
}

fn mesh_from_obj(mesh: &tobj::Mesh) -> MeshData {
    let count = mesh.positions.len() / 3;
    let has_normals = mesh.normals.len() == count * 3;
    let has_uvs = mesh.texcoords.len() == count * 2;

    let vertices = (0..count)
        .map(|i| {
            let p = &mesh.positions[i * 3..i * 3 + 3];
            let normal = if has_normals {
                [mesh.normals[i * 3], mesh.normals[i * 3 + 1], mesh.normals[i * 3 + 2]]
            } else {
                [0.0; 3]
            };
            // OBJ puts v = 0 at the bottom of the image.
            let uv = if has_uvs {
                [mesh.texcoords[i * 2], 1.0 - mesh.texcoords[i * 2 + 1]]
            } else {
                [0.0; 2]
            };
            Vertex::new([p[0], p[1], p[2]], normal, uv)
        })
        .collect();

    let mut data = MeshData::new(vertices, mesh.indices.clone());
    if !has_normals {
        data.compute_normals();
    }
    data
}

/// Parses `obj_path` and the MTL libraries it references.
///
/// MTL paths resolve against the OBJ's directory. A missing or broken MTL
/// leaves every part with the default material.
pub fn parse(source: &dyn AssetSource, obj_path: &str) -> Result<Vec<ObjPart>> {
    let bytes = source.read(obj_path)?;
    let dir = parent(obj_path);

    let (models, materials) = tobj::load_obj_buf(
        &mut Cursor::new(bytes),
        &load_options(),
        |mtl_path| {
            let path = join(dir, &mtl_path.to_string_lossy().replace('\\', "/"));
            let bytes = source
                .read(&path)
                .map_err(|_| tobj::LoadError::OpenFileFailed)?;
            tobj::load_mtl_buf(&mut Cursor::new(bytes))
        },
    )
    .map_err(|e| EngineError::asset(obj_path, e))?;

    let materials = materials.unwrap_or_else(|err| {
        log::warn!("{obj_path}: materials unavailable ({err}); using defaults");
        Vec::new()
    });

    let parts: Vec<ObjPart> = models
        .iter()
        .filter(|m| !m.mesh.indices.is_empty())
        .map(|m| ObjPart {
            name: m.name.clone(),
            mesh: mesh_from_obj(&m.mesh),
            material: m
                .mesh
                .material_id
                .and_then(|id| materials.get(id))
                .map(material_from_mtl)
                .unwrap_or_default(),
        })
        .collect();

    if parts.is_empty() {
        return Err(EngineError::asset(obj_path, "no triangles"));
    }
    Ok(parts)
}

/// Loads an OBJ model, registering its meshes and the model under `name`.
pub fn load_model<D: RenderDevice>(
    device: &mut D,
    source: &dyn AssetSource,
    obj_path: &str,
    name: &str,
    resources: &mut Resources<D>,
) -> Result<Arc<Model<D>>> {
    let mut model = Model::new();
    for (index, part) in parse(source, obj_path)?.into_iter().enumerate() {
        let object = if part.name.is_empty() {
            index.to_string()
        } else {
            part.name
        };
        let mesh_name = format!("{name}/{object}");
        let mesh = Arc::new(Mesh::upload(device, mesh_name.as_str(), part.mesh)?);
        resources.meshes.add(mesh_name, Arc::clone(&mesh));
        model.push(mesh, part.material);
    }

    log::info!(
        "loaded model '{name}' from {obj_path}: {} parts, {} triangles",
        model.parts().len(),
        model.triangle_count()
    );
    let model = Arc::new(model);
    resources.models.add(name, Arc::clone(&model));
    Ok(model)
}
