//! Procedural meshes for scenes built without external assets.

use glam::Vec3;

use super::mesh::{MeshData, Vertex};

/// (normal, u axis, v axis) with `u × v = normal` so faces wind CCW from outside.
const CUBE_FACES: [(Vec3, Vec3, Vec3); 6] = [
    (Vec3::X, Vec3::NEG_Z, Vec3::Y),
    (Vec3::NEG_X, Vec3::Z, Vec3::Y),
    (Vec3::Y, Vec3::X, Vec3::NEG_Z),
    (Vec3::NEG_Y, Vec3::X, Vec3::Z),
    (Vec3::Z, Vec3::X, Vec3::Y),
    (Vec3::NEG_Z, Vec3::NEG_X, Vec3::Y),
];

/// Unit cube centered on the origin.
pub fn cube() -> MeshData {
    let mut mesh = MeshData::default();
    for (normal, u, v) in CUBE_FACES {
        push_face(&mut mesh, normal * 0.5, normal, u, v);
    }
    mesh
}

/// Unit square in the XZ plane facing +Y.
pub fn quad() -> MeshData {
    let mut mesh = MeshData::default();
    push_face(&mut mesh, Vec3::ZERO, Vec3::Y, Vec3::X, Vec3::NEG_Z);
    mesh
}

/// Walls of a unit room open toward +Z, each facing inward.
///
/// Order: floor, ceiling, back, left (-X), right (+X). Kept separate so each
/// wall can carry its own material, as in a Cornell box.
pub fn room_walls() -> [MeshData; 5] {
    [2, 3, 4, 0, 1].map(|face| {
        let (normal, u, v) = CUBE_FACES[face];
        let mut mesh = MeshData::default();
        push_face(&mut mesh, -normal * 0.5, normal, u, v);
        mesh
    })
}

fn push_face(mesh: &mut MeshData, center: Vec3, normal: Vec3, u: Vec3, v: Vec3) {
    let base = mesh.vertices.len() as u32;
    let corners = [(-0.5, -0.5), (0.5, -0.5), (0.5, 0.5), (-0.5, 0.5)];
    for (su, sv) in corners {
        let p = center + u * su + v * sv;
        mesh.vertices.push(Vertex::new(
            p.to_array(),
            normal.to_array(),
            [su + 0.5, 0.5 - sv],
        ));
    }
    mesh.indices
        .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face_normal(mesh: &MeshData, tri: &[u32]) -> Vec3 {
        let p = |i: u32| Vec3::from(mesh.vertices[i as usize].position);
        (p(tri[1]) - p(tri[0])).cross(p(tri[2]) - p(tri[0])).normalize()
    }

    #[test]
    fn cube_winding_matches_normals() {
        let mesh = cube();
        assert!(mesh.validate("cube").is_ok());
        assert_eq!(mesh.triangle_count(), 12);
        for tri in mesh.indices.chunks_exact(3) {
            let stored = Vec3::from(mesh.vertices[tri[0] as usize].normal);
            assert!(face_normal(&mesh, tri).dot(stored) > 0.999);
        }
    }

    #[test]
    fn room_walls_face_the_center() {
        for wall in room_walls() {
            assert_eq!(wall.triangle_count(), 2);
            let tri = &wall.indices[..3];
            let n = face_normal(&wall, tri);
            let center = Vec3::from(wall.vertices[0].position) + Vec3::from(wall.vertices[2].position);
            // Wall center sits opposite its normal.
            assert!(n.dot(-center * 0.5) > 0.49);
        }
    }

    #[test]
    fn quad_faces_up() {
        let mesh = quad();
        assert_eq!(mesh.triangle_count(), 2);
        for tri in mesh.indices.chunks_exact(3) {
            assert!(face_normal(&mesh, tri).dot(Vec3::Y) > 0.999);
        }
    }
}
