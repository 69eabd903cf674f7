//! Built-in demo scene.

use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};

use crate::device::RenderDevice;
use crate::error::Result;
use crate::resources::Resources;

use super::{primitives, Camera, Light, LightOrbit, Material, Mesh, Model, Scene};

pub const CORNELL_ROOM: &str = "cornell/room";
pub const CORNELL_TALL_BLOCK: &str = "cornell/tall_block";
pub const CORNELL_SHORT_BLOCK: &str = "cornell/short_block";

const WHITE: Vec3 = Vec3::new(0.75, 0.75, 0.75);
const RED: Vec3 = Vec3::new(0.75, 0.1, 0.1);
const GREEN: Vec3 = Vec3::new(0.1, 0.75, 0.1);

/// Registers the Cornell box meshes and models and returns a scene lit by one
/// spot light pointing down from under the ceiling.
///
/// The room spans `[-1, 1] × [0, 2] × [-1, 1]` and is open toward +Z, where
/// the camera stands.
pub fn cornell_box<D: RenderDevice>(
    device: &mut D,
    resources: &mut Resources<D>,
    light_capacity: usize,
) -> Result<Scene> {
    let wall_colors = [WHITE, WHITE, WHITE, RED, GREEN];
    let wall_names = ["floor", "ceiling", "back", "left", "right"];

    let mut room = Model::new();
    for ((data, name), color) in primitives::room_walls()
        .into_iter()
        .zip(wall_names)
        .zip(wall_colors)
    {
        let label = format!("{CORNELL_ROOM}/{name}");
        let mesh = Arc::new(Mesh::upload(device, label.as_str(), data)?);
        resources.meshes.add(label, Arc::clone(&mesh));
        room.push(mesh, Material::diffuse(color));
    }
    resources.models.add(CORNELL_ROOM, room);

    let cube = Arc::new(Mesh::upload(device, "cornell/cube", primitives::cube())?);
    resources.meshes.add("cornell/cube", Arc::clone(&cube));
    resources.models.add(
        CORNELL_TALL_BLOCK,
        Model::single(Arc::clone(&cube), Material::diffuse(WHITE).with_specular(0.3, 24.0)),
    );
    resources.models.add(
        CORNELL_SHORT_BLOCK,
        Model::single(cube, Material::diffuse(WHITE)),
    );

    let mut scene = Scene::new(light_capacity);
    scene.camera = Camera::look_at(Vec3::new(0.0, 1.0, 3.5), Vec3::new(0.0, 1.0, 0.0));

    scene.add_instance(
        CORNELL_ROOM,
        Mat4::from_scale_rotation_translation(Vec3::splat(2.0), Quat::IDENTITY, Vec3::Y),
    );
    scene.add_instance(
        CORNELL_TALL_BLOCK,
        Mat4::from_scale_rotation_translation(
            Vec3::new(0.6, 1.2, 0.6),
            Quat::from_rotation_y(0.3),
            Vec3::new(-0.35, 0.6, -0.3),
        ),
    );
    scene.add_instance(
        CORNELL_SHORT_BLOCK,
        Mat4::from_scale_rotation_translation(
            Vec3::splat(0.6),
            Quat::from_rotation_y(-0.3),
            Vec3::new(0.4, 0.3, 0.3),
        ),
    );

    scene.lights.push(Light::spot(
        Vec3::new(0.0, 1.9, 0.0),
        Vec3::NEG_Y,
        55.0,
        Vec3::new(1.0, 0.95, 0.85),
        1.5,
    ))?;

    Ok(scene)
}

/// Circles light `slot` around the room's vertical axis.
pub fn cornell_orbit(slot: usize) -> LightOrbit {
    LightOrbit {
        slot,
        center: Vec3::new(0.0, 0.0, 0.0),
        radius: 0.5,
        height: 1.9,
        speed: 0.5,
        angle: 0.0,
    }
}
