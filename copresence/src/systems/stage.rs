use glam::Affine3A;
use hecs::World;

use crate::components::{GlobalTransform, Stage, HMD};

/// Get the transform of the stage in global space.
pub fn get_global_from_stage(world: &mut World) -> Affine3A {
    world
        .query_mut::<(&Stage, &GlobalTransform)>()
        .into_iter()
        .next()
        .map(|(_, (_, global_transform))| global_transform.0)
        .unwrap_or(Affine3A::IDENTITY)
}

/// Get the transform of the local viewer's head in global space.
pub fn get_global_from_hmd(world: &mut World) -> Affine3A {
    world
        .query_mut::<(&HMD, &GlobalTransform)>()
        .into_iter()
        .next()
        .map(|(_, (_, global_transform))| global_transform.0)
        .unwrap_or(Affine3A::IDENTITY)
}
