use hecs::World;

use crate::components::{GlobalTransform, LocalTransform};

/// Update global transform system
/// Walks through each LocalTransform and applies it to the GlobalTransform.
/// Entities with a parent are fixed up afterwards by `update_global_transform_with_parent_system`.
pub fn update_global_transform_system(world: &mut World) {
    for (_, (local_transform, global_transform)) in
        world.query_mut::<(&LocalTransform, &mut GlobalTransform)>()
    {
        global_transform.0 = local_transform.to_affine();
    }
}
