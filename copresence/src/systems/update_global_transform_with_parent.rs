use hecs::World;

use crate::components::{GlobalTransform, LocalTransform, Parent};

/// Deepest hierarchy walked before the entity is assumed to be part of a parent cycle.
const MAX_DEPTH: usize = 1024;

/// Update global transform with parent transform system
/// Walks through each entity that has a Parent and builds a hierarchy
/// Then transforms each entity based on the hierarchy
///
/// Remote head placeholders are parented to the stage, so after this runs their [`GlobalTransform`]
/// is `global_from_stage * stage_from_head`.
pub fn update_global_transform_with_parent_system(world: &mut World) {
    // Views allow dynamic borrow checking and storage look-up to be done once rather than
    // per-entity as in `World::get`.
    let mut parents = world.query::<(&Parent, &LocalTransform)>();
    let parents = parents.view();

    // Roots of the transform hierarchy
    let mut roots = world.query::<&GlobalTransform>().without::<&Parent>();
    let roots = roots.view();

    // `roots` excludes everything with a `Parent`, and this query requires one, so the
    // `GlobalTransform` borrows never overlap.
    for (entity, (parent, local_transform, global_transform)) in world
        .query::<(&Parent, &LocalTransform, &mut GlobalTransform)>()
        .iter()
    {
        let mut relative = local_transform.to_affine();
        let mut ancestor = parent.0;
        let mut depth = 0;
        while let Some((next, ancestor_transform)) = parents.get(ancestor) {
            relative = ancestor_transform.to_affine() * relative;
            ancestor = next.0;
            depth += 1;

            if depth > MAX_DEPTH {
                log::warn!("[COPRESENCE_TRANSFORM] {entity:?} is part of a parent cycle");
                break;
            }
        }

        global_transform.0 = match roots.get(ancestor) {
            Some(root) => root.0 * relative,
            None => {
                log::debug!("[COPRESENCE_TRANSFORM] {entity:?} has no root, treating it as one");
                relative
            }
        };
    }
}
