use copresence_protocol::UserId;
use glam::{Quat, Vec3};
use hecs::{Entity, World};

use crate::components::{GlobalTransform, Info, LocalTransform, Parent, RemoteHead};

/// The renderer, as far as remote heads are concerned.
///
/// A placeholder is owned by exactly one registry entry. It is created when the entry is created and
/// handed back to [`PlaceholderRenderer::destroy_placeholder`] exactly once, when the entry goes away.
pub trait PlaceholderRenderer {
    /// Whatever the renderer uses to find the placeholder again
    type Handle;

    /// Create a placeholder for a participant's head, at the stage origin.
    fn create_placeholder(&mut self, user_id: UserId) -> Self::Handle;

    /// Destroy a placeholder immediately.
    fn destroy_placeholder(&mut self, handle: Self::Handle);

    /// Move a placeholder. The pose is relative to the stage, not the world.
    fn set_local_transform(&mut self, handle: &Self::Handle, position: Vec3, rotation: Quat);
}

/// Placeholders as entities in a [`hecs::World`], parented to the stage.
///
/// Each placeholder gets a [`RemoteHead`], an [`Info`], a [`Parent`] pointing at the stage, and a
/// [`LocalTransform`] / [`GlobalTransform`] pair. Run the transform systems afterwards to bring the
/// [`GlobalTransform`]s up to date.
pub struct ScenePlaceholders<'a> {
    world: &'a mut World,
    stage_entity: Entity,
    scale: f32,
}

impl<'a> ScenePlaceholders<'a> {
    pub fn new(world: &'a mut World, stage_entity: Entity, scale: f32) -> Self {
        Self {
            world,
            stage_entity,
            scale,
        }
    }
}

impl<'a> PlaceholderRenderer for ScenePlaceholders<'a> {
    type Handle = Entity;

    fn create_placeholder(&mut self, user_id: UserId) -> Entity {
        let local_transform = LocalTransform {
            scale: Vec3::splat(self.scale),
            ..Default::default()
        };

        self.world.spawn((
            RemoteHead { user_id },
            Info {
                name: format!("Remote Head {user_id}"),
            },
            Parent(self.stage_entity),
            local_transform,
            GlobalTransform::default(),
        ))
    }

    fn destroy_placeholder(&mut self, handle: Entity) {
        if self.world.despawn(handle).is_err() {
            log::warn!("[COPRESENCE_PLACEHOLDER] Placeholder {handle:?} was already gone");
        }
    }

    fn set_local_transform(&mut self, handle: &Entity, position: Vec3, rotation: Quat) {
        match self.world.get::<&mut LocalTransform>(*handle) {
            Ok(mut local_transform) => {
                local_transform.translation = position;
                local_transform.rotation = rotation;
            }
            Err(e) => {
                log::warn!("[COPRESENCE_PLACEHOLDER] Unable to move placeholder {handle:?}: {e}")
            }
        }
    }
}
