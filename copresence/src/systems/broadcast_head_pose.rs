use glam::{Affine3A, Quat, Vec3};
use hecs::World;

use super::stage::{get_global_from_hmd, get_global_from_stage};
use crate::contexts::HeadTransformSink;

/// Sends the local viewer's head pose to everyone else in the session, once per tick.
///
/// Poses go out relative to the stage, so peers can place our head in their own copy of the shared
/// space no matter where their stage sits in their world.
#[derive(Debug, Clone, Default)]
pub struct PoseBroadcaster {
    sent: u64,
    last_sent: Option<(Vec3, Quat)>,
}

impl PoseBroadcaster {
    pub fn new() -> Self {
        Default::default()
    }

    /// Convert the viewer's pose into stage space and hand it to the sink. There is no change
    /// detection here: the pose is sent every time this is called.
    pub fn tick<S: HeadTransformSink + ?Sized>(
        &mut self,
        global_from_stage: &Affine3A,
        global_from_viewer: &Affine3A,
        sink: &mut S,
    ) {
        let (position, rotation) = stage_from_viewer(global_from_stage, global_from_viewer);
        log::trace!("[COPRESENCE_BROADCAST] Sending head pose {position:?} {rotation:?}");

        sink.send_head_transform(position, rotation);
        self.sent += 1;
        self.last_sent = Some((position, rotation));
    }

    /// How many poses have been sent
    pub fn sent(&self) -> u64 {
        self.sent
    }

    /// The most recent pose sent, in stage space
    pub fn last_sent(&self) -> Option<(Vec3, Quat)> {
        self.last_sent
    }
}

/// The viewer's position and rotation relative to the stage.
///
/// The position goes through the full inverse of the stage transform, so a scaled stage scales the
/// position too. The rotation is `inverse(stage rotation) * viewer rotation`.
pub fn stage_from_viewer(
    global_from_stage: &Affine3A,
    global_from_viewer: &Affine3A,
) -> (Vec3, Quat) {
    let (_, stage_rotation, _) = global_from_stage.to_scale_rotation_translation();
    let (_, viewer_rotation, viewer_position) = global_from_viewer.to_scale_rotation_translation();

    let position = global_from_stage.inverse().transform_point3(viewer_position);
    let rotation = stage_rotation.inverse() * viewer_rotation;

    (position, rotation)
}

/// Broadcast head pose system
/// Reads the [`crate::components::Stage`] and [`crate::components::HMD`] transforms out of the world
/// and sends the viewer's pose. A missing entity is treated as sitting at the origin.
pub fn broadcast_head_pose_system<S: HeadTransformSink + ?Sized>(
    world: &mut World,
    broadcaster: &mut PoseBroadcaster,
    sink: &mut S,
) {
    let global_from_stage = get_global_from_stage(world);
    let global_from_hmd = get_global_from_hmd(world);
    broadcaster.tick(&global_from_stage, &global_from_hmd, sink);
}

#[cfg(test)]
mod tests {
    use std::f32::consts::FRAC_PI_2;

    use approx::assert_relative_eq;

    use super::*;
    use crate::components::{GlobalTransform, Stage, HMD};

    #[derive(Default)]
    struct RecordingSink {
        sent: Vec<(Vec3, Quat)>,
    }

    impl HeadTransformSink for RecordingSink {
        fn send_head_transform(&mut self, position: Vec3, rotation: Quat) {
            self.sent.push((position, rotation));
        }
    }

    #[test]
    pub fn test_identity_frame() {
        let mut broadcaster = PoseBroadcaster::new();
        let mut sink = RecordingSink::default();

        let viewer = Affine3A::from_translation([5.0, 0.0, 0.0].into());
        broadcaster.tick(&Affine3A::IDENTITY, &viewer, &mut sink);

        assert_eq!(sink.sent.len(), 1);
        let (position, rotation) = sink.sent[0];
        assert_relative_eq!(position, Vec3::new(5.0, 0.0, 0.0));
        assert_relative_eq!(rotation, Quat::IDENTITY);
    }

    #[test]
    pub fn test_viewer_at_frame_origin() {
        let mut broadcaster = PoseBroadcaster::new();
        let mut sink = RecordingSink::default();

        let frame = Affine3A::from_rotation_translation(
            Quat::from_rotation_y(FRAC_PI_2),
            [2.0, 0.0, 3.0].into(),
        );
        broadcaster.tick(&frame, &frame, &mut sink);

        let (position, rotation) = sink.sent[0];
        assert_relative_eq!(position, Vec3::ZERO, epsilon = 1e-6);
        assert_relative_eq!(rotation.dot(Quat::IDENTITY).abs(), 1.0, epsilon = 1e-6);
    }

    #[test]
    pub fn test_rotated_frame() {
        let frame = Affine3A::from_rotation_y(FRAC_PI_2);
        let viewer = Affine3A::from_rotation_translation(
            Quat::from_rotation_y(FRAC_PI_2),
            [0.0, 1.6, -1.0].into(),
        );

        let (position, rotation) = stage_from_viewer(&frame, &viewer);

        // -Z in global space is +X in a stage turned a quarter left.
        assert_relative_eq!(position, Vec3::new(1.0, 1.6, 0.0), epsilon = 1e-6);
        assert_relative_eq!(rotation.dot(Quat::IDENTITY).abs(), 1.0, epsilon = 1e-6);
    }

    #[test]
    pub fn test_scaled_frame() {
        let frame = Affine3A::from_scale_rotation_translation(
            Vec3::splat(2.0),
            Quat::IDENTITY,
            [1.0, 0.0, 0.0].into(),
        );
        let viewer = Affine3A::from_translation([5.0, 2.0, 0.0].into());

        let (position, _) = stage_from_viewer(&frame, &viewer);
        assert_relative_eq!(position, Vec3::new(2.0, 1.0, 0.0), epsilon = 1e-6);
    }

    #[test]
    pub fn test_sends_every_tick() {
        let mut broadcaster = PoseBroadcaster::new();
        let mut sink = RecordingSink::default();

        for _ in 0..3 {
            broadcaster.tick(&Affine3A::IDENTITY, &Affine3A::IDENTITY, &mut sink);
        }

        assert_eq!(sink.sent.len(), 3);
        assert_eq!(broadcaster.sent(), 3);
        let (position, rotation) = broadcaster.last_sent().unwrap();
        assert_relative_eq!(position, Vec3::ZERO);
        assert_relative_eq!(rotation, Quat::IDENTITY);
    }

    #[test]
    pub fn test_broadcast_head_pose_system() {
        let mut world = World::new();
        let mut broadcaster = PoseBroadcaster::new();
        let mut sink = RecordingSink::default();

        // No stage and no HMD: both sit at the origin.
        broadcast_head_pose_system(&mut world, &mut broadcaster, &mut sink);
        assert_eq!(sink.sent.len(), 1);
        assert_relative_eq!(sink.sent[0].0, Vec3::ZERO);
        assert_relative_eq!(sink.sent[0].1, Quat::IDENTITY);

        world.spawn((
            Stage {},
            GlobalTransform(Affine3A::from_translation([0.0, 0.0, -2.0].into())),
        ));
        world.spawn((
            HMD {},
            GlobalTransform(Affine3A::from_translation([0.0, 1.5, -2.0].into())),
        ));
        broadcast_head_pose_system(&mut world, &mut broadcaster, &mut sink);

        let (position, _) = sink.sent[1];
        assert_relative_eq!(position, Vec3::new(0.0, 1.5, 0.0));
        assert_eq!(broadcaster.sent(), 2);
    }
}
