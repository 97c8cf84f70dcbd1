use std::{cell::RefCell, rc::Rc, thread};

use approx::assert_relative_eq;
use copresence::{
    components::{GlobalTransform, LocalTransform},
    contexts::{head_transform_frame, HeadTransformSink},
    glam::{Affine3A, Quat, Vec3},
    protocol::{Frame, HeadTransform, MessageType},
    CopresenceConfig, CopresenceError, EngineBuilder, RotationPolicy, SessionEvent,
};

/// Writes every outbound pose onto a shared byte stream, the way a real transport would.
#[derive(Default, Clone)]
struct LoopbackSink {
    user_id: i64,
    wire: Rc<RefCell<Vec<u8>>>,
}

impl HeadTransformSink for LoopbackSink {
    fn send_head_transform(&mut self, position: Vec3, rotation: Quat) {
        let frame = head_transform_frame(self.user_id, position, rotation);
        frame.write_to(&mut *self.wire.borrow_mut()).unwrap();
    }
}

#[test]
fn test_two_participants_see_each_other() {
    // Two engines in different places share a session. Each one's broadcast is the other's input.
    let mut alice = EngineBuilder::new().build().unwrap();
    let mut bob = EngineBuilder::new().build().unwrap();
    let mut alice_sink = LoopbackSink {
        user_id: 1,
        ..Default::default()
    };

    alice.apply_session_event(SessionEvent::LocalUser(1)).unwrap();
    bob.apply_session_event(SessionEvent::LocalUser(2)).unwrap();
    bob.apply_session_event(SessionEvent::Joined(1)).unwrap();

    // Alice's stage sits somewhere else in her world; the pose on the wire is stage relative.
    let global_from_stage =
        Affine3A::from_rotation_translation(Quat::from_rotation_y(1.0), [4.0, 0.0, 4.0].into());
    alice.set_stage_transform(&global_from_stage).unwrap();
    alice
        .set_viewer_pose(Vec3::new(0.25, 1.7, -1.0), Quat::from_rotation_y(0.5))
        .unwrap();
    alice.update(&mut alice_sink);

    let bytes = alice_sink.wire.borrow().clone();
    let frame = Frame::read_from(&mut bytes.as_slice()).unwrap();
    assert_eq!(frame.message_type, MessageType::HeadTransform);

    let head_transform = HeadTransform::decode(&frame.payload).unwrap();
    assert_eq!(head_transform.user_id, 1);

    // Bob applies it on his own update thread, fed from the transport's thread.
    let session = bob.session_events();
    thread::spawn(move || session.send(SessionEvent::Message(frame)).unwrap())
        .join()
        .unwrap();
    let tick_data = bob.update(&mut |_: Vec3, _: Quat| {});
    assert_eq!(tick_data.events_applied, 1);
    assert_eq!(tick_data.remote_heads, 1);

    let entry = bob.registry.get(1).unwrap();
    assert_relative_eq!(entry.local_position, Vec3::new(0.25, 1.7, -1.0), epsilon = 1e-5);
    assert_relative_eq!(
        entry.local_rotation.dot(Quat::from_rotation_y(0.5)).abs(),
        1.0,
        epsilon = 1e-5
    );

    // Bob's stage is at his origin, so Alice's head sits at the same stage relative spot.
    let entity = *entry.placeholder();
    let global_transform = bob.world.get::<&GlobalTransform>(entity).unwrap();
    let local_transform = bob.world.get::<&LocalTransform>(entity).unwrap();
    assert_relative_eq!(global_transform.0, local_transform.to_affine(), epsilon = 1e-5);
}

#[test]
fn test_join_update_leave() {
    let mut engine = EngineBuilder::new().build().unwrap();
    let mut sink = |_: Vec3, _: Quat| {};

    engine.apply_session_event(SessionEvent::Joined(5)).unwrap();
    let entity = *engine.registry.get(5).unwrap().placeholder();
    for i in 0..10 {
        let frame = head_transform_frame(5, Vec3::new(i as f32, 0.0, 0.0), Quat::IDENTITY);
        engine.queue_session_event(SessionEvent::Message(frame)).unwrap();
    }
    engine.queue_session_event(SessionEvent::Left(5)).unwrap();
    let tick_data = engine.update(&mut sink);

    assert_eq!(tick_data.events_applied, 11);
    assert!(!engine.registry.contains(5));
    assert!(!engine.world.contains(entity));

    // Leaving twice is reported, and nothing else changes.
    assert!(matches!(
        engine.apply_session_event(SessionEvent::Left(5)),
        Err(CopresenceError::UnknownParticipant(5))
    ));
}

#[test]
fn test_rejecting_non_unit_rotations() {
    let config = CopresenceConfig {
        rotation_policy: RotationPolicy::Reject,
        ..Default::default()
    };
    let mut engine = EngineBuilder::new().config(config).build().unwrap();

    let frame = head_transform_frame(3, Vec3::ZERO, Quat::from_xyzw(0.0, 0.0, 0.0, 2.0));
    assert!(matches!(
        engine.apply_session_event(SessionEvent::Message(frame)),
        Err(CopresenceError::NonUnitRotation { user_id: 3, .. })
    ));
    assert!(engine.registry.is_empty());
}
