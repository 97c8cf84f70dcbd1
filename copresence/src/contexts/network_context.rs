use copresence_protocol::{Frame, HeadTransform, UserId};
use glam::{Quat, Vec3};

/// The outbound half of the transport.
///
/// Implementations address the update to every other participant in the session and attach the
/// sender's [`UserId`]. Delivery is their problem: a failed send must not be reported back to the
/// caller, who will simply send a fresh pose next tick.
pub trait HeadTransformSink {
    /// Broadcast the local head pose, expressed relative to the stage.
    fn send_head_transform(&mut self, position: Vec3, rotation: Quat);
}

impl<F: FnMut(Vec3, Quat)> HeadTransformSink for F {
    fn send_head_transform(&mut self, position: Vec3, rotation: Quat) {
        self(position, rotation)
    }
}

/// Encode a head pose as the frame other participants expect to receive.
pub fn head_transform_frame(user_id: UserId, position: Vec3, rotation: Quat) -> Frame {
    Frame::head_transform(&HeadTransform {
        user_id,
        position: position.into(),
        rotation: rotation.into(),
    })
}
