/// A marker component used to indicate the local participant's headset, or Head Mounted Display.
///
/// The entity marked with this component has its [`super::LocalTransform`] updated each tick with the
/// pose of the headset in stage space. Since this entity is parented to the [`super::Stage`] entity,
/// its [`super::GlobalTransform`] then gives the pose of the head in the world.
///
/// This is the pose [`crate::systems::PoseBroadcaster`] sends to everyone else.
#[derive(Debug)]
pub struct HMD {}
