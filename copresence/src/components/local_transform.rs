use glam::{Affine3A, Quat, Vec3};

/// The component's position relative to its [`super::Parent`].
///
/// For a remote head placeholder the parent is the [`super::Stage`], so this is exactly the pose the
/// remote participant sent us. For the [`super::HMD`] it is the headset's pose in stage space.
///
/// If the entity doesn't have a [`super::Parent`], then the global transform is just whatever you've set here.
#[derive(Clone, PartialEq, Debug, Copy)]
pub struct LocalTransform {
    /// The translation of the entity
    pub translation: Vec3,
    /// The rotation of the entity
    pub rotation: Quat,
    /// The non-uniform scale of the entity
    pub scale: Vec3,
}

impl Default for LocalTransform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl LocalTransform {
    /// Convenience function to convert the [`LocalTransform`] into a [`glam::Affine3A`]
    pub fn to_affine(&self) -> Affine3A {
        Affine3A::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}
