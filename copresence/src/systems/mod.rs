#![allow(missing_docs)]
pub mod broadcast_head_pose;
pub mod stage;
pub mod update_global_transform;
pub mod update_global_transform_with_parent;

pub use broadcast_head_pose::{broadcast_head_pose_system, stage_from_viewer, PoseBroadcaster};
pub use update_global_transform::update_global_transform_system;
pub use update_global_transform_with_parent::update_global_transform_with_parent_system;
