mod global_transform;
mod hmd;
mod info;
mod local_transform;
mod parent;
mod remote_head;
mod stage;

pub use global_transform::GlobalTransform;
pub use hmd::HMD;
pub use info::Info;
pub use local_transform::LocalTransform;
pub use parent::Parent;
pub use remote_head::RemoteHead;
pub use stage::Stage;
