#![deny(missing_docs)]

//! Shared presence for mixed reality sessions.
//!
//! Every participant in a session broadcasts the pose of their head, relative to a shared reference
//! frame (the [`components::Stage`]), and draws a simple placeholder for the head of everyone else.
//!
//! The pieces:
//!
//! - [`systems::PoseBroadcaster`] samples the local viewer ([`components::HMD`]) once per tick and
//!   hands its stage space pose to the transport.
//! - [`RemoteHeadRegistry`] tracks remote participants as they join and leave, and applies the pose
//!   updates they send to their placeholders.
//! - [`Engine`] owns the scene, the registry and the broadcaster, and drains [`SessionEvent`]s that
//!   the transport delivers from other threads. **IMPORTANT**: call [`Engine::update`] each tick.

pub use copresence_protocol as protocol;
pub use copresence_protocol::{SessionEvent, UserId};
pub use glam;
pub use hecs;

pub use config::{CopresenceConfig, RotationPolicy};
pub use copresence_error::CopresenceError;
pub use engine::{Engine, EngineBuilder, TickData};
pub use remote_head_registry::{RemoteHeadEntry, RemoteHeadRegistry};

/// Components are data attached to entities in the scene
pub mod components;
/// Configuration, loaded from TOML
pub mod config;
/// Contexts are the seams to the external world: the transport and the renderer
pub mod contexts;
mod copresence_error;
mod engine;
mod remote_head_registry;
/// Systems are functions called each tick to update the scene or talk to the external world
pub mod systems;

/// Copresence result type
pub type CopresenceResult<T> = std::result::Result<T, CopresenceError>;
