use copresence_protocol::{ProtocolError, UserId};
use thiserror::Error;

/// Everything that can go wrong while handling session traffic
#[derive(Error, Debug)]
pub enum CopresenceError {
    /// A participant left without ever being registered
    #[error("Participant {0} is not in the registry")]
    UnknownParticipant(UserId),
    /// A message could not be decoded
    #[error("Unable to decode a message: {0}")]
    Decode(#[from] ProtocolError),
    /// A pose update carried a rotation that failed the configured [`crate::config::RotationPolicy`]
    #[error("Participant {user_id} sent a rotation of length {length}, expected a unit quaternion")]
    NonUnitRotation {
        /// Who sent it
        user_id: UserId,
        /// Length of the offending quaternion
        length: f32,
    },
    /// The configuration was rejected
    #[error("Invalid configuration: {0}")]
    Config(String),
    /// IO error
    #[error(transparent)]
    IO(#[from] std::io::Error),
    /// Anything else
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
