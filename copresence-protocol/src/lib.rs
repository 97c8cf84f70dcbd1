//! Wire format shared by every participant of a copresence session.
//!
//! Messages travel as frames: a single tag byte identifying the [`MessageType`], a big endian `u32`
//! payload length, then the payload itself. The payload of each message type has a frozen positional
//! layout; see [`message::HeadTransform`] for the only one currently defined.
use std::io::{Read, Write};

use thiserror::Error;

pub mod message;

pub use message::{HeadTransform, NetworkInMessage, NetworkOutMessage};

/// Identifier the session service assigns to each participant. Unique for the lifetime of a session.
pub type UserId = i64;

/// Largest payload a single frame may carry.
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

/// Size of the frame header: one tag byte followed by a `u32` length.
pub const FRAME_HEADER_SIZE: usize = 1 + std::mem::size_of::<u32>();

/// Result type for protocol operations
pub type ProtocolResult<T> = std::result::Result<T, ProtocolError>;

#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("Message truncated while reading {field}: needed {needed} bytes, {remaining} remaining")]
    Truncated {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },
    #[error("Unknown message type tag {0}")]
    UnknownMessageType(u8),
    #[error("Frame of {length} bytes exceeds the maximum of {max} bytes")]
    FrameTooLarge { length: usize, max: usize },
    #[error(transparent)]
    IO(#[from] std::io::Error),
}

/// Tag written as the first byte of every frame.
///
/// Application messages start at 134, the first identifier the session service leaves free for
/// user defined messages.
#[repr(u8)]
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    HeadTransform = 134,
}

impl TryFrom<u8> for MessageType {
    type Error = ProtocolError;

    fn try_from(tag: u8) -> ProtocolResult<Self> {
        match tag {
            134 => Ok(MessageType::HeadTransform),
            unknown => Err(ProtocolError::UnknownMessageType(unknown)),
        }
    }
}

/// A single tagged message as it travels between participants.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub message_type: MessageType,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(message_type: MessageType, payload: Vec<u8>) -> Self {
        Self {
            message_type,
            payload,
        }
    }

    /// Wrap an encoded head transform in a frame.
    pub fn head_transform(head_transform: &HeadTransform) -> Self {
        Self::new(MessageType::HeadTransform, head_transform.encode())
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> ProtocolResult<()> {
        if self.payload.len() > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge {
                length: self.payload.len(),
                max: MAX_FRAME_SIZE,
            });
        }

        // Byte 0 is the tag, bytes 1..5 the payload length as big endian u32
        writer.write_all(&[self.message_type as u8])?;
        writer.write_all(&(self.payload.len() as u32).to_be_bytes())?;
        writer.write_all(&self.payload)?;

        Ok(())
    }

    pub fn read_from<R: Read>(reader: &mut R) -> ProtocolResult<Frame> {
        let mut header = [0; FRAME_HEADER_SIZE];
        reader.read_exact(&mut header)?;

        let message_type = MessageType::try_from(header[0])?;
        let mut length = [0; 4];
        length.copy_from_slice(&header[1..]);
        let length = u32::from_be_bytes(length) as usize;
        if length > MAX_FRAME_SIZE {
            return Err(ProtocolError::FrameTooLarge {
                length,
                max: MAX_FRAME_SIZE,
            });
        }

        let mut payload = vec![0; length];
        reader.read_exact(&mut payload)?;

        Ok(Frame {
            message_type,
            payload,
        })
    }
}

/// Notifications a session delivers to a participant.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The session told us which identifier is ours.
    LocalUser(UserId),
    /// A remote participant joined.
    Joined(UserId),
    /// A remote participant left.
    Left(UserId),
    /// A message arrived from a remote participant.
    Message(Frame),
    /// The session is over; every remote participant is gone.
    Ended,
}
