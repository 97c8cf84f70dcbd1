use crate::{ProtocolError, ProtocolResult, UserId};

/// Sequential reader over a received payload.
///
/// Fields are pulled one at a time, in the order the sender wrote them. Nothing is tagged or length
/// prefixed, so the caller must know the layout. Reading past the end of the buffer is an error.
#[derive(Debug, Clone)]
pub struct NetworkInMessage<'a> {
    buffer: &'a [u8],
    cursor: usize,
}

impl<'a> NetworkInMessage<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self { buffer, cursor: 0 }
    }

    pub fn read_i64(&mut self, field: &'static str) -> ProtocolResult<i64> {
        Ok(i64::from_be_bytes(self.read_array(field)?))
    }

    pub fn read_f32(&mut self, field: &'static str) -> ProtocolResult<f32> {
        Ok(f32::from_be_bytes(self.read_array(field)?))
    }

    /// Bytes not yet read.
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.cursor
    }

    fn read_array<const N: usize>(&mut self, field: &'static str) -> ProtocolResult<[u8; N]> {
        let remaining = self.remaining();
        if remaining < N {
            return Err(ProtocolError::Truncated {
                field,
                needed: N,
                remaining,
            });
        }

        let mut bytes = [0; N];
        bytes.copy_from_slice(&self.buffer[self.cursor..self.cursor + N]);
        self.cursor += N;
        Ok(bytes)
    }
}

/// Sequential writer, the counterpart of [`NetworkInMessage`].
#[derive(Debug, Clone, Default)]
pub struct NetworkOutMessage {
    buffer: Vec<u8>,
}

impl NetworkOutMessage {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    pub fn write_i64(&mut self, value: i64) -> &mut Self {
        self.buffer.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn write_f32(&mut self, value: f32) -> &mut Self {
        self.buffer.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}

/// The pose of a participant's head, relative to the shared reference frame.
///
/// Layout, big endian, 36 bytes:
///
/// | offset | field |
/// |---|---|
/// | 0 | `user_id: i64` |
/// | 8 | `position.x, position.y, position.z: f32` |
/// | 20 | `rotation.x, rotation.y, rotation.z, rotation.w: f32` |
///
/// The layout is frozen. Changing it is a breaking change for every participant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadTransform {
    pub user_id: UserId,
    pub position: mint::Vector3<f32>,
    pub rotation: mint::Quaternion<f32>,
}

impl HeadTransform {
    pub const ENCODED_LEN: usize = 8 + 7 * 4;

    pub fn decode(payload: &[u8]) -> ProtocolResult<Self> {
        let mut message = NetworkInMessage::new(payload);
        let user_id = message.read_i64("user_id")?;

        let position = mint::Vector3 {
            x: message.read_f32("position.x")?,
            y: message.read_f32("position.y")?,
            z: message.read_f32("position.z")?,
        };

        let x = message.read_f32("rotation.x")?;
        let y = message.read_f32("rotation.y")?;
        let z = message.read_f32("rotation.z")?;
        let w = message.read_f32("rotation.w")?;

        Ok(HeadTransform {
            user_id,
            position,
            rotation: mint::Quaternion {
                v: mint::Vector3 { x, y, z },
                s: w,
            },
        })
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut message = NetworkOutMessage::with_capacity(Self::ENCODED_LEN);
        message
            .write_i64(self.user_id)
            .write_f32(self.position.x)
            .write_f32(self.position.y)
            .write_f32(self.position.z)
            .write_f32(self.rotation.v.x)
            .write_f32(self.rotation.v.y)
            .write_f32(self.rotation.v.z)
            .write_f32(self.rotation.s);
        message.into_bytes()
    }
}
