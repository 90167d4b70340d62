//! Payload opcodes and the byte sink/source they are written through.
//!
//! Integers in the payload use bincode's standard configuration: unsigned
//! values are variable-length, signed values are zigzag encoded first.

use bincode::config;

use crate::error::{ReconstructionFailure, SerializeError};

/// Padding.
pub const NOP: u8 = 0x00;
/// A new object: kind tag, raw body, slot count, then each slot.
pub const NEW_OBJECT: u8 = 0x01;
/// A small integer slot value.
pub const SMI: u8 = 0x02;
/// A common root, by [`RootIndex`](ember_heap::RootIndex) index.
pub const ROOT: u8 = 0x03;
/// An object emitted earlier in this payload, by emission index.
pub const BACK_REF: u8 = 0x04;
/// A shared read-only object, by page and offset.
pub const READ_ONLY_REF: u8 = 0x05;
/// An object supplied by the caller rather than the payload.
pub const ATTACHED_REF: u8 = 0x06;
/// First of the hot-object opcodes; the low three bits select the entry.
pub const HOT_OBJECT: u8 = 0x08;
/// Number of hot-object opcodes.
pub const HOT_OBJECT_COUNT: u8 = 8;

/// Attached reference index of the script source.
pub const SOURCE_ATTACHED_INDEX: u32 = 0;

/// Returns the hot-object entry an opcode selects, if it is a hot-object opcode.
pub fn hot_object_index(opcode: u8) -> Option<usize> {
    (HOT_OBJECT..HOT_OBJECT + HOT_OBJECT_COUNT)
        .contains(&opcode)
        .then(|| (opcode - HOT_OBJECT) as usize)
}

/// Growable payload buffer.
#[derive(Debug, Default)]
pub struct PayloadSink {
    bytes: Vec<u8>,
}

impl PayloadSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one byte.
    pub fn put_u8(&mut self, byte: u8) {
        self.bytes.push(byte);
    }

    /// Appends a variable-length unsigned integer.
    pub fn put_varint(&mut self, value: u32) -> Result<(), SerializeError> {
        bincode::encode_into_std_write(value, &mut self.bytes, config::standard())
            .map(|_| ())
            .map_err(|e| SerializeError::Encoding {
                reason: e.to_string(),
            })
    }

    /// Appends a zigzag-encoded signed integer.
    pub fn put_smi(&mut self, value: i32) -> Result<(), SerializeError> {
        bincode::encode_into_std_write(value, &mut self.bytes, config::standard())
            .map(|_| ())
            .map_err(|e| SerializeError::Encoding {
                reason: e.to_string(),
            })
    }

    /// Appends a length-prefixed byte string.
    pub fn put_raw(&mut self, data: &[u8]) -> Result<(), SerializeError> {
        self.put_varint(data.len() as u32)?;
        self.bytes.extend_from_slice(data);
        Ok(())
    }

    /// Pads with [`NOP`] up to a multiple of `alignment`.
    pub fn pad(&mut self, alignment: usize) {
        while self.bytes.len() % alignment != 0 {
            self.bytes.push(NOP);
        }
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Consumes the sink.
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }
}

/// Cursor over a payload.
#[derive(Debug)]
pub struct PayloadSource<'a> {
    bytes: &'a [u8],
    position: usize,
}

impl<'a> PayloadSource<'a> {
    /// Starts reading at the beginning of `bytes`.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, position: 0 }
    }

    /// Current offset.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Bytes left to read.
    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.position
    }

    /// Returns `true` once every byte has been consumed.
    pub fn at_end(&self) -> bool {
        self.position >= self.bytes.len()
    }

    /// Reads one byte.
    pub fn get_u8(&mut self) -> Result<u8, ReconstructionFailure> {
        let byte = *self
            .bytes
            .get(self.position)
            .ok_or_else(|| self.truncated())?;
        self.position += 1;
        Ok(byte)
    }

    /// Reads a variable-length unsigned integer.
    pub fn get_varint(&mut self) -> Result<u32, ReconstructionFailure> {
        self.decode::<u32>()
    }

    /// Reads a zigzag-encoded signed integer.
    pub fn get_smi(&mut self) -> Result<i32, ReconstructionFailure> {
        self.decode::<i32>()
    }

    /// Reads a length-prefixed byte string.
    pub fn get_raw(&mut self) -> Result<&'a [u8], ReconstructionFailure> {
        let len = self.get_varint()? as usize;
        if len > self.remaining() {
            return Err(self.truncated());
        }
        let data = &self.bytes[self.position..self.position + len];
        self.position += len;
        Ok(data)
    }

    fn decode<T: bincode::Decode<()>>(&mut self) -> Result<T, ReconstructionFailure> {
        let (value, read) =
            bincode::decode_from_slice::<T, _>(&self.bytes[self.position..], config::standard())
                .map_err(|e| ReconstructionFailure::malformed(self.position, e.to_string()))?;
        self.position += read;
        Ok(value)
    }

    fn truncated(&self) -> ReconstructionFailure {
        ReconstructionFailure::malformed(self.position, "unexpected end of payload")
    }
}
