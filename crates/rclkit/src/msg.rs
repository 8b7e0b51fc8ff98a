// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Message contract and a couple of `std_msgs` types.
//!
//! A message type supplies its opaque [`TypeSupport`] descriptor and its
//! serialized form. The bundled types use CDR little-endian encapsulation
//! (`00 01 00 00` header) so their payloads match what ROS 2 tooling
//! produces for the same messages.

use rclkit_native::TypeSupport;
use thiserror::Error;

/// CDR little-endian encapsulation header.
pub const CDR_LE_HEADER: [u8; 4] = [0x00, 0x01, 0x00, 0x00];

const TYPESUPPORT_C: &str = "rosidl_typesupport_c";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("payload too short: need {needed} bytes, got {got}")]
    Truncated { needed: usize, got: usize },
    #[error("unsupported encapsulation {0:02x?}")]
    Encapsulation([u8; 4]),
    #[error("string is not nul-terminated")]
    MissingTerminator,
    #[error("string is not valid UTF-8")]
    Utf8,
}

/// A message type that can cross a publisher/subscription pair.
pub trait Message: Sized + Send + 'static {
    /// Descriptor passed through to the runtime unmodified.
    fn type_support() -> TypeSupport;

    fn serialize(&self) -> Vec<u8>;

    fn deserialize(bytes: &[u8]) -> Result<Self, DecodeError>;
}

fn body(bytes: &[u8]) -> Result<&[u8], DecodeError> {
    let header: [u8; 4] = bytes
        .get(..4)
        .and_then(|h| h.try_into().ok())
        .ok_or(DecodeError::Truncated {
            needed: 4,
            got: bytes.len(),
        })?;
    if header != CDR_LE_HEADER {
        return Err(DecodeError::Encapsulation(header));
    }
    Ok(&bytes[4..])
}

/// `std_msgs/msg/Bool`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Bool {
    pub data: bool,
}

impl Message for Bool {
    fn type_support() -> TypeSupport {
        TypeSupport::new(TYPESUPPORT_C, "std_msgs/msg/Bool")
    }

    fn serialize(&self) -> Vec<u8> {
        let mut out = CDR_LE_HEADER.to_vec();
        out.push(u8::from(self.data));
        out
    }

    fn deserialize(bytes: &[u8]) -> Result<Self, DecodeError> {
        let body = body(bytes)?;
        let &byte = body.first().ok_or(DecodeError::Truncated {
            needed: 5,
            got: bytes.len(),
        })?;
        Ok(Self { data: byte != 0 })
    }
}

/// `std_msgs/msg/String`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct String {
    pub data: std::string::String,
}

impl String {
    #[must_use]
    pub fn new(data: impl Into<std::string::String>) -> Self {
        Self { data: data.into() }
    }
}

impl Message for String {
    fn type_support() -> TypeSupport {
        TypeSupport::new(TYPESUPPORT_C, "std_msgs/msg/String")
    }

    fn serialize(&self) -> Vec<u8> {
        let bytes = self.data.as_bytes();
        let len = u32::try_from(bytes.len() + 1).unwrap_or(u32::MAX);
        let mut out = Vec::with_capacity(4 + 4 + bytes.len() + 1);
        out.extend_from_slice(&CDR_LE_HEADER);
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(bytes);
        out.push(0);
        out
    }

    fn deserialize(bytes: &[u8]) -> Result<Self, DecodeError> {
        let body = body(bytes)?;
        let len_bytes: [u8; 4] = body
            .get(..4)
            .and_then(|b| b.try_into().ok())
            .ok_or(DecodeError::Truncated {
                needed: 8,
                got: bytes.len(),
            })?;
        let len = u32::from_le_bytes(len_bytes) as usize;
        let text = body.get(4..4 + len).ok_or(DecodeError::Truncated {
            needed: 8 + len,
            got: bytes.len(),
        })?;
        let Some((&0, text)) = text.split_last() else {
            return Err(DecodeError::MissingTerminator);
        };
        let data = std::str::from_utf8(text).map_err(|_| DecodeError::Utf8)?;
        Ok(Self::new(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_wire_layout() {
        let bytes = String::new("hi").serialize();
        assert_eq!(bytes, vec![0, 1, 0, 0, 3, 0, 0, 0, b'h', b'i', 0]);
        assert_eq!(String::deserialize(&bytes), Ok(String::new("hi")));
    }

    #[test]
    fn string_decode_errors() {
        assert!(matches!(
            String::deserialize(&[0, 1]),
            Err(DecodeError::Truncated { .. })
        ));
        assert_eq!(
            String::deserialize(&[0, 0, 0, 0, 1, 0, 0, 0, 0]),
            Err(DecodeError::Encapsulation([0, 0, 0, 0]))
        );
        assert_eq!(
            String::deserialize(&[0, 1, 0, 0, 1, 0, 0, 0, b'x']),
            Err(DecodeError::MissingTerminator)
        );
        assert_eq!(
            String::deserialize(&[0, 1, 0, 0, 0, 0, 0, 0]),
            Err(DecodeError::MissingTerminator)
        );
    }

    #[test]
    fn bool_payload() {
        let bytes = Bool { data: true }.serialize();
        assert_eq!(bytes, vec![0, 1, 0, 0, 1]);
        assert_eq!(Bool::deserialize(&bytes), Ok(Bool { data: true }));
        assert_ne!(Bool::type_support(), String::type_support());
    }
}
