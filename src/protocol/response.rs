//! Response definitions
//!
//! Represents responses to clients.

/// Response status codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    Ok = 0x00,
    NotFound = 0x01,
    Error = 0x02,
    Unauthorized = 0x03,
}

/// A response to send to client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Status code
    pub status: Status,

    /// Optional payload (value, integer, flag, member list or error message)
    pub payload: Option<Vec<u8>>,
}

impl Response {
    /// Create an OK response with optional payload
    pub fn ok(payload: Option<Vec<u8>>) -> Self {
        Self {
            status: Status::Ok,
            payload,
        }
    }

    /// OK response carrying a big-endian u64
    pub fn integer(value: u64) -> Self {
        Self::ok(Some(value.to_be_bytes().to_vec()))
    }

    /// OK response carrying a single 0/1 byte
    pub fn flag(value: bool) -> Self {
        Self::ok(Some(vec![value as u8]))
    }

    /// OK response carrying a member list
    pub fn members(members: &[Vec<u8>]) -> Self {
        Self::ok(Some(super::codec::encode_members(members)))
    }

    /// Create a NOT_FOUND response
    pub fn not_found() -> Self {
        Self {
            status: Status::NotFound,
            payload: None,
        }
    }

    /// Create an ERROR response
    pub fn error(message: &str) -> Self {
        Self {
            status: Status::Error,
            payload: Some(message.as_bytes().to_vec()),
        }
    }

    /// Create an UNAUTHORIZED response
    pub fn unauthorized(message: &str) -> Self {
        Self {
            status: Status::Unauthorized,
            payload: Some(message.as_bytes().to_vec()),
        }
    }

    /// Payload interpreted as a UTF-8 message (for ERROR/UNAUTHORIZED)
    pub fn message(&self) -> String {
        self.payload
            .as_deref()
            .map(|p| String::from_utf8_lossy(p).into_owned())
            .unwrap_or_default()
    }
}
