//! Protocol Module
//!
//! Defines the wire protocol between backend clients and the backend server.
//!
//! ## Protocol Format (V1 - Simple Binary)
//!
//! ### Request Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Commands
//! - 0x01: GET      - Payload: key_len (4) + key
//! - 0x02: SET      - Payload: key_len (4) + key + value
//! - 0x03: INCR     - Payload: key_len (4) + key
//! - 0x04: SADD     - Payload: key_len (4) + key + member
//! - 0x05: SREM     - Payload: key_len (4) + key + member
//! - 0x06: SMEMBERS - Payload: key_len (4) + key
//! - 0x07: PING     - Payload: empty
//! - 0x08: AUTH     - Payload: password_len (4) + password
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Status Codes
//! - 0x00: OK
//! - 0x01: NOT_FOUND
//! - 0x02: ERROR
//! - 0x03: UNAUTHORIZED

mod command;
mod response;
mod codec;

pub use command::{Command, CommandType};
pub use response::{Response, Status};
pub use codec::{
    decode_command, decode_flag, decode_integer, decode_members, decode_response,
    encode_command, encode_members, encode_response, read_command, read_response,
    write_command, write_response, HEADER_SIZE, MAX_PAYLOAD_SIZE,
};
