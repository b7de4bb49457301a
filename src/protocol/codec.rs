//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol.
//!
//! ## Wire Format
//!
//! ### Request (Command) Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Cmd (1)  │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Payload by Command Type
//! - GET, INCR, SMEMBERS, AUTH: key_len (4 bytes) + key
//! - SET:                       key_len (4 bytes) + key + value
//! - SADD, SREM:                key_len (4 bytes) + key + member
//! - PING:                      empty
//!
//! ### Response Format
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │Status(1) │ Len (4)  │         Payload             │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! ### Member List Payload (SMEMBERS)
//! count (4) followed by member_len (4) + member for each member

use std::io::{Read, Write};

use crate::error::{MetaError, Result};

use super::{Command, CommandType, Response, Status};

/// Header size: 1 byte command/status + 4 bytes length
pub const HEADER_SIZE: usize = 5;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Command Encoding/Decoding
// =============================================================================

/// Encode a command to bytes
///
/// Format: cmd_type (1) + payload_len (4) + payload
pub fn encode_command(command: &Command) -> Vec<u8> {
    let payload = match command {
        Command::Get { key } | Command::Incr { key } | Command::SMembers { key } => {
            keyed_payload(key, &[])
        }
        Command::Auth { password } => keyed_payload(password, &[]),
        Command::Set { key, value } => keyed_payload(key, value),
        Command::SAdd { key, member } | Command::SRem { key, member } => {
            keyed_payload(key, member)
        }
        Command::Ping => Vec::new(),
    };

    frame(command.command_type() as u8, &payload)
}

/// Decode a command from bytes
pub fn decode_command(bytes: &[u8]) -> Result<Command> {
    let (cmd_type, payload) = split_frame(bytes, "command")?;

    let command = match cmd_type {
        x if x == CommandType::Get as u8 => Command::Get {
            key: single_operand("GET", payload)?,
        },
        x if x == CommandType::Set as u8 => {
            let (key, value) = split_operands("SET", payload)?;
            Command::Set { key, value }
        }
        x if x == CommandType::Incr as u8 => Command::Incr {
            key: single_operand("INCR", payload)?,
        },
        x if x == CommandType::SAdd as u8 => {
            let (key, member) = split_operands("SADD", payload)?;
            Command::SAdd { key, member }
        }
        x if x == CommandType::SRem as u8 => {
            let (key, member) = split_operands("SREM", payload)?;
            Command::SRem { key, member }
        }
        x if x == CommandType::SMembers as u8 => Command::SMembers {
            key: single_operand("SMEMBERS", payload)?,
        },
        x if x == CommandType::Ping as u8 => {
            if !payload.is_empty() {
                return Err(MetaError::Protocol(format!(
                    "PING command: unexpected payload of {} bytes",
                    payload.len()
                )));
            }
            Command::Ping
        }
        x if x == CommandType::Auth as u8 => Command::Auth {
            password: single_operand("AUTH", payload)?,
        },
        _ => {
            return Err(MetaError::Protocol(format!(
                "Unknown command type: 0x{:02x}",
                cmd_type
            )))
        }
    };

    Ok(command)
}

/// Build `key_len (4) + key + rest`
fn keyed_payload(key: &[u8], rest: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(4 + key.len() + rest.len());
    payload.extend_from_slice(&(key.len() as u32).to_be_bytes());
    payload.extend_from_slice(key);
    payload.extend_from_slice(rest);
    payload
}

/// Split `key_len (4) + key + rest` into (key, rest)
fn split_operands(name: &str, payload: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
    if payload.len() < 4 {
        return Err(MetaError::Protocol(format!(
            "{} command: missing key length",
            name
        )));
    }

    let key_len = read_u32(&payload[0..4]) as usize;

    if payload.len() < 4 + key_len {
        return Err(MetaError::Protocol(format!(
            "{} command: incomplete key (expected {}, got {})",
            name,
            key_len,
            payload.len() - 4
        )));
    }

    Ok((
        payload[4..4 + key_len].to_vec(),
        payload[4 + key_len..].to_vec(),
    ))
}

/// Decode a payload that carries exactly one length-prefixed operand
fn single_operand(name: &str, payload: &[u8]) -> Result<Vec<u8>> {
    let (key, rest) = split_operands(name, payload)?;
    if !rest.is_empty() {
        return Err(MetaError::Protocol(format!(
            "{} command: {} trailing bytes",
            name,
            rest.len()
        )));
    }
    Ok(key)
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response to bytes
///
/// Format: status (1) + payload_len (4) + payload
pub fn encode_response(response: &Response) -> Vec<u8> {
    let payload = response.payload.as_deref().unwrap_or(&[]);
    frame(response.status as u8, payload)
}

/// Decode a response from bytes
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    let (status_byte, payload) = split_frame(bytes, "response")?;

    let status = match status_byte {
        0x00 => Status::Ok,
        0x01 => Status::NotFound,
        0x02 => Status::Error,
        0x03 => Status::Unauthorized,
        _ => {
            return Err(MetaError::Protocol(format!(
                "Unknown response status: 0x{:02x}",
                status_byte
            )))
        }
    };

    let payload = if payload.is_empty() {
        None
    } else {
        Some(payload.to_vec())
    };

    Ok(Response { status, payload })
}

// =============================================================================
// Payload helpers
// =============================================================================

/// Encode a member list payload
pub fn encode_members(members: &[Vec<u8>]) -> Vec<u8> {
    let total: usize = members.iter().map(|m| 4 + m.len()).sum();
    let mut payload = Vec::with_capacity(4 + total);
    payload.extend_from_slice(&(members.len() as u32).to_be_bytes());
    for member in members {
        payload.extend_from_slice(&(member.len() as u32).to_be_bytes());
        payload.extend_from_slice(member);
    }
    payload
}

/// Decode a member list payload (an absent payload is an empty list)
pub fn decode_members(payload: Option<&[u8]>) -> Result<Vec<Vec<u8>>> {
    let payload = match payload {
        Some(p) => p,
        None => return Ok(Vec::new()),
    };
    if payload.len() < 4 {
        return Err(MetaError::Protocol("member list: missing count".to_string()));
    }

    let count = read_u32(&payload[0..4]) as usize;
    let mut members = Vec::with_capacity(count.min(payload.len() / 4));
    let mut pos = 4;
    for _ in 0..count {
        if pos + 4 > payload.len() {
            return Err(MetaError::Protocol("member list: truncated length".to_string()));
        }
        let len = read_u32(&payload[pos..pos + 4]) as usize;
        pos += 4;
        if pos + len > payload.len() {
            return Err(MetaError::Protocol("member list: truncated member".to_string()));
        }
        members.push(payload[pos..pos + len].to_vec());
        pos += len;
    }

    if pos != payload.len() {
        return Err(MetaError::Protocol(format!(
            "member list: {} trailing bytes",
            payload.len() - pos
        )));
    }
    Ok(members)
}

/// Decode a big-endian u64 payload
pub fn decode_integer(payload: Option<&[u8]>) -> Result<u64> {
    match payload {
        Some(p) if p.len() == 8 => {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(p);
            Ok(u64::from_be_bytes(buf))
        }
        _ => Err(MetaError::Protocol(
            "integer reply: expected 8 bytes".to_string(),
        )),
    }
}

/// Decode a single-byte flag payload
pub fn decode_flag(payload: Option<&[u8]>) -> Result<bool> {
    match payload {
        Some([0]) => Ok(false),
        Some([1]) => Ok(true),
        _ => Err(MetaError::Protocol("flag reply: expected 1 byte".to_string())),
    }
}

// =============================================================================
// Framing
// =============================================================================

fn frame(kind: u8, payload: &[u8]) -> Vec<u8> {
    let mut message = Vec::with_capacity(HEADER_SIZE + payload.len());
    message.push(kind);
    message.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    message.extend_from_slice(payload);
    message
}

/// Validate a frame and return (kind byte, payload)
fn split_frame<'a>(bytes: &'a [u8], what: &str) -> Result<(u8, &'a [u8])> {
    if bytes.len() < HEADER_SIZE {
        return Err(MetaError::Protocol(format!(
            "Incomplete {} header: expected {} bytes, got {}",
            what,
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let payload_len = read_u32(&bytes[1..5]) as usize;
    check_payload_len(payload_len)?;

    let total_len = HEADER_SIZE + payload_len;
    if bytes.len() < total_len {
        return Err(MetaError::Protocol(format!(
            "Incomplete {} payload: expected {} bytes, got {}",
            what,
            total_len,
            bytes.len()
        )));
    }

    Ok((bytes[0], &bytes[HEADER_SIZE..total_len]))
}

fn check_payload_len(payload_len: usize) -> Result<()> {
    if payload_len > MAX_PAYLOAD_SIZE as usize {
        return Err(MetaError::Protocol(format!(
            "Payload too large: {} bytes (max {})",
            payload_len, MAX_PAYLOAD_SIZE
        )));
    }
    Ok(())
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

// =============================================================================
// Stream-based I/O helpers
// =============================================================================

/// Read one raw frame (header + payload) from a stream
fn read_frame<R: Read>(reader: &mut R) -> Result<Vec<u8>> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let payload_len = read_u32(&header[1..5]) as usize;
    check_payload_len(payload_len)?;

    let mut message = vec![0u8; HEADER_SIZE + payload_len];
    message[..HEADER_SIZE].copy_from_slice(&header);
    if payload_len > 0 {
        reader.read_exact(&mut message[HEADER_SIZE..])?;
    }
    Ok(message)
}

/// Read a complete command from a stream
///
/// Blocks until a complete command is received or an error occurs
pub fn read_command<R: Read>(reader: &mut R) -> Result<Command> {
    decode_command(&read_frame(reader)?)
}

/// Write a command to a stream
pub fn write_command<W: Write>(writer: &mut W, command: &Command) -> Result<()> {
    writer.write_all(&encode_command(command))?;
    writer.flush()?;
    Ok(())
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    decode_response(&read_frame(reader)?)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    writer.write_all(&encode_response(response))?;
    writer.flush()?;
    Ok(())
}
