//! Command definitions
//!
//! Represents backend primitives requested by clients.

/// Command types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandType {
    Get = 0x01,
    Set = 0x02,
    Incr = 0x03,
    SAdd = 0x04,
    SRem = 0x05,
    SMembers = 0x06,
    Ping = 0x07,
    Auth = 0x08,
}

/// A parsed command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Get a string value by key
    Get { key: Vec<u8> },

    /// Set a string value
    Set { key: Vec<u8>, value: Vec<u8> },

    /// Atomically increment a counter, returning the new value
    Incr { key: Vec<u8> },

    /// Add a member to a set
    SAdd { key: Vec<u8>, member: Vec<u8> },

    /// Remove a member from a set
    SRem { key: Vec<u8>, member: Vec<u8> },

    /// List the members of a set
    SMembers { key: Vec<u8> },

    /// Ping (health check)
    Ping,

    /// Authenticate the connection
    Auth { password: Vec<u8> },
}

impl Command {
    /// Get the command type
    pub fn command_type(&self) -> CommandType {
        match self {
            Command::Get { .. } => CommandType::Get,
            Command::Set { .. } => CommandType::Set,
            Command::Incr { .. } => CommandType::Incr,
            Command::SAdd { .. } => CommandType::SAdd,
            Command::SRem { .. } => CommandType::SRem,
            Command::SMembers { .. } => CommandType::SMembers,
            Command::Ping => CommandType::Ping,
            Command::Auth { .. } => CommandType::Auth,
        }
    }

    /// Whether sending the command twice has the same effect as sending it once
    ///
    /// Only these may be retried after a transport failure.
    pub fn is_idempotent(&self) -> bool {
        !matches!(self, Command::Incr { .. })
    }
}
