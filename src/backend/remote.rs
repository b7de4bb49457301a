//! Remote backend
//!
//! Pooled TCP client speaking the wire protocol to `metaengine-server`.
//!
//! ## Retry Policy
//! A command that fails in transport is retried once on a fresh connection
//! when it is idempotent. `INCR` is never retried: the first attempt may have
//! been applied before the connection broke.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::time::Duration;

use crossbeam::channel::{bounded, Receiver, Sender};

use crate::config::Config;
use crate::error::{MetaError, Result};
use crate::protocol::{
    decode_flag, decode_integer, decode_members, read_response, write_command, Command,
    Response, Status, MAX_PAYLOAD_SIZE,
};
use crate::record::RECORD_PREFIX;

use super::Backend;

/// Longest record key: the prefix plus a decimal u64
const MAX_RECORD_KEY_LEN: usize = RECORD_PREFIX.len() + 20;

/// Largest record value a SET frame can carry (key length prefix + key + value)
const MAX_RECORD_VALUE_LEN: usize = MAX_PAYLOAD_SIZE as usize - 4 - MAX_RECORD_KEY_LEN;

/// One authenticated connection to the server
struct ClientConnection {
    reader: BufReader<TcpStream>,
    writer: BufWriter<TcpStream>,
}

impl ClientConnection {
    fn open(addr: &str, password: Option<&str>, read_ms: u64, write_ms: u64) -> Result<Self> {
        let stream = TcpStream::connect(addr)
            .map_err(|e| MetaError::BackendUnavailable(format!("connect {}: {}", addr, e)))?;
        stream.set_nodelay(true)?;
        if read_ms > 0 {
            stream.set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            stream.set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }

        let read_stream = stream.try_clone()?;
        let mut conn = Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(stream),
        };

        if let Some(password) = password {
            let response = conn.call(&Command::Auth {
                password: password.as_bytes().to_vec(),
            })?;
            check_status(response)?;
        }

        Ok(conn)
    }

    fn call(&mut self, command: &Command) -> Result<Response> {
        write_command(&mut self.writer, command)?;
        read_response(&mut self.reader)
    }
}

/// Backend adapter for a remote `metaengine-server`
pub struct RemoteBackend {
    addr: String,
    password: Option<String>,
    read_timeout_ms: u64,
    write_timeout_ms: u64,

    /// Idle connections; checked-out connections are returned only after success
    idle_tx: Sender<ClientConnection>,
    idle_rx: Receiver<ClientConnection>,
}

impl RemoteBackend {
    /// Connect to `host:port` without credentials
    pub fn connect(host: &str, port: u16) -> Result<Self> {
        Self::connect_with_config(&format!("{}:{}", host, port), &Config::default())
    }

    /// Connect to `host:port` and authenticate every connection with `password`
    pub fn connect_with_password(host: &str, port: u16, password: &str) -> Result<Self> {
        let config = Config::builder().password(password).build();
        Self::connect_with_config(&format!("{}:{}", host, port), &config)
    }

    /// Connect using pool size, timeouts and password from `config`
    ///
    /// Opens and pings one connection up front; failure here means the
    /// engine cannot be built.
    pub fn connect_with_config(addr: &str, config: &Config) -> Result<Self> {
        config.validate()?;
        let (idle_tx, idle_rx) = bounded(config.pool_size);
        let backend = Self {
            addr: addr.to_string(),
            password: config.password.clone(),
            read_timeout_ms: config.read_timeout_ms,
            write_timeout_ms: config.write_timeout_ms,
            idle_tx,
            idle_rx,
        };

        backend.ping()?;
        tracing::info!("Connected to backend at {}", backend.addr);
        Ok(backend)
    }

    /// Server address
    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Number of idle pooled connections
    pub fn idle_connections(&self) -> usize {
        self.idle_rx.len()
    }

    fn open_connection(&self) -> Result<ClientConnection> {
        ClientConnection::open(
            &self.addr,
            self.password.as_deref(),
            self.read_timeout_ms,
            self.write_timeout_ms,
        )
    }

    fn checkout(&self) -> Result<ClientConnection> {
        match self.idle_rx.try_recv() {
            Ok(conn) => Ok(conn),
            Err(_) => self.open_connection(),
        }
    }

    /// Return a connection to the pool unless the server reported an error on it
    ///
    /// The server may close the socket right after an error reply.
    fn checkin(&self, conn: ClientConnection, response: &Response) {
        if response.status == Status::Error {
            tracing::debug!("Dropping connection to {} after error reply", self.addr);
            return;
        }
        // pool full: drop the connection
        let _ = self.idle_tx.try_send(conn);
    }

    /// Send a command and return the server's response
    fn call(&self, command: Command) -> Result<Response> {
        let mut conn = self.checkout()?;
        match conn.call(&command) {
            Ok(response) => {
                self.checkin(conn, &response);
                Ok(response)
            }
            Err(e) if e.is_transport() && command.is_idempotent() => {
                tracing::warn!(
                    "{:?} to {} failed ({}), retrying on a new connection",
                    command.command_type(),
                    self.addr,
                    e
                );
                drop(conn);
                let mut conn = self.open_connection()?;
                let response = conn.call(&command).map_err(transport_error)?;
                self.checkin(conn, &response);
                Ok(response)
            }
            Err(e) => Err(transport_error(e)),
        }
    }
}

/// Report transport-level failures as an unavailable backend
fn transport_error(e: MetaError) -> MetaError {
    match e {
        MetaError::Io(io) => MetaError::BackendUnavailable(io.to_string()),
        other => other,
    }
}

/// Turn non-OK statuses into errors, passing OK/NOT_FOUND through
fn check_status(response: Response) -> Result<Response> {
    match response.status {
        Status::Ok | Status::NotFound => Ok(response),
        Status::Unauthorized => Err(MetaError::Unauthorized(response.message())),
        Status::Error => Err(MetaError::BackendUnavailable(format!(
            "server error: {}",
            response.message()
        ))),
    }
}

impl Backend for RemoteBackend {
    fn incr(&self, key: &[u8]) -> Result<u64> {
        let response = check_status(self.call(Command::Incr { key: key.to_vec() })?)?;
        decode_integer(response.payload.as_deref())
    }

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let response = check_status(self.call(Command::Get { key: key.to_vec() })?)?;
        match response.status {
            Status::NotFound => Ok(None),
            _ => Ok(Some(response.payload.unwrap_or_default())),
        }
    }

    fn set(&self, key: &[u8], value: &[u8]) -> Result<()> {
        check_status(self.call(Command::Set {
            key: key.to_vec(),
            value: value.to_vec(),
        })?)?;
        Ok(())
    }

    fn sadd(&self, key: &[u8], member: &[u8]) -> Result<bool> {
        let response = check_status(self.call(Command::SAdd {
            key: key.to_vec(),
            member: member.to_vec(),
        })?)?;
        decode_flag(response.payload.as_deref())
    }

    fn srem(&self, key: &[u8], member: &[u8]) -> Result<bool> {
        let response = check_status(self.call(Command::SRem {
            key: key.to_vec(),
            member: member.to_vec(),
        })?)?;
        decode_flag(response.payload.as_deref())
    }

    fn smembers(&self, key: &[u8]) -> Result<Vec<Vec<u8>>> {
        let response = check_status(self.call(Command::SMembers { key: key.to_vec() })?)?;
        decode_members(response.payload.as_deref())
    }

    fn ping(&self) -> Result<()> {
        let response = check_status(self.call(Command::Ping)?)?;
        match response.payload.as_deref() {
            Some(p) if p == b"PONG" => Ok(()),
            _ => Err(MetaError::Protocol("unexpected PING reply".to_string())),
        }
    }

    fn max_value_len(&self) -> usize {
        MAX_RECORD_VALUE_LEN
    }
}
