//! Network Module
//!
//! TCP server hosting a durable store.
//!
//! ## Architecture
//! - Single non-blocking acceptor loop
//! - One thread per connection, bounded by `max_connections`
//! - Commands routed through `Store::execute`
//! - Optional password: clients must AUTH before any other command

mod server;
mod connection;

pub use server::Server;
pub use connection::Connection;
