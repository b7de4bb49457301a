//! TCP Server
//!
//! Accepts connections and hands each one to its own thread.

use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::Config;
use crate::error::Result;
use crate::protocol::{write_response, Response};
use crate::store::Store;

use super::Connection;

/// How long the accept loop sleeps when no client is waiting
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// TCP server hosting a durable store
pub struct Server {
    config: Config,
    store: Arc<Store>,
    listener: TcpListener,

    /// Set to stop the accept loop
    shutdown: Arc<AtomicBool>,

    /// Connections currently being served
    active: Arc<AtomicUsize>,
}

/// Decrements the active connection count when a handler thread ends
struct ActiveGuard(Arc<AtomicUsize>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl Server {
    /// Bind to `config.listen_addr`
    ///
    /// Port 0 picks a free port; see `local_addr`.
    pub fn bind(config: Config, store: Arc<Store>) -> Result<Self> {
        let listener = TcpListener::bind(&config.listen_addr)?;
        // Non-blocking accept so the loop can observe shutdown
        listener.set_nonblocking(true)?;

        Ok(Self {
            config,
            store,
            listener,
            shutdown: Arc::new(AtomicBool::new(false)),
            active: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Address the listener is bound to
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Flag that stops `run` when set (e.g. from another thread)
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }

    /// Number of connections being served
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Start the server (blocking until shutdown)
    pub fn run(&self) -> Result<()> {
        tracing::info!("Listening on {}", self.local_addr()?);

        while !self.shutdown.load(Ordering::SeqCst) {
            let (stream, peer) = match self.listener.accept() {
                Ok(accepted) => accepted,
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    thread::sleep(ACCEPT_POLL_INTERVAL);
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                    continue;
                }
            };

            if let Err(e) = stream.set_nonblocking(false) {
                tracing::warn!("Dropping connection from {}: {}", peer, e);
                continue;
            }

            if self.active.fetch_add(1, Ordering::SeqCst) >= self.config.max_connections {
                self.active.fetch_sub(1, Ordering::SeqCst);
                tracing::warn!("Connection limit reached, rejecting {}", peer);
                let mut stream = stream;
                let _ = write_response(&mut stream, &Response::error("too many connections"));
                continue;
            }
            let guard = ActiveGuard(Arc::clone(&self.active));

            let store = Arc::clone(&self.store);
            let password = self.config.password.clone();
            let (read_ms, write_ms) = (self.config.read_timeout_ms, self.config.write_timeout_ms);

            thread::spawn(move || {
                let _guard = guard;
                let result = Connection::new(stream, store, password).and_then(|mut conn| {
                    conn.set_timeouts(read_ms, write_ms)?;
                    conn.handle()
                });
                if let Err(e) = result {
                    tracing::debug!("Connection {} closed with error: {}", peer, e);
                }
            });
        }

        tracing::info!("Accept loop stopped");
        Ok(())
    }
}
