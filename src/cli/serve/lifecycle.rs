//! Server lifecycle management.

use std::net::{IpAddr, SocketAddr};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use tiny_http::Server;

use crate::log;

/// Maximum number of port binding attempts.
const MAX_PORT_RETRIES: u16 = 10;

/// How long `Workers::join` waits for background threads after shutdown.
const JOIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Bind to the specified interface and port, with automatic port retry.
pub fn bind_with_retry(interface: IpAddr, base_port: u16) -> Result<(Server, SocketAddr)> {
    let mut last_error = None;
    for offset in 0..MAX_PORT_RETRIES {
        let Some(port) = base_port.checked_add(offset) else {
            break;
        };
        let addr = SocketAddr::new(interface, port);

        match Server::http(addr) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                return Ok((server, addr));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(anyhow!(
        "failed to bind {} after {} attempts from port {}: {}",
        interface,
        MAX_PORT_RETRIES,
        base_port,
        last_error.map_or_else(|| "port range exhausted".to_string(), |e| e.to_string())
    ))
}

/// Background threads running beside the HTTP server.
#[derive(Default)]
pub struct Workers {
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl Workers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spawn<F>(&mut self, name: &'static str, work: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        let handle = thread::Builder::new().name(name.to_string()).spawn(work)?;
        self.handles.push((name, handle));
        Ok(())
    }

    /// Join every worker, giving up on those still busy after the timeout.
    ///
    /// A rebuild or archive write in progress is not interrupted.
    pub fn join(self) {
        let deadline = Instant::now() + JOIN_TIMEOUT;
        for (name, handle) in self.handles {
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(20));
            }
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                log!("serve"; "{} still busy, not waiting for it", name);
            }
        }
    }
}
