//! Server address selection for the client (§4.E, grounded on `npc/selector.go`).

use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::RwLock;

use rand::Rng;

use crate::error::{Error, Result};

/// Chooses which configured server a client should connect to for its next request.
pub trait ServerSelector: Send + Sync {
    fn pick_server(&self) -> Result<SocketAddr>;
}

/// A flat, resolvable list of server addresses, picked from uniformly at random.
#[derive(Default)]
pub struct ServerList {
    addrs: RwLock<Vec<SocketAddr>>,
}

impl ServerList {
    pub fn new() -> Self {
        ServerList { addrs: RwLock::new(Vec::new()) }
    }

    /// Resolve and install a new server set, replacing whatever was configured before.
    pub fn set_servers(&self, servers: &[&str]) -> Result<()> {
        let mut resolved = Vec::with_capacity(servers.len());
        for server in servers {
            let addr = server
                .to_socket_addrs()?
                .next()
                .ok_or_else(|| Error::InvalidDestination(format!("unresolvable server address: {server}")))?;
            resolved.push(addr);
        }
        *self.addrs.write().unwrap() = resolved;
        Ok(())
    }
}

impl ServerSelector for ServerList {
    fn pick_server(&self) -> Result<SocketAddr> {
        let addrs = self.addrs.read().unwrap();
        match addrs.len() {
            0 => Err(Error::InvalidDestination("no server configured or available".into())),
            1 => Ok(addrs[0]),
            n => Ok(addrs[rand::thread_rng().gen_range(0..n)]),
        }
    }
}
