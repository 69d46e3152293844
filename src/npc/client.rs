//! The NPC client: connection dialing, an idle-connection pool, and `do_request` (§4.E,
//! grounded on `npc/client.go`).

use std::collections::HashMap;
use std::net::{SocketAddr, TcpStream};
use std::sync::Mutex;
use std::time::Duration;

use crate::error::Result;
use crate::npc::request::Request;
use crate::npc::response::Response;
use crate::npc::selector::{ServerList, ServerSelector};

/// Read/write deadline applied to a connection if the caller never set [`Client::with_timeout`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(100);

/// Idle connections kept per server address before new returns start being closed instead of
/// pooled.
pub const MAX_IDLE_CONNS_PER_ADDR: usize = 2;

struct PooledConn {
    stream: TcpStream,
    addr: SocketAddr,
}

impl PooledConn {
    fn extend_deadline(&self, timeout: Duration) -> Result<()> {
        self.stream.set_read_timeout(Some(timeout))?;
        self.stream.set_write_timeout(Some(timeout))?;
        Ok(())
    }
}

/// An NPC client over a configured set of servers, with a small per-address idle pool so a
/// steady request stream doesn't pay a fresh TCP handshake each time.
pub struct Client {
    selector: Box<dyn ServerSelector>,
    timeout: Duration,
    idle: Mutex<HashMap<SocketAddr, Vec<PooledConn>>>,
}

impl Client {
    pub fn new(servers: &[&str]) -> Result<Self> {
        let list = ServerList::new();
        list.set_servers(servers)?;
        Ok(Client::from_selector(Box::new(list)))
    }

    pub fn from_selector(selector: Box<dyn ServerSelector>) -> Self {
        Client { selector, timeout: DEFAULT_TIMEOUT, idle: Mutex::new(HashMap::new()) }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn get_conn(&self, addr: SocketAddr) -> Result<PooledConn> {
        if let Some(conn) = self.idle.lock().unwrap().get_mut(&addr).and_then(Vec::pop) {
            conn.extend_deadline(self.timeout)?;
            return Ok(conn);
        }
        let stream = TcpStream::connect_timeout(&addr, self.timeout)?;
        let conn = PooledConn { stream, addr };
        conn.extend_deadline(self.timeout)?;
        Ok(conn)
    }

    fn put_conn(&self, conn: PooledConn) {
        let mut idle = self.idle.lock().unwrap();
        let freelist = idle.entry(conn.addr).or_default();
        if freelist.len() >= MAX_IDLE_CONNS_PER_ADDR {
            return; // conn drops here, closing the socket.
        }
        freelist.push(conn);
    }

    /// Send `body` as a new request to a server picked by the configured selector, and block for
    /// its response. The underlying connection is recycled into the idle pool on success and
    /// dropped (closed) on any I/O or protocol failure, since an errored connection cannot be
    /// trusted to be in a clean framing state.
    pub fn do_request(&self, body: Vec<u8>) -> Result<Response> {
        let addr = self.selector.pick_server()?;
        let mut conn = self.get_conn(addr)?;
        let req = Request::new(body);

        let result = (|| -> Result<Response> {
            req.write_to(&mut conn.stream)?;
            Response::read_from(&mut conn.stream)
        })();

        match result {
            Ok(resp) => {
                self.put_conn(conn);
                Ok(resp)
            }
            Err(e) => Err(e),
        }
    }

    /// Close every pooled idle connection. Does not affect connections currently in flight.
    pub fn close(&self) {
        self.idle.lock().unwrap().clear();
    }
}
