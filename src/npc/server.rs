//! The NPC server: accept loop, per-connection thread, and the `Handler`/`ResponseWriter`
//! contract (§4.E / §5, grounded on `npc/server.go`).

use std::fmt;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::error::Result;
use crate::npc::header::Header;
use crate::npc::request::Request;

/// Mirrors the state machine a connection moves through over its lifetime; exposed so a
/// `Server::conn_state` callback can observe it, the way `net/http`'s does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnState {
    New,
    Active,
    Idle,
    Closed,
}

impl fmt::Display for ConnState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            ConnState::New => "new",
            ConnState::Active => "active",
            ConnState::Idle => "idle",
            ConnState::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Implemented by request handlers registered with a [`Server`].
pub trait Handler: Send + Sync {
    fn serve(&self, w: &mut ResponseWriter, req: &Request);
}

impl<F> Handler for F
where
    F: Fn(&mut ResponseWriter, &Request) + Send + Sync,
{
    fn serve(&self, w: &mut ResponseWriter, req: &Request) {
        self(w, req)
    }
}

/// Lets a handler detect that its peer has disconnected mid-request, the way a long-running
/// handler would want to abandon work nobody is waiting for anymore.
pub struct CloseNotify {
    rx: mpsc::Receiver<()>,
}

impl CloseNotify {
    /// Non-blocking: `true` once the peer has gone away.
    pub fn is_closed(&self) -> bool {
        matches!(self.rx.try_recv(), Ok(()) | Err(mpsc::TryRecvError::Disconnected))
    }
}

/// Passed to [`Handler::serve`]; lets the handler set response header fields and write the
/// response body exactly once.
pub struct ResponseWriter {
    stream: TcpStream,
    header: Header,
    wrote: bool,
    client_gone: Arc<AtomicBool>,
}

impl ResponseWriter {
    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    /// Write the response body. May only be called once per request; a second call returns
    /// [`crate::error::Error::WriteAfterResponse`].
    pub fn write(&mut self, data: &[u8]) -> Result<()> {
        if self.wrote {
            return Err(crate::error::Error::WriteAfterResponse);
        }
        self.wrote = true;
        if data.is_empty() {
            return Ok(());
        }
        self.header.body_len = data.len() as u32;
        self.header.write_to(&mut self.stream)?;
        self.stream.write_all(data)?;
        Ok(())
    }

    /// A watcher that fires once this request's peer has disconnected. Spawns a background
    /// thread on first call; cloning the underlying socket so it can poll independently of the
    /// handler's own I/O.
    pub fn close_notify(&self) -> Result<CloseNotify> {
        let (tx, rx) = mpsc::sync_channel(1);
        let mut watch = self.stream.try_clone()?;
        let client_gone = self.client_gone.clone();
        thread::spawn(move || {
            watch.set_read_timeout(Some(Duration::from_millis(50))).ok();
            let mut probe = [0u8; 1];
            loop {
                match watch.read(&mut probe) {
                    Ok(0) => break,
                    Ok(_) => continue, // unexpected extra bytes; peer is still there.
                    Err(e) if e.kind() == std::io::ErrorKind::WouldBlock || e.kind() == std::io::ErrorKind::TimedOut => {
                        continue;
                    }
                    Err(_) => break,
                }
            }
            client_gone.store(true, Ordering::SeqCst);
            let _ = tx.send(());
        });
        Ok(CloseNotify { rx })
    }

    fn finish_request(&mut self) {
        let _ = self.stream.flush();
    }
}

/// A callback notified of a connection's lifecycle transitions: `New` on accept, `Idle` whenever
/// it's blocked waiting for the next request, `Active` once a request has been read and is being
/// handled, `Closed` once the connection is done being served.
pub type ConnStateFn = dyn Fn(&str, ConnState) + Send + Sync;

/// Listens for NPC connections and dispatches each framed request to a [`Handler`].
pub struct Server {
    handler: Arc<dyn Handler>,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
    conn_state: Option<Arc<ConnStateFn>>,
}

impl Server {
    pub fn new(handler: impl Handler + 'static) -> Self {
        Server {
            handler: Arc::new(handler),
            read_timeout: None,
            write_timeout: None,
            conn_state: None,
        }
    }

    pub fn with_read_timeout(mut self, d: Duration) -> Self {
        self.read_timeout = Some(d);
        self
    }

    pub fn with_write_timeout(mut self, d: Duration) -> Self {
        self.write_timeout = Some(d);
        self
    }

    /// Register a callback notified of every connection's `New`/`Active`/`Idle`/`Closed`
    /// transitions, keyed by the connection's remote address.
    pub fn with_conn_state(mut self, f: impl Fn(&str, ConnState) + Send + Sync + 'static) -> Self {
        self.conn_state = Some(Arc::new(f));
        self
    }

    pub fn listen_and_serve(self, addr: &str) -> Result<()> {
        let listener = TcpListener::bind(addr)?;
        self.serve(listener)
    }

    /// Accept connections until the listener errors out. A per-accept failure is retried with
    /// exponentially increasing backoff (5ms doubling up to a 1s cap) rather than aborting the
    /// whole server on one bad accept.
    pub fn serve(self, listener: TcpListener) -> Result<()> {
        let handler = self.handler;
        let read_timeout = self.read_timeout;
        let write_timeout = self.write_timeout;
        let conn_state = self.conn_state;
        let mut backoff = Duration::ZERO;

        for incoming in listener.incoming() {
            match incoming {
                Ok(stream) => {
                    backoff = Duration::ZERO;
                    let handler = handler.clone();
                    let conn_state = conn_state.clone();
                    thread::spawn(move || {
                        serve_conn(stream, handler, read_timeout, write_timeout, conn_state)
                    });
                }
                Err(e) => {
                    backoff = if backoff.is_zero() { Duration::from_millis(5) } else { backoff * 2 };
                    if backoff > Duration::from_secs(1) {
                        backoff = Duration::from_secs(1);
                    }
                    log::warn!("npc: accept error: {e}; retrying in {backoff:?}");
                    thread::sleep(backoff);
                }
            }
        }
        Ok(())
    }
}

fn serve_conn(
    stream: TcpStream,
    handler: Arc<dyn Handler>,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
    conn_state: Option<Arc<ConnStateFn>>,
) {
    let remote_addr = stream.peer_addr().map(|a| a.to_string()).unwrap_or_default();
    if let Some(f) = &conn_state {
        f(&remote_addr, ConnState::New);
    }
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        serve_conn_inner(stream, &handler, &remote_addr, read_timeout, write_timeout, &conn_state)
    }));
    if let Err(payload) = result {
        log::error!("npc: panic serving {remote_addr}: {payload:?}");
    }
    if let Some(f) = &conn_state {
        f(&remote_addr, ConnState::Closed);
    }
}

fn serve_conn_inner(
    mut stream: TcpStream,
    handler: &Arc<dyn Handler>,
    remote_addr: &str,
    read_timeout: Option<Duration>,
    write_timeout: Option<Duration>,
    conn_state: &Option<Arc<ConnStateFn>>,
) {
    loop {
        if let Some(d) = read_timeout {
            if stream.set_read_timeout(Some(d)).is_err() {
                return;
            }
        }
        if let Some(f) = conn_state {
            f(remote_addr, ConnState::Idle);
        }
        let mut req = match Request::read_from(&mut stream) {
            Ok(req) => req,
            Err(_) => return,
        };
        req.remote_addr = remote_addr.to_string();
        if let Some(f) = conn_state {
            f(remote_addr, ConnState::Active);
        }

        if let Some(d) = write_timeout {
            if stream.set_write_timeout(Some(d)).is_err() {
                return;
            }
        }

        let mut response_header = req.header;
        response_header.body_len = 0;
        let writer_stream = match stream.try_clone() {
            Ok(s) => s,
            Err(_) => return,
        };
        let mut w = ResponseWriter {
            stream: writer_stream,
            header: response_header,
            wrote: false,
            client_gone: Arc::new(AtomicBool::new(false)),
        };

        handler.serve(&mut w, &req);
        w.finish_request();
    }
}
