//! The NPC framed transport: a fixed 36-byte header plus body, carried over TCP (§4.E).
//!
//! [`client::Client`] dials servers picked by a [`selector::ServerSelector`] and pools idle
//! connections; [`server::Server`] accepts connections and dispatches each framed request to a
//! [`server::Handler`].

mod client;
mod header;
mod request;
mod response;
mod selector;
mod server;

pub use client::{Client, DEFAULT_TIMEOUT, MAX_IDLE_CONNS_PER_ADDR};
pub use header::{Header, HEADER_SIZE, MAGIC_NUM};
pub use request::Request;
pub use response::Response;
pub use selector::{ServerList, ServerSelector};
pub use server::{CloseNotify, ConnState, Handler, ResponseWriter, Server};
