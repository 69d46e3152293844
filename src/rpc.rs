//! A thin request/response RPC convention over the NPC transport (§4.E, grounded on
//! `mcpacknpc/handler.go` and `mcpackrpc/codec.go`).
//!
//! Where the original dispatches to a handler function via reflection over its argument and
//! reply types, [`RpcHandler`] uses ordinary generics: any `Fn(Req) -> Result<Resp>` where `Req`
//! and `Resp` implement [`Decode`]/[`Encode`] becomes an [`npc::Handler`].

use std::marker::PhantomData;

use crate::codec::{marshal, unmarshal, Decode, Encode};
use crate::npc::{self, Request, ResponseWriter};

/// Adapts a plain `Fn(Req) -> mcpackv2::Result<Resp>` into an [`npc::Handler`]: the request body
/// is unmarshaled into `Req`, the function runs, and a successful `Resp` is marshaled back as the
/// response body. A handler error is logged and the connection gets no response body, matching
/// the original's "log and return" behavior on a failed call.
pub struct RpcHandler<Req, Resp, F> {
    func: F,
    _marker: PhantomData<fn(Req) -> Resp>,
}

impl<Req, Resp, F> RpcHandler<Req, Resp, F>
where
    Req: Decode,
    Resp: Encode,
    F: Fn(Req) -> crate::error::Result<Resp> + Send + Sync,
{
    pub fn new(func: F) -> Self {
        RpcHandler { func, _marker: PhantomData }
    }
}

impl<Req, Resp, F> npc::Handler for RpcHandler<Req, Resp, F>
where
    Req: Decode + Send + Sync,
    Resp: Encode + Send + Sync,
    F: Fn(Req) -> crate::error::Result<Resp> + Send + Sync,
{
    fn serve(&self, w: &mut ResponseWriter, req: &Request) {
        let arg: Req = match unmarshal(&req.body) {
            Ok(arg) => arg,
            Err(e) => {
                log::warn!("rpc: decoding request body: {e}");
                return;
            }
        };

        let reply = match (self.func)(arg) {
            Ok(reply) => reply,
            Err(e) => {
                log::warn!("rpc: handler call failed: {e}");
                return;
            }
        };

        let body = match marshal(&reply) {
            Ok(body) => body,
            Err(e) => {
                log::warn!("rpc: encoding response body: {e}");
                return;
            }
        };

        if let Err(e) = w.write(&body) {
            log::warn!("rpc: writing response: {e}");
        }
    }
}

/// Make an RPC call against a connected [`npc::Client`]: marshal `arg`, send it as a request
/// body, and unmarshal the response body as `Resp`.
pub fn call<Req, Resp>(client: &npc::Client, arg: &Req) -> crate::error::Result<Resp>
where
    Req: Encode,
    Resp: Decode,
{
    let body = marshal(arg)?;
    let resp = client.do_request(body)?;
    unmarshal(&resp.body)
}
