//! NPC request frame (header + body), grounded on `npc/request.go`.

use std::io::{Read, Write};

use rand::RngCore;

use crate::error::Result;
use crate::npc::header::Header;

#[derive(Debug, Clone)]
pub struct Request {
    pub header: Header,
    pub body: Vec<u8>,
    /// Set by the server on read; empty on requests a client is about to send.
    pub remote_addr: String,
}

impl Request {
    /// Build a request carrying `body`, with a fresh random `log_id` and the correct magic
    /// number/length already filled in.
    pub fn new(body: Vec<u8>) -> Self {
        let mut header = Header::new(body.len() as u32);
        header.log_id = rand::thread_rng().next_u32();
        Request { header, body, remote_addr: String::new() }
    }

    pub fn write_to(&self, w: &mut impl Write) -> Result<()> {
        self.header.write_to(w)?;
        w.write_all(&self.body)?;
        Ok(())
    }

    pub fn read_from(r: &mut impl Read) -> Result<Self> {
        let header = Header::read_from(r)?;
        header.check_magic()?;
        let mut body = vec![0u8; header.body_len as usize];
        r.read_exact(&mut body)?;
        Ok(Request { header, body, remote_addr: String::new() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_roundtrips_through_a_buffer() {
        let req = Request::new(b"hello".to_vec());
        let mut buf = Vec::new();
        req.write_to(&mut buf).unwrap();

        let mut cursor = &buf[..];
        let back = Request::read_from(&mut cursor).unwrap();
        assert_eq!(back.body, b"hello");
        assert_eq!(back.header.magic_num, req.header.magic_num);
    }
}
