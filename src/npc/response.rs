//! NPC response frame (header + body), grounded on `npc/response.go`.

use std::io::{Read, Write};

use crate::error::Result;
use crate::npc::header::Header;

#[derive(Debug, Clone)]
pub struct Response {
    pub header: Header,
    pub body: Vec<u8>,
}

impl Response {
    pub fn new(body: Vec<u8>) -> Self {
        Response { header: Header::new(body.len() as u32), body }
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
        Ok(Response { header, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_roundtrips_through_a_buffer() {
        let resp = Response::new(b"pong".to_vec());
        let mut buf = Vec::new();
        resp.write_to(&mut buf).unwrap();

        let mut cursor = &buf[..];
        let back = Response::read_from(&mut cursor).unwrap();
        assert_eq!(back.body, b"pong");
    }
}
