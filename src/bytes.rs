//! Little-endian byte primitives used by the encoder and decoder.
//!
//! Reads never panic on a too-short buffer; they report [`Error::Truncated`] instead, so a
//! corrupt or partial wire buffer is always a decoding failure rather than undefined behavior.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::{Error, Result};

fn need(buf: &[u8], n: usize) -> Result<()> {
    if buf.len() < n {
        Err(Error::Truncated)
    } else {
        Ok(())
    }
}

pub fn read_u8(buf: &[u8]) -> Result<u8> {
    need(buf, 1)?;
    Ok(buf[0])
}

pub fn read_i8(buf: &[u8]) -> Result<i8> {
    Ok(read_u8(buf)? as i8)
}

pub fn read_u16(buf: &[u8]) -> Result<u16> {
    need(buf, 2)?;
    Ok(LittleEndian::read_u16(buf))
}

pub fn read_i16(buf: &[u8]) -> Result<i16> {
    need(buf, 2)?;
    Ok(LittleEndian::read_i16(buf))
}

pub fn read_u32(buf: &[u8]) -> Result<u32> {
    need(buf, 4)?;
    Ok(LittleEndian::read_u32(buf))
}

pub fn read_i32(buf: &[u8]) -> Result<i32> {
    need(buf, 4)?;
    Ok(LittleEndian::read_i32(buf))
}

pub fn read_u64(buf: &[u8]) -> Result<u64> {
    need(buf, 8)?;
    Ok(LittleEndian::read_u64(buf))
}

pub fn read_i64(buf: &[u8]) -> Result<i64> {
    need(buf, 8)?;
    Ok(LittleEndian::read_i64(buf))
}

pub fn read_f32(buf: &[u8]) -> Result<f32> {
    need(buf, 4)?;
    Ok(LittleEndian::read_f32(buf))
}

pub fn read_f64(buf: &[u8]) -> Result<f64> {
    need(buf, 8)?;
    Ok(LittleEndian::read_f64(buf))
}

pub fn write_u8(buf: &mut [u8], v: u8) {
    buf[0] = v;
}

pub fn write_i8(buf: &mut [u8], v: i8) {
    buf[0] = v as u8;
}

pub fn write_u16(buf: &mut [u8], v: u16) {
    LittleEndian::write_u16(buf, v);
}

pub fn write_i16(buf: &mut [u8], v: i16) {
    LittleEndian::write_i16(buf, v);
}

pub fn write_u32(buf: &mut [u8], v: u32) {
    LittleEndian::write_u32(buf, v);
}

pub fn write_i32(buf: &mut [u8], v: i32) {
    LittleEndian::write_i32(buf, v);
}

pub fn write_u64(buf: &mut [u8], v: u64) {
    LittleEndian::write_u64(buf, v);
}

pub fn write_i64(buf: &mut [u8], v: i64) {
    LittleEndian::write_i64(buf, v);
}

pub fn write_f32(buf: &mut [u8], v: f32) {
    LittleEndian::write_f32(buf, v);
}

pub fn write_f64(buf: &mut [u8], v: f64) {
    LittleEndian::write_f64(buf, v);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let mut buf = [0u8; 8];
        write_i64(&mut buf, -42);
        assert_eq!(read_i64(&buf).unwrap(), -42);
        write_u32(&mut buf[..4], 0xdead_beef);
        assert_eq!(read_u32(&buf[..4]).unwrap(), 0xdead_beef);
        write_f64(&mut buf, 1.5);
        assert_eq!(read_f64(&buf).unwrap(), 1.5);
    }

    #[test]
    fn truncated_reads_are_errors() {
        assert!(matches!(read_u32(&[1, 2]), Err(Error::Truncated)));
        assert!(matches!(read_u64(&[]), Err(Error::Truncated)));
    }
}
