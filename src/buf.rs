//! Alignment- and endianness-aware byte cursors used by the value and
//! message codecs.

use crate::error::{Error, ErrorKind, Result};
use crate::ty::Endianness;

/// A cursor over an immutable byte slice, tracking a declared endianness and
/// supporting the alignment skips the wire format requires.
///
/// `start` is the absolute offset of byte 0 of `bytes` from the beginning of
/// the enclosing message; alignment is always computed relative to the start
/// of the message, not the start of whatever sub-slice happens to be handed
/// to a particular reader.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
    start: usize,
    endianness: Endianness,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(bytes: &'a [u8], endianness: Endianness) -> Self {
        Reader {
            bytes,
            pos: 0,
            start: 0,
            endianness,
        }
    }

    pub(crate) fn with_start(bytes: &'a [u8], start: usize, endianness: Endianness) -> Self {
        Reader {
            bytes,
            pos: 0,
            start,
            endianness,
        }
    }

    pub(crate) fn endianness(&self) -> Endianness {
        self.endianness
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn absolute_position(&self) -> usize {
        self.start + self.pos
    }

    pub(crate) fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub(crate) fn set_position(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// Skip to the next multiple of `alignment` relative to the start of the
    /// enclosing message.
    pub(crate) fn align(&mut self, alignment: usize) -> Result<()> {
        let absolute = self.start + self.pos;
        let padding = padding_for(absolute, alignment);
        self.advance(padding)
    }

    pub(crate) fn advance(&mut self, n: usize) -> Result<()> {
        if n > self.remaining() {
            return Err(Error::new(ErrorKind::InvalidHeader("buffer underflow")));
        }

        self.pos += n;
        Ok(())
    }

    pub(crate) fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            return Err(Error::new(ErrorKind::InvalidHeader("buffer underflow")));
        }

        let out = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16> {
        let bytes: [u8; 2] = self.read_bytes(2)?.try_into().unwrap();
        Ok(match self.endianness {
            Endianness::Little => u16::from_le_bytes(bytes),
            Endianness::Big => u16::from_be_bytes(bytes),
        })
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32> {
        let bytes: [u8; 4] = self.read_bytes(4)?.try_into().unwrap();
        Ok(match self.endianness {
            Endianness::Little => u32::from_le_bytes(bytes),
            Endianness::Big => u32::from_be_bytes(bytes),
        })
    }

    pub(crate) fn read_u64(&mut self) -> Result<u64> {
        let bytes: [u8; 8] = self.read_bytes(8)?.try_into().unwrap();
        Ok(match self.endianness {
            Endianness::Little => u64::from_le_bytes(bytes),
            Endianness::Big => u64::from_be_bytes(bytes),
        })
    }

    pub(crate) fn read_i16(&mut self) -> Result<i16> {
        Ok(self.read_u16()? as i16)
    }

    pub(crate) fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_u32()? as i32)
    }

    pub(crate) fn read_i64(&mut self) -> Result<i64> {
        Ok(self.read_u64()? as i64)
    }

    pub(crate) fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.read_u64()?))
    }
}

/// An append-only byte buffer tracking a declared endianness, used to build
/// up a message or value on the wire.
///
/// Like [`Reader`], alignment is computed relative to the start of the
/// enclosing message: a [`Writer`] always starts at absolute offset 0,
/// matching §4.3's requirement that encoding start at writer offset 0.
#[derive(Debug)]
pub(crate) struct Writer {
    buf: Vec<u8>,
    endianness: Endianness,
}

impl Writer {
    pub(crate) fn new(endianness: Endianness) -> Self {
        Writer {
            buf: Vec::new(),
            endianness,
        }
    }

    pub(crate) fn endianness(&self) -> Endianness {
        self.endianness
    }

    pub(crate) fn position(&self) -> usize {
        self.buf.len()
    }

    pub(crate) fn into_vec(self) -> Vec<u8> {
        self.buf
    }

    pub(crate) fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    /// Pad with zero bytes until the writer offset is a multiple of `alignment`.
    pub(crate) fn align(&mut self, alignment: usize) {
        let padding = padding_for(self.buf.len(), alignment);
        self.buf.resize(self.buf.len() + padding, 0);
    }

    pub(crate) fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub(crate) fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub(crate) fn write_u16(&mut self, value: u16) {
        let bytes = match self.endianness {
            Endianness::Little => value.to_le_bytes(),
            Endianness::Big => value.to_be_bytes(),
        };
        self.write_bytes(&bytes);
    }

    pub(crate) fn write_u32(&mut self, value: u32) {
        let bytes = match self.endianness {
            Endianness::Little => value.to_le_bytes(),
            Endianness::Big => value.to_be_bytes(),
        };
        self.write_bytes(&bytes);
    }

    pub(crate) fn write_u64(&mut self, value: u64) {
        let bytes = match self.endianness {
            Endianness::Little => value.to_le_bytes(),
            Endianness::Big => value.to_be_bytes(),
        };
        self.write_bytes(&bytes);
    }

    pub(crate) fn write_i16(&mut self, value: i16) {
        self.write_u16(value as u16);
    }

    pub(crate) fn write_i32(&mut self, value: i32) {
        self.write_u32(value as u32);
    }

    pub(crate) fn write_i64(&mut self, value: i64) {
        self.write_u64(value as u64);
    }

    pub(crate) fn write_f64(&mut self, value: f64) {
        self.write_u64(value.to_bits());
    }

    /// Reserve a `u32` length slot, to be back-patched once the region it
    /// measures has been fully written.
    pub(crate) fn reserve_u32(&mut self) -> usize {
        let at = self.buf.len();
        self.write_u32(0);
        at
    }

    /// Back-patch a previously [`reserve_u32`]'d slot with the final value.
    ///
    /// [`reserve_u32`]: Self::reserve_u32
    pub(crate) fn patch_u32(&mut self, at: usize, value: u32) {
        let bytes = match self.endianness {
            Endianness::Little => value.to_le_bytes(),
            Endianness::Big => value.to_be_bytes(),
        };
        self.buf[at..at + 4].copy_from_slice(&bytes);
    }
}

/// Bytes needed to advance `offset` to the next multiple of `alignment`.
pub(crate) fn padding_for(offset: usize, alignment: usize) -> usize {
    let rem = offset % alignment;

    if rem == 0 { 0 } else { alignment - rem }
}
