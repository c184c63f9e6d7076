//! Little-endian payload cursor and writer.

use crate::error::DatagramError;
use byteorder::{ByteOrder, LittleEndian};

/// Strip leading and trailing NUL bytes.
pub fn strip_nuls(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|&b| b != 0).map_or(start, |i| i + 1);
    &bytes[start..end]
}

/// Latin-1 bytes to text. Every byte maps to the code point of the same value.
pub fn latin1_decode(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Text to Latin-1 bytes. Characters above U+00FF become `?`.
pub fn latin1_encode(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| if (c as u32) <= 0xFF { c as u8 } else { b'?' })
        .collect()
}

// ─── Reading ────────────────────────────────────────────────────────────────

pub struct PayloadCursor<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> PayloadCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Fail unless `n` more bytes are available.
    pub fn require(&self, n: usize) -> Result<(), DatagramError> {
        if self.remaining() < n {
            return Err(DatagramError::Truncated {
                offset: self.pos,
                needed: n,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], DatagramError> {
        self.require(n)?;
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub fn skip(&mut self, n: usize) -> Result<(), DatagramError> {
        self.read_bytes(n).map(|_| ())
    }

    /// Everything after the current position.
    pub fn rest(&mut self) -> &'a [u8] {
        let out = &self.buf[self.pos..];
        self.pos = self.buf.len();
        out
    }

    pub fn read_i8(&mut self) -> Result<i8, DatagramError> {
        Ok(self.read_bytes(1)?[0] as i8)
    }

    pub fn read_i16(&mut self) -> Result<i16, DatagramError> {
        Ok(LittleEndian::read_i16(self.read_bytes(2)?))
    }

    pub fn read_u16(&mut self) -> Result<u16, DatagramError> {
        Ok(LittleEndian::read_u16(self.read_bytes(2)?))
    }

    pub fn read_i32(&mut self) -> Result<i32, DatagramError> {
        Ok(LittleEndian::read_i32(self.read_bytes(4)?))
    }

    pub fn read_u32(&mut self) -> Result<u32, DatagramError> {
        Ok(LittleEndian::read_u32(self.read_bytes(4)?))
    }

    pub fn read_f32(&mut self) -> Result<f32, DatagramError> {
        Ok(LittleEndian::read_f32(self.read_bytes(4)?))
    }

    pub fn read_f64(&mut self) -> Result<f64, DatagramError> {
        Ok(LittleEndian::read_f64(self.read_bytes(8)?))
    }

    pub fn read_f32_array<const N: usize>(&mut self) -> Result<[f32; N], DatagramError> {
        let bytes = self.read_bytes(4 * N)?;
        let mut out = [0f32; N];
        LittleEndian::read_f32_into(bytes, &mut out);
        Ok(out)
    }

    pub fn read_i16_vec(&mut self, n: usize) -> Result<Vec<i16>, DatagramError> {
        let bytes = self.read_bytes(2 * n)?;
        let mut out = vec![0i16; n];
        LittleEndian::read_i16_into(bytes, &mut out);
        Ok(out)
    }

    pub fn read_u16_vec(&mut self, n: usize) -> Result<Vec<u16>, DatagramError> {
        let bytes = self.read_bytes(2 * n)?;
        let mut out = vec![0u16; n];
        LittleEndian::read_u16_into(bytes, &mut out);
        Ok(out)
    }

    pub fn read_f32_vec(&mut self, n: usize) -> Result<Vec<f32>, DatagramError> {
        let bytes = self.read_bytes(4 * n)?;
        let mut out = vec![0f32; n];
        LittleEndian::read_f32_into(bytes, &mut out);
        Ok(out)
    }

    pub fn read_f64_vec(&mut self, n: usize) -> Result<Vec<f64>, DatagramError> {
        let bytes = self.read_bytes(8 * n)?;
        let mut out = vec![0f64; n];
        LittleEndian::read_f64_into(bytes, &mut out);
        Ok(out)
    }

    /// Fixed-width NUL-padded Latin-1 text field.
    pub fn read_text(&mut self, width: usize) -> Result<String, DatagramError> {
        Ok(latin1_decode(strip_nuls(self.read_bytes(width)?)))
    }

    /// Fixed-width field kept as raw bytes with NUL padding removed.
    pub fn read_spare(&mut self, width: usize) -> Result<Vec<u8>, DatagramError> {
        Ok(strip_nuls(self.read_bytes(width)?).to_vec())
    }
}

// ─── Writing ────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct PayloadWriter {
    buf: Vec<u8>,
}

impl PayloadWriter {
    pub fn with_capacity(n: usize) -> Self {
        Self {
            buf: Vec::with_capacity(n),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    pub fn put_bytes(&mut self, b: &[u8]) {
        self.buf.extend_from_slice(b);
    }

    pub fn put_i8(&mut self, v: i8) {
        self.buf.push(v as u8);
    }

    pub fn put_i16(&mut self, v: i16) {
        let mut b = [0u8; 2];
        LittleEndian::write_i16(&mut b, v);
        self.put_bytes(&b);
    }

    pub fn put_u16(&mut self, v: u16) {
        let mut b = [0u8; 2];
        LittleEndian::write_u16(&mut b, v);
        self.put_bytes(&b);
    }

    pub fn put_i32(&mut self, v: i32) {
        let mut b = [0u8; 4];
        LittleEndian::write_i32(&mut b, v);
        self.put_bytes(&b);
    }

    pub fn put_u32(&mut self, v: u32) {
        let mut b = [0u8; 4];
        LittleEndian::write_u32(&mut b, v);
        self.put_bytes(&b);
    }

    pub fn put_f32(&mut self, v: f32) {
        let mut b = [0u8; 4];
        LittleEndian::write_f32(&mut b, v);
        self.put_bytes(&b);
    }

    pub fn put_f64(&mut self, v: f64) {
        let mut b = [0u8; 8];
        LittleEndian::write_f64(&mut b, v);
        self.put_bytes(&b);
    }

    pub fn put_f32_slice(&mut self, v: &[f32]) {
        for &x in v {
            self.put_f32(x);
        }
    }

    /// Bytes truncated or NUL-padded to exactly `width`.
    pub fn put_fixed(&mut self, bytes: &[u8], width: usize) {
        let n = bytes.len().min(width);
        self.put_bytes(&bytes[..n]);
        self.buf.resize(self.buf.len() + width - n, 0);
    }

    pub fn put_text(&mut self, text: &str, width: usize) {
        self.put_fixed(&latin1_encode(text), width);
    }

    /// NUL-terminated Latin-1 text padded with NULs to a 4-byte multiple.
    pub fn put_terminated_text(&mut self, text: &str) {
        let mut bytes = latin1_encode(text);
        if bytes.last() != Some(&0) {
            bytes.push(0);
        }
        self.put_word_padded(&bytes);
    }

    /// Bytes followed by NULs up to the next 4-byte multiple.
    pub fn put_word_padded(&mut self, bytes: &[u8]) {
        self.put_bytes(bytes);
        let pad = (4 - bytes.len() % 4) % 4;
        self.buf.resize(self.buf.len() + pad, 0);
    }
}
