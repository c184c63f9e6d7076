//! Length framing: `i32 length | payload | i32 length`, little endian.

use crate::error::{FrameError, FramingReason, WriteError};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};

/// One frame's payload and where it started in the stream.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub offset: u64,
    pub payload: Vec<u8>,
}

pub struct FrameReader<R: Read> {
    reader: R,
    pos: u64,
}

impl<R: Read> FrameReader<R> {
    pub fn new(reader: R) -> Self {
        Self { reader, pos: 0 }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> u64 {
        self.pos
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Read up to 4 bytes; `Ok(None)` on a clean end of stream.
    fn read_length(&mut self, allow_eof: bool) -> Result<Option<i32>, FrameError> {
        let mut buf = [0u8; 4];
        let mut got = 0;
        while got < 4 {
            match self.reader.read(&mut buf[got..]) {
                Ok(0) => break,
                Ok(n) => got += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        if got == 0 && allow_eof {
            return Ok(None);
        }
        if got < 4 {
            return Err(FrameError::Framing {
                offset: self.pos,
                reason: FramingReason::PrematureEof {
                    needed: 4,
                    got: got as u64,
                },
            });
        }
        self.pos += 4;
        Ok(Some((&buf[..]).read_i32::<LittleEndian>()?))
    }

    /// Read the next frame. Returns `Ok(None)` at a clean end of stream.
    pub fn read_next(&mut self) -> Result<Option<Frame>, FrameError> {
        let offset = self.pos;
        let leading = match self.read_length(true)? {
            Some(n) => n,
            None => return Ok(None),
        };
        if leading < 0 {
            return Err(FrameError::Framing {
                offset,
                reason: FramingReason::NegativeLength(leading),
            });
        }

        let len = leading as u64;
        let mut payload = Vec::new();
        let got = self.reader.by_ref().take(len).read_to_end(&mut payload)? as u64;
        if got < len {
            return Err(FrameError::Framing {
                offset,
                reason: FramingReason::PrematureEof { needed: len, got },
            });
        }
        self.pos += len;

        let trailing = self.read_length(false)?.unwrap_or_default();
        if trailing != leading {
            return Err(FrameError::Framing {
                offset,
                reason: FramingReason::LengthMismatch { leading, trailing },
            });
        }
        Ok(Some(Frame { offset, payload }))
    }
}

/// Build a complete frame in memory so it is written with a single call.
pub fn frame_bytes(payload: &[u8]) -> Result<Vec<u8>, WriteError> {
    let len = i32::try_from(payload.len()).map_err(|_| WriteError::Oversize(payload.len()))?;
    let mut out = Vec::with_capacity(payload.len() + 8);
    out.write_i32::<LittleEndian>(len)?;
    out.extend_from_slice(payload);
    out.write_i32::<LittleEndian>(len)?;
    Ok(out)
}

pub fn write_frame<W: Write>(writer: &mut W, payload: &[u8]) -> Result<usize, WriteError> {
    let bytes = frame_bytes(payload)?;
    writer.write_all(&bytes)?;
    Ok(bytes.len())
}
