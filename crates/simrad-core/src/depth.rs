//! DEP0 (sounder bottom detections) and BOT0 (bottom depth) datagrams.

use crate::cursor::{PayloadCursor, PayloadWriter};
use crate::datagram::PayloadBody;
use crate::error::DatagramError;

fn read_transceiver_count(cur: &mut PayloadCursor<'_>) -> Result<usize, DatagramError> {
    let n = cur.read_u32()?;
    Ok(n as usize)
}

/// One transceiver's detection in a DEP0 datagram.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DepthEntry {
    pub depth: f32,
    pub reflectivity: f32,
    pub unused: f32,
}

/// DEP0: one entry per transceiver, in slot order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DepthDetections {
    pub entries: Vec<DepthEntry>,
}

impl PayloadBody for DepthDetections {
    fn decode_body(cur: &mut PayloadCursor<'_>) -> Result<Self, DatagramError> {
        let n = read_transceiver_count(cur)?;
        cur.require(12 * n)?;
        let mut entries = Vec::with_capacity(n);
        for _ in 0..n {
            entries.push(DepthEntry {
                depth: cur.read_f32()?,
                reflectivity: cur.read_f32()?,
                unused: cur.read_f32()?,
            });
        }
        Ok(Self { entries })
    }

    fn encode_body(&self, out: &mut PayloadWriter) -> Result<(), DatagramError> {
        out.put_u32(self.entries.len() as u32);
        for e in &self.entries {
            out.put_f32(e.depth);
            out.put_f32(e.reflectivity);
            out.put_f32(e.unused);
        }
        Ok(())
    }
}

/// BOT0: one depth per transceiver, in slot order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BottomDepths {
    pub depths: Vec<f64>,
}

impl PayloadBody for BottomDepths {
    fn decode_body(cur: &mut PayloadCursor<'_>) -> Result<Self, DatagramError> {
        let n = read_transceiver_count(cur)?;
        Ok(Self {
            depths: cur.read_f64_vec(n)?,
        })
    }

    fn encode_body(&self, out: &mut PayloadWriter) -> Result<(), DatagramError> {
        out.put_u32(self.depths.len() as u32);
        for &d in &self.depths {
            out.put_f64(d);
        }
        Ok(())
    }
}
