//! MRU0 motion reference datagram.

use crate::cursor::{PayloadCursor, PayloadWriter};
use crate::datagram::PayloadBody;
use crate::error::DatagramError;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Motion {
    pub heave: f32,
    pub roll: f32,
    pub pitch: f32,
    pub heading: f32,
}

impl PayloadBody for Motion {
    fn decode_body(cur: &mut PayloadCursor<'_>) -> Result<Self, DatagramError> {
        Ok(Self {
            heave: cur.read_f32()?,
            roll: cur.read_f32()?,
            pitch: cur.read_f32()?,
            heading: cur.read_f32()?,
        })
    }

    fn encode_body(&self, out: &mut PayloadWriter) -> Result<(), DatagramError> {
        out.put_f32_slice(&[self.heave, self.roll, self.pitch, self.heading]);
        Ok(())
    }
}
