//! Incremental frame parser for the chat event stream.
//!
//! Bytes are pushed in as they arrive; complete frames (delimited by a
//! blank line) are decoded and returned, and any partial trailing frame
//! stays buffered for the next push. Chunk boundaries can fall anywhere,
//! including inside the delimiter itself.

use crate::error::ChatError;

use super::protocol::StreamEvent;

const FRAME_DELIMITER: &[u8] = b"\n\n";

#[derive(Debug, Default)]
pub struct FrameParser {
    buf: Vec<u8>,
}

impl FrameParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of response bytes; returns every frame completed by
    /// this chunk, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<StreamEvent>, ChatError> {
        self.buf.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = find_delimiter(&self.buf) {
            let frame: Vec<u8> = self.buf.drain(..pos + FRAME_DELIMITER.len()).collect();
            let frame = &frame[..pos];
            if frame.is_empty() {
                continue;
            }
            events.push(parse_frame(frame)?);
        }
        Ok(events)
    }

    /// Bytes still buffered (a partial frame, or nothing).
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

fn find_delimiter(buf: &[u8]) -> Option<usize> {
    buf.windows(FRAME_DELIMITER.len())
        .position(|w| w == FRAME_DELIMITER)
}

fn parse_frame(frame: &[u8]) -> Result<StreamEvent, ChatError> {
    let text = std::str::from_utf8(frame)
        .map_err(|e| ChatError::Frame(format!("invalid utf-8 in frame: {e}")))?;

    let mut event_name: Option<&str> = None;
    let mut data = String::new();
    for line in text.lines() {
        if let Some(name) = line.strip_prefix("event:") {
            event_name = Some(name.trim());
        } else if let Some(chunk) = line.strip_prefix("data:") {
            // Multiple data: lines concatenate.
            data.push_str(chunk.trim_start());
        }
        // Unknown field names are ignored, per the SSE convention.
    }

    let event_name =
        event_name.ok_or_else(|| ChatError::Frame("frame missing event name".to_string()))?;
    StreamEvent::decode(event_name, &data)
}
