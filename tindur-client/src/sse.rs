//! Incremental Server-Sent Events decoder.
//!
//! Bytes arrive in arbitrary chunks; the decoder buffers partial lines
//! (including split UTF-8 sequences) and emits a frame at each blank line.

use tindur_core::{EventDecodeError, StreamEvent};

/// One dispatched event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub id: Option<String>,
    pub data: String,
}

impl SseFrame {
    /// The event type, `message` when the frame named none.
    pub fn event_name(&self) -> &str {
        self.event.as_deref().unwrap_or("message")
    }

    pub fn decode(&self) -> Result<StreamEvent, EventDecodeError> {
        StreamEvent::decode(self.event_name(), self.id.as_deref(), &self.data)
    }
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    event: Option<String>,
    id: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning every frame it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(end) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=end).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            let line = String::from_utf8_lossy(&line);
            if let Some(frame) = self.process_line(&line) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Bytes held back waiting for a line terminator.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "event" => self.event = Some(value.to_string()),
            "data" => self.data.push(value.to_string()),
            "id" if !value.contains('\0') => self.id = Some(value.to_string()),
            _ => {}
        }
        None
    }

    // Ids are per frame here: a frame without one carries no origin.
    fn dispatch(&mut self) -> Option<SseFrame> {
        let event = self.event.take();
        let id = self.id.take();
        if self.data.is_empty() {
            return None;
        }
        let data = std::mem::take(&mut self.data).join("\n");
        Some(SseFrame { event, id, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_frame() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"id: abc\nevent: init\ndata: abc\n\n");
        assert_eq!(
            frames,
            vec![SseFrame {
                event: Some("init".to_string()),
                id: Some("abc".to_string()),
                data: "abc".to_string(),
            }]
        );
    }

    #[test]
    fn test_chunk_boundaries_and_crlf() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"event: upd").is_empty());
        assert!(decoder.push(b"ate\r\ndata: {\"a\":").is_empty());
        assert!(decoder.pending() > 0);
        let frames = decoder.push(b"1}\r\n\r\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].event_name(), "update");
        assert_eq!(frames[0].data, "{\"a\":1}");
        assert_eq!(decoder.pending(), 0);
    }

    #[test]
    fn test_split_utf8_sequence() {
        let mut decoder = SseDecoder::new();
        let bytes = "data: é\n\n".as_bytes();
        let split = bytes.iter().position(|b| *b == 0xC3).unwrap() + 1;
        assert!(decoder.push(&bytes[..split]).is_empty());
        let frames = decoder.push(&bytes[split..]);
        assert_eq!(frames[0].data, "é");
    }

    #[test]
    fn test_comments_and_multiline_data() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b": keep-alive\n\ndata: one\ndata:two\n\n");
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "one\ntwo");
        assert_eq!(frames[0].event_name(), "message");
    }

    #[test]
    fn test_id_does_not_leak_into_next_frame() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"id: a\ndata: 1\n\ndata: 2\n\n");
        assert_eq!(frames[0].id.as_deref(), Some("a"));
        assert_eq!(frames[1].id, None);
    }
}
