//! Splits a byte stream into JSON request documents.
//!
//! Requests carry no delimiter: bytes are accumulated until they parse as a
//! complete JSON document. Input that merely ends early is kept for the next
//! chunk. Input that can never become valid JSON is reported, then skipped
//! up to the next `{` so a request that follows it in the same chunk is
//! still decoded.

use serde_json::Value;
use tracing::trace;

/// One step of decoding.
#[derive(Debug)]
pub enum Frame {
    Request(Value),
    Malformed(String),
}

/// Accumulates bytes received on one connection.
pub struct RequestBuffer {
    buf: Vec<u8>,
    limit: usize,
}

impl RequestBuffer {
    pub fn new(limit: usize) -> Self {
        Self {
            buf: Vec::new(),
            limit,
        }
    }

    pub fn extend(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    pub fn is_empty(&self) -> bool {
        self.buf.iter().all(u8::is_ascii_whitespace)
    }

    /// Next complete frame, or `None` when more input is needed.
    pub fn next_frame(&mut self) -> Option<Frame> {
        if self.is_empty() {
            self.buf.clear();
            return None;
        }
        let (next, used) = {
            let mut stream = serde_json::Deserializer::from_slice(&self.buf).into_iter::<Value>();
            let next = stream.next();
            (next, stream.byte_offset())
        };
        match next {
            Some(Ok(value)) => {
                self.buf.drain(..used);
                Some(Frame::Request(value))
            }
            Some(Err(e)) if e.is_eof() => {
                if self.buf.len() > self.limit {
                    let len = self.buf.len();
                    self.buf.clear();
                    return Some(Frame::Malformed(format!(
                        "request exceeds {} bytes (received {len})",
                        self.limit
                    )));
                }
                trace!(buffered = self.buf.len(), "partial request");
                None
            }
            Some(Err(e)) => {
                match self.buf[1..].iter().position(|&b| b == b'{') {
                    Some(at) => {
                        self.buf.drain(..=at);
                    }
                    None => self.buf.clear(),
                }
                Some(Frame::Malformed(format!("invalid JSON: {e}")))
            }
            None => None,
        }
    }
}
