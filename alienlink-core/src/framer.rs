//! Line framing over a fragmented byte stream
//!
//! The reader protocol has no length fields. Responses end at a literal
//! prompt and notifications are plain text lines, and TCP is free to cut
//! either anywhere. [`LineFramer`] keeps the raw bytes until the caller
//! asks for a marker or for lines, so a marker or a UTF-8 sequence split
//! across two reads is seen whole.

use bytes::BytesMut;
use tracing::{trace, warn};

use crate::constants::{MARKER_WINDOW, MAX_PARTIAL_LINE};

/// Accumulates raw chunks and hands back lines
#[derive(Debug, Default, Clone)]
pub struct LineFramer {
    buf: BytesMut,
}

impl LineFramer {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(1024),
        }
    }
    
    /// Append a chunk
    pub fn feed(&mut self, chunk: &[u8]) {
        trace!(
            len = chunk.len(),
            buffered = self.buf.len(),
            "Framer feed: {}",
            hex::encode(&chunk[..chunk.len().min(32)])
        );
        self.buf.extend_from_slice(chunk);
        self.limit_partial();
    }
    
    /// Keep a peer that never sends a newline from growing the buffer
    fn limit_partial(&mut self) {
        let start = self
            .buf
            .iter()
            .rposition(|&b| b == b'\n')
            .map_or(0, |pos| pos + 1);
        let partial = self.buf.len() - start;
        
        if partial > MAX_PARTIAL_LINE {
            warn!(
                partial,
                limit = MAX_PARTIAL_LINE,
                "Unterminated line too long, discarding"
            );
            let tail = self.buf.split_off(self.buf.len() - MARKER_WINDOW);
            self.buf.truncate(start);
            self.buf.unsplit(tail);
        }
    }
    
    /// Check whether `marker` occurs anywhere in the unconsumed buffer
    pub fn contains_marker(&self, marker: &str) -> bool {
        let needle = marker.as_bytes();
        if needle.is_empty() {
            return true;
        }
        self.buf.windows(needle.len()).any(|w| w == needle)
    }
    
    /// Split the whole buffer into lines and clear it
    ///
    /// Carriage returns are stripped. A trailing line without a terminator
    /// (typically the prompt) is returned too.
    pub fn drain_lines(&mut self) -> Vec<String> {
        let bytes = self.buf.split();
        split_lines(&bytes)
    }
    
    /// Return only newline-terminated lines, keeping a trailing partial line
    pub fn drain_complete_lines(&mut self) -> Vec<String> {
        match self.buf.iter().rposition(|&b| b == b'\n') {
            Some(pos) => {
                let bytes = self.buf.split_to(pos + 1);
                split_lines(&bytes)
            }
            None => Vec::new(),
        }
    }
    
    /// Drop everything buffered
    pub fn clear(&mut self) {
        self.buf.clear();
    }
    
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }
    
    /// Buffered byte count
    pub fn len(&self) -> usize {
        self.buf.len()
    }
}

fn split_lines(bytes: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(|line| line.replace('\r', ""))
        .collect()
}
