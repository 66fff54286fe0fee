//! NDJSON Codec for Tokio
//!
//! Implements `Decoder` for newline-delimited generation chunks.
//! Blank lines are skipped and lines that are not valid chunks are dropped,
//! so one bad line never ends the stream.

use bytes::BytesMut;
use std::io;
use tokio_util::codec::Decoder;
use tracing::warn;

use super::types::GenerateChunk;

/// Longest line kept; longer lines are dropped up to their newline
pub const DEFAULT_MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Tokio codec for streamed generation chunks
#[derive(Debug)]
pub struct ChunkCodec {
    max_line_length: usize,
    /// Bytes already scanned for a newline
    next_index: usize,
    /// Skipping the rest of an oversized line
    discarding: bool,
}

impl Default for ChunkCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl ChunkCodec {
    pub fn new() -> Self {
        Self::with_max_line_length(DEFAULT_MAX_LINE_LENGTH)
    }

    pub fn with_max_line_length(max_line_length: usize) -> Self {
        Self {
            max_line_length,
            next_index: 0,
            discarding: false,
        }
    }

    /// Parse one raw line; `None` for blank or malformed lines
    fn parse_line(line: &[u8]) -> Option<GenerateChunk> {
        let line = line.trim_ascii();
        if line.is_empty() {
            return None;
        }

        match serde_json::from_slice::<GenerateChunk>(line) {
            Ok(chunk) => Some(chunk),
            Err(e) => {
                warn!(error = %e, len = line.len(), "Dropping malformed generation line");
                None
            }
        }
    }
}

impl Decoder for ChunkCodec {
    type Item = GenerateChunk;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            let newline = src[self.next_index..].iter().position(|b| *b == b'\n');

            match newline {
                Some(offset) => {
                    let line = src.split_to(self.next_index + offset + 1);
                    self.next_index = 0;

                    if self.discarding {
                        // Tail of an oversized line
                        self.discarding = false;
                        continue;
                    }
                    if let Some(chunk) = Self::parse_line(&line) {
                        return Ok(Some(chunk));
                    }
                }
                None => {
                    if self.discarding || src.len() > self.max_line_length {
                        if !self.discarding {
                            warn!(max = self.max_line_length, "Dropping oversized generation line");
                            self.discarding = true;
                        }
                        src.clear();
                        self.next_index = 0;
                        return Ok(None);
                    }
                    self.next_index = src.len();
                    return Ok(None);
                }
            }
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(chunk) = self.decode(src)? {
            return Ok(Some(chunk));
        }

        // Last line without a trailing newline
        self.next_index = 0;
        if std::mem::take(&mut self.discarding) {
            src.clear();
        }
        if src.is_empty() {
            return Ok(None);
        }
        let rest = src.split_to(src.len());
        Ok(Self::parse_line(&rest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(text: &str, done: bool) -> String {
        format!(
            "{{\"model\":\"llama3\",\"created_at\":\"2024-05-01T10:00:00Z\",\"response\":{},\"done\":{}}}\n",
            serde_json::to_string(text).unwrap(),
            done
        )
    }

    #[test]
    fn test_decode_complete_lines() {
        let mut codec = ChunkCodec::new();
        let mut buf = BytesMut::from(format!("{}{}", line("Hel", false), line("lo", true)).as_str());

        let first = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(first.response, "Hel");
        let second = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(second.response, "lo");
        assert!(second.done);
        assert!(codec.decode(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_codec_partial_decode() {
        let mut codec = ChunkCodec::new();
        let full = line("partial", false);
        let (head, tail) = full.split_at(10);

        let mut buf = BytesMut::from(head);
        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(tail.as_bytes());
        let chunk = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(chunk.response, "partial");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_skips_blank_and_malformed_lines() {
        let mut codec = ChunkCodec::new();
        let input = format!("\n  \r\n{{not json}}\n{}", line("ok", false));
        let mut buf = BytesMut::from(input.as_str());

        let chunk = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(chunk.response, "ok");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_decode_eof_without_newline() {
        let mut codec = ChunkCodec::new();
        let text = line("tail", true);
        let mut buf = BytesMut::from(text.trim_end());

        assert!(codec.decode(&mut buf).unwrap().is_none());
        let chunk = codec.decode_eof(&mut buf).unwrap().unwrap();
        assert_eq!(chunk.response, "tail");
        assert!(codec.decode_eof(&mut buf).unwrap().is_none());
    }

    #[test]
    fn test_oversized_line_is_dropped() {
        let mut codec = ChunkCodec::with_max_line_length(64);
        let mut buf = BytesMut::from("x".repeat(100).as_str());
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert!(buf.is_empty());

        // Rest of the oversized line, then a good one
        buf.extend_from_slice(format!("{}\n{}", "y".repeat(100), line("after", true)).as_bytes());
        let chunk = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(chunk.response, "after");
    }

    #[test]
    fn test_oversized_tail_at_eof() {
        let mut codec = ChunkCodec::with_max_line_length(16);
        let mut buf = BytesMut::from("z".repeat(32).as_str());
        assert!(codec.decode_eof(&mut buf).unwrap().is_none());
        assert!(buf.is_empty());
    }
}
