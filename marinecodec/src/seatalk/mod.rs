//! Seatalk-1 datagram codec.
//!
//! A datagram is a run of 9-bit characters on a 4800 baud line: the command
//! byte carries mark parity (9th bit set), every following byte space
//! parity. The low nibble of the second byte gives the number of additional
//! data bytes, so a whole datagram is `3 + (attribute & 0x0F)` bytes long.
//!
//! Two framers are provided. [`ParityFramer`] is used when the transport
//! surfaces the parity bit per byte and anchors on mark-parity bytes.
//! [`HeuristicFramer`] is the fallback for transports without parity
//! information: it slides over the stream and accepts a parse once the
//! command id, the length nibble and a one-datagram lookahead agree.
//!
//! Datagram layouts follow the Thomas Knauf Seatalk reference.

pub mod datagram;
pub mod datagrams;

use std::collections::VecDeque;

use crate::error::DecodeError;
pub use datagram::Datagram;

/// Expected length-nibble values for a command id.
#[derive(Debug, Clone, Copy)]
pub(crate) enum AttrLen {
    Fixed(u8),
    OneOf(&'static [u8]),
}

impl AttrLen {
    pub(crate) fn matches(&self, attr_len: u8) -> bool {
        match self {
            AttrLen::Fixed(n) => attr_len == *n,
            AttrLen::OneOf(ns) => ns.contains(&attr_len),
        }
    }
}

/// Length-nibble table for every known command id, `None` for unknown ids.
pub(crate) fn expected_attr(id: u8) -> Option<AttrLen> {
    use AttrLen::*;
    Some(match id {
        0x00 => Fixed(2),
        0x01 => Fixed(5),
        0x10 => Fixed(1),
        0x11 => Fixed(1),
        0x20 => Fixed(1),
        0x21 => Fixed(2),
        0x22 => Fixed(2),
        0x23 => Fixed(1),
        0x24 => Fixed(2),
        0x25 => Fixed(4),
        0x26 => Fixed(4),
        0x27 => Fixed(1),
        0x30 => Fixed(0),
        0x36 => Fixed(0),
        #[cfg(feature = "unproven-datagrams")]
        0x38 => Fixed(1),
        0x50 => Fixed(2),
        0x51 => Fixed(2),
        0x52 => Fixed(1),
        0x53 => Fixed(0),
        0x54 => Fixed(1),
        0x55 => Fixed(1),
        0x56 => Fixed(1),
        0x57 => Fixed(0),
        0x58 => Fixed(5),
        #[cfg(feature = "unproven-datagrams")]
        0x59 => Fixed(2),
        #[cfg(feature = "unproven-datagrams")]
        0x61 => Fixed(3),
        #[cfg(feature = "unproven-datagrams")]
        0x65 => Fixed(0),
        #[cfg(feature = "unproven-datagrams")]
        0x66 => Fixed(0),
        #[cfg(feature = "unproven-datagrams")]
        0x68 => Fixed(1),
        0x6C => Fixed(5),
        0x6E => Fixed(7),
        0x80 => Fixed(0),
        #[cfg(feature = "unproven-datagrams")]
        0x81 => OneOf(&[0, 1]),
        0x86 => Fixed(1),
        0x87 => Fixed(0),
        0x90 => Fixed(0),
        0x91 => Fixed(0),
        #[cfg(feature = "unproven-datagrams")]
        0x93 => Fixed(0),
        0x99 => Fixed(0),
        #[cfg(feature = "unproven-datagrams")]
        0xA4 => OneOf(&[2, 6]),
        _ => return None,
    })
}

/// Framer for transports that surface the parity bit per byte.
///
/// A mark-parity byte always starts a datagram. Mark parity in an unexpected
/// position throws away the partial datagram and resynchronises on the new
/// command byte; space-parity bytes outside a datagram are discarded.
pub struct ParityFramer {
    buf: Vec<u8>,
    /// Bytes thrown away while hunting for a command byte.
    pub discarded: u64,
}

impl ParityFramer {
    pub fn new() -> Self {
        Self { buf: Vec::new(), discarded: 0 }
    }

    /// Pushes one byte with its ninth bit.
    pub fn push(&mut self, byte: u8, mark: bool) -> Option<Result<Datagram, DecodeError>> {
        if mark {
            if !self.buf.is_empty() {
                self.discarded += self.buf.len() as u64;
                self.buf.clear();
            }
            self.buf.push(byte);
            return None;
        }
        if self.buf.is_empty() {
            // Payload byte with no command byte in sight.
            self.discarded += 1;
            return None;
        }
        self.buf.push(byte);
        if self.buf.len() >= 2 {
            let total = 3 + (self.buf[1] & 0x0F) as usize;
            if self.buf.len() == total {
                let bytes = std::mem::take(&mut self.buf);
                return Some(Datagram::decode(&bytes));
            }
        }
        None
    }

    /// Pushes a chunk of bytes with one parity flag each.
    pub fn push_bytes(&mut self, bytes: &[u8], marks: &[bool]) -> Vec<Result<Datagram, DecodeError>> {
        bytes
            .iter()
            .zip(marks)
            .filter_map(|(&b, &m)| self.push(b, m))
            .collect()
    }
}

impl Default for ParityFramer {
    fn default() -> Self {
        Self::new()
    }
}

/// Framer for transports without parity information.
///
/// Keeps a sliding window and tries to parse a datagram at the front: the
/// command id must be known and the length nibble must match that id. One
/// datagram of lookahead then checks the alignment. A trailing byte that
/// could not start a datagram is garbage *after* the candidate, never
/// grounds to drop it; the candidate is only abandoned (window advances one
/// byte) when a start inside its window parses with a plausible
/// continuation of its own while the candidate's does not, which marks the
/// front byte as prefix noise that happened to look like a header. Advanced
/// bytes are counted as discarded.
pub struct HeuristicFramer {
    buf: VecDeque<u8>,
    /// Bytes skipped while searching for a parseable position.
    pub discarded: u64,
}

impl HeuristicFramer {
    pub fn new() -> Self {
        Self { buf: VecDeque::new(), discarded: 0 }
    }

    /// Feeds a chunk of bytes, returning every datagram that became
    /// unambiguous.
    pub fn push_bytes(&mut self, bytes: &[u8]) -> Vec<Result<Datagram, DecodeError>> {
        self.buf.extend(bytes);
        let mut out = Vec::new();
        while let Some(result) = self.try_next() {
            out.push(result);
        }
        out
    }

    fn try_next(&mut self) -> Option<Result<Datagram, DecodeError>> {
        loop {
            if self.buf.len() < 3 {
                return None;
            }
            let Some(total) = self.candidate_len(0) else {
                self.buf.pop_front();
                self.discarded += 1;
                continue;
            };
            if self.buf.len() < total {
                // Candidate still incomplete; wait for more bytes.
                return None;
            }
            if self.buf.len() > total && !self.plausible_start(total) && self.rival_alignment(total) {
                // The candidate's continuation is garbage while a start
                // inside its window chains onto a plausible next datagram:
                // the front byte was noise shaped like a header.
                self.buf.pop_front();
                self.discarded += 1;
                continue;
            }
            let bytes: Vec<u8> = self.buf.drain(..total).collect();
            return Some(Datagram::decode(&bytes));
        }
    }

    /// Total length of a well-headed candidate at `offset`: known command
    /// id with a length nibble consistent with it.
    fn candidate_len(&self, offset: usize) -> Option<usize> {
        let expected = expected_attr(*self.buf.get(offset)?)?;
        let attr_len = *self.buf.get(offset + 1)? & 0x0F;
        expected.matches(attr_len).then(|| 3 + attr_len as usize)
    }

    /// Whether the byte at `offset` could begin another datagram. A header
    /// that runs past the window counts as plausible.
    fn plausible_start(&self, offset: usize) -> bool {
        let Some(&cmd) = self.buf.get(offset) else {
            return true;
        };
        let Some(expected) = expected_attr(cmd) else {
            return false;
        };
        match self.buf.get(offset + 1) {
            Some(&attr) => expected.matches(attr & 0x0F),
            None => true,
        }
    }

    /// Whether some later start inside the candidate window parses as a
    /// datagram whose own continuation is plausible.
    fn rival_alignment(&self, total: usize) -> bool {
        (1..total).any(|offset| match self.candidate_len(offset) {
            Some(len) if offset + len <= self.buf.len() => self.plausible_start(offset + len),
            _ => false,
        })
    }
}

impl Default for HeuristicFramer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;

    const DEPTH: [u8; 5] = [0x00, 0x02, 0x00, 0x64, 0x00];

    fn marks_for(datagram: &[u8]) -> Vec<bool> {
        let mut marks = vec![false; datagram.len()];
        marks[0] = true;
        marks
    }

    #[test]
    fn test_parity_framer_clean_stream() {
        let mut framer = ParityFramer::new();
        let out = framer.push_bytes(&DEPTH, &marks_for(&DEPTH));
        assert_eq!(out.len(), 1);
        let datagram = out[0].as_ref().unwrap();
        assert_eq!(datagram.to_bytes(), DEPTH.to_vec());
        assert_eq!(framer.discarded, 0);
    }

    #[test]
    fn test_parity_framer_discards_prefix_and_resyncs() {
        // 16 payload-parity garbage bytes, then a valid datagram.
        let mut stream = vec![0x55u8; 16];
        let mut marks = vec![false; 16];
        stream.extend_from_slice(&DEPTH);
        marks.extend_from_slice(&marks_for(&DEPTH));
        // And a truncated trailer that never completes.
        stream.extend_from_slice(&[0x20, 0x01]);
        marks.extend_from_slice(&[true, false]);

        let mut framer = ParityFramer::new();
        let out = framer.push_bytes(&stream, &marks);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_ref().unwrap().to_bytes(), DEPTH.to_vec());
        assert_eq!(framer.discarded, 16);
    }

    #[test]
    fn test_parity_framer_mark_mid_datagram_restarts() {
        let mut framer = ParityFramer::new();
        // Command byte of a depth datagram, then an unexpected new command.
        assert!(framer.push(0x00, true).is_none());
        assert!(framer.push(0x02, false).is_none());
        let out: Vec<_> = DEPTH
            .iter()
            .zip(marks_for(&DEPTH))
            .filter_map(|(&b, m)| framer.push(b, m))
            .collect();
        assert_eq!(out.len(), 1);
        assert!(out[0].is_ok());
        assert_eq!(framer.discarded, 2);
    }

    #[test]
    fn test_heuristic_framer_aligned_stream() {
        let mut framer = HeuristicFramer::new();
        let out = framer.push_bytes(&DEPTH);
        assert_eq!(out.len(), 1);
        let message = out[0].as_ref().unwrap().to_message().unwrap();
        let Message::DepthBelowTransducer { meters } = message else { panic!() };
        assert!((meters - 3.048).abs() < 1e-3);
    }

    #[test]
    fn test_heuristic_framer_skips_garbage_prefix() {
        // 0xFF is not a known command id, so the framer must slide past it.
        let mut stream = vec![0xFFu8; 16];
        stream.extend_from_slice(&DEPTH);
        stream.extend_from_slice(&[0x20, 0x01, 0x53, 0x00]);

        let mut framer = HeuristicFramer::new();
        let out = framer.push_bytes(&stream);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].as_ref().unwrap().to_bytes(), DEPTH.to_vec());
        assert_eq!(framer.discarded, 16);
    }

    #[test]
    fn test_heuristic_framer_keeps_datagram_before_garbage_suffix() {
        // A trailing byte that cannot start a datagram is noise after the
        // candidate, not evidence against it: the datagram is delivered
        // and only the suffix is discarded.
        let mut stream = DEPTH.to_vec();
        stream.push(0xFF);
        let mut framer = HeuristicFramer::new();
        let out = framer.push_bytes(&stream);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_ref().unwrap().to_bytes(), DEPTH.to_vec());

        let follow_up = [0x23, 0x01, 0x0B, 0x00];
        let out = framer.push_bytes(&follow_up);
        assert_eq!(out.len(), 1);
        assert!(out[0].is_ok());
        assert_eq!(framer.discarded, 1);
    }

    #[test]
    fn test_heuristic_framer_arbitrary_prefix_and_suffix() {
        // prefix || valid_datagram || suffix must always yield at least
        // the valid datagram, whatever the suffix bytes are.
        let mut stream = vec![0xF7u8, 0x42, 0xFF, 0x3D];
        stream.extend_from_slice(&DEPTH);
        stream.extend_from_slice(&[0xAA, 0xBB]);

        let mut framer = HeuristicFramer::new();
        let out = framer.push_bytes(&stream);
        assert!(out
            .iter()
            .any(|r| r.as_ref().is_ok_and(|d| d.to_bytes() == DEPTH.to_vec())));
    }

    #[test]
    fn test_heuristic_framer_prefix_shaped_like_header() {
        // 0x20 0x01 looks like a speed header whose "payload" swallows the
        // first two bytes of the real datagram. Its continuation is not a
        // plausible datagram start while the real one inside the window
        // is, so the framer advances and recovers the depth datagram.
        let mut stream = vec![0x20u8, 0x01];
        stream.extend_from_slice(&DEPTH);

        let mut framer = HeuristicFramer::new();
        let out = framer.push_bytes(&stream);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].as_ref().unwrap().to_bytes(), DEPTH.to_vec());
        assert_eq!(framer.discarded, 2);
    }

    #[test]
    fn test_heuristic_framer_split_feed() {
        let mut framer = HeuristicFramer::new();
        assert!(framer.push_bytes(&DEPTH[..2]).is_empty());
        assert!(framer.push_bytes(&DEPTH[2..4]).is_empty());
        let out = framer.push_bytes(&DEPTH[4..]);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_expected_attr_table() {
        assert!(expected_attr(0x00).unwrap().matches(2));
        assert!(!expected_attr(0x00).unwrap().matches(3));
        assert!(expected_attr(0x6E).unwrap().matches(7));
        assert!(expected_attr(0xFF).is_none());
        #[cfg(feature = "unproven-datagrams")]
        {
            assert!(expected_attr(0x81).unwrap().matches(0));
            assert!(expected_attr(0x81).unwrap().matches(1));
            assert!(expected_attr(0xA4).unwrap().matches(6));
        }
    }
}
