//! The compressed UTF-8 specialization.
//!
//! Unicode input is decoded into scalars, and each scalar is expanded into
//! 1-4 transition keys: ASCII scalars emit their byte raw, and every byte of
//! a multi-byte encoding is masked with [`PackedByte::DROP_MASK`]. Dropping
//! the second-highest bit shrinks the per-byte alphabet to 196 keys, which is
//! what lets the node table stay a flat array. Matching applies the same mask
//! to incoming bytes before transition lookup.
//!
//! `&str` input is decoded infallibly; `&[u8]` entry points validate first
//! and surface [`TablewalkError::InvalidUtf8`] on dangling or truncated
//! sequences. Positions reported by the string surfaces are byte offsets into
//! the source text, anchored at character boundaries.

use smallvec::SmallVec;

use crate::machine::{
    CursorSet, IndexSymbol, MatchSpan, Payload, StateMachine, Symbol, WideTable,
};
use crate::TablewalkError;

/// One transition key of the compressed UTF-8 alphabet: a UTF-8 byte with
/// the drop bit masked away.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct PackedByte(u8);

impl PackedByte {
    /// Discards the second-highest bit of a UTF-8 byte.
    pub const DROP_MASK: u8 = 0b1011_1111;

    pub fn new(byte: u8) -> Self {
        PackedByte(byte & Self::DROP_MASK)
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl From<u8> for PackedByte {
    fn from(byte: u8) -> Self {
        PackedByte::new(byte)
    }
}

impl Symbol for PackedByte {
    type Table = WideTable;

    fn render(&self) -> String {
        match self.0 {
            0..=31 | 127 => format!("\\{}", self.0),
            b if b & 0x80 != 0 => {
                // Masked byte: could have been the header or a data byte.
                format!("\\x{:02X}|\\x{:02X}", b | 0b0100_0000, b)
            }
            b => format!("'{}'", b as char),
        }
    }
}

impl IndexSymbol for PackedByte {
    #[inline]
    fn key_index(&self) -> usize {
        self.0 as usize
    }

    #[inline]
    fn from_index(index: usize) -> Self {
        PackedByte(index as u8)
    }
}

/// A machine matching Unicode text through the compressed byte alphabet.
pub type Utf8StateMachine<V> = StateMachine<V, PackedByte>;

/// A pure pattern over the compressed byte alphabet.
pub type Utf8Regex = Utf8StateMachine<()>;

/// The 1-4 transition keys of one scalar.
pub(crate) fn scalar_keys(c: char) -> SmallVec<[PackedByte; 4]> {
    let mut keys = SmallVec::new();
    if c.is_ascii() {
        keys.push(PackedByte(c as u8));
    } else {
        let mut buf = [0u8; 4];
        for &byte in c.encode_utf8(&mut buf).as_bytes() {
            keys.push(PackedByte::new(byte));
        }
    }
    keys
}

/// Decode a string into its transition-key sequence.
pub fn str_keys(text: &str) -> Vec<PackedByte> {
    let mut keys = Vec::with_capacity(text.len());
    for c in text.chars() {
        keys.extend(scalar_keys(c));
    }
    keys
}

/// As [`str_keys`], also returning for each key the byte offset of the
/// character that produced it.
fn str_keys_with_offsets(text: &str) -> (Vec<PackedByte>, Vec<usize>) {
    let mut keys = Vec::with_capacity(text.len());
    let mut offsets = Vec::with_capacity(text.len());
    for (pos, c) in text.char_indices() {
        for key in scalar_keys(c) {
            keys.push(key);
            offsets.push(pos);
        }
    }
    (keys, offsets)
}

/// Key indices that start a character, plus the end-of-input position.
fn char_anchors(offsets: &[usize]) -> Vec<usize> {
    let mut anchors = Vec::with_capacity(offsets.len() + 1);
    for i in 0..offsets.len() {
        if i == 0 || offsets[i] != offsets[i - 1] {
            anchors.push(i);
        }
    }
    anchors.push(offsets.len());
    anchors
}

#[inline]
fn byte_pos(offsets: &[usize], text_len: usize, key_pos: usize) -> usize {
    if key_pos < offsets.len() {
        offsets[key_pos]
    } else {
        text_len
    }
}

fn validate(bytes: &[u8]) -> Result<&str, TablewalkError> {
    std::str::from_utf8(bytes).map_err(|e| TablewalkError::InvalidUtf8 {
        offset: e.valid_up_to(),
    })
}

impl<V: Payload> Utf8StateMachine<V> {
    /// Match `text` exactly, one cursor transition per key.
    pub fn match_str(&mut self, text: &str) -> &mut Self {
        let keys = str_keys(text);
        self.match_sequence(&keys)
    }

    /// Match any one character of `choices`.
    ///
    /// Single-key (ASCII) choices go through the collapsing alternation;
    /// multi-byte choices each walk their key sequence from the initial
    /// cursors, and all resulting frontiers are merged.
    pub fn match_any_of_str(&mut self, choices: &str) -> &mut Self {
        let initial = self.cursors.clone();
        let mut merged = CursorSet::new();
        let mut ascii: Vec<PackedByte> = Vec::new();
        for c in choices.chars() {
            let keys = scalar_keys(c);
            if keys.len() == 1 {
                ascii.push(keys[0]);
                continue;
            }
            self.cursors = initial.clone();
            self.match_sequence(&keys);
            for &cur in self.cursors.clone().iter() {
                if !merged.contains(&cur) {
                    merged.push(cur);
                }
            }
        }
        if !ascii.is_empty() {
            self.cursors = initial;
            self.match_any_of(&ascii);
            for &cur in self.cursors.clone().iter() {
                if !merged.contains(&cur) {
                    merged.push(cur);
                }
            }
        }
        self.cursors = merged;
        self
    }

    /// String-mode full match over `text`.
    pub fn full_match_str(&self, text: &str) -> Option<&V> {
        self.full_match(&str_keys(text))
    }

    /// File-mode full match over `text` (consumes EOF after the last key).
    pub fn full_match_eof_str(&self, text: &str) -> Option<&V> {
        self.full_match_eof(&str_keys(text))
    }

    pub fn is_match_str(&self, text: &str) -> bool {
        self.full_match_str(text).is_some()
    }

    pub fn is_match_eof_str(&self, text: &str) -> bool {
        self.full_match_eof_str(text).is_some()
    }

    /// Longest accepting prefix of `text`; the returned position is a byte
    /// offset into `text`.
    pub fn lookup_str(&self, text: &str) -> Option<(usize, &V)> {
        let (keys, offsets) = str_keys_with_offsets(text);
        let (key_end, value) = self.lookup(&keys)?;
        Some((byte_pos(&offsets, text.len(), key_end), value))
    }

    /// First match in `text`, anchored at character boundaries; span offsets
    /// are byte offsets into `text`.
    pub fn find_first_str(&self, text: &str) -> Option<MatchSpan<'_, V>> {
        let (keys, offsets) = str_keys_with_offsets(text);
        for &anchor in &char_anchors(&offsets) {
            if let Some((len, value)) = self.lookup(&keys[anchor..]) {
                return Some(MatchSpan {
                    start: byte_pos(&offsets, text.len(), anchor),
                    end: byte_pos(&offsets, text.len(), anchor + len),
                    value,
                });
            }
        }
        None
    }

    /// All greedy, non-overlapping matches in `text`, leftmost first; span
    /// offsets are byte offsets into `text`.
    pub fn find_all_str(&self, text: &str) -> Vec<MatchSpan<'_, V>> {
        let (keys, offsets) = str_keys_with_offsets(text);
        let anchors = char_anchors(&offsets);
        let mut found = Vec::new();
        let mut i = 0;
        while i < anchors.len() {
            let anchor = anchors[i];
            match self.lookup(&keys[anchor..]) {
                Some((len, value)) => {
                    found.push(MatchSpan {
                        start: byte_pos(&offsets, text.len(), anchor),
                        end: byte_pos(&offsets, text.len(), anchor + len),
                        value,
                    });
                    if len == 0 {
                        i += 1;
                    } else {
                        let key_end = anchor + len;
                        while i < anchors.len() && anchors[i] < key_end {
                            i += 1;
                        }
                    }
                }
                None => i += 1,
            }
        }
        found
    }

    /// String-mode full match over raw bytes; fails on malformed UTF-8.
    pub fn full_match_bytes(&self, bytes: &[u8]) -> Result<Option<&V>, TablewalkError> {
        Ok(self.full_match_str(validate(bytes)?))
    }

    /// File-mode full match over raw bytes; fails on malformed UTF-8.
    pub fn full_match_eof_bytes(&self, bytes: &[u8]) -> Result<Option<&V>, TablewalkError> {
        Ok(self.full_match_eof_str(validate(bytes)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_keys_ascii_is_raw() {
        let keys = scalar_keys('A');
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].get(), b'A');
    }

    #[test]
    fn test_scalar_keys_masks_every_multibyte_byte() {
        // U+00E9 encodes as C3 A9; both bytes lose the drop bit.
        let keys = scalar_keys('\u{e9}');
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0].get(), 0xC3 & PackedByte::DROP_MASK);
        assert_eq!(keys[1].get(), 0xA9 & PackedByte::DROP_MASK);
        assert!(keys.iter().all(|k| (k.get() as usize) < WideTable::KEYSPACE));

        // Four-byte scalars emit four keys.
        assert_eq!(scalar_keys('\u{1F600}').len(), 4);
    }

    #[test]
    fn test_match_str_multibyte_roundtrip() {
        let mut m: Utf8StateMachine<u32> = Utf8StateMachine::new();
        m.match_str("héllo").commit(1).unwrap();
        assert_eq!(m.full_match_str("héllo"), Some(&1));
        assert_eq!(m.full_match_str("hello"), None);
        assert_eq!(m.full_match_str("héll"), None);
    }

    #[test]
    fn test_match_any_of_str_mixed_widths() {
        let mut m: Utf8StateMachine<u32> = Utf8StateMachine::new();
        m.match_any_of_str("aé€").commit(7).unwrap();
        assert_eq!(m.full_match_str("a"), Some(&7));
        assert_eq!(m.full_match_str("é"), Some(&7));
        assert_eq!(m.full_match_str("€"), Some(&7));
        assert_eq!(m.full_match_str("b"), None);
    }

    #[test]
    fn test_invalid_bytes_are_reported_with_offset() {
        let mut m: Utf8StateMachine<u32> = Utf8StateMachine::new();
        m.match_str("ok").commit(1).unwrap();
        let err = m.full_match_bytes(b"ok\xC3").unwrap_err();
        assert_eq!(err, TablewalkError::InvalidUtf8 { offset: 2 });
        assert_eq!(m.full_match_bytes("ok".as_bytes()).unwrap(), Some(&1));
    }

    #[test]
    fn test_lookup_str_reports_byte_offsets() {
        let mut m: Utf8StateMachine<u32> = Utf8StateMachine::new();
        m.match_str("héllo").commit(3).unwrap();
        // h + 2-byte é + llo = 6 bytes.
        assert_eq!(m.lookup_str("héllo world"), Some((6, &3)));
        assert_eq!(m.lookup_str("hello world"), None);
    }

    #[test]
    fn test_find_first_str_anchors_at_char_boundaries() {
        let mut m: Utf8StateMachine<u32> = Utf8StateMachine::new();
        m.match_str("é").commit(1).unwrap();
        let span = m.find_first_str("xé!").unwrap();
        assert_eq!((span.start, span.end), (1, 3));
    }

    #[test]
    fn test_ascii_classes_work_on_the_wide_alphabet() {
        let mut rg = Utf8Regex::new();
        rg.match_digit().terminal().unwrap();
        assert!(rg.is_match_str("7"));
        assert!(!rg.is_match_str("x"));
        assert!(!rg.is_match_str("é"));
    }

    #[test]
    fn test_find_all_str_reports_byte_offsets() {
        let mut m: Utf8StateMachine<u32> = Utf8StateMachine::new();
        m.match_str("ab").commit(1).unwrap();
        // "é" is two bytes, so the second "ab" starts at byte 4.
        let spans = m.find_all_str("abéab");
        assert_eq!(spans.len(), 2);
        assert_eq!((spans[0].start, spans[0].end), (0, 2));
        assert_eq!((spans[1].start, spans[1].end), (4, 6));
    }
}
