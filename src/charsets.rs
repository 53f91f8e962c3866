//! ASCII character classes: the byte sets and the builder conveniences over
//! them.
//!
//! The class methods are available on any machine whose symbol can be built
//! from a byte, which covers the byte specialization, the compressed UTF-8
//! specialization, and integer-keyed map machines alike.

use crate::machine::{Payload, StateMachine, Symbol};

pub const DIGITS: &[u8] = b"0123456789";
pub const LOWERCASE: &[u8] = b"abcdefghijklmnopqrstuvwxyz";
pub const UPPERCASE: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";
pub const ALPHA: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Visual whitespace: HT, LF, VT, FF, CR, space.
pub const WHITESPACE: &[u8] = b"\t\n\x0b\x0c\r ";

/// Control characters: ASCII outside the visible range that is not
/// whitespace.
pub const CONTROL: &[u8] = &[
    0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x0e, 0x0f, 0x10, 0x11, 0x12, 0x13, 0x14,
    0x15, 0x16, 0x17, 0x18, 0x19, 0x1a, 0x1b, 0x1c, 0x1d, 0x1e, 0x1f, 0x7f,
];

fn class<S: Symbol + From<u8>>(bytes: &[u8]) -> Vec<S> {
    bytes.iter().map(|&b| S::from(b)).collect()
}

impl<V: Payload, S: Symbol + From<u8>> StateMachine<V, S> {
    /// Match any one ASCII character, whitespace and control included.
    pub fn match_any(&mut self) -> &mut Self {
        let all: Vec<u8> = (0u8..128).collect();
        self.match_any_of(&class(&all))
    }

    /// Match any digit `[0-9]`.
    pub fn match_digit(&mut self) -> &mut Self {
        self.match_any_of(&class(DIGITS))
    }

    /// Match any alphabetical character `[A-Za-z]`.
    pub fn match_alpha(&mut self) -> &mut Self {
        self.match_any_of(&class(ALPHA))
    }

    /// Match any lowercase character `[a-z]`.
    pub fn match_lowercase(&mut self) -> &mut Self {
        self.match_any_of(&class(LOWERCASE))
    }

    /// Match any uppercase character `[A-Z]`.
    pub fn match_uppercase(&mut self) -> &mut Self {
        self.match_any_of(&class(UPPERCASE))
    }

    /// Match any visual whitespace character.
    pub fn match_whitespace(&mut self) -> &mut Self {
        self.match_any_of(&class(WHITESPACE))
    }

    /// Match any control character.
    pub fn match_control(&mut self) -> &mut Self {
        self.match_any_of(&class(CONTROL))
    }
}

#[cfg(test)]
mod tests {
    use crate::Regex;

    #[test]
    fn test_digit_class_accepts_exactly_the_digits() {
        let mut rg = Regex::new();
        rg.match_digit().terminal().unwrap();
        for b in 0u8..128 {
            assert_eq!(rg.is_match(&[b]), b.is_ascii_digit(), "byte {}", b);
        }
    }

    #[test]
    fn test_class_alternation_collapses_to_one_state() {
        let mut rg = Regex::<u8>::new();
        rg.match_digit().terminal().unwrap();
        // Root plus the one shared destination.
        assert_eq!(rg.node_count(), 2);
    }

    #[test]
    fn test_whitespace_and_control_are_disjoint() {
        use super::{CONTROL, WHITESPACE};
        for b in WHITESPACE {
            assert!(!CONTROL.contains(b));
        }
    }
}
