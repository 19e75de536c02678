//! The fixed shortcut keyboard sequence.
//!
//! A "scancode" here is the macOS hardware virtual keycode: the value
//! reported by `NSEvent.keyCode` and in the CoreGraphics
//! `kCGKeyboardEventKeycode` field. It identifies a physical key position,
//! independent of the active keyboard layout.

/// macOS hardware virtual keycode (`kVK_*`, `NSEvent.keyCode`).
pub type Scancode = u16;

/// Number of slots in [`KEY_SEQUENCE`].
pub const SEQUENCE_LEN: usize = 47;

/// `kVK_Escape`.
pub const ESCAPE_SCANCODE: Scancode = 0x35;

/// One slot of the shortcut sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShortcutKey {
    /// Character shown on the overlay badge and stored in preferences.
    pub ch: char,
    /// Physical key that selects this slot.
    pub scancode: Scancode,
}

/// Shorthand constructor used by the table below.
const fn k(ch: char, scancode: Scancode) -> ShortcutKey {
    ShortcutKey { ch, scancode }
}

/// Shortcut slots in priority order: number row, the three letter rows, then
/// grave and backslash. Index 0 is the most primary position.
pub const KEY_SEQUENCE: [ShortcutKey; SEQUENCE_LEN] = [
    // Number row
    k('1', 0x12),
    k('2', 0x13),
    k('3', 0x14),
    k('4', 0x15),
    k('5', 0x17),
    k('6', 0x16),
    k('7', 0x1A),
    k('8', 0x1C),
    k('9', 0x19),
    k('0', 0x1D),
    k('-', 0x1B),
    k('=', 0x18),
    // Top letter row
    k('q', 0x0C),
    k('w', 0x0D),
    k('e', 0x0E),
    k('r', 0x0F),
    k('t', 0x11),
    k('y', 0x10),
    k('u', 0x20),
    k('i', 0x22),
    k('o', 0x1F),
    k('p', 0x23),
    k('[', 0x21),
    k(']', 0x1E),
    // Home row
    k('a', 0x00),
    k('s', 0x01),
    k('d', 0x02),
    k('f', 0x03),
    k('g', 0x05),
    k('h', 0x04),
    k('j', 0x26),
    k('k', 0x28),
    k('l', 0x25),
    k(';', 0x29),
    k('\'', 0x27),
    // Bottom row
    k('z', 0x06),
    k('x', 0x07),
    k('c', 0x08),
    k('v', 0x09),
    k('b', 0x0B),
    k('n', 0x2D),
    k('m', 0x2E),
    k(',', 0x2B),
    k('.', 0x2F),
    k('/', 0x2C),
    // Extra symbol keys
    k('`', 0x32),
    k('\\', 0x2A),
];

/// Resolve a shortcut character to its slot index. Letters match case-insensitively.
pub fn index_of_char(ch: char) -> Option<usize> {
    let ch = ch.to_ascii_lowercase();
    KEY_SEQUENCE.iter().position(|s| s.ch == ch)
}

/// Character for slot `index`, if in range.
pub fn char_at(index: usize) -> Option<char> {
    KEY_SEQUENCE.get(index).map(|s| s.ch)
}

/// Resolve a physical key to its slot index.
pub fn index_of_scancode(sc: Scancode) -> Option<usize> {
    KEY_SEQUENCE.iter().position(|s| s.scancode == sc)
}

/// Physical key for slot `index`, if in range.
pub fn scancode_at(index: usize) -> Option<Scancode> {
    KEY_SEQUENCE.get(index).map(|s| s.scancode)
}

/// True when `sc` is one of the 47 reserved shortcut keys.
pub fn is_reserved_scancode(sc: Scancode) -> bool {
    index_of_scancode(sc).is_some()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn sequence_chars_and_scancodes_are_unique() {
        let chars: HashSet<char> = KEY_SEQUENCE.iter().map(|s| s.ch).collect();
        let codes: HashSet<Scancode> = KEY_SEQUENCE.iter().map(|s| s.scancode).collect();
        assert_eq!(chars.len(), SEQUENCE_LEN);
        assert_eq!(codes.len(), SEQUENCE_LEN);
        assert!(!codes.contains(&ESCAPE_SCANCODE));
    }

    #[test]
    fn primary_positions() {
        assert_eq!(char_at(0), Some('1'));
        assert_eq!(char_at(9), Some('0'));
        assert_eq!(index_of_char('q'), Some(12));
        assert_eq!(index_of_char('Q'), Some(12));
        assert_eq!(index_of_char('\\'), Some(46));
        assert_eq!(char_at(SEQUENCE_LEN), None);
        assert_eq!(index_of_char('!'), None);
    }

    #[test]
    fn char_and_scancode_agree_for_every_slot() {
        for (i, slot) in KEY_SEQUENCE.iter().enumerate() {
            assert_eq!(index_of_char(slot.ch), Some(i));
            assert_eq!(index_of_scancode(slot.scancode), Some(i));
            assert_eq!(scancode_at(i), Some(slot.scancode));
            assert!(is_reserved_scancode(slot.scancode));
        }
    }

    #[test]
    fn non_sequence_keys_are_not_reserved() {
        // Space, Return, Tab, Command
        for sc in [0x31u16, 0x24, 0x30, 0x37] {
            assert!(!is_reserved_scancode(sc));
        }
    }
}
