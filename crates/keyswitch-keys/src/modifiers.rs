use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::Scancode;

/// Modifier keys that can form a trigger chord.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum Modifier {
    /// Command (⌘).
    Command,
    /// Option/Alt (⌥).
    Option,
    /// Control (⌃).
    Control,
    /// Shift (⇧).
    Shift,
    /// Function (fn).
    Function,
}

impl Modifier {
    /// All modifiers in canonical display order.
    pub const ALL: [Self; 5] = [
        Self::Command,
        Self::Option,
        Self::Control,
        Self::Shift,
        Self::Function,
    ];

    /// Parses a modifier spec, accepting common aliases (cmd/opt/alt/ctrl/fn).
    pub fn from_spec(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cmd" | "command" | "meta" => Some(Self::Command),
            "opt" | "option" | "alt" => Some(Self::Option),
            "ctrl" | "control" => Some(Self::Control),
            "shift" => Some(Self::Shift),
            "fn" | "function" => Some(Self::Function),
            _ => None,
        }
    }

    /// Canonical lowercase spec string.
    pub fn to_spec(self) -> &'static str {
        match self {
            Self::Command => "cmd",
            Self::Option => "opt",
            Self::Control => "ctrl",
            Self::Shift => "shift",
            Self::Function => "fn",
        }
    }

    /// Set bit for this modifier.
    pub fn flag(self) -> ModifierSet {
        match self {
            Self::Command => ModifierSet::COMMAND,
            Self::Option => ModifierSet::OPTION,
            Self::Control => ModifierSet::CONTROL,
            Self::Shift => ModifierSet::SHIFT,
            Self::Function => ModifierSet::FUNCTION,
        }
    }

    /// Modifier produced by a physical modifier key, left or right.
    pub fn from_scancode(sc: Scancode) -> Option<Self> {
        match sc {
            0x37 | 0x36 => Some(Self::Command),
            0x3A | 0x3D => Some(Self::Option),
            0x3B | 0x3E => Some(Self::Control),
            0x38 | 0x3C => Some(Self::Shift),
            0x3F => Some(Self::Function),
            _ => None,
        }
    }
}

bitflags! {
    /// Set of held modifiers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ModifierSet: u8 {
        /// Command held.
        const COMMAND = 1 << 0;
        /// Option held.
        const OPTION = 1 << 1;
        /// Control held.
        const CONTROL = 1 << 2;
        /// Shift held.
        const SHIFT = 1 << 3;
        /// Function held.
        const FUNCTION = 1 << 4;
    }
}

/// `kCGEventFlagMaskShift`.
const CG_SHIFT: u64 = 1 << 17;
/// `kCGEventFlagMaskControl`.
const CG_CONTROL: u64 = 1 << 18;
/// `kCGEventFlagMaskAlternate`.
const CG_OPTION: u64 = 1 << 19;
/// `kCGEventFlagMaskCommand`.
const CG_COMMAND: u64 = 1 << 20;
/// `kCGEventFlagMaskSecondaryFn`.
const CG_FUNCTION: u64 = 1 << 23;

impl ModifierSet {
    /// Construct a modifier set from macOS CGEventFlags bits.
    ///
    /// Only the device-independent mask bits are read, so left and right
    /// variants of a modifier are treated alike.
    pub fn from_cg_flags(flags: u64) -> Self {
        let mut set = Self::empty();
        if flags & CG_SHIFT != 0 {
            set |= Self::SHIFT;
        }
        if flags & CG_CONTROL != 0 {
            set |= Self::CONTROL;
        }
        if flags & CG_OPTION != 0 {
            set |= Self::OPTION;
        }
        if flags & CG_COMMAND != 0 {
            set |= Self::COMMAND;
        }
        if flags & CG_FUNCTION != 0 {
            set |= Self::FUNCTION;
        }
        set
    }

    /// Modifiers in the set, in canonical order.
    pub fn modifiers(self) -> impl Iterator<Item = Modifier> {
        Modifier::ALL.into_iter().filter(move |m| self.contains(m.flag()))
    }
}

impl fmt::Display for ModifierSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = self.modifiers().map(Modifier::to_spec).collect();
        write!(f, "{}", parts.join("+"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn modifier_specs() {
        assert_eq!(Modifier::from_spec("cmd"), Some(Modifier::Command));
        assert_eq!(Modifier::from_spec("CTRL"), Some(Modifier::Control));
        assert_eq!(Modifier::from_spec("alt"), Some(Modifier::Option));
        assert_eq!(Modifier::from_spec("opt"), Some(Modifier::Option));
        assert_eq!(Modifier::from_spec("fn"), Some(Modifier::Function));
        assert_eq!(Modifier::from_spec("hyper"), None);
        for m in Modifier::ALL {
            assert_eq!(Modifier::from_spec(m.to_spec()), Some(m));
        }
    }

    #[test]
    fn cg_flags_decode() {
        let set = ModifierSet::from_cg_flags(CG_OPTION | CG_COMMAND | 0x100);
        assert_eq!(set, ModifierSet::OPTION | ModifierSet::COMMAND);
        assert_eq!(set.to_string(), "cmd+opt");
        assert!(ModifierSet::from_cg_flags(0).is_empty());
    }

    #[test]
    fn left_and_right_modifier_keys() {
        assert_eq!(Modifier::from_scancode(0x3A), Some(Modifier::Option));
        assert_eq!(Modifier::from_scancode(0x3D), Some(Modifier::Option));
        assert_eq!(Modifier::from_scancode(0x36), Some(Modifier::Command));
        assert_eq!(Modifier::from_scancode(0x00), None);
    }
}
