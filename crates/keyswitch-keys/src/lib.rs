//! keyswitch-keys: the shortcut keyboard sequence and trigger chords.
//!
//! - [`KEY_SEQUENCE`]: the fixed, ordered 47-slot table of shortcut keys. Each slot
//!   pairs the printable character shown on the overlay badge with the macOS
//!   hardware virtual keycode (`kVK_*`) of the physical key that produces it.
//!   The assignment engine and the event-tap decoder both index this table, so
//!   an assigned index always decodes back to the same physical key.
//! - [`ModifierSet`]: modifier bits decoded from CoreGraphics event flags.
//! - [`Trigger`]: the held chord that engages the switcher.

mod modifiers;
mod sequence;
mod trigger;

pub use modifiers::{Modifier, ModifierSet};
pub use sequence::{
    ESCAPE_SCANCODE, KEY_SEQUENCE, SEQUENCE_LEN, Scancode, ShortcutKey, char_at, index_of_char,
    index_of_scancode, is_reserved_scancode, scancode_at,
};
pub use trigger::{Trigger, TriggerError};
