use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{Modifier, ModifierSet, Scancode, index_of_char, scancode_at};

/// Errors produced while parsing a trigger spec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TriggerError {
    /// The spec contained an empty component (e.g. `"cmd++"`).
    #[error("empty component in trigger spec `{0}`")]
    Empty(String),
    /// A component was neither a modifier nor a known key.
    #[error("unknown key `{0}` in trigger spec")]
    UnknownKey(String),
    /// A trigger must hold at least one modifier.
    #[error("trigger `{0}` has no modifier")]
    NoModifier(String),
    /// More than one non-modifier key was given.
    #[error("trigger `{0}` names more than one key")]
    MultipleKeys(String),
}

/// Named non-sequence keys accepted as a trigger key.
const NAMED_KEYS: &[(&str, Scancode)] = &[("tab", 0x30), ("space", 0x31), ("return", 0x24)];

/// The chord that engages the switcher: a set of held modifiers plus an
/// optional key.
///
/// With no key, the chord is "pressed" as soon as every modifier in the set
/// is held and "released" when any of them is let go. With a key, pressing
/// the key while the modifiers are held engages the chord, and releasing a
/// modifier ends it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Trigger {
    /// Modifiers that must be held.
    pub modifiers: ModifierSet,
    /// Optional key that must be pressed while the modifiers are held.
    pub key: Option<Scancode>,
}

impl Default for Trigger {
    fn default() -> Self {
        Self {
            modifiers: ModifierSet::OPTION,
            key: None,
        }
    }
}

impl Trigger {
    /// Parse a trigger spec of the form `"cmd+opt"` or `"ctrl+tab"`.
    pub fn parse(spec: &str) -> Result<Self, TriggerError> {
        let mut modifiers = ModifierSet::empty();
        let mut key = None;
        for part in spec.split('+') {
            let part = part.trim();
            if part.is_empty() {
                return Err(TriggerError::Empty(spec.to_string()));
            }
            if let Some(m) = Modifier::from_spec(part) {
                modifiers |= m.flag();
                continue;
            }
            let sc = key_from_spec(part).ok_or_else(|| TriggerError::UnknownKey(part.into()))?;
            if key.replace(sc).is_some() {
                return Err(TriggerError::MultipleKeys(spec.to_string()));
            }
        }
        if modifiers.is_empty() {
            return Err(TriggerError::NoModifier(spec.to_string()));
        }
        Ok(Self { modifiers, key })
    }

    /// True when `held` contains every modifier of this trigger.
    pub fn modifiers_held(&self, held: ModifierSet) -> bool {
        held.contains(self.modifiers)
    }

    /// Canonical spec string.
    pub fn to_spec(&self) -> String {
        let mut out = self.modifiers.to_string();
        if let Some(sc) = self.key {
            out.push('+');
            out.push_str(&key_to_spec(sc));
        }
        out
    }
}

/// Resolve a key spec: a named key or a single sequence character.
fn key_from_spec(s: &str) -> Option<Scancode> {
    let lower = s.to_ascii_lowercase();
    if let Some((_, sc)) = NAMED_KEYS.iter().find(|(n, _)| *n == lower) {
        return Some(*sc);
    }
    let mut chars = s.chars();
    let ch = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    index_of_char(ch).and_then(scancode_at)
}

/// Render a key scancode back to its spec.
fn key_to_spec(sc: Scancode) -> String {
    if let Some((name, _)) = NAMED_KEYS.iter().find(|(_, c)| *c == sc) {
        return (*name).to_string();
    }
    crate::index_of_scancode(sc)
        .and_then(crate::char_at)
        .map(String::from)
        .unwrap_or_else(|| format!("0x{sc:02x}"))
}

impl FromStr for Trigger {
    type Err = TriggerError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Trigger {
    type Error = TriggerError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Trigger> for String {
    fn from(t: Trigger) -> Self {
        t.to_spec()
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_spec())
    }
}
