//! Swallow/forward decisions for the keyboard tap.
//!
//! [`ChordTracker`] is the tap-side view of the trigger chord. It runs inside
//! the CoreGraphics callback and must answer synchronously whether an event
//! is delivered to the focused application. It never touches switcher state:
//! anything the main context needs to know is returned as a [`TapEvent`] and
//! forwarded over a channel.
use std::collections::HashSet;

use keyswitch_keys::{ESCAPE_SCANCODE, ModifierSet, Scancode, Trigger, index_of_scancode};

use crate::TapEvent;

/// Raw keyboard input as seen by the tap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawKey {
    /// A key went down (`is_repeat` for OS auto-repeat).
    Down {
        /// Hardware keycode.
        scancode: Scancode,
        /// True for auto-repeat events.
        is_repeat: bool,
    },
    /// A key went up.
    Up {
        /// Hardware keycode.
        scancode: Scancode,
    },
    /// Modifier flags changed; carries the full CGEventFlags word.
    Flags(u64),
}

/// What the tap should do with one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Event to forward to the main context, if any.
    pub emit: Option<TapEvent>,
    /// Drop the event so the focused application never sees it.
    pub swallow: bool,
}

impl Decision {
    /// Deliver untouched, emit nothing.
    const PASS: Self = Self {
        emit: None,
        swallow: false,
    };
}

/// Tap-side chord state.
#[derive(Debug, Clone)]
pub struct ChordTracker {
    /// Configured trigger chord.
    trigger: Trigger,
    /// When false, nothing engages and everything passes through.
    enabled: bool,
    /// Modifiers currently held.
    held: ModifierSet,
    /// True between a trigger press and its release/cancel.
    engaged: bool,
    /// Set after a cancel or a completed switch; modifiers must be released
    /// before a modifier-only trigger can engage again.
    spent: bool,
    /// Keys whose KeyDown was swallowed; their KeyUp is swallowed too.
    swallowed_down: HashSet<Scancode>,
}

impl ChordTracker {
    /// Create a tracker for `trigger`, enabled.
    pub fn new(trigger: Trigger) -> Self {
        Self {
            trigger,
            enabled: true,
            held: ModifierSet::empty(),
            engaged: false,
            spent: false,
            swallowed_down: HashSet::new(),
        }
    }

    /// Replace the trigger. An unchanged trigger is a no-op; otherwise an
    /// engaged chord is dropped and its `TriggerUp` returned for forwarding.
    pub fn set_trigger(&mut self, trigger: Trigger) -> Option<TapEvent> {
        if trigger == self.trigger {
            return None;
        }
        self.trigger = trigger;
        self.release()
    }

    /// Enable or disable engagement. Disabling drops an engaged chord and
    /// returns its `TriggerUp`.
    pub fn set_enabled(&mut self, enabled: bool) -> Option<TapEvent> {
        self.enabled = enabled;
        if enabled { None } else { self.release() }
    }

    /// End an engaged chord from outside the event stream.
    ///
    /// Modifiers still held must be released before a modifier-only trigger
    /// engages again.
    fn release(&mut self) -> Option<TapEvent> {
        if !self.engaged {
            return None;
        }
        self.engaged = false;
        self.spent = true;
        Some(TapEvent::TriggerUp)
    }

    /// Whether the chord is currently engaged.
    pub fn engaged(&self) -> bool {
        self.engaged
    }

    /// Drop engagement without emitting (the main context already went idle).
    pub fn disengage(&mut self) {
        if self.engaged {
            self.engaged = false;
            self.spent = true;
        }
    }

    /// Classify one raw event, updating chord state.
    pub fn classify(&mut self, raw: RawKey) -> Decision {
        match raw {
            RawKey::Flags(flags) => self.on_flags(flags),
            RawKey::Down {
                scancode,
                is_repeat,
            } => self.on_down(scancode, is_repeat),
            RawKey::Up { scancode } => Decision {
                emit: None,
                swallow: self.swallowed_down.remove(&scancode),
            },
        }
    }

    /// Modifier changes are never swallowed; they only engage or release.
    fn on_flags(&mut self, flags: u64) -> Decision {
        self.held = ModifierSet::from_cg_flags(flags);
        let held_ok = self.trigger.modifiers_held(self.held);
        if !held_ok {
            self.spent = false;
        }
        if self.engaged && !held_ok {
            self.engaged = false;
            return Decision {
                emit: Some(TapEvent::TriggerUp),
                swallow: false,
            };
        }
        if !self.engaged && !self.spent && self.enabled && held_ok && self.trigger.key.is_none()
        {
            self.engaged = true;
            return Decision {
                emit: Some(TapEvent::TriggerDown),
                swallow: false,
            };
        }
        Decision::PASS
    }

    /// Key presses: trigger key, escape, then reserved shortcut keys.
    fn on_down(&mut self, scancode: Scancode, is_repeat: bool) -> Decision {
        let held_ok = self.trigger.modifiers_held(self.held);
        if self.enabled && held_ok && self.trigger.key == Some(scancode) {
            self.swallowed_down.insert(scancode);
            if self.engaged {
                return Decision {
                    emit: None,
                    swallow: true,
                };
            }
            self.engaged = true;
            return Decision {
                emit: Some(TapEvent::TriggerDown),
                swallow: true,
            };
        }
        if scancode == ESCAPE_SCANCODE {
            if self.engaged {
                self.engaged = false;
                self.spent = true;
                self.swallowed_down.insert(scancode);
                return Decision {
                    emit: Some(TapEvent::Escape),
                    swallow: true,
                };
            }
            return Decision {
                emit: Some(TapEvent::Escape),
                swallow: false,
            };
        }
        if !self.engaged {
            return Decision::PASS;
        }
        match index_of_scancode(scancode) {
            Some(index) => {
                self.swallowed_down.insert(scancode);
                Decision {
                    emit: (!is_repeat).then_some(TapEvent::Select { index }),
                    swallow: true,
                }
            }
            None => Decision::PASS,
        }
    }
}
