//! Main-context chord state machine.
//!
//! The tap thread only decides swallow/pass; this machine decides what an
//! input means for the switcher. Anything arriving in [`ChordState::Idle`]
//! other than a trigger press is a no-op, which is what makes a late
//! selection after a cancel harmless.
use std::time::Instant;

/// Inputs forwarded from the keyboard tap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChordInput {
    /// Trigger chord pressed.
    TriggerDown,
    /// Trigger chord released.
    TriggerUp,
    /// Shortcut key pressed while the chord was held.
    Select(usize),
    /// Escape pressed.
    Escape,
}

/// Switcher chord state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChordState {
    /// Nothing engaged; all input passes through.
    #[default]
    Idle,
    /// Overlay visible, listening for a shortcut.
    ChordHeld {
        /// When the trigger went down.
        since: Instant,
    },
}

/// What the engine must do after a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Refresh, assign and show the overlay.
    Engage,
    /// Switch to the application holding slot `index`, then hide.
    Switch {
        /// Selected slot.
        index: usize,
        /// When the chord that led to this switch went down.
        pressed_at: Instant,
    },
    /// Hide the overlay without switching.
    Cancel,
    /// Nothing changes.
    Ignore,
}

/// The two-state chord machine.
#[derive(Debug, Clone, Default)]
pub struct ChordMachine {
    /// Current state.
    state: ChordState,
}

impl ChordMachine {
    /// A machine in [`ChordState::Idle`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state.
    pub fn state(&self) -> ChordState {
        self.state
    }

    /// True while the chord is held.
    pub fn is_held(&self) -> bool {
        matches!(self.state, ChordState::ChordHeld { .. })
    }

    /// Advance on `input`. `assigned` reports whether a slot currently maps to
    /// an application; unassigned selections leave the chord held.
    pub fn step(
        &mut self,
        input: ChordInput,
        now: Instant,
        assigned: impl Fn(usize) -> bool,
    ) -> Transition {
        match (self.state, input) {
            (ChordState::Idle, ChordInput::TriggerDown) => {
                self.state = ChordState::ChordHeld { since: now };
                Transition::Engage
            }
            (ChordState::Idle, _) => Transition::Ignore,
            (ChordState::ChordHeld { .. }, ChordInput::TriggerDown) => Transition::Ignore,
            (ChordState::ChordHeld { since }, ChordInput::Select(index)) => {
                if assigned(index) {
                    self.state = ChordState::Idle;
                    Transition::Switch {
                        index,
                        pressed_at: since,
                    }
                } else {
                    Transition::Ignore
                }
            }
            (ChordState::ChordHeld { .. }, ChordInput::Escape | ChordInput::TriggerUp) => {
                self.state = ChordState::Idle;
                Transition::Cancel
            }
        }
    }

    /// Force [`ChordState::Idle`], e.g. when the tap is disabled.
    pub fn reset(&mut self) {
        self.state = ChordState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn any(_: usize) -> bool {
        true
    }

    #[test]
    fn press_select_returns_to_idle() {
        let t0 = Instant::now();
        let mut m = ChordMachine::new();
        assert_eq!(m.step(ChordInput::TriggerDown, t0, any), Transition::Engage);
        assert!(m.is_held());
        assert_eq!(
            m.step(ChordInput::Select(3), Instant::now(), any),
            Transition::Switch {
                index: 3,
                pressed_at: t0
            }
        );
        assert_eq!(m.state(), ChordState::Idle);
    }

    #[test]
    fn unassigned_selection_keeps_chord() {
        let mut m = ChordMachine::new();
        m.step(ChordInput::TriggerDown, Instant::now(), any);
        assert_eq!(
            m.step(ChordInput::Select(40), Instant::now(), |i| i < 3),
            Transition::Ignore
        );
        assert!(m.is_held());
    }

    #[test]
    fn release_and_escape_cancel() {
        for cancel in [ChordInput::TriggerUp, ChordInput::Escape] {
            let mut m = ChordMachine::new();
            m.step(ChordInput::TriggerDown, Instant::now(), any);
            assert_eq!(m.step(cancel, Instant::now(), any), Transition::Cancel);
            assert_eq!(m.state(), ChordState::Idle);
        }
    }

    #[test]
    fn idle_ignores_everything_but_trigger() {
        let mut m = ChordMachine::new();
        for input in [
            ChordInput::Select(0),
            ChordInput::Escape,
            ChordInput::TriggerUp,
        ] {
            assert_eq!(m.step(input, Instant::now(), any), Transition::Ignore);
            assert_eq!(m.state(), ChordState::Idle);
        }
    }

    #[test]
    fn selection_after_cancel_is_a_no_op() {
        let mut m = ChordMachine::new();
        m.step(ChordInput::TriggerDown, Instant::now(), any);
        m.step(ChordInput::TriggerUp, Instant::now(), any);
        assert_eq!(
            m.step(ChordInput::Select(0), Instant::now(), any),
            Transition::Ignore
        );
    }

    #[test]
    fn repeated_press_while_held_is_ignored() {
        let t0 = Instant::now();
        let mut m = ChordMachine::new();
        m.step(ChordInput::TriggerDown, t0, any);
        assert_eq!(
            m.step(ChordInput::TriggerDown, Instant::now(), any),
            Transition::Ignore
        );
        assert_eq!(m.state(), ChordState::ChordHeld { since: t0 });
    }
}
