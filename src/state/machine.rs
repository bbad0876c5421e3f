//! Mode holder and transition log
//!
//! The default machine accepts any transition. A strict machine checks each
//! request against the table of transitions the controller is allowed to
//! make and rejects everything else.

use std::time::Instant;

use tracing::{debug, info};

/// The three modes of the gesture controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Waiting for a held wake gesture
    Idle,
    /// Waiting for a held command gesture
    Armed,
    /// Running a command; entered and left within a single tick
    Executing,
}

impl Default for Mode {
    fn default() -> Self {
        Self::Idle
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Idle => write!(f, "IDLE"),
            Mode::Armed => write!(f, "ARMED"),
            Mode::Executing => write!(f, "EXECUTING"),
        }
    }
}

/// Transitions the controller makes during normal operation
const LEGAL_TRANSITIONS: &[(Mode, Mode)] = &[
    (Mode::Idle, Mode::Armed),
    (Mode::Armed, Mode::Idle),
    (Mode::Armed, Mode::Executing),
    (Mode::Executing, Mode::Idle),
];

/// A recorded mode change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub from: Mode,
    pub to: Mode,
}

/// Rejected transition in strict mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("illegal mode transition {from} -> {to}")]
pub struct TransitionError {
    pub from: Mode,
    pub to: Mode,
}

/// Holds the current mode
#[derive(Debug)]
pub struct StateMachine {
    mode: Mode,
    strict: bool,
    /// Time when the current mode was entered
    entered_at: Instant,
    last_transition: Option<Transition>,
    transition_count: u64,
}

impl StateMachine {
    /// Create an unconstrained machine starting in Idle
    pub fn new() -> Self {
        Self {
            mode: Mode::Idle,
            strict: false,
            entered_at: Instant::now(),
            last_transition: None,
            transition_count: 0,
        }
    }

    /// Create a machine that only accepts the legal transition table
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::new()
        }
    }

    /// Get the current mode
    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Most recent (old, new) pair, if any transition happened yet
    pub fn last_transition(&self) -> Option<Transition> {
        self.last_transition
    }

    pub fn transition_count(&self) -> u64 {
        self.transition_count
    }

    /// Whether `from -> to` appears in the legal transition table
    pub fn is_legal(from: Mode, to: Mode) -> bool {
        LEGAL_TRANSITIONS.contains(&(from, to))
    }

    /// Replace the current mode
    ///
    /// An unconstrained machine never fails. A strict machine fails with
    /// [`TransitionError`] and leaves the mode untouched when the pair is
    /// not in the legal table.
    pub fn transition_to(&mut self, new_mode: Mode) -> Result<(), TransitionError> {
        let old_mode = self.mode;

        if self.strict && !Self::is_legal(old_mode, new_mode) {
            debug!(from = %old_mode, to = %new_mode, "rejected mode transition");
            return Err(TransitionError {
                from: old_mode,
                to: new_mode,
            });
        }

        let duration_ms = self.entered_at.elapsed().as_millis() as u64;

        info!(
            from = %old_mode,
            to = %new_mode,
            duration_ms = duration_ms,
            "mode transition"
        );

        self.mode = new_mode;
        self.entered_at = Instant::now();
        self.last_transition = Some(Transition {
            from: old_mode,
            to: new_mode,
        });
        self.transition_count += 1;

        Ok(())
    }
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_mode() {
        let sm = StateMachine::new();
        assert_eq!(sm.mode(), Mode::Idle);
        assert!(sm.last_transition().is_none());
        assert_eq!(sm.transition_count(), 0);
    }

    #[test]
    fn test_transition_records_old_and_new() {
        let mut sm = StateMachine::new();
        sm.transition_to(Mode::Armed).unwrap();

        assert_eq!(sm.mode(), Mode::Armed);
        assert_eq!(
            sm.last_transition(),
            Some(Transition {
                from: Mode::Idle,
                to: Mode::Armed,
            })
        );
        assert_eq!(sm.transition_count(), 1);
    }

    #[test]
    fn test_unconstrained_accepts_anything() {
        let mut sm = StateMachine::new();

        // Idle -> Executing is not in the table, but nothing checks it here
        sm.transition_to(Mode::Executing).unwrap();
        assert_eq!(sm.mode(), Mode::Executing);

        sm.transition_to(Mode::Executing).unwrap();
        sm.transition_to(Mode::Armed).unwrap();
        assert_eq!(sm.mode(), Mode::Armed);
        assert_eq!(sm.transition_count(), 3);
    }

    #[test]
    fn test_strict_follows_full_cycle() {
        let mut sm = StateMachine::strict();
        assert!(sm.is_strict());

        sm.transition_to(Mode::Armed).unwrap();
        sm.transition_to(Mode::Executing).unwrap();
        sm.transition_to(Mode::Idle).unwrap();
        sm.transition_to(Mode::Armed).unwrap();
        sm.transition_to(Mode::Idle).unwrap();
        assert_eq!(sm.mode(), Mode::Idle);
    }

    #[test]
    fn test_strict_rejects_illegal() {
        let mut sm = StateMachine::strict();

        let err = sm.transition_to(Mode::Executing).unwrap_err();
        assert_eq!(
            err,
            TransitionError {
                from: Mode::Idle,
                to: Mode::Executing,
            }
        );
        assert_eq!(sm.mode(), Mode::Idle);
        assert_eq!(sm.transition_count(), 0);

        // Self transitions are illegal too
        assert!(sm.transition_to(Mode::Idle).is_err());
    }

    #[test]
    fn test_mode_display() {
        assert_eq!(Mode::Idle.to_string(), "IDLE");
        assert_eq!(Mode::Armed.to_string(), "ARMED");
        assert_eq!(Mode::Executing.to_string(), "EXECUTING");
    }
}
