//! Per-tick decision logic
//!
//! Idle waits for the wake gesture to be held for `wake_hold`. Armed then
//! applies, in order: timeout, wake re-trigger, debounce/no signal, same
//! gesture held, gesture changed. Executing is entered and left inside the
//! same `decide` call.

use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::commands::CommandRegistry;
use crate::events::{BusError, Event, EventBus};
use crate::frames::Frame;
use crate::gesture::{classify, is_wake, GestureLabel};
use crate::hooks::Hook;
use crate::state::{Mode, StateMachine, TransitionError};

use super::{Clock, Timings};

/// Failures that escape a tick
///
/// Command failures never show up here; they are logged and swallowed.
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error(transparent)]
    Transition(#[from] TransitionError),

    #[error(transparent)]
    Bus(#[from] BusError),

    #[error("hook {hook} failed")]
    Hook {
        hook: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

/// Owns the timers and drives the state machine
pub struct ModeController {
    machine: StateMachine,
    registry: CommandRegistry,
    hooks: Vec<Box<dyn Hook>>,
    bus: Rc<EventBus>,
    clock: Rc<dyn Clock>,
    timings: Timings,

    /// When the wake gesture was first seen (Idle only)
    wake_started_at: Option<Duration>,
    /// When armed mode began
    armed_at: Option<Duration>,
    /// Clock reading when the last command finished
    last_fired_at: Option<Duration>,
    /// Candidate command gesture and when it was first seen (Armed only)
    tracked: Option<GestureLabel>,
    hold_started_at: Option<Duration>,
}

impl ModeController {
    pub fn new(
        registry: CommandRegistry,
        hooks: Vec<Box<dyn Hook>>,
        bus: Rc<EventBus>,
        clock: Rc<dyn Clock>,
        timings: Timings,
    ) -> Self {
        Self {
            machine: StateMachine::new(),
            registry,
            hooks,
            bus,
            clock,
            timings,
            wake_started_at: None,
            armed_at: None,
            last_fired_at: None,
            tracked: None,
            hold_started_at: None,
        }
    }

    /// Replace the state machine, e.g. with [`StateMachine::strict`]
    pub fn with_state_machine(mut self, machine: StateMachine) -> Self {
        self.machine = machine;
        self
    }

    pub fn mode(&self) -> Mode {
        self.machine.mode()
    }

    pub fn state_machine(&self) -> &StateMachine {
        &self.machine
    }

    /// Gesture currently being held toward a command, if any
    pub fn tracked(&self) -> Option<&GestureLabel> {
        self.tracked.as_ref()
    }

    /// Classify a frame, decide, then show the frame to every hook
    ///
    /// A frame carrying its capture time `t` is decided at that time, so a
    /// recorded session replays on its own timeline. Other frames use the
    /// clock.
    pub fn tick(&mut self, frame: &Frame) -> Result<(), ControllerError> {
        let now = match (frame.t, frame.timestamp()) {
            (_, Some(t)) => t,
            (Some(t), None) => {
                warn!(t, "unusable frame timestamp, using the clock");
                self.clock.now()
            }
            (None, None) => self.clock.now(),
        };
        let label = classify(frame.landmarks.as_deref());

        self.decide(now, label.as_ref())?;

        let in_armed = self.machine.mode() == Mode::Armed;
        for hook in &mut self.hooks {
            hook.on_frame(frame, in_armed)
                .map_err(|source| ControllerError::Hook {
                    hook: hook.name(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Apply one observation. `now` must not go backwards between calls.
    pub fn decide(&mut self, now: Duration, label: Option<&GestureLabel>) -> Result<(), ControllerError> {
        match self.machine.mode() {
            Mode::Idle => self.decide_idle(now, label),
            Mode::Armed => self.decide_armed(now, label),
            Mode::Executing => {
                warn!("decide called while a command is executing");
                Ok(())
            }
        }
    }

    fn decide_idle(&mut self, now: Duration, label: Option<&GestureLabel>) -> Result<(), ControllerError> {
        if !is_wake(label) {
            // Any interruption discards wake progress
            self.wake_started_at = None;
            return Ok(());
        }

        let Some(started) = self.wake_started_at else {
            debug!("wake gesture seen");
            self.wake_started_at = Some(now);
            return Ok(());
        };

        if now.saturating_sub(started) < self.timings.wake_hold {
            return Ok(());
        }

        self.machine.transition_to(Mode::Armed)?;
        self.armed_at = Some(now);
        self.wake_started_at = None;
        self.clear_hold();
        self.notify_enter()
    }

    fn decide_armed(&mut self, now: Duration, label: Option<&GestureLabel>) -> Result<(), ControllerError> {
        if let Some(armed_at) = self.armed_at {
            if now.saturating_sub(armed_at) >= self.timings.armed_timeout {
                info!("no command gesture held, leaving armed mode");
                self.machine.transition_to(Mode::Idle)?;
                self.armed_at = None;
                self.clear_hold();
                let notified = self.notify_exit();
                return self.settle(notified);
            }
        }

        // Re-wake resets hold tracking without leaving armed mode
        if is_wake(label) {
            self.clear_hold();
            return Ok(());
        }

        let label = match label {
            Some(label) if !self.debouncing(now) => label,
            _ => {
                self.clear_hold();
                return Ok(());
            }
        };

        if self.tracked.as_ref() == Some(label) {
            let held = self
                .hold_started_at
                .is_some_and(|started| now.saturating_sub(started) >= self.timings.hold);
            if held {
                return self.fire(now, label.clone());
            }
            return Ok(());
        }

        debug!(%label, "tracking command gesture");
        self.tracked = Some(label.clone());
        self.hold_started_at = Some(now);
        Ok(())
    }

    /// Run the command bound to `label` and close the armed episode
    ///
    /// `last_fired_at` is `now` plus however long the command took on the
    /// clock, so the debounce window starts once the command has returned.
    fn fire(&mut self, now: Duration, label: GestureLabel) -> Result<(), ControllerError> {
        let command = self.registry.resolve(&label);

        self.machine.transition_to(Mode::Executing)?;
        let notified = self.notify_exit();
        self.clear_hold();
        self.armed_at = None;

        let started = self.clock.now();
        if notified.is_ok() {
            info!(%label, command = command.name(), "executing command");
            if let Err(e) = command.execute() {
                error!(%label, command = command.name(), error = ?e, "command failed");
            }
        } else {
            warn!(%label, command = command.name(), "hook failed, command skipped");
        }

        let took = self.clock.now().saturating_sub(started);
        self.last_fired_at = Some(now + took);
        self.machine.transition_to(Mode::Idle)?;
        self.settle(notified)
    }

    /// Publish the settle event, then report the earlier hook result
    fn settle(&self, notified: Result<(), ControllerError>) -> Result<(), ControllerError> {
        let published = self.bus.publish(&Event::Settled);
        notified?;
        published?;
        Ok(())
    }

    fn debouncing(&self, now: Duration) -> bool {
        self.last_fired_at
            .is_some_and(|fired| now.saturating_sub(fired) < self.timings.debounce)
    }

    fn clear_hold(&mut self) {
        self.tracked = None;
        self.hold_started_at = None;
    }

    fn notify_enter(&mut self) -> Result<(), ControllerError> {
        for hook in &mut self.hooks {
            hook.on_enter_armed()
                .map_err(|source| ControllerError::Hook {
                    hook: hook.name(),
                    source,
                })?;
        }
        Ok(())
    }

    fn notify_exit(&mut self) -> Result<(), ControllerError> {
        for hook in &mut self.hooks {
            hook.on_exit_armed()
                .map_err(|source| ControllerError::Hook {
                    hook: hook.name(),
                    source,
                })?;
        }
        Ok(())
    }
}
