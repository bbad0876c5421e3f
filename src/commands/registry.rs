//! Gesture label to command lookup

use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use crate::gesture::GestureLabel;

use super::{Command, FallbackCommand};

/// Maps gesture labels to commands
#[derive(Default)]
pub struct CommandRegistry {
    commands: HashMap<GestureLabel, Rc<dyn Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `command` to `label`, replacing any earlier binding
    pub fn register(&mut self, label: GestureLabel, command: Rc<dyn Command>) {
        debug!(%label, command = command.name(), "command registered");
        if let Some(previous) = self.commands.insert(label.clone(), command) {
            debug!(%label, previous = previous.name(), "replaced existing binding");
        }
    }

    /// Look up the command for `label`. Never fails: unknown labels get a
    /// [`FallbackCommand`] carrying the label.
    pub fn resolve(&self, label: &GestureLabel) -> Rc<dyn Command> {
        match self.commands.get(label) {
            Some(command) => Rc::clone(command),
            None => Rc::new(FallbackCommand::new(label.clone())),
        }
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
