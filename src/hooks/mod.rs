//! Observers of the armed episode
//!
//! Hooks are told when the controller enters and leaves armed mode and see
//! every frame. Their errors are not caught by the controller.

mod console;
mod hue;

use serde::Deserialize;
use tracing::{info, warn};

use crate::commands::{BuildError, Services};
use crate::frames::Frame;
use crate::integrations::Integration;

pub use console::ConsoleHook;
pub use hue::HueHook;

/// Lifecycle observer
pub trait Hook {
    /// Short name for logs and errors
    fn name(&self) -> &'static str;

    /// Called once when armed mode begins
    fn on_enter_armed(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called once when armed mode ends, by timeout or before a command runs
    fn on_exit_armed(&mut self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Called every tick after the controller has decided
    fn on_frame(&mut self, _frame: &Frame, _in_armed: bool) -> anyhow::Result<()> {
        Ok(())
    }
}

fn default_armed_hue() -> u16 {
    46920
}

fn default_armed_transition() -> u16 {
    2
}

/// Hooks that can be enabled from configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "hook", rename_all = "snake_case")]
pub enum HookSpec {
    Console,
    Hue {
        light_ids: Vec<u32>,
        /// Hue value shown while armed
        #[serde(default = "default_armed_hue")]
        armed_hue: u16,
        /// Fade into the armed colour, in tenths of a second
        #[serde(default = "default_armed_transition")]
        armed_transition: u16,
    },
}

impl HookSpec {
    pub fn integration(&self) -> Option<Integration> {
        match self {
            HookSpec::Console => None,
            HookSpec::Hue { .. } => Some(Integration::Hue),
        }
    }

    pub fn build(&self, services: &Services) -> Result<Box<dyn Hook>, BuildError> {
        let hook: Box<dyn Hook> = match self {
            HookSpec::Console => Box::new(ConsoleHook::new()),
            HookSpec::Hue {
                light_ids,
                armed_hue,
                armed_transition,
            } => Box::new(HueHook::new(
                light_ids.clone(),
                *armed_hue,
                *armed_transition,
                services,
            )?),
        };
        Ok(hook)
    }
}

/// Build configured hooks, skipping those whose integration is disabled
pub fn build_hooks(entries: &[HookSpec], services: &Services) -> Vec<Box<dyn Hook>> {
    let mut hooks = Vec::with_capacity(entries.len());

    for entry in entries {
        if let Some(integration) = entry.integration() {
            if !services.has(integration) {
                warn!(?entry, %integration, "integration disabled, skipping hook");
                continue;
            }
        }
        match entry.build(services) {
            Ok(hook) => hooks.push(hook),
            Err(e) => warn!(?entry, error = %e, "skipping hook"),
        }
    }

    info!(
        hooks = ?hooks.iter().map(|h| h.name()).collect::<Vec<_>>(),
        "hooks built"
    );
    hooks
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    use crate::integrations::fake::FakeBridge;
    use crate::events::{EventBus, EventKind};

    #[derive(Deserialize)]
    struct Doc {
        #[serde(default)]
        hooks: Vec<HookSpec>,
    }

    const HOOKS: &str = r#"
        [[hooks]]
        hook = "console"

        [[hooks]]
        hook = "hue"
        light_ids = [5, 6]
    "#;

    #[test]
    fn test_parse_hooks_with_defaults() {
        let doc: Doc = toml::from_str(HOOKS).unwrap();
        assert_eq!(doc.hooks[0], HookSpec::Console);
        assert_eq!(
            doc.hooks[1],
            HookSpec::Hue {
                light_ids: vec![5, 6],
                armed_hue: 46920,
                armed_transition: 2,
            }
        );
        assert_eq!(doc.hooks[1].integration(), Some(Integration::Hue));
    }

    #[test]
    fn test_unknown_hook_rejected_at_parse() {
        assert!(toml::from_str::<Doc>("[[hooks]]\nhook = \"overlay3d\"\n").is_err());
        assert!(toml::from_str::<Doc>("").unwrap().hooks.is_empty());
    }

    #[test]
    fn test_build_all_enabled() {
        let doc: Doc = toml::from_str(HOOKS).unwrap();
        let bus = Rc::new(EventBus::new());
        let services = Services::new(Rc::clone(&bus)).with_hue(Rc::new(FakeBridge::default()));

        let hooks = build_hooks(&doc.hooks, &services);
        let names: Vec<_> = hooks.iter().map(|h| h.name()).collect();
        assert_eq!(names, vec!["console", "hue"]);

        // The Hue hook listens for command results and settle
        assert_eq!(bus.listener_count(EventKind::LightsChanged), 1);
        assert_eq!(bus.listener_count(EventKind::Settled), 1);
    }

    #[test]
    fn test_build_skips_disabled_integration() {
        let doc: Doc = toml::from_str(HOOKS).unwrap();
        let bus = Rc::new(EventBus::new());
        let services = Services::new(Rc::clone(&bus));

        let hooks = build_hooks(&doc.hooks, &services);
        assert_eq!(hooks.len(), 1);
        assert_eq!(hooks[0].name(), "console");
        assert_eq!(bus.listener_count(EventKind::Settled), 0);
    }
}
