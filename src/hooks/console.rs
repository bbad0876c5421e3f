use tracing::{info, trace};

use crate::frames::Frame;

use super::Hook;

/// Logs the armed episode
#[derive(Debug, Default)]
pub struct ConsoleHook {
    /// Whether the last frame showed a hand, to log only changes
    hand_visible: bool,
}

impl ConsoleHook {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Hook for ConsoleHook {
    fn name(&self) -> &'static str {
        "console"
    }

    fn on_enter_armed(&mut self) -> anyhow::Result<()> {
        info!("armed: hold a command gesture");
        Ok(())
    }

    fn on_exit_armed(&mut self) -> anyhow::Result<()> {
        info!("left armed mode");
        Ok(())
    }

    fn on_frame(&mut self, frame: &Frame, in_armed: bool) -> anyhow::Result<()> {
        let visible = frame.has_hand();
        if visible != self.hand_visible {
            trace!(visible, in_armed, "hand visibility changed");
            self.hand_visible = visible;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gesture::Landmark;

    #[test]
    fn test_console_hook_methods_do_not_fail() {
        let mut hook = ConsoleHook::new();
        hook.on_enter_armed().unwrap();
        hook.on_exit_armed().unwrap();

        hook.on_frame(&Frame::with_landmarks(vec![Landmark::default()]), true)
            .unwrap();
        assert!(hook.hand_visible);
        hook.on_frame(&Frame::empty(), false).unwrap();
        assert!(!hook.hand_visible);
    }
}
