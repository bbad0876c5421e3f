use tracing::info;

use crate::gesture::GestureLabel;

use super::Command;

/// Stands in for any gesture without a dedicated command
#[derive(Debug, Clone)]
pub struct FallbackCommand {
    label: GestureLabel,
}

impl FallbackCommand {
    pub fn new(label: GestureLabel) -> Self {
        Self { label }
    }
}

impl Command for FallbackCommand {
    fn name(&self) -> &str {
        "fallback"
    }

    fn execute(&self) -> anyhow::Result<()> {
        info!(label = %self.label, "gesture detected with no command bound");
        Ok(())
    }
}
