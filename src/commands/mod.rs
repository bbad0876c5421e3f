//! Commands run when an armed gesture is held
//!
//! A command is an opaque unit of side-effecting work. The registry maps
//! gesture labels to commands and falls back to a diagnostic command for
//! labels nobody registered.

mod factory;
mod fallback;
mod hue;
mod registry;
mod tuya;

pub use factory::{BuildError, GestureBinding, Services};
pub use fallback::FallbackCommand;
pub use hue::{HueTurnOffLights, HueTurnOnLights};
pub use registry::CommandRegistry;
pub use tuya::TuyaPressKeyInfraredAc;

/// Interface every command satisfies
pub trait Command {
    /// Short name for logs
    fn name(&self) -> &str;

    /// Run the command. May block on device I/O.
    fn execute(&self) -> anyhow::Result<()>;
}
