//! Host adapters for the platform ports
//!
//! On a phone these ports are answered by the operating system. On a server,
//! gateway or desktop host they are answered here:
//! - `permissions`: consent from configuration or from the operator's terminal
//! - `provider`: location samples from a fixed position or a recorded route
//! - `indicator`: the persistent "tracking active" notice on the terminal

pub mod indicator;
pub mod permissions;
pub mod provider;

pub use indicator::ConsoleIndicator;
pub use permissions::{PromptPermissions, StaticPermissions};
pub use provider::{ReplayProvider, StaticProvider};
