//! InkBoard application shell.
//!
//! Opens a cached board with history attached, runs edit scripts against it,
//! and exports or resets it.

mod config;
mod prompt;
mod script;
mod session;

pub use config::AppConfig;
pub use prompt::confirm;
pub use script::{Command, ExportFormat, StyleOverrides, parse_script};
pub use session::{Outcome, Session};
