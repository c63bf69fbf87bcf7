//! Domain layer containing core business logic.
//!
//! This module contains:
//! - Output processors, their registry and the compression engine
//! - Hook input/output and routing result types
//! - Shell command inspection
//! - Logger with rotation

mod engine;
mod error;
pub mod logger;
pub mod parser;
pub mod processors;
mod types;

pub use engine::{install_panic_hook, Engine};
pub use error::SaverError;
pub use processors::Registry;
pub use types::{HookInput, HookOutput, RoutingResult, SessionMessage};
