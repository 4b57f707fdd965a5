//! Background agent manager implementation
//!
//! This module is organized into logical submodules:
//! - `core`: Core struct, constructor and shutdown
//! - `spawn`: Task spawning
//! - `list`: Registry queries
//! - `interaction`: Abort and registry cleanup

mod core;
mod interaction;
mod list;
mod spawn;

pub use self::core::{BackgroundAgentManager, MAX_CONCURRENT};
