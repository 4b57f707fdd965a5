//! Background agent management
//!
//! Provides `BackgroundAgentManager` for spawning agents into child sessions
//! without blocking the caller, tracking their progress from tool events,
//! and aborting them through the session lock.
//!
//! # Module Structure
//!
//! - `background_manager` - Core `BackgroundAgentManager` with public API
//! - `session` - Task registry and state transitions
//! - `background` - Detached prompt continuation
//! - `progress` - Tool event listeners
//! - `helpers` - Pure helper functions for spawn-time resolution

mod background;
mod background_manager;
mod helpers;
mod progress;
mod session;

pub use background_manager::{BackgroundAgentManager, MAX_CONCURRENT};
pub use session::ABORT_MESSAGE;
