//! # Agent Runtime Core
//!
//! Orchestration core for an AI coding agent: an in-process event bus,
//! per-session cooperative cancellation, interactive tool-permission
//! approval, hidden-character sanitizing for commands, and a manager for
//! background agents that run prompts in child sessions without blocking
//! their caller.
//!
//! Sessions, prompt execution, agent definitions and configuration belong to
//! the host; it supplies them through the traits in [`collaborators`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use kodegen_agent_runtime::{AgentRuntime, Collaborators, Event, EventKind, SpawnRequest};
//!
//! # async fn example(collaborators: Collaborators) -> kodegen_agent_runtime::Result<()> {
//! let runtime = AgentRuntime::init(collaborators);
//!
//! let _sub = runtime.bus().subscribe(EventKind::BackgroundAgentCompleted, |envelope| {
//!     if let Event::BackgroundAgentCompleted { info } = &envelope.event {
//!         log::info!("{} finished after {} tools", info.id, info.progress.tool_count);
//!     }
//!     Ok(())
//! });
//!
//! let info = runtime
//!     .manager()
//!     .spawn(SpawnRequest::new("ses_parent", "Audit dependencies", "List outdated crates"))
//!     .await?;
//! assert!(runtime.manager().get(&info.id).is_some());
//!
//! runtime.teardown();
//! # Ok(())
//! # }
//! ```
//!
//! ## Sanitizing
//!
//! ```
//! use kodegen_agent_runtime::sanitize::{guard_command, sanitize};
//!
//! let result = sanitize("p\u{0430}yp\u{0430}l.com");
//! assert_eq!(result.normalized, "paypal.com");
//! assert!(result.suspicious);
//!
//! assert!(guard_command("rm -rf \u{202E}txt.exe").is_err());
//! ```
//!
//! ## Architecture
//!
//! - [`bus`]: Typed publish/subscribe hub with snapshot dispatch
//! - [`session_lock`]: Session id to cancellation token registry
//! - [`permissions`]: Tool-permission approval gate
//! - [`sanitize`]: Zero-width, BiDi, homoglyph and control character detection
//! - [`manager`]: Background agent manager
//! - [`runtime`]: Owned wiring of all of the above
//! - [`types`]: Shared data shapes and wire formats
//! - [`error`]: Error types and handling
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T, RuntimeError>`](Result):
//!
//! ```no_run
//! # use kodegen_agent_runtime::{AgentRuntime, RuntimeError, SpawnRequest};
//! # async fn example(runtime: &AgentRuntime) {
//! match runtime.manager().spawn(SpawnRequest::new("ses_parent", "Review", "Review the diff")).await {
//!     Ok(info) => log::info!("spawned {}", info.id),
//!     Err(RuntimeError::CapacityExceeded { max }) => {
//!         log::warn!("{} background agents already running", max);
//!     }
//!     Err(e) => log::error!("Error: {}", e),
//! }
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bus;
pub mod collaborators;
pub mod error;
pub mod manager;
pub mod permissions;
pub mod runtime;
pub mod sanitize;
pub mod session_lock;
pub mod types;

pub use bus::{Event, EventBus, EventEnvelope, EventKind, Subscription, WeakEventBus};
pub use collaborators::{AgentCatalog, Collaborators, ConfigSource, PromptService, SessionService};
pub use error::{Result, RuntimeError};
pub use manager::{ABORT_MESSAGE, BackgroundAgentManager, MAX_CONCURRENT};
pub use permissions::{AskInput, PermissionGate, PinValidator, Reply};
pub use runtime::AgentRuntime;
pub use sanitize::{
    SanitizeResult, SuspiciousKinds, format_sanitize_warning, guard_command,
    has_suspicious_chars, sanitize,
};
pub use session_lock::{SessionLock, SessionRun};
pub use types::{
    AgentDefinition, AgentTaskInfo, ModelRef, PermissionRequest, Response, ResponseKind,
    RuntimeConfig, SessionId, SpawnRequest, TaskId, TaskStatus,
};

/// Version of the runtime crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
