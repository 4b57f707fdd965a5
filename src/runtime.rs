//! Process-wide runtime wiring
//!
//! [`AgentRuntime`] owns the bus, the session lock, the permission gate and
//! the background agent manager. Teardown runs once, either explicitly or
//! when the runtime is dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::bus::EventBus;
use crate::collaborators::Collaborators;
use crate::manager::BackgroundAgentManager;
use crate::permissions::{PermissionGate, PinValidator};
use crate::session_lock::SessionLock;

/// Owned runtime state
pub struct AgentRuntime {
    bus: EventBus,
    session_lock: SessionLock,
    permissions: Arc<PermissionGate>,
    manager: Arc<BackgroundAgentManager>,
    collaborators: Collaborators,
    torn_down: AtomicBool,
}

impl AgentRuntime {
    /// Build every component around the given collaborators
    #[must_use]
    pub fn init(collaborators: Collaborators) -> Self {
        let bus = EventBus::new();
        let session_lock = SessionLock::new();
        let permissions = Arc::new(PermissionGate::new(
            bus.clone(),
            Arc::clone(&collaborators.ids),
        ));
        let manager = Arc::new(BackgroundAgentManager::new(
            bus.clone(),
            session_lock.clone(),
            collaborators.clone(),
        ));
        log::debug!("Agent runtime initialized");
        Self {
            bus,
            session_lock,
            permissions,
            manager,
            collaborators,
            torn_down: AtomicBool::new(false),
        }
    }

    /// Require a PIN for `pin`-level permission requests
    #[must_use]
    pub fn with_pin_validator(mut self, validator: Arc<dyn PinValidator>) -> Self {
        self.permissions = Arc::new(
            PermissionGate::new(self.bus.clone(), Arc::clone(&self.collaborators.ids))
                .with_pin_validator(validator),
        );
        self
    }

    /// Event bus
    #[must_use]
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Session cancellation registry
    #[must_use]
    pub fn session_lock(&self) -> &SessionLock {
        &self.session_lock
    }

    /// Permission gate
    #[must_use]
    pub fn permissions(&self) -> &Arc<PermissionGate> {
        &self.permissions
    }

    /// Background agent manager
    #[must_use]
    pub fn manager(&self) -> &Arc<BackgroundAgentManager> {
        &self.manager
    }

    /// Release all runtime state
    ///
    /// Aborts running background agents, rejects pending permission requests
    /// and drops every bus subscriber. Returns `false` if teardown already ran.
    pub fn teardown(&self) -> bool {
        if self.torn_down.swap(true, Ordering::SeqCst) {
            return false;
        }
        log::info!("Tearing down agent runtime...");
        self.manager.shutdown();
        self.permissions.teardown();
        let signalled = self.session_lock.abort_all();
        if signalled > 0 {
            log::debug!("Signalled {} remaining sessions", signalled);
        }
        self.bus.teardown();
        log::info!("Agent runtime teardown complete");
        true
    }

    /// True once teardown ran
    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }
}

impl Drop for AgentRuntime {
    fn drop(&mut self) {
        self.teardown();
    }
}
