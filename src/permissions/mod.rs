//! Approval gate for sensitive tool invocations
//!
//! Each request moves `pending -> resolved` exactly once. [`PermissionGate::ask`]
//! registers the request, announces it with `permission.requested` and waits on
//! a oneshot channel; [`PermissionGate::respond`] takes the request out of the
//! pending set and writes the response. A second response for the same id
//! finds nothing and reports [`RuntimeError::PermissionNotFound`].

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

use crate::bus::{Event, EventBus};
use crate::error::{Result, RuntimeError};
use crate::sanitize::guard_command;
use crate::types::identifiers::{IdGenerator, IdKind, RequestId, SessionId, ToolName};
use crate::types::permissions::{PermissionLevel, PermissionRequest, Response, ResponseKind};

/// Message carried by a reject without an explanation
const DEFAULT_REJECT_MESSAGE: &str = "The user rejected permission to use this tool";

/// Message used when a PIN-gated approval fails validation
const PIN_REJECT_MESSAGE: &str = "PIN validation failed";

/// Validates the secret required by `pin`-level requests
pub trait PinValidator: Send + Sync {
    /// True when `pin` unlocks approvals for `session_id`
    fn verify(&self, session_id: &SessionId, pin: &str) -> bool;
}

/// Parameters for [`PermissionGate::ask`]
#[derive(Debug, Clone)]
pub struct AskInput {
    /// Session the tool call runs in
    pub session_id: SessionId,
    /// Tool call id; at most one open request per session and call id
    pub call_id: Option<String>,
    /// Tool being invoked
    pub tool: ToolName,
    /// Tool arguments
    pub arguments: serde_json::Value,
    /// Requested approval level
    pub level: PermissionLevel,
    /// Title for the approval prompt
    pub title: Option<String>,
    /// Signature remembered by `always`; defaults to the arguments' JSON
    pub signature: Option<String>,
}

impl AskInput {
    /// Create an `ask`-level request
    pub fn new(
        session_id: impl Into<SessionId>,
        tool: impl Into<ToolName>,
        arguments: serde_json::Value,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            call_id: None,
            tool: tool.into(),
            arguments,
            level: PermissionLevel::Ask,
            title: None,
            signature: None,
        }
    }

    /// Set the tool call id
    #[must_use]
    pub fn call_id(mut self, call_id: impl Into<String>) -> Self {
        self.call_id = Some(call_id.into());
        self
    }

    /// Set the approval level
    #[must_use]
    pub const fn level(mut self, level: PermissionLevel) -> Self {
        self.level = level;
        self
    }

    /// Set the prompt title
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the signature remembered by `always`
    #[must_use]
    pub fn signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }
}

/// Resolution submitted by a responder
#[derive(Debug, Clone)]
pub struct Reply {
    /// Session of the request
    pub session_id: SessionId,
    /// Request being resolved
    pub request_id: RequestId,
    /// Response as received over the wire
    pub response: Response,
    /// PIN for `pin`-level requests
    pub pin: Option<String>,
}

impl Reply {
    /// Create a reply without a PIN
    pub fn new(
        session_id: impl Into<SessionId>,
        request_id: impl Into<RequestId>,
        response: Response,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            request_id: request_id.into(),
            response,
            pin: None,
        }
    }

    /// Attach a PIN
    #[must_use]
    pub fn with_pin(mut self, pin: impl Into<String>) -> Self {
        self.pin = Some(pin.into());
        self
    }
}

struct Pending {
    request: PermissionRequest,
    reply_tx: oneshot::Sender<Response>,
}

#[derive(Default)]
struct GateState {
    pending: HashMap<RequestId, Pending>,
    /// `always` approvals per session, with the level they were granted at
    approved: HashMap<SessionId, HashMap<(ToolName, String), PermissionLevel>>,
}

/// True when an approval granted at `granted` may stand in for a request at
/// `wanted`; only a PIN-validated approval covers `pin`-level requests
fn covers(granted: PermissionLevel, wanted: PermissionLevel) -> bool {
    wanted != PermissionLevel::Pin || granted == PermissionLevel::Pin
}

/// Per-session pending-approval registry
pub struct PermissionGate {
    bus: EventBus,
    ids: Arc<dyn IdGenerator>,
    pin_validator: Option<Arc<dyn PinValidator>>,
    state: Mutex<GateState>,
}

impl PermissionGate {
    /// Create a gate publishing on `bus`
    pub fn new(bus: EventBus, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            bus,
            ids,
            pin_validator: None,
            state: Mutex::new(GateState::default()),
        }
    }

    /// Install the validator used for `pin`-level requests
    ///
    /// Without a validator every `pin`-level approval is turned into a reject.
    #[must_use]
    pub fn with_pin_validator(mut self, validator: Arc<dyn PinValidator>) -> Self {
        self.pin_validator = Some(validator);
        self
    }

    /// Ask for approval and wait for the resolution
    ///
    /// Returns the approving response (`once` or `always`, including any
    /// `agent`/`answers`). A remembered `always` approval for the same tool
    /// and signature in this session resolves immediately, except that a
    /// `pin`-level request is only covered by an approval that passed the PIN.
    ///
    /// # Errors
    /// - [`RuntimeError::SecurityViolation`] if the surfaced command contains BiDi overrides
    /// - [`RuntimeError::PermissionPending`] if the call id already has an open request
    /// - [`RuntimeError::PermissionRejected`] if the responder rejected
    /// - [`RuntimeError::Aborted`] if `cancel` fires first or the gate is torn down
    pub async fn ask(&self, input: AskInput, cancel: &CancellationToken) -> Result<Response> {
        if cancel.is_cancelled() {
            return Err(RuntimeError::aborted(format!(
                "Session {} was aborted",
                input.session_id
            )));
        }

        let warning = match input.arguments.get("command").and_then(|v| v.as_str()) {
            Some(command) => guard_command(command)?.warning,
            None => None,
        };
        let signature = input
            .signature
            .unwrap_or_else(|| input.arguments.to_string());

        let (request, reply_rx) = {
            let mut state = self.state.lock();

            let key = (input.tool.clone(), signature.clone());
            if state
                .approved
                .get(&input.session_id)
                .and_then(|approved| approved.get(&key))
                .is_some_and(|granted| covers(*granted, input.level))
            {
                log::debug!(
                    "Tool {} already approved for session {}",
                    input.tool,
                    input.session_id
                );
                return Ok(Response::always());
            }

            if let Some(call_id) = &input.call_id
                && state.pending.values().any(|p| {
                    p.request.session_id == input.session_id
                        && p.request.call_id.as_deref() == Some(call_id.as_str())
                })
            {
                return Err(RuntimeError::PermissionPending {
                    session_id: input.session_id.to_string(),
                    call_id: call_id.clone(),
                });
            }

            let request = PermissionRequest {
                id: RequestId::new(self.ids.ascending(IdKind::Permission)),
                session_id: input.session_id,
                call_id: input.call_id,
                tool: input.tool,
                arguments: input.arguments,
                signature,
                level: input.level,
                title: input.title,
                warning,
                created_at: Utc::now(),
            };
            let (reply_tx, reply_rx) = oneshot::channel();
            state.pending.insert(
                request.id.clone(),
                Pending {
                    request: request.clone(),
                    reply_tx,
                },
            );
            (request, reply_rx)
        };

        log::info!(
            "Permission {} requested for tool {} in session {}",
            request.id,
            request.tool,
            request.session_id
        );
        let request_id = request.id.clone();
        let session_id = request.session_id.clone();
        self.bus.publish(Event::PermissionRequested { request });

        tokio::select! {
            biased;
            reply = reply_rx => match reply {
                Ok(response) if response.is_approval() => Ok(response),
                Ok(response) => Err(RuntimeError::permission_rejected(
                    response.message().unwrap_or(DEFAULT_REJECT_MESSAGE),
                )),
                Err(_) => Err(RuntimeError::aborted(format!(
                    "Permission request {request_id} was dropped"
                ))),
            },
            () = cancel.cancelled() => {
                self.state.lock().pending.remove(&request_id);
                log::debug!("Permission {} abandoned, session {} aborted", request_id, session_id);
                Err(RuntimeError::aborted(format!("Session {session_id} was aborted")))
            }
        }
    }

    /// Resolve a pending request
    ///
    /// An approving response to a `pin`-level request is replaced by a reject
    /// unless the PIN validates. An effective `always` is remembered for the
    /// session and also resolves other pending requests with the same tool
    /// and signature; `pin`-level siblings stay pending unless the approval
    /// itself passed the PIN.
    ///
    /// # Errors
    /// Returns [`RuntimeError::PermissionNotFound`] for an unknown or already
    /// resolved id, or an id belonging to another session
    pub fn respond(&self, reply: Reply) -> Result<()> {
        let mut resolved = Vec::new();
        {
            let mut state = self.state.lock();
            let belongs = state
                .pending
                .get(&reply.request_id)
                .is_some_and(|p| p.request.session_id == reply.session_id);
            let pending = belongs
                .then(|| state.pending.remove(&reply.request_id))
                .flatten()
                .ok_or_else(|| RuntimeError::permission_not_found(reply.request_id.as_str()))?;

            let response = self.effective_response(&pending.request, reply.response, reply.pin);

            if response.kind() == ResponseKind::Always {
                let key = (pending.request.tool.clone(), pending.request.signature.clone());
                let granted_level = pending.request.level;
                let granted = state
                    .approved
                    .entry(pending.request.session_id.clone())
                    .or_default()
                    .entry(key)
                    .or_insert(granted_level);
                if granted_level == PermissionLevel::Pin {
                    *granted = PermissionLevel::Pin;
                }

                let siblings: Vec<RequestId> = state
                    .pending
                    .values()
                    .filter(|p| {
                        p.request.session_id == pending.request.session_id
                            && p.request.tool == pending.request.tool
                            && p.request.signature == pending.request.signature
                            && covers(granted_level, p.request.level)
                    })
                    .map(|p| p.request.id.clone())
                    .collect();
                for id in siblings {
                    if let Some(sibling) = state.pending.remove(&id) {
                        resolved.push((sibling, response.clone()));
                    }
                }
            }
            resolved.insert(0, (pending, response));
        }

        for (pending, response) in resolved {
            self.deliver(pending, response);
        }
        Ok(())
    }

    fn effective_response(
        &self,
        request: &PermissionRequest,
        response: Response,
        pin: Option<String>,
    ) -> Response {
        if request.level != PermissionLevel::Pin || !response.is_approval() {
            return response;
        }
        let valid = match (&self.pin_validator, pin.as_deref()) {
            (Some(validator), Some(pin)) => validator.verify(&request.session_id, pin),
            _ => false,
        };
        if valid {
            response
        } else {
            log::warn!(
                "PIN validation failed for permission {} in session {}",
                request.id,
                request.session_id
            );
            Response::reject_with(PIN_REJECT_MESSAGE)
        }
    }

    fn deliver(&self, pending: Pending, response: Response) {
        let Pending { request, reply_tx } = pending;
        log::info!(
            "Permission {} resolved as {:?} in session {}",
            request.id,
            response.kind(),
            request.session_id
        );
        self.bus.publish(Event::PermissionReplied {
            session_id: request.session_id.clone(),
            request_id: request.id.clone(),
            response: response.clone(),
        });
        if reply_tx.send(response).is_err() {
            log::debug!("Permission {} resolved after its asker went away", request.id);
        }
    }

    /// Pending requests, optionally limited to one session, oldest first
    #[must_use]
    pub fn pending(&self, session_id: Option<&SessionId>) -> Vec<PermissionRequest> {
        let state = self.state.lock();
        let mut requests: Vec<PermissionRequest> = state
            .pending
            .values()
            .filter(|p| session_id.is_none_or(|sid| &p.request.session_id == sid))
            .map(|p| p.request.clone())
            .collect();
        requests.sort_by(|a, b| a.id.cmp(&b.id));
        requests
    }

    /// Reject everything pending for a session and forget its approvals
    ///
    /// Returns the number of requests rejected.
    pub fn clear_session(&self, session_id: &SessionId) -> usize {
        let drained: Vec<Pending> = {
            let mut state = self.state.lock();
            state.approved.remove(session_id);
            let ids: Vec<RequestId> = state
                .pending
                .values()
                .filter(|p| &p.request.session_id == session_id)
                .map(|p| p.request.id.clone())
                .collect();
            ids.iter()
                .filter_map(|id| state.pending.remove(id))
                .collect()
        };
        let count = drained.len();
        for pending in drained {
            self.deliver(pending, Response::reject_with("Session ended"));
        }
        count
    }

    /// Reject everything pending and forget all approvals
    pub fn teardown(&self) {
        let drained: Vec<Pending> = {
            let mut state = self.state.lock();
            state.approved.clear();
            state.pending.drain().map(|(_, pending)| pending).collect()
        };
        if !drained.is_empty() {
            log::info!("Rejecting {} pending permission request(s) on teardown", drained.len());
        }
        for pending in drained {
            self.deliver(pending, Response::reject_with("Runtime shutting down"));
        }
    }
}
