//! Fire-and-forget continuation driving one background task
//!
//! The continuation owns the task's [`SessionRun`] and progress listener.
//! Whatever way the prompt settles, it unsubscribes the listener once,
//! performs the terminal transition if the task is still running, and
//! releases the session registration.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::bus::{Event, EventBus};
use crate::collaborators::PromptService;
use crate::error::{Result, RuntimeError};
use crate::session_lock::SessionRun;
use crate::types::identifiers::TaskId;
use crate::types::session::PromptRequest;
use crate::types::task::TaskStatus;

use super::progress::ProgressListener;
use super::session::{ABORT_MESSAGE, TaskRegistry};

/// Everything the continuation owns
pub(super) struct Continuation {
    pub task_id: TaskId,
    pub run: SessionRun,
    pub listener: ProgressListener,
    pub registry: TaskRegistry,
    pub bus: EventBus,
    pub prompts: Arc<dyn PromptService>,
    /// Prompt request with `parts` still empty
    pub request: PromptRequest,
    /// Prompt text to resolve into parts
    pub text: String,
}

/// Launch the continuation without waiting for it
pub(super) fn spawn_continuation(ctx: Continuation) {
    tokio::spawn(run(ctx));
}

async fn run(ctx: Continuation) {
    let Continuation {
        task_id,
        run,
        listener,
        registry,
        bus,
        prompts,
        request,
        text,
    } = ctx;

    let token = run.token().clone();
    let outcome = tokio::select! {
        biased;
        () = token.cancelled() => Err(RuntimeError::aborted(ABORT_MESSAGE)),
        result = drive(prompts.as_ref(), request, &text, token.clone()) => result,
    };

    listener.unsubscribe();
    settle(&registry, &bus, &task_id, outcome, token.is_cancelled());
    drop(run);
}

async fn drive(
    prompts: &dyn PromptService,
    mut request: PromptRequest,
    text: &str,
    token: CancellationToken,
) -> Result<()> {
    request.parts = prompts.resolve_prompt_parts(text).await?;
    prompts.prompt(request, token).await
}

/// Apply the terminal transition for a settled prompt
///
/// A task already moved out of `running` (by `abort` or teardown) is left
/// as is and nothing is published.
fn settle(
    registry: &TaskRegistry,
    bus: &EventBus,
    task_id: &TaskId,
    outcome: Result<()>,
    cancelled: bool,
) {
    let (status, error) = match outcome {
        Ok(()) => (TaskStatus::Completed, None),
        Err(e) if cancelled || e.is_aborted() => {
            (TaskStatus::Aborted, Some(ABORT_MESSAGE.to_string()))
        }
        Err(e) => (TaskStatus::Failed, Some(e.to_string())),
    };

    let Some(info) = registry
        .with_task(task_id, |entry| entry.finish(status, error.clone()))
        .flatten()
    else {
        log::debug!("Background agent {} already settled", task_id);
        return;
    };

    match (status, error) {
        (TaskStatus::Completed, _) => {
            log::info!("Background agent {} completed", task_id);
            bus.publish(Event::BackgroundAgentCompleted { info });
        }
        (_, error) => {
            let error = error.unwrap_or_default();
            log::warn!("Background agent {} ended: {}", task_id, error);
            bus.publish(Event::BackgroundAgentFailed { info, error });
        }
    }
}
