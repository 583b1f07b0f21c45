use serde_json::Value;

use crate::models::{CoreError, WorkflowKind};
use crate::workflows::context::{WorkflowContext, WorkflowServices};

pub const COMPLETION_MISSING_CREDENTIALS_MESSAGE: &str = "Missing Habitica credentials";

#[derive(Clone, Debug, PartialEq)]
pub enum CompletionOutcome {
    MissingCredentials,
    /// Carries the score payload returned by Habitica.
    Completed(Value),
    Failed(CoreError),
}

/// Scores a Habitica task up, marking a todo as done.
pub fn complete_task(
    services: &WorkflowServices,
    context: &WorkflowContext,
    task_id: &str,
) -> CompletionOutcome {
    let Some(credentials) = context.credentials.as_ref() else {
        services.notify(COMPLETION_MISSING_CREDENTIALS_MESSAGE);
        return CompletionOutcome::MissingCredentials;
    };

    let task_id = task_id.trim();
    match services.api(credentials).score_task_up(task_id) {
        Ok(score) => {
            tracing::info!(task_id, "habitica task completed");
            services.notify(&format!("Habitica task {task_id} completed."));
            CompletionOutcome::Completed(score)
        }
        Err(error) => {
            tracing::error!(
                task_id,
                kind = ?error.kind,
                message = %error.message,
                "failed to complete habitica task"
            );
            services.notify(&format!(
                "Failed to complete Habitica task: {}",
                error.message
            ));
            CompletionOutcome::Failed(error.in_workflow(WorkflowKind::TaskCompletion))
        }
    }
}
