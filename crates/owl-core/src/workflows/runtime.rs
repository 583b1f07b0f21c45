use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::models::{CoreError, CoreErrorKind, WorkflowKind};
use crate::workflows::completion::{CompletionOutcome, complete_task};
use crate::workflows::context::{WorkflowContext, WorkflowResult, WorkflowServices};
use crate::workflows::converter::{ConversionOutcome, sync_coins};
use crate::workflows::reconciler::{
    ImportOutcome, SyncOutcome, TodoSelection, import_todos_with_selection, sync_tasks,
};

type GuardKey = (String, WorkflowKind);

/// Runs workflows off the async executor and allows at most one invocation
/// per (user id, workflow kind) at a time; later invocations wait for the
/// running one to finish.
///
/// This keeps a single process from racing itself on the categorization tag
/// and on the coin balance. Other Habitica clients are not coordinated.
#[derive(Clone)]
pub struct WorkflowRuntime {
    services: WorkflowServices,
    guards: Arc<Mutex<HashMap<GuardKey, Arc<Mutex<()>>>>>,
}

impl WorkflowRuntime {
    pub fn new(services: WorkflowServices) -> Self {
        Self {
            services,
            guards: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn sync_tasks(&self) -> WorkflowResult<SyncOutcome> {
        self.run(WorkflowKind::TaskSync, sync_tasks).await
    }

    pub async fn sync_coins(&self) -> WorkflowResult<ConversionOutcome> {
        self.run(WorkflowKind::CoinConversion, sync_coins).await
    }

    pub async fn import_todos<F>(&self, deliver: F) -> WorkflowResult<ImportOutcome>
    where
        F: FnOnce(TodoSelection) + Send + 'static,
    {
        self.run(WorkflowKind::TaskImport, move |services, context| {
            import_todos_with_selection(services, context, deliver)
        })
        .await
    }

    pub async fn complete_task(
        &self,
        task_id: impl Into<String>,
    ) -> WorkflowResult<CompletionOutcome> {
        let task_id = task_id.into();
        self.run(WorkflowKind::TaskCompletion, move |services, context| {
            complete_task(services, context, &task_id)
        })
        .await
    }

    async fn run<T, F>(&self, kind: WorkflowKind, workflow: F) -> WorkflowResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&WorkflowServices, &WorkflowContext) -> T + Send + 'static,
    {
        let services = self.services.clone();
        let context = run_blocking(kind, move || services.resolve_context()).await?;

        // Without credentials the workflow only reports their absence.
        let guard = match context.user_id() {
            Some(user_id) => {
                let lock = self.guard_for((user_id.to_string(), kind)).await;
                if lock.try_lock().is_err() {
                    tracing::info!(workflow = %kind, "waiting for running invocation");
                }
                Some(lock.lock_owned().await)
            }
            None => None,
        };

        tracing::debug!(workflow = %kind, "workflow started");
        let services = self.services.clone();
        let result = run_blocking(kind, move || workflow(&services, &context)).await;
        drop(guard);
        tracing::debug!(workflow = %kind, "workflow finished");
        result
    }

    async fn guard_for(&self, key: GuardKey) -> Arc<Mutex<()>> {
        let mut guards = self.guards.lock().await;
        guards
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

async fn run_blocking<T, F>(kind: WorkflowKind, operation: F) -> WorkflowResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    tokio::task::spawn_blocking(operation)
        .await
        .map_err(|join_error| {
            CoreError::new(
                CoreErrorKind::Internal,
                format!("workflow join failure: {join_error}"),
            )
            .in_workflow(kind)
        })
}
