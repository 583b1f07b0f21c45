use std::collections::HashSet;

use crate::habitica::HabiticaApi;
use crate::models::{
    CoreError, CoreErrorKind, LocalSubtask, NewTodo, RemoteTask, TagId, WorkflowKind,
    checklist_notes,
};
use crate::workflows::context::{
    MISSING_CREDENTIALS_MESSAGE, WorkflowContext, WorkflowResult, WorkflowServices,
};
use crate::workflows::tags::CategorizationTag;

pub const NOTHING_TO_SYNC_MESSAGE: &str = "No tasks to sync.";
pub const LOCAL_TASKS_UNREADABLE_MESSAGE: &str =
    "Unable to read your local tasks. Please check the stored task list.";
pub const FETCH_FAILED_MESSAGE: &str =
    "Error fetching tasks from Habitica. Please check your settings.";
pub const IMPORT_FAILED_MESSAGE: &str =
    "Error importing todos from Habitica. Please check your settings.";

#[derive(Clone, Debug, PartialEq)]
pub enum SyncOutcome {
    MissingCredentials,
    NothingToSync,
    Failed(CoreError),
    Completed(SyncReport),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SyncReport {
    pub created: Vec<RemoteTask>,
    /// Texts skipped because a remote todo with the same text exists.
    pub already_present: Vec<String>,
    /// Local entries without usable text.
    pub invalid: usize,
    pub failed: Vec<TaskFailure>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TaskFailure {
    pub text: String,
    pub error: CoreError,
}

/// Remote todos split by the categorization tag, handed to import callers.
#[derive(Clone, Debug, PartialEq)]
pub struct TodoSelection {
    pub tag_id: TagId,
    pub tagged: Vec<RemoteTask>,
    pub all: Vec<RemoteTask>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum ImportOutcome {
    MissingCredentials,
    Delivered,
    Failed(CoreError),
}

/// Creates a remote todo for every local task whose text is not already a
/// remote todo text. Never updates or deletes remote tasks.
pub fn sync_tasks(services: &WorkflowServices, context: &WorkflowContext) -> SyncOutcome {
    let Some(credentials) = context.credentials.as_ref() else {
        services.notify(MISSING_CREDENTIALS_MESSAGE);
        return SyncOutcome::MissingCredentials;
    };

    let local_tasks = match services.state.tasks.local_tasks() {
        Ok(Some(tasks)) if !tasks.is_empty() => tasks,
        Ok(_) => {
            services.notify(NOTHING_TO_SYNC_MESSAGE);
            return SyncOutcome::NothingToSync;
        }
        Err(error) => {
            tracing::error!(
                kind = ?error.kind,
                message = %error.message,
                "failed to load local tasks"
            );
            services.notify(LOCAL_TASKS_UNREADABLE_MESSAGE);
            return SyncOutcome::Failed(error.in_workflow(WorkflowKind::TaskSync));
        }
    };

    for (index, task) in local_tasks.iter().enumerate() {
        tracing::debug!(index = index + 1, text = ?task.resolved_text(), "local task");
    }

    let api = services.api(credentials);
    let remote_tasks = match api.list_todos() {
        Ok(tasks) => tasks,
        Err(error) => {
            tracing::error!(
                kind = ?error.kind,
                message = %error.message,
                "failed to fetch remote todos"
            );
            services.notify(FETCH_FAILED_MESSAGE);
            return SyncOutcome::Failed(error.in_workflow(WorkflowKind::TaskSync));
        }
    };

    for (index, task) in remote_tasks.iter().enumerate() {
        tracing::debug!(index = index + 1, text = %task.text, id = %task.id, "remote todo");
    }

    let mut remote_texts: HashSet<String> =
        remote_tasks.into_iter().map(|task| task.text).collect();
    let mut tag = CategorizationTag::new(&api);
    let mut report = SyncReport::default();

    for (index, task) in local_tasks.iter().enumerate() {
        let Some(text) = task.resolved_text() else {
            tracing::warn!(index, task = ?task, "skipping local task without usable text");
            report.invalid += 1;
            continue;
        };

        if remote_texts.contains(&text) {
            tracing::info!(task_text = %text, "already exists");
            report.already_present.push(text);
            continue;
        }

        tracing::info!(task_text = %text, "will be created");
        match create_with_tag(services, &api, &mut tag, &text, &task.subtasks) {
            Ok(created) => {
                // Repeated local texts are created once per run.
                remote_texts.insert(text);
                report.created.push(created);
            }
            Err(error) => report.failed.push(TaskFailure { text, error }),
        }
    }

    tracing::info!(
        created = report.created.len(),
        already_present = report.already_present.len(),
        invalid = report.invalid,
        failed = report.failed.len(),
        "task sync finished"
    );
    SyncOutcome::Completed(report)
}

/// Creates one remote todo carrying the categorization tag and, when subtasks
/// are given, a checklist in its notes. Failures are reported to the user and
/// returned to the caller.
pub fn create_task(
    services: &WorkflowServices,
    context: &WorkflowContext,
    text: &str,
    subtasks: &[LocalSubtask],
) -> WorkflowResult<RemoteTask> {
    let Some(credentials) = context.credentials.as_ref() else {
        return Err(CoreError::new(
            CoreErrorKind::MissingCredentials,
            "Habitica credentials are not configured",
        )
        .in_workflow(WorkflowKind::TaskSync));
    };

    let api = services.api(credentials);
    let mut tag = CategorizationTag::new(&api);
    create_with_tag(services, &api, &mut tag, text, subtasks)
}

/// Fetches all remote todos, resolves the categorization tag, and hands both
/// the tagged subset and the full list to `deliver`.
pub fn import_todos_with_selection<F>(
    services: &WorkflowServices,
    context: &WorkflowContext,
    deliver: F,
) -> ImportOutcome
where
    F: FnOnce(TodoSelection),
{
    let Some(credentials) = context.credentials.as_ref() else {
        services.notify(MISSING_CREDENTIALS_MESSAGE);
        return ImportOutcome::MissingCredentials;
    };

    let api = services.api(credentials);
    let selection = api.list_todos().and_then(|all| {
        let tag_id = CategorizationTag::new(&api).id()?;
        let tagged = all
            .iter()
            .filter(|task| task.has_tag(&tag_id))
            .cloned()
            .collect();
        Ok(TodoSelection {
            tag_id,
            tagged,
            all,
        })
    });

    match selection {
        Ok(selection) => {
            tracing::info!(
                tag_id = %selection.tag_id,
                tagged = selection.tagged.len(),
                total = selection.all.len(),
                "delivering todo selection"
            );
            deliver(selection);
            ImportOutcome::Delivered
        }
        Err(error) => {
            tracing::error!(
                kind = ?error.kind,
                message = %error.message,
                "failed to import remote todos"
            );
            services.notify(IMPORT_FAILED_MESSAGE);
            ImportOutcome::Failed(error.in_workflow(WorkflowKind::TaskImport))
        }
    }
}

fn create_with_tag(
    services: &WorkflowServices,
    api: &HabiticaApi,
    tag: &mut CategorizationTag<'_>,
    text: &str,
    subtasks: &[LocalSubtask],
) -> WorkflowResult<RemoteTask> {
    let result = tag.id().and_then(|tag_id| {
        let todo = NewTodo::new(text, tag_id, checklist_notes(subtasks));
        api.create_task(&todo)
    });

    match result {
        Ok(created) => {
            tracing::info!(
                task_text = %text,
                id = %created.id,
                status = ?created.status,
                "task created"
            );
            let status = created
                .status
                .as_deref()
                .map(|status| format!(", status {status}"))
                .unwrap_or_default();
            services.notify(&format!(
                "Task '{text}' synced with Habitica (id {}{status}).",
                created.id
            ));
            Ok(created)
        }
        Err(error) => {
            tracing::error!(
                task_text = %text,
                kind = ?error.kind,
                message = %error.message,
                "error creating task"
            );
            services.notify(&format!(
                "Error syncing task '{text}'. Please check your Habitica settings."
            ));
            Err(error.in_workflow(WorkflowKind::TaskSync))
        }
    }
}
