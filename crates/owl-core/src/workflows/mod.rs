pub mod completion;
pub mod context;
pub mod converter;
pub mod reconciler;
pub mod runtime;
pub mod tags;

pub use completion::{COMPLETION_MISSING_CREDENTIALS_MESSAGE, CompletionOutcome, complete_task};
pub use context::{MISSING_CREDENTIALS_MESSAGE, WorkflowContext, WorkflowResult, WorkflowServices};
pub use converter::{
    CONVERSION_FAILED_MESSAGE, ConversionOutcome, ConversionSummary, INVALID_RATE_MESSAGE,
    NO_COINS_MESSAGE, ObservedBalance, WithdrawnCoins, parse_accumulator, parse_conversion_rate,
    sync_coins,
};
pub use reconciler::{
    FETCH_FAILED_MESSAGE, IMPORT_FAILED_MESSAGE, ImportOutcome, LOCAL_TASKS_UNREADABLE_MESSAGE,
    NOTHING_TO_SYNC_MESSAGE, SyncOutcome, SyncReport, TaskFailure, TodoSelection, create_task,
    import_todos_with_selection, sync_tasks,
};
pub use runtime::WorkflowRuntime;
pub use tags::{CategorizationTag, TagLookup, ensure_categorization_tag, find_categorization_tag};
