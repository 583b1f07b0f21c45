pub mod credentials;
pub mod error;
pub mod tag;
pub mod task;
pub mod user;
pub mod workflow;

pub use credentials::{CLIENT_APP_NAME, Credentials};
pub use error::{CoreError, CoreErrorKind};
pub use tag::{CATEGORIZATION_TAG_NAME, Tag, TagId};
pub use task::{
    LocalSubtask, LocalTask, NewTodo, RemoteTask, checklist_notes, parse_local_tasks,
    resolve_text,
};
pub use user::{UserRecord, UserStats};
pub use workflow::{ApiOperation, WorkflowKind};
