use std::fmt::{Display, Formatter};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum WorkflowKind {
    TaskSync,
    TaskImport,
    CoinConversion,
    TaskCompletion,
}

impl WorkflowKind {
    pub const ALL: [WorkflowKind; 4] = [
        WorkflowKind::TaskSync,
        WorkflowKind::TaskImport,
        WorkflowKind::CoinConversion,
        WorkflowKind::TaskCompletion,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TaskSync => "task_sync",
            Self::TaskImport => "task_import",
            Self::CoinConversion => "coin_conversion",
            Self::TaskCompletion => "task_completion",
        }
    }
}

impl Display for WorkflowKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Remote calls issued against the Habitica v3 API.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum ApiOperation {
    ListTags,
    CreateTag,
    ListTodos,
    CreateTask,
    GetUser,
    UpdateUser,
    ScoreTask,
}

impl ApiOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ListTags => "list_tags",
            Self::CreateTag => "create_tag",
            Self::ListTodos => "list_todos",
            Self::CreateTask => "create_task",
            Self::GetUser => "get_user",
            Self::UpdateUser => "update_user",
            Self::ScoreTask => "score_task",
        }
    }

    pub fn is_mutating(self) -> bool {
        matches!(
            self,
            Self::CreateTag | Self::CreateTask | Self::UpdateUser | Self::ScoreTask
        )
    }
}
