use thiserror::Error;

use crate::models::{ApiOperation, WorkflowKind};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum CoreErrorKind {
    MissingCredentials,
    InvalidInput,
    ParseFailure,
    Transport,
    Api,
    StorageFailure,
    Internal,
}

#[derive(Clone, Debug, Eq, PartialEq, Error)]
#[error("{kind:?}: {message}")]
pub struct CoreError {
    pub workflow: Option<WorkflowKind>,
    pub operation: Option<ApiOperation>,
    pub kind: CoreErrorKind,
    pub message: String,
}

impl CoreError {
    pub fn new(kind: CoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            workflow: None,
            operation: None,
            kind,
            message: message.into(),
        }
    }

    /// Attributes the error to a workflow unless an inner layer already did.
    pub fn in_workflow(mut self, workflow: WorkflowKind) -> Self {
        self.workflow = self.workflow.or(Some(workflow));
        self
    }

    pub fn during(mut self, operation: ApiOperation) -> Self {
        self.operation = self.operation.or(Some(operation));
        self
    }
}
