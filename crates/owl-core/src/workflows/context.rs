use std::sync::Arc;

use crate::habitica::{DEFAULT_API_URL, HabiticaApi, HttpTransport};
use crate::models::{CoreError, Credentials};
use crate::notification::Notifier;
use crate::persistence::LocalState;

pub type WorkflowResult<T> = Result<T, CoreError>;

pub const MISSING_CREDENTIALS_MESSAGE: &str = "Please enter your Habitica User ID and API Token.";

/// Configuration resolved once at the start of a workflow invocation and
/// passed to every step of that invocation.
#[derive(Clone, Debug, Default)]
pub struct WorkflowContext {
    pub credentials: Option<Credentials>,
    pub conversion_rate: Option<String>,
}

impl WorkflowContext {
    /// Reads credentials and the conversion rate. Unreadable values degrade to
    /// absent so that the workflow reports them like missing configuration.
    pub fn resolve(state: &LocalState) -> Self {
        let credentials = state.credentials.credentials().unwrap_or_else(|error| {
            tracing::error!(
                kind = ?error.kind,
                message = %error.message,
                "failed to read stored credentials"
            );
            None
        });
        let conversion_rate = state.settings.conversion_rate().unwrap_or_else(|error| {
            tracing::error!(
                kind = ?error.kind,
                message = %error.message,
                "failed to read stored conversion rate"
            );
            None
        });

        Self {
            credentials,
            conversion_rate,
        }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.credentials.as_ref().map(Credentials::user_id)
    }
}

/// Collaborators shared by all workflows.
#[derive(Clone)]
pub struct WorkflowServices {
    pub state: LocalState,
    pub transport: Arc<dyn HttpTransport>,
    pub notifier: Arc<dyn Notifier>,
    pub api_base_url: String,
}

impl WorkflowServices {
    pub fn new(
        state: LocalState,
        transport: Arc<dyn HttpTransport>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            state,
            transport,
            notifier,
            api_base_url: DEFAULT_API_URL.to_string(),
        }
    }

    pub fn with_api_base_url(mut self, api_base_url: impl Into<String>) -> Self {
        self.api_base_url = api_base_url.into();
        self
    }

    pub fn resolve_context(&self) -> WorkflowContext {
        WorkflowContext::resolve(&self.state)
    }

    pub fn api(&self, credentials: &Credentials) -> HabiticaApi {
        HabiticaApi::new(self.transport.clone(), credentials.clone())
            .with_base_url(self.api_base_url.as_str())
    }

    pub(crate) fn notify(&self, message: &str) {
        tracing::info!(message, "notifying user");
        self.notifier.notify(message);
    }
}
