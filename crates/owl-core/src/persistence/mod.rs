use std::sync::Arc;

use crate::models::{CoreError, Credentials, LocalTask};

pub type PersistenceResult<T> = Result<T, CoreError>;

pub trait MigrationStore: Send + Sync {
    fn current_version(&self) -> PersistenceResult<i64>;

    fn apply_migration(&self, target_version: i64) -> PersistenceResult<()>;
}

pub trait CredentialStore: Send + Sync {
    /// Returns `None` unless both the user id and the API token are stored.
    fn credentials(&self) -> PersistenceResult<Option<Credentials>>;

    fn save_credentials(&self, user_id: &str, api_token: &str) -> PersistenceResult<()>;
}

pub trait LocalTaskStore: Send + Sync {
    /// Returns the locally created tasks in their stored order, or `None` when
    /// no list has ever been stored.
    fn local_tasks(&self) -> PersistenceResult<Option<Vec<LocalTask>>>;

    /// Replaces the stored list with a raw JSON array document.
    fn replace_local_tasks(&self, tasks_json: &str) -> PersistenceResult<()>;
}

pub trait SettingsStore: Send + Sync {
    /// Raw conversion rate (coins per minute) as entered by the user.
    fn conversion_rate(&self) -> PersistenceResult<Option<String>>;

    fn set_conversion_rate(&self, rate: &str) -> PersistenceResult<()>;

    /// Raw accumulated vacation minutes.
    fn vacation_time(&self) -> PersistenceResult<Option<String>>;

    fn set_vacation_time(&self, minutes: f64) -> PersistenceResult<()>;
}

/// The local collaborators a workflow reads from and writes to.
#[derive(Clone)]
pub struct LocalState {
    pub credentials: Arc<dyn CredentialStore>,
    pub tasks: Arc<dyn LocalTaskStore>,
    pub settings: Arc<dyn SettingsStore>,
}

impl LocalState {
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: CredentialStore + LocalTaskStore + SettingsStore + 'static,
    {
        Self {
            credentials: store.clone(),
            tasks: store.clone(),
            settings: store,
        }
    }
}
