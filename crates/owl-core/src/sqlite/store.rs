use std::cmp::Ordering;
use std::fs;
use std::path::{Path, PathBuf};

use rusqlite::{Connection, OptionalExtension};

use crate::models::{CoreError, CoreErrorKind, Credentials, LocalTask, parse_local_tasks};
use crate::persistence::{
    CredentialStore, LocalTaskStore, MigrationStore, PersistenceResult, SettingsStore,
};
use crate::sqlite::migrations::{SqliteMigration, current_schema_version, migration, migrations};

const MIGRATIONS_TABLE: &str = "owl_schema_migrations";

/// Keys of the local key/value state.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum StateKey {
    UserId,
    ApiToken,
    Tasks,
    ConversionRate,
    VacationTime,
}

impl StateKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::UserId => "habitica_user_id",
            Self::ApiToken => "habitica_api_token",
            Self::Tasks => "tasks",
            Self::ConversionRate => "habitica_coin_conversion_rate",
            Self::VacationTime => "vacation_time",
        }
    }
}

pub struct SqliteStore {
    database_path: PathBuf,
}

impl SqliteStore {
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
        }
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn planned_migrations(&self, from_version: i64) -> Vec<&'static SqliteMigration> {
        migrations()
            .iter()
            .filter(|entry| entry.version > from_version)
            .collect()
    }

    pub fn migrate_to_latest(&self) -> PersistenceResult<()> {
        self.apply_migration(current_schema_version())
    }

    pub fn value(&self, key: StateKey) -> PersistenceResult<Option<String>> {
        self.with_connection("value", |connection| {
            ensure_schema_ready(connection)?;
            read_value(connection, key)
        })
    }

    pub fn set_value(&self, key: StateKey, value: &str) -> PersistenceResult<()> {
        self.with_connection("set_value", |connection| {
            ensure_schema_ready(connection)?;
            write_value(connection, key, value)
        })
    }

    pub fn clear_value(&self, key: StateKey) -> PersistenceResult<()> {
        self.with_connection("clear_value", |connection| {
            ensure_schema_ready(connection)?;
            connection.execute(
                "DELETE FROM local_state WHERE state_key = ?1",
                [key.as_str()],
            )?;
            Ok(())
        })
    }

    fn with_connection<T>(
        &self,
        operation_name: &str,
        operation: impl FnOnce(&mut Connection) -> rusqlite::Result<T>,
    ) -> PersistenceResult<T> {
        let mut connection = open_database(&self.database_path)
            .map_err(|error| storage_error(operation_name, error))?;
        operation(&mut connection).map_err(|error| storage_error(operation_name, error))
    }
}

impl MigrationStore for SqliteStore {
    fn current_version(&self) -> PersistenceResult<i64> {
        self.with_connection("current_version", |connection| {
            ensure_migrations_table(connection)?;
            schema_version(connection)
        })
    }

    fn apply_migration(&self, target_version: i64) -> PersistenceResult<()> {
        let latest = current_schema_version();
        if !(0..=latest).contains(&target_version) {
            return Err(storage_error_text(
                "apply_migration",
                format!("target version {target_version} is outside 0..={latest}"),
            ));
        }

        self.with_connection("apply_migration", |connection| {
            ensure_migrations_table(connection)?;
            let recorded = schema_version(connection)?;

            match target_version.cmp(&recorded) {
                Ordering::Greater => {
                    for version in recorded + 1..=target_version {
                        run_step(connection, defined_migration(version)?, Step::Up)?;
                    }
                }
                Ordering::Less => {
                    for version in (target_version + 1..=recorded).rev() {
                        run_step(connection, defined_migration(version)?, Step::Down)?;
                    }
                }
                // Tables dropped behind the bookkeeping's back are recreated;
                // every up script is idempotent.
                Ordering::Equal => {
                    for entry in migrations()
                        .iter()
                        .take_while(|entry| entry.version <= target_version)
                    {
                        connection.execute_batch(entry.up_sql)?;
                    }
                }
            }
            Ok(())
        })
    }
}

impl CredentialStore for SqliteStore {
    fn credentials(&self) -> PersistenceResult<Option<Credentials>> {
        self.with_connection("credentials", |connection| {
            ensure_schema_ready(connection)?;
            let user_id = read_value(connection, StateKey::UserId)?;
            let api_token = read_value(connection, StateKey::ApiToken)?;
            Ok(Credentials::from_parts(user_id, api_token))
        })
    }

    fn save_credentials(&self, user_id: &str, api_token: &str) -> PersistenceResult<()> {
        let credentials =
            Credentials::from_parts(Some(user_id.to_string()), Some(api_token.to_string()))
                .ok_or_else(|| {
                    CoreError::new(
                        CoreErrorKind::InvalidInput,
                        "user id and API token must both be non-empty",
                    )
                })?;

        self.with_connection("save_credentials", |connection| {
            ensure_schema_ready(connection)?;
            let transaction = connection.transaction()?;
            write_value(&transaction, StateKey::UserId, credentials.user_id())?;
            write_value(&transaction, StateKey::ApiToken, credentials.api_token())?;
            transaction.commit()?;
            Ok(())
        })
    }
}

impl LocalTaskStore for SqliteStore {
    fn local_tasks(&self) -> PersistenceResult<Option<Vec<LocalTask>>> {
        let Some(raw) = self.value(StateKey::Tasks)? else {
            return Ok(None);
        };
        // A JSON `null` document means no list, like a missing key.
        if matches!(raw.trim(), "" | "null") {
            return Ok(None);
        }
        parse_local_tasks(&raw).map(Some)
    }

    fn replace_local_tasks(&self, tasks_json: &str) -> PersistenceResult<()> {
        parse_local_tasks(tasks_json)?;
        self.set_value(StateKey::Tasks, tasks_json)
    }
}

impl SettingsStore for SqliteStore {
    fn conversion_rate(&self) -> PersistenceResult<Option<String>> {
        self.value(StateKey::ConversionRate)
    }

    fn set_conversion_rate(&self, rate: &str) -> PersistenceResult<()> {
        self.set_value(StateKey::ConversionRate, rate.trim())
    }

    fn vacation_time(&self) -> PersistenceResult<Option<String>> {
        self.value(StateKey::VacationTime)
    }

    fn set_vacation_time(&self, minutes: f64) -> PersistenceResult<()> {
        if !minutes.is_finite() {
            return Err(CoreError::new(
                CoreErrorKind::InvalidInput,
                format!("vacation time must be a finite number, got {minutes}"),
            ));
        }
        self.set_value(StateKey::VacationTime, &minutes.to_string())
    }
}

fn open_database(database_path: &Path) -> rusqlite::Result<Connection> {
    let parent = database_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty());
    if let Some(parent) = parent {
        fs::create_dir_all(parent)
            .map_err(|error| rusqlite::Error::ToSqlConversionFailure(Box::new(error)))?;
    }
    Connection::open(database_path)
}

fn ensure_migrations_table(connection: &Connection) -> rusqlite::Result<()> {
    connection.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {MIGRATIONS_TABLE} (\
             version INTEGER PRIMARY KEY, \
             name TEXT NOT NULL, \
             applied_at_unix INTEGER NOT NULL\
         );"
    ))
}

/// Local state is only readable once the first migration has run.
fn ensure_schema_ready(connection: &Connection) -> rusqlite::Result<()> {
    ensure_migrations_table(connection)?;
    if schema_version(connection)? < 1 {
        return Err(sqlite_failure(
            "local state is not initialized; run migrations first",
        ));
    }
    Ok(())
}

fn schema_version(connection: &Connection) -> rusqlite::Result<i64> {
    connection.query_row(
        &format!("SELECT COALESCE(MAX(version), 0) FROM {MIGRATIONS_TABLE}"),
        [],
        |row| row.get(0),
    )
}

fn read_value(connection: &Connection, key: StateKey) -> rusqlite::Result<Option<String>> {
    connection
        .query_row(
            "SELECT state_value FROM local_state WHERE state_key = ?1",
            [key.as_str()],
            |row| row.get(0),
        )
        .optional()
}

fn write_value(connection: &Connection, key: StateKey, value: &str) -> rusqlite::Result<()> {
    connection.execute(
        "
INSERT INTO local_state (state_key, state_value, updated_at_unix)
VALUES (?1, ?2, strftime('%s', 'now'))
ON CONFLICT(state_key) DO UPDATE SET
    state_value = excluded.state_value,
    updated_at_unix = excluded.updated_at_unix
",
        (key.as_str(), value),
    )?;
    Ok(())
}

fn defined_migration(version: i64) -> rusqlite::Result<&'static SqliteMigration> {
    migration(version).ok_or_else(|| sqlite_failure(&format!("no migration {version}")))
}

#[derive(Clone, Copy)]
enum Step {
    Up,
    Down,
}

/// Applies or reverts one migration together with its bookkeeping row.
fn run_step(
    connection: &mut Connection,
    migration: &SqliteMigration,
    step: Step,
) -> rusqlite::Result<()> {
    let transaction = connection.transaction()?;
    match step {
        Step::Up => {
            transaction.execute_batch(migration.up_sql)?;
            transaction.execute(
                &format!(
                    "INSERT INTO {MIGRATIONS_TABLE} (version, name, applied_at_unix) \
                     VALUES (?1, ?2, strftime('%s', 'now'))"
                ),
                (migration.version, migration.name),
            )?;
        }
        Step::Down => {
            transaction.execute_batch(migration.down_sql)?;
            transaction.execute(
                &format!("DELETE FROM {MIGRATIONS_TABLE} WHERE version = ?1"),
                [migration.version],
            )?;
        }
    }
    transaction.commit()
}

fn storage_error(operation: &str, error: rusqlite::Error) -> CoreError {
    storage_error_text(operation, error.to_string())
}

fn storage_error_text(operation: &str, detail: impl AsRef<str>) -> CoreError {
    CoreError::new(
        CoreErrorKind::StorageFailure,
        format!("local state {operation} failed: {}", detail.as_ref()),
    )
}

/// Carries a plain message through helpers that return `rusqlite::Result`.
fn sqlite_failure(message: &str) -> rusqlite::Error {
    rusqlite::Error::ToSqlConversionFailure(Box::new(std::io::Error::other(message.to_string())))
}
