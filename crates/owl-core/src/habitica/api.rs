use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use crate::habitica::transport::{ApiResult, HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use crate::models::{
    ApiOperation, CoreError, CoreErrorKind, Credentials, NewTodo, RemoteTask, Tag, UserRecord,
};

pub const DEFAULT_API_URL: &str = "https://habitica.com/api/v3/";

/// Typed access to the Habitica v3 endpoints used by the workflows.
///
/// Every request carries the identifying headers from [`request_headers`]; a
/// non-success status becomes a [`CoreErrorKind::Api`] error whose message is
/// chosen by [`error_message`].
pub struct HabiticaApi {
    transport: Arc<dyn HttpTransport>,
    credentials: Credentials,
    base_url: String,
}

impl HabiticaApi {
    pub fn new(transport: Arc<dyn HttpTransport>, credentials: Credentials) -> Self {
        Self {
            transport,
            credentials,
            base_url: DEFAULT_API_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn list_tags(&self) -> ApiResult<Vec<Tag>> {
        let data = self.call(ApiOperation::ListTags, HttpMethod::Get, "tags", &[], None)?;
        decode(ApiOperation::ListTags, data)
    }

    pub fn create_tag(&self, name: &str) -> ApiResult<Tag> {
        let data = self.call(
            ApiOperation::CreateTag,
            HttpMethod::Post,
            "tags",
            &[],
            Some(json!({ "name": name })),
        )?;
        decode(ApiOperation::CreateTag, data)
    }

    pub fn list_todos(&self) -> ApiResult<Vec<RemoteTask>> {
        let data = self.call(
            ApiOperation::ListTodos,
            HttpMethod::Get,
            "tasks/user",
            &[("type", "todos")],
            None,
        )?;
        decode(ApiOperation::ListTodos, data)
    }

    pub fn create_task(&self, todo: &NewTodo) -> ApiResult<RemoteTask> {
        let body = serde_json::to_value(todo).map_err(|error| {
            CoreError::new(
                CoreErrorKind::Internal,
                format!("failed to encode task body: {error}"),
            )
            .during(ApiOperation::CreateTask)
        })?;
        let data = self.call(
            ApiOperation::CreateTask,
            HttpMethod::Post,
            "tasks/user",
            &[],
            Some(body),
        )?;
        decode(ApiOperation::CreateTask, data)
    }

    pub fn get_user(&self) -> ApiResult<UserRecord> {
        let data = self.call(ApiOperation::GetUser, HttpMethod::Get, "user", &[], None)?;
        decode(ApiOperation::GetUser, data)
    }

    /// Sends a partial user update, e.g. `{"stats.gp": 0}`.
    pub fn update_user(&self, changes: Value) -> ApiResult<Value> {
        self.call(
            ApiOperation::UpdateUser,
            HttpMethod::Put,
            "user",
            &[],
            Some(changes),
        )
    }

    pub fn score_task_up(&self, task_id: &str) -> ApiResult<Value> {
        if !is_valid_task_id(task_id) {
            return Err(CoreError::new(
                CoreErrorKind::InvalidInput,
                format!("'{task_id}' is not a valid Habitica task id"),
            )
            .during(ApiOperation::ScoreTask));
        }

        self.call(
            ApiOperation::ScoreTask,
            HttpMethod::Post,
            &format!("tasks/{task_id}/score/up"),
            &[],
            None,
        )
    }

    fn call(
        &self,
        operation: ApiOperation,
        method: HttpMethod,
        path: &str,
        query: &[(&str, &str)],
        body: Option<Value>,
    ) -> ApiResult<Value> {
        let mut request = HttpRequest::new(method, self.endpoint(path));
        for (key, value) in query {
            request = request.query(*key, *value);
        }
        for (name, value) in request_headers(&self.credentials) {
            request = request.header(name, value);
        }
        if let Some(body) = body {
            request = request.body(body.to_string());
        }

        tracing::debug!(
            operation = operation.as_str(),
            method = method.as_str(),
            path,
            mutating = operation.is_mutating(),
            "sending habitica request"
        );

        let response = self
            .transport
            .send(request)
            .map_err(|error| error.during(operation))?;
        interpret_response(operation, response)
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

/// The fixed header set sent with every call.
pub fn request_headers(credentials: &Credentials) -> Vec<(&'static str, String)> {
    vec![
        ("x-api-user", credentials.user_id().to_string()),
        ("x-api-key", credentials.api_token().to_string()),
        ("x-client", credentials.client_id()),
        ("Content-Type", "application/json".to_string()),
    ]
}

/// Picks the most useful description of a failed response: the server's JSON
/// `message`, then the raw body, then the status text.
pub fn error_message(response: &HttpResponse) -> String {
    let server_message = serde_json::from_str::<Value>(&response.body)
        .ok()
        .and_then(|body| {
            body.get("message")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|message| !message.is_empty())
                .map(str::to_owned)
        });
    if let Some(message) = server_message {
        return message;
    }

    let body = response.body.trim();
    if !body.is_empty() {
        return body.to_string();
    }

    let status_text = response.status_text.trim();
    if !status_text.is_empty() {
        return status_text.to_string();
    }

    format!("HTTP status {}", response.status)
}

fn interpret_response(operation: ApiOperation, response: HttpResponse) -> ApiResult<Value> {
    if !response.is_success() {
        let message = error_message(&response);
        tracing::warn!(
            operation = operation.as_str(),
            status = response.status,
            message = %message,
            "habitica request failed"
        );
        return Err(CoreError::new(CoreErrorKind::Api, message).during(operation));
    }

    if response.body.trim().is_empty() {
        return Ok(Value::Null);
    }

    let envelope: Value = serde_json::from_str(&response.body).map_err(|error| {
        CoreError::new(
            CoreErrorKind::ParseFailure,
            format!("habitica response is not valid JSON: {error}"),
        )
        .during(operation)
    })?;

    if envelope.get("success").and_then(Value::as_bool) == Some(false) {
        return Err(CoreError::new(CoreErrorKind::Api, error_message(&response)).during(operation));
    }

    Ok(match envelope {
        Value::Object(mut fields) => match fields.remove("data") {
            Some(data) => data,
            None => Value::Object(fields),
        },
        other => other,
    })
}

fn decode<T: DeserializeOwned>(operation: ApiOperation, data: Value) -> ApiResult<T> {
    serde_json::from_value(data).map_err(|error| {
        CoreError::new(
            CoreErrorKind::ParseFailure,
            format!(
                "unexpected habitica payload for {}: {error}",
                operation.as_str()
            ),
        )
        .during(operation)
    })
}

fn is_valid_task_id(task_id: &str) -> bool {
    !task_id.is_empty()
        && task_id
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_'))
}
