#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use owl_core::habitica::{ApiResult, HttpMethod, HttpRequest, HttpResponse, HttpTransport};
use owl_core::models::{CoreError, CoreErrorKind, Credentials, LocalTask, parse_local_tasks};
use owl_core::notification::Notifier;
use owl_core::persistence::{
    CredentialStore, LocalState, LocalTaskStore, PersistenceResult, SettingsStore,
};
use owl_core::workflows::WorkflowServices;
use serde_json::{Value, json};

pub const BASE_URL: &str = "http://habitica.test/api/v3";
pub const TAGS_FIXTURE: &str = include_str!("../fixtures/habitica/tags.json");
pub const TODOS_FIXTURE: &str = include_str!("../fixtures/habitica/todos.json");
/// Id of the first tag named exactly "Owl" in the tags fixture.
pub const FIXTURE_OWL_TAG_ID: &str = "f1b6c0a4-5d3e-4c8b-9a7d-2e6f1a9c3b58";

#[derive(Default)]
struct FakeState {
    tags: Vec<Value>,
    todos: Vec<Value>,
    gp: f64,
    next_id: u64,
    requests: Vec<HttpRequest>,
    failures: HashMap<(HttpMethod, String), HttpResponse>,
    rejected_texts: Vec<String>,
    delays: HashMap<(HttpMethod, String), Duration>,
    created_status: Option<String>,
    offline: bool,
}

/// In-memory stand-in for the Habitica API that keeps tags, todos and the
/// gold balance between calls.
#[derive(Default)]
pub struct FakeHabitica {
    state: Mutex<FakeState>,
}

impl FakeHabitica {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seed_tags(&self, raw: &str) {
        self.state.lock().unwrap().tags = serde_json::from_str(raw).unwrap();
    }

    pub fn seed_todos(&self, raw: &str) {
        self.state.lock().unwrap().todos = serde_json::from_str(raw).unwrap();
    }

    pub fn set_gp(&self, gp: f64) {
        self.state.lock().unwrap().gp = gp;
    }

    pub fn fail(&self, method: HttpMethod, path: &str, status: u16, status_text: &str, body: &str) {
        self.state.lock().unwrap().failures.insert(
            (method, path.to_string()),
            HttpResponse {
                status,
                status_text: status_text.to_string(),
                body: body.to_string(),
            },
        );
    }

    /// Makes task creation fail with a validation error for one text.
    pub fn reject_task_text(&self, text: &str) {
        self.state
            .lock()
            .unwrap()
            .rejected_texts
            .push(text.to_string());
    }

    /// Status echoed on every todo created from now on.
    pub fn report_created_status(&self, status: &str) {
        self.state.lock().unwrap().created_status = Some(status.to_string());
    }

    pub fn delay(&self, method: HttpMethod, path: &str, duration: Duration) {
        self.state
            .lock()
            .unwrap()
            .delays
            .insert((method, path.to_string()), duration);
    }

    pub fn go_offline(&self) {
        self.state.lock().unwrap().offline = true;
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub fn count(&self, method: HttpMethod, path: &str) -> usize {
        self.requests()
            .iter()
            .filter(|request| request.method == method && path_of(&request.url) == path)
            .count()
    }

    pub fn todo_texts(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .todos
            .iter()
            .filter_map(|todo| todo["text"].as_str().map(str::to_owned))
            .collect()
    }

    pub fn todo(&self, text: &str) -> Option<Value> {
        self.state
            .lock()
            .unwrap()
            .todos
            .iter()
            .find(|todo| todo["text"] == text)
            .cloned()
    }

    pub fn tag_names(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .tags
            .iter()
            .filter_map(|tag| tag["name"].as_str().map(str::to_owned))
            .collect()
    }

    pub fn gp(&self) -> f64 {
        self.state.lock().unwrap().gp
    }

    fn route(&self, request: &HttpRequest, path: &str) -> HttpResponse {
        let mut state = self.state.lock().unwrap();
        let body: Value = request
            .body
            .as_deref()
            .map(|raw| serde_json::from_str(raw).unwrap())
            .unwrap_or(Value::Null);

        match (request.method, path) {
            (HttpMethod::Get, "tags") => ok(Value::Array(state.tags.clone())),
            (HttpMethod::Post, "tags") => {
                state.next_id += 1;
                let tag = json!({ "id": format!("tag-{}", state.next_id), "name": body["name"] });
                state.tags.push(tag.clone());
                created(tag)
            }
            (HttpMethod::Get, "tasks/user") => ok(Value::Array(state.todos.clone())),
            (HttpMethod::Post, "tasks/user") => {
                let text = body["text"].as_str().unwrap_or_default().to_string();
                if state.rejected_texts.contains(&text) {
                    return response(
                        400,
                        "Bad Request",
                        json!({ "success": false, "message": "Task text is invalid." }),
                    );
                }
                state.next_id += 1;
                let mut task = body.clone();
                task["id"] = json!(format!("task-{}", state.next_id));
                task["completed"] = json!(false);
                if let Some(status) = &state.created_status {
                    task["status"] = json!(status);
                }
                state.todos.push(task.clone());
                created(task)
            }
            (HttpMethod::Get, "user") => ok(json!({ "id": "user-1", "stats": { "gp": state.gp } })),
            (HttpMethod::Put, "user") => {
                if let Some(gp) = body.get("stats.gp").and_then(Value::as_f64) {
                    state.gp = gp;
                }
                ok(json!({ "stats": { "gp": state.gp } }))
            }
            (HttpMethod::Post, path) if path.starts_with("tasks/") && path.ends_with("/score/up") => {
                ok(json!({ "delta": 1.0, "gp": state.gp }))
            }
            _ => response(
                404,
                "Not Found",
                json!({ "success": false, "message": "Not found." }),
            ),
        }
    }
}

impl HttpTransport for FakeHabitica {
    fn send(&self, request: HttpRequest) -> ApiResult<HttpResponse> {
        let path = path_of(&request.url).to_string();
        let delay = {
            let mut state = self.state.lock().unwrap();
            state.requests.push(request.clone());
            if state.offline {
                return Err(CoreError::new(
                    CoreErrorKind::Transport,
                    "connection refused",
                ));
            }
            if let Some(failure) = state.failures.get(&(request.method, path.clone())) {
                return Ok(failure.clone());
            }
            state.delays.get(&(request.method, path.clone())).copied()
        };

        if let Some(delay) = delay {
            thread::sleep(delay);
        }

        Ok(self.route(&request, &path))
    }
}

fn path_of(url: &str) -> &str {
    url.strip_prefix(BASE_URL)
        .unwrap_or(url)
        .trim_start_matches('/')
}

fn ok(data: Value) -> HttpResponse {
    response(200, "OK", json!({ "success": true, "data": data }))
}

fn created(data: Value) -> HttpResponse {
    response(201, "Created", json!({ "success": true, "data": data }))
}

fn response(status: u16, status_text: &str, body: Value) -> HttpResponse {
    HttpResponse {
        status,
        status_text: status_text.to_string(),
        body: body.to_string(),
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }

    pub fn saw(&self, fragment: &str) -> bool {
        self.messages()
            .iter()
            .any(|message| message.contains(fragment))
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

/// Local state kept in memory, with an optional failing accumulator write.
#[derive(Default)]
pub struct MemoryState {
    credentials: Mutex<Option<(String, String)>>,
    tasks: Mutex<Option<Vec<LocalTask>>>,
    rate: Mutex<Option<String>>,
    vacation: Mutex<Option<String>>,
    fail_vacation_writes: AtomicBool,
}

impl MemoryState {
    pub fn with_credentials(self, user_id: &str, api_token: &str) -> Self {
        *self.credentials.lock().unwrap() = Some((user_id.to_string(), api_token.to_string()));
        self
    }

    pub fn with_tasks(self, tasks: Vec<LocalTask>) -> Self {
        *self.tasks.lock().unwrap() = Some(tasks);
        self
    }

    pub fn with_tasks_json(self, raw: &str) -> Self {
        *self.tasks.lock().unwrap() = Some(parse_local_tasks(raw).unwrap());
        self
    }

    pub fn with_rate(self, rate: &str) -> Self {
        *self.rate.lock().unwrap() = Some(rate.to_string());
        self
    }

    pub fn with_vacation(self, minutes: &str) -> Self {
        *self.vacation.lock().unwrap() = Some(minutes.to_string());
        self
    }

    pub fn failing_vacation_writes(self) -> Self {
        self.fail_vacation_writes.store(true, Ordering::SeqCst);
        self
    }

    pub fn vacation(&self) -> Option<String> {
        self.vacation.lock().unwrap().clone()
    }
}

impl CredentialStore for MemoryState {
    fn credentials(&self) -> PersistenceResult<Option<Credentials>> {
        let stored = self.credentials.lock().unwrap().clone();
        Ok(stored.and_then(|(user_id, api_token)| {
            Credentials::from_parts(Some(user_id), Some(api_token))
        }))
    }

    fn save_credentials(&self, user_id: &str, api_token: &str) -> PersistenceResult<()> {
        *self.credentials.lock().unwrap() = Some((user_id.to_string(), api_token.to_string()));
        Ok(())
    }
}

impl LocalTaskStore for MemoryState {
    fn local_tasks(&self) -> PersistenceResult<Option<Vec<LocalTask>>> {
        Ok(self.tasks.lock().unwrap().clone())
    }

    fn replace_local_tasks(&self, tasks_json: &str) -> PersistenceResult<()> {
        *self.tasks.lock().unwrap() = Some(parse_local_tasks(tasks_json)?);
        Ok(())
    }
}

impl SettingsStore for MemoryState {
    fn conversion_rate(&self) -> PersistenceResult<Option<String>> {
        Ok(self.rate.lock().unwrap().clone())
    }

    fn set_conversion_rate(&self, rate: &str) -> PersistenceResult<()> {
        *self.rate.lock().unwrap() = Some(rate.to_string());
        Ok(())
    }

    fn vacation_time(&self) -> PersistenceResult<Option<String>> {
        Ok(self.vacation.lock().unwrap().clone())
    }

    fn set_vacation_time(&self, minutes: f64) -> PersistenceResult<()> {
        if self.fail_vacation_writes.load(Ordering::SeqCst) {
            return Err(CoreError::new(CoreErrorKind::StorageFailure, "disk full"));
        }
        *self.vacation.lock().unwrap() = Some(minutes.to_string());
        Ok(())
    }
}

pub fn services(
    state: Arc<MemoryState>,
    habitica: Arc<FakeHabitica>,
    notifier: Arc<RecordingNotifier>,
) -> WorkflowServices {
    WorkflowServices::new(LocalState::from_store(state), habitica, notifier)
        .with_api_base_url(BASE_URL)
}

pub fn signed_in() -> MemoryState {
    MemoryState::default().with_credentials("user-1", "token-1")
}
