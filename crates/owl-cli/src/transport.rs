use std::time::Duration;

use owl_core::habitica::{ApiResult, HttpRequest, HttpResponse, HttpTransport};
use owl_core::models::{CoreError, CoreErrorKind};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Blocking HTTP transport backed by a shared `ureq` agent.
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(DEFAULT_TIMEOUT)
    }
}

impl HttpTransport for UreqTransport {
    fn send(&self, request: HttpRequest) -> ApiResult<HttpResponse> {
        let mut call = self.agent.request(request.method.as_str(), &request.url);
        for (key, value) in &request.query {
            call = call.query(key, value);
        }
        for (name, value) in &request.headers {
            call = call.set(name, value);
        }

        let result = match request.body.as_deref() {
            Some(body) => call.send_string(body),
            None => call.call(),
        };

        match result {
            Ok(response) => read_response(response),
            // Error statuses still carry a body the API layer interprets.
            Err(ureq::Error::Status(_, response)) => read_response(response),
            Err(ureq::Error::Transport(transport)) => Err(CoreError::new(
                CoreErrorKind::Transport,
                format!("{} {} failed: {transport}", request.method.as_str(), request.url),
            )),
        }
    }
}

fn read_response(response: ureq::Response) -> ApiResult<HttpResponse> {
    let status = response.status();
    let status_text = response.status_text().to_string();
    let body = response.into_string().map_err(|error| {
        CoreError::new(
            CoreErrorKind::Transport,
            format!("failed to read response body: {error}"),
        )
    })?;

    Ok(HttpResponse {
        status,
        status_text,
        body,
    })
}
