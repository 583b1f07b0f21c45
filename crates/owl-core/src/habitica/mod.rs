pub mod api;
pub mod transport;

pub use api::{DEFAULT_API_URL, HabiticaApi, error_message, request_headers};
pub use transport::{ApiResult, HttpMethod, HttpRequest, HttpResponse, HttpTransport};
