/// Receives the single human-readable status line each workflow step reports.
/// Fire-and-forget: implementations must not fail.
pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}
