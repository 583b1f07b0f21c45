use owl_core::notification::Notifier;

/// Prints user-facing messages on stdout. Diagnostics go to stderr through
/// `tracing`.
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, message: &str) {
        println!("{message}");
    }
}
