/// Sink for request traces produced by [`RpcConnection`](crate::RpcConnection).
///
/// Each traced call produces one `debug` message for the request, followed by either a
/// `debug` message with the response or an `error` message with the fault.
pub trait RequestLogger: Send + Sync {
    fn debug(&self, message: &str);
    fn error(&self, message: &str);
}

/// Target used by [`TracingLogger`] events.
pub const TRACE_TARGET: &str = "odoo_rpc::trace";

/// [`RequestLogger`] writing to `tracing` under the [`TRACE_TARGET`] target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl RequestLogger for TracingLogger {
    fn debug(&self, message: &str) {
        tracing::debug!(target: TRACE_TARGET, "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(target: TRACE_TARGET, "{message}");
    }
}
