use crate::error::{CoreError, Severity};

/// Channel through which the simulation reports configuration and runtime
/// problems to the host.
pub trait Diagnostics: Send + Sync {
    fn report(&self, error: &CoreError);
}

/// Default sink: forwards reports to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn report(&self, error: &CoreError) {
        match error.severity() {
            Severity::Warning => tracing::warn!(%error, "degraded configuration"),
            Severity::Error => tracing::error!(%error, "simulation problem"),
        }
    }
}
