use tracing::{info, warn};

use crate::ports::{InteractionLog, InteractionRecord, LogCategory};

/// Tracing target for audit events, so they can be filtered independently
/// (e.g. `RUST_LOG=oairelay.audit=info`).
pub const AUDIT_TARGET: &str = "oairelay.audit";

/// Emits each record as a tracing event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLog;

impl InteractionLog for TracingLog {
    fn record(&self, record: InteractionRecord) {
        let cost_usd = record.cost.as_ref().map(|cost| cost.usd);
        match record.category {
            LogCategory::Failure | LogCategory::StreamError => warn!(
                target: AUDIT_TARGET,
                category = record.category.as_str(),
                request_id = %record.request_id,
                method = %record.method,
                path = %record.target,
                attempt = ?record.attempt,
                status = ?record.status,
                message = ?record.message,
                "interaction"
            ),
            _ => info!(
                target: AUDIT_TARGET,
                category = record.category.as_str(),
                request_id = %record.request_id,
                method = %record.method,
                path = %record.target,
                attempt = ?record.attempt,
                delay_ms = ?record.delay_ms,
                status = ?record.status,
                cost_usd = ?cost_usd,
                "interaction"
            ),
        }
    }
}
