//! Shared application state type.

use crate::bootstrap::ProxyContext;
use std::sync::Arc;

/// Application state shared across all handlers.
pub type AppState = Arc<ProxyContext>;
