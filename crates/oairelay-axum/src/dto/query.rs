use serde::Deserialize;

use crate::error::HttpError;

const MAX_LIST_LIMIT: u32 = 100;

/// Cursor pagination for list endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ListQuery {
    pub after: Option<String>,
    pub before: Option<String>,
    pub limit: Option<u32>,
    pub order: Option<String>,
    /// Files only: filter by purpose.
    pub purpose: Option<String>,
}

impl ListQuery {
    pub fn validate(&self) -> Result<(), HttpError> {
        if let Some(limit) = self.limit.filter(|l| !(1..=MAX_LIST_LIMIT).contains(l)) {
            return Err(HttpError::invalid_param(
                "limit",
                format!("'limit' must be between 1 and {MAX_LIST_LIMIT}, got {limit}"),
            ));
        }
        if let Some(order) = self.order.as_deref().filter(|o| !matches!(*o, "asc" | "desc")) {
            return Err(HttpError::invalid_param(
                "order",
                format!("'order' must be 'asc' or 'desc', got '{order}'"),
            ));
        }
        Ok(())
    }

    /// Query pairs to forward upstream, in a stable order.
    #[must_use]
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        let mut push = |key: &str, value: Option<String>| {
            if let Some(value) = value {
                pairs.push((key.to_owned(), value));
            }
        };
        push("after", self.after.clone());
        push("before", self.before.clone());
        push("limit", self.limit.map(|l| l.to_string()));
        push("order", self.order.clone());
        push("purpose", self.purpose.clone());
        pairs
    }
}

/// Query for `GET /v1/responses/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RetrieveQuery {
    /// Replay the stored event stream instead of returning the object.
    #[serde(default)]
    pub stream: bool,
    /// Resume after this sequence number (streaming only).
    pub starting_after: Option<u64>,
}

impl RetrieveQuery {
    pub fn validate(&self) -> Result<(), HttpError> {
        if self.starting_after.is_some() && !self.stream {
            return Err(HttpError::invalid_param(
                "starting_after",
                "'starting_after' requires 'stream=true'",
            ));
        }
        Ok(())
    }
}
