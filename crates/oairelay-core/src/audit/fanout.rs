//! Fan-out of interaction records to several sinks.

use std::sync::Arc;

use crate::ports::{InteractionLog, InteractionRecord};

/// Forwards every record to each inner sink, in order.
#[derive(Debug, Clone, Default)]
pub struct FanoutLog {
    sinks: Vec<Arc<dyn InteractionLog>>,
}

impl FanoutLog {
    pub fn new(sinks: Vec<Arc<dyn InteractionLog>>) -> Self {
        Self { sinks }
    }

    #[must_use]
    pub fn with(mut self, sink: Arc<dyn InteractionLog>) -> Self {
        self.sinks.push(sink);
        self
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl InteractionLog for FanoutLog {
    fn record(&self, record: InteractionRecord) {
        let Some((last, rest)) = self.sinks.split_last() else {
            return;
        };
        for sink in rest {
            sink.record(record.clone());
        }
        last.record(record);
    }
}
