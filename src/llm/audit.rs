//! Audit trail of oracle traffic
//!
//! Sinks are observers only; nothing they do feeds back into the pipeline.

use std::fmt::Display;
use std::sync::Mutex;
use std::time::Duration;

/// Receives every prompt, response and failure passing through the gateway
pub trait AuditSink: Send + Sync {
    fn log_prompt(&self, caller_id: &str, prompt: &str, system_prompt: &str);
    fn log_response(&self, caller_id: &str, text: &str, latency: Duration);
    fn log_error(&self, caller_id: &str, error: &dyn Display, context: &str);
}

/// Emits audit events through `tracing` on the `llm_audit` target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn log_prompt(&self, caller_id: &str, prompt: &str, system_prompt: &str) {
        tracing::debug!(target: "llm_audit", caller = caller_id, system_prompt, prompt, "prompt");
    }

    fn log_response(&self, caller_id: &str, text: &str, latency: Duration) {
        tracing::info!(
            target: "llm_audit",
            caller = caller_id,
            latency_ms = latency.as_millis() as u64,
            chars = text.len(),
            "response"
        );
        tracing::debug!(target: "llm_audit", caller = caller_id, text, "response text");
    }

    fn log_error(&self, caller_id: &str, error: &dyn Display, context: &str) {
        tracing::error!(target: "llm_audit", caller = caller_id, error = %error, context);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuditRecord {
    Prompt {
        caller_id: String,
        prompt: String,
        system_prompt: String,
    },
    Response {
        caller_id: String,
        text: String,
        latency_ms: u64,
    },
    Error {
        caller_id: String,
        error: String,
        context: String,
    },
}

impl AuditRecord {
    pub fn caller_id(&self) -> &str {
        match self {
            AuditRecord::Prompt { caller_id, .. }
            | AuditRecord::Response { caller_id, .. }
            | AuditRecord::Error { caller_id, .. } => caller_id,
        }
    }
}

/// Keeps every record in arrival order
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    records: Mutex<Vec<AuditRecord>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<AuditRecord> {
        self.records.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn errors(&self) -> Vec<AuditRecord> {
        self.records()
            .into_iter()
            .filter(|r| matches!(r, AuditRecord::Error { .. }))
            .collect()
    }

    fn push(&self, record: AuditRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record);
        }
    }
}

impl AuditSink for MemoryAuditSink {
    fn log_prompt(&self, caller_id: &str, prompt: &str, system_prompt: &str) {
        self.push(AuditRecord::Prompt {
            caller_id: caller_id.to_string(),
            prompt: prompt.to_string(),
            system_prompt: system_prompt.to_string(),
        });
    }

    fn log_response(&self, caller_id: &str, text: &str, latency: Duration) {
        self.push(AuditRecord::Response {
            caller_id: caller_id.to_string(),
            text: text.to_string(),
            latency_ms: latency.as_millis() as u64,
        });
    }

    fn log_error(&self, caller_id: &str, error: &dyn Display, context: &str) {
        self.push(AuditRecord::Error {
            caller_id: caller_id.to_string(),
            error: error.to_string(),
            context: context.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_keeps_order() {
        let sink = MemoryAuditSink::new();
        sink.log_prompt("ada", "p", "s");
        sink.log_response("ada", "r", Duration::from_millis(12));
        sink.log_error("bo", &"boom", "ctx");

        let records = sink.records();
        assert_eq!(records.len(), 3);
        assert!(matches!(records[0], AuditRecord::Prompt { .. }));
        assert_eq!(
            records[1],
            AuditRecord::Response {
                caller_id: "ada".into(),
                text: "r".into(),
                latency_ms: 12
            }
        );
        assert_eq!(records[2].caller_id(), "bo");
        assert_eq!(sink.errors().len(), 1);
    }
}
