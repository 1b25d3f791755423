//! Oracle gateway - the single point of contact with the text generator
//!
//! Every call is audited (prompt, response, latency) under the caller's id.
//! Failures are logged and returned unchanged; fallback policy belongs to
//! the cognitive stages, never to the gateway.

use std::fmt::Display;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use crate::core::error::{Result, SimError};
use crate::llm::audit::{AuditSink, TracingAuditSink};

/// External generative-text service
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Generate text for `prompt` under `system_prompt`
    async fn generate(&self, prompt: &str, system_prompt: &str) -> Result<String>;
}

pub struct OracleGateway {
    oracle: Arc<dyn Oracle>,
    audit: Arc<dyn AuditSink>,
    timeout: Option<Duration>,
}

impl OracleGateway {
    /// Gateway with a tracing audit sink and no deadline
    pub fn new(oracle: Arc<dyn Oracle>) -> Self {
        Self {
            oracle,
            audit: Arc::new(TracingAuditSink),
            timeout: None,
        }
    }

    pub fn with_audit(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    /// Deadline per call; an expired call fails like a transport error
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Send one prompt and return the raw reply text
    pub async fn call(&self, prompt: &str, system_prompt: &str, caller_id: &str) -> Result<String> {
        self.audit.log_prompt(caller_id, prompt, system_prompt);
        let started = Instant::now();

        let outcome = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, self.oracle.generate(prompt, system_prompt))
                .await
                .unwrap_or_else(|_| Err(SimError::OracleTimeout(limit))),
            None => self.oracle.generate(prompt, system_prompt).await,
        };

        match outcome {
            Ok(text) => {
                self.audit.log_response(caller_id, &text, started.elapsed());
                Ok(text)
            }
            Err(e) => {
                tracing::error!(caller = caller_id, error = %e, "LLM call failed");
                self.audit.log_error(caller_id, &e, "LLM call failed");
                Err(e)
            }
        }
    }

    /// Record a stage-level failure against `caller_id`
    pub fn report(&self, caller_id: &str, error: &dyn Display, context: &str) {
        self.audit.log_error(caller_id, error, context);
    }
}
