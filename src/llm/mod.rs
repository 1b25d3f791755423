//! Oracle plumbing: HTTP client, gateway, audit trail, prompt templating and
//! response decoding

pub mod audit;
pub mod client;
pub mod decode;
pub mod oracle;
pub mod template;

pub use audit::{AuditRecord, AuditSink, MemoryAuditSink, TracingAuditSink};
pub use client::LlmClient;
pub use decode::{DecodeError, FieldRule, RecordSchema, ValidationError, Validator};
pub use oracle::{Oracle, OracleGateway};
pub use template::{compose, compose_from};
