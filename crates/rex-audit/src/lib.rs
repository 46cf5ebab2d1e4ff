//! Structured logging and the hash-chained decision audit trail.
//!
//! `tracing` carries operator-facing structured events; the JSONL audit
//! writer carries the durable, tamper-evident decision trace (`WhyNot`
//! records and executed-trade outcomes) this codebase has always kept
//! alongside its run history.

pub mod tracing_init;
pub mod why_not_log;
pub mod writer;

pub use tracing_init::init_tracing;
pub use why_not_log::record_why_not;
pub use writer::{compute_event_hash, verify_hash_chain, verify_hash_chain_str, AuditEvent, AuditWriter, VerifyResult};
