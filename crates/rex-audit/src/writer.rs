use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Append-only audit writer. Writes JSON Lines (one event per line), each
/// hash-chained to the previous line so the file can be verified for
/// tamper-evidence independent of the process that wrote it.
pub struct AuditWriter {
    path: PathBuf,
    hash_chain: bool,
    last_hash: Option<String>,
    /// Monotonically increasing sequence counter for `event_id` derivation.
    /// Starts at 0 and increments on every `append` call. When resuming an
    /// existing log (e.g. after a restart), restore with `set_seq` alongside
    /// `set_last_hash`.
    seq: u64,
}

impl AuditWriter {
    pub fn new(path: impl AsRef<Path>, hash_chain: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| format!("create_dir_all {parent:?}"))?;
        }

        Ok(Self {
            path,
            hash_chain,
            last_hash: None,
            seq: 0,
        })
    }

    pub fn set_last_hash(&mut self, last_hash: Option<String>) {
        self.last_hash = last_hash;
    }

    pub fn last_hash(&self) -> Option<String> {
        self.last_hash.clone()
    }

    pub fn set_seq(&mut self, seq: u64) {
        self.seq = seq;
    }

    pub fn seq(&self) -> u64 {
        self.seq
    }

    /// Append one event. `event_id` is derived deterministically from chain
    /// state + payload + sequence number — no RNG, so replaying a boot with
    /// the same inputs in the same order reproduces the same ids.
    pub fn append(&mut self, run_id: Uuid, topic: &str, event_type: &str, payload: Value) -> Result<AuditEvent> {
        let ts_utc = Utc::now();
        let event_id = derive_event_id(self.last_hash.as_deref(), &payload, self.seq);
        self.seq += 1;

        let mut ev = AuditEvent {
            event_id,
            run_id,
            ts_utc,
            topic: topic.to_string(),
            event_type: event_type.to_string(),
            payload,
            hash_prev: None,
            hash_self: None,
        };

        if self.hash_chain {
            ev.hash_prev = self.last_hash.clone();
            let self_hash = compute_event_hash(&ev)?;
            ev.hash_self = Some(self_hash.clone());
            self.last_hash = Some(self_hash);
        }

        let line = canonical_json_line(&ev)?;
        append_line(&self.path, &line)?;

        Ok(ev)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    pub event_id: Uuid,
    pub run_id: Uuid,
    pub ts_utc: DateTime<Utc>,
    pub topic: String,
    pub event_type: String,
    pub payload: Value,
    pub hash_prev: Option<String>,
    pub hash_self: Option<String>,
}

/// Derives a stable, non-random event id from the prior chain hash, the
/// payload, and the sequence counter. Two runs fed identical inputs in
/// identical order produce identical event ids.
fn derive_event_id(prev_hash: Option<&str>, payload: &Value, seq: u64) -> Uuid {
    let mut hasher = Sha256::new();
    hasher.update(prev_hash.unwrap_or("").as_bytes());
    hasher.update(seq.to_le_bytes());
    hasher.update(payload.to_string().as_bytes());
    let digest = hasher.finalize();
    Uuid::new_v5(&Uuid::NAMESPACE_OID, &digest)
}

fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open audit log {path:?}"))?;
    f.write_all(line.as_bytes()).context("write audit line failed")?;
    f.write_all(b"\n").context("write newline failed")?;
    Ok(())
}

fn canonical_json_line<T: Serialize>(v: &T) -> Result<String> {
    let raw = serde_json::to_value(v).context("serialize audit event failed")?;
    let sorted = sort_keys(&raw);
    serde_json::to_string(&sorted).context("json stringify failed")
}

fn sort_keys(v: &Value) -> Value {
    match v {
        Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new = serde_json::Map::new();
            for k in keys {
                new.insert(k.clone(), sort_keys(&map[&k]));
            }
            Value::Object(new)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sort_keys).collect()),
        _ => v.clone(),
    }
}

/// Hash chain is computed from canonical JSON of the event WITHOUT hash_self
/// (to avoid self-reference).
pub fn compute_event_hash(ev: &AuditEvent) -> Result<String> {
    let mut clone = ev.clone();
    clone.hash_self = None;

    let canonical = canonical_json_line(&clone)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Verify the hash chain integrity of an audit log file.
pub fn verify_hash_chain(path: impl AsRef<Path>) -> Result<VerifyResult> {
    let content = fs::read_to_string(path.as_ref()).with_context(|| format!("read audit log {:?}", path.as_ref()))?;
    verify_hash_chain_str(&content)
}

/// Verify the hash chain integrity of an audit log string (JSONL content).
pub fn verify_hash_chain_str(content: &str) -> Result<VerifyResult> {
    let mut prev_hash: Option<String> = None;
    let mut line_count = 0usize;

    for (i, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let ev: AuditEvent =
            serde_json::from_str(trimmed).with_context(|| format!("parse audit event at line {}", i + 1))?;

        line_count += 1;

        if ev.hash_prev != prev_hash {
            return Ok(VerifyResult::Broken {
                line: i + 1,
                reason: format!("hash_prev mismatch: expected {:?}, got {:?}", prev_hash, ev.hash_prev),
            });
        }

        if let Some(ref claimed_hash) = ev.hash_self {
            let recomputed = compute_event_hash(&ev)?;
            if *claimed_hash != recomputed {
                return Ok(VerifyResult::Broken {
                    line: i + 1,
                    reason: format!("hash_self mismatch: claimed {claimed_hash}, recomputed {recomputed}"),
                });
            }
        }

        prev_hash = ev.hash_self.clone();
    }

    Ok(VerifyResult::Valid { lines: line_count })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyResult {
    Valid { lines: usize },
    Broken { line: usize, reason: String },
}
