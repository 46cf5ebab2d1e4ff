use anyhow::Result;
use serde_json::json;
use uuid::Uuid;

use rex_schemas::WhyNot;

use crate::writer::AuditWriter;

/// Records one `WhyNot` decision to both `tracing` and the hash-chained
/// audit log. This is the single place every component funnels its
/// decision trace through, so the two outputs never drift apart.
pub fn record_why_not(writer: &mut AuditWriter, run_id: Uuid, why: &WhyNot) -> Result<()> {
    match why.reason {
        rex_schemas::WhyNotReason::TradeExecuted => {
            tracing::info!(pair = %why.pair_identity, tick = why.tick_seq, reason = %why.reason, "trade executed")
        }
        rex_schemas::WhyNotReason::EnginePaused
        | rex_schemas::WhyNotReason::SolReserveLow
        | rex_schemas::WhyNotReason::ConsecutiveErrors => {
            tracing::warn!(pair = %why.pair_identity, tick = why.tick_seq, reason = %why.reason, "pair skipped")
        }
        _ => {
            tracing::debug!(pair = %why.pair_identity, tick = why.tick_seq, reason = %why.reason, "pair skipped")
        }
    }

    writer.append(
        run_id,
        "why_not",
        &why.reason.to_string(),
        json!({
            "pair": why.pair_identity,
            "tick_seq": why.tick_seq,
            "reason": why.reason.to_string(),
            "detail": why.detail,
            "ts": why.ts,
        }),
    )?;
    Ok(())
}
