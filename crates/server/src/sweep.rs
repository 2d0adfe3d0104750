//! Periodic stale-lead sweep: leads in a non-terminal stage with no activity
//! for the staleness window get `lead.no_reply_3d` fired through the trigger
//! dispatcher. Per-lead failures are isolated; one bad lead never stops the
//! sweep.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use leadflow_agent::triggers::TriggerDispatcher;
use leadflow_core::domain::automation::TriggerName;
use leadflow_db::repositories::LeadRepository;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepSummary {
    pub scanned: usize,
    pub dispatched: usize,
    pub failed: usize,
}

pub fn spawn(
    leads: Arc<dyn LeadRepository>,
    dispatcher: Arc<TriggerDispatcher>,
    staleness_days: i64,
    interval_secs: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            let summary = run_once(leads.as_ref(), dispatcher.as_ref(), staleness_days).await;
            info!(
                event_name = "sweep.completed",
                scanned = summary.scanned,
                dispatched = summary.dispatched,
                failed = summary.failed,
                "stale lead sweep completed"
            );
        }
    })
}

pub async fn run_once(
    leads: &dyn LeadRepository,
    dispatcher: &TriggerDispatcher,
    staleness_days: i64,
) -> SweepSummary {
    let cutoff = Utc::now() - chrono::Duration::days(staleness_days);

    let stale = match leads.list_stale(cutoff).await {
        Ok(stale) => stale,
        Err(list_error) => {
            error!(
                event_name = "sweep.listing_failed",
                error = %list_error,
                "could not list stale leads, skipping this sweep"
            );
            return SweepSummary::default();
        }
    };

    let mut summary = SweepSummary { scanned: stale.len(), ..SweepSummary::default() };

    for lead in stale {
        match dispatcher.dispatch(&lead.id, TriggerName::LeadNoReply3d.as_str()).await {
            Ok(outcomes) => {
                summary.dispatched += outcomes.len();
            }
            Err(dispatch_error) => {
                summary.failed += 1;
                error!(
                    event_name = "sweep.lead_dispatch_failed",
                    lead_id = %lead.id.0,
                    error = %dispatch_error,
                    "stale-lead dispatch failed, continuing with remaining leads"
                );
            }
        }
    }

    summary
}
