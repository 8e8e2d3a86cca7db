//! Daily broadcast triggers

use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use std::sync::Arc;
use teaserbot_core::{ScheduleConfig, TickKind};
use teaserbot_engine::Orchestrator;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// First instant strictly after `now` whose UTC time of day is `at`.
pub fn next_fire(now: DateTime<Utc>, at: NaiveTime) -> DateTime<Utc> {
    let today = Utc.from_utc_datetime(&now.date_naive().and_time(at));
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

/// Fire times for each broadcast kind.
#[derive(Debug, Clone)]
pub struct DailySchedule {
    pub entries: Vec<(TickKind, NaiveTime)>,
}

impl DailySchedule {
    pub fn from_config(config: &ScheduleConfig) -> teaserbot_core::Result<Self> {
        Ok(Self {
            entries: vec![
                (TickKind::DailyItem, config.daily_item_time()?),
                (TickKind::DailyMotivation, config.daily_motivation_time()?),
            ],
        })
    }

    /// Spawn one timer task per entry. Tasks run until aborted.
    pub fn spawn(&self, orchestrator: Arc<Orchestrator>) -> Vec<JoinHandle<()>> {
        self.entries
            .iter()
            .map(|&(kind, at)| spawn_daily(orchestrator.clone(), kind, at))
            .collect()
    }
}

fn spawn_daily(orchestrator: Arc<Orchestrator>, kind: TickKind, at: NaiveTime) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let now = Utc::now();
            let fire = next_fire(now, at);
            info!(kind = %kind, at = %fire, "next broadcast scheduled");
            tokio::time::sleep((fire - now).to_std().unwrap_or_default()).await;

            match orchestrator.on_scheduled_tick(kind).await {
                Ok(Some(report)) => info!(
                    kind = %kind,
                    delivered = report.delivered,
                    failed = report.failed,
                    "scheduled broadcast finished"
                ),
                Ok(None) => info!(kind = %kind, "scheduled broadcast had nothing to post"),
                Err(e) => error!(kind = %kind, error = %e, "scheduled broadcast failed"),
            }
        }
    })
}
