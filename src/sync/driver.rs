//! Sync driver
//!
//! One pass over the RT feed: load the watermark, synchronize every updated
//! ticket in feed order, then store the newest replicated activity as the
//! next watermark if it moved forward. A failure anywhere before the end
//! aborts the pass and leaves the stored watermark alone.

use super::synchronizer::{IssueSynchronizer, SyncSettings, TicketOutcome, TicketReport};
use super::ticket::Ticket;
use super::timestamp::{epoch, format_ticket_time};
use super::watermark::WatermarkStore;
use crate::integrations::{BoardClient, RawRecord, TrackerClient};
use crate::Result;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Statistics for one pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    pub tickets_seen: u32,
    /// Not updated since the watermark
    pub tickets_skipped: u32,
    pub tickets_malformed: u32,
    pub issues_created: u32,
    pub issues_reused: u32,
    pub comments_added: u32,
    pub comments_already_present: u32,
    pub comments_skipped_system: u32,
    pub comments_skipped_old: u32,
    pub comments_malformed: u32,
    /// Watermark the pass ended with
    pub watermark: NaiveDateTime,
    /// `watermark` was later than the stored value and was written
    pub persisted: bool,
    /// Writing an advanced watermark failed
    pub persist_failed: bool,
}

impl SyncStats {
    fn new(watermark: NaiveDateTime) -> Self {
        Self {
            tickets_seen: 0,
            tickets_skipped: 0,
            tickets_malformed: 0,
            issues_created: 0,
            issues_reused: 0,
            comments_added: 0,
            comments_already_present: 0,
            comments_skipped_system: 0,
            comments_skipped_old: 0,
            comments_malformed: 0,
            watermark,
            persisted: false,
            persist_failed: false,
        }
    }

    fn record(&mut self, report: &TicketReport) {
        if report.created {
            self.issues_created += 1;
        } else {
            self.issues_reused += 1;
        }
        self.comments_added += report.comments.added;
        self.comments_already_present += report.comments.already_present;
        self.comments_skipped_system += report.comments.skipped_system;
        self.comments_skipped_old += report.comments.skipped_old;
        self.comments_malformed += report.malformed_comments;
    }

    /// Number of writes made to JIRA
    pub fn board_writes(&self) -> u32 {
        self.issues_created + self.comments_added
    }
}

/// Runs sync passes against one RT instance and one JIRA project
pub struct SyncDriver {
    tracker: Arc<dyn TrackerClient>,
    board: Arc<dyn BoardClient>,
    store: Arc<dyn WatermarkStore>,
    synchronizer: IssueSynchronizer,
}

impl SyncDriver {
    pub fn new(
        tracker: Arc<dyn TrackerClient>,
        board: Arc<dyn BoardClient>,
        store: Arc<dyn WatermarkStore>,
        settings: SyncSettings,
    ) -> Self {
        Self::with_synchronizer(tracker, board, store, IssueSynchronizer::new(settings))
    }

    pub fn with_synchronizer(
        tracker: Arc<dyn TrackerClient>,
        board: Arc<dyn BoardClient>,
        store: Arc<dyn WatermarkStore>,
        synchronizer: IssueSynchronizer,
    ) -> Self {
        Self {
            tracker,
            board,
            store,
            synchronizer,
        }
    }

    /// Run one full pass
    pub async fn run(&self) -> Result<SyncStats> {
        let watermark = self.load_watermark()?;
        let span = info_span!("sync_run", watermark = %format_ticket_time(&watermark));
        self.run_pass(watermark).instrument(span).await
    }

    /// Stored watermark, or the epoch if there is none or it is unreadable
    fn load_watermark(&self) -> Result<NaiveDateTime> {
        match self.store.load() {
            Ok(Some(watermark)) => Ok(watermark),
            Ok(None) => {
                warn!("No last fetched timestamp stored, starting from the epoch");
                Ok(epoch())
            }
            Err(e) if e.is_record_scoped() => {
                warn!(error = %e, "Stored last fetched timestamp is malformed, starting from the epoch");
                Ok(epoch())
            }
            Err(e) => Err(e),
        }
    }

    async fn run_pass(&self, watermark: NaiveDateTime) -> Result<SyncStats> {
        let settings = self.synchronizer.settings();
        let records = self.tracker.fetch_feed(&settings.feed_query).await?;
        info!(count = records.len(), "Fetched RT tickets");

        let mut stats = SyncStats::new(watermark);
        let mut max_seen_activity = watermark;

        for record in &records {
            stats.tickets_seen += 1;

            let Some(ticket) = self.normalize(record, &mut stats)? else {
                continue;
            };

            let outcome = self
                .synchronizer
                .synchronize(self.tracker.as_ref(), self.board.as_ref(), &ticket, watermark)
                .await?;

            match outcome {
                TicketOutcome::Skipped => stats.tickets_skipped += 1,
                TicketOutcome::Synced(report) => {
                    if let Some(latest) = report.comments.latest_activity {
                        max_seen_activity = max_seen_activity.max(latest);
                    }
                    stats.record(&report);
                }
            }
        }

        stats.watermark = max_seen_activity;
        if max_seen_activity > watermark {
            match self.store.save(max_seen_activity) {
                Ok(()) => stats.persisted = true,
                Err(e) => {
                    stats.persist_failed = true;
                    error!(
                        error = %e,
                        watermark = %format_ticket_time(&max_seen_activity),
                        "Failed to save last fetched timestamp"
                    );
                }
            }
        } else {
            debug!("No new RT activity, last fetched timestamp unchanged");
        }

        info!(
            tickets = stats.tickets_seen,
            skipped = stats.tickets_skipped,
            created = stats.issues_created,
            reused = stats.issues_reused,
            comments_added = stats.comments_added,
            watermark = %format_ticket_time(&stats.watermark),
            "Sync pass complete"
        );

        Ok(stats)
    }

    /// `None` for a malformed ticket that policy says to skip
    fn normalize(&self, record: &RawRecord, stats: &mut SyncStats) -> Result<Option<Ticket>> {
        match Ticket::from_record(record) {
            Ok(ticket) => Ok(Some(ticket)),
            Err(e) if e.is_record_scoped() && !self.synchronizer.settings().abort_on_malformed => {
                warn!(
                    ticket = record.get("id").unwrap_or("?"),
                    error = %e,
                    "Skipping malformed RT ticket"
                );
                stats.tickets_malformed += 1;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}
