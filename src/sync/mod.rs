//! One-way RT to JIRA synchronization
//!
//! # Flow
//!
//! 1. [`SyncDriver`] loads the watermark and fetches the RT feed
//! 2. Each feed record is normalized into a [`Ticket`]
//! 3. Tickets updated since the watermark go through [`IssueSynchronizer`]:
//!    match or create the JIRA issue, then reconcile history
//! 4. [`CommentReconciler`] writes each new human comment once, recognising
//!    earlier copies by their [`ReplicationMarker`]
//! 5. The newest replicated activity becomes the next watermark

pub mod driver;
pub mod marker;
pub mod matcher;
pub mod reconciler;
pub mod synchronizer;
pub mod ticket;
pub mod timestamp;
pub mod watermark;

pub use driver::{SyncDriver, SyncStats};
pub use marker::ReplicationMarker;
pub use matcher::{sanitize_summary, MatchStrategy, SummarySearchMatcher};
pub use reconciler::{
    build_comment_body, truncate_body, CommentReconciler, ReconcileOutcome, MAX_COMMENT_LENGTH,
};
pub use synchronizer::{build_description, IssueSynchronizer, SyncSettings, TicketOutcome, TicketReport};
pub use ticket::{Comment, Ticket, RT_SYSTEM_ACTOR};
pub use timestamp::{epoch, format_ticket_time, parse_comment_time, parse_ticket_time};
pub use watermark::{ConfigFileWatermarkStore, MemoryWatermarkStore, WatermarkStore};
