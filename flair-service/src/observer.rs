use chrono::{DateTime, Utc};
use flairbot_core::{ActivityCounts, ErrorCategory, Flair};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// What happened during a cycle, in the order it happened.
#[derive(Debug, Clone, PartialEq)]
pub enum CycleEvent {
    CycleStarted {
        cycle: u64,
        processed: usize,
    },
    TokenRefreshed {
        expires_at: DateTime<Utc>,
    },
    TokenRefreshFailed {
        message: String,
    },
    /// No usable token; nothing was fetched.
    CycleSkipped {
        cycle: u64,
    },
    AuthorDiscovered {
        author: String,
    },
    FlairResolved {
        author: String,
        counts: ActivityCounts,
        flair: Flair,
    },
    BatchSubmitted {
        lines: usize,
        updated: usize,
        rejected: usize,
    },
    CycleFailed {
        cycle: u64,
        category: ErrorCategory,
        message: String,
    },
    CycleFinished {
        cycle: u64,
        authors: usize,
        trimmed: usize,
        elapsed: Duration,
    },
}

pub trait CycleObserver: Send + Sync {
    fn on_event(&self, event: &CycleEvent);
}

/// Writes cycle events to the `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl CycleObserver for TracingObserver {
    fn on_event(&self, event: &CycleEvent) {
        match event {
            CycleEvent::CycleStarted { cycle, processed } => {
                debug!("Cycle {} started ({} items already processed)", cycle, processed);
            }
            CycleEvent::TokenRefreshed { expires_at } => {
                info!("Access token refreshed, valid until {}", expires_at);
            }
            CycleEvent::TokenRefreshFailed { message } => {
                error!("Could not obtain an access token: {}", message);
                error!(
                    "Check the app's client id and secret, that the bot account \
                     password is correct, and that the app is of the script type"
                );
            }
            CycleEvent::CycleSkipped { cycle } => {
                warn!("Cycle {} skipped: no access token", cycle);
            }
            CycleEvent::AuthorDiscovered { author } => {
                debug!("Queued u/{} for a flair check", author);
            }
            CycleEvent::FlairResolved {
                author,
                counts,
                flair,
            } => {
                debug!(
                    "u/{}: {} posts, {} comments -> '{}' ({})",
                    author, counts.posts, counts.comments, flair.text, flair.css_class
                );
            }
            CycleEvent::BatchSubmitted {
                lines,
                updated,
                rejected,
            } => {
                info!(
                    "Submitted {} flair updates: {} applied, {} rejected",
                    lines, updated, rejected
                );
            }
            CycleEvent::CycleFailed {
                cycle,
                category,
                message,
            } => {
                error!("Cycle {} failed ({:?}): {}", cycle, category, message);
            }
            CycleEvent::CycleFinished {
                cycle,
                authors,
                trimmed,
                elapsed,
            } => {
                info!(
                    "Cycle {} finished in {:?}: {} users updated, {} processed entries trimmed",
                    cycle, elapsed, authors, trimmed
                );
            }
        }
    }
}
