use crate::activity::ActivityAggregator;
use crate::discovery::fetch_and_discover;
use crate::observer::{CycleEvent, CycleObserver, TracingObserver};
use chrono::{DateTime, Duration, Utc};
use flairbot_core::{
    build_batch_payload, resolve_flair, ActivityCounts, BotConfig, CoreError, ErrorExt,
    ErrorReporter, Flair, ProcessedSet, Rule, SessionToken,
};
use futures::{stream, StreamExt, TryStreamExt};
use reddit_client::{RedditApi, TokenProvider};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Everything carried from one cycle to the next.
#[derive(Debug, Clone, Default)]
pub struct BotState {
    pub token: Option<SessionToken>,
    pub processed: ProcessedSet,
    pub cycles: u64,
}

impl BotState {
    pub fn new() -> Self {
        Self::default()
    }
}

pub struct FlairBot {
    api: Arc<dyn RedditApi>,
    tokens: Arc<dyn TokenProvider>,
    observer: Arc<dyn CycleObserver>,
    reporter: ErrorReporter,
    subreddit: String,
    rules: Vec<Rule>,
    ignored: HashSet<String>,
    aggregator: ActivityAggregator,
    max_concurrent_authors: usize,
    refresh_margin: Duration,
}

impl FlairBot {
    pub fn new(
        config: &BotConfig,
        api: Arc<dyn RedditApi>,
        tokens: Arc<dyn TokenProvider>,
    ) -> Self {
        Self {
            api,
            tokens,
            observer: Arc::new(TracingObserver),
            reporter: ErrorReporter::new(),
            subreddit: config.subreddit.clone(),
            rules: config.rules.clone(),
            ignored: config.ignored_set(),
            aggregator: ActivityAggregator::new(
                config.subreddit.clone(),
                config.activity_window(),
                config.page_size,
            ),
            max_concurrent_authors: config.max_concurrent_authors.max(1),
            refresh_margin: config.token_refresh_margin(),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn CycleObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Runs one poll cycle and returns the state for the next one.
    ///
    /// Failures end the cycle early without submitting anything. Items marked
    /// processed before the failure stay marked.
    pub async fn run_cycle(&self, mut state: BotState, now: DateTime<Utc>) -> BotState {
        let started = Instant::now();
        state.cycles += 1;
        let cycle = state.cycles;
        self.emit(CycleEvent::CycleStarted {
            cycle,
            processed: state.processed.len(),
        });

        state.token = self.ensure_token(state.token.take(), now).await;
        let token = match &state.token {
            Some(token) => token.clone(),
            None => {
                self.emit(CycleEvent::CycleSkipped { cycle });
                return state;
            }
        };

        let updated = match self.process(&token, &mut state.processed, now).await {
            Ok(updated) => updated,
            Err(e) => {
                self.reporter.report_error(&e);
                self.emit(CycleEvent::CycleFailed {
                    cycle,
                    category: e.category(),
                    message: e.to_string(),
                });
                0
            }
        };

        let trimmed = state.processed.trim();
        self.emit(CycleEvent::CycleFinished {
            cycle,
            authors: updated,
            trimmed,
            elapsed: started.elapsed(),
        });
        state
    }

    async fn ensure_token(
        &self,
        current: Option<SessionToken>,
        now: DateTime<Utc>,
    ) -> Option<SessionToken> {
        if let Some(token) = current {
            if !token.needs_refresh(now, self.refresh_margin) {
                return Some(token);
            }
            debug!(
                "Access token expires in {}s, refreshing",
                token.expires_in(now).num_seconds()
            );
        }

        match self.tokens.fetch_token(now).await {
            Ok(token) => {
                self.emit(CycleEvent::TokenRefreshed {
                    expires_at: token.expires_at,
                });
                Some(token)
            }
            Err(e) => {
                self.reporter.report_error(&e);
                self.emit(CycleEvent::TokenRefreshFailed {
                    message: e.to_string(),
                });
                None
            }
        }
    }

    /// Discovery, counting, resolution and submission. Returns how many users
    /// were sent in the batch.
    async fn process(
        &self,
        token: &SessionToken,
        processed: &mut ProcessedSet,
        now: DateTime<Utc>,
    ) -> Result<usize, CoreError> {
        let authors = fetch_and_discover(
            self.api.as_ref(),
            token,
            &self.subreddit,
            processed,
            &self.ignored,
        )
        .await?;

        for author in &authors {
            self.emit(CycleEvent::AuthorDiscovered {
                author: author.clone(),
            });
        }

        let counts: Vec<ActivityCounts> = stream::iter(&authors)
            .map(|author| {
                self.aggregator
                    .count_activity(self.api.as_ref(), token, author, now)
            })
            .buffered(self.max_concurrent_authors)
            .try_collect()
            .await?;

        let flairs: Vec<Flair> = authors
            .iter()
            .zip(&counts)
            .map(|(author, counts)| {
                let flair = resolve_flair(counts, &self.rules).unwrap_or_else(Flair::empty);
                self.emit(CycleEvent::FlairResolved {
                    author: author.clone(),
                    counts: *counts,
                    flair: flair.clone(),
                });
                flair
            })
            .collect();

        let payload = match build_batch_payload(&authors, &flairs)? {
            Some(payload) => payload,
            None => {
                info!("No new activity in r/{}", self.subreddit);
                return Ok(0);
            }
        };

        let report = self
            .api
            .submit_flair_csv(token, &self.subreddit, &payload)
            .await?;
        self.emit(CycleEvent::BatchSubmitted {
            lines: payload.len(),
            updated: report.updated,
            rejected: report.rejected.len(),
        });

        Ok(authors.len())
    }

    fn emit(&self, event: CycleEvent) {
        self.observer.on_event(&event);
    }
}
