use chrono::{DateTime, Duration, Utc};
use flairbot_core::{ActivityCounts, CoreError, SessionToken};
use futures::TryStreamExt;
use reddit_client::{created_before, paginate, ListingQuery, ListingSource, RedditApi, UserHistory};
use tracing::debug;

/// Counts what an author contributed to one subreddit inside a trailing window.
#[derive(Debug, Clone)]
pub struct ActivityAggregator {
    subreddit: String,
    window: Duration,
    page_size: u32,
}

impl ActivityAggregator {
    pub fn new(subreddit: impl Into<String>, window: Duration, page_size: u32) -> Self {
        Self {
            subreddit: subreddit.into(),
            window,
            page_size,
        }
    }

    /// Oldest timestamp still inside the window, in unix seconds. A window
    /// reaching past the representable range starts at the earliest instant.
    pub fn cutoff(&self, now: DateTime<Utc>) -> f64 {
        let cutoff = now
            .checked_sub_signed(self.window)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        cutoff.timestamp() as f64 + f64::from(cutoff.timestamp_subsec_millis()) / 1000.0
    }

    pub async fn count_activity<A>(
        &self,
        api: &A,
        token: &SessionToken,
        author: &str,
        now: DateTime<Utc>,
    ) -> Result<ActivityCounts, CoreError>
    where
        A: RedditApi + ?Sized,
    {
        let history = UserHistory::new(api, token, author);
        let counts = self.count_from(&history, now).await?;

        debug!(
            "{} has {} posts and {} comments in r/{}",
            author, counts.posts, counts.comments, self.subreddit
        );
        Ok(counts)
    }

    /// Tallies any listing source; unknown item kinds are not counted.
    pub async fn count_from<S>(
        &self,
        source: &S,
        now: DateTime<Utc>,
    ) -> Result<ActivityCounts, CoreError>
    where
        S: ListingSource + ?Sized,
    {
        let query = ListingQuery::new(self.page_size, created_before(self.cutoff(now)))
            .in_subreddit(self.subreddit.clone());

        paginate(source, query)
            .try_fold(ActivityCounts::default(), |mut counts, item| async move {
                counts.record(&item.kind);
                Ok(counts)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use flairbot_core::{ItemKind, ListingItem, ListingPage};
    use reddit_client::PageRequest;
    use tokio_test::assert_ok;

    struct StaticHistory {
        pages: Vec<ListingPage>,
    }

    #[async_trait]
    impl ListingSource for StaticHistory {
        async fn fetch_page(&self, request: &PageRequest) -> Result<ListingPage, CoreError> {
            let index = (request.count / request.limit) as usize;
            Ok(self.pages.get(index).cloned().unwrap_or_default())
        }
    }

    fn item(kind: ItemKind, subreddit: &str, created_utc: f64) -> ListingItem {
        ListingItem {
            kind,
            fullname: format!("x_{}", created_utc),
            author: "alice".to_string(),
            subreddit: subreddit.to_string(),
            created_utc,
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.timestamp_opt(10_000, 0).unwrap()
    }

    #[tokio::test]
    async fn test_counts_by_kind_within_window() {
        let aggregator = ActivityAggregator::new("IndianFood", Duration::seconds(1000), 2);
        let history = StaticHistory {
            pages: vec![
                ListingPage {
                    items: vec![
                        item(ItemKind::Comment, "IndianFood", 9_900.0),
                        item(ItemKind::Post, "indianfood", 9_800.0),
                    ],
                    after: Some("p1".to_string()),
                },
                ListingPage {
                    items: vec![
                        item(ItemKind::Other("t5".to_string()), "IndianFood", 9_500.0),
                        item(ItemKind::Comment, "rust", 9_400.0),
                    ],
                    after: Some("p2".to_string()),
                },
                ListingPage {
                    items: vec![
                        item(ItemKind::Comment, "IndianFood", 9_000.0),
                        item(ItemKind::Comment, "IndianFood", 8_999.0),
                    ],
                    after: None,
                },
            ],
        };

        let counts = assert_ok!(aggregator.count_from(&history, now()).await);
        // The item at exactly the cutoff (9000) counts; 8999 is outside.
        assert_eq!(counts, ActivityCounts::new(1, 2));
    }

    #[tokio::test]
    async fn test_no_history_is_zero_counts() {
        let aggregator = ActivityAggregator::new("IndianFood", Duration::days(30), 25);
        let history = StaticHistory { pages: vec![] };

        let counts = aggregator.count_from(&history, now()).await.unwrap();
        assert_eq!(counts, ActivityCounts::default());
        assert_eq!(counts.total(), 0);
    }

    #[test]
    fn test_cutoff() {
        let aggregator = ActivityAggregator::new("IndianFood", Duration::seconds(2_500), 25);
        assert_eq!(aggregator.cutoff(now()), 7_500.0);
    }

    #[tokio::test]
    async fn test_window_beyond_calendar_range_counts_everything() {
        let aggregator = ActivityAggregator::new("IndianFood", Duration::days(1_000_000_000), 25);
        assert_eq!(
            aggregator.cutoff(now()),
            DateTime::<Utc>::MIN_UTC.timestamp() as f64
        );

        let history = StaticHistory {
            pages: vec![ListingPage {
                items: vec![
                    item(ItemKind::Comment, "IndianFood", 9_000.0),
                    item(ItemKind::Post, "IndianFood", 0.0),
                ],
                after: None,
            }],
        };
        let counts = assert_ok!(aggregator.count_from(&history, now()).await);
        assert_eq!(counts, ActivityCounts::new(1, 1));
    }
}
