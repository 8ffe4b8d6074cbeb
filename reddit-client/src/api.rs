use crate::executor::RequestExecutor;
use async_trait::async_trait;
use flairbot_core::{
    BatchPayload, BotConfig, ConfigError, CoreError, ItemKind, ListingItem, ListingPage,
    RedditApiError, SessionToken,
};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListing<T> {
    pub kind: String,
    pub data: RedditListingData<T>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingData<T> {
    pub children: Vec<RedditListingChild<T>>,
    pub after: Option<String>,
    pub before: Option<String>,
    pub dist: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditListingChild<T> {
    pub kind: String,
    pub data: T,
}

/// The fields shared by comments (`t1`) and posts (`t3`) that the bot reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditThingData {
    pub name: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub subreddit: String,
    #[serde(default)]
    pub created_utc: f64,
}

impl From<RedditListingChild<RedditThingData>> for ListingItem {
    fn from(child: RedditListingChild<RedditThingData>) -> Self {
        Self {
            kind: ItemKind::from_tag(&child.kind),
            fullname: child.data.name,
            author: child.data.author,
            subreddit: child.data.subreddit,
            created_utc: child.data.created_utc,
        }
    }
}

impl From<RedditListing<RedditThingData>> for ListingPage {
    fn from(listing: RedditListing<RedditThingData>) -> Self {
        Self {
            items: listing.data.children.into_iter().map(Into::into).collect(),
            after: listing.data.after.filter(|cursor| !cursor.is_empty()),
        }
    }
}

/// One entry of the `flaircsv` response array.
#[derive(Debug, Clone, Deserialize)]
struct FlairCsvLine {
    ok: bool,
    #[serde(default)]
    status: String,
    #[serde(default)]
    errors: Value,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlairUpdateReport {
    pub updated: usize,
    pub rejected: Vec<String>,
}

impl FlairUpdateReport {
    fn from_lines(lines: Vec<FlairCsvLine>) -> Self {
        let mut report = Self::default();
        for (position, line) in lines.into_iter().enumerate() {
            if line.ok {
                report.updated += 1;
                continue;
            }

            let details = match &line.errors {
                Value::Object(map) if !map.is_empty() => map
                    .iter()
                    .map(|(field, message)| match message {
                        Value::String(text) => format!("{}: {}", field, text),
                        other => format!("{}: {}", field, other),
                    })
                    .collect::<Vec<_>>()
                    .join(", "),
                _ => "rejected".to_string(),
            };
            report
                .rejected
                .push(format!("line {} ({}): {}", position + 1, line.status, details));
        }
        report
    }
}

/// The Reddit calls the flair bot needs.
#[async_trait]
pub trait RedditApi: Send + Sync {
    /// Single page of the newest comments in `subreddit`.
    async fn newest_comments(
        &self,
        token: &SessionToken,
        subreddit: &str,
    ) -> Result<Vec<ListingItem>, CoreError>;

    /// Single page of the newest posts in `subreddit`.
    async fn newest_posts(
        &self,
        token: &SessionToken,
        subreddit: &str,
    ) -> Result<Vec<ListingItem>, CoreError>;

    /// One page of a user's overview, newest first.
    async fn user_history_page(
        &self,
        token: &SessionToken,
        username: &str,
        after: &str,
        count: u32,
        limit: u32,
    ) -> Result<ListingPage, CoreError>;

    async fn submit_flair_csv(
        &self,
        token: &SessionToken,
        subreddit: &str,
        payload: &BatchPayload,
    ) -> Result<FlairUpdateReport, CoreError>;
}

#[derive(Debug, Clone)]
pub struct RedditApiClient {
    executor: Arc<RequestExecutor>,
    api_base: Url,
}

impl RedditApiClient {
    pub fn new(executor: Arc<RequestExecutor>, api_base: &str) -> Result<Self, CoreError> {
        let api_base = Url::parse(api_base).map_err(|e| ConfigError::InvalidValue {
            field: "api_base".to_string(),
            value: format!("{} ({})", api_base, e),
        })?;

        Ok(Self { executor, api_base })
    }

    pub fn from_config(
        executor: Arc<RequestExecutor>,
        config: &BotConfig,
    ) -> Result<Self, CoreError> {
        Self::new(executor, &config.api_base)
    }

    fn endpoint_url(&self, endpoint: &str) -> Result<Url, CoreError> {
        self.api_base.join(endpoint).map_err(|e| CoreError::InvalidInput {
            message: format!("Cannot build URL for {}: {}", endpoint, e),
        })
    }

    async fn get_listing(
        &self,
        token: &SessionToken,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<ListingPage, CoreError> {
        let url = self.endpoint_url(endpoint)?;
        info!("Making Reddit API request: GET {}", endpoint);

        let request = self
            .executor
            .http_client()
            .request(Method::GET, url)
            .bearer_auth(&token.access_token)
            .query(query);

        let body = self.executor.execute(request, endpoint).await?;
        let listing: RedditListing<RedditThingData> =
            serde_json::from_value(body).map_err(|e| {
                CoreError::RedditApi(RedditApiError::InvalidResponse {
                    details: format!("Failed to parse listing from {}: {}", endpoint, e),
                })
            })?;

        debug!(
            "Retrieved {} items from {}",
            listing.data.children.len(),
            endpoint
        );
        Ok(listing.into())
    }
}

#[async_trait]
impl RedditApi for RedditApiClient {
    async fn newest_comments(
        &self,
        token: &SessionToken,
        subreddit: &str,
    ) -> Result<Vec<ListingItem>, CoreError> {
        let endpoint = format!("/r/{}/comments", subreddit);
        Ok(self.get_listing(token, &endpoint, &[]).await?.items)
    }

    async fn newest_posts(
        &self,
        token: &SessionToken,
        subreddit: &str,
    ) -> Result<Vec<ListingItem>, CoreError> {
        let endpoint = format!("/r/{}/new", subreddit);
        Ok(self.get_listing(token, &endpoint, &[]).await?.items)
    }

    async fn user_history_page(
        &self,
        token: &SessionToken,
        username: &str,
        after: &str,
        count: u32,
        limit: u32,
    ) -> Result<ListingPage, CoreError> {
        let endpoint = format!("/user/{}", username);
        let query = [
            ("count", count.to_string()),
            ("after", after.to_string()),
            ("limit", limit.to_string()),
        ];
        self.get_listing(token, &endpoint, &query).await
    }

    async fn submit_flair_csv(
        &self,
        token: &SessionToken,
        subreddit: &str,
        payload: &BatchPayload,
    ) -> Result<FlairUpdateReport, CoreError> {
        let endpoint = format!("/r/{}/api/flaircsv", subreddit);
        let url = self.endpoint_url(&endpoint)?;
        info!(
            "Making Reddit API request: POST {} ({} lines)",
            endpoint,
            payload.len()
        );

        let request = self
            .executor
            .http_client()
            .request(Method::POST, url)
            .bearer_auth(&token.access_token)
            .form(&[("flair_csv", payload.as_str())]);

        let body = self.executor.execute(request, &endpoint).await?;
        let lines: Vec<FlairCsvLine> = serde_json::from_value(body).map_err(|e| {
            CoreError::RedditApi(RedditApiError::InvalidResponse {
                details: format!("Failed to parse flaircsv result: {}", e),
            })
        })?;

        let report = FlairUpdateReport::from_lines(lines);
        for rejection in &report.rejected {
            warn!("Flair update rejected: {}", rejection);
        }
        Ok(report)
    }
}
