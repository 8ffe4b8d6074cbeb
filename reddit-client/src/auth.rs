use crate::executor::RequestExecutor;
use crate::response::check_response_errors;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use flairbot_core::{BotConfig, ConfigError, CoreError, RedditApiError, SessionToken};
use oauth2::basic::{BasicClient, BasicErrorResponse};
use oauth2::{
    AuthUrl, ClientId, ClientSecret, RequestTokenError, ResourceOwnerPassword,
    ResourceOwnerUsername, TokenResponse, TokenUrl,
};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

const REDDIT_AUTHORIZE_URL: &str = "https://www.reddit.com/api/v1/authorize";
const TOKEN_ENDPOINT: &str = "/api/v1/access_token";

/// Lifetime assumed when Reddit omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn fetch_token(&self, now: DateTime<Utc>) -> Result<SessionToken, CoreError>;
}

/// Script-app credentials for the password grant.
#[derive(Clone)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
}

impl RedditCredentials {
    pub fn from_config(config: &BotConfig) -> Self {
        Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            username: config.username.clone(),
            password: config.password.clone(),
        }
    }
}

impl fmt::Debug for RedditCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedditCredentials")
            .field("client_id", &self.client_id)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

/// Obtains access tokens with Reddit's resource-owner password grant.
#[derive(Debug)]
pub struct PasswordTokenProvider {
    executor: Arc<RequestExecutor>,
    oauth_client: BasicClient,
    username: ResourceOwnerUsername,
    password: ResourceOwnerPassword,
}

impl PasswordTokenProvider {
    pub fn new(
        executor: Arc<RequestExecutor>,
        credentials: RedditCredentials,
        token_url: &str,
    ) -> Result<Self, CoreError> {
        let auth_url = AuthUrl::new(REDDIT_AUTHORIZE_URL.to_string()).map_err(|e| {
            CoreError::Internal {
                message: format!("Invalid authorize URL: {}", e),
            }
        })?;
        let token_url = TokenUrl::new(token_url.to_string()).map_err(|e| {
            ConfigError::InvalidValue {
                field: "token_url".to_string(),
                value: format!("{} ({})", token_url, e),
            }
        })?;

        let oauth_client = BasicClient::new(
            ClientId::new(credentials.client_id),
            Some(ClientSecret::new(credentials.client_secret)),
            auth_url,
            Some(token_url),
        );

        Ok(Self {
            executor,
            oauth_client,
            username: ResourceOwnerUsername::new(credentials.username),
            password: ResourceOwnerPassword::new(credentials.password),
        })
    }

    pub fn from_config(
        executor: Arc<RequestExecutor>,
        config: &BotConfig,
    ) -> Result<Self, CoreError> {
        Self::new(
            executor,
            RedditCredentials::from_config(config),
            &config.token_url,
        )
    }
}

#[async_trait]
impl TokenProvider for PasswordTokenProvider {
    async fn fetch_token(&self, now: DateTime<Utc>) -> Result<SessionToken, CoreError> {
        info!("Requesting access token for {}", self.username.as_str());

        let executor = self.executor.clone();
        let http_client = move |request: oauth2::HttpRequest| {
            let executor = executor.clone();
            async move { executor.exchange(request, TOKEN_ENDPOINT).await }
        };

        let response = self
            .oauth_client
            .exchange_password(&self.username, &self.password)
            .request_async(http_client)
            .await
            .map_err(map_token_error)?;

        let expires_in = response
            .expires_in()
            .and_then(|lifetime| Duration::from_std(lifetime).ok())
            .unwrap_or_else(|| Duration::seconds(DEFAULT_TOKEN_LIFETIME_SECS));

        debug!("Access token expires in {}s", expires_in.num_seconds());
        Ok(SessionToken::new(
            response.access_token().secret().clone(),
            response.token_type().as_ref(),
            expires_in,
            now,
        ))
    }
}

fn map_token_error(error: RequestTokenError<CoreError, BasicErrorResponse>) -> CoreError {
    match error {
        RequestTokenError::Request(CoreError::RedditApi(RedditApiError::InvalidToken)) => {
            CoreError::RedditApi(RedditApiError::AuthenticationFailed {
                reason: "client credentials were rejected".to_string(),
            })
        }
        RequestTokenError::Request(inner) => inner,
        RequestTokenError::ServerResponse(response) => {
            CoreError::RedditApi(RedditApiError::Remote {
                endpoint: TOKEN_ENDPOINT.to_string(),
                messages: vec![response.to_string()],
            })
        }
        // Reddit answers bad user credentials with a 200 and an `error` body.
        RequestTokenError::Parse(parse_error, body) => {
            token_body_error(&body, &parse_error.to_string())
        }
        RequestTokenError::Other(message) => {
            CoreError::RedditApi(RedditApiError::AuthenticationFailed { reason: message })
        }
    }
}

/// Explains a token response body that did not parse as a token.
fn token_body_error(body: &[u8], parse_error: &str) -> CoreError {
    let details = match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(value) => match check_response_errors(TOKEN_ENDPOINT, &value) {
            Err(remote) => return CoreError::RedditApi(remote),
            Ok(()) => format!("Unexpected token response: {}", parse_error),
        },
        Err(_) => format!("Token response is not JSON: {}", parse_error),
    };
    CoreError::RedditApi(RedditApiError::InvalidResponse { details })
}
