pub mod api;
pub mod auth;
pub mod executor;
pub mod paginator;
pub mod rate_limiter;
pub mod response;


pub use api::{FlairUpdateReport, RedditApi, RedditApiClient};
pub use auth::{PasswordTokenProvider, RedditCredentials, TokenProvider};
pub use executor::RequestExecutor;
pub use paginator::{
    collect_listing, created_before, never_stop, paginate, ListingQuery, ListingSource,
    PageRequest, UserHistory,
};
pub use rate_limiter::{RateLimitConfig, RateLimitStatus, RateLimiter};
