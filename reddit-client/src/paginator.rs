//! Cursor pagination over reverse-chronological Reddit listings.
//!
//! A walk starts at an empty cursor with a count offset of zero, follows each
//! page's `after` cursor, and stops either when the listing runs out or when
//! the caller's stop predicate fires. Items are yielded lazily, so a stop never
//! triggers a fetch past the page that contained the boundary.

use crate::api::RedditApi;
use async_trait::async_trait;
use flairbot_core::{CoreError, ListingItem, ListingPage, SessionToken};
use futures::stream::{self, Stream, TryStreamExt};
use std::collections::VecDeque;
use tracing::debug;

/// Position in a listing for the next fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub after: String,
    pub count: u32,
    pub limit: u32,
}

#[async_trait]
pub trait ListingSource: Send + Sync {
    async fn fetch_page(&self, request: &PageRequest) -> Result<ListingPage, CoreError>;
}

/// A user's overview listing as a [`ListingSource`].
pub struct UserHistory<'a, A: ?Sized> {
    api: &'a A,
    token: &'a SessionToken,
    username: &'a str,
}

impl<'a, A: RedditApi + ?Sized> UserHistory<'a, A> {
    pub fn new(api: &'a A, token: &'a SessionToken, username: &'a str) -> Self {
        Self {
            api,
            token,
            username,
        }
    }
}

#[async_trait]
impl<'a, A: RedditApi + ?Sized> ListingSource for UserHistory<'a, A> {
    async fn fetch_page(&self, request: &PageRequest) -> Result<ListingPage, CoreError> {
        self.api
            .user_history_page(
                self.token,
                self.username,
                &request.after,
                request.count,
                request.limit,
            )
            .await
    }
}

/// What to walk and when to stop.
pub struct ListingQuery<P> {
    pub page_size: u32,
    /// Only items from this subreddit (compared case-insensitively) are yielded.
    pub subreddit: Option<String>,
    pub stop_when: P,
}

impl<P> ListingQuery<P>
where
    P: Fn(&ListingItem) -> bool,
{
    pub fn new(page_size: u32, stop_when: P) -> Self {
        Self {
            page_size,
            subreddit: None,
            stop_when,
        }
    }

    pub fn in_subreddit(mut self, subreddit: impl Into<String>) -> Self {
        self.subreddit = Some(subreddit.into());
        self
    }

    fn accepts(&self, item: &ListingItem) -> bool {
        match &self.subreddit {
            Some(subreddit) => item.subreddit.eq_ignore_ascii_case(subreddit),
            None => true,
        }
    }
}

/// Stop predicate for items created strictly before `cutoff` (unix seconds).
/// An item exactly at the cutoff is still yielded.
pub fn created_before(cutoff: f64) -> impl Fn(&ListingItem) -> bool + Send + Sync + Clone {
    move |item: &ListingItem| item.created_utc < cutoff
}

/// Stop predicate that never fires; the walk ends with the listing.
pub fn never_stop(_item: &ListingItem) -> bool {
    false
}

struct PageWalk<'a, S: ?Sized, P> {
    source: &'a S,
    query: ListingQuery<P>,
    after: String,
    count: u32,
    buffer: VecDeque<ListingItem>,
    exhausted: bool,
    pages_fetched: u32,
}

impl<'a, S, P> PageWalk<'a, S, P>
where
    S: ListingSource + ?Sized,
    P: Fn(&ListingItem) -> bool,
{
    async fn advance(mut self) -> Result<Option<(ListingItem, Self)>, CoreError> {
        loop {
            if let Some(item) = self.buffer.pop_front() {
                if (self.query.stop_when)(&item) {
                    debug!(
                        "Listing walk stopped at {} after {} pages",
                        item.fullname, self.pages_fetched
                    );
                    return Ok(None);
                }
                if !self.query.accepts(&item) {
                    continue;
                }
                return Ok(Some((item, self)));
            }

            if self.exhausted {
                return Ok(None);
            }

            let request = PageRequest {
                after: self.after.clone(),
                count: self.count,
                limit: self.query.page_size,
            };
            let page = self.source.fetch_page(&request).await?;
            self.pages_fetched += 1;
            self.count += self.query.page_size;

            match page.after {
                Some(after) => self.after = after,
                None => self.exhausted = true,
            }
            self.buffer.extend(page.items);
        }
    }
}

/// Lazily walks `source`, yielding accepted items until the query says stop.
///
/// Fetch errors are yielded as-is and end the stream.
pub fn paginate<'a, S, P>(
    source: &'a S,
    query: ListingQuery<P>,
) -> impl Stream<Item = Result<ListingItem, CoreError>> + 'a
where
    S: ListingSource + ?Sized + 'a,
    P: Fn(&ListingItem) -> bool + 'a,
{
    let walk = PageWalk {
        source,
        query,
        after: String::new(),
        count: 0,
        buffer: VecDeque::new(),
        exhausted: false,
        pages_fetched: 0,
    };

    stream::try_unfold(walk, PageWalk::advance)
}

/// Eager form of [`paginate`].
pub async fn collect_listing<S, P>(
    source: &S,
    query: ListingQuery<P>,
) -> Result<Vec<ListingItem>, CoreError>
where
    S: ListingSource + ?Sized,
    P: Fn(&ListingItem) -> bool,
{
    paginate(source, query).try_collect().await
}
