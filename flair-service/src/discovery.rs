use flairbot_core::{CoreError, ListingItem, ProcessedSet, SessionToken};
use reddit_client::RedditApi;
use std::collections::HashSet;
use tracing::debug;

/// Picks the authors whose flair needs recomputing from freshly listed items.
///
/// Every unseen item is marked processed, even when its author is ignored or
/// already picked. Authors come back in first-seen order, comments before posts.
pub fn discover_authors(
    comments: &[ListingItem],
    posts: &[ListingItem],
    processed: &mut ProcessedSet,
    ignored: &HashSet<String>,
) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut authors = Vec::new();

    for item in comments.iter().chain(posts) {
        if !processed.insert(item.fullname.as_str()) {
            continue;
        }
        if ignored.contains(&item.author) {
            continue;
        }
        if seen.insert(item.author.as_str()) {
            authors.push(item.author.clone());
        }
    }

    authors
}

/// Fetches one page of newest comments, then of newest posts, and runs
/// [`discover_authors`] over them.
pub async fn fetch_and_discover<A>(
    api: &A,
    token: &SessionToken,
    subreddit: &str,
    processed: &mut ProcessedSet,
    ignored: &HashSet<String>,
) -> Result<Vec<String>, CoreError>
where
    A: RedditApi + ?Sized,
{
    let comments = api.newest_comments(token, subreddit).await?;
    let posts = api.newest_posts(token, subreddit).await?;
    debug!(
        "Fetched {} comments and {} posts from r/{}",
        comments.len(),
        posts.len(),
        subreddit
    );

    Ok(discover_authors(&comments, &posts, processed, ignored))
}
