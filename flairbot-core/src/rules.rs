use crate::types::{ActivityCounts, ActivityType, Flair, Rule};

/// Picks the flair for a user from their activity counts.
///
/// Each activity type is scanned independently and the last rule in
/// configuration order whose `[min, max]` range contains the count is kept.
/// When both types produce a rule the heavier one wins; an exact weight tie
/// goes to the post rule. Returns `None` when no rule matches at all.
pub fn resolve_flair(counts: &ActivityCounts, rules: &[Rule]) -> Option<Flair> {
    let post = last_match(counts, rules, ActivityType::Post);
    let comment = last_match(counts, rules, ActivityType::Comment);

    let chosen = match (post, comment) {
        (None, None) => return None,
        (Some(post), None) => post,
        (None, Some(comment)) => comment,
        (Some(post), Some(comment)) => {
            if comment.weight > post.weight {
                comment
            } else {
                post
            }
        }
    };

    Some(chosen.flair())
}

fn last_match<'a>(
    counts: &ActivityCounts,
    rules: &'a [Rule],
    activity_type: ActivityType,
) -> Option<&'a Rule> {
    rules
        .iter()
        .rev()
        .find(|rule| rule.activity_type == activity_type && rule.matches(counts))
}
