use crate::storage::CandidatePost;
use feed_rs::parser;

/// Decoded feed document: channel metadata plus candidate posts.
#[derive(Debug)]
pub struct ParsedFeed {
    /// Channel/feed title, when the document carries one
    pub title: Option<String>,
    /// Items mapped to candidates, in document order
    pub posts: Vec<CandidatePost>,
    /// Items dropped for having no link — counted, never persisted
    pub dropped: usize,
}

/// Parse an RSS/Atom document into candidate posts.
///
/// Mapping rules:
/// - link is required; items without one are dropped silently and counted
/// - title may be empty (feeds with untitled items are valid)
/// - an absent description maps to `None`, never an empty string
/// - the published date comes from the item's date field (falling back to
///   the updated field for Atom); unparsable or absent dates map to `None`,
///   never to "now" or a zero value
pub fn parse_feed(bytes: &[u8]) -> Result<ParsedFeed, parser::ParseFeedError> {
    let feed = parser::parse(bytes)?;

    let title = feed.title.map(|t| t.content);
    let mut posts = Vec::with_capacity(feed.entries.len());
    let mut dropped = 0;

    for entry in feed.entries {
        let Some(url) = entry.links.first().map(|l| l.href.clone()) else {
            dropped += 1;
            continue;
        };

        let published_at = entry.published.or(entry.updated).map(|dt| dt.timestamp());
        let description = entry
            .summary
            .map(|s| s.content)
            .or_else(|| entry.content.and_then(|c| c.body))
            .filter(|s| !s.trim().is_empty());
        let title = entry.title.map(|t| t.content).unwrap_or_default();

        posts.push(CandidatePost {
            title,
            url,
            description,
            published_at,
        });
    }

    Ok(ParsedFeed {
        title,
        posts,
        dropped,
    })
}
