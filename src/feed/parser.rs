use feed_rs::parser;

/// A parsed RSS/Atom feed reduced to what image extraction needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedDocument {
    pub entries: Vec<Entry>,
}

/// One feed item.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Entry {
    /// HTML body of the entry: RSS `<description>` / Atom `<summary>`,
    /// falling back to the entry's `<content>` when neither is present.
    pub description: Option<String>,
}

impl FeedDocument {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn parse_feed(bytes: &[u8]) -> Result<FeedDocument, parser::ParseFeedError> {
    let feed = parser::parse(bytes)?;

    let entries = feed
        .entries
        .into_iter()
        .map(|entry| Entry {
            description: entry
                .summary
                .map(|s| s.content)
                .or_else(|| entry.content.and_then(|c| c.body)),
        })
        .collect();

    Ok(FeedDocument { entries })
}
