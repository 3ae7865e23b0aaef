//! Feed ingestion: the feed list file, HTTP fetching and RSS/Atom parsing.
//!
//! - [`sources`] - reads the line-delimited feed URL list
//! - [`fetcher`] - HTTP retrieval with timeout and size limit
//! - [`parser`] - `feed-rs` parsing into [`FeedDocument`]

mod fetcher;
mod parser;
mod sources;

pub use fetcher::{FeedReader, FetchError};
pub use parser::{parse_feed, Entry, FeedDocument};
pub use sources::read_feed_sources;
