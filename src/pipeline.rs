//! Run orchestration: feed list → fetch → extract → deliver, one feed at a time.
use std::ops::AddAssign;
use thiserror::Error;

use crate::config::{ConfigError, Settings};
use crate::content::extract_images;
use crate::delivery::{deliver, DeliveryOptions, DeliveryReport, Publisher, TelegramPublisher};
use crate::feed::{read_feed_sources, FeedReader, FetchError};
use crate::storage::{PublishedImages, StoreError};

/// Errors that end a run. Everything per-feed or per-image is logged and
/// absorbed instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to read RSS feeds file: {0}")]
    FeedList(#[source] std::io::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] FetchError),
}

/// Totals for a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub feeds: usize,
    pub images_found: usize,
    pub delivery: DeliveryReport,
}

impl AddAssign<DeliveryReport> for RunSummary {
    fn add_assign(&mut self, report: DeliveryReport) {
        self.delivery += report;
    }
}

/// Wires a feed reader, a publisher and the published images record together.
pub struct Pipeline<P> {
    reader: FeedReader,
    publisher: P,
    store: PublishedImages,
    options: DeliveryOptions,
}

impl<P: Publisher> Pipeline<P> {
    pub fn new(
        reader: FeedReader,
        publisher: P,
        store: PublishedImages,
        options: DeliveryOptions,
    ) -> Self {
        Self {
            reader,
            publisher,
            store,
            options,
        }
    }

    /// Process `feeds` strictly in order. A feed that fails to load yields no
    /// images and the run moves on; only a store write failure stops it.
    pub async fn run(&mut self, feeds: &[String]) -> Result<RunSummary, StoreError> {
        let mut summary = RunSummary::default();

        for feed in feeds {
            let doc = self.reader.read(feed).await;
            let images = extract_images(&doc);
            tracing::info!(feed = %feed, images = images.len(), "Extracted images");

            let report = deliver(&self.publisher, &mut self.store, &images, &self.options).await?;
            tracing::info!(
                feed = %feed,
                delivered = report.delivered,
                skipped = report.skipped,
                failed = report.failed,
                "Feed processed"
            );

            summary.feeds += 1;
            summary.images_found += images.len();
            summary += report;
        }

        Ok(summary)
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }
}

/// Run the relay once with `settings`.
///
/// Fails fast on missing bot credentials before any file or network access.
/// An empty or missing feed list is a clean no-op.
pub async fn run(settings: &Settings) -> Result<RunSummary, PipelineError> {
    settings.validate()?;
    tracing::info!("Starting RSS to Telegram image relay");

    let feeds = read_feed_sources(&settings.rss_feeds_file).map_err(PipelineError::FeedList)?;
    if feeds.is_empty() {
        tracing::error!("No RSS feeds loaded. Nothing to process.");
        return Ok(RunSummary::default());
    }
    tracing::info!(count = feeds.len(), "Loaded RSS feeds");

    let store = PublishedImages::load(&settings.published_images_file)?;
    let reader = FeedReader::new()?;
    let publisher = TelegramPublisher::new(&settings.telegram)?;
    let options = DeliveryOptions {
        caption: settings.telegram.media_caption.clone(),
        delay: settings.delay_between_posts,
    };

    let summary = Pipeline::new(reader, publisher, store, options)
        .run(&feeds)
        .await?;

    tracing::info!(
        feeds = summary.feeds,
        images = summary.images_found,
        delivered = summary.delivery.delivered,
        skipped = summary.delivery.skipped,
        failed = summary.delivery.failed,
        rate_limit_waits = summary.delivery.rate_limit_waits,
        "Script execution completed"
    );
    Ok(summary)
}
