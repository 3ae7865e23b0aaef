use std::ops::AddAssign;
use std::time::Duration;

use super::telegram::{PublishError, Publisher};
use crate::storage::{PublishedImages, StoreError};

/// Caption and pacing applied to every photo of a run.
#[derive(Debug, Clone, Default)]
pub struct DeliveryOptions {
    pub caption: String,
    /// Pause after each successful send.
    pub delay: Duration,
}

/// Per-batch tally of what happened to each image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub delivered: usize,
    /// Already present in the published images record.
    pub skipped: usize,
    /// Abandoned after a non rate-limit error; eligible again next run.
    pub failed: usize,
    /// Number of flood-control waits observed.
    pub rate_limit_waits: usize,
}

impl AddAssign for DeliveryReport {
    fn add_assign(&mut self, other: Self) {
        self.delivered += other.delivered;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self.rate_limit_waits += other.rate_limit_waits;
    }
}

/// Terminal state of one image within a run.
#[derive(Debug)]
enum Outcome {
    Delivered,
    Failed(PublishError),
}

/// Send every image in `images` that `store` has not seen, in order.
///
/// - Already-published URLs are skipped.
/// - A URL the store could not record (see [`PublishedImages::is_storable`])
///   is counted as failed without being sent.
/// - A rate-limit reply suspends for exactly the server-given duration and
///   retries the same image, without limit.
/// - Any other send error abandons the image (not recorded).
/// - A success is recorded in `store` before anything else happens, then the
///   loop pauses for `options.delay`.
///
/// Images are handled strictly one at a time; a URL repeated later in
/// `images` is skipped because its first send was already recorded.
///
/// # Errors
///
/// Only a failure to append to the published images file is returned, since
/// the run can no longer guarantee it won't send duplicates.
pub async fn deliver<P>(
    publisher: &P,
    store: &mut PublishedImages,
    images: &[String],
    options: &DeliveryOptions,
) -> Result<DeliveryReport, StoreError>
where
    P: Publisher + ?Sized,
{
    let mut report = DeliveryReport::default();

    for image in images {
        if store.contains(image) {
            tracing::info!(image = %image, "Image already published");
            report.skipped += 1;
            continue;
        }
        if !PublishedImages::is_storable(image) {
            report.failed += 1;
            tracing::error!(image = ?image, "Image URL cannot be recorded, not sending");
            continue;
        }

        let outcome = 'sending: loop {
            match publisher.send_photo(image, &options.caption).await {
                Ok(()) => break 'sending Outcome::Delivered,
                Err(PublishError::RateLimited(wait)) => {
                    report.rate_limit_waits += 1;
                    tracing::warn!(
                        image = %image,
                        retry_after_secs = wait.as_secs(),
                        "Flood control exceeded, retrying after wait"
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(e) => break 'sending Outcome::Failed(e),
            }
        };

        match outcome {
            Outcome::Delivered => {
                store.record(image)?;
                report.delivered += 1;
                tracing::info!(image = %image, "Sent image");
                tokio::time::sleep(options.delay).await;
            }
            Outcome::Failed(e) => {
                report.failed += 1;
                tracing::error!(image = %image, error = %e, "Error sending photo");
            }
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Replies with scripted results in order, then succeeds.
    #[derive(Default)]
    struct ScriptedPublisher {
        replies: Mutex<VecDeque<Result<(), PublishError>>>,
        sent: Mutex<Vec<(String, Instant)>>,
    }

    impl ScriptedPublisher {
        fn with_replies(replies: Vec<Result<(), PublishError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                sent: Mutex::default(),
            }
        }

        fn attempts(&self) -> Vec<String> {
            self.sent.lock().unwrap().iter().map(|(u, _)| u.clone()).collect()
        }
    }

    #[async_trait]
    impl Publisher for ScriptedPublisher {
        async fn send_photo(&self, image_url: &str, _caption: &str) -> Result<(), PublishError> {
            self.sent
                .lock()
                .unwrap()
                .push((image_url.to_string(), Instant::now()));
            self.replies.lock().unwrap().pop_front().unwrap_or(Ok(()))
        }
    }

    fn store(name: &str) -> (PublishedImages, PathBuf) {
        let dir = std::env::temp_dir().join(format!("imagerelay_engine_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("published.txt");
        (PublishedImages::load(&path).unwrap(), dir)
    }

    fn urls(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_in_batch_sent_once() {
        let (mut store, dir) = store("dup");
        let publisher = ScriptedPublisher::default();
        let images = urls(&[
            "http://x/A.png",
            "http://x/B.png",
            "http://x/B.png",
            "http://x/C.png",
        ]);

        let report = deliver(&publisher, &mut store, &images, &DeliveryOptions::default())
            .await
            .unwrap();

        assert_eq!(
            publisher.attempts(),
            urls(&["http://x/A.png", "http://x/B.png", "http://x/C.png"])
        );
        assert_eq!(
            report,
            DeliveryReport {
                delivered: 3,
                skipped: 1,
                failed: 0,
                rate_limit_waits: 0
            }
        );
        let persisted = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(persisted, "http://x/A.png\nhttp://x/B.png\nhttp://x/C.png\n");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_published_never_resent() {
        let (mut store, dir) = store("idempotent");
        let images = urls(&["http://x/1.png", "http://x/2.png"]);

        let first = ScriptedPublisher::default();
        deliver(&first, &mut store, &images, &DeliveryOptions::default())
            .await
            .unwrap();

        let second = ScriptedPublisher::default();
        let report = deliver(&second, &mut store, &images, &DeliveryOptions::default())
            .await
            .unwrap();

        assert!(second.attempts().is_empty());
        assert_eq!(report.skipped, 2);
        assert_eq!(report.delivered, 0);

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_waits_then_retries_same_image() {
        let (mut store, dir) = store("ratelimit");
        let publisher = ScriptedPublisher::with_replies(vec![Err(PublishError::RateLimited(
            Duration::from_secs(3),
        ))]);
        let images = urls(&["http://x/X.png"]);

        let report = deliver(&publisher, &mut store, &images, &DeliveryOptions::default())
            .await
            .unwrap();

        let sent = publisher.sent.lock().unwrap().clone();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].0, sent[1].0);
        assert!(sent[1].1 - sent[0].1 >= Duration::from_secs(3));
        assert_eq!(report.delivered, 1);
        assert_eq!(report.rate_limit_waits, 1);

        let persisted = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(persisted, "http://x/X.png\n");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_rate_limits_are_not_abandoned() {
        let (mut store, dir) = store("ratelimit_many");
        let replies = (0..5)
            .map(|_| Err(PublishError::RateLimited(Duration::from_secs(1))))
            .collect();
        let publisher = ScriptedPublisher::with_replies(replies);

        let report = deliver(
            &publisher,
            &mut store,
            &urls(&["http://x/X.png"]),
            &DeliveryOptions::default(),
        )
        .await
        .unwrap();

        assert_eq!(publisher.attempts().len(), 6);
        assert_eq!(report.rate_limit_waits, 5);
        assert!(store.contains("http://x/X.png"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test(start_paused = true)]
    async fn test_other_error_abandons_image_and_continues() {
        let (mut store, dir) = store("failed");
        let publisher = ScriptedPublisher::with_replies(vec![Err(PublishError::Telegram(
            "Bad Request".into(),
        ))]);
        let images = urls(&["http://x/bad.png", "http://x/good.png"]);

        let report = deliver(&publisher, &mut store, &images, &DeliveryOptions::default())
            .await
            .unwrap();

        assert_eq!(publisher.attempts(), images);
        assert_eq!(report.failed, 1);
        assert_eq!(report.delivered, 1);
        assert!(!store.contains("http://x/bad.png"));
        assert!(store.contains("http://x/good.png"));

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test(start_paused = true)]
    async fn test_unrecordable_url_is_never_sent() {
        let (mut store, dir) = store("unrecordable");
        let publisher = ScriptedPublisher::default();
        let images = urls(&[" http://x/padded.png", "http://x/split\n.png", "http://x/ok.png"]);

        let report = deliver(&publisher, &mut store, &images, &DeliveryOptions::default())
            .await
            .unwrap();

        assert_eq!(publisher.attempts(), urls(&["http://x/ok.png"]));
        assert_eq!(report.failed, 2);
        assert_eq!(report.delivered, 1);
        let persisted = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(persisted, "http://x/ok.png\n");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[tokio::test(start_paused = true)]
    async fn test_delay_paces_successful_sends_only() {
        let (mut store, dir) = store("pacing");
        let publisher = ScriptedPublisher::with_replies(vec![
            Ok(()),
            Err(PublishError::Telegram("nope".into())),
            Ok(()),
        ]);
        let images = urls(&["http://x/1.png", "http://x/2.png", "http://x/3.png"]);
        let options = DeliveryOptions {
            caption: String::new(),
            delay: Duration::from_secs(5),
        };

        let start = Instant::now();
        deliver(&publisher, &mut store, &images, &options)
            .await
            .unwrap();

        let sent = publisher.sent.lock().unwrap().clone();
        assert!(sent[1].1 - sent[0].1 >= Duration::from_secs(5));
        // The failed image does not trigger a pause before the next one.
        assert!(sent[2].1 - sent[1].1 < Duration::from_secs(5));
        assert!(start.elapsed() >= Duration::from_secs(10));

        std::fs::remove_dir_all(&dir).ok();
    }
}
