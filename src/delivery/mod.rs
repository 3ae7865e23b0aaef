//! Dedup-gated delivery of image URLs to a chat.
//!
//! - [`telegram`] - the [`Publisher`] seam and its Bot API implementation
//! - [`engine`] - the sequential send/skip/backoff loop

mod engine;
mod telegram;

pub use engine::{deliver, DeliveryOptions, DeliveryReport};
pub use telegram::{PublishError, Publisher, TelegramPublisher};
