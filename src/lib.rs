//! Relays images found in RSS/Atom feeds to a Telegram chat.
//!
//! A run reads the feed list, fetches each feed in turn, scrapes image URLs
//! out of entry bodies and posts the ones not yet recorded as published,
//! waiting out Telegram flood control when asked to.

pub mod config;
pub mod content;
pub mod delivery;
pub mod feed;
pub mod logging;
pub mod pipeline;
pub mod storage;
