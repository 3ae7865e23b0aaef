//! Content scraping for feed entry bodies.
//!
//! - [`images`] - finds image URLs in entry HTML with `scraper`

mod images;

pub use images::{extract_images, images_in_html};
