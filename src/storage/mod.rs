mod published;
mod types;

pub use published::PublishedImages;
pub use types::StoreError;
