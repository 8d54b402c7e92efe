pub mod client;
pub mod error;

pub use client::{DocStore, FeedCursor, FeedOrder, FeedPage, Version};
pub use error::StoreError;
