//! Feed sources, iCalendar parsing and normalization.
//!
//! This crate turns a unit's calendar feed into stays:
//!
//! - [`FeedSource`] - The trait that fetches raw feed bytes for a URL
//! - [`parse_feed`] - iCalendar parser producing [`RawEvent`]s
//! - [`normalize_events`] - Pipeline to convert raw events to [`StayInterval`]s
//! - [`ProviderError`] - Error types for fetch and parse failures
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐    ┌─────────────────┐
//! │  Airbnb export  │    │ Booking.com ICS │
//! └────────┬────────┘    └────────┬────────┘
//!          │                      │
//!          │      FeedSource      │
//!          └──────────┬───────────┘
//!                     │ bytes
//!                     ▼ parse_feed()
//!              ┌─────────────┐
//!              │  RawEvent   │
//!              └──────┬──────┘
//!                     │
//!                     ▼ normalize_events()
//!              ┌──────────────────┐
//!              │   StayInterval   │
//!              └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use turnover_providers::{FeedSource, NormalizeOptions, normalize_events, parse_feed};
//!
//! async fn stays(source: &dyn FeedSource, url: &str, options: &NormalizeOptions) -> Vec<StayInterval> {
//!     let bytes = source.fetch(url).await?;
//!     let (intervals, _warnings) = normalize_events(parse_feed(&bytes, "Flat 7")?, options);
//!     intervals
//! }
//! ```
//!
//! [`StayInterval`]: turnover_core::StayInterval

pub mod error;
pub mod feed;
pub mod ics;
pub mod normalize;
pub mod raw_event;

// Re-export main types at crate root
pub use error::{ProviderError, ProviderErrorCode, ProviderResult};
pub use feed::{BoxFuture, FeedSource, MemoryFeedSource};
#[cfg(feature = "http")]
pub use feed::{HttpFeedSource, HttpFeedSourceConfig, parse_feed_url};
pub use ics::{ParsedFeed, parse_feed};
pub use normalize::{
    DEFAULT_HORIZON_DAYS, NormalizeOptions, normalize_event, normalize_events, to_local_date,
};
pub use raw_event::{RawEvent, RawEventTime};
