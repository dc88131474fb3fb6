//! Local feed cache: freshness policy, persisted feed model and the loader
//! that sequences store calls.

mod loader;
mod local;
mod policy;

pub use loader::{CurrentTime, LocalFeedLoader, SaveResult, ValidationResult};
pub use local::{CachedFeed, LocalFeedItem};
pub use policy::{CachePolicy, CalendarZone, DEFAULT_MAX_AGE_DAYS};
