//! Cache configuration: backend selection and freshness policy, chosen at
//! composition time.
//!
//! ```ignore
//! let config = CacheConfig::from_json(r#"{
//!     "max_age_days": 7,
//!     "zone": { "kind": "utc" },
//!     "store": { "kind": "file", "path": "/var/cache/app/feed.json" }
//! }"#)?;
//! let loader = config.build_loader()?;
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use serde::Deserialize;
use tracing::debug;

use crate::cache::{CachePolicy, CalendarZone, LocalFeedLoader, DEFAULT_MAX_AGE_DAYS};
use crate::error::ConfigError;
use crate::store::{FeedStore, FileFeedStore};
#[cfg(feature = "records")]
use crate::store::{RecordContext, RecordFeedStore};

/// Which backend holds the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StoreConfig {
    File {
        path: PathBuf,
    },
    Records {
        #[serde(default)]
        path: Option<PathBuf>,
    },
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::Records { path: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_age_days: u64,
    pub zone: CalendarZone,
    pub store: StoreConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            max_age_days: DEFAULT_MAX_AGE_DAYS,
            zone: CalendarZone::default(),
            store: StoreConfig::default(),
        }
    }
}

impl CacheConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn with_max_age_days(mut self, days: u64) -> Self {
        self.max_age_days = days;
        self
    }

    pub fn with_zone(mut self, zone: CalendarZone) -> Self {
        self.zone = zone;
        self
    }

    pub fn with_store(mut self, store: StoreConfig) -> Self {
        self.store = store;
        self
    }

    pub fn policy(&self) -> CachePolicy {
        CachePolicy::new()
            .with_max_age_days(self.max_age_days)
            .with_zone(self.zone)
    }

    pub fn build_store(&self) -> Result<Arc<dyn FeedStore>, ConfigError> {
        match &self.store {
            StoreConfig::File { path } => {
                debug!(path = %path.display(), "using file feed store");
                Ok(Arc::new(FileFeedStore::new(path.clone())))
            }
            #[cfg(feature = "records")]
            StoreConfig::Records { path } => {
                let context = match path {
                    Some(path) => RecordContext::open(path.clone())?,
                    None => RecordContext::in_memory(),
                };
                debug!(persistent = path.is_some(), "using record feed store");
                Ok(Arc::new(RecordFeedStore::new(context)))
            }
            #[cfg(not(feature = "records"))]
            StoreConfig::Records { .. } => Err(ConfigError::FeatureDisabled("records")),
        }
    }

    /// Loader over the configured store, reading the system clock.
    pub fn build_loader(&self) -> Result<LocalFeedLoader<dyn FeedStore>, ConfigError> {
        let store = self.build_store()?;
        Ok(LocalFeedLoader::with_system_clock(store).with_policy(self.policy()))
    }
}
