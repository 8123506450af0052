use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

const DEFAULT_BUFFER_SIZE: NonZeroUsize = NonZeroUsize::new(100).unwrap();

/// Settings of a collection run.
///
/// Every field has a default, so a JSON file only needs the keys it changes:
///
/// ```json
/// { "database_path": "sf.sqlite", "buffer_size": 10, "delay_ms": 500 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CollectorConfig {
    /// SQLite file receiving the samples. Created if missing.
    pub database_path: PathBuf,

    /// Records kept in memory before a batch write.
    pub buffer_size: NonZeroUsize,

    /// Number of origin/destination pairs to collect.
    pub samples: usize,

    /// Pause after each sample, in milliseconds.
    pub delay_ms: u64,

    /// Give up on a sample after this many rejected draws. `None` keeps
    /// drawing until a point lands inside the region.
    pub max_attempts: Option<NonZeroUsize>,
}

impl CollectorConfig {
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            ..Self::default()
        }
    }

    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|err| Error::Config(err.to_string()))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|err| Error::Config(format!("cannot read {}: {err}", path.display())))?;
        Self::from_json(&text)
    }

    pub fn with_buffer_size(mut self, buffer_size: NonZeroUsize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_samples(mut self, samples: usize) -> Self {
        self.samples = samples;
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: Option<NonZeroUsize>) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("responses.sqlite"),
            buffer_size: DEFAULT_BUFFER_SIZE,
            samples: 30,
            delay_ms: 500,
            max_attempts: None,
        }
    }
}
