//! Stream configuration that downstream crates can serialize/deserialize.

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Page size used when nothing else is configured.
pub const DEFAULT_PAGE_SIZE: usize = 1024;

/// How much of a requested fetch the simulated transport hands back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Uniformly random amount in `[1, requested]`, like a single network read.
    #[default]
    Random,
    /// Always the full requested amount.
    Full,
}

impl FromStr for DeliveryMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "random" | "partial" => Ok(DeliveryMode::Random),
            "full" => Ok(DeliveryMode::Full),
            other => Err(Error::Config(format!("unknown delivery mode '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Capacity of every cache page in bytes.
    pub page_size: usize,

    /// Hard cap (in bytes) on resident page memory. Growth fails rather than exceed it.
    /// Unbounded unless set.
    pub mem_cap_bytes: usize,

    /// Partial-delivery model for cache growth.
    pub delivery: DeliveryMode,

    /// Optional seed so random deliveries are reproducible.
    pub seed: Option<u64>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            mem_cap_bytes: usize::MAX,
            delivery: DeliveryMode::Random,
            seed: None,
        }
    }
}

impl StreamConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `PAGESTREAM_PAGE_SIZE`: page capacity in bytes
    /// - `PAGESTREAM_MEM_CAP_BYTES`: resident page memory cap in bytes
    /// - `PAGESTREAM_DELIVERY`: `random` or `full`
    /// - `PAGESTREAM_SEED`: seed for random delivery
    ///
    /// Unparsable values are ignored.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`StreamConfig::from_env`] but reads variables through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(v) = lookup("PAGESTREAM_PAGE_SIZE").and_then(|s| s.parse::<usize>().ok()) {
            cfg.page_size = v;
        }

        if let Some(v) = lookup("PAGESTREAM_MEM_CAP_BYTES").and_then(|s| s.parse::<usize>().ok())
        {
            cfg.mem_cap_bytes = v;
        }

        if let Some(v) = lookup("PAGESTREAM_DELIVERY").and_then(|s| s.parse::<DeliveryMode>().ok())
        {
            cfg.delivery = v;
        }

        if let Some(v) = lookup("PAGESTREAM_SEED").and_then(|s| s.parse::<u64>().ok()) {
            cfg.seed = Some(v);
        }

        cfg
    }

    /// Load a JSON config file. Missing fields take their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!("cannot read {}: {e}", path.as_ref().display()))
        })?;
        let cfg: Self = serde_json::from_str(&text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject values the page cache cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(Error::Config("page_size must be non-zero".into()));
        }
        if self.mem_cap_bytes < self.page_size {
            return Err(Error::Config(format!(
                "mem_cap_bytes ({}) cannot hold a single page of {} bytes",
                self.mem_cap_bytes, self.page_size
            )));
        }
        Ok(())
    }
}
