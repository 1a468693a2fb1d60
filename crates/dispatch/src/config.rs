//! Dispatcher configuration.

use serde::{Deserialize, Serialize};

use crate::bus::DEFAULT_BUS_STRIPES;
use crate::errors::ConfigError;

/// Worker pool sizing and bus layout.
///
/// Deserializable so it can be embedded in an application's config file;
/// missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatcherConfig {
    /// Maximum number of Transport calls running at once. `None` means an
    /// elastic pool bounded only by the runtime. Calls beyond the limit wait
    /// inside their worker task, never on the submitting thread.
    pub max_in_flight: Option<usize>,

    /// Number of independently locked bus stripes. `1` is a single global
    /// lock.
    pub bus_stripes: usize,
}

impl DispatcherConfig {
    /// A fixed-size pool of `workers` concurrent calls.
    pub fn fixed(workers: usize) -> Self {
        Self {
            max_in_flight: Some(workers),
            ..Self::default()
        }
    }

    /// An elastic pool.
    pub fn elastic() -> Self {
        Self::default()
    }

    /// Checks the configuration for values the dispatcher cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_in_flight == Some(0) {
            return Err(ConfigError::ZeroWorkers);
        }
        if self.bus_stripes == 0 {
            return Err(ConfigError::ZeroStripes);
        }
        Ok(())
    }
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_in_flight: None,
            bus_stripes: DEFAULT_BUS_STRIPES,
        }
    }
}
