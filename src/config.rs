//! Registry configuration
//!
//! This module provides the options a [`crate::VariableRegistry`] is created with: which marker
//! identifies monitored symbols, how repeated registrations of the same instance are treated and
//! whether dropped instances are pruned while taking snapshots.

use strum::{Display, EnumString};

use crate::{Error::InvalidConfig, Result};

/// The marker name monitored symbols carry unless configured otherwise
pub const DEFAULT_MARKER: &str = "Monitored";

/// How the registry treats an instance that is registered while it is already bound
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Bind each monitored member at most once per live instance; later registrations only add
    /// members that were not bound yet
    #[default]
    Ignore,
    /// Every registration binds and publishes another full set of variables
    Append,
}

/// Configuration for a variable registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryConfig {
    /// Name of the interest marker that identifies monitored fields and methods (default: `Monitored`)
    pub marker: String,

    /// Treatment of repeated registrations of a live instance (default: [`DuplicatePolicy::Ignore`])
    pub duplicate_policy: DuplicatePolicy,

    /// Remove the variables of dropped instances whenever a snapshot is taken (default: `true`)
    /// When disabled, dead instances are still hidden from snapshots; their storage is only
    /// reclaimed by an explicit purge.
    pub sweep_dropped_instances: bool,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            marker: DEFAULT_MARKER.to_string(),
            duplicate_policy: DuplicatePolicy::Ignore,
            sweep_dropped_instances: true,
        }
    }
}

impl RegistryConfig {
    /// Creates the default configuration for a different interest marker
    #[must_use]
    pub fn for_marker(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            ..Self::default()
        }
    }

    /// Creates a configuration in which every registration publishes its own set of variables
    ///
    /// Suitable for callers that re-register an instance after reconfiguring it and want each
    /// registration reported separately.
    #[must_use]
    pub fn appending() -> Self {
        Self {
            duplicate_policy: DuplicatePolicy::Append,
            ..Self::default()
        }
    }

    /// Creates a configuration that never prunes during snapshots
    ///
    /// Snapshots stay read-only on the instance map; storage of dropped instances is reclaimed by
    /// [`crate::VariableRegistry::purge_dropped_instances`].
    #[must_use]
    pub fn manual_sweep() -> Self {
        Self {
            sweep_dropped_instances: false,
            ..Self::default()
        }
    }

    /// Check the configuration for consistency
    ///
    /// # Errors
    /// Returns [`crate::Error::InvalidConfig`] if the marker name is empty or contains whitespace.
    pub fn validate(&self) -> Result<()> {
        if self.marker.is_empty() {
            return Err(InvalidConfig("marker name must not be empty".to_string()));
        }

        if self.marker.chars().any(char::is_whitespace) {
            return Err(InvalidConfig(format!(
                "marker name '{}' must not contain whitespace",
                self.marker
            )));
        }

        Ok(())
    }
}
