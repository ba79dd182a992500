//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::{backend::KernelSource, error::Result};

/// Tunables of an [`SsspEngine`](super::SsspEngine).
///
/// Every field has a default, so a configuration file only needs to name
/// what it changes:
///
/// ```
/// use relax_sssp::EngineConfig;
///
/// let config = EngineConfig::from_json(r#"{ "max_iterations": 64 }"#).unwrap();
/// assert_eq!(config.max_iterations(), Some(64));
/// assert_eq!(config.kernel(), &relax_sssp::KernelSource::relaxation());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    max_iterations: Option<usize>,
    kernel: KernelSource,
}

impl EngineConfig {
    /// Parses a JSON configuration.
    ///
    /// # Errors
    /// [`SsspError::InvalidConfig`](crate::SsspError::InvalidConfig) on
    /// malformed JSON or unknown fields.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Caps the number of relax/commit iterations. `None` uses the
    /// vertex count.
    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: Option<usize>) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Replaces the kernel program handed to the backend.
    #[must_use]
    pub fn with_kernel(mut self, kernel: KernelSource) -> Self {
        self.kernel = kernel;
        self
    }

    /// Configured iteration cap, if any.
    #[inline]
    pub fn max_iterations(&self) -> Option<usize> {
        self.max_iterations
    }

    /// Kernel program.
    #[inline]
    pub fn kernel(&self) -> &KernelSource {
        &self.kernel
    }

    /// Iterations allowed for a graph of `vertex_count` vertices.
    ///
    /// A run settles after at most `vertex_count - 1` improving iterations,
    /// plus one that finds nothing to commit.
    pub(crate) fn iteration_limit(&self, vertex_count: usize) -> usize {
        self.max_iterations.unwrap_or(vertex_count.max(1))
    }
}
